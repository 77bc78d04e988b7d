use std::collections::HashSet;

use crate::error::Result;
use crate::rng_util;
use crate::runhistory::RunRecord;
use crate::runner::{RunRequest, TargetRunner};
use crate::space::Configuration;

use super::Smbo;

impl Smbo {
    /// Run the full optimization loop.
    ///
    /// With an empty run history the space's default configuration is
    /// evaluated first. While no recorded run counts for training (all were
    /// aborted), challengers are plain random draws. Each of the `n_iterations` iterations then selects
    /// challengers, runs the first `challengers_per_iteration` of them that
    /// were never evaluated on every instance, and records the results.
    ///
    /// Returns the incumbent and its mean cost, with aborted runs ignored
    /// and timeouts charged as in training.
    ///
    /// # Errors
    ///
    /// Propagates runner errors and every error of
    /// [`select_configurations`](Self::select_configurations).
    ///
    /// # Examples
    ///
    /// ```
    /// use smbo::Smbo;
    /// use smbo::parameter::Hyperparameter;
    /// use smbo::runner::{RunOutcome, RunRequest};
    /// use smbo::space::ConfigurationSpace;
    ///
    /// fn sphere(request: &RunRequest<'_>) -> smbo::Result<RunOutcome> {
    ///     let v = request.configuration.vector();
    ///     let cost = (v[0] - 0.3).powi(2) + (v[1] - 0.6).powi(2);
    ///     Ok(RunOutcome::success(cost, 0.01))
    /// }
    ///
    /// let space = ConfigurationSpace::new()
    ///     .add("a", Hyperparameter::float(0.0, 1.0).unwrap())
    ///     .unwrap()
    ///     .add("b", Hyperparameter::float(0.0, 1.0).unwrap())
    ///     .unwrap();
    ///
    /// let mut smbo = Smbo::builder(space)
    ///     .n_random_sorted(50)
    ///     .seed(3)
    ///     .build()
    ///     .unwrap();
    /// let (_, cost) = smbo.optimize(&sphere, 5).unwrap().unwrap();
    /// assert!(cost < 0.3);
    /// assert_eq!(smbo.run_history().len(), 6);
    /// ```
    pub fn optimize(
        &mut self,
        runner: &impl TargetRunner,
        n_iterations: usize,
    ) -> Result<Option<(Configuration, f64)>> {
        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!("optimize", n_iterations).entered();

        if self.run_history.is_empty() {
            let default = self.space.default_configuration();
            self.evaluate(runner, &default)?;
            self.refresh_incumbent();
        }

        for iteration in 0..n_iterations {
            // Random draws until some run counts for training
            let challengers = if self.rh2epm.incumbent(&self.run_history).is_some() {
                self.select_configurations()?
            } else {
                self.get_next_by_random_search(2 * self.challengers_per_iteration, false)?
            };

            let mut chosen: HashSet<Configuration> = HashSet::new();
            let picks: Vec<Configuration> = challengers
                .into_iter()
                .map(|c| c.configuration)
                .filter(|c| !self.run_history.contains(c))
                .filter(|c| chosen.insert(c.clone()))
                .take(self.challengers_per_iteration)
                .collect();

            for config in &picks {
                self.evaluate(runner, config)?;
            }
            self.refresh_incumbent();

            trace_debug!(iteration, evaluated = picks.len(), "smbo iteration finished");
            #[cfg(not(feature = "tracing"))]
            let _ = iteration;
        }

        Ok(self.rh2epm.incumbent(&self.run_history))
    }

    /// Run `config` on every instance and record the outcomes.
    fn evaluate(&mut self, runner: &impl TargetRunner, config: &Configuration) -> Result<()> {
        for instance in &self.instances {
            let seed = rng_util::child_seed(&mut self.rng);
            let request = RunRequest {
                configuration: config,
                instance: instance.as_deref(),
                instance_specific: instance
                    .as_deref()
                    .and_then(|id| self.instance_specifics.get(id))
                    .map(String::as_str),
                cutoff: self.cutoff,
                seed,
            };
            let outcome = runner.run(&request)?;
            self.run_history.add(RunRecord {
                configuration: config.clone(),
                instance: instance.clone(),
                seed,
                cost: outcome.cost,
                runtime: outcome.runtime,
                status: outcome.status,
                additional_info: outcome.additional_info,
            });
        }
        Ok(())
    }

    /// Adopt the run history's incumbent, logging changes.
    fn refresh_incumbent(&mut self) {
        let Some((incumbent, cost)) = self.rh2epm.incumbent(&self.run_history) else {
            return;
        };
        if self.incumbent.as_ref() != Some(&incumbent) {
            trace_info!(cost, "new incumbent found");
            #[cfg(not(feature = "tracing"))]
            let _ = cost;
            self.incumbent = Some(incumbent);
        }
    }
}
