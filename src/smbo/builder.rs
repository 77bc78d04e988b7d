use std::collections::HashMap;
use std::sync::Arc;

use nalgebra::DMatrix;

use crate::acquisition::{AcquisitionFunction, ExpectedImprovement};
use crate::epm::{
    ObjectiveTransform, RandomForestConfig, RandomForestWithInstances, RunHistory2Epm,
    SurrogateModel,
};
use crate::error::{Error, Result};
use crate::local_search::{AcquisitionMaximizer, LocalSearch};
use crate::runhistory::RunHistory;
use crate::space::SearchSpace;
use crate::types::RunObjective;

use super::Smbo;

/// Default number of local-search starts per iteration.
const DEFAULT_N_LOCAL_SEARCH: usize = 10;
/// Default number of acquisition-ranked random configurations per iteration.
const DEFAULT_N_RANDOM_SORTED: usize = 1000;
/// Default number of new configurations evaluated per `optimize` iteration.
const DEFAULT_CHALLENGERS_PER_ITERATION: usize = 1;

/// A builder for [`Smbo`] controllers.
///
/// Created via [`Smbo::builder()`].
///
/// # Defaults
///
/// - Run objective: [`Runtime`](RunObjective::Runtime)
/// - Model: [`RandomForestWithInstances`] with [`RandomForestConfig::default()`]
/// - Acquisition: [`ExpectedImprovement`]
/// - Observation transform: `LogCost` for runtime, `Cost` for quality
/// - Maximizer: [`LocalSearch`]
/// - `n_local_search`: 10, `n_random_sorted`: 1000,
///   `challengers_per_iteration`: 1
///
/// # Examples
///
/// ```
/// use smbo::parameter::Hyperparameter;
/// use smbo::space::ConfigurationSpace;
/// use smbo::{RunObjective, Smbo};
///
/// let space = ConfigurationSpace::new()
///     .add("lr", Hyperparameter::log_float(1e-4, 1.0).unwrap())
///     .unwrap();
///
/// let smbo = Smbo::builder(space)
///     .run_objective(RunObjective::Quality)
///     .n_local_search(5)
///     .n_random_sorted(200)
///     .seed(42)
///     .build()
///     .unwrap();
/// assert!(smbo.incumbent().is_none());
/// ```
pub struct SmboBuilder {
    space: Arc<dyn SearchSpace>,
    run_objective: RunObjective,
    model: Option<Arc<dyn SurrogateModel>>,
    acquisition: Option<Box<dyn AcquisitionFunction>>,
    maximizer: Option<Box<dyn AcquisitionMaximizer>>,
    runhistory2epm: Option<RunHistory2Epm>,
    run_history: Option<Arc<RunHistory>>,
    instances: Vec<String>,
    instance_features: Option<DMatrix<f64>>,
    cutoff: Option<f64>,
    par_factor: Option<f64>,
    instance_specifics: HashMap<String, String>,
    n_local_search: Option<usize>,
    n_random_sorted: Option<usize>,
    challengers_per_iteration: Option<usize>,
    seed: Option<u64>,
}

impl SmboBuilder {
    pub(super) fn new(space: impl SearchSpace + 'static) -> Self {
        Self {
            space: Arc::new(space),
            run_objective: RunObjective::default(),
            model: None,
            acquisition: None,
            maximizer: None,
            runhistory2epm: None,
            run_history: None,
            instances: Vec::new(),
            instance_features: None,
            cutoff: None,
            par_factor: None,
            instance_specifics: HashMap::new(),
            n_local_search: None,
            n_random_sorted: None,
            challengers_per_iteration: None,
            seed: None,
        }
    }

    /// Sets what is being minimized; picks the default observation
    /// transform.
    #[must_use]
    pub fn run_objective(mut self, run_objective: RunObjective) -> Self {
        self.run_objective = run_objective;
        self
    }

    /// Sets a custom surrogate model.
    ///
    /// Its type descriptor must match the space's.
    #[must_use]
    pub fn model(mut self, model: impl SurrogateModel + 'static) -> Self {
        self.model = Some(Arc::new(model));
        self
    }

    /// Sets a custom acquisition function.
    #[must_use]
    pub fn acquisition(mut self, acquisition: impl AcquisitionFunction + 'static) -> Self {
        self.acquisition = Some(Box::new(acquisition));
        self
    }

    /// Sets a custom acquisition maximizer.
    #[must_use]
    pub fn maximizer(mut self, maximizer: impl AcquisitionMaximizer + 'static) -> Self {
        self.maximizer = Some(Box::new(maximizer));
        self
    }

    /// Sets a custom observation transformer.
    #[must_use]
    pub fn runhistory2epm(mut self, runhistory2epm: RunHistory2Epm) -> Self {
        self.runhistory2epm = Some(runhistory2epm);
        self
    }

    /// Shares an existing run history instead of starting an empty one.
    #[must_use]
    pub fn run_history(mut self, run_history: Arc<RunHistory>) -> Self {
        self.run_history = Some(run_history);
        self
    }

    /// Sets the problem instances every configuration is evaluated on.
    #[must_use]
    pub fn instances<I, S>(mut self, instances: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.instances = instances.into_iter().map(Into::into).collect();
        self
    }

    /// Sets instance features, one row per instance given to
    /// [`instances`](Self::instances), in the same order.
    ///
    /// Used by the default model and observation transformer.
    #[must_use]
    pub fn instance_features(mut self, features: DMatrix<f64>) -> Self {
        self.instance_features = Some(features);
        self
    }

    /// Sets the runtime cutoff passed to the runner; timeouts are charged
    /// the cutoff by the default observation transformer.
    #[must_use]
    pub fn cutoff(mut self, cutoff: f64) -> Self {
        self.cutoff = Some(cutoff);
        self
    }

    /// Sets the penalty factor for timed-out runs: the default observation
    /// transformer charges them `par_factor * cutoff`.
    ///
    /// Default: 1.
    #[must_use]
    pub fn par_factor(mut self, par_factor: f64) -> Self {
        self.par_factor = Some(par_factor);
        self
    }

    /// Attaches instance-specific information, passed to the runner with
    /// every run on `instance`.
    #[must_use]
    pub fn instance_specific(mut self, instance: impl Into<String>, info: impl Into<String>) -> Self {
        self.instance_specifics.insert(instance.into(), info.into());
        self
    }

    /// Sets the number of local-search starts per iteration.
    ///
    /// Default: 10.
    #[must_use]
    pub fn n_local_search(mut self, n: usize) -> Self {
        self.n_local_search = Some(n);
        self
    }

    /// Sets the number of acquisition-ranked random configurations per
    /// iteration.
    ///
    /// Default: 1000.
    #[must_use]
    pub fn n_random_sorted(mut self, n: usize) -> Self {
        self.n_random_sorted = Some(n);
        self
    }

    /// Sets how many new configurations [`Smbo::optimize`] evaluates per
    /// iteration.
    ///
    /// Default: 1.
    #[must_use]
    pub fn challengers_per_iteration(mut self, n: usize) -> Self {
        self.challengers_per_iteration = Some(n);
        self
    }

    /// Sets the random seed for reproducibility.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Builds the controller.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeDescriptorMismatch`] if a custom model disagrees
    /// with the space, [`Error::ObjectiveDimensionMismatch`] if the model,
    /// acquisition function and observation transform disagree on the
    /// number of objectives, [`Error::DimensionMismatch`] if the instance
    /// features do not have one row per instance, and
    /// [`Error::EmptyInstanceFeatures`] for an empty feature matrix.
    pub fn build(self) -> Result<Smbo> {
        let types = self.space.types();
        let mut rng = self
            .seed
            .map_or_else(fastrand::Rng::new, fastrand::Rng::with_seed);

        let features = match self.instance_features {
            Some(f) if f.nrows() != self.instances.len() => {
                return Err(Error::DimensionMismatch {
                    expected: self.instances.len(),
                    got: f.nrows(),
                });
            }
            other => other,
        };

        let model: Arc<dyn SurrogateModel> = match self.model {
            Some(model) => {
                if model.types() != types.as_slice() {
                    return Err(Error::TypeDescriptorMismatch {
                        expected: types,
                        got: model.types().to_vec(),
                    });
                }
                model
            }
            None => {
                let config = RandomForestConfig {
                    seed: rng.u64(..),
                    ..RandomForestConfig::default()
                };
                let mut forest = RandomForestWithInstances::new(types.clone(), config);
                if let Some(f) = &features {
                    forest = forest.with_instance_features(f.clone())?;
                }
                Arc::new(forest)
            }
        };

        let rh2epm = match self.runhistory2epm {
            Some(rh2epm) => rh2epm,
            None => {
                let transform = match self.run_objective {
                    RunObjective::Runtime => ObjectiveTransform::LogCost,
                    RunObjective::Quality => ObjectiveTransform::Cost,
                };
                let mut rh2epm = RunHistory2Epm::new(transform);
                if let Some(f) = &features {
                    rh2epm = rh2epm.with_instance_features(self.instances.iter().cloned(), f.clone())?;
                }
                if let Some(cutoff) = self.cutoff {
                    rh2epm = rh2epm.cutoff(cutoff);
                }
                if let Some(par_factor) = self.par_factor {
                    rh2epm = rh2epm.par_factor(par_factor);
                }
                rh2epm
            }
        };

        let acquisition = self
            .acquisition
            .unwrap_or_else(|| Box::new(ExpectedImprovement::new()));
        for got in [
            acquisition.n_objectives(),
            rh2epm.objective_transform().n_objectives(),
        ] {
            if got != model.n_outputs() {
                return Err(Error::ObjectiveDimensionMismatch {
                    expected: model.n_outputs(),
                    got,
                });
            }
        }

        let instances = if self.instances.is_empty() {
            vec![None]
        } else {
            self.instances.into_iter().map(Some).collect()
        };

        trace_debug!(
            n_parameters = types.len(),
            n_instances = instances.len(),
            "smbo controller built"
        );

        Ok(Smbo {
            space: self.space,
            run_history: self
                .run_history
                .unwrap_or_else(|| Arc::new(RunHistory::new())),
            model,
            acquisition,
            maximizer: self
                .maximizer
                .unwrap_or_else(|| Box::new(LocalSearch::new())),
            rh2epm,
            instances,
            cutoff: self.cutoff,
            instance_specifics: self.instance_specifics,
            n_local_search: self.n_local_search.unwrap_or(DEFAULT_N_LOCAL_SEARCH),
            n_random_sorted: self.n_random_sorted.unwrap_or(DEFAULT_N_RANDOM_SORTED),
            challengers_per_iteration: self
                .challengers_per_iteration
                .unwrap_or(DEFAULT_CHALLENGERS_PER_ITERATION),
            incumbent: None,
            rng,
        })
    }
}
