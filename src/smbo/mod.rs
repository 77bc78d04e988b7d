//! The SMBO controller: retrain the surrogate, then search for challengers.
//!
//! Every call to [`Smbo::select_configurations`] runs one round of the
//! challenger-generation pipeline:
//!
//! 1. Transform the run history into training data and retrain the model.
//! 2. Bind the model and the incumbent value `eta` to the acquisition
//!    function.
//! 3. Climb from the incumbent and from random starts with the maximizer,
//!    and score a large batch of random configurations.
//! 4. Rank both by acquisition value and interleave the ranking with
//!    unscored random configurations, so every other challenger explores.
//!
//! [`Smbo::optimize`] wraps this in the full evaluate-and-record loop.

use core::fmt;
use std::collections::HashMap;
use std::sync::Arc;

use crate::acquisition::AcquisitionFunction;
use crate::epm::{RunHistory2Epm, SurrogateModel, TrainingData};
use crate::error::Result;
use crate::local_search::AcquisitionMaximizer;
use crate::runhistory::RunHistory;
use crate::space::{Configuration, SearchSpace};

mod builder;
mod optimize;

pub use builder::SmboBuilder;

/// Which search produced a challenger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Origin {
    /// Drawn uniformly at random, not scored.
    RandomSearch,
    /// Drawn uniformly at random and ranked by acquisition value.
    RandomSearchSorted,
    /// Result of a local search climb.
    LocalSearch,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::RandomSearch => "Random Search",
            Self::RandomSearchSorted => "Random Search (sorted)",
            Self::LocalSearch => "Local Search",
        })
    }
}

/// A candidate configuration proposed for evaluation.
#[derive(Clone, Debug, PartialEq)]
pub struct Challenger {
    /// Acquisition value (`0.0` for unscored random draws).
    pub acquisition_value: f64,
    /// The proposed configuration.
    pub configuration: Configuration,
    /// The search that produced it.
    pub origin: Origin,
}

/// Sequential model-based optimization controller.
///
/// Created through [`Smbo::builder`].
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use smbo::parameter::Hyperparameter;
/// use smbo::runhistory::{RunHistory, RunRecord};
/// use smbo::space::{Configuration, ConfigurationSpace};
/// use smbo::{Origin, Smbo};
///
/// let space = ConfigurationSpace::new()
///     .add("x", Hyperparameter::float(-5.0, 10.0).unwrap())
///     .unwrap()
///     .add("y", Hyperparameter::float(0.0, 15.0).unwrap())
///     .unwrap();
///
/// let history = Arc::new(RunHistory::new());
/// history.add(RunRecord::new(Configuration::new(vec![0.3, 0.6]), None, 12.5, 1.0));
///
/// let mut smbo = Smbo::builder(space)
///     .run_history(Arc::clone(&history))
///     .n_random_sorted(100)
///     .seed(7)
///     .build()
///     .unwrap();
///
/// let challengers = smbo.select_configurations().unwrap();
/// assert_eq!(challengers[1].origin, Origin::RandomSearch);
/// assert!(challengers.iter().all(|c| c.configuration.len() == 2));
/// ```
pub struct Smbo {
    pub(crate) space: Arc<dyn SearchSpace>,
    pub(crate) run_history: Arc<RunHistory>,
    pub(crate) model: Arc<dyn SurrogateModel>,
    pub(crate) acquisition: Box<dyn AcquisitionFunction>,
    pub(crate) maximizer: Box<dyn AcquisitionMaximizer>,
    pub(crate) rh2epm: RunHistory2Epm,
    /// Instances every challenger is run on by [`Smbo::optimize`].
    pub(crate) instances: Vec<Option<String>>,
    pub(crate) cutoff: Option<f64>,
    /// Instance-specific information by instance id.
    pub(crate) instance_specifics: HashMap<String, String>,
    pub(crate) n_local_search: usize,
    pub(crate) n_random_sorted: usize,
    pub(crate) challengers_per_iteration: usize,
    pub(crate) incumbent: Option<Configuration>,
    pub(crate) rng: fastrand::Rng,
}

impl Smbo {
    /// Starts building a controller for `space`.
    #[must_use]
    pub fn builder(space: impl SearchSpace + 'static) -> SmboBuilder {
        SmboBuilder::new(space)
    }

    /// The configuration space being searched.
    #[must_use]
    pub fn space(&self) -> &dyn SearchSpace {
        self.space.as_ref()
    }

    /// The run history the controller trains on.
    #[must_use]
    pub fn run_history(&self) -> &Arc<RunHistory> {
        &self.run_history
    }

    /// The surrogate model.
    #[must_use]
    pub fn model(&self) -> &Arc<dyn SurrogateModel> {
        &self.model
    }

    /// The acquisition function.
    #[must_use]
    pub fn acquisition(&self) -> &dyn AcquisitionFunction {
        self.acquisition.as_ref()
    }

    /// The current incumbent, if one is known.
    #[must_use]
    pub fn incumbent(&self) -> Option<&Configuration> {
        self.incumbent.as_ref()
    }

    /// Overrides the incumbent used as the first local-search start.
    ///
    /// [`select_configurations`](Self::select_configurations) replaces it
    /// with the run history's incumbent whenever the history has one. That
    /// incumbent is judged the way the model is trained: aborted runs are
    /// ignored and timeouts are charged the penalized cutoff.
    pub fn set_incumbent(&mut self, incumbent: Option<Configuration>) {
        self.incumbent = incumbent;
    }

    /// Draws `num_points` random configurations.
    ///
    /// Unsorted draws keep their draw order and carry an acquisition value
    /// of `0.0`. Sorted draws are scored in one batch and stably sorted by
    /// descending acquisition value.
    ///
    /// # Errors
    ///
    /// Propagates sampling errors and, when `sort` is set, acquisition
    /// errors.
    pub fn get_next_by_random_search(&mut self, num_points: usize, sort: bool) -> Result<Vec<Challenger>> {
        let configs = self.space.sample_configurations(num_points, &mut self.rng)?;
        if !sort {
            return Ok(configs
                .into_iter()
                .map(|configuration| Challenger {
                    acquisition_value: 0.0,
                    configuration,
                    origin: Origin::RandomSearch,
                })
                .collect());
        }

        let values = self.acquisition.compute_configurations(&configs)?;
        let mut challengers: Vec<Challenger> = values
            .into_iter()
            .zip(configs)
            .map(|(acquisition_value, configuration)| Challenger {
                acquisition_value,
                configuration,
                origin: Origin::RandomSearchSorted,
            })
            .collect();
        sort_by_acquisition(&mut challengers);
        Ok(challengers)
    }

    /// Runs the maximizer from `num_points` starts.
    ///
    /// The incumbent, if known, is the first start; the remaining starts are
    /// random. Results are returned in start order, scored by their final
    /// acquisition value.
    ///
    /// # Errors
    ///
    /// Propagates sampling and maximizer errors.
    pub fn get_next_by_local_search(&mut self, num_points: usize) -> Result<Vec<Challenger>> {
        let mut starts = Vec::with_capacity(num_points);
        if num_points > 0
            && let Some(incumbent) = &self.incumbent
        {
            starts.push(incumbent.clone());
        }
        let n_random = num_points - starts.len();
        starts.extend(self.space.sample_configurations(n_random, &mut self.rng)?);

        let mut challengers = Vec::with_capacity(starts.len());
        for start in &starts {
            let result = self.maximizer.maximize(
                start,
                self.acquisition.as_ref(),
                self.space.as_ref(),
                &mut self.rng,
            )?;
            challengers.push(Challenger {
                acquisition_value: result.acquisition_value(),
                configuration: result.configuration,
                origin: Origin::LocalSearch,
            });
        }
        Ok(challengers)
    }

    /// Retrains the model and returns this iteration's challengers.
    ///
    /// The list alternates acquisition-ranked challengers (local search and
    /// sorted random search) with unscored random draws, ranked first.
    /// Callers consume it from the front.
    ///
    /// With an empty run history the model is not retrained and `eta` is 0.
    ///
    /// # Errors
    ///
    /// Propagates errors of the observation transformer, the model, the
    /// acquisition function and the maximizer.
    pub fn select_configurations(&mut self) -> Result<Vec<Challenger>> {
        let data = self
            .rh2epm
            .transform(&self.run_history, self.model.config_width())?;
        if !data.is_empty() {
            self.model.train(&data.x, &data.y)?;
        }
        let best = self.rh2epm.incumbent(&self.run_history);
        let eta = self.eta(&data, best.as_ref().map(|(_, cost)| *cost));
        if let Some((incumbent, _)) = best {
            self.incumbent = Some(incumbent);
        }

        self.acquisition.update(Arc::clone(&self.model), eta);

        let mut ranked = self.get_next_by_local_search(self.n_local_search)?;
        ranked.extend(self.get_next_by_random_search(self.n_random_sorted, true)?);
        sort_by_acquisition(&mut ranked);

        let random = self.get_next_by_random_search(ranked.len(), false)?;

        trace_debug!(
            rows = data.len(),
            eta,
            ranked = ranked.len(),
            random = random.len(),
            "challengers selected"
        );

        Ok(interleave(ranked, random))
    }

    /// Incumbent value in model-target space, from the incumbent's charged
    /// cost.
    fn eta(&self, data: &TrainingData, incumbent_cost: Option<f64>) -> f64 {
        if data.is_empty() {
            return 0.0;
        }
        match incumbent_cost {
            Some(cost) => self.rh2epm.transform_cost(cost),
            None => data.y.column(0).iter().copied().fold(f64::INFINITY, f64::min),
        }
    }
}

/// Stable sort by descending acquisition value.
fn sort_by_acquisition(challengers: &mut [Challenger]) {
    challengers.sort_by(|a, b| b.acquisition_value.total_cmp(&a.acquisition_value));
}

/// Round-robin merge, starting with `first`; leftovers of the longer list
/// are appended.
fn interleave(first: Vec<Challenger>, second: Vec<Challenger>) -> Vec<Challenger> {
    let mut merged = Vec::with_capacity(first.len() + second.len());
    let mut first = first.into_iter();
    let mut second = second.into_iter();
    loop {
        match (first.next(), second.next()) {
            (None, None) => break,
            (a, b) => {
                merged.extend(a);
                merged.extend(b);
            }
        }
    }
    merged
}
