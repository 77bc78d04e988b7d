//! Greedy local search over a configuration space's neighborhood.
//!
//! Starting from a seed configuration, [`LocalSearch`] repeatedly scores the
//! current point together with all of its one-parameter neighbors and moves
//! to the best neighbor while that strictly improves the acquisition value.
//! The search stops at a local optimum or after `max_steps` moves.

use crate::acquisition::AcquisitionFunction;
use crate::error::Result;
use crate::space::{Configuration, SearchSpace};

/// Default cap on the number of moves per climb.
const DEFAULT_MAX_STEPS: usize = 1000;

/// Result of one acquisition-maximizing climb.
#[derive(Clone, Debug, PartialEq)]
pub struct LocalSearchResult {
    /// The configuration the climb ended on.
    pub configuration: Configuration,
    /// Acquisition value of the current point at every step; the last
    /// entry is the value of `configuration`.
    pub trace: Vec<f64>,
}

impl LocalSearchResult {
    /// Acquisition value of the final configuration.
    #[must_use]
    pub fn acquisition_value(&self) -> f64 {
        self.trace.last().copied().unwrap_or(f64::NEG_INFINITY)
    }
}

/// Strategy that climbs from a start configuration towards higher
/// acquisition values.
pub trait AcquisitionMaximizer: Send + Sync {
    /// Climb from `start`.
    ///
    /// # Errors
    ///
    /// Propagates errors of the space's neighbor generator and of the
    /// acquisition function.
    fn maximize(
        &self,
        start: &Configuration,
        acquisition: &dyn AcquisitionFunction,
        space: &dyn SearchSpace,
        rng: &mut fastrand::Rng,
    ) -> Result<LocalSearchResult>;
}

/// Phase of a single climb.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SearchState {
    Searching,
    Converged,
}

/// Best-improvement hill climbing.
///
/// # Examples
///
/// ```
/// use smbo::local_search::LocalSearch;
///
/// let ls = LocalSearch::builder().max_steps(50).build();
/// assert_eq!(ls.max_steps(), 50);
/// ```
#[derive(Clone, Debug)]
pub struct LocalSearch {
    max_steps: usize,
}

impl LocalSearch {
    /// Creates a local search with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    /// Creates a builder for custom settings.
    #[must_use]
    pub fn builder() -> LocalSearchBuilder {
        LocalSearchBuilder::new()
    }

    /// Maximum number of moves per climb.
    #[must_use]
    pub fn max_steps(&self) -> usize {
        self.max_steps
    }
}

impl Default for LocalSearch {
    fn default() -> Self {
        Self::new()
    }
}

impl AcquisitionMaximizer for LocalSearch {
    fn maximize(
        &self,
        start: &Configuration,
        acquisition: &dyn AcquisitionFunction,
        space: &dyn SearchSpace,
        rng: &mut fastrand::Rng,
    ) -> Result<LocalSearchResult> {
        let mut current = start.clone();
        let mut trace = Vec::new();
        let mut moves = 0;
        let mut state = SearchState::Searching;

        while state == SearchState::Searching {
            let neighbors = space.neighbors(&current, rng)?;
            let mut batch = Vec::with_capacity(neighbors.len() + 1);
            batch.push(current.clone());
            batch.extend(neighbors);
            let values = acquisition.compute_configurations(&batch)?;

            let current_value = values[0];
            trace.push(current_value);

            // First maximum wins ties
            let best = values
                .iter()
                .enumerate()
                .skip(1)
                .fold(None, |best: Option<(usize, f64)>, (i, &v)| match best {
                    Some((_, b)) if v <= b => best,
                    _ => Some((i, v)),
                });

            match best {
                Some((i, v)) if v > current_value && moves < self.max_steps => {
                    current = batch.swap_remove(i);
                    moves += 1;
                }
                _ => state = SearchState::Converged,
            }
        }

        trace_debug!(
            moves,
            value = trace.last().copied().unwrap_or(f64::NEG_INFINITY),
            "local search converged"
        );

        Ok(LocalSearchResult {
            configuration: current,
            trace,
        })
    }
}

/// Builder for configuring a [`LocalSearch`].
///
/// # Examples
///
/// ```
/// use smbo::local_search::LocalSearchBuilder;
///
/// let ls = LocalSearchBuilder::new().max_steps(10).build();
/// ```
#[derive(Debug, Clone, Default)]
pub struct LocalSearchBuilder {
    max_steps: Option<usize>,
}

impl LocalSearchBuilder {
    /// Creates a new builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of moves per climb.
    ///
    /// Default: 1000.
    #[must_use]
    pub fn max_steps(mut self, n: usize) -> Self {
        self.max_steps = Some(n);
        self
    }

    /// Builds the configured [`LocalSearch`].
    #[must_use]
    pub fn build(self) -> LocalSearch {
        LocalSearch {
            max_steps: self.max_steps.unwrap_or(DEFAULT_MAX_STEPS),
        }
    }
}
