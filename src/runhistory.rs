//! In-memory record of every target-algorithm run.
//!
//! The [`RunHistory`] is the store the optimization loop writes to and the
//! observation transformer reads from. It is a thin wrapper around a
//! `Vec<RunRecord>` behind a read-write lock, so it can be shared through
//! an `Arc` and appended to through `&self`.

use std::collections::HashMap;

use parking_lot::{RwLock, RwLockReadGuard};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::space::Configuration;
use crate::types::StatusType;

/// One finished run of the target algorithm.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RunRecord {
    /// The configuration that was run.
    pub configuration: Configuration,
    /// The problem instance, if the scenario has instances.
    pub instance: Option<String>,
    /// The seed passed to the target algorithm.
    pub seed: u64,
    /// Cost reported by the run (runtime or quality, lower is better).
    pub cost: f64,
    /// Wall-clock runtime of the run in seconds.
    pub runtime: f64,
    /// How the run ended.
    pub status: StatusType,
    /// Free-form metadata returned by the runner.
    #[cfg_attr(feature = "serde", serde(default))]
    pub additional_info: HashMap<String, String>,
}

impl RunRecord {
    /// Creates a successful run record without metadata.
    #[must_use]
    pub fn new(configuration: Configuration, instance: Option<String>, cost: f64, runtime: f64) -> Self {
        Self {
            configuration,
            instance,
            seed: 0,
            cost,
            runtime,
            status: StatusType::Success,
            additional_info: HashMap::new(),
        }
    }

    /// Sets the status of the run.
    #[must_use]
    pub fn with_status(mut self, status: StatusType) -> Self {
        self.status = status;
        self
    }

    /// Sets the seed of the run.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Append-only store of run records.
#[derive(Debug, Default)]
pub struct RunHistory {
    runs: RwLock<Vec<RunRecord>>,
}

impl RunHistory {
    /// Creates an empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a history pre-populated with `runs`.
    #[must_use]
    pub fn with_runs(runs: Vec<RunRecord>) -> Self {
        Self {
            runs: RwLock::new(runs),
        }
    }

    /// Appends a run.
    pub fn add(&self, run: RunRecord) {
        self.runs.write().push(run);
    }

    /// Read access to all runs in insertion order.
    pub fn runs(&self) -> RwLockReadGuard<'_, Vec<RunRecord>> {
        self.runs.read()
    }

    /// Number of recorded runs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.runs.read().len()
    }

    /// Returns `true` if nothing has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.runs.read().is_empty()
    }

    /// Returns `true` if `config` has been run at least once.
    #[must_use]
    pub fn contains(&self, config: &Configuration) -> bool {
        self.runs.read().iter().any(|r| r.configuration == *config)
    }

    /// Distinct configurations in first-seen order.
    #[must_use]
    pub fn configurations(&self) -> Vec<Configuration> {
        let runs = self.runs.read();
        let mut seen = HashMap::new();
        let mut configs = Vec::new();
        for run in runs.iter() {
            seen.entry(&run.configuration).or_insert_with(|| {
                configs.push(run.configuration.clone());
            });
        }
        configs
    }

    /// Mean cost over all runs of `config`, or `None` if it was never run.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn cost(&self, config: &Configuration) -> Option<f64> {
        let runs = self.runs.read();
        let (sum, n) = runs
            .iter()
            .filter(|r| r.configuration == *config)
            .fold((0.0, 0usize), |(s, n), r| (s + r.cost, n + 1));
        (n > 0).then(|| sum / n as f64)
    }

    /// The configuration with the lowest mean cost and that cost.
    ///
    /// Every run counts at its reported cost. Ties go to the configuration
    /// that was run first.
    #[must_use]
    pub fn incumbent(&self) -> Option<(Configuration, f64)> {
        self.incumbent_by(|run| Some(run.cost))
    }

    /// Like [`incumbent`](Self::incumbent), but each run is charged
    /// `charge(run)`; runs charged `None` are ignored.
    #[allow(clippy::cast_precision_loss)]
    pub fn incumbent_by<F>(&self, charge: F) -> Option<(Configuration, f64)>
    where
        F: Fn(&RunRecord) -> Option<f64>,
    {
        let runs = self.runs.read();
        let mut order: Vec<&Configuration> = Vec::new();
        let mut totals: HashMap<&Configuration, (f64, usize)> = HashMap::new();
        for run in runs.iter() {
            let Some(cost) = charge(run) else {
                continue;
            };
            let entry = totals.entry(&run.configuration).or_insert_with(|| {
                order.push(&run.configuration);
                (0.0, 0)
            });
            entry.0 += cost;
            entry.1 += 1;
        }

        let mut best: Option<(&Configuration, f64)> = None;
        for config in order {
            let (sum, n) = totals[config];
            let mean = sum / n as f64;
            if best.is_none_or(|(_, b)| mean < b) {
                best = Some((config, mean));
            }
        }
        best.map(|(c, v)| (c.clone(), v))
    }
}
