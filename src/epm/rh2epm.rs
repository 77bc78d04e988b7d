//! Observation transformer: turns a [`RunHistory`] into training matrices.
//!
//! Every considered run becomes one training row
//! `configuration ⧺ instance slot`, and one target row whose layout depends
//! on the [`ObjectiveTransform`]:
//!
//! | Transform | Target columns |
//! |-----------|----------------|
//! | `Cost` | `cost` |
//! | `LogCost` | `log10(cost)` |
//! | `Eips` | `cost`, `log10(runtime)` |
//!
//! Log transforms clamp at [`MIN_LOG_VALUE`] so zero-cost runs stay finite.

use std::collections::HashMap;

use nalgebra::DMatrix;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::build_rows;
use crate::error::{Error, Result};
use crate::runhistory::{RunHistory, RunRecord};
use crate::space::{Configuration, configurations_to_matrix};
use crate::types::StatusType;

/// Smallest value passed to `log10`.
pub const MIN_LOG_VALUE: f64 = 1e-4;

/// Default penalty factor for runs that hit the cutoff.
const DEFAULT_PAR_FACTOR: f64 = 1.0;

/// How run results are turned into model targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ObjectiveTransform {
    /// Model the cost as-is (quality objectives).
    Cost,
    /// Model `log10(cost)` (runtime objectives).
    #[default]
    LogCost,
    /// Model the cost and `log10(runtime)` as two objectives.
    Eips,
}

impl ObjectiveTransform {
    /// Number of target columns produced.
    #[must_use]
    pub fn n_objectives(self) -> usize {
        match self {
            Self::Cost | Self::LogCost => 1,
            Self::Eips => 2,
        }
    }
}

/// Output of [`RunHistory2Epm::transform`].
#[derive(Clone, Debug)]
pub struct TrainingData {
    /// Distinct configurations in first-seen order.
    pub configurations: Vec<Configuration>,
    /// Full model rows, one per considered run.
    pub x: DMatrix<f64>,
    /// Targets, one row per row of `x`.
    pub y: DMatrix<f64>,
    /// For each row of `x`: the index into `configurations` and the instance
    /// index (into the instance-feature matrix) it was built from.
    pub row_map: Vec<(usize, Option<usize>)>,
}

impl TrainingData {
    /// Number of training rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.row_map.len()
    }

    /// Returns `true` if no run was considered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.row_map.is_empty()
    }
}

/// Builds training data for a surrogate model from recorded runs.
///
/// # Examples
///
/// ```
/// use smbo::epm::{ObjectiveTransform, RunHistory2Epm};
/// use smbo::runhistory::{RunHistory, RunRecord};
/// use smbo::space::Configuration;
///
/// let rh = RunHistory::new();
/// rh.add(RunRecord::new(Configuration::new(vec![0.5, 0.5]), None, 100.0, 1.0));
///
/// let data = RunHistory2Epm::new(ObjectiveTransform::LogCost)
///     .transform(&rh, 2)
///     .unwrap();
/// assert_eq!(data.x.shape(), (1, 3));
/// assert!((data.y[(0, 0)] - 2.0).abs() < 1e-12);
/// ```
#[derive(Clone, Debug)]
pub struct RunHistory2Epm {
    transform: ObjectiveTransform,
    instances: HashMap<String, usize>,
    instance_features: Option<DMatrix<f64>>,
    considered_statuses: Vec<StatusType>,
    cutoff: Option<f64>,
    par_factor: f64,
}

impl RunHistory2Epm {
    /// Creates a transformer without instance features.
    ///
    /// All statuses except [`StatusType::Abort`] are considered.
    #[must_use]
    pub fn new(transform: ObjectiveTransform) -> Self {
        Self {
            transform,
            instances: HashMap::new(),
            instance_features: None,
            considered_statuses: vec![
                StatusType::Success,
                StatusType::Timeout,
                StatusType::Crashed,
                StatusType::Memout,
            ],
            cutoff: None,
            par_factor: DEFAULT_PAR_FACTOR,
        }
    }

    /// Maps instance ids to rows of `features`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyInstanceFeatures`] for an empty matrix and
    /// [`Error::DimensionMismatch`] if the number of ids differs from the
    /// number of feature rows.
    pub fn with_instance_features<I, S>(mut self, ids: I, features: DMatrix<f64>) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if features.nrows() == 0 || features.ncols() == 0 {
            return Err(Error::EmptyInstanceFeatures);
        }
        let instances: HashMap<String, usize> = ids
            .into_iter()
            .enumerate()
            .map(|(i, id)| (id.into(), i))
            .collect();
        if instances.len() != features.nrows() {
            return Err(Error::DimensionMismatch {
                expected: features.nrows(),
                got: instances.len(),
            });
        }
        self.instances = instances;
        self.instance_features = Some(features);
        Ok(self)
    }

    /// Restricts which run statuses become training rows.
    #[must_use]
    pub fn considered_statuses(mut self, statuses: impl Into<Vec<StatusType>>) -> Self {
        self.considered_statuses = statuses.into();
        self
    }

    /// Sets the runtime cutoff; timed-out runs are charged
    /// `par_factor * cutoff`.
    #[must_use]
    pub fn cutoff(mut self, cutoff: f64) -> Self {
        self.cutoff = Some(cutoff);
        self
    }

    /// Sets the penalty factor for timed-out runs (default: 1).
    #[must_use]
    pub fn par_factor(mut self, par_factor: f64) -> Self {
        self.par_factor = par_factor;
        self
    }

    /// The objective transform in use.
    #[must_use]
    pub fn objective_transform(&self) -> ObjectiveTransform {
        self.transform
    }

    /// Instance features, one row per instance.
    #[must_use]
    pub fn instance_feature_matrix(&self) -> Option<&DMatrix<f64>> {
        self.instance_features.as_ref()
    }

    /// Maps a raw cost into the space of the first target column.
    #[must_use]
    pub fn transform_cost(&self, cost: f64) -> f64 {
        match self.transform {
            ObjectiveTransform::LogCost => cost.max(MIN_LOG_VALUE).log10(),
            ObjectiveTransform::Cost | ObjectiveTransform::Eips => cost,
        }
    }

    /// The raw cost `run` contributes to training, or `None` if its status
    /// is not considered. Timeouts are charged `par_factor * cutoff` when a
    /// cutoff is set.
    fn charged_cost(&self, run: &RunRecord) -> Option<f64> {
        if !self.considered_statuses.contains(&run.status) {
            return None;
        }
        Some(match (run.status, self.cutoff) {
            (StatusType::Timeout, Some(cutoff)) => self.par_factor * cutoff,
            _ => run.cost,
        })
    }

    /// The configuration with the lowest mean charged cost, and that cost
    /// before [`transform_cost`](Self::transform_cost).
    ///
    /// Only runs that become training rows count, at the cost their
    /// targets are built from.
    #[must_use]
    pub fn incumbent(&self, run_history: &RunHistory) -> Option<(Configuration, f64)> {
        run_history.incumbent_by(|run| self.charged_cost(run))
    }

    /// Builds training rows and targets from `run_history`.
    ///
    /// `config_width` fixes the row width when the history is empty and is
    /// checked against every recorded configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RowWidthMismatch`] for a configuration of the wrong
    /// length and [`Error::UnknownInstance`] for a run on an instance
    /// without features.
    pub fn transform(&self, run_history: &RunHistory, config_width: usize) -> Result<TrainingData> {
        let runs = run_history.runs();
        let mut index: HashMap<&Configuration, usize> = HashMap::new();
        let mut configurations = Vec::new();
        let mut row_map = Vec::new();
        let mut targets: Vec<f64> = Vec::new();

        for (run, cost) in runs
            .iter()
            .filter_map(|r| self.charged_cost(r).map(|cost| (r, cost)))
        {
            if run.configuration.len() != config_width {
                return Err(Error::RowWidthMismatch {
                    expected: config_width,
                    got: run.configuration.len(),
                });
            }
            let c = *index.entry(&run.configuration).or_insert_with(|| {
                configurations.push(run.configuration.clone());
                configurations.len() - 1
            });
            let instance = match &self.instance_features {
                None => None,
                Some(_) => Some(
                    run.instance
                        .as_deref()
                        .and_then(|id| self.instances.get(id).copied())
                        .ok_or_else(|| Error::UnknownInstance(run.instance.clone()))?,
                ),
            };
            row_map.push((c, instance));

            targets.push(self.transform_cost(cost));
            if self.transform == ObjectiveTransform::Eips {
                targets.push(run.runtime.max(MIN_LOG_VALUE).log10());
            }
        }

        let configs = if configurations.is_empty() {
            DMatrix::zeros(0, config_width)
        } else {
            configurations_to_matrix(&configurations)?
        };
        let x = build_rows(&configs, &row_map, self.instance_features.as_ref())?;
        let y = DMatrix::from_row_slice(row_map.len(), self.transform.n_objectives(), &targets);

        trace_debug!(
            rows = row_map.len(),
            configurations = configurations.len(),
            "run history transformed"
        );

        Ok(TrainingData {
            configurations,
            x,
            y,
            row_map,
        })
    }
}
