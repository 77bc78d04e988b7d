//! Empirical performance models: surrogates predicting the cost of a
//! configuration, optionally on a specific problem instance.
//!
//! # Input layout
//!
//! A model row is a configuration vector followed by an *instance slot*:
//!
//! ```text
//! | configuration (types.len() entries) | instance slot |
//! ```
//!
//! With instance features the slot holds one instance's feature vector.
//! Without them the forest still reserves [`INSTANCE_SLOT_WIDTH`] column(s)
//! so its input shape does not depend on whether instances are known;
//! [`pad_instance_slot`] fills that column with `0.0`.
//!
//! # Marginalization
//!
//! [`SurrogateModel::predict_marginalized_over_instances`] takes pure
//! configurations, predicts each one on every stored instance, and combines
//! the per-instance predictions with the law of total variance:
//!
//! ```text
//! mean     = E_i[mean_i]
//! variance = E_i[var_i] + Var_i[mean_i]
//! ```

mod multi_objective;
mod random_forest;
mod rh2epm;
mod tree;

use nalgebra::DMatrix;

pub use multi_objective::UncorrelatedMultiObjectiveRandomForest;
pub use random_forest::{RandomForestConfig, RandomForestWithInstances};
pub use rh2epm::{MIN_LOG_VALUE, ObjectiveTransform, RunHistory2Epm, TrainingData};

use crate::error::{Error, Result};

/// Width of the reserved instance column when a model has no instance features.
pub const INSTANCE_SLOT_WIDTH: usize = 1;

/// A stacked predictive distribution: one row per query, one column per
/// objective.
#[derive(Clone, Debug, PartialEq)]
pub struct Prediction {
    /// Predictive means, shape `(n, n_outputs)`.
    pub mean: DMatrix<f64>,
    /// Predictive variances, shape `(n, n_outputs)`, never negative.
    pub variance: DMatrix<f64>,
}

impl Prediction {
    /// Number of predicted rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.mean.nrows()
    }

    /// Number of objectives per row.
    #[must_use]
    pub fn n_outputs(&self) -> usize {
        self.mean.ncols()
    }
}

/// A regression model over configuration (+ instance) rows.
///
/// Training and prediction take `&self`; implementations keep their fitted
/// state behind a lock so a trained model can be shared with an
/// acquisition function through an `Arc`.
pub trait SurrogateModel: Send + Sync {
    /// Type descriptor of the configuration part of a row.
    fn types(&self) -> &[usize];

    /// Instance feature vectors, one row per instance.
    fn instance_features(&self) -> Option<&DMatrix<f64>>;

    /// Number of objectives the model predicts.
    fn n_outputs(&self) -> usize {
        1
    }

    /// Width of a pure configuration row.
    fn config_width(&self) -> usize {
        self.types().len()
    }

    /// Width of a full model row: configuration plus instance slot.
    fn input_width(&self) -> usize {
        self.config_width()
            + self
                .instance_features()
                .map_or(INSTANCE_SLOT_WIDTH, |f| f.ncols())
    }

    /// Fit the model.
    ///
    /// `y` has one row per row of `x` and one column per objective.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RowWidthMismatch`] for rows of the wrong width,
    /// [`Error::DimensionMismatch`] if `x` and `y` disagree on the row
    /// count, [`Error::ObjectiveDimensionMismatch`] if `y` has the wrong
    /// number of columns, and [`Error::EmptyTrainingData`] for zero rows.
    fn train(&self, x: &DMatrix<f64>, y: &DMatrix<f64>) -> Result<()>;

    /// Predict mean and variance for full model rows.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RowWidthMismatch`] unless every row has
    /// [`input_width`](Self::input_width) entries, and
    /// [`Error::ModelNotTrained`] before the first successful `train`.
    fn predict(&self, x: &DMatrix<f64>) -> Result<Prediction>;

    /// Predict mean and variance for pure configurations, aggregated over
    /// all stored instances.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RowWidthMismatch`] unless every row has
    /// [`config_width`](Self::config_width) entries, plus any error of
    /// [`predict`](Self::predict).
    fn predict_marginalized_over_instances(&self, x: &DMatrix<f64>) -> Result<Prediction> {
        let width = self.config_width();
        check_row_width(x, width)?;

        let Some(features) = self.instance_features() else {
            return self.predict(&pad_instance_slot(x));
        };

        let n_outputs = self.n_outputs();
        let mut mean = DMatrix::zeros(x.nrows(), n_outputs);
        let mut variance = DMatrix::zeros(x.nrows(), n_outputs);

        for row in 0..x.nrows() {
            let expanded = DMatrix::from_fn(features.nrows(), width + features.ncols(), |i, j| {
                if j < width {
                    x[(row, j)]
                } else {
                    features[(i, j - width)]
                }
            });
            let per_instance = self.predict(&expanded)?;
            if per_instance.n_outputs() != n_outputs {
                return Err(Error::ObjectiveDimensionMismatch {
                    expected: n_outputs,
                    got: per_instance.n_outputs(),
                });
            }
            for out in 0..n_outputs {
                let means: Vec<f64> = per_instance.mean.column(out).iter().copied().collect();
                let vars: Vec<f64> = per_instance.variance.column(out).iter().copied().collect();
                let (m, v) = total_variance(&means, &vars);
                mean[(row, out)] = m;
                variance[(row, out)] = v;
            }
        }

        Ok(Prediction { mean, variance })
    }
}

/// Fail unless every row of `x` has `expected` entries.
///
/// # Errors
///
/// Returns [`Error::RowWidthMismatch`] naming both widths.
pub fn check_row_width(x: &DMatrix<f64>, expected: usize) -> Result<()> {
    if x.ncols() == expected {
        Ok(())
    } else {
        Err(Error::RowWidthMismatch {
            expected,
            got: x.ncols(),
        })
    }
}

/// Append the reserved instance column (filled with `0.0`) to every row.
#[must_use]
pub fn pad_instance_slot(x: &DMatrix<f64>) -> DMatrix<f64> {
    let width = x.ncols();
    DMatrix::from_fn(x.nrows(), width + INSTANCE_SLOT_WIDTH, |i, j| {
        if j < width { x[(i, j)] } else { 0.0 }
    })
}

/// Build full model rows from configurations and a row map.
///
/// Entry `r` of `row_map` is `(configuration index, instance index)`; the
/// instance index selects a row of `instance_features`, or the reserved
/// zero slot when it is `None` and no features exist.
///
/// # Errors
///
/// Returns [`Error::InvalidRowMap`] for an index out of range, or for a
/// missing instance index while instance features are present.
pub fn build_rows(
    configs: &DMatrix<f64>,
    row_map: &[(usize, Option<usize>)],
    instance_features: Option<&DMatrix<f64>>,
) -> Result<DMatrix<f64>> {
    let width = configs.ncols();
    let slot = instance_features.map_or(INSTANCE_SLOT_WIDTH, |f| f.ncols());

    for (row, &(c, inst)) in row_map.iter().enumerate() {
        let instance_ok = match (inst, instance_features) {
            (Some(i), Some(f)) => i < f.nrows(),
            (None, None) => true,
            _ => false,
        };
        if c >= configs.nrows() || !instance_ok {
            return Err(Error::InvalidRowMap { row });
        }
    }

    Ok(DMatrix::from_fn(row_map.len(), width + slot, |r, j| {
        let (c, inst) = row_map[r];
        if j < width {
            configs[(c, j)]
        } else {
            match (inst, instance_features) {
                (Some(i), Some(f)) => f[(i, j - width)],
                _ => 0.0,
            }
        }
    }))
}

/// Combine per-instance predictions: mean of means, and mean of variances
/// plus the population variance of the means.
#[allow(clippy::cast_precision_loss)]
fn total_variance(means: &[f64], variances: &[f64]) -> (f64, f64) {
    if means.is_empty() {
        return (0.0, 0.0);
    }
    let n = means.len() as f64;
    let mean = means.iter().sum::<f64>() / n;
    let expected_var = variances.iter().sum::<f64>() / n;
    let var_of_means = means.iter().map(|m| (m - mean).powi(2)).sum::<f64>() / n;
    (mean, (expected_var + var_of_means).max(0.0))
}
