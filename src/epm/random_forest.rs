//! Random forest surrogate with optional instance features.

use nalgebra::DMatrix;
use parking_lot::RwLock;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::tree::{RegressionTree, mean_variance};
use super::{Prediction, SurrogateModel, build_rows, check_row_width, pad_instance_slot};
use crate::error::{Error, Result};
use crate::rng_util;

/// Configuration for [`RandomForestWithInstances`].
///
/// Use [`Default::default()`] for reasonable settings.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RandomForestConfig {
    /// Number of trees in the forest (default: 10).
    pub n_trees: usize,
    /// Maximum depth of each tree. `None` for unlimited (default: `Some(20)`).
    pub max_depth: Option<usize>,
    /// Minimum samples required to split a node (default: 3).
    pub min_samples_split: usize,
    /// Minimum samples required in a leaf node (default: 3).
    pub min_samples_leaf: usize,
    /// Fraction of features considered at each split (default: 5/6).
    pub ratio_features: f64,
    /// Whether each tree sees a bootstrap sample (default: `true`).
    pub bootstrap: bool,
    /// Random seed for reproducibility (default: 42).
    pub seed: u64,
}

impl Default for RandomForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 10,
            max_depth: Some(20),
            min_samples_split: 3,
            min_samples_leaf: 3,
            ratio_features: 5.0 / 6.0,
            bootstrap: true,
            seed: 42,
        }
    }
}

/// A random forest over `configuration ⧺ instance slot` rows.
///
/// Categorical columns (non-zero entries in the type descriptor) are split
/// one category against the rest; all other columns, including instance
/// features, are split on numeric thresholds. The predictive variance
/// combines the variance inside the leaves with the disagreement between
/// trees.
///
/// # Examples
///
/// ```
/// use nalgebra::DMatrix;
/// use smbo::epm::{RandomForestConfig, RandomForestWithInstances, SurrogateModel};
///
/// let model = RandomForestWithInstances::new(vec![0, 0], RandomForestConfig::default());
///
/// // Two continuous parameters; the reserved instance column is appended for us
/// let x = DMatrix::from_row_slice(4, 2, &[0.1, 0.2, 0.4, 0.4, 0.6, 0.9, 0.8, 0.1]);
/// let y = DMatrix::from_column_slice(4, 1, &[1.0, 2.0, 3.0, 4.0]);
/// model.train(&x, &y).unwrap();
///
/// let pred = model.predict_marginalized_over_instances(&x).unwrap();
/// assert_eq!(pred.mean.shape(), (4, 1));
/// ```
pub struct RandomForestWithInstances {
    types: Vec<usize>,
    instance_features: Option<DMatrix<f64>>,
    config: RandomForestConfig,
    forest: RwLock<Option<Vec<RegressionTree>>>,
}

impl RandomForestWithInstances {
    /// Creates an untrained forest for configurations described by `types`.
    #[must_use]
    pub fn new(types: Vec<usize>, config: RandomForestConfig) -> Self {
        Self {
            types,
            instance_features: None,
            config,
            forest: RwLock::new(None),
        }
    }

    /// Attaches instance feature vectors, one row per instance.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyInstanceFeatures`] if `features` has no rows
    /// or no columns.
    pub fn with_instance_features(mut self, features: DMatrix<f64>) -> Result<Self> {
        if features.nrows() == 0 || features.ncols() == 0 {
            return Err(Error::EmptyInstanceFeatures);
        }
        self.instance_features = Some(features);
        *self.forest.get_mut() = None;
        Ok(self)
    }

    /// The forest configuration.
    #[must_use]
    pub fn config(&self) -> &RandomForestConfig {
        &self.config
    }

    /// Returns `true` once the forest has been trained.
    #[must_use]
    pub fn is_trained(&self) -> bool {
        self.forest.read().is_some()
    }

    /// Train from pure configurations plus a `(configuration, instance)`
    /// row map, building the model rows internally.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RowWidthMismatch`] if `configs` is not
    /// configuration-wide, [`Error::InvalidRowMap`] for a bad row map
    /// entry, plus any error of [`train`](SurrogateModel::train).
    pub fn train_mapped(
        &self,
        configs: &DMatrix<f64>,
        row_map: &[(usize, Option<usize>)],
        y: &DMatrix<f64>,
    ) -> Result<()> {
        check_row_width(configs, self.config_width())?;
        let x = build_rows(configs, row_map, self.instance_features.as_ref())?;
        self.train(&x, y)
    }

    /// Predict a single full model row.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RowWidthMismatch`] unless `row` has
    /// [`input_width`](SurrogateModel::input_width) entries, and
    /// [`Error::ModelNotTrained`] before training.
    pub fn predict_row(&self, row: &[f64]) -> Result<(f64, f64)> {
        let expected = self.input_width();
        if row.len() != expected {
            return Err(Error::RowWidthMismatch {
                expected,
                got: row.len(),
            });
        }
        let forest = self.forest.read();
        let trees = forest.as_ref().ok_or(Error::ModelNotTrained)?;
        Ok(combine_trees(trees, row))
    }

    fn feature_types(&self) -> Vec<usize> {
        let slot = self.input_width() - self.config_width();
        self.types
            .iter()
            .copied()
            .chain(core::iter::repeat_n(0, slot))
            .collect()
    }
}

impl SurrogateModel for RandomForestWithInstances {
    fn types(&self) -> &[usize] {
        &self.types
    }

    fn instance_features(&self) -> Option<&DMatrix<f64>> {
        self.instance_features.as_ref()
    }

    fn train(&self, x: &DMatrix<f64>, y: &DMatrix<f64>) -> Result<()> {
        let x = if self.instance_features.is_none() && x.ncols() == self.config_width() {
            pad_instance_slot(x)
        } else {
            check_row_width(x, self.input_width())?;
            x.clone()
        };
        if y.nrows() != x.nrows() {
            return Err(Error::DimensionMismatch {
                expected: x.nrows(),
                got: y.nrows(),
            });
        }
        if y.ncols() != 1 {
            return Err(Error::ObjectiveDimensionMismatch {
                expected: 1,
                got: y.ncols(),
            });
        }
        if x.nrows() == 0 {
            return Err(Error::EmptyTrainingData);
        }

        let data: Vec<Vec<f64>> = x
            .row_iter()
            .map(|r| r.iter().copied().collect())
            .collect();
        let targets: Vec<f64> = y.column(0).iter().copied().collect();
        let feature_types = self.feature_types();
        let n_samples = data.len();

        let mut master = fastrand::Rng::with_seed(self.config.seed);
        let trees: Vec<RegressionTree> = (0..self.config.n_trees.max(1))
            .map(|_| {
                let mut rng = fastrand::Rng::with_seed(rng_util::child_seed(&mut master));
                let indices: Vec<usize> = if self.config.bootstrap {
                    (0..n_samples).map(|_| rng.usize(0..n_samples)).collect()
                } else {
                    (0..n_samples).collect()
                };
                RegressionTree::build(
                    &data,
                    &targets,
                    &indices,
                    &feature_types,
                    &self.config,
                    &mut rng,
                )
            })
            .collect();

        trace_debug!(
            n_samples,
            n_trees = trees.len(),
            width = feature_types.len(),
            "random forest trained"
        );

        *self.forest.write() = Some(trees);
        Ok(())
    }

    fn predict(&self, x: &DMatrix<f64>) -> Result<Prediction> {
        check_row_width(x, self.input_width())?;
        let mut mean = DMatrix::zeros(x.nrows(), 1);
        let mut variance = DMatrix::zeros(x.nrows(), 1);
        for (i, row) in x.row_iter().enumerate() {
            let row: Vec<f64> = row.iter().copied().collect();
            let (m, v) = self.predict_row(&row)?;
            mean[(i, 0)] = m;
            variance[(i, 0)] = v;
        }
        Ok(Prediction { mean, variance })
    }
}

/// Law of total variance across trees: mean of tree means, and mean leaf
/// variance plus the variance of the tree means.
fn combine_trees(trees: &[RegressionTree], row: &[f64]) -> (f64, f64) {
    let preds: Vec<(f64, f64)> = trees.iter().map(|t| t.predict(row)).collect();
    let (mean, spread) = mean_variance(preds.iter().map(|p| p.0));
    let (within, _) = mean_variance(preds.iter().map(|p| p.1));
    (mean, (within + spread).max(0.0))
}
