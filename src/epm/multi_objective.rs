//! Independent random forests for several objectives.

use nalgebra::DMatrix;

use super::random_forest::{RandomForestConfig, RandomForestWithInstances};
use super::{Prediction, SurrogateModel};
use crate::error::{Error, Result};

/// One [`RandomForestWithInstances`] per named objective.
///
/// The objectives are modelled as uncorrelated: column `i` of the training
/// targets trains forest `i`, and predictions are stacked column-wise in
/// the order of `target_names`. Used with
/// [`ExpectedImprovementPerSecond`](crate::acquisition::ExpectedImprovementPerSecond),
/// which expects the targets `["cost", "runtime"]`.
pub struct UncorrelatedMultiObjectiveRandomForest {
    target_names: Vec<String>,
    types: Vec<usize>,
    instance_features: Option<DMatrix<f64>>,
    forests: Vec<RandomForestWithInstances>,
}

impl UncorrelatedMultiObjectiveRandomForest {
    /// Creates one untrained forest per target name.
    ///
    /// Forest `i` is seeded with `config.seed + i` so the objectives do not
    /// share bootstrap samples.
    pub fn new<I, S>(target_names: I, types: Vec<usize>, config: &RandomForestConfig) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let target_names: Vec<String> = target_names.into_iter().map(Into::into).collect();
        let forests = (0..target_names.len())
            .map(|i| {
                let config = RandomForestConfig {
                    seed: config.seed.wrapping_add(i as u64),
                    ..config.clone()
                };
                RandomForestWithInstances::new(types.clone(), config)
            })
            .collect();
        Self {
            target_names,
            types,
            instance_features: None,
            forests,
        }
    }

    /// Attaches instance features to every per-objective forest.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyInstanceFeatures`] if `features` has no rows
    /// or no columns.
    pub fn with_instance_features(mut self, features: DMatrix<f64>) -> Result<Self> {
        self.forests = self
            .forests
            .into_iter()
            .map(|f| f.with_instance_features(features.clone()))
            .collect::<Result<Vec<_>>>()?;
        self.instance_features = Some(features);
        Ok(self)
    }

    /// Names of the modelled objectives, in output-column order.
    #[must_use]
    pub fn target_names(&self) -> &[String] {
        &self.target_names
    }
}

impl SurrogateModel for UncorrelatedMultiObjectiveRandomForest {
    fn types(&self) -> &[usize] {
        &self.types
    }

    fn instance_features(&self) -> Option<&DMatrix<f64>> {
        self.instance_features.as_ref()
    }

    fn n_outputs(&self) -> usize {
        self.target_names.len()
    }

    fn train(&self, x: &DMatrix<f64>, y: &DMatrix<f64>) -> Result<()> {
        if y.ncols() != self.n_outputs() {
            return Err(Error::ObjectiveDimensionMismatch {
                expected: self.n_outputs(),
                got: y.ncols(),
            });
        }
        for (i, forest) in self.forests.iter().enumerate() {
            let column = DMatrix::from_iterator(y.nrows(), 1, y.column(i).iter().copied());
            forest.train(x, &column)?;
        }
        trace_debug!(objectives = self.forests.len(), "multi-objective forest trained");
        Ok(())
    }

    fn predict(&self, x: &DMatrix<f64>) -> Result<Prediction> {
        let n_outputs = self.n_outputs();
        let mut mean = DMatrix::zeros(x.nrows(), n_outputs);
        let mut variance = DMatrix::zeros(x.nrows(), n_outputs);
        for (i, forest) in self.forests.iter().enumerate() {
            let pred = forest.predict(x)?;
            mean.set_column(i, &pred.mean.column(0));
            variance.set_column(i, &pred.variance.column(0));
        }
        Ok(Prediction { mean, variance })
    }
}
