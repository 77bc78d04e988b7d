//! Acquisition functions: how promising is a configuration under the model?
//!
//! An acquisition function is bound to a trained surrogate and the incumbent
//! value `eta` through [`AcquisitionFunction::update`], after which
//! [`compute`](AcquisitionFunction::compute) scores batches of pure
//! configuration rows. Predictions are always marginalized over the model's
//! instances. Higher values are better.
//!
//! | Function | Model outputs | Utility |
//! |----------|---------------|---------|
//! | [`ExpectedImprovement`] | 1 | `E[max(eta - f(x) - par, 0)]` |
//! | [`ExpectedImprovementPerSecond`] | 2 (`cost`, `log10 runtime`) | EI on the cost divided by the predicted runtime |

use std::sync::Arc;

use nalgebra::DMatrix;

use crate::epm::{Prediction, SurrogateModel};
use crate::error::{Error, Result};
use crate::space::{Configuration, configurations_to_matrix};

/// Scores configurations with a model's predictive distribution.
pub trait AcquisitionFunction: Send + Sync {
    /// Number of model outputs this function consumes.
    fn n_objectives(&self) -> usize {
        1
    }

    /// Bind a (trained) model and the incumbent value.
    fn update(&mut self, model: Arc<dyn SurrogateModel>, eta: f64);

    /// The incumbent value of the last `update`, if any.
    fn eta(&self) -> Option<f64>;

    /// One utility per row of `x` (pure configuration rows).
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnboundModel`] before the first `update`,
    /// [`Error::ObjectiveDimensionMismatch`] if the model predicts the wrong
    /// number of outputs, plus any prediction error of the model.
    fn compute(&self, x: &DMatrix<f64>) -> Result<Vec<f64>>;

    /// [`compute`](Self::compute) for a batch of configurations.
    ///
    /// # Errors
    ///
    /// Same as [`compute`](Self::compute), plus
    /// [`Error::RowWidthMismatch`] for configurations of different lengths
    /// and [`Error::DimensionMismatch`] if `compute` does not return one
    /// value per configuration.
    fn compute_configurations(&self, configs: &[Configuration]) -> Result<Vec<f64>> {
        if configs.is_empty() {
            return Ok(Vec::new());
        }
        let values = self.compute(&configurations_to_matrix(configs)?)?;
        if values.len() != configs.len() {
            return Err(Error::DimensionMismatch {
                expected: configs.len(),
                got: values.len(),
            });
        }
        Ok(values)
    }
}

/// A model and incumbent value bound by `update`.
#[derive(Clone)]
struct Binding {
    model: Arc<dyn SurrogateModel>,
    eta: f64,
}

impl Binding {
    fn predict(&self, x: &DMatrix<f64>, n_objectives: usize) -> Result<Prediction> {
        let pred = self.model.predict_marginalized_over_instances(x)?;
        if pred.n_outputs() != n_objectives {
            return Err(Error::ObjectiveDimensionMismatch {
                expected: n_objectives,
                got: pred.n_outputs(),
            });
        }
        Ok(pred)
    }
}

/// Expected Improvement over the incumbent value.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use nalgebra::DMatrix;
/// use smbo::acquisition::{AcquisitionFunction, ExpectedImprovement};
/// use smbo::epm::{RandomForestConfig, RandomForestWithInstances, SurrogateModel};
///
/// let model = RandomForestWithInstances::new(vec![0], RandomForestConfig::default());
/// let x = DMatrix::from_column_slice(5, 1, &[0.0, 0.25, 0.5, 0.75, 1.0]);
/// let y = DMatrix::from_column_slice(5, 1, &[4.0, 2.0, 1.0, 2.0, 4.0]);
/// model.train(&x, &y).unwrap();
///
/// let mut ei = ExpectedImprovement::new();
/// ei.update(Arc::new(model), 1.0);
/// let values = ei.compute(&x).unwrap();
/// assert!(values.iter().all(|&v| v >= 0.0));
/// ```
#[derive(Clone, Default)]
pub struct ExpectedImprovement {
    par: f64,
    binding: Option<Binding>,
}

impl ExpectedImprovement {
    /// Creates an unbound EI with `par = 0`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the exploration offset `par` subtracted from the improvement.
    #[must_use]
    pub fn par(mut self, par: f64) -> Self {
        self.par = par;
        self
    }
}

impl AcquisitionFunction for ExpectedImprovement {
    fn update(&mut self, model: Arc<dyn SurrogateModel>, eta: f64) {
        self.binding = Some(Binding { model, eta });
    }

    fn eta(&self) -> Option<f64> {
        self.binding.as_ref().map(|b| b.eta)
    }

    fn compute(&self, x: &DMatrix<f64>) -> Result<Vec<f64>> {
        let binding = self.binding.as_ref().ok_or(Error::UnboundModel)?;
        let pred = binding.predict(x, 1)?;
        Ok(pred
            .mean
            .column(0)
            .iter()
            .zip(pred.variance.column(0).iter())
            .map(|(&m, &v)| expected_improvement(m, v.max(0.0).sqrt(), binding.eta, self.par))
            .collect())
    }
}

/// Expected Improvement per Second.
///
/// Requires a two-output model predicting the cost and `log10` of the
/// runtime, such as an
/// [`UncorrelatedMultiObjectiveRandomForest`](crate::epm::UncorrelatedMultiObjectiveRandomForest)
/// trained on [`ObjectiveTransform::Eips`](crate::epm::ObjectiveTransform::Eips)
/// data. The EI of the cost is divided by `10^mean_runtime`.
#[derive(Clone, Default)]
pub struct ExpectedImprovementPerSecond {
    par: f64,
    binding: Option<Binding>,
}

impl ExpectedImprovementPerSecond {
    /// Creates an unbound EIPS with `par = 0`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the exploration offset `par` subtracted from the improvement.
    #[must_use]
    pub fn par(mut self, par: f64) -> Self {
        self.par = par;
        self
    }
}

impl AcquisitionFunction for ExpectedImprovementPerSecond {
    fn n_objectives(&self) -> usize {
        2
    }

    fn update(&mut self, model: Arc<dyn SurrogateModel>, eta: f64) {
        self.binding = Some(Binding { model, eta });
    }

    fn eta(&self) -> Option<f64> {
        self.binding.as_ref().map(|b| b.eta)
    }

    fn compute(&self, x: &DMatrix<f64>) -> Result<Vec<f64>> {
        let binding = self.binding.as_ref().ok_or(Error::UnboundModel)?;
        let pred = binding.predict(x, 2)?;
        Ok((0..pred.n_rows())
            .map(|i| {
                let ei = expected_improvement(
                    pred.mean[(i, 0)],
                    pred.variance[(i, 0)].max(0.0).sqrt(),
                    binding.eta,
                    self.par,
                );
                ei / 10f64.powf(pred.mean[(i, 1)])
            })
            .collect())
    }
}

/// Standard normal PDF.
fn norm_pdf(x: f64) -> f64 {
    const INV_SQRT_2PI: f64 = 0.398_942_280_401_432_7;
    INV_SQRT_2PI * (-0.5 * x * x).exp()
}

/// Standard normal CDF (Hart rational approximation).
fn norm_cdf(x: f64) -> f64 {
    if x < -8.0 {
        return 0.0;
    }
    if x > 8.0 {
        return 1.0;
    }

    let t = 1.0 / (1.0 + 0.231_641_9 * x.abs());
    let poly = t
        * (0.319_381_530
            + t * (-0.356_563_782 + t * (1.781_477_937 + t * (-1.821_255_978 + t * 1.330_274_429))));
    let cdf = 1.0 - norm_pdf(x.abs()) * poly;

    if x >= 0.0 { cdf } else { 1.0 - cdf }
}

/// EI of a Gaussian with the given mean and standard deviation, never
/// negative and exactly zero without uncertainty.
fn expected_improvement(mean: f64, std: f64, eta: f64, par: f64) -> f64 {
    if std <= 0.0 {
        return 0.0;
    }
    let improvement = eta - mean - par;
    let z = improvement / std;
    (improvement * norm_cdf(z) + std * norm_pdf(z)).max(0.0)
}
