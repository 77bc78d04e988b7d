//! Configuration spaces, configurations, and their neighborhoods.
//!
//! A [`Configuration`] is a plain vector with one entry per parameter:
//! numeric parameters live in `[0, 1]`, categorical parameters hold their
//! choice index. The [`SearchSpace`] trait is everything the optimizer
//! needs from a space: the type descriptor, uniform sampling, and a
//! one-exchange neighborhood for local search.
//!
//! ```
//! use smbo::parameter::Hyperparameter;
//! use smbo::space::{ConfigurationSpace, SearchSpace};
//!
//! let space = ConfigurationSpace::new()
//!     .add("x", Hyperparameter::float(-5.0, 10.0).unwrap())
//!     .unwrap()
//!     .add("solver", Hyperparameter::categorical(["cg", "lbfgs", "newton"]).unwrap())
//!     .unwrap();
//!
//! assert_eq!(space.types(), vec![0, 3]);
//!
//! let mut rng = fastrand::Rng::with_seed(1);
//! let configs = space.sample_configurations(5, &mut rng).unwrap();
//! assert!(configs.iter().all(|c| space.validate(c).is_ok()));
//! ```

use core::hash::{Hash, Hasher};

use nalgebra::DMatrix;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::parameter::{Hyperparameter, ParamValue};
use crate::rng_util;

/// Default number of Gaussian neighbors drawn per numeric parameter.
const DEFAULT_CONTINUOUS_NEIGHBORS: usize = 4;
/// Standard deviation of a continuous neighbor step (in normalized units).
const NEIGHBOR_STDDEV: f64 = 0.2;
/// Redraws before a continuous neighbor is clamped into `[0, 1]`.
const MAX_NEIGHBOR_REDRAWS: usize = 10;

/// One point of a configuration space in its vector encoding.
///
/// Equality and hashing compare the exact bit patterns of the entries, so
/// a configuration can key a `HashMap`.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Configuration {
    vector: Vec<f64>,
}

impl Configuration {
    /// Wraps a vector encoding.
    #[must_use]
    pub fn new(vector: Vec<f64>) -> Self {
        Self { vector }
    }

    /// The vector encoding.
    #[must_use]
    pub fn vector(&self) -> &[f64] {
        &self.vector
    }

    /// Number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vector.len()
    }

    /// Returns `true` for a configuration over an empty space.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vector.is_empty()
    }

    /// Consumes the configuration, returning its vector.
    #[must_use]
    pub fn into_vector(self) -> Vec<f64> {
        self.vector
    }
}

impl PartialEq for Configuration {
    fn eq(&self, other: &Self) -> bool {
        self.vector.len() == other.vector.len()
            && self
                .vector
                .iter()
                .zip(&other.vector)
                .all(|(a, b)| a.to_bits() == b.to_bits())
    }
}

impl Eq for Configuration {}

impl Hash for Configuration {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.vector.len().hash(state);
        for v in &self.vector {
            v.to_bits().hash(state);
        }
    }
}

/// Stack configurations into a matrix, one row per configuration.
///
/// # Errors
///
/// Returns [`Error::RowWidthMismatch`] if the configurations differ in length.
pub fn configurations_to_matrix(configs: &[Configuration]) -> Result<DMatrix<f64>> {
    let width = configs.first().map_or(0, Configuration::len);
    if let Some(bad) = configs.iter().find(|c| c.len() != width) {
        return Err(Error::RowWidthMismatch {
            expected: width,
            got: bad.len(),
        });
    }
    Ok(DMatrix::from_fn(configs.len(), width, |i, j| {
        configs[i].vector[j]
    }))
}

/// What the optimizer requires from a configuration space.
///
/// All randomness comes from the caller's generator so that a fixed seed
/// reproduces the whole search.
pub trait SearchSpace: Send + Sync {
    /// Type descriptor: `0` per continuous parameter, the category count per
    /// categorical parameter.
    fn types(&self) -> Vec<usize>;

    /// Draw `n` valid configurations uniformly at random.
    ///
    /// # Errors
    ///
    /// Implementations may fail if the space cannot produce valid samples.
    fn sample_configurations(
        &self,
        n: usize,
        rng: &mut fastrand::Rng,
    ) -> Result<Vec<Configuration>>;

    /// Enumerate the one-parameter neighbors of `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigurationSpace`] if `config` is not valid.
    fn neighbors(
        &self,
        config: &Configuration,
        rng: &mut fastrand::Rng,
    ) -> Result<Vec<Configuration>>;

    /// The configuration evaluated before any model exists.
    fn default_configuration(&self) -> Configuration;
}

/// An ordered set of named hyperparameters.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConfigurationSpace {
    params: Vec<(String, Hyperparameter)>,
    continuous_neighbors: Option<usize>,
}

impl ConfigurationSpace {
    /// Creates an empty space.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a parameter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateParameter`] if `name` is already taken.
    pub fn add(mut self, name: impl Into<String>, param: Hyperparameter) -> Result<Self> {
        let name = name.into();
        if self.params.iter().any(|(n, _)| *n == name) {
            return Err(Error::DuplicateParameter(name));
        }
        self.params.push((name, param));
        Ok(self)
    }

    /// Sets how many Gaussian neighbors each numeric parameter contributes.
    ///
    /// Default: 4.
    #[must_use]
    pub fn continuous_neighbors(mut self, n: usize) -> Self {
        self.continuous_neighbors = Some(n);
        self
    }

    /// Number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Returns `true` if the space has no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Parameter names in vector order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(|(n, _)| n.as_str())
    }

    /// Looks up a parameter by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Hyperparameter> {
        self.params.iter().find(|(n, _)| n == name).map(|(_, p)| p)
    }

    /// Checks a configuration against the space.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigurationSpace`] on a length mismatch or an
    /// out-of-range entry.
    pub fn validate(&self, config: &Configuration) -> Result<()> {
        if config.len() != self.params.len() {
            return Err(Error::ConfigurationSpace(format!(
                "configuration has {} entries but the space has {} parameters",
                config.len(),
                self.params.len()
            )));
        }
        for ((name, param), &v) in self.params.iter().zip(config.vector()) {
            if !param.is_valid_vector(v) {
                return Err(Error::ConfigurationSpace(format!(
                    "entry {v} is not a valid encoding for parameter '{name}'"
                )));
            }
        }
        Ok(())
    }

    /// Decodes a configuration into parameter values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigurationSpace`] if the configuration is invalid.
    pub fn values(&self, config: &Configuration) -> Result<Vec<ParamValue>> {
        self.validate(config)?;
        Ok(self
            .params
            .iter()
            .zip(config.vector())
            .map(|((_, p), &v)| p.from_vector(v))
            .collect())
    }

    /// Encodes parameter values, given in vector order, into a configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigurationSpace`] on a count mismatch or an
    /// invalid value.
    pub fn configuration(&self, values: &[ParamValue]) -> Result<Configuration> {
        if values.len() != self.params.len() {
            return Err(Error::ConfigurationSpace(format!(
                "got {} values for {} parameters",
                values.len(),
                self.params.len()
            )));
        }
        let vector = self
            .params
            .iter()
            .zip(values)
            .map(|((_, p), v)| p.to_vector(v))
            .collect::<Result<Vec<f64>>>()?;
        Ok(Configuration::new(vector))
    }

    fn continuous_neighbor(value: f64, rng: &mut fastrand::Rng) -> f64 {
        for _ in 0..MAX_NEIGHBOR_REDRAWS {
            let candidate = value + NEIGHBOR_STDDEV * rng_util::standard_normal(rng);
            if (0.0..=1.0).contains(&candidate) {
                return candidate;
            }
        }
        (value + NEIGHBOR_STDDEV * rng_util::standard_normal(rng)).clamp(0.0, 1.0)
    }
}

impl SearchSpace for ConfigurationSpace {
    fn types(&self) -> Vec<usize> {
        self.params.iter().map(|(_, p)| p.type_code()).collect()
    }

    fn sample_configurations(
        &self,
        n: usize,
        rng: &mut fastrand::Rng,
    ) -> Result<Vec<Configuration>> {
        Ok((0..n)
            .map(|_| {
                Configuration::new(self.params.iter().map(|(_, p)| p.sample_vector(rng)).collect())
            })
            .collect())
    }

    #[allow(clippy::cast_precision_loss, clippy::float_cmp)]
    fn neighbors(
        &self,
        config: &Configuration,
        rng: &mut fastrand::Rng,
    ) -> Result<Vec<Configuration>> {
        self.validate(config)?;
        let n_continuous = self
            .continuous_neighbors
            .unwrap_or(DEFAULT_CONTINUOUS_NEIGHBORS);

        let mut neighbors = Vec::new();
        let mut push_with = |i: usize, value: f64| {
            let mut vector = config.vector.clone();
            vector[i] = value;
            neighbors.push(Configuration::new(vector));
        };

        for (i, (_, param)) in self.params.iter().enumerate() {
            let current = config.vector[i];
            match param {
                Hyperparameter::Float { .. } => {
                    for _ in 0..n_continuous {
                        let value = Self::continuous_neighbor(current, rng);
                        if value != current {
                            push_with(i, value);
                        }
                    }
                }
                Hyperparameter::Int { .. } => {
                    for value in param.adjacent_int_vectors(current) {
                        push_with(i, value);
                    }
                }
                Hyperparameter::Categorical { choices } => {
                    for c in 0..choices.len() {
                        let value = c as f64;
                        if value != current {
                            push_with(i, value);
                        }
                    }
                }
            }
        }

        Ok(neighbors)
    }

    fn default_configuration(&self) -> Configuration {
        Configuration::new(self.params.iter().map(|(_, p)| p.default_vector()).collect())
    }
}
