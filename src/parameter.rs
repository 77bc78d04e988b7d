//! Hyperparameter definitions and their vector encoding.
//!
//! Every hyperparameter maps its values into a single `f64` slot of a
//! configuration vector:
//!
//! | Kind | Vector value | Type descriptor entry |
//! |------|--------------|-----------------------|
//! | [`Hyperparameter::Float`] | position in `[0, 1]` (log space when `log`) | `0` |
//! | [`Hyperparameter::Int`] | position in `[0, 1]` (log space when `log`) | `0` |
//! | [`Hyperparameter::Categorical`] | choice index `0..k` | `k` |
//!
//! ```
//! use smbo::parameter::{Hyperparameter, ParamValue};
//!
//! let lr = Hyperparameter::log_float(1e-5, 1e-1).unwrap();
//! let v = lr.to_vector(&ParamValue::Float(1e-3)).unwrap();
//! assert!((v - 0.5).abs() < 1e-12);
//! ```

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::rng_util;

/// A decoded parameter value.
///
/// For categorical parameters, the `Categorical` variant stores the index
/// into the choices array.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ParamValue {
    /// A floating-point parameter value.
    Float(f64),
    /// An integer parameter value.
    Int(i64),
    /// A categorical parameter value, stored as an index into the choices array.
    Categorical(usize),
}

/// A single tunable parameter of a configuration space.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Hyperparameter {
    /// A real-valued parameter in `[low, high]`.
    Float {
        /// Lower bound (inclusive).
        low: f64,
        /// Upper bound (inclusive).
        high: f64,
        /// Whether values are spread uniformly in log space.
        log: bool,
    },
    /// An integer parameter in `[low, high]`.
    Int {
        /// Lower bound (inclusive).
        low: i64,
        /// Upper bound (inclusive).
        high: i64,
        /// Whether values are spread uniformly in log space.
        log: bool,
    },
    /// An unordered choice among named categories.
    Categorical {
        /// The category labels.
        choices: Vec<String>,
    },
}

impl Hyperparameter {
    /// Creates a float parameter on a linear scale.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBounds`] unless `low < high`.
    pub fn float(low: f64, high: f64) -> Result<Self> {
        check_float_bounds(low, high)?;
        Ok(Self::Float {
            low,
            high,
            log: false,
        })
    }

    /// Creates a float parameter on a log scale.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBounds`] unless `low < high`, and
    /// [`Error::InvalidLogBounds`] if `low` is not positive.
    pub fn log_float(low: f64, high: f64) -> Result<Self> {
        check_float_bounds(low, high)?;
        if low <= 0.0 {
            return Err(Error::InvalidLogBounds);
        }
        Ok(Self::Float {
            low,
            high,
            log: true,
        })
    }

    /// Creates an integer parameter on a linear scale.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBounds`] unless `low < high`.
    #[allow(clippy::cast_precision_loss)]
    pub fn int(low: i64, high: i64) -> Result<Self> {
        if low >= high {
            return Err(Error::InvalidBounds {
                low: low as f64,
                high: high as f64,
            });
        }
        Ok(Self::Int {
            low,
            high,
            log: false,
        })
    }

    /// Creates an integer parameter on a log scale.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBounds`] unless `low < high`, and
    /// [`Error::InvalidLogBounds`] if `low < 1`.
    pub fn log_int(low: i64, high: i64) -> Result<Self> {
        Self::int(low, high)?;
        if low < 1 {
            return Err(Error::InvalidLogBounds);
        }
        Ok(Self::Int {
            low,
            high,
            log: true,
        })
    }

    /// Creates a categorical parameter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyChoices`] if `choices` is empty.
    pub fn categorical<I, S>(choices: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let choices: Vec<String> = choices.into_iter().map(Into::into).collect();
        if choices.is_empty() {
            return Err(Error::EmptyChoices);
        }
        Ok(Self::Categorical { choices })
    }

    /// The type descriptor entry: `0` for numeric parameters, the number of
    /// categories otherwise.
    #[must_use]
    pub fn type_code(&self) -> usize {
        match self {
            Self::Float { .. } | Self::Int { .. } => 0,
            Self::Categorical { choices } => choices.len(),
        }
    }

    /// Encodes a value into its configuration-vector representation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigurationSpace`] if the value has the wrong kind
    /// or lies outside the parameter's range.
    #[allow(clippy::cast_precision_loss)]
    pub fn to_vector(&self, value: &ParamValue) -> Result<f64> {
        match (self, value) {
            (Self::Float { low, high, .. }, ParamValue::Float(v)) => {
                if !(low..=high).contains(&v) {
                    return Err(Error::ConfigurationSpace(format!(
                        "value {v} outside [{low}, {high}]"
                    )));
                }
                let (lo, hi) = self.internal_bounds();
                Ok(to_normalized(self.to_internal(*v), lo, hi))
            }
            (Self::Int { low, high, .. }, ParamValue::Int(v)) => {
                if !(low..=high).contains(&v) {
                    return Err(Error::ConfigurationSpace(format!(
                        "value {v} outside [{low}, {high}]"
                    )));
                }
                let (lo, hi) = self.internal_bounds();
                Ok(to_normalized(self.to_internal(*v as f64), lo, hi))
            }
            (Self::Categorical { choices }, ParamValue::Categorical(i)) => {
                if *i >= choices.len() {
                    return Err(Error::ConfigurationSpace(format!(
                        "category index {i} out of range for {} choices",
                        choices.len()
                    )));
                }
                Ok(*i as f64)
            }
            _ => Err(Error::ConfigurationSpace(format!(
                "value {value:?} does not match parameter kind"
            ))),
        }
    }

    /// Decodes a configuration-vector entry back into a value.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    #[must_use]
    pub fn from_vector(&self, value: f64) -> ParamValue {
        match self {
            Self::Float { low, high, log } => {
                let (lo, hi) = self.internal_bounds();
                let v = from_normalized(value.clamp(0.0, 1.0), lo, hi);
                let v = if *log { v.exp() } else { v };
                ParamValue::Float(v.clamp(*low, *high))
            }
            Self::Int { low, high, log } => {
                let (lo, hi) = self.internal_bounds();
                let v = from_normalized(value.clamp(0.0, 1.0), lo, hi);
                let v = if *log { v.exp() } else { v };
                ParamValue::Int((v.round() as i64).clamp(*low, *high))
            }
            Self::Categorical { choices } => {
                ParamValue::Categorical((value.round().max(0.0) as usize).min(choices.len().saturating_sub(1)))
            }
        }
    }

    /// Checks that a vector entry is a legal encoding for this parameter.
    #[allow(clippy::cast_precision_loss, clippy::float_cmp)]
    pub(crate) fn is_valid_vector(&self, value: f64) -> bool {
        match self {
            Self::Float { .. } | Self::Int { .. } => value.is_finite() && (0.0..=1.0).contains(&value),
            Self::Categorical { choices } => {
                value.is_finite()
                    && value >= 0.0
                    && value.fract() == 0.0
                    && value < choices.len() as f64
            }
        }
    }

    /// Draws a uniformly random vector entry.
    #[allow(clippy::cast_precision_loss)]
    pub(crate) fn sample_vector(&self, rng: &mut fastrand::Rng) -> f64 {
        match self {
            Self::Float { .. } => rng_util::f64_range(rng, 0.0, 1.0),
            Self::Int { low, high, log } => {
                let v = if *log {
                    let (lo, hi) = self.internal_bounds();
                    (rng_util::f64_range(rng, lo, hi).exp().round() as i64).clamp(*low, *high)
                } else {
                    rng.i64(*low..=*high)
                };
                self.encode_int(v)
            }
            Self::Categorical { choices } => rng.usize(0..choices.len()) as f64,
        }
    }

    /// The vector entry of the default value: the (geometric) midpoint of a
    /// numeric range, or the first category.
    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn default_vector(&self) -> f64 {
        match self {
            Self::Float { .. } => 0.5,
            Self::Int { low, high, log } => {
                let (lo, hi) = self.internal_bounds();
                let mid = from_normalized(0.5, lo, hi);
                let mid = if *log { mid.exp() } else { mid };
                self.encode_int((mid.round() as i64).clamp(*low, *high))
            }
            Self::Categorical { .. } => 0.0,
        }
    }

    /// Vector entries of the integers adjacent to `value`.
    pub(crate) fn adjacent_int_vectors(&self, value: f64) -> Vec<f64> {
        let (Self::Int { low, high, .. }, ParamValue::Int(v)) = (self, self.from_vector(value))
        else {
            return Vec::new();
        };
        [v - 1, v + 1]
            .into_iter()
            .filter(|n| (*low..=*high).contains(n))
            .map(|n| self.encode_int(n))
            .collect()
    }

    #[allow(clippy::cast_precision_loss)]
    fn encode_int(&self, v: i64) -> f64 {
        let (lo, hi) = self.internal_bounds();
        to_normalized(self.to_internal(v as f64), lo, hi)
    }

    fn to_internal(&self, v: f64) -> f64 {
        match self {
            Self::Float { log: true, .. } | Self::Int { log: true, .. } => v.ln(),
            _ => v,
        }
    }

    /// Internal-space bounds of a numeric parameter.
    #[allow(clippy::cast_precision_loss)]
    fn internal_bounds(&self) -> (f64, f64) {
        match self {
            Self::Float { low, high, log } => {
                if *log {
                    (low.ln(), high.ln())
                } else {
                    (*low, *high)
                }
            }
            Self::Int { low, high, log } => {
                let (low, high) = (*low as f64, *high as f64);
                if *log {
                    (low.ln(), high.ln())
                } else {
                    (low, high)
                }
            }
            Self::Categorical { .. } => (0.0, 1.0),
        }
    }
}

fn check_float_bounds(low: f64, high: f64) -> Result<()> {
    if low.is_finite() && high.is_finite() && low < high {
        Ok(())
    } else {
        Err(Error::InvalidBounds { low, high })
    }
}

/// Convert an internal-space value to normalized [0, 1] using bounds.
fn to_normalized(value: f64, lo: f64, hi: f64) -> f64 {
    if (hi - lo).abs() < 1e-15 {
        0.5
    } else {
        ((value - lo) / (hi - lo)).clamp(0.0, 1.0)
    }
}

/// Convert a normalized [0, 1] value back to internal space.
fn from_normalized(value: f64, lo: f64, hi: f64) -> f64 {
    lo + value * (hi - lo)
}
