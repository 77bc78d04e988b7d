#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::correctness)]
#![deny(clippy::suspicious)]
#![deny(clippy::style)]
#![deny(clippy::complexity)]
#![deny(clippy::perf)]
#![deny(clippy::pedantic)]
#![deny(clippy::std_instead_of_core)]

//! Sequential model-based optimization (SMBO) for algorithm configuration.
//!
//! Given a configuration space and the runs recorded so far, the crate
//! proposes the configurations most likely to improve on the incumbent. A
//! random forest predicts the cost of a configuration, optionally
//! marginalized over a set of problem instances; an acquisition function
//! turns those predictions into a utility; local search and random sampling
//! look for configurations with high utility.
//!
//! # Getting Started
//!
//! ```
//! use smbo::prelude::*;
//!
//! let space = ConfigurationSpace::new()
//!     .add("x", Hyperparameter::float(-5.0, 5.0).unwrap())
//!     .unwrap()
//!     .add("method", Hyperparameter::categorical(["a", "b"]).unwrap())
//!     .unwrap();
//!
//! fn target(request: &RunRequest<'_>) -> smbo::Result<RunOutcome> {
//!     let v = request.configuration.vector();
//!     Ok(RunOutcome::success((v[0] - 0.7).abs() + v[1], 0.1))
//! }
//!
//! let mut smbo = Smbo::builder(space)
//!     .run_objective(RunObjective::Quality)
//!     .n_random_sorted(100)
//!     .seed(0)
//!     .build()
//!     .unwrap();
//!
//! let (incumbent, cost) = smbo.optimize(&target, 10).unwrap().unwrap();
//! assert_eq!(incumbent.len(), 2);
//! assert!(cost >= 0.0);
//! ```
//!
//! # Pipeline
//!
//! | Stage | Type | Role |
//! |-------|------|------|
//! | Observation transform | [`RunHistory2Epm`](epm::RunHistory2Epm) | Run history to training matrices (cost, log cost, or cost + log runtime). |
//! | Surrogate | [`RandomForestWithInstances`](epm::RandomForestWithInstances) | Predictive mean and variance, marginalized over instances. |
//! | Acquisition | [`ExpectedImprovement`](acquisition::ExpectedImprovement), [`ExpectedImprovementPerSecond`](acquisition::ExpectedImprovementPerSecond) | Utility of a configuration given the incumbent value. |
//! | Maximizer | [`LocalSearch`](local_search::LocalSearch) | Greedy hill climbing on the acquisition surface. |
//! | Controller | [`Smbo`] | Retrains the model and ranks challengers each iteration. |
//!
//! # Feature Flags
//!
//! | Flag | What it enables | Default |
//! |------|----------------|---------|
//! | `serde` | `Serialize`/`Deserialize` on configurations, spaces, run records and model settings | off |
//! | `tracing` | Structured log events via [`tracing`](https://docs.rs/tracing) at model retraining, local-search convergence and incumbent changes | off |

/// Emit a `tracing::info!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_info {
    ($($arg:tt)*) => { tracing::info!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_info {
    ($($arg:tt)*) => {};
}

/// Emit a `tracing::debug!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_debug {
    ($($arg:tt)*) => { tracing::debug!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_debug {
    ($($arg:tt)*) => {};
}

pub mod acquisition;
pub mod epm;
mod error;
pub mod local_search;
pub mod parameter;
mod rng_util;
pub mod runhistory;
pub mod runner;
pub mod smbo;
pub mod space;
mod types;

pub use error::{Error, Result};
pub use smbo::{Challenger, Origin, Smbo, SmboBuilder};
pub use types::{RunObjective, StatusType};

/// Convenient wildcard import for the most common types.
///
/// ```
/// use smbo::prelude::*;
/// ```
pub mod prelude {
    pub use crate::acquisition::{
        AcquisitionFunction, ExpectedImprovement, ExpectedImprovementPerSecond,
    };
    pub use crate::epm::{
        ObjectiveTransform, RandomForestConfig, RandomForestWithInstances, RunHistory2Epm,
        SurrogateModel, UncorrelatedMultiObjectiveRandomForest,
    };
    pub use crate::error::{Error, Result};
    pub use crate::local_search::{AcquisitionMaximizer, LocalSearch};
    pub use crate::parameter::{Hyperparameter, ParamValue};
    pub use crate::runhistory::{RunHistory, RunRecord};
    pub use crate::runner::{RunOutcome, RunRequest, TargetRunner};
    pub use crate::smbo::{Challenger, Origin, Smbo, SmboBuilder};
    pub use crate::space::{Configuration, ConfigurationSpace, SearchSpace};
    pub use crate::types::{RunObjective, StatusType};
}
