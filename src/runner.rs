//! The [`TargetRunner`] trait: how a configuration gets evaluated.
//!
//! Executing the target algorithm (process spawning, resource limits,
//! output parsing) lives outside this crate. The optimization loop only
//! needs a runner that turns a [`RunRequest`] into a [`RunOutcome`].
//!
//! Plain functions and closures implement the trait directly:
//!
//! ```
//! use smbo::runner::{RunOutcome, RunRequest, TargetRunner};
//! use smbo::space::Configuration;
//!
//! fn shifted_square(request: &RunRequest<'_>) -> smbo::Result<RunOutcome> {
//!     let x = request.configuration.vector()[0];
//!     Ok(RunOutcome::success((x - 0.25).powi(2), 0.01))
//! }
//!
//! let config = Configuration::new(vec![0.25]);
//! let request = RunRequest {
//!     configuration: &config,
//!     instance: None,
//!     instance_specific: None,
//!     cutoff: None,
//!     seed: 1,
//! };
//! assert_eq!(shifted_square.run(&request).unwrap().cost, 0.0);
//! ```

use std::collections::HashMap;

use crate::error::Result;
use crate::space::Configuration;
use crate::types::StatusType;

/// Everything a runner needs to evaluate one configuration.
#[derive(Clone, Copy, Debug)]
pub struct RunRequest<'a> {
    /// The configuration to run.
    pub configuration: &'a Configuration,
    /// The problem instance, if the scenario has instances.
    pub instance: Option<&'a str>,
    /// Extra information attached to the instance, if any.
    pub instance_specific: Option<&'a str>,
    /// Runtime cutoff in seconds.
    pub cutoff: Option<f64>,
    /// Seed for the target algorithm.
    pub seed: u64,
}

/// What a single run reported.
#[derive(Clone, Debug, PartialEq)]
pub struct RunOutcome {
    /// How the run ended.
    pub status: StatusType,
    /// Cost of the run (lower is better).
    pub cost: f64,
    /// Runtime in seconds.
    pub runtime: f64,
    /// Free-form metadata.
    pub additional_info: HashMap<String, String>,
}

impl RunOutcome {
    /// A successful run with the given cost and runtime.
    #[must_use]
    pub fn success(cost: f64, runtime: f64) -> Self {
        Self {
            status: StatusType::Success,
            cost,
            runtime,
            additional_info: HashMap::new(),
        }
    }
}

/// Evaluates configurations of the target algorithm.
pub trait TargetRunner {
    /// Run the target algorithm once.
    ///
    /// # Errors
    ///
    /// Failures of the runner itself (not of the target algorithm, which
    /// are reported through [`RunOutcome::status`]) are returned as errors
    /// and abort the optimization loop.
    fn run(&self, request: &RunRequest<'_>) -> Result<RunOutcome>;
}

impl<F> TargetRunner for F
where
    F: Fn(&RunRequest<'_>) -> Result<RunOutcome>,
{
    fn run(&self, request: &RunRequest<'_>) -> Result<RunOutcome> {
        self(request)
    }
}
