//! Core types shared by the run history and the optimization loop.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// What the target algorithm is being configured for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RunObjective {
    /// Minimize runtime. Costs are modelled in log10 space.
    #[default]
    Runtime,
    /// Minimize a solution-quality cost. Costs are modelled as-is.
    Quality,
}

/// Outcome status of a single target-algorithm run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum StatusType {
    /// The run finished normally.
    Success,
    /// The run hit its cutoff.
    Timeout,
    /// The target algorithm crashed.
    Crashed,
    /// The run was aborted; the result carries no information.
    Abort,
    /// The run exceeded its memory limit.
    Memout,
}
