#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when the lower bound is not below the upper bound.
    #[error("invalid bounds: low ({low}) must be less than high ({high})")]
    InvalidBounds {
        /// The lower bound value.
        low: f64,
        /// The upper bound value.
        high: f64,
    },

    /// Returned when log scale is used with non-positive bounds.
    #[error("invalid log bounds: low must be positive for log scale")]
    InvalidLogBounds,

    /// Returned when categorical choices are empty.
    #[error("categorical choices cannot be empty")]
    EmptyChoices,

    /// Returned when two parameters of a configuration space share a name.
    #[error("duplicate parameter name '{0}'")]
    DuplicateParameter(String),

    /// Returned when a configuration is invalid for its space.
    #[error("invalid configuration: {0}")]
    ConfigurationSpace(String),

    /// Returned when the rows of a matrix have the wrong number of entries.
    #[error("rows in X should have {expected} entries but have {got}")]
    RowWidthMismatch {
        /// The expected row width.
        expected: usize,
        /// The actual row width.
        got: usize,
    },

    /// Returned when two matrices that must agree on their row count do not.
    #[error("dimension mismatch: expected {expected} rows but got {got}")]
    DimensionMismatch {
        /// The expected number of rows.
        expected: usize,
        /// The actual number of rows.
        got: usize,
    },

    /// Returned when a model's type descriptor disagrees with the configuration space.
    #[error("type descriptor mismatch: expected {expected:?}, got {got:?}")]
    TypeDescriptorMismatch {
        /// The type descriptor of the configuration space.
        expected: Vec<usize>,
        /// The type descriptor of the model.
        got: Vec<usize>,
    },

    /// Returned when an instance-feature matrix has no rows or no columns.
    #[error("instance features must have at least one row and one column")]
    EmptyInstanceFeatures,

    /// Returned when a training row refers to a configuration or instance that does not exist.
    #[error("row map entry {row} points outside the configuration or instance-feature matrix")]
    InvalidRowMap {
        /// The offending training row.
        row: usize,
    },

    /// Returned when a run refers to an instance without known features.
    #[error("no features known for instance {0:?}")]
    UnknownInstance(Option<String>),

    /// Returned when a model is trained on zero observations.
    #[error("no training data available")]
    EmptyTrainingData,

    /// Returned when a surrogate model is queried before it was trained.
    #[error("surrogate model has not been trained")]
    ModelNotTrained,

    /// Returned when an acquisition function is evaluated before `update`.
    #[error("acquisition function has no bound model; call update() first")]
    UnboundModel,

    /// Returned when a model produces a different number of outputs than expected.
    #[error("objective dimension mismatch: expected {expected} values, got {got}")]
    ObjectiveDimensionMismatch {
        /// The expected number of objective values.
        expected: usize,
        /// The actual number of objective values.
        got: usize,
    },

    /// Returned when the target-algorithm runner fails.
    #[error("target runner error: {0}")]
    Runner(String),
}

pub type Result<T> = core::result::Result<T, Error>;
