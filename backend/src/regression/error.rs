//! Error types for regression model computation.

/// Result type for regression operations
pub type RegressionResult<T> = Result<T, RegressionError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RegressionError {
    /// Invalid service parameter (e.g. a negative ridge penalty).
    #[error("Invalid regression parameter: {0}")]
    InvalidParameter(String),

    /// The normal equations could not be solved.
    #[error("Singular regression system ({features} features)")]
    SingularSystem { features: usize },

    /// The computation task failed before producing a model.
    #[error("Regression task failed: {0}")]
    TaskFailed(String),
}
