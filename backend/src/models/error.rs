//! Error types for the facility thermal model.
//!
//! Construction-time rule violations surface as [`ModelError::ValidationError`],
//! out-of-range hours passed to queries as [`ModelError::DomainError`]. Both
//! carry an [`ErrorContext`] describing where the failure happened.

use std::fmt;

/// Result type for model operations
pub type ModelResult<T> = Result<T, ModelError>;

/// Structured context for model errors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorContext {
    /// The operation being performed (e.g., "add_heat_source", "temperature_at")
    pub operation: Option<String>,
    /// The entity type involved (e.g., "activity", "heat_source", "facility")
    pub entity: Option<String>,
    /// Additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with an operation name.
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: Some(operation.into()),
            ..Default::default()
        }
    }

    /// Set the entity type.
    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    /// Set additional details.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    fn is_empty(&self) -> bool {
        self.operation.is_none() && self.entity.is_none() && self.details.is_none()
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return Ok(());
        }
        let mut parts = Vec::new();
        if let Some(ref op) = self.operation {
            parts.push(format!("operation={}", op));
        }
        if let Some(ref entity) = self.entity {
            parts.push(format!("entity={}", entity));
        }
        if let Some(ref details) = self.details {
            parts.push(format!("details={}", details));
        }
        write!(f, " [{}]", parts.join(", "))
    }
}

/// Error type for the thermal model
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    /// A business rule was violated while building an entity.
    #[error("Validation error: {message}{context}")]
    ValidationError {
        message: String,
        context: ErrorContext,
    },

    /// An argument fell outside the domain of a query (e.g. an hour outside `[0, 24[`).
    #[error("Domain error: {message}{context}")]
    DomainError {
        message: String,
        context: ErrorContext,
    },
}

impl ModelError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Create a domain error.
    pub fn domain(message: impl Into<String>) -> Self {
        Self::DomainError {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Replace the error context.
    pub fn with_context(mut self, ctx: ErrorContext) -> Self {
        match &mut self {
            Self::ValidationError { context, .. } | Self::DomainError { context, .. } => {
                *context = ctx;
            }
        }
        self
    }

    /// The bare business-rule message, without context.
    pub fn message(&self) -> &str {
        match self {
            Self::ValidationError { message, .. } | Self::DomainError { message, .. } => message,
        }
    }

    pub fn context(&self) -> &ErrorContext {
        match self {
            Self::ValidationError { context, .. } | Self::DomainError { context, .. } => context,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::ValidationError { .. })
    }

    pub fn is_domain(&self) -> bool {
        matches!(self, Self::DomainError { .. })
    }
}
