//! Domain errors

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum DomainError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Carrier credentials missing: {0}")]
    MissingCredentials(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Carrier error: {message}")]
    Carrier {
        status: Option<u16>,
        message: String,
    },

    #[error("System of record error: {0}")]
    Backend(String),

    #[error("AI provider error: {0}")]
    AiProvider(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    /// Carrier-side error with an HTTP status attached
    pub fn carrier(status: Option<u16>, message: impl Into<String>) -> Self {
        DomainError::Carrier {
            status,
            message: message.into(),
        }
    }

    /// True when the resource no longer exists, locally or at the carrier.
    ///
    /// Conference and call resources disappear from the carrier shortly after
    /// teardown, so a 404 is usually a lost race rather than a fault.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DomainError::NotFound(_)
                | DomainError::Carrier {
                    status: Some(404),
                    ..
                }
        )
    }
}
