//! Error types for the idhub system.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdHubError {
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    /// Sign-in failure. Also returned for unknown accounts so callers
    /// cannot probe which emails are registered.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Verification failed: {reason}")]
    VerificationFailed { reason: String },

    #[error("Entity already exists: {entity}")]
    Conflict { entity: String },

    #[error("{field} is unchanged")]
    Unchanged { field: String },

    #[error("Invalid token: {reason}")]
    InvalidToken { reason: String },

    #[error("Operation cancelled: {operation}")]
    Cancelled { operation: String },

    #[error("Deadline exceeded: {operation}")]
    DeadlineExceeded { operation: String },

    /// An infrastructure failure tagged with the orchestrated operation
    /// and the request's trace id.
    #[error("{operation} failed (trace_id={trace_id}): {source}")]
    Upstream {
        operation: String,
        trace_id: String,
        #[source]
        source: Box<IdHubError>,
    },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Verification service unavailable: {0}")]
    VerificationUnavailable(String),

    #[error("Event publish failed: {0}")]
    Publish(String),

    #[error("Cryptography error: {0}")]
    Crypto(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type IdHubResult<T> = Result<T, IdHubError>;

impl IdHubError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn verification_failed(reason: impl Into<String>) -> Self {
        Self::VerificationFailed {
            reason: reason.into(),
        }
    }

    /// Attach operation and trace context to infrastructure errors.
    ///
    /// Domain errors are returned as-is so callers keep matching on
    /// them directly.
    pub fn with_context(self, operation: &str, trace_id: &str) -> Self {
        match self {
            Self::Database(_)
            | Self::VerificationUnavailable(_)
            | Self::Publish(_)
            | Self::Crypto(_)
            | Self::Internal(_) => Self::Upstream {
                operation: operation.to_string(),
                trace_id: trace_id.to_string(),
                source: Box::new(self),
            },
            other => other,
        }
    }

    /// The innermost error, looking through `Upstream` wrappers.
    pub fn root(&self) -> &IdHubError {
        match self {
            Self::Upstream { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.root(), Self::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self.root(), Self::Conflict { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infrastructure_errors_are_wrapped() {
        let err = IdHubError::Database("connection reset".into())
            .with_context("user.create", "trace-1");

        match &err {
            IdHubError::Upstream {
                operation,
                trace_id,
                ..
            } => {
                assert_eq!(operation, "user.create");
                assert_eq!(trace_id, "trace-1");
            }
            other => panic!("expected Upstream, got {other:?}"),
        }
        assert!(matches!(err.root(), IdHubError::Database(_)));
        assert!(err.to_string().contains("trace_id=trace-1"));
    }

    #[test]
    fn domain_errors_pass_through() {
        let err = IdHubError::Conflict {
            entity: "user".into(),
        }
        .with_context("user.create", "trace-1");
        assert!(matches!(err, IdHubError::Conflict { .. }));
        assert!(err.is_conflict());
    }
}
