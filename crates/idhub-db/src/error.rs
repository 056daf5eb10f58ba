//! Database-specific error types and conversions.

use idhub_core::error::IdHubError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Unique constraint violated on {entity}")]
    Conflict { entity: String },

    #[error("Corrupt row: {0}")]
    Decode(String),
}

impl DbError {
    /// Classify a failed statement.
    ///
    /// Unique-index violations and lost write races both mean another
    /// writer got there first and surface as [`DbError::Conflict`].
    pub fn from_statement(entity: &str, err: surrealdb::Error) -> Self {
        let message = err.to_string();
        if message.contains("already contains") || message.contains("read or write conflict") {
            Self::Conflict {
                entity: entity.to_string(),
            }
        } else {
            Self::Query(message)
        }
    }
}

impl From<DbError> for IdHubError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => IdHubError::NotFound { entity, id },
            DbError::Conflict { entity } => IdHubError::Conflict { entity },
            other => IdHubError::Database(other.to_string()),
        }
    }
}
