//! SurrealDB repository implementations.

mod profile;
mod provider;
mod user;

pub use profile::SurrealUserProfileRepository;
pub use provider::SurrealUserProviderRepository;
pub use user::SurrealUserRepository;

use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

fn parse_uuid(value: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(value).map_err(|e| DbError::Decode(format!("invalid UUID {value:?}: {e}")))
}
