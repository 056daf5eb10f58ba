//! Schema definitions and migration runner for SurrealDB.
//!
//! Tables are SCHEMAFULL. UUIDs are stored as strings; record ids are
//! the entity UUIDs. Every uniqueness rule the services rely on is a
//! UNIQUE index, so concurrent writers are serialized by the database.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "users_profiles_providers",
    sql: SCHEMA_V1,
}];

const SCHEMA_V1: &str = "\
-- Users
DEFINE TABLE user SCHEMAFULL;
DEFINE FIELD email ON TABLE user TYPE string;
DEFINE FIELD password_hash ON TABLE user TYPE option<string>;
DEFINE FIELD is_active ON TABLE user TYPE bool DEFAULT true;
DEFINE FIELD created_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_user_email ON TABLE user COLUMNS email UNIQUE;

-- Profiles (1:1 with user)
DEFINE TABLE user_profile SCHEMAFULL;
DEFINE FIELD user_id ON TABLE user_profile TYPE string;
DEFINE FIELD display_name ON TABLE user_profile TYPE option<string>;
DEFINE FIELD avatar_url ON TABLE user_profile TYPE option<string>;
DEFINE FIELD created_at ON TABLE user_profile TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE user_profile TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_user_profile_user ON TABLE user_profile \
    COLUMNS user_id UNIQUE;

-- External identity provider linkages
DEFINE TABLE user_provider SCHEMAFULL;
DEFINE FIELD provider_type ON TABLE user_provider TYPE string;
DEFINE FIELD provider_user_id ON TABLE user_provider TYPE string;
DEFINE FIELD user_id ON TABLE user_provider TYPE string;
DEFINE FIELD metadata ON TABLE user_provider TYPE object FLEXIBLE \
    DEFAULT {};
DEFINE FIELD created_at ON TABLE user_provider TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE user_provider TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_user_provider_identity ON TABLE user_provider \
    COLUMNS provider_type, provider_user_id UNIQUE;
DEFINE INDEX idx_user_provider_user ON TABLE user_provider \
    COLUMNS user_id;
";

/// Apply every migration newer than the recorded schema version.
///
/// Safe to call on every startup.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let mut result = db
        .query("SELECT version FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS.iter().filter(|m| m.version > current_version) {
        info!(
            version = migration.version,
            name = migration.name,
            "Applying migration"
        );
        db.query(migration.sql).await?.check().map_err(|e| {
            DbError::Migration(format!(
                "v{} '{}': {e}",
                migration.version, migration.name
            ))
        })?;

        db.query("CREATE _migration SET version = $version, name = $name")
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!("recording v{}: {e}", migration.version))
            })?;

        info!(version = migration.version, "Migration applied");
    }

    Ok(())
}

/// Raw DDL of the first schema version.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}
