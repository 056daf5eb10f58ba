//! SurrealDB implementation of [`UserProviderRepository`].

use chrono::{DateTime, Utc};
use idhub_core::error::IdHubResult;
use idhub_core::models::provider::{CreateUserProvider, UpdateUserProvider, UserProvider};
use idhub_core::repository::UserProviderRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::parse_uuid;
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct ProviderRow {
    provider_type: String,
    provider_user_id: String,
    user_id: String,
    metadata: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct ProviderRowWithId {
    record_id: String,
    provider_type: String,
    provider_user_id: String,
    user_id: String,
    metadata: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProviderRow {
    fn try_into_provider(self, id: Uuid) -> Result<UserProvider, DbError> {
        Ok(UserProvider {
            id,
            provider_type: self.provider_type,
            provider_user_id: self.provider_user_id,
            user_id: parse_uuid(&self.user_id)?,
            metadata: self.metadata,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl ProviderRowWithId {
    fn try_into_provider(self) -> Result<UserProvider, DbError> {
        let id = parse_uuid(&self.record_id)?;
        ProviderRow {
            provider_type: self.provider_type,
            provider_user_id: self.provider_user_id,
            user_id: self.user_id,
            metadata: self.metadata,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .try_into_provider(id)
    }
}

#[derive(Clone)]
pub struct SurrealUserProviderRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealUserProviderRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> UserProviderRepository for SurrealUserProviderRepository<C> {
    async fn create(&self, input: CreateUserProvider) -> IdHubResult<UserProvider> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let metadata = input
            .metadata
            .unwrap_or(serde_json::Value::Object(Default::default()));

        let result = self
            .db
            .query(
                "CREATE type::record('user_provider', $id) SET \
                 provider_type = $provider_type, \
                 provider_user_id = $provider_user_id, \
                 user_id = $user_id, \
                 metadata = $metadata",
            )
            .bind(("id", id_str.clone()))
            .bind(("provider_type", input.provider_type))
            .bind(("provider_user_id", input.provider_user_id))
            .bind(("user_id", input.user_id.to_string()))
            .bind(("metadata", metadata))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_statement("user_provider", e))?;

        let rows: Vec<ProviderRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user_provider".into(),
            id: id_str,
        })?;

        Ok(row.try_into_provider(id)?)
    }

    async fn get_by_provider(
        &self,
        provider_type: &str,
        provider_user_id: &str,
    ) -> IdHubResult<UserProvider> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM user_provider \
                 WHERE provider_type = $provider_type \
                 AND provider_user_id = $provider_user_id",
            )
            .bind(("provider_type", provider_type.to_string()))
            .bind(("provider_user_id", provider_user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ProviderRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user_provider".into(),
            id: format!("{provider_type}/{provider_user_id}"),
        })?;

        Ok(row.try_into_provider()?)
    }

    async fn list_by_user(&self, user_id: Uuid) -> IdHubResult<Vec<UserProvider>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM user_provider \
                 WHERE user_id = $user_id \
                 ORDER BY created_at ASC",
            )
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ProviderRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(ProviderRowWithId::try_into_provider)
            .collect::<Result<Vec<_>, DbError>>()?)
    }

    async fn update(&self, id: Uuid, input: UpdateUserProvider) -> IdHubResult<UserProvider> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.metadata.is_some() {
            sets.push("metadata = $metadata");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('user_provider', $id) SET {}",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));
        if let Some(metadata) = input.metadata {
            builder = builder.bind(("metadata", metadata));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::from_statement("user_provider", e))?;

        let rows: Vec<ProviderRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user_provider".into(),
            id: id_str,
        })?;

        Ok(row.try_into_provider(id)?)
    }

    async fn delete(&self, id: Uuid) -> IdHubResult<()> {
        self.db
            .query("DELETE type::record('user_provider', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_statement("user_provider", e))?;

        Ok(())
    }
}
