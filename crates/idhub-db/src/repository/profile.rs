//! SurrealDB implementation of [`UserProfileRepository`].

use chrono::{DateTime, Utc};
use idhub_core::error::IdHubResult;
use idhub_core::models::profile::{CreateUserProfile, UpdateUserProfile, UserProfile};
use idhub_core::repository::UserProfileRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::parse_uuid;
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct ProfileRow {
    user_id: String,
    display_name: Option<String>,
    avatar_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct ProfileRowWithId {
    record_id: String,
    user_id: String,
    display_name: Option<String>,
    avatar_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProfileRow {
    fn try_into_profile(self, id: Uuid) -> Result<UserProfile, DbError> {
        Ok(UserProfile {
            id,
            user_id: parse_uuid(&self.user_id)?,
            display_name: self.display_name,
            avatar_url: self.avatar_url,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl ProfileRowWithId {
    fn try_into_profile(self) -> Result<UserProfile, DbError> {
        Ok(UserProfile {
            id: parse_uuid(&self.record_id)?,
            user_id: parse_uuid(&self.user_id)?,
            display_name: self.display_name,
            avatar_url: self.avatar_url,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Clone)]
pub struct SurrealUserProfileRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealUserProfileRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> UserProfileRepository for SurrealUserProfileRepository<C> {
    async fn create(&self, input: CreateUserProfile) -> IdHubResult<UserProfile> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('user_profile', $id) SET \
                 user_id = $user_id, \
                 display_name = $display_name, \
                 avatar_url = $avatar_url",
            )
            .bind(("id", id_str.clone()))
            .bind(("user_id", input.user_id.to_string()))
            .bind(("display_name", input.display_name))
            .bind(("avatar_url", input.avatar_url))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_statement("user_profile", e))?;

        let rows: Vec<ProfileRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user_profile".into(),
            id: id_str,
        })?;

        Ok(row.try_into_profile(id)?)
    }

    async fn get_by_user_id(&self, user_id: Uuid) -> IdHubResult<UserProfile> {
        let user_id_str = user_id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM user_profile \
                 WHERE user_id = $user_id",
            )
            .bind(("user_id", user_id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ProfileRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user_profile".into(),
            id: format!("user_id={user_id_str}"),
        })?;

        Ok(row.try_into_profile()?)
    }

    /// Writes only the fields present in `input`; an explicit `None`
    /// clears the column.
    async fn update(&self, user_id: Uuid, input: UpdateUserProfile) -> IdHubResult<UserProfile> {
        let current = self.get_by_user_id(user_id).await?;
        if input.is_empty() {
            return Ok(current);
        }

        let mut sets = Vec::new();
        if input.display_name.is_some() {
            sets.push("display_name = $display_name");
        }
        if input.avatar_url.is_some() {
            sets.push("avatar_url = $avatar_url");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('user_profile', $id) SET {}",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("id", current.id.to_string()));
        if let Some(display_name) = input.display_name {
            builder = builder.bind(("display_name", display_name));
        }
        if let Some(avatar_url) = input.avatar_url {
            builder = builder.bind(("avatar_url", avatar_url));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::from_statement("user_profile", e))?;

        let rows: Vec<ProfileRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user_profile".into(),
            id: current.id.to_string(),
        })?;

        Ok(row.try_into_profile(current.id)?)
    }
}
