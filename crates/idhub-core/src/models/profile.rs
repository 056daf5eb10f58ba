//! User profile domain model (1:1 with a user).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    /// Apply a partial update in place. Absent fields are left alone.
    pub fn apply(&mut self, update: &UpdateUserProfile) {
        if let Some(display_name) = &update.display_name {
            self.display_name = display_name.clone();
        }
        if let Some(avatar_url) = &update.avatar_url {
            self.avatar_url = avatar_url.clone();
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserProfile {
    pub user_id: Uuid,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

/// Partial profile update.
///
/// `Some(Some(v))` = set, `Some(None)` = clear, `None` = no change.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct UpdateUserProfile {
    pub display_name: Option<Option<String>>,
    pub avatar_url: Option<Option<String>>,
}

impl UpdateUserProfile {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.avatar_url.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> UserProfile {
        let now = Utc::now();
        UserProfile {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            display_name: Some("Bob".into()),
            avatar_url: Some("https://cdn.example.com/bob.png".into()),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn absent_fields_are_untouched() {
        let mut p = profile();
        p.apply(&UpdateUserProfile {
            display_name: Some(Some("Alice".into())),
            avatar_url: None,
        });
        assert_eq!(p.display_name.as_deref(), Some("Alice"));
        assert_eq!(p.avatar_url.as_deref(), Some("https://cdn.example.com/bob.png"));
    }

    #[test]
    fn explicit_none_clears() {
        let mut p = profile();
        p.apply(&UpdateUserProfile {
            display_name: None,
            avatar_url: Some(None),
        });
        assert_eq!(p.display_name.as_deref(), Some("Bob"));
        assert!(p.avatar_url.is_none());
    }
}
