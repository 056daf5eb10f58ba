//! Domain events published after state changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const USER_CREATED: &str = "user.created";
pub const USER_EMAIL_CHANGED: &str = "user.email_changed";
pub const USER_PROVIDER_LINKED: &str = "user.provider_linked";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserEvent {
    pub event: String,
    pub user_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub trace_id: String,
}

impl UserEvent {
    pub fn new(
        event: &str,
        user_id: Uuid,
        email: Option<String>,
        trace_id: impl Into<String>,
    ) -> Self {
        Self {
            event: event.to_string(),
            user_id,
            email,
            occurred_at: Utc::now(),
            trace_id: trace_id.into(),
        }
    }
}
