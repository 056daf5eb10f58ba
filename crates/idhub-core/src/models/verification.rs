//! Values exchanged with the credential verification client.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Payload released by a successful redemption. Lives for one request
/// only and is never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResult {
    pub email: String,
    /// Present only for signup transactions.
    #[serde(skip_serializing)]
    pub password: Option<String>,
    /// Owner of an email-change transaction.
    pub user_id: Option<Uuid>,
    pub valid: bool,
}
