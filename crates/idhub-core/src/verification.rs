//! Credential verification client contract.
//!
//! Two transaction families (registration and email change), each with
//! a `start` that opens a single-use, time-bounded challenge and a
//! `verify` that redeems it. Expiry is owned by the implementation;
//! callers see expiry and a wrong code alike as
//! [`IdHubError::VerificationFailed`](crate::error::IdHubError::VerificationFailed).
//! Nothing in the core retries a failed `verify`.

use std::sync::Arc;

use uuid::Uuid;

use crate::error::IdHubResult;
use crate::models::verification::VerificationResult;

pub trait VerificationClient: Send + Sync {
    /// Returns the transaction id.
    fn start_registration(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = IdHubResult<String>> + Send;

    fn verify_registration(
        &self,
        transaction_id: &str,
        code: &str,
    ) -> impl Future<Output = IdHubResult<VerificationResult>> + Send;

    /// Returns the transaction id.
    fn start_email_change(
        &self,
        user_id: Uuid,
        new_email: &str,
    ) -> impl Future<Output = IdHubResult<String>> + Send;

    fn verify_email_change(
        &self,
        transaction_id: &str,
        code: &str,
    ) -> impl Future<Output = IdHubResult<VerificationResult>> + Send;
}

/// Lets one store back several services.
impl<T: VerificationClient> VerificationClient for Arc<T> {
    fn start_registration(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = IdHubResult<String>> + Send {
        (**self).start_registration(email, password)
    }

    fn verify_registration(
        &self,
        transaction_id: &str,
        code: &str,
    ) -> impl Future<Output = IdHubResult<VerificationResult>> + Send {
        (**self).verify_registration(transaction_id, code)
    }

    fn start_email_change(
        &self,
        user_id: Uuid,
        new_email: &str,
    ) -> impl Future<Output = IdHubResult<String>> + Send {
        (**self).start_email_change(user_id, new_email)
    }

    fn verify_email_change(
        &self,
        transaction_id: &str,
        code: &str,
    ) -> impl Future<Output = IdHubResult<VerificationResult>> + Send {
        (**self).verify_email_change(transaction_id, code)
    }
}
