//! In-process verification-code store.
//!
//! Implements [`VerificationClient`] without an external provider:
//! each transaction holds a six-digit code (stored as a SHA-256 hash),
//! expires after a fixed TTL, is consumed on the first successful
//! redemption and is dropped after too many wrong codes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use idhub_core::error::{IdHubError, IdHubResult};
use idhub_core::models::verification::VerificationResult;
use idhub_core::verification::VerificationClient;
use rand::Rng;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Tuning for [`LocalVerificationStore`].
#[derive(Debug, Clone)]
pub struct VerificationConfig {
    /// Code lifetime in seconds (default: 600 = 10 minutes).
    pub code_ttl_secs: u64,
    /// Wrong codes tolerated before the transaction is discarded
    /// (default: 5).
    pub max_attempts: u32,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            code_ttl_secs: 600,
            max_attempts: 5,
        }
    }
}

type CodeGenerator = Arc<dyn Fn() -> String + Send + Sync>;
/// Called with `(recipient, code)` once a transaction is opened.
type CodeDelivery = Arc<dyn Fn(&str, &str) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Registration,
    EmailChange,
}

#[derive(Debug)]
enum Payload {
    Registration { email: String, password: String },
    EmailChange { user_id: Uuid, new_email: String },
}

impl Payload {
    fn flow(&self) -> Flow {
        match self {
            Payload::Registration { .. } => Flow::Registration,
            Payload::EmailChange { .. } => Flow::EmailChange,
        }
    }

    fn recipient(&self) -> &str {
        match self {
            Payload::Registration { email, .. } => email,
            Payload::EmailChange { new_email, .. } => new_email,
        }
    }

    fn into_result(self) -> VerificationResult {
        match self {
            Payload::Registration { email, password } => VerificationResult {
                email,
                password: Some(password),
                user_id: None,
                valid: true,
            },
            Payload::EmailChange { user_id, new_email } => VerificationResult {
                email: new_email,
                password: None,
                user_id: Some(user_id),
                valid: true,
            },
        }
    }
}

#[derive(Debug)]
struct PendingTransaction {
    payload: Payload,
    code_hash: String,
    expires_at: DateTime<Utc>,
    attempts: u32,
}

/// In-memory [`VerificationClient`].
pub struct LocalVerificationStore {
    transactions: Mutex<HashMap<String, PendingTransaction>>,
    config: VerificationConfig,
    generate_code: CodeGenerator,
    deliver: CodeDelivery,
}

impl LocalVerificationStore {
    pub fn new(config: VerificationConfig) -> Self {
        Self {
            transactions: Mutex::new(HashMap::new()),
            config,
            generate_code: Arc::new(random_code),
            deliver: Arc::new(log_delivery),
        }
    }

    /// Replace the random code source.
    pub fn with_code_generator(
        mut self,
        generate: impl Fn() -> String + Send + Sync + 'static,
    ) -> Self {
        self.generate_code = Arc::new(generate);
        self
    }

    /// Replace the delivery hook (e.g. an email sender).
    pub fn with_delivery(mut self, deliver: impl Fn(&str, &str) + Send + Sync + 'static) -> Self {
        self.deliver = Arc::new(deliver);
        self
    }

    /// Number of transactions still awaiting redemption.
    pub fn pending(&self) -> usize {
        self.lock().map(|t| t.len()).unwrap_or(0)
    }

    fn lock(&self) -> IdHubResult<MutexGuard<'_, HashMap<String, PendingTransaction>>> {
        self.transactions
            .lock()
            .map_err(|_| IdHubError::Internal("verification store lock poisoned".into()))
    }

    fn open(&self, payload: Payload) -> IdHubResult<String> {
        let transaction_id = Uuid::new_v4().to_string();
        let code = (self.generate_code)();
        let now = Utc::now();
        let expires_at = now + Duration::seconds(self.config.code_ttl_secs as i64);

        let recipient = payload.recipient().to_string();
        let flow = payload.flow();
        {
            let mut transactions = self.lock()?;
            transactions.retain(|_, t| t.expires_at > now);
            transactions.insert(
                transaction_id.clone(),
                PendingTransaction {
                    payload,
                    code_hash: hash_code(&code),
                    expires_at,
                    attempts: 0,
                },
            );
        }

        info!(transaction_id = %transaction_id, ?flow, "Verification transaction opened");
        (self.deliver)(&recipient, &code);
        Ok(transaction_id)
    }

    fn redeem(&self, transaction_id: &str, code: &str, flow: Flow) -> IdHubResult<VerificationResult> {
        let mut transactions = self.lock()?;

        let Some(pending) = transactions.get_mut(transaction_id) else {
            return Err(IdHubError::verification_failed(
                "unknown or already used transaction",
            ));
        };

        if pending.payload.flow() != flow {
            return Err(IdHubError::verification_failed(
                "transaction belongs to a different flow",
            ));
        }

        if pending.expires_at <= Utc::now() {
            transactions.remove(transaction_id);
            debug!(transaction_id, "Verification transaction expired");
            return Err(IdHubError::verification_failed("code expired"));
        }

        if pending.code_hash != hash_code(code) {
            pending.attempts += 1;
            if pending.attempts >= self.config.max_attempts {
                transactions.remove(transaction_id);
                warn!(transaction_id, "Verification transaction discarded after too many attempts");
            }
            return Err(IdHubError::verification_failed("invalid code"));
        }

        let pending = transactions
            .remove(transaction_id)
            .ok_or_else(|| IdHubError::Internal("transaction vanished under lock".into()))?;
        Ok(pending.payload.into_result())
    }
}

impl Default for LocalVerificationStore {
    fn default() -> Self {
        Self::new(VerificationConfig::default())
    }
}

impl VerificationClient for LocalVerificationStore {
    async fn start_registration(&self, email: &str, password: &str) -> IdHubResult<String> {
        self.open(Payload::Registration {
            email: email.to_string(),
            password: password.to_string(),
        })
    }

    async fn verify_registration(
        &self,
        transaction_id: &str,
        code: &str,
    ) -> IdHubResult<VerificationResult> {
        self.redeem(transaction_id, code, Flow::Registration)
    }

    async fn start_email_change(&self, user_id: Uuid, new_email: &str) -> IdHubResult<String> {
        self.open(Payload::EmailChange {
            user_id,
            new_email: new_email.to_string(),
        })
    }

    async fn verify_email_change(
        &self,
        transaction_id: &str,
        code: &str,
    ) -> IdHubResult<VerificationResult> {
        self.redeem(transaction_id, code, Flow::EmailChange)
    }
}

fn random_code() -> String {
    let n: u32 = rand::rng().random_range(0..1_000_000);
    format!("{n:06}")
}

fn hash_code(code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(code.trim().as_bytes());
    hex::encode(hasher.finalize())
}

fn log_delivery(recipient: &str, _code: &str) {
    info!(recipient = %mask_email(recipient), "Verification code dispatched");
}

/// `alice@example.com` -> `a***@example.com`.
pub fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => {
            let first = local.chars().next().unwrap_or('*');
            format!("{first}***@{domain}")
        }
        None => "***".into(),
    }
}
