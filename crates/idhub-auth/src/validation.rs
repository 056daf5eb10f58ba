//! Input format checks applied before any collaborator is called.

use std::sync::LazyLock;

use idhub_core::error::{IdHubError, IdHubResult};
use regex::Regex;

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("hardcoded email regex is valid")
});

/// Maximum email length per RFC 5321.
const MAX_EMAIL_LEN: usize = 254;

/// Basic email shape: `local@domain.tld`, no whitespace.
pub fn validate_email(email: &str) -> IdHubResult<()> {
    let email = email.trim();
    if email.is_empty() || email.len() > MAX_EMAIL_LEN || !EMAIL_REGEX.is_match(email) {
        return Err(IdHubError::invalid_input("invalid email address"));
    }
    Ok(())
}

pub fn validate_password(password: &str, min_length: usize) -> IdHubResult<()> {
    if password.chars().count() < min_length {
        return Err(IdHubError::invalid_input(format!(
            "password must be at least {min_length} characters"
        )));
    }
    Ok(())
}

/// Email-change targets only need an `@`; the verification round
/// trip proves the address works.
pub fn validate_new_email(email: &str) -> IdHubResult<()> {
    if !email.contains('@') {
        return Err(IdHubError::invalid_input("invalid email"));
    }
    Ok(())
}

pub fn require_non_empty(field: &str, value: &str) -> IdHubResult<()> {
    if value.trim().is_empty() {
        return Err(IdHubError::invalid_input(format!("{field} is required")));
    }
    Ok(())
}
