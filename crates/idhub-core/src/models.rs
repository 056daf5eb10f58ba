//! Domain models for idhub.

pub mod event;
pub mod profile;
pub mod provider;
pub mod user;
pub mod verification;
