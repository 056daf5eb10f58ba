//! idhub Core: domain models, error taxonomy and the collaborator
//! traits the identity orchestrator is written against.

pub mod context;
pub mod error;
pub mod events;
pub mod models;
pub mod repository;
pub mod verification;

pub use context::RequestContext;
pub use error::{IdHubError, IdHubResult};
