//! Event sink contract.

use crate::error::IdHubResult;
use crate::models::event::UserEvent;

/// At-least-once publication of domain events.
///
/// `publish` resolves once the sink has confirmed the message.
pub trait EventPublisher: Send + Sync {
    fn publish(
        &self,
        routing_key: &str,
        event: &UserEvent,
    ) -> impl Future<Output = IdHubResult<()>> + Send;
}
