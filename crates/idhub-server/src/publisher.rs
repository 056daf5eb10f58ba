//! Event sink that writes domain events to the structured log.

use idhub_core::error::{IdHubError, IdHubResult};
use idhub_core::events::EventPublisher;
use idhub_core::models::event::UserEvent;
use tracing::info;

/// Publishes by logging the JSON payload under the `idhub::events`
/// target, where a log shipper can pick it up.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEventPublisher;

impl EventPublisher for LogEventPublisher {
    async fn publish(&self, routing_key: &str, event: &UserEvent) -> IdHubResult<()> {
        let payload =
            serde_json::to_string(event).map_err(|e| IdHubError::Publish(e.to_string()))?;
        info!(
            target: "idhub::events",
            routing_key,
            user_id = %event.user_id,
            trace_id = %event.trace_id,
            payload = %payload,
            "Domain event"
        );
        Ok(())
    }
}
