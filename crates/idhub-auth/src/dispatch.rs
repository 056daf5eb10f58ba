//! Detached event publication.

use std::sync::Arc;
use std::time::Duration;

use idhub_core::events::EventPublisher;
use idhub_core::models::event::UserEvent;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Publish `event` on a background task bounded by `timeout`.
///
/// The outcome is only logged. The caller's request neither waits for
/// the broker nor observes its failures, and the task keeps running
/// when the request that spawned it is cancelled.
pub fn publish_detached<E>(publisher: &Arc<E>, event: UserEvent, timeout: Duration) -> JoinHandle<()>
where
    E: EventPublisher + 'static,
{
    let publisher = Arc::clone(publisher);
    tokio::spawn(async move {
        let routing_key = event.event.clone();
        match tokio::time::timeout(timeout, publisher.publish(&routing_key, &event)).await {
            Ok(Ok(())) => {
                debug!(
                    routing_key = %routing_key,
                    user_id = %event.user_id,
                    trace_id = %event.trace_id,
                    "Event published"
                );
            }
            Ok(Err(e)) => {
                warn!(
                    routing_key = %routing_key,
                    user_id = %event.user_id,
                    trace_id = %event.trace_id,
                    error = %e,
                    "Event publish failed"
                );
            }
            Err(_) => {
                warn!(
                    routing_key = %routing_key,
                    user_id = %event.user_id,
                    trace_id = %event.trace_id,
                    timeout_ms = timeout.as_millis() as u64,
                    "Event publish timed out"
                );
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use idhub_core::error::{IdHubError, IdHubResult};
    use idhub_core::models::event::USER_CREATED;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    struct ChannelPublisher(mpsc::UnboundedSender<(String, UserEvent)>);

    impl EventPublisher for ChannelPublisher {
        async fn publish(&self, routing_key: &str, event: &UserEvent) -> IdHubResult<()> {
            self.0
                .send((routing_key.to_string(), event.clone()))
                .map_err(|e| IdHubError::Publish(e.to_string()))
        }
    }

    struct StuckPublisher;

    impl EventPublisher for StuckPublisher {
        async fn publish(&self, _routing_key: &str, _event: &UserEvent) -> IdHubResult<()> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn routes_by_event_name() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let publisher = Arc::new(ChannelPublisher(tx));
        let event = UserEvent::new(USER_CREATED, Uuid::new_v4(), Some("a@x.com".into()), "t1");

        publish_detached(&publisher, event.clone(), Duration::from_secs(1))
            .await
            .unwrap();

        let (key, received) = rx.recv().await.unwrap();
        assert_eq!(key, "user.created");
        assert_eq!(received, event);
    }

    #[tokio::test(start_paused = true)]
    async fn stuck_publisher_is_abandoned_after_timeout() {
        let publisher = Arc::new(StuckPublisher);
        let event = UserEvent::new(USER_CREATED, Uuid::new_v4(), None, "t1");

        // Completes (rather than hanging) once the timeout elapses.
        publish_detached(&publisher, event, Duration::from_millis(50))
            .await
            .unwrap();
    }
}
