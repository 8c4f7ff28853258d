use crate::config::EventChannels;
use crate::error::{RentalError, Result};
use crate::events::{LifecyclePublisher, RentalEndedEvent, RentalStartedEvent};
use crate::storage::postgres::PgDatabase;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

/// One serialized event on a named channel.
#[derive(Debug, Clone)]
pub struct LifecycleMessage {
    pub channel: String,
    pub payload: String,
}

/// In-process publisher over a tokio broadcast channel.
///
/// Used by tests and the embedded server's event log task.
pub struct BroadcastPublisher {
    channels: EventChannels,
    tx: broadcast::Sender<LifecycleMessage>,
}

impl BroadcastPublisher {
    pub fn new(channels: EventChannels, capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { channels, tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleMessage> {
        self.tx.subscribe()
    }

    fn send(&self, channel: &str, payload: String) {
        // No live subscribers is not a failure for a fire-and-forget
        // transport.
        let _ = self.tx.send(LifecycleMessage {
            channel: channel.to_string(),
            payload,
        });
    }
}

#[async_trait]
impl LifecyclePublisher for BroadcastPublisher {
    async fn publish_started(&self, event: &RentalStartedEvent) -> Result<()> {
        let payload = serde_json::to_string(event)?;
        self.send(&self.channels.started, payload);
        Ok(())
    }

    async fn publish_ended(&self, event: &RentalEndedEvent) -> Result<()> {
        let payload = serde_json::to_string(event)?;
        self.send(&self.channels.ended, payload);
        Ok(())
    }
}

/// Publisher backed by Postgres `NOTIFY`, so subscribers ride the same
/// connection infrastructure as the durable stores. Delivery is
/// at-most-once with no acknowledgement.
pub struct PgNotifyPublisher {
    db: Arc<PgDatabase>,
    channels: EventChannels,
}

impl PgNotifyPublisher {
    pub fn new(db: Arc<PgDatabase>, channels: EventChannels) -> Self {
        Self { db, channels }
    }

    async fn notify(&self, channel: &str, payload: String) -> Result<()> {
        sqlx::query("SELECT pg_notify($1, $2)")
            .bind(channel)
            .bind(&payload)
            .execute(self.db.pool())
            .await
            .map_err(|e| RentalError::PublishFailed {
                channel: channel.to_string(),
                source: Box::new(e),
            })?;

        debug!(channel, "published lifecycle event");
        Ok(())
    }
}

#[async_trait]
impl LifecyclePublisher for PgNotifyPublisher {
    async fn publish_started(&self, event: &RentalStartedEvent) -> Result<()> {
        let payload = serde_json::to_string(event)?;
        self.notify(&self.channels.started, payload).await
    }

    async fn publish_ended(&self, event: &RentalEndedEvent) -> Result<()> {
        let payload = serde_json::to_string(event)?;
        self.notify(&self.channels.ended, payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rentals::Rental;
    use crate::domain::types::{BikeId, CustomerId, ZoneLabel};
    use veloride_common::GeoPoint;

    #[tokio::test]
    async fn broadcast_delivers_to_subscribers() {
        let publisher = BroadcastPublisher::new(EventChannels::default_channels(), 16);
        let mut rx = publisher.subscribe();

        let rental = Rental::new(
            CustomerId::new(1),
            BikeId::new(2),
            GeoPoint::new(55.605, 12.993).unwrap(),
            ZoneLabel::Parking,
        );
        let event = RentalStartedEvent::from_rental(&rental, Some("malmo"));
        publisher.publish_started(&event).await.unwrap();

        let msg = rx.recv().await.unwrap();
        assert_eq!(msg.channel, "rental.started");
        let decoded: RentalStartedEvent = serde_json::from_str(&msg.payload).unwrap();
        assert_eq!(decoded.rental_id, rental.id);
    }

    #[tokio::test]
    async fn publishing_without_subscribers_is_ok() {
        let publisher = BroadcastPublisher::new(EventChannels::default_channels(), 16);
        let rental = Rental::new(
            CustomerId::new(1),
            BikeId::new(2),
            GeoPoint::new(55.605, 12.993).unwrap(),
            ZoneLabel::Free,
        );
        let event = RentalStartedEvent::from_rental(&rental, None);
        assert!(publisher.publish_started(&event).await.is_ok());
    }
}
