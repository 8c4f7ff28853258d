//! Lifecycle event publishing.
//!
//! Publishing is best-effort and at-most-once: the orchestrator calls a
//! publisher only after the corresponding durable write has committed
//! (DB-first ordering), logs failures, and never retries or surfaces them.

pub mod publishers;

pub use publishers::{BroadcastPublisher, LifecycleMessage, PgNotifyPublisher};

use crate::domain::invoices::Invoice;
use crate::domain::rentals::Rental;
use crate::domain::types::{BikeId, CustomerId, RentalId, ZoneLabel};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RentalStartedEvent {
    pub rental_id: RentalId,
    pub customer_id: CustomerId,
    pub bike_id: BikeId,
    pub city: Option<String>,
    pub start_zone: ZoneLabel,
    pub start_time: DateTime<Utc>,
}

impl RentalStartedEvent {
    pub fn from_rental(rental: &Rental, city: Option<&str>) -> Self {
        Self {
            rental_id: rental.id,
            customer_id: rental.customer_id,
            bike_id: rental.bike_id,
            city: city.map(str::to_string),
            start_zone: rental.start_zone,
            start_time: rental.start_time,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RentalEndedEvent {
    pub rental_id: RentalId,
    pub customer_id: CustomerId,
    pub bike_id: BikeId,
    pub end_zone: ZoneLabel,
    pub end_time: DateTime<Utc>,
    pub amount: rust_decimal::Decimal,
}

impl RentalEndedEvent {
    pub fn new(rental: &Rental, end_zone: ZoneLabel, invoice: &Invoice) -> Self {
        Self {
            rental_id: rental.id,
            customer_id: rental.customer_id,
            bike_id: rental.bike_id,
            end_zone,
            end_time: rental.end_time.unwrap_or_else(Utc::now),
            amount: invoice.amount,
        }
    }
}

/// Best-effort notifier of lifecycle transitions.
#[async_trait]
pub trait LifecyclePublisher: Send + Sync {
    async fn publish_started(&self, event: &RentalStartedEvent) -> Result<()>;
    async fn publish_ended(&self, event: &RentalEndedEvent) -> Result<()>;
}
