//! Telemetry route buffering.
//!
//! An external producer appends position samples while a rental is active;
//! completion drains the whole buffer, in insertion order, into the
//! rental's route. Entries that fail to decode are skipped, never failing
//! the read. Nothing in the completion path clears a drained buffer.

pub mod buffer;
pub mod route_store;

pub use buffer::InMemoryRouteBuffer;
pub use route_store::SqlRouteBuffer;

use crate::domain::types::RentalId;
use crate::error::{RentalError, Result};
use async_trait::async_trait;
use tokio::sync::mpsc;
use veloride_common::TelemetryPoint;

/// Keyed, insertion-ordered store of telemetry points per rental.
#[async_trait]
pub trait RouteBuffer: Send + Sync {
    async fn append(&self, rental_id: &RentalId, point: TelemetryPoint) -> Result<()>;

    /// Full buffer contents in insertion order. Undecodable entries are
    /// skipped rather than failing the read.
    async fn read_all(&self, rental_id: &RentalId) -> Result<Vec<TelemetryPoint>>;

    /// Drop the buffer for a rental. Retention housekeeping only; the
    /// orchestrator never calls this.
    async fn clear(&self, rental_id: &RentalId) -> Result<()>;
}

/// One inbound telemetry sample, addressed to its rental.
#[derive(Debug, Clone)]
pub struct TelemetrySample {
    pub rental_id: RentalId,
    pub point: TelemetryPoint,
}

/// Bounded in-process front for telemetry ingestion.
///
/// The HTTP surface pushes samples here; a consumer task drains the channel
/// into the route buffer so slow storage never blocks producers.
pub struct TelemetryIngester {
    tx: mpsc::Sender<TelemetrySample>,
}

impl TelemetryIngester {
    pub fn new(buffer_size: usize) -> (Self, mpsc::Receiver<TelemetrySample>) {
        let (tx, rx) = mpsc::channel(buffer_size);
        (Self { tx }, rx)
    }

    pub async fn ingest(&self, sample: TelemetrySample) -> Result<()> {
        self.tx
            .send(sample)
            .await
            .map_err(|e| RentalError::StoreUnavailable {
                operation: "telemetry_ingest".to_string(),
                source: Box::new(e),
            })
    }
}
