use crate::domain::types::RentalId;
use crate::error::Result;
use crate::telemetry::RouteBuffer;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use veloride_common::TelemetryPoint;

/// In-memory route buffer for tests and the embedded development mode.
///
/// Entries are held as raw JSON, mirroring the wire-format storage of the
/// SQL buffer, so decode-skip behavior is identical in both.
pub struct InMemoryRouteBuffer {
    routes: Arc<RwLock<HashMap<RentalId, Vec<serde_json::Value>>>>,
}

impl InMemoryRouteBuffer {
    pub fn new() -> Self {
        Self {
            routes: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Append an arbitrary JSON entry, bypassing typed encoding. Lets tests
    /// exercise the decode-skip path with corrupt entries.
    pub async fn append_raw(&self, rental_id: &RentalId, entry: serde_json::Value) {
        let mut routes = self.routes.write().await;
        routes.entry(*rental_id).or_default().push(entry);
    }
}

impl Default for InMemoryRouteBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RouteBuffer for InMemoryRouteBuffer {
    async fn append(&self, rental_id: &RentalId, point: TelemetryPoint) -> Result<()> {
        let entry = serde_json::to_value(point)?;
        let mut routes = self.routes.write().await;
        routes.entry(*rental_id).or_default().push(entry);
        Ok(())
    }

    async fn read_all(&self, rental_id: &RentalId) -> Result<Vec<TelemetryPoint>> {
        let routes = self.routes.read().await;
        let entries = match routes.get(rental_id) {
            Some(entries) => entries,
            None => return Ok(Vec::new()),
        };

        let mut points = Vec::with_capacity(entries.len());
        for entry in entries {
            match serde_json::from_value::<TelemetryPoint>(entry.clone()) {
                Ok(point) => points.push(point),
                Err(e) => {
                    debug!(rental_id = %rental_id, error = %e, "skipping undecodable telemetry entry");
                }
            }
        }
        Ok(points)
    }

    async fn clear(&self, rental_id: &RentalId) -> Result<()> {
        let mut routes = self.routes.write().await;
        routes.remove(rental_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(speed: f64) -> TelemetryPoint {
        TelemetryPoint {
            lat: 55.6,
            lon: 12.9,
            speed,
        }
    }

    #[tokio::test]
    async fn read_preserves_insertion_order() {
        let buffer = InMemoryRouteBuffer::new();
        let id = RentalId::new();

        for speed in [1.0, 2.0, 3.0] {
            buffer.append(&id, sample(speed)).await.unwrap();
        }

        let points = buffer.read_all(&id).await.unwrap();
        let speeds: Vec<f64> = points.iter().map(|p| p.speed).collect();
        assert_eq!(speeds, vec![1.0, 2.0, 3.0]);
    }

    #[tokio::test]
    async fn undecodable_entries_are_skipped_not_fatal() {
        let buffer = InMemoryRouteBuffer::new();
        let id = RentalId::new();

        buffer.append(&id, sample(1.0)).await.unwrap();
        buffer
            .append_raw(&id, serde_json::json!({"garbage": true}))
            .await;
        buffer.append(&id, sample(3.0)).await.unwrap();

        let points = buffer.read_all(&id).await.unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].speed, 3.0);
    }

    #[tokio::test]
    async fn unknown_rental_reads_empty() {
        let buffer = InMemoryRouteBuffer::new();
        assert!(buffer.read_all(&RentalId::new()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn clear_drops_the_buffer() {
        let buffer = InMemoryRouteBuffer::new();
        let id = RentalId::new();
        buffer.append(&id, sample(1.0)).await.unwrap();
        buffer.clear(&id).await.unwrap();
        assert!(buffer.read_all(&id).await.unwrap().is_empty());
    }
}
