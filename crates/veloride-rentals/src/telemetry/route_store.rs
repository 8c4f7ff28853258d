use crate::domain::types::RentalId;
use crate::error::{RentalError, Result};
use crate::storage::postgres::PgDatabase;
use crate::telemetry::RouteBuffer;
use async_trait::async_trait;
use sqlx::Row;
use std::sync::Arc;
use tracing::debug;
use veloride_common::TelemetryPoint;

/// Route buffer backed by an append-only Postgres table, ordered by a
/// bigserial sequence so reads replay insertion order exactly.
pub struct SqlRouteBuffer {
    db: Arc<PgDatabase>,
}

impl SqlRouteBuffer {
    pub fn new(db: Arc<PgDatabase>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RouteBuffer for SqlRouteBuffer {
    async fn append(&self, rental_id: &RentalId, point: TelemetryPoint) -> Result<()> {
        let entry = serde_json::to_value(point)?;

        sqlx::query(
            r#"
            INSERT INTO route_points (rental_id, point)
            VALUES ($1, $2)
            "#,
        )
        .bind(rental_id.as_uuid())
        .bind(entry)
        .execute(self.db.pool())
        .await
        .map_err(|e| RentalError::store_unavailable("append_route_point", e))?;

        Ok(())
    }

    async fn read_all(&self, rental_id: &RentalId) -> Result<Vec<TelemetryPoint>> {
        let rows = sqlx::query(
            r#"
            SELECT point
            FROM route_points
            WHERE rental_id = $1
            ORDER BY seq ASC
            "#,
        )
        .bind(rental_id.as_uuid())
        .fetch_all(self.db.pool())
        .await
        .map_err(|e| RentalError::store_unavailable("read_route", e))?;

        let mut points = Vec::with_capacity(rows.len());
        for row in rows {
            let entry: serde_json::Value = row.get("point");
            match serde_json::from_value::<TelemetryPoint>(entry) {
                Ok(point) => points.push(point),
                Err(e) => {
                    debug!(rental_id = %rental_id, error = %e, "skipping undecodable telemetry entry");
                }
            }
        }
        Ok(points)
    }

    async fn clear(&self, rental_id: &RentalId) -> Result<()> {
        sqlx::query("DELETE FROM route_points WHERE rental_id = $1")
            .bind(rental_id.as_uuid())
            .execute(self.db.pool())
            .await
            .map_err(|e| RentalError::store_unavailable("clear_route", e))?;

        Ok(())
    }
}
