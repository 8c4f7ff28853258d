use crate::domain::types::{ZoneId, ZoneType};
use crate::domain::zones::Polygon;
use crate::error::{RentalError, Result};
use crate::storage::postgres::PgDatabase;
use async_trait::async_trait;
use sqlx::Row;
use std::sync::Arc;
use tracing::warn;
use veloride_common::GeoPoint;

/// Zone geometry lookup, scoped to one city and one tier at a time.
#[async_trait]
pub trait ZoneStore: Send + Sync {
    async fn zone_containing(
        &self,
        city: &str,
        zone_type: ZoneType,
        point: &GeoPoint,
    ) -> Result<Option<ZoneId>>;
}

/// Zone store backed by the `zones` table.
///
/// Polygons are stored as JSONB arrays of `[lon, lat]` vertex pairs.
/// Containment runs here rather than in SQL; city plus tier keeps the
/// candidate set small enough that the extra round-trip work in the
/// database is not worth a geometry extension.
pub struct SqlZoneRepository {
    db: Arc<PgDatabase>,
}

impl SqlZoneRepository {
    pub fn new(db: Arc<PgDatabase>) -> Self {
        Self { db }
    }
}

fn decode_ring(raw: &serde_json::Value) -> Option<Polygon> {
    let pairs: Vec<[f64; 2]> = serde_json::from_value(raw.clone()).ok()?;
    Some(Polygon::new(
        pairs
            .into_iter()
            .map(|[lon, lat]| GeoPoint { lat, lon })
            .collect(),
    ))
}

#[async_trait]
impl ZoneStore for SqlZoneRepository {
    async fn zone_containing(
        &self,
        city: &str,
        zone_type: ZoneType,
        point: &GeoPoint,
    ) -> Result<Option<ZoneId>> {
        let rows = sqlx::query(
            r#"
            SELECT zone_id, polygon
            FROM zones
            WHERE city = $1 AND zone_type = $2
            ORDER BY zone_id ASC
            "#,
        )
        .bind(city)
        .bind(zone_type.as_str())
        .fetch_all(self.db.pool())
        .await
        .map_err(|e| RentalError::store_unavailable("zone_containing", e))?;

        for row in rows {
            let zone_id = ZoneId::from_uuid(row.get("zone_id"));
            let raw: serde_json::Value = row.get("polygon");
            let Some(polygon) = decode_ring(&raw) else {
                warn!(%zone_id, city, %zone_type, "skipping zone with undecodable polygon");
                continue;
            };
            if polygon.contains(point) {
                return Ok(Some(zone_id));
            }
        }

        Ok(None)
    }
}
