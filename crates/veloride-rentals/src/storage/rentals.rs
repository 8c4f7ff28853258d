use crate::domain::rentals::Rental;
use crate::domain::types::{BikeId, CustomerId, RentalId, ZoneLabel};
use crate::error::{RentalError, Result};
use crate::storage::postgres::PgDatabase;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use std::sync::Arc;
use veloride_common::{GeoPoint, TelemetryPoint};

/// Durable rental store.
///
/// `complete` is the sole concurrency-control primitive for the
/// Active→Completed transition: a conditional update restricted to rows
/// that are still active, reporting affected rows. Callers translate an
/// affected count of zero into `AlreadyCompleted`.
#[async_trait]
pub trait RentalRepository: Send + Sync {
    async fn create(&self, rental: &Rental) -> Result<()>;
    async fn get(&self, id: &RentalId) -> Result<Option<Rental>>;
    async fn get_all(&self) -> Result<Vec<Rental>>;
    async fn get_by_customer(&self, customer_id: CustomerId) -> Result<Vec<Rental>>;
    async fn complete(
        &self,
        id: &RentalId,
        end_point: GeoPoint,
        end_zone: ZoneLabel,
        end_time: DateTime<Utc>,
        route: &[TelemetryPoint],
    ) -> Result<u64>;
}

pub struct SqlRentalRepository {
    db: Arc<PgDatabase>,
}

impl SqlRentalRepository {
    pub fn new(db: Arc<PgDatabase>) -> Self {
        Self { db }
    }

    fn rental_from_row(row: &sqlx::postgres::PgRow) -> Rental {
        let start_zone: String = row.get("start_zone");
        let end_zone: Option<String> = row.get("end_zone");
        let end_lat: Option<f64> = row.get("end_lat");
        let end_lon: Option<f64> = row.get("end_lon");

        let end_point = match (end_lat, end_lon) {
            (Some(lat), Some(lon)) => Some(GeoPoint { lat, lon }),
            _ => None,
        };

        Rental {
            id: RentalId::from_uuid(row.get("rental_id")),
            customer_id: CustomerId::new(row.get("customer_id")),
            bike_id: BikeId::new(row.get("bike_id")),
            start_point: GeoPoint {
                lat: row.get("start_lat"),
                lon: row.get("start_lon"),
            },
            start_time: row.get("start_time"),
            start_zone: ZoneLabel::parse(&start_zone),
            end_point,
            end_time: row.get("end_time"),
            end_zone: end_zone.as_deref().map(ZoneLabel::parse),
            route: serde_json::from_value(row.get("route")).unwrap_or_default(),
        }
    }
}

#[async_trait]
impl RentalRepository for SqlRentalRepository {
    async fn create(&self, rental: &Rental) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO rentals
            (rental_id, customer_id, bike_id, start_lat, start_lon, start_time, start_zone, route)
            VALUES ($1, $2, $3, $4, $5, $6, $7, '[]'::jsonb)
            "#,
        )
        .bind(rental.id.as_uuid())
        .bind(rental.customer_id.value())
        .bind(rental.bike_id.value())
        .bind(rental.start_point.lat)
        .bind(rental.start_point.lon)
        .bind(rental.start_time)
        .bind(rental.start_zone.as_str())
        .execute(self.db.pool())
        .await
        .map_err(|e| RentalError::store_unavailable("create_rental", e))?;

        Ok(())
    }

    async fn get(&self, id: &RentalId) -> Result<Option<Rental>> {
        let row = sqlx::query(
            r#"
            SELECT rental_id, customer_id, bike_id, start_lat, start_lon, start_time,
                   start_zone, end_lat, end_lon, end_time, end_zone, route
            FROM rentals
            WHERE rental_id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(self.db.pool())
        .await
        .map_err(|e| RentalError::store_unavailable("get_rental", e))?;

        Ok(row.map(|r| Self::rental_from_row(&r)))
    }

    async fn get_all(&self) -> Result<Vec<Rental>> {
        let rows = sqlx::query(
            r#"
            SELECT rental_id, customer_id, bike_id, start_lat, start_lon, start_time,
                   start_zone, end_lat, end_lon, end_time, end_zone, route
            FROM rentals
            ORDER BY start_time ASC
            "#,
        )
        .fetch_all(self.db.pool())
        .await
        .map_err(|e| RentalError::store_unavailable("get_all_rentals", e))?;

        Ok(rows.iter().map(Self::rental_from_row).collect())
    }

    async fn get_by_customer(&self, customer_id: CustomerId) -> Result<Vec<Rental>> {
        let rows = sqlx::query(
            r#"
            SELECT rental_id, customer_id, bike_id, start_lat, start_lon, start_time,
                   start_zone, end_lat, end_lon, end_time, end_zone, route
            FROM rentals
            WHERE customer_id = $1
            ORDER BY start_time ASC
            "#,
        )
        .bind(customer_id.value())
        .fetch_all(self.db.pool())
        .await
        .map_err(|e| RentalError::store_unavailable("get_rentals_by_customer", e))?;

        Ok(rows.iter().map(Self::rental_from_row).collect())
    }

    async fn complete(
        &self,
        id: &RentalId,
        end_point: GeoPoint,
        end_zone: ZoneLabel,
        end_time: DateTime<Utc>,
        route: &[TelemetryPoint],
    ) -> Result<u64> {
        let route_json = serde_json::to_value(route)?;

        // The `end_time IS NULL` guard makes this the single point where
        // exactly one of N concurrent completions wins.
        let result = sqlx::query(
            r#"
            UPDATE rentals
            SET end_lat = $2, end_lon = $3, end_zone = $4, end_time = $5, route = $6
            WHERE rental_id = $1 AND end_time IS NULL
            "#,
        )
        .bind(id.as_uuid())
        .bind(end_point.lat)
        .bind(end_point.lon)
        .bind(end_zone.as_str())
        .bind(end_time)
        .bind(route_json)
        .execute(self.db.pool())
        .await
        .map_err(|e| RentalError::store_unavailable("complete_rental", e))?;

        Ok(result.rows_affected())
    }
}
