use crate::domain::types::{BikeId, CustomerId, RentalId, ZoneLabel};
use crate::error::Result;
use crate::storage::rentals::RentalRepository;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use veloride_common::{GeoPoint, TelemetryPoint};

/// One billable vehicle checkout.
///
/// Invariants: `end_time` is `None` exactly while the rental is active; the
/// start fields never change after creation; the end fields and `route` are
/// written exactly once, by the completion update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rental {
    pub id: RentalId,
    pub customer_id: CustomerId,
    pub bike_id: BikeId,
    pub start_point: GeoPoint,
    pub start_time: DateTime<Utc>,
    pub start_zone: ZoneLabel,
    pub end_point: Option<GeoPoint>,
    pub end_time: Option<DateTime<Utc>>,
    pub end_zone: Option<ZoneLabel>,
    pub route: Vec<TelemetryPoint>,
}

impl Rental {
    pub fn new(
        customer_id: CustomerId,
        bike_id: BikeId,
        start_point: GeoPoint,
        start_zone: ZoneLabel,
    ) -> Self {
        Self {
            id: RentalId::new(),
            customer_id,
            bike_id,
            start_point,
            start_time: Utc::now(),
            start_zone,
            end_point: None,
            end_time: None,
            end_zone: None,
            route: Vec::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.end_time.is_none()
    }

    /// Elapsed ride time; for active rentals, up to now.
    pub fn duration(&self) -> chrono::Duration {
        let end = self.end_time.unwrap_or_else(Utc::now);
        end - self.start_time
    }
}

/// In-memory rental store.
///
/// Backs tests and the embedded development mode; the conditional
/// completion semantics match the SQL repository exactly, with the write
/// lock standing in for the row-level atomicity of the `UPDATE`.
pub struct RentalLedger {
    rentals: Arc<RwLock<HashMap<RentalId, Rental>>>,
}

impl RentalLedger {
    pub fn new() -> Self {
        Self {
            rentals: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for RentalLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RentalRepository for RentalLedger {
    async fn create(&self, rental: &Rental) -> Result<()> {
        let mut rentals = self.rentals.write().await;
        rentals.insert(rental.id, rental.clone());
        Ok(())
    }

    async fn get(&self, id: &RentalId) -> Result<Option<Rental>> {
        let rentals = self.rentals.read().await;
        Ok(rentals.get(id).cloned())
    }

    async fn get_all(&self) -> Result<Vec<Rental>> {
        let rentals = self.rentals.read().await;
        let mut all: Vec<Rental> = rentals.values().cloned().collect();
        all.sort_by_key(|r| r.start_time);
        Ok(all)
    }

    async fn get_by_customer(&self, customer_id: CustomerId) -> Result<Vec<Rental>> {
        let rentals = self.rentals.read().await;
        let mut matching: Vec<Rental> = rentals
            .values()
            .filter(|r| r.customer_id == customer_id)
            .cloned()
            .collect();
        matching.sort_by_key(|r| r.start_time);
        Ok(matching)
    }

    async fn complete(
        &self,
        id: &RentalId,
        end_point: GeoPoint,
        end_zone: ZoneLabel,
        end_time: DateTime<Utc>,
        route: &[TelemetryPoint],
    ) -> Result<u64> {
        let mut rentals = self.rentals.write().await;
        match rentals.get_mut(id) {
            Some(rental) if rental.end_time.is_none() => {
                rental.end_point = Some(end_point);
                rental.end_zone = Some(end_zone);
                rental.end_time = Some(end_time);
                rental.route = route.to_vec();
                Ok(1)
            }
            // Missing or already completed: no write, zero rows affected.
            _ => Ok(0),
        }
    }
}
