use crate::domain::types::BikeId;
use crate::error::{RentalError, Result};
use crate::storage::postgres::PgDatabase;
use async_trait::async_trait;
use sqlx::Row;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// What the lifecycle needs to know about a bike: that it exists, and which
/// city's zones apply to it. A bike may legitimately have no city (e.g. in
/// transport between markets); its rides then classify as out of bounds.
#[derive(Debug, Clone)]
pub struct Bike {
    pub id: BikeId,
    pub city: Option<String>,
}

#[async_trait]
pub trait BikeDirectory: Send + Sync {
    async fn lookup(&self, id: BikeId) -> Result<Option<Bike>>;
}

pub struct SqlBikeDirectory {
    db: Arc<PgDatabase>,
}

impl SqlBikeDirectory {
    pub fn new(db: Arc<PgDatabase>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl BikeDirectory for SqlBikeDirectory {
    async fn lookup(&self, id: BikeId) -> Result<Option<Bike>> {
        let row = sqlx::query("SELECT bike_id, city FROM bikes WHERE bike_id = $1")
            .bind(id.value())
            .fetch_optional(self.db.pool())
            .await
            .map_err(|e| RentalError::store_unavailable("lookup_bike", e))?;

        Ok(row.map(|r| Bike {
            id: BikeId::new(r.get("bike_id")),
            city: r.get("city"),
        }))
    }
}

/// In-memory bike directory for tests.
pub struct InMemoryBikeDirectory {
    bikes: Arc<RwLock<HashMap<BikeId, Bike>>>,
}

impl InMemoryBikeDirectory {
    pub fn new() -> Self {
        Self {
            bikes: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn add(&self, id: BikeId, city: Option<&str>) {
        let mut bikes = self.bikes.write().await;
        bikes.insert(
            id,
            Bike {
                id,
                city: city.map(str::to_string),
            },
        );
    }
}

impl Default for InMemoryBikeDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BikeDirectory for InMemoryBikeDirectory {
    async fn lookup(&self, id: BikeId) -> Result<Option<Bike>> {
        let bikes = self.bikes.read().await;
        Ok(bikes.get(&id).cloned())
    }
}
