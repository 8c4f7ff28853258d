use crate::domain::types::{ZoneId, ZoneLabel, ZoneType};
use crate::error::Result;
use crate::storage::zones::ZoneStore;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;
use veloride_common::GeoPoint;

/// A named geographic region with a billing-relevant category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Zone {
    pub id: ZoneId,
    pub city: String,
    pub zone_type: ZoneType,
    pub polygon: Polygon,
    pub speed_limit: Option<u32>,
}

/// A simple closed ring of vertices, stored in (lat, lon) order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Polygon(Vec<GeoPoint>);

const BOUNDARY_EPSILON: f64 = 1e-12;

impl Polygon {
    pub fn new(ring: Vec<GeoPoint>) -> Self {
        Self(ring)
    }

    pub fn ring(&self) -> &[GeoPoint] {
        &self.0
    }

    /// Point-in-polygon test by ray casting; points on an edge or vertex
    /// count as contained.
    pub fn contains(&self, point: &GeoPoint) -> bool {
        let ring = &self.0;
        if ring.len() < 3 {
            return false;
        }

        let (x, y) = (point.lon, point.lat);
        let mut inside = false;
        let mut j = ring.len() - 1;
        for i in 0..ring.len() {
            let (xi, yi) = (ring[i].lon, ring[i].lat);
            let (xj, yj) = (ring[j].lon, ring[j].lat);

            if on_segment(xi, yi, xj, yj, x, y) {
                return true;
            }

            if ((yi > y) != (yj > y)) && (x < (xj - xi) * (y - yi) / (yj - yi) + xi) {
                inside = !inside;
            }
            j = i;
        }
        inside
    }
}

fn on_segment(x1: f64, y1: f64, x2: f64, y2: f64, px: f64, py: f64) -> bool {
    let cross = (px - x1) * (y2 - y1) - (py - y1) * (x2 - x1);
    if cross.abs() > BOUNDARY_EPSILON {
        return false;
    }
    px >= x1.min(x2) - BOUNDARY_EPSILON
        && px <= x1.max(x2) + BOUNDARY_EPSILON
        && py >= y1.min(y2) - BOUNDARY_EPSILON
        && py <= y1.max(y2) + BOUNDARY_EPSILON
}

/// Classifies a point into a zone label using city-scoped polygon
/// containment, one priority tier at a time.
///
/// Classification never fails: an unknown city, a point matching no tier,
/// or a store error all yield [`ZoneLabel::OutOfBounds`] so downstream
/// billing always has a defined input. Ties between polygons of the same
/// tier resolve to the store's first match; that ordering is an
/// implementation detail, not a contract.
pub struct ZoneClassifier {
    store: Arc<dyn ZoneStore>,
}

impl ZoneClassifier {
    pub fn new(store: Arc<dyn ZoneStore>) -> Self {
        Self { store }
    }

    pub async fn classify(&self, city: Option<&str>, point: &GeoPoint) -> ZoneLabel {
        let Some(city) = city else {
            return ZoneLabel::OutOfBounds;
        };

        for zone_type in ZoneType::PRIORITY {
            match self.store.zone_containing(city, zone_type, point).await {
                Ok(Some(_)) => return zone_type.label(),
                Ok(None) => {}
                Err(e) => {
                    warn!(city, %zone_type, error = %e, "zone lookup failed, classifying as outofbounds");
                    return ZoneLabel::OutOfBounds;
                }
            }
        }

        ZoneLabel::OutOfBounds
    }
}

/// In-memory zone store for tests and the embedded development mode.
pub struct ZoneIndex {
    zones: Arc<RwLock<Vec<Zone>>>,
}

impl ZoneIndex {
    pub fn new() -> Self {
        Self {
            zones: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn add(&self, zone: Zone) {
        let mut zones = self.zones.write().await;
        zones.push(zone);
    }
}

impl Default for ZoneIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ZoneStore for ZoneIndex {
    async fn zone_containing(
        &self,
        city: &str,
        zone_type: ZoneType,
        point: &GeoPoint,
    ) -> Result<Option<ZoneId>> {
        let zones = self.zones.read().await;
        Ok(zones
            .iter()
            .find(|z| z.city == city && z.zone_type == zone_type && z.polygon.contains(point))
            .map(|z| z.id))
    }
}
