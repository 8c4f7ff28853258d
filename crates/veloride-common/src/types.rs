//! Common geographic types used across Veloride components

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error type for coordinate validation
#[derive(Debug, Error)]
pub enum PointError {
    #[error("coordinate is not a finite number")]
    NotFinite,
    #[error("latitude {0} outside [-90, 90]")]
    LatitudeOutOfRange(f64),
    #[error("longitude {0} outside [-180, 180]")]
    LongitudeOutOfRange(f64),
    #[error("unsupported GeoJSON geometry type: {0}")]
    UnsupportedGeometry(String),
    #[error("GeoJSON Point requires [lon, lat] coordinates, got {0} values")]
    BadCoordinateCount(usize),
}

/// The single internal coordinate representation.
///
/// All inbound point encodings normalize into this type at the service
/// boundary; everything downstream (classification, storage, billing)
/// operates on `GeoPoint` only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    /// Create a validated point. Rejects non-finite values and
    /// out-of-range coordinates.
    pub fn new(lat: f64, lon: f64) -> Result<Self, PointError> {
        if !lat.is_finite() || !lon.is_finite() {
            return Err(PointError::NotFinite);
        }
        if !(-90.0..=90.0).contains(&lat) {
            return Err(PointError::LatitudeOutOfRange(lat));
        }
        if !(-180.0..=180.0).contains(&lon) {
            return Err(PointError::LongitudeOutOfRange(lon));
        }
        Ok(Self { lat, lon })
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.lat, self.lon)
    }
}

/// Accepted wire encodings for a geographic point.
///
/// Producers send one of `{lat, lon}`, `{lat, lng}`, or a GeoJSON
/// `{"type": "Point", "coordinates": [lon, lat]}`. The variants exist only
/// at the boundary; call [`PointInput::normalize`] once and pass the
/// resulting [`GeoPoint`] on.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PointInput {
    GeoJson {
        #[serde(rename = "type")]
        kind: String,
        coordinates: Vec<f64>,
    },
    LatLon {
        lat: f64,
        lon: f64,
    },
    LatLng {
        lat: f64,
        lng: f64,
    },
}

impl PointInput {
    /// Normalize into the internal coordinate type.
    ///
    /// Equal real-world positions normalize identically regardless of which
    /// encoding carried them.
    pub fn normalize(&self) -> Result<GeoPoint, PointError> {
        match self {
            PointInput::LatLon { lat, lon } => GeoPoint::new(*lat, *lon),
            PointInput::LatLng { lat, lng } => GeoPoint::new(*lat, *lng),
            PointInput::GeoJson { kind, coordinates } => {
                if kind != "Point" {
                    return Err(PointError::UnsupportedGeometry(kind.clone()));
                }
                if coordinates.len() != 2 {
                    return Err(PointError::BadCoordinateCount(coordinates.len()));
                }
                // GeoJSON order is [lon, lat]
                GeoPoint::new(coordinates[1], coordinates[0])
            }
        }
    }
}

/// One telemetry sample produced by a vehicle during an active rental.
///
/// Appended in arrival order; coordinates are taken as-sent and never
/// range-checked. A sample with junk coordinates that ends up as a rental
/// endpoint classifies as out of bounds rather than erroring.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TelemetryPoint {
    pub lat: f64,
    pub lon: f64,
    pub speed: f64,
}

impl TelemetryPoint {
    pub fn position(&self) -> GeoPoint {
        GeoPoint {
            lat: self.lat,
            lon: self.lon,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn all_three_encodings_normalize_identically() {
        let inputs = [
            serde_json::json!({"lat": 55.605, "lon": 12.993}),
            serde_json::json!({"lat": 55.605, "lng": 12.993}),
            serde_json::json!({"type": "Point", "coordinates": [12.993, 55.605]}),
        ];

        let points: Vec<GeoPoint> = inputs
            .iter()
            .map(|v| {
                serde_json::from_value::<PointInput>(v.clone())
                    .expect("encoding should deserialize")
                    .normalize()
                    .expect("encoding should normalize")
            })
            .collect();

        assert_eq!(points[0], points[1]);
        assert_eq!(points[1], points[2]);
        assert_eq!(points[0], GeoPoint { lat: 55.605, lon: 12.993 });
    }

    #[test]
    fn rejects_out_of_range_coordinates() {
        assert!(matches!(
            GeoPoint::new(91.0, 0.0),
            Err(PointError::LatitudeOutOfRange(_))
        ));
        assert!(matches!(
            GeoPoint::new(0.0, 181.0),
            Err(PointError::LongitudeOutOfRange(_))
        ));
        assert!(matches!(
            GeoPoint::new(f64::NAN, 0.0),
            Err(PointError::NotFinite)
        ));
    }

    #[test]
    fn rejects_non_point_geojson() {
        let input: PointInput = serde_json::from_value(serde_json::json!({
            "type": "Polygon",
            "coordinates": [12.993, 55.605],
        }))
        .unwrap();

        assert!(matches!(
            input.normalize(),
            Err(PointError::UnsupportedGeometry(_))
        ));
    }

    #[test]
    fn unrecognizable_shape_fails_to_deserialize() {
        let result = serde_json::from_value::<PointInput>(serde_json::json!({
            "latitude": 55.605,
            "longitude": 12.993,
        }));
        assert!(result.is_err());
    }
}
