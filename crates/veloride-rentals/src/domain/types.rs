use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Rental identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RentalId(Uuid);

impl RentalId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RentalId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RentalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RentalId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Invoice identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InvoiceId(Uuid);

impl InvoiceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for InvoiceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for InvoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Zone identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ZoneId(Uuid);

impl ZoneId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ZoneId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Customer identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CustomerId(i64);

impl CustomerId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Bike identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BikeId(i64);

impl BikeId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for BikeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Geographic zone categories as stored, highest billing priority first.
///
/// `City` zones are the free-floating areas of a municipality; they classify
/// as [`ZoneLabel::Free`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneType {
    Charging,
    Parking,
    City,
    Slow,
}

impl ZoneType {
    /// Classification tiers in strict priority order.
    pub const PRIORITY: [ZoneType; 4] = [
        ZoneType::Charging,
        ZoneType::Parking,
        ZoneType::City,
        ZoneType::Slow,
    ];

    pub fn label(&self) -> ZoneLabel {
        match self {
            ZoneType::Charging => ZoneLabel::Charging,
            ZoneType::Parking => ZoneLabel::Parking,
            ZoneType::City => ZoneLabel::Free,
            ZoneType::Slow => ZoneLabel::Slow,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ZoneType::Charging => "charging",
            ZoneType::Parking => "parking",
            ZoneType::City => "city",
            ZoneType::Slow => "slow",
        }
    }
}

impl fmt::Display for ZoneType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The outcome of classifying a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneLabel {
    Charging,
    Parking,
    Free,
    Slow,
    #[serde(rename = "outofbounds")]
    OutOfBounds,
}

impl ZoneLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ZoneLabel::Charging => "charging",
            ZoneLabel::Parking => "parking",
            ZoneLabel::Free => "free",
            ZoneLabel::Slow => "slow",
            ZoneLabel::OutOfBounds => "outofbounds",
        }
    }

    /// Whether this label counts as a proper docking area for billing
    /// (no penalty on end, no forfeited discount on start).
    pub fn is_dock(&self) -> bool {
        matches!(self, ZoneLabel::Charging | ZoneLabel::Parking)
    }

    /// Lenient parse used when reading stored rows.
    pub fn parse(s: &str) -> Self {
        match s {
            "charging" => ZoneLabel::Charging,
            "parking" => ZoneLabel::Parking,
            "free" => ZoneLabel::Free,
            "slow" => ZoneLabel::Slow,
            _ => ZoneLabel::OutOfBounds,
        }
    }
}

impl fmt::Display for ZoneLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Pricing parameters in effect at invoice time.
///
/// Schedules are versioned by `valid_from`; callers always read the newest
/// snapshot and never mutate one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeSchedule {
    pub start: Decimal,
    pub minute: Decimal,
    pub discount: Decimal,
    pub penalty: Decimal,
    pub valid_from: DateTime<Utc>,
}

/// Invoice payment states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Unpaid,
    Paid,
    Void,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Unpaid => "unpaid",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Void => "void",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "paid" => InvoiceStatus::Paid,
            "void" => InvoiceStatus::Void,
            _ => InvoiceStatus::Unpaid,
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zone_priority_order_is_strict() {
        assert_eq!(
            ZoneType::PRIORITY,
            [
                ZoneType::Charging,
                ZoneType::Parking,
                ZoneType::City,
                ZoneType::Slow
            ]
        );
    }

    #[test]
    fn city_zones_classify_as_free() {
        assert_eq!(ZoneType::City.label(), ZoneLabel::Free);
    }

    #[test]
    fn labels_round_trip_through_text() {
        for label in [
            ZoneLabel::Charging,
            ZoneLabel::Parking,
            ZoneLabel::Free,
            ZoneLabel::Slow,
            ZoneLabel::OutOfBounds,
        ] {
            assert_eq!(ZoneLabel::parse(label.as_str()), label);
        }
        assert_eq!(ZoneLabel::parse("garbage"), ZoneLabel::OutOfBounds);
    }

    #[test]
    fn rental_id_round_trips_through_string() {
        let id = RentalId::new();
        let parsed: RentalId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }
}
