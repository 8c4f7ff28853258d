//! Shared building blocks for Veloride services.
//!
//! Geographic primitives live here so that every service normalizes inbound
//! coordinates the same way, and binaries share one logging setup.

pub mod logging;
pub mod types;

pub use types::{GeoPoint, PointError, PointInput, TelemetryPoint};
