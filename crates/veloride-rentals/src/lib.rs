pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod events;
pub mod server;
pub mod storage;
pub mod telemetry;

pub use config::RentalsConfig;
pub use error::{RentalError, Result};
