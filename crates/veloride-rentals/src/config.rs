//! Service configuration, loaded from defaults, an optional TOML file, and
//! `VELORIDE_`-prefixed environment overrides (in that precedence order).

use anyhow::{anyhow, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RentalsConfig {
    pub service: ServiceConfig,
    pub database: DatabaseConfig,
    pub http: HttpConfig,
    pub telemetry: TelemetryConfig,
    pub invoices: InvoiceConfig,
    pub events: EventChannels,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub environment: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout_seconds: u64,
    pub run_migrations: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HttpConfig {
    pub listen_address: String,
    pub port: u16,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Capacity of the in-process ingest channel between the HTTP surface
    /// and the route buffer consumer.
    pub ingest_buffer_size: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InvoiceConfig {
    pub due_days: i64,
}

/// Channel names for lifecycle notifications.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventChannels {
    pub started: String,
    pub ended: String,
}

impl EventChannels {
    pub fn default_channels() -> Self {
        Self {
            started: "rental.started".to_string(),
            ended: "rental.ended".to_string(),
        }
    }
}

impl Default for RentalsConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                name: "veloride-rentals".to_string(),
                environment: "development".to_string(),
            },
            database: DatabaseConfig {
                url: "postgres://veloride@localhost:5432/veloride".to_string(),
                max_connections: 16,
                connect_timeout_seconds: 5,
                run_migrations: true,
            },
            http: HttpConfig {
                listen_address: "0.0.0.0".to_string(),
                port: 8080,
            },
            telemetry: TelemetryConfig {
                ingest_buffer_size: 10_000,
            },
            invoices: InvoiceConfig { due_days: 30 },
            events: EventChannels::default_channels(),
        }
    }
}

impl RentalsConfig {
    pub fn load(path_override: Option<PathBuf>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(RentalsConfig::default()));

        if let Some(path) = path_override {
            if path.exists() {
                figment = figment.merge(Toml::file(&path));
            }
        } else {
            let default_path = PathBuf::from("rentals.toml");
            if default_path.exists() {
                figment = figment.merge(Toml::file(default_path));
            }
        }

        figment = figment.merge(Env::prefixed("VELORIDE_").split("__"));

        figment
            .extract()
            .map_err(|e| anyhow!("Configuration error: {}", e))
    }
}
