//! Server assembly: connects storage, wires the lifecycle components, and
//! runs the HTTP surface plus the telemetry consumer task.

use crate::api::{self, AppState};
use crate::config::RentalsConfig;
use crate::domain::invoices::InvoiceIssuer;
use crate::domain::lifecycle::RentalLifecycleOrchestrator;
use crate::domain::zones::ZoneClassifier;
use crate::events::PgNotifyPublisher;
use crate::storage::{
    PgDatabase, SqlBikeDirectory, SqlFeeScheduleRepository, SqlInvoiceRepository,
    SqlRentalRepository, SqlZoneRepository,
};
use crate::telemetry::{RouteBuffer, SqlRouteBuffer, TelemetryIngester, TelemetrySample};
use anyhow::{Context, Result};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{info, warn};

pub struct RentalsServer {
    config: RentalsConfig,
}

impl RentalsServer {
    pub fn new(config: RentalsConfig) -> Self {
        Self { config }
    }

    /// Run until the shutdown future resolves.
    pub async fn serve(self, shutdown: impl Future<Output = ()> + Send + 'static) -> Result<()> {
        let db = Arc::new(
            PgDatabase::connect(&self.config.database)
                .await
                .context("database connection failed")?,
        );
        if self.config.database.run_migrations {
            db.run_migrations().await.context("migrations failed")?;
        }

        let rentals = Arc::new(SqlRentalRepository::new(db.clone()));
        let invoices = Arc::new(SqlInvoiceRepository::new(db.clone()));
        let fees = Arc::new(SqlFeeScheduleRepository::new(db.clone()));
        let bikes = Arc::new(SqlBikeDirectory::new(db.clone()));
        let zones = Arc::new(SqlZoneRepository::new(db.clone()));
        let route_buffer: Arc<dyn RouteBuffer> = Arc::new(SqlRouteBuffer::new(db.clone()));

        let classifier = ZoneClassifier::new(zones);
        let issuer = InvoiceIssuer::new(rentals.clone(), invoices, fees);
        let publisher = Arc::new(PgNotifyPublisher::new(db, self.config.events.clone()));

        let orchestrator = Arc::new(RentalLifecycleOrchestrator::new(
            rentals,
            bikes,
            classifier,
            route_buffer.clone(),
            issuer,
            publisher,
            self.config.invoices.due_days,
        ));

        let (ingester, rx) = TelemetryIngester::new(self.config.telemetry.ingest_buffer_size);
        let consumer = tokio::spawn(telemetry_consumer_loop(rx, route_buffer));

        let app = api::router(AppState {
            orchestrator,
            ingester: Arc::new(ingester),
        });

        let addr = format!(
            "{}:{}",
            self.config.http.listen_address, self.config.http.port
        );
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;
        info!(%addr, "rental lifecycle service listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .context("http server failed")?;

        // The ingester owned by the router is gone once serve returns, so
        // the channel closes and the consumer drains to completion.
        consumer.await.context("telemetry consumer panicked")?;
        info!("shutdown complete");
        Ok(())
    }
}

/// Drains ingested telemetry into the route buffer. Failed appends are
/// logged and dropped; a lossy route is preferable to backpressure on the
/// producers.
async fn telemetry_consumer_loop(
    mut rx: mpsc::Receiver<TelemetrySample>,
    buffer: Arc<dyn RouteBuffer>,
) {
    while let Some(sample) = rx.recv().await {
        if let Err(e) = buffer.append(&sample.rental_id, sample.point).await {
            warn!(rental_id = %sample.rental_id, error = %e, "failed to buffer telemetry sample");
        }
    }
    info!("telemetry consumer stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::RentalId;
    use crate::telemetry::InMemoryRouteBuffer;
    use veloride_common::TelemetryPoint;

    #[tokio::test]
    async fn consumer_drains_channel_into_buffer() {
        let buffer = Arc::new(InMemoryRouteBuffer::new());
        let (ingester, rx) = TelemetryIngester::new(8);
        let handle = tokio::spawn(telemetry_consumer_loop(rx, buffer.clone()));

        let rental_id = RentalId::new();
        for speed in [5.0, 6.0] {
            ingester
                .ingest(TelemetrySample {
                    rental_id,
                    point: TelemetryPoint {
                        lat: 55.6,
                        lon: 12.9,
                        speed,
                    },
                })
                .await
                .unwrap();
        }
        drop(ingester);
        handle.await.unwrap();

        let points = buffer.read_all(&rental_id).await.unwrap();
        assert_eq!(points.len(), 2);
    }
}
