//! Rental lifecycle orchestration.
//!
//! The orchestrator owns the ordering rules of the lifecycle: durable writes
//! first, then best-effort event publishing. The Active→Completed transition
//! is guarded by a single conditional update in the rental store, so N
//! concurrent completions resolve to exactly one winner without any locking
//! here.

use crate::domain::invoices::{Invoice, InvoiceIssuer};
use crate::domain::rentals::Rental;
use crate::domain::types::{BikeId, CustomerId, RentalId, ZoneLabel};
use crate::domain::zones::ZoneClassifier;
use crate::error::{RentalError, Result};
use crate::events::{LifecyclePublisher, RentalEndedEvent, RentalStartedEvent};
use crate::storage::bikes::BikeDirectory;
use crate::storage::rentals::RentalRepository;
use crate::telemetry::RouteBuffer;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use veloride_common::{GeoPoint, PointInput, TelemetryPoint};

/// Outcome of starting a rental.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RentalStarted {
    pub rental_id: RentalId,
    pub start_zone: ZoneLabel,
    pub city: Option<String>,
}

/// Outcome of completing a rental.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RentalCompleted {
    pub rental_id: RentalId,
    pub bike_id: BikeId,
    pub end_point: GeoPoint,
    pub end_zone: ZoneLabel,
    pub route: Vec<TelemetryPoint>,
    pub invoice: Invoice,
}

pub struct RentalLifecycleOrchestrator {
    rentals: Arc<dyn RentalRepository>,
    bikes: Arc<dyn BikeDirectory>,
    classifier: ZoneClassifier,
    route_buffer: Arc<dyn RouteBuffer>,
    issuer: InvoiceIssuer,
    publisher: Arc<dyn LifecyclePublisher>,
    due_days: i64,
}

impl RentalLifecycleOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        rentals: Arc<dyn RentalRepository>,
        bikes: Arc<dyn BikeDirectory>,
        classifier: ZoneClassifier,
        route_buffer: Arc<dyn RouteBuffer>,
        issuer: InvoiceIssuer,
        publisher: Arc<dyn LifecyclePublisher>,
        due_days: i64,
    ) -> Self {
        Self {
            rentals,
            bikes,
            classifier,
            route_buffer,
            issuer,
            publisher,
            due_days,
        }
    }

    /// Open a new billable rental at the given position.
    ///
    /// The start zone is classified against the bike's city and persisted
    /// with the rental; the started event goes out only after the write
    /// has committed, and its failure is logged, never surfaced.
    pub async fn start_rental(
        &self,
        customer_id: CustomerId,
        bike_id: BikeId,
        start_point: &PointInput,
    ) -> Result<RentalStarted> {
        let point = start_point
            .normalize()
            .map_err(|e| RentalError::InvalidInput {
                field: "start_point".to_string(),
                message: e.to_string(),
            })?;

        let bike = self
            .bikes
            .lookup(bike_id)
            .await?
            .ok_or_else(|| RentalError::BikeNotFound {
                id: bike_id.to_string(),
            })?;

        let start_zone = self.classifier.classify(bike.city.as_deref(), &point).await;
        let rental = Rental::new(customer_id, bike_id, point, start_zone);
        self.rentals.create(&rental).await?;

        info!(
            rental_id = %rental.id,
            %customer_id,
            %bike_id,
            %start_zone,
            "rental started"
        );

        let event = RentalStartedEvent::from_rental(&rental, bike.city.as_deref());
        if let Err(e) = self.publisher.publish_started(&event).await {
            warn!(rental_id = %rental.id, error = %e, "rental.started publish failed");
        }

        Ok(RentalStarted {
            rental_id: rental.id,
            start_zone,
            city: bike.city,
        })
    }

    /// Close an active rental, bill it, and announce the completion.
    ///
    /// The route buffer is drained first; the last sample's position becomes
    /// the end point. The conditional completion write is the only arbiter
    /// between racing calls: the losers see zero affected rows and get
    /// `AlreadyCompleted`, with nothing persisted on their behalf.
    pub async fn complete_rental(&self, rental_id: &RentalId) -> Result<RentalCompleted> {
        let mut rental =
            self.rentals
                .get(rental_id)
                .await?
                .ok_or_else(|| RentalError::RentalNotFound {
                    id: rental_id.to_string(),
                })?;

        let route = self.route_buffer.read_all(rental_id).await?;
        let Some(tail) = route.last() else {
            return Err(RentalError::NoRouteData {
                id: rental_id.to_string(),
            });
        };
        let end_point = tail.position();

        let city = self
            .bikes
            .lookup(rental.bike_id)
            .await?
            .and_then(|b| b.city);
        let end_zone = self.classifier.classify(city.as_deref(), &end_point).await;
        let end_time = Utc::now();

        let affected = self
            .rentals
            .complete(rental_id, end_point, end_zone, end_time, &route)
            .await?;
        if affected == 0 {
            return Err(RentalError::AlreadyCompleted {
                id: rental_id.to_string(),
            });
        }

        let invoice = self.issuer.create_for_rental(rental_id, self.due_days).await?;

        info!(
            rental_id = %rental_id,
            %end_zone,
            amount = %invoice.amount,
            points = route.len(),
            "rental completed"
        );

        rental.end_point = Some(end_point);
        rental.end_time = Some(end_time);
        rental.end_zone = Some(end_zone);

        let event = RentalEndedEvent::new(&rental, end_zone, &invoice);
        if let Err(e) = self.publisher.publish_ended(&event).await {
            warn!(rental_id = %rental_id, error = %e, "rental.ended publish failed");
        }

        Ok(RentalCompleted {
            rental_id: *rental_id,
            bike_id: rental.bike_id,
            end_point,
            end_zone,
            route,
            invoice,
        })
    }

    pub async fn get_rental(&self, rental_id: &RentalId) -> Result<Rental> {
        self.rentals
            .get(rental_id)
            .await?
            .ok_or_else(|| RentalError::RentalNotFound {
                id: rental_id.to_string(),
            })
    }

    pub async fn get_all_rentals(&self) -> Result<Vec<Rental>> {
        self.rentals.get_all().await
    }

    pub async fn get_rentals_by_customer(&self, customer_id: CustomerId) -> Result<Vec<Rental>> {
        self.rentals.get_by_customer(customer_id).await
    }
}
