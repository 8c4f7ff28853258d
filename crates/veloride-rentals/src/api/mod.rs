//! HTTP surface for the rental lifecycle.
//!
//! Thin by intent: handlers decode, delegate to the orchestrator or the
//! telemetry ingester, and map the error taxonomy onto status codes. No
//! lifecycle rules live here.

use crate::domain::lifecycle::RentalLifecycleOrchestrator;
use crate::domain::types::{BikeId, CustomerId, RentalId};
use crate::error::RentalError;
use crate::telemetry::{TelemetryIngester, TelemetrySample};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use veloride_common::{PointInput, TelemetryPoint};

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<RentalLifecycleOrchestrator>,
    pub ingester: Arc<TelemetryIngester>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/rentals", post(start_rental).get(list_rentals))
        .route("/v1/rentals/:id", get(get_rental))
        .route("/v1/rentals/:id/complete", post(complete_rental))
        .route("/v1/rentals/:id/telemetry", post(ingest_telemetry))
        .route("/v1/customers/:id/rentals", get(customer_rentals))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct StartRentalRequest {
    customer_id: i64,
    bike_id: i64,
    start_point: PointInput,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for RentalError {
    fn into_response(self) -> Response {
        let status = match &self {
            RentalError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
            RentalError::RentalNotFound { .. } | RentalError::BikeNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            RentalError::AlreadyCompleted { .. } | RentalError::NotCompleted { .. } => {
                StatusCode::CONFLICT
            }
            RentalError::NoRouteData { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            RentalError::StoreUnavailable { .. }
            | RentalError::PublishFailed { .. }
            | RentalError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

fn parse_rental_id(raw: &str) -> Result<RentalId, RentalError> {
    raw.parse().map_err(|_| RentalError::InvalidInput {
        field: "rental_id".to_string(),
        message: format!("not a valid rental id: {raw}"),
    })
}

async fn health() -> &'static str {
    "OK"
}

async fn start_rental(
    State(state): State<AppState>,
    Json(request): Json<StartRentalRequest>,
) -> Result<Response, RentalError> {
    let started = state
        .orchestrator
        .start_rental(
            CustomerId::new(request.customer_id),
            BikeId::new(request.bike_id),
            &request.start_point,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(started)).into_response())
}

async fn complete_rental(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, RentalError> {
    let rental_id = parse_rental_id(&id)?;
    let completed = state.orchestrator.complete_rental(&rental_id).await?;
    Ok(Json(completed).into_response())
}

async fn get_rental(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, RentalError> {
    let rental_id = parse_rental_id(&id)?;
    let rental = state.orchestrator.get_rental(&rental_id).await?;
    Ok(Json(rental).into_response())
}

async fn list_rentals(State(state): State<AppState>) -> Result<Response, RentalError> {
    let rentals = state.orchestrator.get_all_rentals().await?;
    Ok(Json(rentals).into_response())
}

async fn customer_rentals(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, RentalError> {
    let rentals = state
        .orchestrator
        .get_rentals_by_customer(CustomerId::new(id))
        .await?;
    Ok(Json(rentals).into_response())
}

async fn ingest_telemetry(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(point): Json<TelemetryPoint>,
) -> Result<Response, RentalError> {
    let rental_id = parse_rental_id(&id)?;
    state
        .ingester
        .ingest(TelemetrySample { rental_id, point })
        .await?;
    Ok(StatusCode::ACCEPTED.into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EventChannels;
    use crate::domain::invoices::InvoiceIssuer;
    use crate::domain::rentals::RentalLedger;
    use crate::domain::types::FeeSchedule;
    use crate::domain::zones::{ZoneClassifier, ZoneIndex};
    use crate::events::BroadcastPublisher;
    use crate::storage::bikes::InMemoryBikeDirectory;
    use crate::storage::fees::StaticFeeSchedule;
    use crate::storage::invoices::InvoiceBook;
    use crate::telemetry::InMemoryRouteBuffer;
    use axum::body::Body;
    use axum::http::Request;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use tower::ServiceExt;

    fn test_state() -> (AppState, tokio::sync::mpsc::Receiver<TelemetrySample>) {
        let rentals = Arc::new(RentalLedger::new());
        let bikes = Arc::new(InMemoryBikeDirectory::new());
        let classifier = ZoneClassifier::new(Arc::new(ZoneIndex::new()));
        let issuer = InvoiceIssuer::new(
            rentals.clone(),
            Arc::new(InvoiceBook::new()),
            Arc::new(StaticFeeSchedule::new(FeeSchedule {
                start: dec!(20),
                minute: dec!(1),
                discount: dec!(10),
                penalty: dec!(15),
                valid_from: Utc::now(),
            })),
        );
        let publisher = Arc::new(BroadcastPublisher::new(EventChannels::default_channels(), 16));
        let orchestrator = Arc::new(RentalLifecycleOrchestrator::new(
            rentals,
            bikes,
            classifier,
            Arc::new(InMemoryRouteBuffer::new()),
            issuer,
            publisher,
            30,
        ));
        let (ingester, rx) = TelemetryIngester::new(16);
        (
            AppState {
                orchestrator,
                ingester: Arc::new(ingester),
            },
            rx,
        )
    }

    #[tokio::test]
    async fn unknown_rental_is_404() {
        let (state, _rx) = test_state();
        let app = router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/v1/rentals/{}", RentalId::new()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn malformed_rental_id_is_400() {
        let (state, _rx) = test_state();
        let app = router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/v1/rentals/not-a-uuid")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_bike_is_404() {
        let (state, _rx) = test_state();
        let app = router(state);

        let body = serde_json::json!({
            "customer_id": 1,
            "bike_id": 42,
            "start_point": { "lat": 55.605, "lon": 12.993 }
        });
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/rentals")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn telemetry_post_is_accepted_and_queued() {
        let (state, mut rx) = test_state();
        let app = router(state);
        let rental_id = RentalId::new();

        let body = serde_json::json!({ "lat": 55.6, "lon": 12.9, "speed": 12.5 });
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/v1/rentals/{rental_id}/telemetry"))
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let sample = rx.recv().await.unwrap();
        assert_eq!(sample.rental_id, rental_id);
        assert_eq!(sample.point.speed, 12.5);
    }
}
