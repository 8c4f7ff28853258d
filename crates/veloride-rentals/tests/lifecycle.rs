//! End-to-end lifecycle flows over the in-memory stores.

use chrono::{Duration, Utc};
use rust_decimal_macros::dec;
use std::sync::Arc;
use veloride_common::{GeoPoint, PointInput, TelemetryPoint};
use veloride_rentals::config::EventChannels;
use veloride_rentals::domain::invoices::InvoiceIssuer;
use veloride_rentals::domain::lifecycle::RentalLifecycleOrchestrator;
use veloride_rentals::domain::rentals::RentalLedger;
use veloride_rentals::domain::types::{
    BikeId, CustomerId, FeeSchedule, RentalId, ZoneId, ZoneLabel, ZoneType,
};
use veloride_rentals::domain::zones::{Polygon, Zone, ZoneClassifier, ZoneIndex};
use veloride_rentals::error::RentalError;
use veloride_rentals::events::{
    BroadcastPublisher, LifecyclePublisher, RentalEndedEvent, RentalStartedEvent,
};
use veloride_rentals::storage::{InMemoryBikeDirectory, InvoiceBook, InvoiceRepository, StaticFeeSchedule};
use veloride_rentals::telemetry::{InMemoryRouteBuffer, RouteBuffer};

struct Harness {
    orchestrator: Arc<RentalLifecycleOrchestrator>,
    rentals: Arc<RentalLedger>,
    bikes: Arc<InMemoryBikeDirectory>,
    buffer: Arc<InMemoryRouteBuffer>,
    invoices: Arc<InvoiceBook>,
    publisher: Arc<BroadcastPublisher>,
}

fn p(lat: f64, lon: f64) -> GeoPoint {
    GeoPoint { lat, lon }
}

fn square(zone_type: ZoneType, min_lat: f64, min_lon: f64, side: f64) -> Zone {
    Zone {
        id: ZoneId::new(),
        city: "malmo".to_string(),
        zone_type,
        polygon: Polygon::new(vec![
            p(min_lat, min_lon),
            p(min_lat, min_lon + side),
            p(min_lat + side, min_lon + side),
            p(min_lat + side, min_lon),
        ]),
        speed_limit: None,
    }
}

fn fee_schedule() -> FeeSchedule {
    FeeSchedule {
        start: dec!(20),
        minute: dec!(1),
        discount: dec!(10),
        penalty: dec!(15),
        valid_from: Utc::now(),
    }
}

async fn build_harness(
    publisher: Arc<dyn LifecyclePublisher>,
    broadcast: Arc<BroadcastPublisher>,
) -> Harness {
    let rentals = Arc::new(RentalLedger::new());
    let bikes = Arc::new(InMemoryBikeDirectory::new());
    let buffer = Arc::new(InMemoryRouteBuffer::new());
    let invoices = Arc::new(InvoiceBook::new());
    let zones = Arc::new(ZoneIndex::new());

    // A parking dock around (55.60, 12.99), a charging dock around
    // (55.70, 12.99), free-floating city area covering both.
    zones.add(square(ZoneType::Parking, 55.59, 12.98, 0.02)).await;
    zones.add(square(ZoneType::Charging, 55.69, 12.98, 0.02)).await;
    zones.add(square(ZoneType::City, 55.0, 12.0, 2.0)).await;
    bikes.add(BikeId::new(7), Some("malmo")).await;

    let issuer = InvoiceIssuer::new(
        rentals.clone(),
        invoices.clone(),
        Arc::new(StaticFeeSchedule::new(fee_schedule())),
    );
    let orchestrator = Arc::new(RentalLifecycleOrchestrator::new(
        rentals.clone(),
        bikes.clone(),
        ZoneClassifier::new(zones),
        buffer.clone(),
        issuer,
        publisher,
        30,
    ));

    Harness {
        orchestrator,
        rentals,
        bikes,
        buffer,
        invoices,
        publisher: broadcast,
    }
}

async fn harness() -> Harness {
    let broadcast = Arc::new(BroadcastPublisher::new(EventChannels::default_channels(), 16));
    build_harness(broadcast.clone(), broadcast).await
}

async fn harness_with_publisher(publisher: Arc<dyn LifecyclePublisher>) -> Harness {
    let broadcast = Arc::new(BroadcastPublisher::new(EventChannels::default_channels(), 16));
    build_harness(publisher, broadcast).await
}

fn parking_start() -> PointInput {
    serde_json::from_value(serde_json::json!({"lat": 55.60, "lon": 12.99})).unwrap()
}

#[tokio::test]
async fn full_lifecycle_from_start_to_invoice() {
    let h = harness().await;

    let started = h
        .orchestrator
        .start_rental(CustomerId::new(1), BikeId::new(7), &parking_start())
        .await
        .unwrap();
    assert_eq!(started.start_zone, ZoneLabel::Parking);
    assert_eq!(started.city.as_deref(), Some("malmo"));

    // Ride toward the charging dock.
    for (lat, lon, speed) in [(55.62, 12.99, 12.0), (55.66, 12.99, 14.0), (55.70, 12.99, 3.0)] {
        h.buffer
            .append(&started.rental_id, TelemetryPoint { lat, lon, speed })
            .await
            .unwrap();
    }

    let completed = h
        .orchestrator
        .complete_rental(&started.rental_id)
        .await
        .unwrap();

    assert_eq!(completed.end_zone, ZoneLabel::Charging);
    assert_eq!(completed.route.len(), 3);
    // Dock to dock, sub-minute ride: just the start fee.
    assert_eq!(completed.invoice.amount, dec!(20));

    let due_in = completed.invoice.due_date - Utc::now();
    assert!((due_in.num_minutes() - Duration::days(30).num_minutes()).abs() <= 1);

    let stored = h.invoices.get_by_rental(&started.rental_id).await.unwrap();
    assert!(stored.is_some());
}

#[tokio::test]
async fn ending_outside_any_zone_adds_penalty_and_forfeits_no_discount() {
    let h = harness().await;

    // Start in the free-floating city area (not a dock): discount applies.
    let start: PointInput =
        serde_json::from_value(serde_json::json!({"lat": 55.65, "lon": 12.5})).unwrap();
    let started = h
        .orchestrator
        .start_rental(CustomerId::new(1), BikeId::new(7), &start)
        .await
        .unwrap();
    assert_eq!(started.start_zone, ZoneLabel::Free);

    // Last sample far outside the city polygon.
    h.buffer
        .append(
            &started.rental_id,
            TelemetryPoint {
                lat: 40.0,
                lon: 3.0,
                speed: 0.0,
            },
        )
        .await
        .unwrap();

    let completed = h
        .orchestrator
        .complete_rental(&started.rental_id)
        .await
        .unwrap();
    assert_eq!(completed.end_zone, ZoneLabel::OutOfBounds);
    // start 20 + 0 minutes + penalty 15 - discount 10
    assert_eq!(completed.invoice.amount, dec!(25));
}

#[tokio::test]
async fn all_point_encodings_classify_identically() {
    let h = harness().await;
    let encodings = [
        serde_json::json!({"lat": 55.60, "lon": 12.99}),
        serde_json::json!({"lat": 55.60, "lng": 12.99}),
        serde_json::json!({"type": "Point", "coordinates": [12.99, 55.60]}),
    ];

    for encoding in encodings {
        let input: PointInput = serde_json::from_value(encoding).unwrap();
        let started = h
            .orchestrator
            .start_rental(CustomerId::new(1), BikeId::new(7), &input)
            .await
            .unwrap();
        assert_eq!(started.start_zone, ZoneLabel::Parking);
    }
}

#[tokio::test]
async fn invalid_start_point_is_rejected_before_any_write() {
    let h = harness().await;
    let input: PointInput =
        serde_json::from_value(serde_json::json!({"lat": 95.0, "lon": 12.99})).unwrap();

    let result = h
        .orchestrator
        .start_rental(CustomerId::new(1), BikeId::new(7), &input)
        .await;
    assert!(matches!(result, Err(RentalError::InvalidInput { .. })));

    assert!(h.orchestrator.get_all_rentals().await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_bike_cannot_start_a_rental() {
    let h = harness().await;
    let result = h
        .orchestrator
        .start_rental(CustomerId::new(1), BikeId::new(999), &parking_start())
        .await;
    assert!(matches!(result, Err(RentalError::BikeNotFound { .. })));
}

#[tokio::test]
async fn bike_without_a_city_starts_out_of_bounds() {
    let h = harness().await;
    h.bikes.add(BikeId::new(8), None).await;

    let started = h
        .orchestrator
        .start_rental(CustomerId::new(1), BikeId::new(8), &parking_start())
        .await
        .unwrap();
    assert_eq!(started.start_zone, ZoneLabel::OutOfBounds);
}

#[tokio::test]
async fn completion_without_telemetry_leaves_the_rental_active() {
    let h = harness().await;
    let started = h
        .orchestrator
        .start_rental(CustomerId::new(1), BikeId::new(7), &parking_start())
        .await
        .unwrap();

    let result = h.orchestrator.complete_rental(&started.rental_id).await;
    assert!(matches!(result, Err(RentalError::NoRouteData { .. })));

    let rental = h.orchestrator.get_rental(&started.rental_id).await.unwrap();
    assert!(rental.is_active());
    assert!(h.invoices.get_by_rental(&started.rental_id).await.unwrap().is_none());
}

#[tokio::test]
async fn completing_an_unknown_rental_is_not_found() {
    let h = harness().await;
    let result = h.orchestrator.complete_rental(&RentalId::new()).await;
    assert!(matches!(result, Err(RentalError::RentalNotFound { .. })));
}

#[tokio::test]
async fn second_completion_is_rejected_without_writing() {
    let h = harness().await;
    let started = h
        .orchestrator
        .start_rental(CustomerId::new(1), BikeId::new(7), &parking_start())
        .await
        .unwrap();
    h.buffer
        .append(
            &started.rental_id,
            TelemetryPoint {
                lat: 55.70,
                lon: 12.99,
                speed: 0.0,
            },
        )
        .await
        .unwrap();

    let first = h.orchestrator.complete_rental(&started.rental_id).await.unwrap();
    assert_eq!(first.end_zone, ZoneLabel::Charging);

    // Buffer still holds the route, so the retry reaches the conditional
    // write and loses there.
    let second = h.orchestrator.complete_rental(&started.rental_id).await;
    assert!(matches!(second, Err(RentalError::AlreadyCompleted { .. })));

    let rental = h.orchestrator.get_rental(&started.rental_id).await.unwrap();
    assert!(!rental.is_active());
    assert_eq!(rental.end_zone, Some(ZoneLabel::Charging));
}

#[tokio::test]
async fn concurrent_completions_have_exactly_one_winner() {
    let h = harness().await;
    let started = h
        .orchestrator
        .start_rental(CustomerId::new(1), BikeId::new(7), &parking_start())
        .await
        .unwrap();
    h.buffer
        .append(
            &started.rental_id,
            TelemetryPoint {
                lat: 55.70,
                lon: 12.99,
                speed: 0.0,
            },
        )
        .await
        .unwrap();

    let a = h.orchestrator.clone();
    let b = h.orchestrator.clone();
    let id = started.rental_id;
    let (ra, rb) = tokio::join!(a.complete_rental(&id), b.complete_rental(&id));

    let winners = [&ra, &rb].iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1, "exactly one completion must win");
    for r in [ra, rb] {
        if let Err(e) = r {
            assert!(matches!(e, RentalError::AlreadyCompleted { .. }));
        }
    }

    // Exactly one invoice, from the winner.
    assert!(h.invoices.get_by_rental(&id).await.unwrap().is_some());
}

#[tokio::test]
async fn lifecycle_events_are_published_after_the_writes() {
    let h = harness().await;
    let mut rx = h.publisher.subscribe();

    let started = h
        .orchestrator
        .start_rental(CustomerId::new(1), BikeId::new(7), &parking_start())
        .await
        .unwrap();
    h.buffer
        .append(
            &started.rental_id,
            TelemetryPoint {
                lat: 55.70,
                lon: 12.99,
                speed: 0.0,
            },
        )
        .await
        .unwrap();
    h.orchestrator.complete_rental(&started.rental_id).await.unwrap();

    let first = rx.recv().await.unwrap();
    assert_eq!(first.channel, "rental.started");
    let event: RentalStartedEvent = serde_json::from_str(&first.payload).unwrap();
    assert_eq!(event.rental_id, started.rental_id);

    let second = rx.recv().await.unwrap();
    assert_eq!(second.channel, "rental.ended");
    let event: RentalEndedEvent = serde_json::from_str(&second.payload).unwrap();
    assert_eq!(event.amount, dec!(20));
}

struct FailingPublisher;

#[async_trait::async_trait]
impl LifecyclePublisher for FailingPublisher {
    async fn publish_started(&self, _event: &RentalStartedEvent) -> veloride_rentals::Result<()> {
        Err(RentalError::PublishFailed {
            channel: "rental.started".to_string(),
            source: "broker unreachable".into(),
        })
    }

    async fn publish_ended(&self, _event: &RentalEndedEvent) -> veloride_rentals::Result<()> {
        Err(RentalError::PublishFailed {
            channel: "rental.ended".to_string(),
            source: "broker unreachable".into(),
        })
    }
}

#[tokio::test]
async fn publish_failures_never_fail_the_lifecycle() {
    let h = harness_with_publisher(Arc::new(FailingPublisher)).await;

    let started = h
        .orchestrator
        .start_rental(CustomerId::new(1), BikeId::new(7), &parking_start())
        .await
        .unwrap();
    h.buffer
        .append(
            &started.rental_id,
            TelemetryPoint {
                lat: 55.70,
                lon: 12.99,
                speed: 0.0,
            },
        )
        .await
        .unwrap();

    let completed = h.orchestrator.complete_rental(&started.rental_id).await.unwrap();
    assert_eq!(completed.invoice.amount, dec!(20));

    // The durable writes happened even though both publishes failed.
    let rental = h.rentals_snapshot(&started.rental_id).await;
    assert!(!rental.is_active());
}

impl Harness {
    async fn rentals_snapshot(&self, id: &RentalId) -> veloride_rentals::domain::rentals::Rental {
        use veloride_rentals::storage::RentalRepository;
        self.rentals.get(id).await.unwrap().unwrap()
    }
}
