use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use fleet_trips::engine::lifecycle;
use fleet_trips::engine::TripManager;
use fleet_trips::error::{AppError, LifecycleError, StoreError};
use fleet_trips::models::event::Transition;
use fleet_trips::models::session::{OperatorRole, Session};
use fleet_trips::models::trip::{PlanTripRequest, Trip, TripFilter, TripStatus};
use fleet_trips::observability::metrics::Metrics;
use fleet_trips::store::{MemoryStore, TripStore};
use tokio::sync::broadcast;
use uuid::Uuid;

fn plan_request(vehicle_id: Uuid) -> PlanTripRequest {
    PlanTripRequest {
        vehicle_id,
        driver_id: Uuid::new_v4(),
        origin: "Depot North".to_string(),
        destination: "Harbour Terminal".to_string(),
        notes: Some("refrigerated load".to_string()),
    }
}

fn planned_trip(mileage: i64) -> Trip {
    lifecycle::plan(plan_request(Uuid::new_v4()), mileage, Utc::now()).unwrap()
}

fn active_trip(start: i64) -> Trip {
    lifecycle::start(&planned_trip(0), start, Utc::now()).unwrap()
}

fn manager_session() -> Session {
    Session::new("dispatcher-1", OperatorRole::Manager)
}

fn driver_session() -> Session {
    Session::new("driver-7", OperatorRole::Driver)
}

#[test]
fn plan_snapshots_vehicle_mileage() {
    let trip = planned_trip(45230);

    assert_eq!(trip.status, TripStatus::Planned);
    assert_eq!(trip.start_odometer, 45230);
    assert_eq!(trip.end_odometer, None);
    assert_eq!(trip.distance, None);
    assert_eq!(trip.started_at, None);
    assert_eq!(trip.completed_at, None);
    assert_eq!(trip.notes.as_deref(), Some("refrigerated load"));
}

#[test]
fn plan_rejects_blank_destination() {
    let mut request = plan_request(Uuid::new_v4());
    request.destination = "   ".to_string();

    let err = lifecycle::plan(request, 10, Utc::now()).unwrap_err();
    assert!(matches!(err, LifecycleError::InvalidInput(_)));
}

#[test]
fn plan_drops_blank_notes() {
    let mut request = plan_request(Uuid::new_v4());
    request.notes = Some(" ".to_string());

    let trip = lifecycle::plan(request, 10, Utc::now()).unwrap();
    assert_eq!(trip.notes, None);
}

#[test]
fn full_trip_scenario_computes_distance() {
    let trip = planned_trip(45230);

    let started = lifecycle::start(&trip, 45230, Utc::now()).unwrap();
    assert_eq!(started.status, TripStatus::Active);
    assert!(started.started_at.is_some());

    let completed = lifecycle::complete(&started, 45830, Utc::now()).unwrap();
    assert_eq!(completed.status, TripStatus::Completed);
    assert_eq!(completed.end_odometer, Some(45830));
    assert_eq!(completed.distance, Some(600));
    assert!(completed.completed_at.is_some());
    assert_eq!(completed.started_at, started.started_at);
}

#[test]
fn start_overwrites_start_odometer() {
    let trip = planned_trip(1000);
    let started = lifecycle::start(&trip, 1012, Utc::now()).unwrap();

    assert_eq!(started.start_odometer, 1012);
    assert_eq!(trip.start_odometer, 1000);
}

#[test]
fn start_only_from_planned() {
    let now = Utc::now();
    let active = active_trip(10);
    let completed = lifecycle::complete(&active, 20, now).unwrap();
    let cancelled = lifecycle::cancel(&planned_trip(0)).unwrap();

    for trip in [&active, &completed, &cancelled] {
        let err = lifecycle::start(trip, 50, now).unwrap_err();
        assert_eq!(
            err,
            LifecycleError::InvalidTransition {
                from: trip.status,
                action: Transition::Start,
            }
        );
    }
}

#[test]
fn start_rejects_negative_reading() {
    let trip = planned_trip(0);
    let err = lifecycle::start(&trip, -1, Utc::now()).unwrap_err();

    assert_eq!(
        err,
        LifecycleError::InvalidReading {
            reading: -1,
            minimum: 0
        }
    );
}

#[test]
fn complete_only_from_active() {
    let now = Utc::now();
    let planned = planned_trip(0);
    let completed = lifecycle::complete(&active_trip(10), 20, now).unwrap();
    let cancelled = lifecycle::cancel(&planned_trip(0)).unwrap();

    for trip in [&planned, &completed, &cancelled] {
        let err = lifecycle::complete(trip, 1_000, now).unwrap_err();
        assert_eq!(
            err,
            LifecycleError::InvalidTransition {
                from: trip.status,
                action: Transition::Complete,
            }
        );
    }
}

#[test]
fn cancel_planned_trip_sets_no_timestamps() {
    let trip = planned_trip(300);
    let cancelled = lifecycle::cancel(&trip).unwrap();

    assert_eq!(cancelled.status, TripStatus::Cancelled);
    assert_eq!(cancelled.started_at, None);
    assert_eq!(cancelled.completed_at, None);
    assert_eq!(cancelled.start_odometer, 300);
    assert_eq!(cancelled.end_odometer, None);
    assert_eq!(cancelled.distance, None);
}

#[test]
fn complete_rejects_decreasing_reading() {
    let trip = active_trip(1000);
    let err = lifecycle::complete(&trip, 900, Utc::now()).unwrap_err();

    assert_eq!(
        err,
        LifecycleError::InvalidReading {
            reading: 900,
            minimum: 1001
        }
    );
    assert_eq!(trip.status, TripStatus::Active);
}

#[test]
fn complete_rejects_zero_distance() {
    let trip = active_trip(1000);
    let err = lifecycle::complete(&trip, 1000, Utc::now()).unwrap_err();

    assert!(matches!(err, LifecycleError::InvalidReading { .. }));
}

#[test]
fn cancel_keeps_odometer_fields() {
    let trip = active_trip(500);
    let cancelled = lifecycle::cancel(&trip).unwrap();

    assert_eq!(cancelled.status, TripStatus::Cancelled);
    assert_eq!(cancelled.start_odometer, 500);
    assert_eq!(cancelled.end_odometer, None);
    assert_eq!(cancelled.started_at, trip.started_at);
}

#[test]
fn cancel_twice_fails_on_second_call() {
    let cancelled = lifecycle::cancel(&planned_trip(0)).unwrap();
    let err = lifecycle::cancel(&cancelled).unwrap_err();

    assert!(matches!(
        err,
        LifecycleError::InvalidTransition {
            from: TripStatus::Cancelled,
            ..
        }
    ));
}

#[test]
fn completed_trip_cannot_be_cancelled() {
    let completed = lifecycle::complete(&active_trip(1), 2, Utc::now()).unwrap();
    let err = lifecycle::cancel(&completed).unwrap_err();

    assert!(matches!(
        err,
        LifecycleError::InvalidTransition {
            from: TripStatus::Completed,
            action: Transition::Cancel,
        }
    ));
}

/// Delegates to a `MemoryStore` but can be switched to reject writes.
struct FlakyStore {
    inner: MemoryStore,
    fail_writes: AtomicBool,
}

#[async_trait]
impl TripStore for FlakyStore {
    async fn read(&self, id: Uuid) -> Result<Trip, StoreError> {
        self.inner.read(id).await
    }

    async fn write(&self, trip: Trip) -> Result<Trip, StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Write("connection reset".to_string()));
        }
        self.inner.write(trip).await
    }

    async fn list(&self) -> Result<Vec<Trip>, StoreError> {
        self.inner.list().await
    }
}

struct Harness {
    manager: TripManager,
    trips: Arc<FlakyStore>,
    vehicles: Arc<MemoryStore>,
    events: broadcast::Receiver<fleet_trips::models::event::TripEvent>,
    metrics: Metrics,
}

fn harness() -> Harness {
    let trips = Arc::new(FlakyStore {
        inner: MemoryStore::new(),
        fail_writes: AtomicBool::new(false),
    });
    let vehicles = Arc::new(MemoryStore::new());
    let (events_tx, events) = broadcast::channel(16);
    let metrics = Metrics::new();
    let manager = TripManager::new(trips.clone(), vehicles.clone(), events_tx, metrics.clone());

    Harness {
        manager,
        trips,
        vehicles,
        events,
        metrics,
    }
}

#[tokio::test]
async fn manager_runs_full_lifecycle_and_publishes_events() {
    let mut h = harness();
    let vehicle = h.vehicles.register_vehicle("KA-01-1234".to_string(), 45230);
    let session = manager_session();

    let trip = h
        .manager
        .plan_trip(&session, plan_request(vehicle.id))
        .await
        .unwrap();
    assert_eq!(trip.start_odometer, 45230);

    let driver = driver_session();
    h.manager.start_trip(&driver, trip.id, 45230).await.unwrap();
    assert_eq!(h.metrics.trips_active.get(), 1);

    let done = h.manager.complete_trip(&driver, trip.id, 45830).await.unwrap();
    assert_eq!(done.distance, Some(600));
    assert_eq!(h.metrics.trips_active.get(), 0);

    let stored = h.trips.read(trip.id).await.unwrap();
    assert_eq!(stored, done);

    let transitions: Vec<Transition> = (0..3)
        .map(|_| h.events.try_recv().unwrap().transition)
        .collect();
    assert_eq!(
        transitions,
        vec![Transition::Plan, Transition::Start, Transition::Complete]
    );
}

#[tokio::test]
async fn failed_write_leaves_stored_trip_unchanged() {
    let mut h = harness();
    let vehicle = h.vehicles.register_vehicle("KA-01-9999".to_string(), 100);
    let session = manager_session();

    let trip = h
        .manager
        .plan_trip(&session, plan_request(vehicle.id))
        .await
        .unwrap();
    let _ = h.events.try_recv().unwrap();

    h.trips.fail_writes.store(true, Ordering::SeqCst);
    let err = h.manager.start_trip(&session, trip.id, 120).await.unwrap_err();

    assert!(matches!(err, AppError::Store(StoreError::Write(_))));
    assert_eq!(h.trips.read(trip.id).await.unwrap(), trip);
    assert!(h.events.try_recv().is_err());
    assert_eq!(h.metrics.trips_active.get(), 0);
}

#[tokio::test]
async fn rejected_transition_is_not_written() {
    let h = harness();
    let vehicle = h.vehicles.register_vehicle("KA-02-0001".to_string(), 1000);
    let session = manager_session();

    let trip = h
        .manager
        .plan_trip(&session, plan_request(vehicle.id))
        .await
        .unwrap();
    h.manager.start_trip(&session, trip.id, 1000).await.unwrap();

    let err = h
        .manager
        .complete_trip(&session, trip.id, 900)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Lifecycle(LifecycleError::InvalidReading { .. })
    ));

    let stored = h.trips.read(trip.id).await.unwrap();
    assert_eq!(stored.status, TripStatus::Active);
    assert_eq!(stored.end_odometer, None);
}

#[tokio::test]
async fn planning_unknown_vehicle_is_not_found() {
    let h = harness();

    let err = h
        .manager
        .plan_trip(&manager_session(), plan_request(Uuid::new_v4()))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Store(StoreError::NotFound(_))));
    assert!(h.trips.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn transition_on_unknown_trip_is_not_found() {
    let h = harness();

    let err = h
        .manager
        .start_trip(&manager_session(), Uuid::new_v4(), 10)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Store(StoreError::NotFound(_))));
}

#[tokio::test]
async fn driver_cannot_plan_or_cancel() {
    let h = harness();
    let vehicle = h.vehicles.register_vehicle("KA-03-4321".to_string(), 0);

    let err = h
        .manager
        .plan_trip(&driver_session(), plan_request(vehicle.id))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let trip = h
        .manager
        .plan_trip(&manager_session(), plan_request(vehicle.id))
        .await
        .unwrap();
    let err = h
        .manager
        .cancel_trip(&driver_session(), trip.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    assert_eq!(
        h.trips.read(trip.id).await.unwrap().status,
        TripStatus::Planned
    );
}

#[tokio::test]
async fn cancelling_active_trip_releases_active_gauge() {
    let h = harness();
    let vehicle = h.vehicles.register_vehicle("KA-04-1111".to_string(), 10);
    let session = manager_session();

    let trip = h
        .manager
        .plan_trip(&session, plan_request(vehicle.id))
        .await
        .unwrap();
    h.manager.start_trip(&session, trip.id, 10).await.unwrap();
    assert_eq!(h.metrics.trips_active.get(), 1);

    let cancelled = h.manager.cancel_trip(&session, trip.id).await.unwrap();
    assert_eq!(cancelled.status, TripStatus::Cancelled);
    assert_eq!(h.metrics.trips_active.get(), 0);

    let err = h.manager.cancel_trip(&session, trip.id).await.unwrap_err();
    assert!(matches!(
        err,
        AppError::Lifecycle(LifecycleError::InvalidTransition { .. })
    ));
}

#[tokio::test]
async fn list_is_newest_first_and_filtered() {
    let h = harness();
    let vehicle = h.vehicles.register_vehicle("KA-05-2222".to_string(), 0);
    let session = manager_session();

    let mut first = plan_request(vehicle.id);
    first.destination = "Airport Cargo".to_string();
    let first = h.manager.plan_trip(&session, first).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = h
        .manager
        .plan_trip(&session, plan_request(vehicle.id))
        .await
        .unwrap();
    h.manager.start_trip(&session, second.id, 5).await.unwrap();

    let all = h.manager.list_trips(&TripFilter::default()).await.unwrap();
    let ids: Vec<Uuid> = all.iter().map(|trip| trip.id).collect();
    assert_eq!(ids, vec![second.id, first.id]);

    let active = h
        .manager
        .list_trips(&TripFilter {
            status: Some(TripStatus::Active),
            q: None,
        })
        .await
        .unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, second.id);

    let searched = h
        .manager
        .list_trips(&TripFilter {
            status: None,
            q: Some("airport".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(searched.len(), 1);
    assert_eq!(searched[0].id, first.id);
}

#[tokio::test]
async fn list_breaks_created_at_ties_by_id() {
    let h = harness();
    let created_at = Utc::now();

    let mut expected = Vec::new();
    for _ in 0..5 {
        let trip = lifecycle::plan(plan_request(Uuid::new_v4()), 0, created_at).unwrap();
        expected.push(trip.id);
        h.trips.write(trip).await.unwrap();
    }
    expected.sort();

    let listed: Vec<Uuid> = h
        .manager
        .list_trips(&TripFilter::default())
        .await
        .unwrap()
        .iter()
        .map(|trip| trip.id)
        .collect();
    assert_eq!(listed, expected);
}
