use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::lifecycle;
use crate::error::{AppError, LifecycleError};
use crate::models::event::{Transition, TripEvent};
use crate::models::session::Session;
use crate::models::trip::{PlanTripRequest, Trip, TripFilter, TripStatus};
use crate::observability::metrics::Metrics;
use crate::store::{MileageSource, TripStore};

#[derive(Clone)]
pub struct TripManager {
    trips: Arc<dyn TripStore>,
    vehicles: Arc<dyn MileageSource>,
    events_tx: broadcast::Sender<TripEvent>,
    metrics: Metrics,
}

impl TripManager {
    pub fn new(
        trips: Arc<dyn TripStore>,
        vehicles: Arc<dyn MileageSource>,
        events_tx: broadcast::Sender<TripEvent>,
        metrics: Metrics,
    ) -> Self {
        Self {
            trips,
            vehicles,
            events_tx,
            metrics,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TripEvent> {
        self.events_tx.subscribe()
    }

    pub async fn plan_trip(
        &self,
        session: &Session,
        request: PlanTripRequest,
    ) -> Result<Trip, AppError> {
        let result = self.try_plan(session, request).await;
        self.finish(session, Transition::Plan, None, result)
    }

    pub async fn start_trip(
        &self,
        session: &Session,
        id: Uuid,
        reading: i64,
    ) -> Result<Trip, AppError> {
        let result = self
            .transition(id, |trip, now| lifecycle::start(trip, reading, now))
            .await;
        self.finish(session, Transition::Start, Some(id), result)
    }

    pub async fn complete_trip(
        &self,
        session: &Session,
        id: Uuid,
        reading: i64,
    ) -> Result<Trip, AppError> {
        let result = self
            .transition(id, |trip, now| lifecycle::complete(trip, reading, now))
            .await;
        self.finish(session, Transition::Complete, Some(id), result)
    }

    pub async fn cancel_trip(&self, session: &Session, id: Uuid) -> Result<Trip, AppError> {
        let result = match require_dispatcher(session, Transition::Cancel) {
            Ok(()) => self.transition(id, |trip, _| lifecycle::cancel(trip)).await,
            Err(err) => Err(err),
        };
        self.finish(session, Transition::Cancel, Some(id), result)
    }

    pub async fn get_trip(&self, id: Uuid) -> Result<Trip, AppError> {
        Ok(self.trips.read(id).await?)
    }

    pub async fn list_trips(&self, filter: &TripFilter) -> Result<Vec<Trip>, AppError> {
        let mut trips: Vec<Trip> = self
            .trips
            .list()
            .await?
            .into_iter()
            .filter(|trip| filter.matches(trip))
            .collect();

        trips.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(trips)
    }

    async fn try_plan(
        &self,
        session: &Session,
        request: PlanTripRequest,
    ) -> Result<(Option<TripStatus>, Trip), AppError> {
        require_dispatcher(session, Transition::Plan)?;

        let mileage = self.vehicles.mileage(request.vehicle_id).await?;
        let trip = lifecycle::plan(request, mileage, Utc::now())?;
        let stored = self.trips.write(trip).await?;

        Ok((None, stored))
    }

    async fn transition<F>(
        &self,
        id: Uuid,
        apply: F,
    ) -> Result<(Option<TripStatus>, Trip), AppError>
    where
        F: FnOnce(&Trip, DateTime<Utc>) -> Result<Trip, LifecycleError>,
    {
        let current = self.trips.read(id).await?;
        let next = apply(&current, Utc::now())?;
        let stored = self.trips.write(next).await?;

        Ok((Some(current.status), stored))
    }

    fn finish(
        &self,
        session: &Session,
        transition: Transition,
        trip_id: Option<Uuid>,
        result: Result<(Option<TripStatus>, Trip), AppError>,
    ) -> Result<Trip, AppError> {
        let (previous, trip) = match result {
            Ok(done) => done,
            Err(err) => {
                self.metrics.record_transition(transition.as_str(), "error");
                warn!(
                    trip_id = ?trip_id,
                    operator_id = %session.operator_id,
                    transition = %transition,
                    error = %err,
                    "trip transition rejected"
                );
                return Err(err);
            }
        };

        self.metrics.record_transition(transition.as_str(), "success");

        if trip.status == TripStatus::Active {
            self.metrics.trips_active.inc();
        } else if previous == Some(TripStatus::Active) {
            self.metrics.trips_active.dec();
        }

        if let Some(distance) = trip.distance {
            if transition == Transition::Complete {
                self.metrics.trip_distance.observe(distance as f64);
            }
        }

        info!(
            trip_id = %trip.id,
            vehicle_id = %trip.vehicle_id,
            operator_id = %session.operator_id,
            transition = %transition,
            status = %trip.status,
            "trip transition applied"
        );

        let event = TripEvent {
            transition,
            trip: trip.clone(),
            operator_id: session.operator_id.clone(),
            at: Utc::now(),
        };
        // No subscribers is fine.
        let _ = self.events_tx.send(event);

        Ok(trip)
    }
}

fn require_dispatcher(session: &Session, transition: Transition) -> Result<(), AppError> {
    if session.role.can_dispatch() {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "role {} may not {} trips",
            session.role, transition
        )))
    }
}
