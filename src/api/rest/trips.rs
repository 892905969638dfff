use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::rest::extract::{AppJson, AppPath, AppQuery};
use crate::api::rest::session::CurrentSession;
use crate::error::AppError;
use crate::models::trip::{PlanTripRequest, Trip, TripFilter};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/trips", post(plan_trip).get(list_trips))
        .route("/trips/:id", get(get_trip))
        .route("/trips/:id/start", post(start_trip))
        .route("/trips/:id/complete", post(complete_trip))
        .route("/trips/:id/cancel", post(cancel_trip))
}

#[derive(Deserialize)]
pub struct OdometerRequest {
    pub odometer: i64,
}

async fn plan_trip(
    State(state): State<Arc<AppState>>,
    CurrentSession(session): CurrentSession,
    AppJson(payload): AppJson<PlanTripRequest>,
) -> Result<Json<Trip>, AppError> {
    let trip = state.trips.plan_trip(&session, payload).await?;
    Ok(Json(trip))
}

async fn list_trips(
    State(state): State<Arc<AppState>>,
    AppQuery(filter): AppQuery<TripFilter>,
) -> Result<Json<Vec<Trip>>, AppError> {
    let trips = state.trips.list_trips(&filter).await?;
    Ok(Json(trips))
}

async fn get_trip(
    State(state): State<Arc<AppState>>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<Trip>, AppError> {
    let trip = state.trips.get_trip(id).await?;
    Ok(Json(trip))
}

async fn start_trip(
    State(state): State<Arc<AppState>>,
    CurrentSession(session): CurrentSession,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<OdometerRequest>,
) -> Result<Json<Trip>, AppError> {
    let trip = state.trips.start_trip(&session, id, payload.odometer).await?;
    Ok(Json(trip))
}

async fn complete_trip(
    State(state): State<Arc<AppState>>,
    CurrentSession(session): CurrentSession,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<OdometerRequest>,
) -> Result<Json<Trip>, AppError> {
    let trip = state
        .trips
        .complete_trip(&session, id, payload.odometer)
        .await?;
    Ok(Json(trip))
}

async fn cancel_trip(
    State(state): State<Arc<AppState>>,
    CurrentSession(session): CurrentSession,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<Trip>, AppError> {
    let trip = state.trips.cancel_trip(&session, id).await?;
    Ok(Json(trip))
}
