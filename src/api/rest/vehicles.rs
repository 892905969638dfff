use std::sync::Arc;

use axum::extract::State;
use axum::routing::{patch, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::rest::extract::{AppJson, AppPath};
use crate::error::AppError;
use crate::models::vehicle::Vehicle;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/vehicles", post(register_vehicle).get(list_vehicles))
        .route("/vehicles/:id/mileage", patch(update_mileage))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterVehicleRequest {
    pub registration_number: String,
    pub mileage: i64,
}

#[derive(Deserialize)]
pub struct UpdateMileageRequest {
    pub mileage: i64,
}

async fn register_vehicle(
    State(state): State<Arc<AppState>>,
    AppJson(payload): AppJson<RegisterVehicleRequest>,
) -> Result<Json<Vehicle>, AppError> {
    let registration_number = payload.registration_number.trim();
    if registration_number.is_empty() {
        return Err(AppError::BadRequest(
            "registrationNumber cannot be empty".to_string(),
        ));
    }

    check_mileage(payload.mileage)?;

    let vehicle = state
        .store
        .register_vehicle(registration_number.to_string(), payload.mileage);
    Ok(Json(vehicle))
}

async fn list_vehicles(State(state): State<Arc<AppState>>) -> Json<Vec<Vehicle>> {
    Json(state.store.vehicles())
}

async fn update_mileage(
    State(state): State<Arc<AppState>>,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateMileageRequest>,
) -> Result<Json<Vehicle>, AppError> {
    check_mileage(payload.mileage)?;

    let vehicle = state.store.update_mileage(id, payload.mileage)?;
    Ok(Json(vehicle))
}

fn check_mileage(mileage: i64) -> Result<(), AppError> {
    if mileage < 0 {
        return Err(AppError::BadRequest("mileage must be >= 0".to_string()));
    }

    Ok(())
}
