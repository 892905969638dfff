use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::LifecycleError;
use crate::models::event::Transition;
use crate::models::trip::{PlanTripRequest, Trip, TripStatus};

pub fn plan(
    request: PlanTripRequest,
    mileage: i64,
    now: DateTime<Utc>,
) -> Result<Trip, LifecycleError> {
    if request.origin.trim().is_empty() {
        return Err(LifecycleError::InvalidInput(
            "origin cannot be empty".to_string(),
        ));
    }

    if request.destination.trim().is_empty() {
        return Err(LifecycleError::InvalidInput(
            "destination cannot be empty".to_string(),
        ));
    }

    check_non_negative(mileage)?;

    Ok(Trip {
        id: Uuid::new_v4(),
        vehicle_id: request.vehicle_id,
        driver_id: request.driver_id,
        status: TripStatus::Planned,
        origin: request.origin,
        destination: request.destination,
        start_odometer: mileage,
        end_odometer: None,
        distance: None,
        started_at: None,
        completed_at: None,
        created_at: now,
        notes: request.notes.filter(|notes| !notes.trim().is_empty()),
    })
}

pub fn start(trip: &Trip, reading: i64, now: DateTime<Utc>) -> Result<Trip, LifecycleError> {
    require_status(trip, &[TripStatus::Planned], Transition::Start)?;
    check_non_negative(reading)?;

    Ok(Trip {
        status: TripStatus::Active,
        start_odometer: reading,
        started_at: Some(now),
        ..trip.clone()
    })
}

pub fn complete(trip: &Trip, reading: i64, now: DateTime<Utc>) -> Result<Trip, LifecycleError> {
    require_status(trip, &[TripStatus::Active], Transition::Complete)?;

    // Zero distance is a data-entry error.
    if reading <= trip.start_odometer {
        return Err(LifecycleError::InvalidReading {
            reading,
            minimum: trip.start_odometer.saturating_add(1),
        });
    }

    Ok(Trip {
        status: TripStatus::Completed,
        end_odometer: Some(reading),
        distance: Some(reading - trip.start_odometer),
        completed_at: Some(now),
        ..trip.clone()
    })
}

pub fn cancel(trip: &Trip) -> Result<Trip, LifecycleError> {
    require_status(
        trip,
        &[TripStatus::Planned, TripStatus::Active],
        Transition::Cancel,
    )?;

    Ok(Trip {
        status: TripStatus::Cancelled,
        ..trip.clone()
    })
}

fn require_status(
    trip: &Trip,
    allowed: &[TripStatus],
    action: Transition,
) -> Result<(), LifecycleError> {
    if allowed.contains(&trip.status) {
        Ok(())
    } else {
        Err(LifecycleError::InvalidTransition {
            from: trip.status,
            action,
        })
    }
}

fn check_non_negative(reading: i64) -> Result<(), LifecycleError> {
    if reading < 0 {
        return Err(LifecycleError::InvalidReading {
            reading,
            minimum: 0,
        });
    }

    Ok(())
}
