use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::trip::Trip;
use crate::models::vehicle::Vehicle;
use crate::store::{MileageSource, TripStore};

#[derive(Default)]
pub struct MemoryStore {
    trips: DashMap<Uuid, Trip>,
    vehicles: DashMap<Uuid, Vehicle>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trip_count(&self) -> usize {
        self.trips.len()
    }

    pub fn vehicle_count(&self) -> usize {
        self.vehicles.len()
    }

    pub fn register_vehicle(&self, registration_number: String, mileage: i64) -> Vehicle {
        let vehicle = Vehicle {
            id: Uuid::new_v4(),
            registration_number,
            mileage,
            updated_at: Utc::now(),
        };

        self.vehicles.insert(vehicle.id, vehicle.clone());
        vehicle
    }

    pub fn vehicles(&self) -> Vec<Vehicle> {
        self.vehicles
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn update_mileage(&self, id: Uuid, mileage: i64) -> Result<Vehicle, StoreError> {
        let mut vehicle = self
            .vehicles
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("vehicle {id}")))?;

        vehicle.mileage = mileage;
        vehicle.updated_at = Utc::now();

        Ok(vehicle.clone())
    }
}

#[async_trait]
impl TripStore for MemoryStore {
    async fn read(&self, id: Uuid) -> Result<Trip, StoreError> {
        self.trips
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::NotFound(format!("trip {id}")))
    }

    async fn write(&self, trip: Trip) -> Result<Trip, StoreError> {
        self.trips.insert(trip.id, trip.clone());
        Ok(trip)
    }

    async fn list(&self) -> Result<Vec<Trip>, StoreError> {
        Ok(self
            .trips
            .iter()
            .map(|entry| entry.value().clone())
            .collect())
    }
}

#[async_trait]
impl MileageSource for MemoryStore {
    async fn mileage(&self, vehicle_id: Uuid) -> Result<i64, StoreError> {
        self.vehicles
            .get(&vehicle_id)
            .map(|entry| entry.mileage)
            .ok_or_else(|| StoreError::NotFound(format!("vehicle {vehicle_id}")))
    }
}
