pub mod memory;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::trip::Trip;

pub use memory::MemoryStore;

/// `write` is an upsert.
#[async_trait]
pub trait TripStore: Send + Sync {
    async fn read(&self, id: Uuid) -> Result<Trip, StoreError>;

    async fn write(&self, trip: Trip) -> Result<Trip, StoreError>;

    async fn list(&self) -> Result<Vec<Trip>, StoreError>;
}

#[async_trait]
pub trait MileageSource: Send + Sync {
    async fn mileage(&self, vehicle_id: Uuid) -> Result<i64, StoreError>;
}
