pub mod lifecycle;
pub mod manager;

pub use manager::TripManager;
