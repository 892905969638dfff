pub mod event;
pub mod session;
pub mod trip;
pub mod vehicle;
