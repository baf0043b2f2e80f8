pub mod error;
pub mod identity;
pub mod service;

pub use error::EngineError;
pub use identity::{Actor, Role};
pub use service::{AvailabilityView, BookSeatsRequest, BookingService, CreateScreeningRequest};
