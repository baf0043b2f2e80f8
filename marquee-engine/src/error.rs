use marquee_booking::{BookingError, LifecycleError, ScheduleError};
use marquee_domain::{InventoryError, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error(transparent)]
    Booking(#[from] BookingError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
