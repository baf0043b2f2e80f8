pub mod coordinator;
pub mod lifecycle;
pub mod payment;
pub mod policy;
pub mod schedule;

pub use coordinator::{BookingCoordinator, BookingError, BookingRequest, PaymentInfo};
pub use lifecycle::{LifecycleError, ReservationLifecycle};
pub use payment::{MockGateway, PaymentError, PaymentGateway};
pub use policy::BookingPolicy;
pub use schedule::{ScheduleChecker, ScheduleError};
