pub mod events;
pub mod inventory;
pub mod repository;
pub mod reservation;
pub mod screening;
pub mod seat;

pub use inventory::{InventoryError, RowTemplate, SeatInventory, SeatTemplate, SeatView};
pub use repository::{ReservationStore, ScreeningStore, StoreError};
pub use reservation::{
    ContactInfo, PaymentRecord, Reservation, ReservationStatus, ReservedSeat,
};
pub use screening::{Screening, ScreeningStatus};
pub use seat::{ClassMultipliers, Seat, SeatClaim, SeatClass, SeatKey};
