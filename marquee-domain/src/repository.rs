use crate::inventory::{InventoryError, SeatView};
use crate::reservation::{Reservation, ReservedSeat};
use crate::screening::{Screening, ScreeningStatus};
use crate::seat::SeatKey;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Screening not found: {0}")]
    ScreeningNotFound(Uuid),

    #[error("Reservation not found: {0}")]
    ReservationNotFound(Uuid),

    #[error(transparent)]
    Seats(#[from] InventoryError),

    #[error("Storage backend failure: {0}")]
    Backend(String),
}

/// Repository for screening records and their seat arenas.
///
/// `claim_seats` / `release_seats` are the only availability mutation points
/// and must be serialized per screening by the implementation (mutex scope or
/// conditional atomic update), so that two concurrent claims over
/// intersecting seat sets can never both succeed.
#[async_trait]
pub trait ScreeningStore: Send + Sync {
    async fn insert(&self, screening: &Screening) -> Result<(), StoreError>;

    async fn get(&self, id: Uuid) -> Result<Screening, StoreError>;

    /// All screenings at a theater, any status. Callers filter for the
    /// conflict check.
    async fn list_by_theater(&self, theater_id: Uuid) -> Result<Vec<Screening>, StoreError>;

    async fn set_status(&self, id: Uuid, status: ScreeningStatus) -> Result<(), StoreError>;

    async fn reschedule(
        &self,
        id: Uuid,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Atomically claim the given seats for a reservation. All-or-nothing:
    /// fails with `StoreError::Seats(SeatUnavailable)` naming every
    /// unavailable or unknown seat, leaving no partial claim.
    async fn claim_seats(
        &self,
        id: Uuid,
        keys: &[SeatKey],
        reservation_id: Uuid,
    ) -> Result<Vec<ReservedSeat>, StoreError>;

    /// Release the given seats. Idempotent.
    async fn release_seats(&self, id: Uuid, keys: &[SeatKey]) -> Result<(), StoreError>;

    /// Best-effort availability snapshot, unsynchronized against concurrent
    /// claims.
    async fn seat_snapshot(&self, id: Uuid) -> Result<Vec<SeatView>, StoreError>;
}

#[async_trait]
pub trait ReservationStore: Send + Sync {
    async fn insert(&self, reservation: &Reservation) -> Result<(), StoreError>;

    async fn get(&self, id: Uuid) -> Result<Reservation, StoreError>;

    /// Persist the full reservation record (status, timestamps, refund).
    async fn update(&self, reservation: &Reservation) -> Result<(), StoreError>;

    async fn list_by_holder(&self, holder_id: &str) -> Result<Vec<Reservation>, StoreError>;

    /// Whether any reservation (any status) exists against a screening.
    /// Screenings become immutable once this is true.
    async fn exists_for_screening(&self, screening_id: Uuid) -> Result<bool, StoreError>;
}
