use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SeatsClaimedEvent {
    pub screening_id: Uuid,
    pub reservation_id: Uuid,
    pub holder_id: String,
    pub seat_labels: Vec<String>,
    pub claimed_at: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SeatsReleasedEvent {
    pub screening_id: Uuid,
    pub seat_labels: Vec<String>,
    pub released_at: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ReservationCancelledEvent {
    pub reservation_id: Uuid,
    pub screening_id: Uuid,
    pub refund_cents: i32,
    pub cancelled_at: i64,
}

/// Fan-out envelope published on the engine's broadcast channel.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingEvent {
    SeatsClaimed(SeatsClaimedEvent),
    SeatsReleased(SeatsReleasedEvent),
    ReservationCancelled(ReservationCancelledEvent),
}
