use crate::seat::{SeatClass, SeatKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
    NoShow,
}

impl ReservationStatus {
    /// Terminal states release their seats and admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReservationStatus::Cancelled | ReservationStatus::Completed | ReservationStatus::NoShow
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "PENDING",
            ReservationStatus::Confirmed => "CONFIRMED",
            ReservationStatus::Cancelled => "CANCELLED",
            ReservationStatus::Completed => "COMPLETED",
            ReservationStatus::NoShow => "NO_SHOW",
        }
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReservationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(ReservationStatus::Pending),
            "CONFIRMED" => Ok(ReservationStatus::Confirmed),
            "CANCELLED" => Ok(ReservationStatus::Cancelled),
            "COMPLETED" => Ok(ReservationStatus::Completed),
            "NO_SHOW" => Ok(ReservationStatus::NoShow),
            other => Err(format!("Unknown reservation status: {}", other)),
        }
    }
}

/// A seat as captured at claim time. Price is frozen here; later screening
/// edits cannot change what the holder was charged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReservedSeat {
    pub key: SeatKey,
    pub class: SeatClass,
    pub price_cents: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub amount_cents: i32,
    pub currency: String,
    pub method: String,
    /// Gateway reference, present once the payment was captured.
    pub reference: Option<String>,
    pub captured_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactInfo {
    pub email: String,
    pub phone: Option<String>,
}

/// A reservation and its captured seat set.
///
/// The seat set is immutable after creation except by full cancellation.
/// Reservations are never physically deleted; terminal states are recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Uuid,
    pub screening_id: Uuid,
    pub holder_id: String,
    pub seats: Vec<ReservedSeat>,
    pub total_cents: i32,
    pub currency: String,
    pub payment: PaymentRecord,
    pub contact: ContactInfo,
    pub status: ReservationStatus,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub refund_cents: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    pub fn new(
        id: Uuid,
        screening_id: Uuid,
        holder_id: String,
        seats: Vec<ReservedSeat>,
        currency: String,
        payment_method: String,
        contact: ContactInfo,
        now: DateTime<Utc>,
    ) -> Self {
        let total_cents = seats.iter().map(|s| s.price_cents).sum();
        Self {
            id,
            screening_id,
            holder_id,
            seats,
            total_cents,
            currency: currency.clone(),
            payment: PaymentRecord {
                amount_cents: total_cents,
                currency,
                method: payment_method,
                reference: None,
                captured_at: None,
            },
            contact,
            status: ReservationStatus::Pending,
            confirmed_at: None,
            checked_in_at: None,
            cancelled_at: None,
            cancellation_reason: None,
            refund_cents: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn seat_keys(&self) -> Vec<SeatKey> {
        self.seats.iter().map(|s| s.key.clone()).collect()
    }

    /// Sum of captured seat prices must equal the recorded total and the
    /// payment amount.
    pub fn totals_consistent(&self) -> bool {
        let sum: i32 = self.seats.iter().map(|s| s.price_cents).sum();
        sum == self.total_cents && sum == self.payment.amount_cents
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}
