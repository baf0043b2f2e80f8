use crate::inventory::SeatInventory;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Screening lifecycle. A tagged state rather than an active flag: screenings
/// are soft-deactivated or marked finished, never hard-deleted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScreeningStatus {
    Scheduled,
    Deactivated,
    Finished,
}

impl ScreeningStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScreeningStatus::Scheduled => "SCHEDULED",
            ScreeningStatus::Deactivated => "DEACTIVATED",
            ScreeningStatus::Finished => "FINISHED",
        }
    }
}

impl fmt::Display for ScreeningStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScreeningStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SCHEDULED" => Ok(ScreeningStatus::Scheduled),
            "DEACTIVATED" => Ok(ScreeningStatus::Deactivated),
            "FINISHED" => Ok(ScreeningStatus::Finished),
            other => Err(format!("Unknown screening status: {}", other)),
        }
    }
}

/// One scheduled showing: a theater, a time window and the seat inventory
/// that belongs to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Screening {
    pub id: Uuid,
    pub theater_id: Uuid,
    pub movie_id: Uuid,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub base_price_cents: i32,
    pub currency: String,
    pub status: ScreeningStatus,
    pub seats: SeatInventory,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Screening {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        theater_id: Uuid,
        movie_id: Uuid,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
        base_price_cents: i32,
        currency: String,
        seats: SeatInventory,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            theater_id,
            movie_id,
            starts_at,
            ends_at,
            base_price_cents,
            currency,
            status: ScreeningStatus::Scheduled,
            seats,
            created_at: now,
            updated_at: now,
        }
    }

    /// Half-open interval overlap: [s1, e1) and [s2, e2) conflict iff
    /// s1 < e2 && s2 < e1. Back-to-back windows do not conflict.
    pub fn overlaps_window(&self, starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> bool {
        self.starts_at < ends_at && starts_at < self.ends_at
    }

    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        now >= self.starts_at
    }

    pub fn has_ended(&self, now: DateTime<Utc>) -> bool {
        now >= self.ends_at
    }

    /// Open for booking: still scheduled and strictly before start.
    pub fn is_bookable(&self, now: DateTime<Utc>) -> bool {
        self.status == ScreeningStatus::Scheduled && now < self.starts_at
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}
