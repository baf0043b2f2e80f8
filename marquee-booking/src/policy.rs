use chrono::{DateTime, Duration, Utc};
use marquee_domain::ClassMultipliers;
use serde::{Deserialize, Serialize};

/// Time-dependent booking rules.
///
/// Defaults mirror the historical constants (2h cancellation cutoff, 24h full
/// refund boundary, 30m check-in grace) but every threshold is configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingPolicy {
    /// Cancellation is rejected once the screening start is this close.
    #[serde(default = "default_cancellation_cutoff_minutes")]
    pub cancellation_cutoff_minutes: i64,

    /// Cancelling earlier than this before start refunds `full_refund_percent`.
    #[serde(default = "default_full_refund_lead_hours")]
    pub full_refund_lead_hours: i64,

    #[serde(default = "default_full_refund_percent")]
    pub full_refund_percent: i32,

    #[serde(default = "default_partial_refund_percent")]
    pub partial_refund_percent: i32,

    /// Check-in opens this long before the screening starts.
    #[serde(default = "default_checkin_opens_before_minutes")]
    pub checkin_opens_before_minutes: i64,

    /// Check-in closes this long after the screening starts.
    #[serde(default = "default_checkin_closes_after_minutes")]
    pub checkin_closes_after_minutes: i64,

    #[serde(default)]
    pub multipliers: ClassMultipliers,
}

fn default_cancellation_cutoff_minutes() -> i64 {
    120
}
fn default_full_refund_lead_hours() -> i64 {
    24
}
fn default_full_refund_percent() -> i32 {
    90
}
fn default_partial_refund_percent() -> i32 {
    50
}
fn default_checkin_opens_before_minutes() -> i64 {
    120
}
fn default_checkin_closes_after_minutes() -> i64 {
    30
}

impl Default for BookingPolicy {
    fn default() -> Self {
        Self {
            cancellation_cutoff_minutes: default_cancellation_cutoff_minutes(),
            full_refund_lead_hours: default_full_refund_lead_hours(),
            full_refund_percent: default_full_refund_percent(),
            partial_refund_percent: default_partial_refund_percent(),
            checkin_opens_before_minutes: default_checkin_opens_before_minutes(),
            checkin_closes_after_minutes: default_checkin_closes_after_minutes(),
            multipliers: ClassMultipliers::default(),
        }
    }
}

impl BookingPolicy {
    /// Last instant at which cancellation is still accepted.
    pub fn cancellable_until(&self, starts_at: DateTime<Utc>) -> DateTime<Utc> {
        starts_at - Duration::minutes(self.cancellation_cutoff_minutes)
    }

    /// Refund as a pure function of total and time remaining until start:
    /// `full_refund_percent` beyond the full-refund lead, `partial_refund_percent`
    /// between the cancellation cutoff and that lead, nothing inside the cutoff.
    pub fn refund_cents(
        &self,
        total_cents: i32,
        starts_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> i32 {
        let remaining = starts_at - now;
        if remaining > Duration::hours(self.full_refund_lead_hours) {
            total_cents * self.full_refund_percent / 100
        } else if remaining > Duration::minutes(self.cancellation_cutoff_minutes) {
            total_cents * self.partial_refund_percent / 100
        } else {
            0
        }
    }

    /// Inclusive check-in window around the screening start.
    pub fn checkin_window(
        &self,
        starts_at: DateTime<Utc>,
    ) -> (DateTime<Utc>, DateTime<Utc>) {
        (
            starts_at - Duration::minutes(self.checkin_opens_before_minutes),
            starts_at + Duration::minutes(self.checkin_closes_after_minutes),
        )
    }
}
