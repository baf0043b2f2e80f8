use crate::policy::BookingPolicy;
use chrono::{DateTime, Utc};
use marquee_domain::{Reservation, ReservationStatus};

/// Reservation state machine.
///
/// States: PENDING (initial) → CONFIRMED → CANCELLED / COMPLETED / NO_SHOW,
/// the last three terminal. Check-in is a side transition from CONFIRMED that
/// records a timestamp without changing status. Every mutation of a
/// reservation's status goes through here.
#[derive(Debug, Clone)]
pub struct ReservationLifecycle {
    policy: BookingPolicy,
}

impl ReservationLifecycle {
    pub fn new(policy: BookingPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &BookingPolicy {
        &self.policy
    }

    /// PENDING → CONFIRMED, allowed any time strictly before the screening start.
    pub fn confirm(
        &self,
        reservation: &mut Reservation,
        screening_start: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), LifecycleError> {
        if reservation.status != ReservationStatus::Pending || now >= screening_start {
            return Err(LifecycleError::invalid(
                reservation.status,
                ReservationStatus::Confirmed,
            ));
        }
        reservation.status = ReservationStatus::Confirmed;
        reservation.confirmed_at = Some(now);
        reservation.touch(now);
        Ok(())
    }

    /// Cancellation holds while the reservation is not terminal and the
    /// screening start is still outside the cancellation cutoff.
    pub fn is_cancellable(
        &self,
        reservation: &Reservation,
        screening_start: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> bool {
        !reservation.status.is_terminal() && now < self.policy.cancellable_until(screening_start)
    }

    /// {PENDING, CONFIRMED} → CANCELLED. Returns the refund amount: tiered by
    /// time remaining for captured payments, zero when nothing was captured.
    /// The caller releases the seat claims.
    pub fn cancel(
        &self,
        reservation: &mut Reservation,
        screening_start: DateTime<Utc>,
        now: DateTime<Utc>,
        reason: Option<String>,
    ) -> Result<i32, LifecycleError> {
        if !self.is_cancellable(reservation, screening_start, now) {
            return Err(LifecycleError::invalid(
                reservation.status,
                ReservationStatus::Cancelled,
            ));
        }
        let refund = if reservation.payment.captured_at.is_some() {
            self.policy
                .refund_cents(reservation.total_cents, screening_start, now)
        } else {
            0
        };
        reservation.status = ReservationStatus::Cancelled;
        reservation.cancelled_at = Some(now);
        reservation.cancellation_reason = reason;
        reservation.refund_cents = Some(refund);
        reservation.touch(now);
        Ok(refund)
    }

    /// CONFIRMED → COMPLETED, administrative, once the screening has ended.
    pub fn complete(
        &self,
        reservation: &mut Reservation,
        screening_end: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), LifecycleError> {
        if reservation.status != ReservationStatus::Confirmed || now < screening_end {
            return Err(LifecycleError::invalid(
                reservation.status,
                ReservationStatus::Completed,
            ));
        }
        reservation.status = ReservationStatus::Completed;
        reservation.touch(now);
        Ok(())
    }

    /// CONFIRMED → NO_SHOW, administrative, once the screening has started
    /// and only if the holder never checked in.
    pub fn mark_no_show(
        &self,
        reservation: &mut Reservation,
        screening_start: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), LifecycleError> {
        if reservation.status != ReservationStatus::Confirmed
            || reservation.checked_in_at.is_some()
            || now < screening_start
        {
            return Err(LifecycleError::invalid(
                reservation.status,
                ReservationStatus::NoShow,
            ));
        }
        reservation.status = ReservationStatus::NoShow;
        reservation.touch(now);
        Ok(())
    }

    /// Side transition from CONFIRMED: records the check-in time without
    /// changing status. The window check comes first, so an out-of-window
    /// attempt fails with `CheckInWindowViolation` regardless of status.
    /// Checking in twice is idempotent and returns the recorded time.
    pub fn check_in(
        &self,
        reservation: &mut Reservation,
        screening_start: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, LifecycleError> {
        let (opens_at, closes_at) = self.policy.checkin_window(screening_start);
        if now < opens_at || now > closes_at {
            return Err(LifecycleError::CheckInWindowViolation { opens_at, closes_at });
        }
        if reservation.status != ReservationStatus::Confirmed {
            return Err(LifecycleError::InvalidTransition {
                from: reservation.status.to_string(),
                to: "CHECKED_IN".to_string(),
            });
        }
        if let Some(at) = reservation.checked_in_at {
            return Ok(at);
        }
        reservation.checked_in_at = Some(now);
        reservation.touch(now);
        Ok(now)
    }

    /// Administrative status override. Only CONFIRMED / COMPLETED / NO_SHOW
    /// targets route through the machine; CANCELLED must go through `cancel`
    /// so seat release and refund computation cannot be bypassed.
    pub fn transition_to(
        &self,
        reservation: &mut Reservation,
        target: ReservationStatus,
        screening_start: DateTime<Utc>,
        screening_end: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), LifecycleError> {
        match target {
            ReservationStatus::Confirmed => self.confirm(reservation, screening_start, now),
            ReservationStatus::Completed => self.complete(reservation, screening_end, now),
            ReservationStatus::NoShow => self.mark_no_show(reservation, screening_start, now),
            ReservationStatus::Cancelled | ReservationStatus::Pending => {
                Err(LifecycleError::invalid(reservation.status, target))
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Check-in window violation: open {opens_at} .. {closes_at}")]
    CheckInWindowViolation {
        opens_at: DateTime<Utc>,
        closes_at: DateTime<Utc>,
    },
}

impl LifecycleError {
    fn invalid(from: ReservationStatus, to: ReservationStatus) -> Self {
        LifecycleError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}
