use chrono::{DateTime, Utc};
use marquee_domain::{Screening, ScreeningStatus};
use uuid::Uuid;

/// Validates screening time windows against a theater's existing schedule.
pub struct ScheduleChecker;

impl ScheduleChecker {
    pub fn validate_window(
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> Result<(), ScheduleError> {
        if ends_at <= starts_at {
            return Err(ScheduleError::InvalidWindow { starts_at, ends_at });
        }
        Ok(())
    }

    /// Reject the candidate window if any other scheduled screening at the
    /// theater overlaps it (half-open semantics: touching windows are fine).
    /// `exclude` skips the screening being rescheduled.
    pub fn check_no_conflict(
        existing: &[Screening],
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
        exclude: Option<Uuid>,
    ) -> Result<(), ScheduleError> {
        Self::validate_window(starts_at, ends_at)?;
        for other in existing {
            if Some(other.id) == exclude || other.status != ScreeningStatus::Scheduled {
                continue;
            }
            if other.overlaps_window(starts_at, ends_at) {
                return Err(ScheduleError::Conflict {
                    screening_id: other.id,
                });
            }
        }
        Ok(())
    }

    /// Screenings are immutable once they have started or once any
    /// reservation exists against them; edits would invalidate the
    /// assumptions behind already-captured claim prices.
    pub fn ensure_editable(
        screening: &Screening,
        has_reservations: bool,
        now: DateTime<Utc>,
    ) -> Result<(), ScheduleError> {
        if screening.has_started(now) {
            return Err(ScheduleError::AlreadyStarted(screening.id));
        }
        if has_reservations || screening.seats.has_claims() {
            return Err(ScheduleError::HasReservations(screening.id));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("Schedule conflict with screening {screening_id}")]
    Conflict { screening_id: Uuid },

    #[error("Invalid screening window: {starts_at} .. {ends_at}")]
    InvalidWindow {
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    },

    #[error("Screening already started: {0}")]
    AlreadyStarted(Uuid),

    #[error("Screening has reservations: {0}")]
    HasReservations(Uuid),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use marquee_domain::{
        ClassMultipliers, RowTemplate, SeatClass, SeatInventory, SeatKey, SeatTemplate,
    };

    fn screening(
        theater_id: Uuid,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> Screening {
        let template = SeatTemplate::new(vec![RowTemplate {
            label: "A".to_string(),
            seats: 4,
            class: SeatClass::Regular,
        }]);
        let seats =
            SeatInventory::materialize(&template, 1000, &ClassMultipliers::default()).unwrap();
        Screening::new(
            theater_id,
            Uuid::new_v4(),
            starts_at,
            ends_at,
            1000,
            "USD".to_string(),
            seats,
            Utc::now(),
        )
    }

    #[test]
    fn test_overlapping_window_conflicts() {
        let theater = Uuid::new_v4();
        let base = Utc::now() + Duration::hours(24);
        let existing = vec![screening(theater, base, base + Duration::hours(2))];

        let err = ScheduleChecker::check_no_conflict(
            &existing,
            base + Duration::hours(1),
            base + Duration::hours(3),
            None,
        )
        .unwrap_err();
        match err {
            ScheduleError::Conflict { screening_id } => {
                assert_eq!(screening_id, existing[0].id)
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_back_to_back_windows_do_not_conflict() {
        let theater = Uuid::new_v4();
        let base = Utc::now() + Duration::hours(24);
        let existing = vec![screening(theater, base, base + Duration::hours(2))];

        assert!(ScheduleChecker::check_no_conflict(
            &existing,
            base + Duration::hours(2),
            base + Duration::hours(4),
            None,
        )
        .is_ok());
    }

    #[test]
    fn test_deactivated_screenings_are_ignored() {
        let theater = Uuid::new_v4();
        let base = Utc::now() + Duration::hours(24);
        let mut old = screening(theater, base, base + Duration::hours(2));
        old.status = ScreeningStatus::Deactivated;

        assert!(ScheduleChecker::check_no_conflict(
            &[old],
            base,
            base + Duration::hours(2),
            None,
        )
        .is_ok());
    }

    #[test]
    fn test_reschedule_excludes_self() {
        let theater = Uuid::new_v4();
        let base = Utc::now() + Duration::hours(24);
        let existing = vec![screening(theater, base, base + Duration::hours(2))];

        // Shifting a screening within its own old window is fine.
        assert!(ScheduleChecker::check_no_conflict(
            &existing,
            base + Duration::minutes(30),
            base + Duration::hours(2),
            Some(existing[0].id),
        )
        .is_ok());
    }

    #[test]
    fn test_invalid_window_rejected() {
        let base = Utc::now();
        let err = ScheduleChecker::check_no_conflict(&[], base, base, None).unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidWindow { .. }));
    }

    #[test]
    fn test_edit_guard() {
        let theater = Uuid::new_v4();
        let now = Utc::now();

        let future = screening(theater, now + Duration::hours(5), now + Duration::hours(7));
        assert!(ScheduleChecker::ensure_editable(&future, false, now).is_ok());
        assert!(matches!(
            ScheduleChecker::ensure_editable(&future, true, now),
            Err(ScheduleError::HasReservations(_))
        ));

        let mut claimed = screening(theater, now + Duration::hours(5), now + Duration::hours(7));
        claimed
            .seats
            .claim(&[SeatKey::new("A", 1)], Uuid::new_v4(), now)
            .unwrap();
        assert!(matches!(
            ScheduleChecker::ensure_editable(&claimed, false, now),
            Err(ScheduleError::HasReservations(_))
        ));

        let started = screening(theater, now - Duration::hours(1), now + Duration::hours(1));
        assert!(matches!(
            ScheduleChecker::ensure_editable(&started, false, now),
            Err(ScheduleError::AlreadyStarted(_))
        ));
    }
}
