use crate::error::EngineError;
use crate::identity::Actor;
use chrono::{DateTime, Utc};
use marquee_booking::{
    BookingCoordinator, BookingRequest, PaymentGateway, PaymentInfo, ReservationLifecycle,
    ScheduleChecker,
};
use marquee_domain::events::{
    BookingEvent, ReservationCancelledEvent, SeatsClaimedEvent, SeatsReleasedEvent,
};
use marquee_domain::{
    ContactInfo, Reservation, ReservationStatus, ReservationStore, Screening, ScreeningStatus,
    ScreeningStore, SeatInventory, SeatKey, SeatTemplate, SeatView,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info};
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateScreeningRequest {
    pub theater_id: Uuid,
    pub movie_id: Uuid,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub base_price_cents: i32,
    pub seat_template: SeatTemplate,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookSeatsRequest {
    pub screening_id: Uuid,
    pub seats: Vec<SeatKey>,
    pub payment: PaymentInfo,
    pub contact: ContactInfo,
}

/// Seat-map snapshot for display. Best-effort: not synchronized against
/// claims in flight.
#[derive(Debug, Clone, Serialize)]
pub struct AvailabilityView {
    pub screening_id: Uuid,
    pub starts_at: DateTime<Utc>,
    pub status: ScreeningStatus,
    pub seats: Vec<SeatView>,
}

/// The engine boundary. Surrounding request-handling code resolves
/// credentials to an `Actor` and calls these operations; ownership and
/// admin-override checks happen here and nowhere deeper.
pub struct BookingService {
    screenings: Arc<dyn ScreeningStore>,
    reservations: Arc<dyn ReservationStore>,
    gateway: Arc<dyn PaymentGateway>,
    coordinator: BookingCoordinator,
    lifecycle: ReservationLifecycle,
    currency: String,
    events: broadcast::Sender<BookingEvent>,
}

impl BookingService {
    pub fn new(
        screenings: Arc<dyn ScreeningStore>,
        reservations: Arc<dyn ReservationStore>,
        gateway: Arc<dyn PaymentGateway>,
        lifecycle: ReservationLifecycle,
        currency: String,
        event_buffer: usize,
    ) -> Self {
        let (events, _) = broadcast::channel(event_buffer.max(1));
        let coordinator = BookingCoordinator::new(
            screenings.clone(),
            reservations.clone(),
            gateway.clone(),
            lifecycle.clone(),
        );
        Self {
            screenings,
            reservations,
            gateway,
            coordinator,
            lifecycle,
            currency,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BookingEvent> {
        self.events.subscribe()
    }

    /// Create a screening after the schedule conflict check passes, with the
    /// seat arena materialized from the template.
    pub async fn create_screening(
        &self,
        actor: &Actor,
        request: CreateScreeningRequest,
    ) -> Result<Screening, EngineError> {
        self.require_admin(actor, "create screenings")?;
        let now = Utc::now();

        let existing = self.screenings.list_by_theater(request.theater_id).await?;
        ScheduleChecker::check_no_conflict(&existing, request.starts_at, request.ends_at, None)?;

        let seats = SeatInventory::materialize(
            &request.seat_template,
            request.base_price_cents,
            &self.lifecycle.policy().multipliers,
        )?;
        let screening = Screening::new(
            request.theater_id,
            request.movie_id,
            request.starts_at,
            request.ends_at,
            request.base_price_cents,
            self.currency.clone(),
            seats,
            now,
        );
        self.screenings.insert(&screening).await?;

        info!(
            screening_id = %screening.id,
            theater_id = %screening.theater_id,
            seats = screening.seats.len(),
            "Screening created"
        );
        Ok(screening)
    }

    /// Move a screening's window. Rejected once the screening has started or
    /// once any reservation exists against it; the new window is
    /// conflict-checked against the rest of the theater's schedule.
    pub async fn reschedule_screening(
        &self,
        actor: &Actor,
        screening_id: Uuid,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> Result<Screening, EngineError> {
        self.require_admin(actor, "reschedule screenings")?;
        let now = Utc::now();

        let screening = self.screenings.get(screening_id).await?;
        let has_reservations = self
            .reservations
            .exists_for_screening(screening_id)
            .await?;
        ScheduleChecker::ensure_editable(&screening, has_reservations, now)?;

        let existing = self.screenings.list_by_theater(screening.theater_id).await?;
        ScheduleChecker::check_no_conflict(&existing, starts_at, ends_at, Some(screening_id))?;

        self.screenings
            .reschedule(screening_id, starts_at, ends_at)
            .await?;
        Ok(self.screenings.get(screening_id).await?)
    }

    /// Soft-deactivate: the screening stops accepting bookings but its record
    /// and history remain.
    pub async fn deactivate_screening(
        &self,
        actor: &Actor,
        screening_id: Uuid,
    ) -> Result<Screening, EngineError> {
        self.require_admin(actor, "deactivate screenings")?;
        self.screenings
            .set_status(screening_id, ScreeningStatus::Deactivated)
            .await?;
        info!(%screening_id, "Screening deactivated");
        Ok(self.screenings.get(screening_id).await?)
    }

    /// Mark a past screening finished. Rejected while the screening is still
    /// upcoming or running.
    pub async fn finish_screening(
        &self,
        actor: &Actor,
        screening_id: Uuid,
    ) -> Result<Screening, EngineError> {
        self.require_admin(actor, "finish screenings")?;
        let screening = self.screenings.get(screening_id).await?;
        if screening.status != ScreeningStatus::Scheduled || !screening.has_ended(Utc::now()) {
            return Err(EngineError::Lifecycle(
                marquee_booking::LifecycleError::InvalidTransition {
                    from: screening.status.to_string(),
                    to: ScreeningStatus::Finished.to_string(),
                },
            ));
        }
        self.screenings
            .set_status(screening_id, ScreeningStatus::Finished)
            .await?;
        Ok(self.screenings.get(screening_id).await?)
    }

    /// Book seats for the calling holder. Delegates to the transaction
    /// coordinator; on success the claim and the reservation record exist
    /// together, on any failure neither does.
    pub async fn book_seats(
        &self,
        actor: &Actor,
        request: BookSeatsRequest,
    ) -> Result<Reservation, EngineError> {
        let reservation = self
            .coordinator
            .book(BookingRequest {
                screening_id: request.screening_id,
                seats: request.seats,
                holder_id: actor.id.clone(),
                payment: request.payment,
                contact: request.contact,
            })
            .await?;

        let _ = self.events.send(BookingEvent::SeatsClaimed(SeatsClaimedEvent {
            screening_id: reservation.screening_id,
            reservation_id: reservation.id,
            holder_id: reservation.holder_id.clone(),
            seat_labels: reservation.seats.iter().map(|s| s.key.to_string()).collect(),
            claimed_at: reservation.created_at.timestamp(),
        }));
        Ok(reservation)
    }

    /// Cancel a reservation, releasing its seats and computing the refund
    /// from the time remaining until the screening starts.
    pub async fn cancel_reservation(
        &self,
        actor: &Actor,
        reservation_id: Uuid,
        reason: Option<String>,
    ) -> Result<i32, EngineError> {
        let reservation = self.reservations.get(reservation_id).await?;
        self.require_owner_or_admin(actor, &reservation)?;

        let screening = self.screenings.get(reservation.screening_id).await?;
        let now = Utc::now();

        let mut updated = reservation;
        let refund = self
            .lifecycle
            .cancel(&mut updated, screening.starts_at, now, reason)?;

        // Persist the terminal state first; release afterwards. A failed
        // release only leaves seats looking unavailable until retried,
        // never the reverse.
        self.reservations.update(&updated).await?;
        let seat_keys = updated.seat_keys();
        self.screenings
            .release_seats(screening.id, &seat_keys)
            .await?;

        if refund > 0 {
            if let Some(reference) = &updated.payment.reference {
                // The computed amount recorded on the reservation is
                // authoritative; settlement retries belong to the provider.
                if let Err(err) = self.gateway.refund(reference, refund).await {
                    error!(
                        %reservation_id,
                        error = %err,
                        "Refund issuance failed; amount remains recorded"
                    );
                }
            }
        }

        let cancelled_at = updated.cancelled_at.unwrap_or(now).timestamp();
        let _ = self.events.send(BookingEvent::SeatsReleased(SeatsReleasedEvent {
            screening_id: screening.id,
            seat_labels: seat_keys.iter().map(|k| k.to_string()).collect(),
            released_at: cancelled_at,
        }));
        let _ = self
            .events
            .send(BookingEvent::ReservationCancelled(ReservationCancelledEvent {
                reservation_id,
                screening_id: screening.id,
                refund_cents: refund,
                cancelled_at,
            }));

        info!(%reservation_id, refund_cents = refund, "Reservation cancelled");
        Ok(refund)
    }

    /// Record a check-in. Window: [start - 2h, start + 30m] by default.
    pub async fn check_in(
        &self,
        actor: &Actor,
        reservation_id: Uuid,
    ) -> Result<DateTime<Utc>, EngineError> {
        let reservation = self.reservations.get(reservation_id).await?;
        self.require_owner_or_admin(actor, &reservation)?;

        let screening = self.screenings.get(reservation.screening_id).await?;
        let mut updated = reservation;
        let checked_in_at = self
            .lifecycle
            .check_in(&mut updated, screening.starts_at, Utc::now())?;
        self.reservations.update(&updated).await?;
        Ok(checked_in_at)
    }

    /// Administrative status override; routes through the state machine.
    pub async fn set_reservation_status(
        &self,
        actor: &Actor,
        reservation_id: Uuid,
        target: ReservationStatus,
    ) -> Result<Reservation, EngineError> {
        self.require_admin(actor, "override reservation status")?;

        let reservation = self.reservations.get(reservation_id).await?;
        let screening = self.screenings.get(reservation.screening_id).await?;
        let mut updated = reservation;
        self.lifecycle.transition_to(
            &mut updated,
            target,
            screening.starts_at,
            screening.ends_at,
            Utc::now(),
        )?;
        self.reservations.update(&updated).await?;
        Ok(updated)
    }

    pub async fn get_availability(
        &self,
        screening_id: Uuid,
    ) -> Result<AvailabilityView, EngineError> {
        let screening = self.screenings.get(screening_id).await?;
        Ok(AvailabilityView {
            screening_id,
            starts_at: screening.starts_at,
            status: screening.status,
            seats: screening.seats.snapshot(),
        })
    }

    pub async fn get_reservation(
        &self,
        actor: &Actor,
        reservation_id: Uuid,
    ) -> Result<Reservation, EngineError> {
        let reservation = self.reservations.get(reservation_id).await?;
        self.require_owner_or_admin(actor, &reservation)?;
        Ok(reservation)
    }

    fn require_admin(&self, actor: &Actor, action: &str) -> Result<(), EngineError> {
        if !actor.is_admin() {
            return Err(EngineError::AccessDenied(format!(
                "Only administrators may {}",
                action
            )));
        }
        Ok(())
    }

    fn require_owner_or_admin(
        &self,
        actor: &Actor,
        reservation: &Reservation,
    ) -> Result<(), EngineError> {
        if actor.is_admin() || actor.id == reservation.holder_id {
            return Ok(());
        }
        Err(EngineError::AccessDenied(
            "Reservation does not belong to you".to_string(),
        ))
    }
}
