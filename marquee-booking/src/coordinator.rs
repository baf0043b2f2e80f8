use crate::lifecycle::{LifecycleError, ReservationLifecycle};
use crate::payment::PaymentGateway;
use chrono::Utc;
use marquee_domain::{
    ContactInfo, InventoryError, Reservation, ReservationStore, ScreeningStore, SeatKey,
    StoreError,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentInfo {
    pub method: String,
    /// Capture token. Absent means payment is deferred and the reservation
    /// stays PENDING until confirmed administratively.
    pub token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookingRequest {
    pub screening_id: Uuid,
    pub seats: Vec<SeatKey>,
    pub holder_id: String,
    pub payment: PaymentInfo,
    pub contact: ContactInfo,
}

/// Orchestrates claim-then-create.
///
/// The claim is delegated to the screening store's atomic primitive; the
/// reservation record is only persisted afterwards. If anything fails once
/// seats are claimed, the claim is released before the error surfaces:
/// seats must never stay claimed without a reservation record behind them.
pub struct BookingCoordinator {
    screenings: Arc<dyn ScreeningStore>,
    reservations: Arc<dyn ReservationStore>,
    gateway: Arc<dyn PaymentGateway>,
    lifecycle: ReservationLifecycle,
}

impl BookingCoordinator {
    pub fn new(
        screenings: Arc<dyn ScreeningStore>,
        reservations: Arc<dyn ReservationStore>,
        gateway: Arc<dyn PaymentGateway>,
        lifecycle: ReservationLifecycle,
    ) -> Self {
        Self {
            screenings,
            reservations,
            gateway,
            lifecycle,
        }
    }

    pub async fn book(&self, request: BookingRequest) -> Result<Reservation, BookingError> {
        let now = Utc::now();

        if request.seats.is_empty() {
            return Err(BookingError::NoSeatsRequested);
        }

        let screening = self.screenings.get(request.screening_id).await?;
        if !screening.is_bookable(now) {
            return Err(BookingError::ScreeningUnavailable(request.screening_id));
        }

        let reservation_id = Uuid::new_v4();
        let captured = self
            .screenings
            .claim_seats(request.screening_id, &request.seats, reservation_id)
            .await?;

        let mut reservation = Reservation::new(
            reservation_id,
            request.screening_id,
            request.holder_id,
            captured,
            screening.currency.clone(),
            request.payment.method.clone(),
            request.contact,
            now,
        );

        if let Some(token) = &request.payment.token {
            match self
                .gateway
                .capture(reservation_id, reservation.total_cents, &reservation.currency, token)
                .await
            {
                Ok(reference) => {
                    reservation.payment.reference = Some(reference);
                    reservation.payment.captured_at = Some(now);
                    if let Err(err) =
                        self.lifecycle
                            .confirm(&mut reservation, screening.starts_at, now)
                    {
                        self.abort_claim(request.screening_id, &request.seats).await;
                        return Err(BookingError::Lifecycle(err));
                    }
                }
                Err(err) => {
                    self.abort_claim(request.screening_id, &request.seats).await;
                    return Err(BookingError::PaymentDeclined(err.to_string()));
                }
            }
        }

        if let Err(err) = self.reservations.insert(&reservation).await {
            // Compensating action: the claim must not outlive the failed
            // reservation write.
            self.abort_claim(request.screening_id, &request.seats).await;
            return Err(BookingError::Storage(err));
        }

        info!(
            reservation_id = %reservation.id,
            screening_id = %reservation.screening_id,
            seats = reservation.seats.len(),
            total_cents = reservation.total_cents,
            status = %reservation.status,
            "Booking committed"
        );
        Ok(reservation)
    }

    async fn abort_claim(&self, screening_id: Uuid, seats: &[SeatKey]) {
        if let Err(err) = self.screenings.release_seats(screening_id, seats).await {
            // Release is idempotent, so the caller can retry; the seats stay
            // visible as claimed until then.
            error!(
                %screening_id,
                error = %err,
                "Failed to release seats after aborted booking"
            );
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Screening {0} is not open for booking")]
    ScreeningUnavailable(Uuid),

    #[error("Seats unavailable: {}", .seats.iter().map(|k| k.to_string()).collect::<Vec<_>>().join(", "))]
    SeatUnavailable { seats: Vec<SeatKey> },

    #[error("No seats requested")]
    NoSeatsRequested,

    #[error("Payment declined: {0}")]
    PaymentDeclined(String),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error("Storage failure: {0}")]
    Storage(StoreError),
}

impl From<StoreError> for BookingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Seats(InventoryError::SeatUnavailable { seats }) => {
                BookingError::SeatUnavailable { seats }
            }
            StoreError::ScreeningNotFound(id) => BookingError::ScreeningUnavailable(id),
            other => BookingError::Storage(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payment::MockGateway;
    use crate::policy::BookingPolicy;
    use async_trait::async_trait;
    use chrono::{DateTime, Duration};
    use marquee_domain::{
        ClassMultipliers, ReservationStatus, ReservedSeat, RowTemplate, Screening,
        ScreeningStatus, SeatClass, SeatInventory, SeatTemplate, SeatView,
    };
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    /// Single-screening store stub; claim/release run under one mutex, the
    /// same discipline the real stores use.
    struct StubScreeningStore {
        screening: Mutex<Screening>,
    }

    impl StubScreeningStore {
        fn new(screening: Screening) -> Self {
            Self {
                screening: Mutex::new(screening),
            }
        }
    }

    #[async_trait]
    impl ScreeningStore for StubScreeningStore {
        async fn insert(&self, _screening: &Screening) -> Result<(), StoreError> {
            Ok(())
        }

        async fn get(&self, id: Uuid) -> Result<Screening, StoreError> {
            let screening = self.screening.lock().await;
            if screening.id != id {
                return Err(StoreError::ScreeningNotFound(id));
            }
            Ok(screening.clone())
        }

        async fn list_by_theater(&self, _theater_id: Uuid) -> Result<Vec<Screening>, StoreError> {
            Ok(vec![self.screening.lock().await.clone()])
        }

        async fn set_status(&self, _id: Uuid, status: ScreeningStatus) -> Result<(), StoreError> {
            self.screening.lock().await.status = status;
            Ok(())
        }

        async fn reschedule(
            &self,
            _id: Uuid,
            starts_at: DateTime<Utc>,
            ends_at: DateTime<Utc>,
        ) -> Result<(), StoreError> {
            let mut screening = self.screening.lock().await;
            screening.starts_at = starts_at;
            screening.ends_at = ends_at;
            Ok(())
        }

        async fn claim_seats(
            &self,
            _id: Uuid,
            keys: &[SeatKey],
            reservation_id: Uuid,
        ) -> Result<Vec<ReservedSeat>, StoreError> {
            let mut screening = self.screening.lock().await;
            let captured = screening.seats.claim(keys, reservation_id, Utc::now())?;
            Ok(captured)
        }

        async fn release_seats(&self, _id: Uuid, keys: &[SeatKey]) -> Result<(), StoreError> {
            self.screening.lock().await.seats.release(keys);
            Ok(())
        }

        async fn seat_snapshot(&self, _id: Uuid) -> Result<Vec<SeatView>, StoreError> {
            Ok(self.screening.lock().await.seats.snapshot())
        }
    }

    struct StubReservationStore {
        reservations: Mutex<HashMap<Uuid, Reservation>>,
        fail_inserts: bool,
    }

    impl StubReservationStore {
        fn new(fail_inserts: bool) -> Self {
            Self {
                reservations: Mutex::new(HashMap::new()),
                fail_inserts,
            }
        }
    }

    #[async_trait]
    impl ReservationStore for StubReservationStore {
        async fn insert(&self, reservation: &Reservation) -> Result<(), StoreError> {
            if self.fail_inserts {
                return Err(StoreError::Backend("insert failed".to_string()));
            }
            self.reservations
                .lock()
                .await
                .insert(reservation.id, reservation.clone());
            Ok(())
        }

        async fn get(&self, id: Uuid) -> Result<Reservation, StoreError> {
            self.reservations
                .lock()
                .await
                .get(&id)
                .cloned()
                .ok_or(StoreError::ReservationNotFound(id))
        }

        async fn update(&self, reservation: &Reservation) -> Result<(), StoreError> {
            self.reservations
                .lock()
                .await
                .insert(reservation.id, reservation.clone());
            Ok(())
        }

        async fn list_by_holder(&self, holder_id: &str) -> Result<Vec<Reservation>, StoreError> {
            Ok(self
                .reservations
                .lock()
                .await
                .values()
                .filter(|r| r.holder_id == holder_id)
                .cloned()
                .collect())
        }

        async fn exists_for_screening(&self, screening_id: Uuid) -> Result<bool, StoreError> {
            Ok(self
                .reservations
                .lock()
                .await
                .values()
                .any(|r| r.screening_id == screening_id))
        }
    }

    fn future_screening() -> Screening {
        let template = SeatTemplate::new(vec![RowTemplate {
            label: "A".to_string(),
            seats: 2,
            class: SeatClass::Regular,
        }]);
        let seats =
            SeatInventory::materialize(&template, 1000, &ClassMultipliers::default()).unwrap();
        let now = Utc::now();
        Screening::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            now + Duration::hours(30),
            now + Duration::hours(32),
            1000,
            "USD".to_string(),
            seats,
            now,
        )
    }

    fn request(screening_id: Uuid, token: Option<&str>) -> BookingRequest {
        BookingRequest {
            screening_id,
            seats: vec![SeatKey::new("A", 1), SeatKey::new("A", 2)],
            holder_id: "user-1".to_string(),
            payment: PaymentInfo {
                method: "CARD".to_string(),
                token: token.map(str::to_string),
            },
            contact: ContactInfo {
                email: "user@example.com".to_string(),
                phone: None,
            },
        }
    }

    fn coordinator(
        screenings: Arc<StubScreeningStore>,
        reservations: Arc<StubReservationStore>,
    ) -> BookingCoordinator {
        BookingCoordinator::new(
            screenings,
            reservations,
            Arc::new(MockGateway),
            ReservationLifecycle::new(BookingPolicy::default()),
        )
    }

    #[tokio::test]
    async fn test_book_captures_and_confirms() {
        let screening = future_screening();
        let screening_id = screening.id;
        let screenings = Arc::new(StubScreeningStore::new(screening));
        let reservations = Arc::new(StubReservationStore::new(false));
        let coordinator = coordinator(screenings.clone(), reservations.clone());

        let reservation = coordinator
            .book(request(screening_id, Some("tok_visa")))
            .await
            .unwrap();

        assert_eq!(reservation.status, ReservationStatus::Confirmed);
        assert_eq!(reservation.total_cents, 2000);
        assert!(reservation.totals_consistent());
        assert!(reservation.payment.reference.is_some());
        assert!(reservations.get(reservation.id).await.is_ok());

        let snapshot = screenings.seat_snapshot(screening_id).await.unwrap();
        assert!(snapshot.iter().all(|s| !s.available));
    }

    #[tokio::test]
    async fn test_deferred_payment_stays_pending() {
        let screening = future_screening();
        let screening_id = screening.id;
        let screenings = Arc::new(StubScreeningStore::new(screening));
        let reservations = Arc::new(StubReservationStore::new(false));
        let coordinator = coordinator(screenings, reservations);

        let reservation = coordinator.book(request(screening_id, None)).await.unwrap();
        assert_eq!(reservation.status, ReservationStatus::Pending);
        assert!(reservation.payment.captured_at.is_none());
    }

    #[tokio::test]
    async fn test_inactive_or_past_screening_rejected() {
        let mut screening = future_screening();
        screening.status = ScreeningStatus::Deactivated;
        let screening_id = screening.id;
        let screenings = Arc::new(StubScreeningStore::new(screening));
        let reservations = Arc::new(StubReservationStore::new(false));
        let coordinator = coordinator(screenings, reservations);

        let err = coordinator
            .book(request(screening_id, Some("tok_visa")))
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::ScreeningUnavailable(id) if id == screening_id));
    }

    #[tokio::test]
    async fn test_overlapping_bookings_one_wins() {
        let screening = future_screening();
        let screening_id = screening.id;
        let screenings = Arc::new(StubScreeningStore::new(screening));
        let reservations = Arc::new(StubReservationStore::new(false));
        let coordinator = coordinator(screenings, reservations);

        coordinator
            .book(request(screening_id, Some("tok_visa")))
            .await
            .unwrap();

        let mut second = request(screening_id, Some("tok_visa"));
        second.seats = vec![SeatKey::new("A", 1)];
        second.holder_id = "user-2".to_string();
        let err = coordinator.book(second).await.unwrap_err();
        match err {
            BookingError::SeatUnavailable { seats } => {
                assert_eq!(seats, vec![SeatKey::new("A", 1)])
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_persistence_failure_releases_claim() {
        let screening = future_screening();
        let screening_id = screening.id;
        let screenings = Arc::new(StubScreeningStore::new(screening));
        let reservations = Arc::new(StubReservationStore::new(true));
        let coordinator = coordinator(screenings.clone(), reservations.clone());

        let err = coordinator
            .book(request(screening_id, Some("tok_visa")))
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::Storage(_)));

        // Compensation ran: every seat is available again and no reservation
        // record exists.
        let snapshot = screenings.seat_snapshot(screening_id).await.unwrap();
        assert!(snapshot.iter().all(|s| s.available));
        assert!(!reservations.exists_for_screening(screening_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_payment_failure_releases_claim() {
        let screening = future_screening();
        let screening_id = screening.id;
        let screenings = Arc::new(StubScreeningStore::new(screening));
        let reservations = Arc::new(StubReservationStore::new(false));
        let coordinator = coordinator(screenings.clone(), reservations.clone());

        let err = coordinator
            .book(request(screening_id, Some("no-funds")))
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::PaymentDeclined(_)));

        let snapshot = screenings.seat_snapshot(screening_id).await.unwrap();
        assert!(snapshot.iter().all(|s| s.available));
        assert!(!reservations.exists_for_screening(screening_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_empty_seat_selection_rejected() {
        let screening = future_screening();
        let screening_id = screening.id;
        let screenings = Arc::new(StubScreeningStore::new(screening));
        let reservations = Arc::new(StubReservationStore::new(false));
        let coordinator = coordinator(screenings, reservations);

        let mut req = request(screening_id, Some("tok_visa"));
        req.seats.clear();
        assert!(matches!(
            coordinator.book(req).await,
            Err(BookingError::NoSeatsRequested)
        ));
    }
}
