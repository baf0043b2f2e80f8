use async_trait::async_trait;
use chrono::{DateTime, Utc};
use marquee_domain::{
    Reservation, ReservationStore, ReservedSeat, Screening, ScreeningStore, ScreeningStatus,
    SeatKey, SeatView, StoreError,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

/// In-memory store, the reference implementation of the repository traits.
///
/// Each screening lives behind its own mutex; claim and release take that
/// mutex, which serializes availability mutations per screening, so two
/// concurrent claims over intersecting seat sets can never both observe
/// "available". Snapshots clone under the same mutex but hold it only
/// briefly, so they are best-effort with respect to in-flight claims.
#[derive(Default)]
pub struct MemoryStore {
    screenings: RwLock<HashMap<Uuid, Arc<Mutex<Screening>>>>,
    reservations: RwLock<HashMap<Uuid, Reservation>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn screening_cell(&self, id: Uuid) -> Result<Arc<Mutex<Screening>>, StoreError> {
        self.screenings
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(StoreError::ScreeningNotFound(id))
    }
}

#[async_trait]
impl ScreeningStore for MemoryStore {
    async fn insert(&self, screening: &Screening) -> Result<(), StoreError> {
        self.screenings
            .write()
            .await
            .insert(screening.id, Arc::new(Mutex::new(screening.clone())));
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Screening, StoreError> {
        let cell = self.screening_cell(id).await?;
        let screening = cell.lock().await;
        Ok(screening.clone())
    }

    async fn list_by_theater(&self, theater_id: Uuid) -> Result<Vec<Screening>, StoreError> {
        let cells: Vec<Arc<Mutex<Screening>>> =
            self.screenings.read().await.values().cloned().collect();
        let mut result = Vec::new();
        for cell in cells {
            let screening = cell.lock().await;
            if screening.theater_id == theater_id {
                result.push(screening.clone());
            }
        }
        Ok(result)
    }

    async fn set_status(&self, id: Uuid, status: ScreeningStatus) -> Result<(), StoreError> {
        let cell = self.screening_cell(id).await?;
        let mut screening = cell.lock().await;
        screening.status = status;
        screening.touch(Utc::now());
        Ok(())
    }

    async fn reschedule(
        &self,
        id: Uuid,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let cell = self.screening_cell(id).await?;
        let mut screening = cell.lock().await;
        screening.starts_at = starts_at;
        screening.ends_at = ends_at;
        screening.touch(Utc::now());
        Ok(())
    }

    async fn claim_seats(
        &self,
        id: Uuid,
        keys: &[SeatKey],
        reservation_id: Uuid,
    ) -> Result<Vec<ReservedSeat>, StoreError> {
        let cell = self.screening_cell(id).await?;
        let mut screening = cell.lock().await;
        let captured = screening.seats.claim(keys, reservation_id, Utc::now())?;
        screening.touch(Utc::now());
        Ok(captured)
    }

    async fn release_seats(&self, id: Uuid, keys: &[SeatKey]) -> Result<(), StoreError> {
        let cell = self.screening_cell(id).await?;
        let mut screening = cell.lock().await;
        screening.seats.release(keys);
        screening.touch(Utc::now());
        Ok(())
    }

    async fn seat_snapshot(&self, id: Uuid) -> Result<Vec<SeatView>, StoreError> {
        let cell = self.screening_cell(id).await?;
        let screening = cell.lock().await;
        Ok(screening.seats.snapshot())
    }
}

#[async_trait]
impl ReservationStore for MemoryStore {
    async fn insert(&self, reservation: &Reservation) -> Result<(), StoreError> {
        self.reservations
            .write()
            .await
            .insert(reservation.id, reservation.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Reservation, StoreError> {
        self.reservations
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(StoreError::ReservationNotFound(id))
    }

    async fn update(&self, reservation: &Reservation) -> Result<(), StoreError> {
        let mut reservations = self.reservations.write().await;
        if !reservations.contains_key(&reservation.id) {
            return Err(StoreError::ReservationNotFound(reservation.id));
        }
        reservations.insert(reservation.id, reservation.clone());
        Ok(())
    }

    async fn list_by_holder(&self, holder_id: &str) -> Result<Vec<Reservation>, StoreError> {
        Ok(self
            .reservations
            .read()
            .await
            .values()
            .filter(|r| r.holder_id == holder_id)
            .cloned()
            .collect())
    }

    async fn exists_for_screening(&self, screening_id: Uuid) -> Result<bool, StoreError> {
        Ok(self
            .reservations
            .read()
            .await
            .values()
            .any(|r| r.screening_id == screening_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use marquee_domain::{
        ClassMultipliers, InventoryError, RowTemplate, SeatClass, SeatInventory, SeatTemplate,
    };

    fn screening() -> Screening {
        let template = SeatTemplate::new(vec![RowTemplate {
            label: "A".to_string(),
            seats: 4,
            class: SeatClass::Regular,
        }]);
        let seats =
            SeatInventory::materialize(&template, 1000, &ClassMultipliers::default()).unwrap();
        let now = Utc::now();
        Screening::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            now + Duration::hours(24),
            now + Duration::hours(26),
            1000,
            "USD".to_string(),
            seats,
            now,
        )
    }

    #[tokio::test]
    async fn test_insert_and_get_screening() {
        let store = MemoryStore::new();
        let screening = screening();
        ScreeningStore::insert(&store, &screening).await.unwrap();

        let loaded = ScreeningStore::get(&store, screening.id).await.unwrap();
        assert_eq!(loaded.id, screening.id);
        assert_eq!(loaded.seats.len(), 4);

        let missing = ScreeningStore::get(&store, Uuid::new_v4()).await;
        assert!(matches!(missing, Err(StoreError::ScreeningNotFound(_))));
    }

    #[tokio::test]
    async fn test_concurrent_overlapping_claims_one_succeeds() {
        let store = Arc::new(MemoryStore::new());
        let screening = screening();
        ScreeningStore::insert(store.as_ref(), &screening)
            .await
            .unwrap();

        let contested = vec![SeatKey::new("A", 1), SeatKey::new("A", 2)];
        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            let keys = contested.clone();
            let id = screening.id;
            handles.push(tokio::spawn(async move {
                store.claim_seats(id, &keys, Uuid::new_v4()).await
            }));
        }

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);

        let snapshot = store.seat_snapshot(screening.id).await.unwrap();
        assert_eq!(snapshot.iter().filter(|s| !s.available).count(), 2);
    }

    #[tokio::test]
    async fn test_claim_then_release_round_trip() {
        let store = MemoryStore::new();
        let screening = screening();
        ScreeningStore::insert(&store, &screening).await.unwrap();

        let keys = vec![SeatKey::new("A", 3)];
        let reservation_id = Uuid::new_v4();
        let captured = store
            .claim_seats(screening.id, &keys, reservation_id)
            .await
            .unwrap();
        assert_eq!(captured[0].price_cents, 1000);

        let err = store
            .claim_seats(screening.id, &keys, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Seats(InventoryError::SeatUnavailable { .. })
        ));

        store.release_seats(screening.id, &keys).await.unwrap();
        store
            .claim_seats(screening.id, &keys, Uuid::new_v4())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_update_missing_reservation_fails() {
        let store = MemoryStore::new();
        let screening = screening();
        let reservation = Reservation::new(
            Uuid::new_v4(),
            screening.id,
            "user-1".to_string(),
            vec![],
            "USD".to_string(),
            "CARD".to_string(),
            marquee_domain::ContactInfo {
                email: "user@example.com".to_string(),
                phone: None,
            },
            Utc::now(),
        );

        assert!(matches!(
            store.update(&reservation).await,
            Err(StoreError::ReservationNotFound(_))
        ));

        ReservationStore::insert(&store, &reservation).await.unwrap();
        assert!(store.update(&reservation).await.is_ok());
        assert!(store.exists_for_screening(screening.id).await.unwrap());
        assert_eq!(store.list_by_holder("user-1").await.unwrap().len(), 1);
    }
}
