use async_trait::async_trait;
use chrono::{DateTime, Utc};
use marquee_domain::{Reservation, ReservationStore, StoreError};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

pub struct PgReservationStore {
    pool: PgPool,
}

impl PgReservationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, StoreError> {
    serde_json::to_value(value).map_err(|e| StoreError::Backend(e.to_string()))
}

#[derive(sqlx::FromRow)]
struct ReservationRow {
    id: Uuid,
    screening_id: Uuid,
    holder_id: String,
    seats: Value,
    total_cents: i32,
    currency: String,
    payment: Value,
    contact: Value,
    status: String,
    confirmed_at: Option<DateTime<Utc>>,
    checked_in_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    cancellation_reason: Option<String>,
    refund_cents: Option<i32>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ReservationRow {
    fn into_reservation(self) -> Result<Reservation, StoreError> {
        Ok(Reservation {
            id: self.id,
            screening_id: self.screening_id,
            holder_id: self.holder_id,
            seats: serde_json::from_value(self.seats)
                .map_err(|e| StoreError::Backend(e.to_string()))?,
            total_cents: self.total_cents,
            currency: self.currency,
            payment: serde_json::from_value(self.payment)
                .map_err(|e| StoreError::Backend(e.to_string()))?,
            contact: serde_json::from_value(self.contact)
                .map_err(|e| StoreError::Backend(e.to_string()))?,
            status: self.status.parse().map_err(StoreError::Backend)?,
            confirmed_at: self.confirmed_at,
            checked_in_at: self.checked_in_at,
            cancelled_at: self.cancelled_at,
            cancellation_reason: self.cancellation_reason,
            refund_cents: self.refund_cents,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, screening_id, holder_id, seats, total_cents, currency, payment, contact,
           status, confirmed_at, checked_in_at, cancelled_at, cancellation_reason,
           refund_cents, created_at, updated_at
    FROM reservations
"#;

#[async_trait]
impl ReservationStore for PgReservationStore {
    async fn insert(&self, reservation: &Reservation) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO reservations (id, screening_id, holder_id, seats, total_cents, currency,
                                      payment, contact, status, confirmed_at, checked_in_at,
                                      cancelled_at, cancellation_reason, refund_cents, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(reservation.id)
        .bind(reservation.screening_id)
        .bind(&reservation.holder_id)
        .bind(to_json(&reservation.seats)?)
        .bind(reservation.total_cents)
        .bind(&reservation.currency)
        .bind(to_json(&reservation.payment)?)
        .bind(to_json(&reservation.contact)?)
        .bind(reservation.status.as_str())
        .bind(reservation.confirmed_at)
        .bind(reservation.checked_in_at)
        .bind(reservation.cancelled_at)
        .bind(&reservation.cancellation_reason)
        .bind(reservation.refund_cents)
        .bind(reservation.created_at)
        .bind(reservation.updated_at)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Reservation, StoreError> {
        let row = sqlx::query_as::<_, ReservationRow>(&format!("{SELECT_COLUMNS} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .ok_or(StoreError::ReservationNotFound(id))?;
        row.into_reservation()
    }

    async fn update(&self, reservation: &Reservation) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE reservations
            SET status = $2, payment = $3, confirmed_at = $4, checked_in_at = $5,
                cancelled_at = $6, cancellation_reason = $7, refund_cents = $8, updated_at = $9
            WHERE id = $1
            "#,
        )
        .bind(reservation.id)
        .bind(reservation.status.as_str())
        .bind(to_json(&reservation.payment)?)
        .bind(reservation.confirmed_at)
        .bind(reservation.checked_in_at)
        .bind(reservation.cancelled_at)
        .bind(&reservation.cancellation_reason)
        .bind(reservation.refund_cents)
        .bind(reservation.updated_at)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::ReservationNotFound(reservation.id));
        }
        Ok(())
    }

    async fn list_by_holder(&self, holder_id: &str) -> Result<Vec<Reservation>, StoreError> {
        let rows = sqlx::query_as::<_, ReservationRow>(&format!(
            "{SELECT_COLUMNS} WHERE holder_id = $1 ORDER BY created_at DESC"
        ))
        .bind(holder_id)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.into_iter().map(ReservationRow::into_reservation).collect()
    }

    async fn exists_for_screening(&self, screening_id: Uuid) -> Result<bool, StoreError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM reservations WHERE screening_id = $1)",
        )
        .bind(screening_id)
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;
        Ok(exists)
    }
}
