use async_trait::async_trait;
use chrono::{DateTime, Utc};
use marquee_domain::{
    InventoryError, ReservedSeat, Screening, ScreeningStore, ScreeningStatus, Seat, SeatClaim,
    SeatInventory, SeatKey, SeatView, StoreError,
};
use sqlx::PgPool;
use std::collections::HashSet;
use uuid::Uuid;

/// Postgres adapter for screenings and their seat arenas.
///
/// The claim is a single conditional UPDATE (`... AND is_available = TRUE`)
/// inside a transaction, rolled back unless every requested row flipped.
/// Claim-if-available means concurrent claims over intersecting seat sets
/// serialize on the database rows themselves.
pub struct PgScreeningStore {
    pool: PgPool,
}

impl PgScreeningStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_seats(&self, screening_id: Uuid) -> Result<Vec<Seat>, StoreError> {
        let rows = sqlx::query_as::<_, SeatRow>(
            r#"
            SELECT row_label, seat_number, seat_class, price_cents, is_available, reservation_id, claimed_at
            FROM screening_seats
            WHERE screening_id = $1
            ORDER BY row_label, seat_number
            "#,
        )
        .bind(screening_id)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.into_iter().map(SeatRow::into_seat).collect()
    }

    async fn load_screening(&self, row: ScreeningRow) -> Result<Screening, StoreError> {
        let id = row.id;
        let seats = self.load_seats(id).await?;
        row.into_screening(SeatInventory::from_seats(seats)?)
    }
}

fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

#[derive(sqlx::FromRow)]
struct ScreeningRow {
    id: Uuid,
    theater_id: Uuid,
    movie_id: Uuid,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    base_price_cents: i32,
    currency: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ScreeningRow {
    fn into_screening(self, seats: SeatInventory) -> Result<Screening, StoreError> {
        Ok(Screening {
            id: self.id,
            theater_id: self.theater_id,
            movie_id: self.movie_id,
            starts_at: self.starts_at,
            ends_at: self.ends_at,
            base_price_cents: self.base_price_cents,
            currency: self.currency,
            status: self.status.parse().map_err(StoreError::Backend)?,
            seats,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SeatRow {
    row_label: String,
    seat_number: i32,
    seat_class: String,
    price_cents: i32,
    is_available: bool,
    reservation_id: Option<Uuid>,
    claimed_at: Option<DateTime<Utc>>,
}

impl SeatRow {
    fn into_seat(self) -> Result<Seat, StoreError> {
        let claim = match (self.reservation_id, self.claimed_at) {
            (Some(reservation_id), Some(claimed_at)) => Some(SeatClaim {
                reservation_id,
                claimed_at,
            }),
            _ => None,
        };
        Ok(Seat {
            key: SeatKey::new(self.row_label, self.seat_number as u32),
            class: self.seat_class.parse().map_err(StoreError::Backend)?,
            price_cents: self.price_cents,
            available: self.is_available,
            claim,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ClaimedRow {
    label: String,
    row_label: String,
    seat_number: i32,
    seat_class: String,
    price_cents: i32,
}

#[async_trait]
impl ScreeningStore for PgScreeningStore {
    async fn insert(&self, screening: &Screening) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        sqlx::query(
            r#"
            INSERT INTO screenings (id, theater_id, movie_id, starts_at, ends_at, base_price_cents, currency, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(screening.id)
        .bind(screening.theater_id)
        .bind(screening.movie_id)
        .bind(screening.starts_at)
        .bind(screening.ends_at)
        .bind(screening.base_price_cents)
        .bind(&screening.currency)
        .bind(screening.status.as_str())
        .bind(screening.created_at)
        .bind(screening.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(backend)?;

        for seat in screening.seats.snapshot() {
            sqlx::query(
                r#"
                INSERT INTO screening_seats (screening_id, label, row_label, seat_number, seat_class, price_cents, is_available)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(screening.id)
            .bind(seat.key.to_string())
            .bind(&seat.key.row)
            .bind(seat.key.number as i32)
            .bind(seat.class.as_str())
            .bind(seat.price_cents)
            .bind(seat.available)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        }

        tx.commit().await.map_err(backend)
    }

    async fn get(&self, id: Uuid) -> Result<Screening, StoreError> {
        let row = sqlx::query_as::<_, ScreeningRow>(
            r#"
            SELECT id, theater_id, movie_id, starts_at, ends_at, base_price_cents, currency, status, created_at, updated_at
            FROM screenings
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?
        .ok_or(StoreError::ScreeningNotFound(id))?;

        self.load_screening(row).await
    }

    async fn list_by_theater(&self, theater_id: Uuid) -> Result<Vec<Screening>, StoreError> {
        let rows = sqlx::query_as::<_, ScreeningRow>(
            r#"
            SELECT id, theater_id, movie_id, starts_at, ends_at, base_price_cents, currency, status, created_at, updated_at
            FROM screenings
            WHERE theater_id = $1
            ORDER BY starts_at
            "#,
        )
        .bind(theater_id)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        let mut screenings = Vec::with_capacity(rows.len());
        for row in rows {
            screenings.push(self.load_screening(row).await?);
        }
        Ok(screenings)
    }

    async fn set_status(&self, id: Uuid, status: ScreeningStatus) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE screenings SET status = $2, updated_at = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(status.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::ScreeningNotFound(id));
        }
        Ok(())
    }

    async fn reschedule(
        &self,
        id: Uuid,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE screenings SET starts_at = $2, ends_at = $3, updated_at = $4 WHERE id = $1",
        )
        .bind(id)
        .bind(starts_at)
        .bind(ends_at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::ScreeningNotFound(id));
        }
        Ok(())
    }

    async fn claim_seats(
        &self,
        id: Uuid,
        keys: &[SeatKey],
        reservation_id: Uuid,
    ) -> Result<Vec<ReservedSeat>, StoreError> {
        let mut labels: Vec<String> = Vec::new();
        for key in keys {
            let label = key.to_string();
            if !labels.contains(&label) {
                labels.push(label);
            }
        }

        let mut tx = self.pool.begin().await.map_err(backend)?;
        let claimed = sqlx::query_as::<_, ClaimedRow>(
            r#"
            UPDATE screening_seats
            SET is_available = FALSE, reservation_id = $2, claimed_at = $3
            WHERE screening_id = $1 AND label = ANY($4) AND is_available = TRUE
            RETURNING label, row_label, seat_number, seat_class, price_cents
            "#,
        )
        .bind(id)
        .bind(reservation_id)
        .bind(Utc::now())
        .bind(&labels)
        .fetch_all(&mut *tx)
        .await
        .map_err(backend)?;

        if claimed.len() != labels.len() {
            // All-or-nothing: some requested seat was unavailable or unknown.
            tx.rollback().await.map_err(backend)?;
            let flipped: HashSet<&str> = claimed.iter().map(|r| r.label.as_str()).collect();
            let offending: Vec<SeatKey> = keys
                .iter()
                .filter(|k| !flipped.contains(k.to_string().as_str()))
                .cloned()
                .collect();
            return Err(StoreError::Seats(InventoryError::SeatUnavailable {
                seats: offending,
            }));
        }
        tx.commit().await.map_err(backend)?;

        claimed
            .into_iter()
            .map(|row| {
                Ok(ReservedSeat {
                    key: SeatKey::new(row.row_label, row.seat_number as u32),
                    class: row.seat_class.parse().map_err(StoreError::Backend)?,
                    price_cents: row.price_cents,
                })
            })
            .collect()
    }

    async fn release_seats(&self, id: Uuid, keys: &[SeatKey]) -> Result<(), StoreError> {
        let labels: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
        sqlx::query(
            r#"
            UPDATE screening_seats
            SET is_available = TRUE, reservation_id = NULL, claimed_at = NULL
            WHERE screening_id = $1 AND label = ANY($2)
            "#,
        )
        .bind(id)
        .bind(&labels)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn seat_snapshot(&self, id: Uuid) -> Result<Vec<SeatView>, StoreError> {
        let seats = self.load_seats(id).await?;
        if seats.is_empty() {
            return Err(StoreError::ScreeningNotFound(id));
        }
        Ok(seats
            .into_iter()
            .map(|s| SeatView {
                key: s.key,
                class: s.class,
                price_cents: s.price_cents,
                available: s.available,
            })
            .collect())
    }
}
