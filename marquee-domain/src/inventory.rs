use crate::reservation::ReservedSeat;
use crate::seat::{ClassMultipliers, Seat, SeatClaim, SeatClass, SeatKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Layout template used to materialize a screening's inventory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatTemplate {
    pub rows: Vec<RowTemplate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowTemplate {
    pub label: String,
    pub seats: u32,
    pub class: SeatClass,
}

impl SeatTemplate {
    pub fn new(rows: Vec<RowTemplate>) -> Self {
        Self { rows }
    }
}

/// Read-only availability view of one seat, for seat-map display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatView {
    pub key: SeatKey,
    pub class: SeatClass,
    pub price_cents: i32,
    pub available: bool,
}

/// Authoritative seat-availability state for one screening.
///
/// The key set is fixed at materialization and never grows or shrinks; only
/// the availability flags and claim bindings change. Claiming is
/// all-or-nothing, releasing is idempotent. Serialization of claim attempts
/// is the owning store's job; this type assumes it is mutated by one caller
/// at a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatInventory {
    seats: Vec<Seat>,
}

impl SeatInventory {
    /// Build the fixed seat set from a template, deriving per-seat prices
    /// from the base price and class multipliers.
    pub fn materialize(
        template: &SeatTemplate,
        base_price_cents: i32,
        multipliers: &ClassMultipliers,
    ) -> Result<Self, InventoryError> {
        let mut seats: Vec<Seat> = Vec::new();
        for row in &template.rows {
            for number in 1..=row.seats {
                let key = SeatKey::new(row.label.clone(), number);
                if seats.iter().any(|s| s.key == key) {
                    return Err(InventoryError::DuplicateSeat(key));
                }
                seats.push(Seat {
                    key,
                    class: row.class,
                    price_cents: multipliers.price_cents(row.class, base_price_cents),
                    available: true,
                    claim: None,
                });
            }
        }
        if seats.is_empty() {
            return Err(InventoryError::EmptyTemplate);
        }
        Ok(Self { seats })
    }

    /// Rehydrate an inventory from stored seat records, enforcing the
    /// unique-key and non-empty invariants.
    pub fn from_seats(seats: Vec<Seat>) -> Result<Self, InventoryError> {
        if seats.is_empty() {
            return Err(InventoryError::EmptyTemplate);
        }
        for (idx, seat) in seats.iter().enumerate() {
            if seats[..idx].iter().any(|s| s.key == seat.key) {
                return Err(InventoryError::DuplicateSeat(seat.key.clone()));
            }
        }
        Ok(Self { seats })
    }

    pub fn seat(&self, key: &SeatKey) -> Option<&Seat> {
        self.seats.iter().find(|s| &s.key == key)
    }

    /// Claim the given seats for a reservation, all-or-nothing.
    ///
    /// If any requested seat is unavailable or unknown the whole call fails,
    /// naming every offending key, and no seat state changes. On success all
    /// requested seats flip unavailable together with their claim records and
    /// the captured class/price of each seat is returned.
    pub fn claim(
        &mut self,
        keys: &[SeatKey],
        reservation_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<ReservedSeat>, InventoryError> {
        let mut requested: Vec<&SeatKey> = Vec::new();
        for key in keys {
            if !requested.contains(&key) {
                requested.push(key);
            }
        }

        let mut indices = Vec::with_capacity(requested.len());
        let mut offending = Vec::new();
        for &key in &requested {
            match self.seats.iter().position(|s| &s.key == key) {
                Some(idx) if self.seats[idx].available => indices.push(idx),
                _ => offending.push(key.clone()),
            }
        }
        if !offending.is_empty() {
            return Err(InventoryError::SeatUnavailable { seats: offending });
        }

        let mut captured = Vec::with_capacity(indices.len());
        for idx in indices {
            let seat = &mut self.seats[idx];
            seat.available = false;
            seat.claim = Some(SeatClaim {
                reservation_id,
                claimed_at: now,
            });
            captured.push(ReservedSeat {
                key: seat.key.clone(),
                class: seat.class,
                price_cents: seat.price_cents,
            });
        }
        Ok(captured)
    }

    /// Release the given seats back to available and drop their claims.
    /// Releasing an already-available or unknown seat is a no-op.
    pub fn release(&mut self, keys: &[SeatKey]) {
        for key in keys {
            if let Some(seat) = self.seats.iter_mut().find(|s| &s.key == key) {
                seat.available = true;
                seat.claim = None;
            }
        }
    }

    pub fn price_for(&self, key: &SeatKey) -> Result<i32, InventoryError> {
        self.seat(key)
            .map(|s| s.price_cents)
            .ok_or_else(|| InventoryError::SeatNotFound(key.clone()))
    }

    /// Best-effort availability snapshot for seat-map display.
    pub fn snapshot(&self) -> Vec<SeatView> {
        self.seats
            .iter()
            .map(|s| SeatView {
                key: s.key.clone(),
                class: s.class,
                price_cents: s.price_cents,
                available: s.available,
            })
            .collect()
    }

    pub fn keys(&self) -> Vec<SeatKey> {
        self.seats.iter().map(|s| s.key.clone()).collect()
    }

    pub fn has_claims(&self) -> bool {
        self.seats.iter().any(|s| s.claim.is_some())
    }

    pub fn claimed_count(&self) -> usize {
        self.seats.iter().filter(|s| s.claim.is_some()).count()
    }

    pub fn len(&self) -> usize {
        self.seats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    #[error("Seats unavailable: {}", .seats.iter().map(|k| k.to_string()).collect::<Vec<_>>().join(", "))]
    SeatUnavailable { seats: Vec<SeatKey> },

    #[error("Seat not found: {0}")]
    SeatNotFound(SeatKey),

    #[error("Duplicate seat in template: {0}")]
    DuplicateSeat(SeatKey),

    #[error("Seat template has no seats")]
    EmptyTemplate,
}
