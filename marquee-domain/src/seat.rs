use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Identifies one physical seat within a screening: row label plus seat number.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SeatKey {
    pub row: String,
    pub number: u32,
}

impl SeatKey {
    pub fn new(row: impl Into<String>, number: u32) -> Self {
        Self {
            row: row.into(),
            number,
        }
    }
}

impl fmt::Display for SeatKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.row, self.number)
    }
}

impl FromStr for SeatKey {
    type Err = String;

    /// Parses labels like "A1" or "AA12" (row letters followed by the seat number).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let split = s.find(|c: char| c.is_ascii_digit());
        match split {
            Some(idx) if idx > 0 => {
                let (row, num) = s.split_at(idx);
                let number = num
                    .parse::<u32>()
                    .map_err(|_| format!("Invalid seat number in label: {}", s))?;
                Ok(SeatKey::new(row, number))
            }
            _ => Err(format!("Invalid seat label: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatClass {
    Regular,
    Premium,
    Vip,
}

impl SeatClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeatClass::Regular => "REGULAR",
            SeatClass::Premium => "PREMIUM",
            SeatClass::Vip => "VIP",
        }
    }
}

impl fmt::Display for SeatClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SeatClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "REGULAR" => Ok(SeatClass::Regular),
            "PREMIUM" => Ok(SeatClass::Premium),
            "VIP" => Ok(SeatClass::Vip),
            other => Err(format!("Unknown seat class: {}", other)),
        }
    }
}

/// Price multipliers per seat class. Defaults come from the catalog
/// collaborator; the engine only applies them when inventory is materialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassMultipliers {
    #[serde(default = "default_regular")]
    pub regular: f64,
    #[serde(default = "default_premium")]
    pub premium: f64,
    #[serde(default = "default_vip")]
    pub vip: f64,
}

fn default_regular() -> f64 {
    1.0
}
fn default_premium() -> f64 {
    1.5
}
fn default_vip() -> f64 {
    2.0
}

impl Default for ClassMultipliers {
    fn default() -> Self {
        Self {
            regular: default_regular(),
            premium: default_premium(),
            vip: default_vip(),
        }
    }
}

impl ClassMultipliers {
    /// Derive a seat price from the screening base price, rounded to whole cents.
    pub fn price_cents(&self, class: SeatClass, base_price_cents: i32) -> i32 {
        let multiplier = match class {
            SeatClass::Regular => self.regular,
            SeatClass::Premium => self.premium,
            SeatClass::Vip => self.vip,
        };
        (base_price_cents as f64 * multiplier).round() as i32
    }
}

/// Binding of a seat to the reservation holding it. Exists only while the
/// owning reservation is in a non-released state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeatClaim {
    pub reservation_id: Uuid,
    pub claimed_at: DateTime<Utc>,
}

/// One seat record in a screening's inventory. The `available` flag is the
/// single source of truth for whether the seat may be claimed; it flips
/// together with `claim` and never independently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Seat {
    pub key: SeatKey,
    pub class: SeatClass,
    pub price_cents: i32,
    pub available: bool,
    pub claim: Option<SeatClaim>,
}
