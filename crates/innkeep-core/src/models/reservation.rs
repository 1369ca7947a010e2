//! Reservation models and lifecycle primitives
//!
//! A reservation owns its room assignments, room-type requests, article
//! lines, and an append-only status log. The status set is a flat enum:
//! any recognized status may be set from any other; only unrecognized
//! values are rejected. Cancelled/no-show release rooms.

use crate::models::article::ChargeScheme;
use crate::models::room::RoomStatus;
use crate::{AppError, AppResult};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Reservation status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    /// Initial state before confirmation
    #[default]
    Tentative,
    /// Confirmed booking
    Confirmed,
    /// Guest has arrived
    CheckedIn,
    /// Stay is fully paid
    Paid,
    /// Guest has departed
    CheckedOut,
    /// Booking was cancelled; rooms released
    Cancelled,
    /// Guest never arrived; rooms released
    NoShow,
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReservationStatus::Tentative => write!(f, "tentative"),
            ReservationStatus::Confirmed => write!(f, "confirmed"),
            ReservationStatus::CheckedIn => write!(f, "checked_in"),
            ReservationStatus::Paid => write!(f, "paid"),
            ReservationStatus::CheckedOut => write!(f, "checked_out"),
            ReservationStatus::Cancelled => write!(f, "cancelled"),
            ReservationStatus::NoShow => write!(f, "no_show"),
        }
    }
}

impl ReservationStatus {
    /// Parse from string; returns None for unrecognized values
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "tentative" => Some(ReservationStatus::Tentative),
            "confirmed" => Some(ReservationStatus::Confirmed),
            "checked_in" => Some(ReservationStatus::CheckedIn),
            "paid" => Some(ReservationStatus::Paid),
            "checked_out" => Some(ReservationStatus::CheckedOut),
            "cancelled" => Some(ReservationStatus::Cancelled),
            "no_show" => Some(ReservationStatus::NoShow),
            _ => None,
        }
    }

    /// Parse from string, rejecting unknown values
    pub fn parse(s: &str) -> AppResult<Self> {
        Self::from_str(s).ok_or_else(|| AppError::InvalidStatus(s.to_string()))
    }

    /// Whether this status still blocks the assigned rooms for other
    /// bookings. Cancelled and no-show reservations release their rooms.
    pub fn blocks_rooms(&self) -> bool {
        !matches!(self, ReservationStatus::Cancelled | ReservationStatus::NoShow)
    }

    /// Room status side-effect of entering this status, if any.
    ///
    /// checked_in/paid occupy the rooms, checked_out sends them to
    /// cleaning, cancelled/no_show return them to available. Confirmed
    /// and tentative leave rooms untouched.
    pub fn room_status_effect(&self) -> Option<RoomStatus> {
        match self {
            ReservationStatus::CheckedIn | ReservationStatus::Paid => Some(RoomStatus::Occupied),
            ReservationStatus::CheckedOut => Some(RoomStatus::InCleaning),
            ReservationStatus::Cancelled | ReservationStatus::NoShow => {
                Some(RoomStatus::Available)
            }
            ReservationStatus::Tentative | ReservationStatus::Confirmed => None,
        }
    }
}

/// Reservation entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    /// Unique identifier
    pub id: Uuid,

    /// Externally shown unique reservation identifier, sequence-generated
    pub confirmation_number: String,

    /// Booking guest
    pub guest_id: Uuid,

    /// Current status
    pub status: ReservationStatus,

    /// Arrival day
    pub check_in_date: NaiveDate,

    /// Departure day (exclusive for night counting)
    pub check_out_date: NaiveDate,

    /// Adult guests
    pub adults: i32,

    /// Child guests
    pub children: i32,

    /// Applied rate plan, if any
    pub rate_plan_id: Option<Uuid>,

    /// Total stay amount, if priced
    pub total_amount: Option<Decimal>,

    /// Reservation currency (ISO 4217)
    pub currency: String,

    /// Free-form notes
    pub notes: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    /// Number of nights in the stay (checkout minus checkin, >= 0)
    pub fn nights(&self) -> i64 {
        (self.check_out_date - self.check_in_date).num_days().max(0)
    }

    /// Total guest count, individual counts clamped at zero
    pub fn guest_count(&self) -> i32 {
        self.adults.max(0) + self.children.max(0)
    }
}

/// Validate a stay date range: check-in strictly before check-out
pub fn validate_stay_dates(check_in: NaiveDate, check_out: NaiveDate) -> AppResult<()> {
    if check_in >= check_out {
        return Err(AppError::Validation(format!(
            "check-in date {} must be before check-out date {}",
            check_in, check_out
        )));
    }
    Ok(())
}

/// Half-open interval overlap test for `[a_in, a_out)` vs `[b_in, b_out)`.
///
/// Back-to-back stays (one checks out the day the other checks in) do
/// not overlap.
pub fn ranges_overlap(
    a_in: NaiveDate,
    a_out: NaiveDate,
    b_in: NaiveDate,
    b_out: NaiveDate,
) -> bool {
    !(a_out <= b_in || a_in >= b_out)
}

/// Normalize a currency code to 3-letter uppercase, rejecting anything else
pub fn normalize_currency(code: &str) -> AppResult<String> {
    let trimmed = code.trim().to_uppercase();
    if trimmed.len() != 3 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(AppError::Validation(format!(
            "invalid currency code: {code}"
        )));
    }
    Ok(trimmed)
}

/// Normalized room selection input
///
/// The API accepts either raw room ids or objects with per-room rate and
/// currency overrides; both forms normalize to this struct before any
/// business logic runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomSelection {
    /// Selected room
    pub room_id: Uuid,

    /// Explicit nightly rate override
    pub nightly_rate: Option<Decimal>,

    /// Explicit currency override
    pub currency: Option<String>,
}

impl RoomSelection {
    /// Selection by bare room id
    pub fn by_id(room_id: Uuid) -> Self {
        Self {
            room_id,
            nightly_rate: None,
            currency: None,
        }
    }
}

/// A concrete room assigned to a reservation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationRoom {
    /// Unique identifier
    pub id: Uuid,

    /// Owning reservation
    pub reservation_id: Uuid,

    /// Assigned room
    pub room_id: Uuid,

    /// Resolved nightly rate
    pub nightly_rate: Option<Decimal>,

    /// Resolved currency
    pub currency: String,
}

/// A room-type request line (N units of a type, not yet concrete rooms)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomTypeRequest {
    /// Unique identifier
    pub id: Uuid,

    /// Owning reservation
    pub reservation_id: Uuid,

    /// Requested room type
    pub room_type_id: Uuid,

    /// Number of units requested
    pub quantity: i32,
}

/// An article line attached to a reservation
///
/// Stores the scheme/multiplier/unit price it was computed with so the
/// line can be re-derived when dates, guests, or rooms change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationArticle {
    /// Unique identifier
    pub id: Uuid,

    /// Owning reservation
    pub reservation_id: Uuid,

    /// Source article
    pub article_id: Uuid,

    /// Snapshotted description
    pub description: String,

    /// Charge scheme the quantity was derived with
    pub charge_scheme: ChargeScheme,

    /// Price per billable unit
    pub unit_price: Decimal,

    /// Tax rate in percent
    pub tax_rate: Decimal,

    /// Quantity multiplier; <= 0 zeroes the line
    pub multiplier: Decimal,

    /// Derived billable quantity
    pub quantity: Decimal,

    /// Derived line total (quantity x unit price, before tax)
    pub total: Decimal,
}

impl ReservationArticle {
    /// Re-derive quantity and total from the stored scheme, multiplier,
    /// and unit price against the current stay shape.
    pub fn recalculate(&mut self, nights: i64, guests: i32, rooms: i64) {
        self.quantity = self
            .charge_scheme
            .billable_quantity(nights, guests, rooms, self.multiplier);
        self.total = self.quantity * self.unit_price;
    }
}

/// Append-only status audit entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusLogEntry {
    /// Unique identifier
    pub id: Uuid,

    /// Owning reservation
    pub reservation_id: Uuid,

    /// Status that was entered
    pub status: ReservationStatus,

    /// Optional transition notes
    pub notes: Option<String>,

    /// Actor who recorded the transition
    pub recorded_by: Option<String>,

    /// Transition timestamp
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_status_roundtrip() {
        for s in [
            "tentative",
            "confirmed",
            "checked_in",
            "paid",
            "checked_out",
            "cancelled",
            "no_show",
        ] {
            let parsed = ReservationStatus::parse(s).unwrap();
            assert_eq!(parsed.to_string(), s);
        }
        assert!(ReservationStatus::parse("archived").is_err());
    }

    #[test]
    fn test_room_side_effects() {
        assert_eq!(
            ReservationStatus::CheckedIn.room_status_effect(),
            Some(RoomStatus::Occupied)
        );
        assert_eq!(
            ReservationStatus::Paid.room_status_effect(),
            Some(RoomStatus::Occupied)
        );
        assert_eq!(
            ReservationStatus::CheckedOut.room_status_effect(),
            Some(RoomStatus::InCleaning)
        );
        assert_eq!(
            ReservationStatus::Cancelled.room_status_effect(),
            Some(RoomStatus::Available)
        );
        assert_eq!(ReservationStatus::Confirmed.room_status_effect(), None);
        assert_eq!(ReservationStatus::Tentative.room_status_effect(), None);
    }

    #[test]
    fn test_blocks_rooms() {
        assert!(ReservationStatus::Confirmed.blocks_rooms());
        assert!(ReservationStatus::CheckedIn.blocks_rooms());
        assert!(!ReservationStatus::Cancelled.blocks_rooms());
        assert!(!ReservationStatus::NoShow.blocks_rooms());
    }

    #[test]
    fn test_overlap_half_open() {
        // R1: 06-01..06-05, R2: 06-04..06-06 -> overlap
        assert!(ranges_overlap(
            d(2024, 6, 1),
            d(2024, 6, 5),
            d(2024, 6, 4),
            d(2024, 6, 6)
        ));
        // Back-to-back: checkout day equals checkin day -> no overlap
        assert!(!ranges_overlap(
            d(2024, 6, 1),
            d(2024, 6, 5),
            d(2024, 6, 5),
            d(2024, 6, 8)
        ));
        // Disjoint
        assert!(!ranges_overlap(
            d(2024, 6, 1),
            d(2024, 6, 3),
            d(2024, 6, 10),
            d(2024, 6, 12)
        ));
        // Containment
        assert!(ranges_overlap(
            d(2024, 6, 1),
            d(2024, 6, 10),
            d(2024, 6, 4),
            d(2024, 6, 5)
        ));
    }

    #[test]
    fn test_stay_date_validation() {
        assert!(validate_stay_dates(d(2024, 6, 1), d(2024, 6, 2)).is_ok());
        assert!(validate_stay_dates(d(2024, 6, 2), d(2024, 6, 2)).is_err());
        assert!(validate_stay_dates(d(2024, 6, 3), d(2024, 6, 2)).is_err());
    }

    #[test]
    fn test_normalize_currency() {
        assert_eq!(normalize_currency(" eur ").unwrap(), "EUR");
        assert_eq!(normalize_currency("usd").unwrap(), "USD");
        assert!(normalize_currency("EURO").is_err());
        assert!(normalize_currency("E1").is_err());
        assert!(normalize_currency("").is_err());
    }

    #[test]
    fn test_article_recalculation() {
        let mut line = ReservationArticle {
            id: Uuid::new_v4(),
            reservation_id: Uuid::new_v4(),
            article_id: Uuid::new_v4(),
            description: "Breakfast".to_string(),
            charge_scheme: ChargeScheme::PerPersonPerDay,
            unit_price: dec!(15.00),
            tax_rate: dec!(7),
            multiplier: Decimal::ONE,
            quantity: Decimal::ZERO,
            total: Decimal::ZERO,
        };

        line.recalculate(3, 2, 1);
        assert_eq!(line.quantity, dec!(6));
        assert_eq!(line.total, dec!(90.00));

        // Guest count change reflects without re-supplying the article
        line.recalculate(3, 3, 1);
        assert_eq!(line.quantity, dec!(9));
        assert_eq!(line.total, dec!(135.00));

        // Zero multiplier zeroes the line instead of removing it
        line.multiplier = Decimal::ZERO;
        line.recalculate(3, 3, 1);
        assert_eq!(line.quantity, Decimal::ZERO);
        assert_eq!(line.total, Decimal::ZERO);
    }

    #[test]
    fn test_nights_and_guest_count() {
        let now = Utc::now();
        let res = Reservation {
            id: Uuid::new_v4(),
            confirmation_number: "RES-001001".to_string(),
            guest_id: Uuid::new_v4(),
            status: ReservationStatus::Confirmed,
            check_in_date: d(2024, 6, 1),
            check_out_date: d(2024, 6, 4),
            adults: 2,
            children: -1,
            rate_plan_id: None,
            total_amount: None,
            currency: "EUR".to_string(),
            notes: None,
            created_at: now,
            updated_at: now,
        };

        assert_eq!(res.nights(), 3);
        // Negative child count clamps to zero
        assert_eq!(res.guest_count(), 2);
    }
}
