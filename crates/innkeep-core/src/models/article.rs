//! Article (add-on service) models and pricing
//!
//! Articles are billable extras (breakfast, parking, spa access) whose
//! billable quantity scales with the stay according to a charge scheme.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// How an article's billable quantity scales with the stay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChargeScheme {
    /// guests x nights
    PerPersonPerDay,
    /// rooms x nights
    PerRoomPerDay,
    /// once per stay
    #[default]
    PerStay,
    /// once per guest
    PerPerson,
    /// once per night
    PerDay,
}

impl fmt::Display for ChargeScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChargeScheme::PerPersonPerDay => write!(f, "per_person_per_day"),
            ChargeScheme::PerRoomPerDay => write!(f, "per_room_per_day"),
            ChargeScheme::PerStay => write!(f, "per_stay"),
            ChargeScheme::PerPerson => write!(f, "per_person"),
            ChargeScheme::PerDay => write!(f, "per_day"),
        }
    }
}

impl ChargeScheme {
    /// Parse from string; unknown values yield `None`
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "per_person_per_day" => Some(ChargeScheme::PerPersonPerDay),
            "per_room_per_day" => Some(ChargeScheme::PerRoomPerDay),
            "per_stay" => Some(ChargeScheme::PerStay),
            "per_person" => Some(ChargeScheme::PerPerson),
            "per_day" => Some(ChargeScheme::PerDay),
            _ => None,
        }
    }

    /// Compute the billable quantity for a stay.
    ///
    /// Inputs are clamped at zero; the result is the scheme's base count
    /// multiplied by `multiplier` and floored at zero. A multiplier of
    /// zero suppresses the line (quantity 0) without removing it.
    pub fn billable_quantity(
        &self,
        nights: i64,
        guests: i32,
        rooms: i64,
        multiplier: Decimal,
    ) -> Decimal {
        let nights = Decimal::from(nights.max(0));
        let guests = Decimal::from(guests.max(0));
        let rooms = Decimal::from(rooms.max(0));

        let base = match self {
            ChargeScheme::PerRoomPerDay => rooms * nights,
            ChargeScheme::PerPersonPerDay => guests * nights,
            ChargeScheme::PerDay => nights,
            ChargeScheme::PerPerson => guests,
            ChargeScheme::PerStay => Decimal::ONE,
        };

        (base * multiplier).max(Decimal::ZERO)
    }
}

/// Article entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    /// Unique identifier
    pub id: Uuid,

    /// Display name (e.g., "Breakfast")
    pub name: String,

    /// Quantity scaling policy
    pub charge_scheme: ChargeScheme,

    /// Price per billable unit
    pub unit_price: Decimal,

    /// Tax rate in percent
    pub tax_rate: Decimal,

    /// Soft-delete flag; inactive articles cannot be newly attached
    pub is_active: bool,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_scheme_quantities() {
        let one = Decimal::ONE;
        assert_eq!(
            ChargeScheme::PerRoomPerDay.billable_quantity(3, 2, 2, one),
            dec!(6)
        );
        assert_eq!(
            ChargeScheme::PerPersonPerDay.billable_quantity(3, 2, 1, one),
            dec!(6)
        );
        assert_eq!(ChargeScheme::PerDay.billable_quantity(3, 2, 1, one), dec!(3));
        assert_eq!(ChargeScheme::PerPerson.billable_quantity(3, 2, 1, one), dec!(2));
        assert_eq!(ChargeScheme::PerStay.billable_quantity(3, 2, 1, one), dec!(1));
    }

    #[test]
    fn test_multiplier_scales_and_zero_suppresses() {
        assert_eq!(
            ChargeScheme::PerDay.billable_quantity(4, 1, 1, dec!(2)),
            dec!(8)
        );
        assert_eq!(
            ChargeScheme::PerPersonPerDay.billable_quantity(4, 2, 1, Decimal::ZERO),
            Decimal::ZERO
        );
    }

    #[test]
    fn test_negative_inputs_floor_at_zero() {
        assert_eq!(
            ChargeScheme::PerDay.billable_quantity(-2, 1, 1, Decimal::ONE),
            Decimal::ZERO
        );
        assert_eq!(
            ChargeScheme::PerPerson.billable_quantity(1, -3, 1, Decimal::ONE),
            Decimal::ZERO
        );
        assert_eq!(
            ChargeScheme::PerStay.billable_quantity(1, 1, 1, dec!(-1)),
            Decimal::ZERO
        );
    }

    #[test]
    fn test_breakfast_example() {
        // per_person_per_day, 3 nights, 2 adults -> 6 units
        let qty = ChargeScheme::PerPersonPerDay.billable_quantity(3, 2, 1, Decimal::ONE);
        assert_eq!(qty, dec!(6));

        let total = qty * dec!(15.00);
        assert_eq!(total, dec!(90.00));

        let tax = total * dec!(7) / dec!(100);
        assert_eq!(tax.round_dp(2), dec!(6.30));
    }

    #[test]
    fn test_scheme_parse() {
        assert_eq!(
            ChargeScheme::from_str("per_room_per_day"),
            Some(ChargeScheme::PerRoomPerDay)
        );
        assert_eq!(ChargeScheme::from_str("PER_STAY"), Some(ChargeScheme::PerStay));
        assert_eq!(ChargeScheme::from_str("hourly"), None);
    }
}
