//! Room and room type models
//!
//! Room types define occupancy limits and base rates; rooms are physical
//! units tracked through housekeeping states. Capacity validation lives
//! here as a pure check used by the reservation lifecycle.

use crate::{AppError, AppResult};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Room housekeeping/occupancy status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    /// Room is ready for a new guest
    #[default]
    Available,
    /// Room is occupied by a checked-in guest
    Occupied,
    /// Room is out of order and cannot be sold
    OutOfOrder,
    /// Room is being cleaned after checkout
    InCleaning,
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoomStatus::Available => write!(f, "available"),
            RoomStatus::Occupied => write!(f, "occupied"),
            RoomStatus::OutOfOrder => write!(f, "out_of_order"),
            RoomStatus::InCleaning => write!(f, "in_cleaning"),
        }
    }
}

impl RoomStatus {
    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "available" => Some(RoomStatus::Available),
            "occupied" => Some(RoomStatus::Occupied),
            "out_of_order" => Some(RoomStatus::OutOfOrder),
            "in_cleaning" => Some(RoomStatus::InCleaning),
            _ => None,
        }
    }
}

/// Room type entity
///
/// Defines the occupancy envelope and default pricing for a class of rooms.
/// Invariant: `base_occupancy <= max_occupancy`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomType {
    /// Unique identifier
    pub id: Uuid,

    /// Display name (e.g., "Double", "Junior Suite")
    pub name: String,

    /// Standard occupancy the room is priced for
    pub base_occupancy: i32,

    /// Maximum legal occupancy
    pub max_occupancy: i32,

    /// Currency of the base rate (ISO 4217)
    pub currency: String,

    /// Default nightly rate when no rate plan applies
    pub base_rate: Option<Decimal>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl RoomType {
    /// Validate the occupancy invariant
    pub fn validate(&self) -> AppResult<()> {
        if self.base_occupancy < 1 || self.max_occupancy < 1 {
            return Err(AppError::CapacityMisconfigured(format!(
                "room type {}",
                self.name
            )));
        }
        if self.base_occupancy > self.max_occupancy {
            return Err(AppError::Validation(format!(
                "room type {}: base occupancy {} exceeds max occupancy {}",
                self.name, self.base_occupancy, self.max_occupancy
            )));
        }
        Ok(())
    }
}

/// Room entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    /// Unique identifier
    pub id: Uuid,

    /// Human-visible room number, unique per property
    pub room_number: String,

    /// Owning room type
    pub room_type_id: Uuid,

    /// Current housekeeping/occupancy status
    pub status: RoomStatus,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

/// One unit of bookable capacity, either a concrete room or a
/// room-type request line.
#[derive(Debug, Clone)]
pub struct CapacityUnit {
    /// Label used in error messages (room number or room type name)
    pub label: String,

    /// Capacity per unit (max occupancy)
    pub capacity: i32,

    /// Number of units (1 for a concrete room, N for a type request)
    pub quantity: i32,
}

impl CapacityUnit {
    /// A single concrete room
    pub fn room(label: impl Into<String>, capacity: i32) -> Self {
        Self {
            label: label.into(),
            capacity,
            quantity: 1,
        }
    }

    /// A room-type request of `quantity` units
    pub fn room_type(label: impl Into<String>, capacity: i32, quantity: i32) -> Self {
        Self {
            label: label.into(),
            capacity,
            quantity,
        }
    }
}

/// Verify that the selected rooms/room-type requests can hold the guests.
///
/// A guest count below 1 is rejected outright. A unit with capacity <= 0
/// is a configuration error, reported distinctly from a shortfall. A
/// shortfall names the selection and shows required vs. available capacity.
pub fn validate_capacity(guest_count: i32, units: &[CapacityUnit]) -> AppResult<()> {
    if guest_count < 1 {
        return Err(AppError::Validation(
            "reservation must have at least one guest".to_string(),
        ));
    }

    if units.is_empty() {
        return Err(AppError::Validation(
            "reservation requires at least one room or room-type request".to_string(),
        ));
    }

    let mut available: i32 = 0;
    for unit in units {
        if unit.capacity <= 0 {
            return Err(AppError::CapacityMisconfigured(unit.label.clone()));
        }
        if unit.quantity < 1 {
            return Err(AppError::Validation(format!(
                "room-type request for {} must have quantity >= 1",
                unit.label
            )));
        }
        available += unit.capacity * unit.quantity;
    }

    if available < guest_count {
        let selection = units
            .iter()
            .map(|u| u.label.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        return Err(AppError::CapacityExceeded {
            selection,
            required: guest_count,
            available,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_status_roundtrip() {
        assert_eq!(RoomStatus::from_str("available"), Some(RoomStatus::Available));
        assert_eq!(RoomStatus::from_str("in_cleaning"), Some(RoomStatus::InCleaning));
        assert_eq!(RoomStatus::from_str("OCCUPIED"), Some(RoomStatus::Occupied));
        assert_eq!(RoomStatus::from_str("nonsense"), None);
        assert_eq!(RoomStatus::OutOfOrder.to_string(), "out_of_order");
    }

    #[test]
    fn test_capacity_exact_fit() {
        // Double with max occupancy 3 holds 3 adults
        let units = [CapacityUnit::room_type("Double", 3, 1)];
        assert!(validate_capacity(3, &units).is_ok());
    }

    #[test]
    fn test_capacity_shortfall_names_selection() {
        let units = [
            CapacityUnit::room("101", 2),
            CapacityUnit::room("102", 2),
        ];
        let err = validate_capacity(5, &units).unwrap_err();
        match err {
            AppError::CapacityExceeded {
                selection,
                required,
                available,
            } => {
                assert_eq!(selection, "101, 102");
                assert_eq!(required, 5);
                assert_eq!(available, 4);
            }
            other => panic!("expected capacity error, got {other:?}"),
        }
    }

    #[test]
    fn test_capacity_aggregates_quantity() {
        let units = [CapacityUnit::room_type("Twin", 2, 3)];
        assert!(validate_capacity(6, &units).is_ok());
        assert!(validate_capacity(7, &units).is_err());
    }

    #[test]
    fn test_zero_capacity_is_config_error() {
        let units = [CapacityUnit::room("101", 0)];
        match validate_capacity(1, &units).unwrap_err() {
            AppError::CapacityMisconfigured(label) => assert_eq!(label, "101"),
            other => panic!("expected misconfiguration, got {other:?}"),
        }
    }

    #[test]
    fn test_guest_count_below_one_rejected() {
        let units = [CapacityUnit::room("101", 2)];
        assert!(matches!(
            validate_capacity(0, &units),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_empty_selection_rejected() {
        assert!(matches!(
            validate_capacity(2, &[]),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_room_type_occupancy_invariant() {
        let now = Utc::now();
        let mut rt = RoomType {
            id: Uuid::new_v4(),
            name: "Double".to_string(),
            base_occupancy: 2,
            max_occupancy: 3,
            currency: "EUR".to_string(),
            base_rate: None,
            created_at: now,
            updated_at: now,
        };
        assert!(rt.validate().is_ok());

        rt.base_occupancy = 4;
        assert!(rt.validate().is_err());
    }
}
