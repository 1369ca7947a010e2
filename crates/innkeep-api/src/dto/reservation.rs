//! Reservation request/response DTOs

use innkeep_core::{
    models::{ReservationStatus, RoomSelection},
    AppError,
};
use innkeep_services::{
    ArticleSelection, GuestInput, NewReservation, ReservationUpdate, RoomTypeRequestInput,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

/// Guest on a create request: an existing guest's id or an inline guest
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum GuestDto {
    /// Existing guest by id
    Existing(Uuid),
    /// Inline guest created with the reservation
    New {
        first_name: String,
        last_name: String,
        email: Option<String>,
        phone: Option<String>,
    },
}

impl From<GuestDto> for GuestInput {
    fn from(dto: GuestDto) -> Self {
        match dto {
            GuestDto::Existing(id) => GuestInput::Existing(id),
            GuestDto::New {
                first_name,
                last_name,
                email,
                phone,
            } => GuestInput::New {
                first_name,
                last_name,
                email,
                phone,
            },
        }
    }
}

/// Room selection: a bare room id or an object with rate/currency overrides
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RoomSelectionDto {
    /// Bare room id
    Id(Uuid),
    /// Room with overrides
    Detailed {
        room_id: Uuid,
        nightly_rate: Option<Decimal>,
        currency: Option<String>,
    },
}

impl From<RoomSelectionDto> for RoomSelection {
    fn from(dto: RoomSelectionDto) -> Self {
        match dto {
            RoomSelectionDto::Id(room_id) => RoomSelection::by_id(room_id),
            RoomSelectionDto::Detailed {
                room_id,
                nightly_rate,
                currency,
            } => RoomSelection {
                room_id,
                nightly_rate,
                currency,
            },
        }
    }
}

/// Room-type request line
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RoomTypeRequestDto {
    pub room_type_id: Uuid,

    #[validate(range(min = 1))]
    pub quantity: i32,
}

/// Article attached to a reservation
#[derive(Debug, Clone, Deserialize)]
pub struct ArticleDto {
    pub article_id: Uuid,
    pub multiplier: Option<Decimal>,
}

/// POST /reservations body
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateReservationRequest {
    pub guest: GuestDto,

    pub check_in_date: NaiveDate,
    pub check_out_date: NaiveDate,

    #[validate(range(min = 0))]
    pub adults: i32,

    #[serde(default)]
    #[validate(range(min = 0))]
    pub children: i32,

    pub rate_plan_id: Option<Uuid>,
    pub currency: Option<String>,
    pub notes: Option<String>,
    pub status: Option<String>,

    #[serde(default)]
    pub rooms: Vec<RoomSelectionDto>,

    #[serde(default)]
    #[validate(nested)]
    pub room_type_requests: Vec<RoomTypeRequestDto>,

    #[serde(default)]
    pub articles: Vec<ArticleDto>,
}

impl TryFrom<CreateReservationRequest> for NewReservation {
    type Error = AppError;

    fn try_from(req: CreateReservationRequest) -> Result<Self, Self::Error> {
        let status = req
            .status
            .as_deref()
            .map(ReservationStatus::parse)
            .transpose()?;

        Ok(NewReservation {
            guest: req.guest.into(),
            check_in_date: req.check_in_date,
            check_out_date: req.check_out_date,
            adults: req.adults,
            children: req.children,
            rate_plan_id: req.rate_plan_id,
            currency: req.currency,
            notes: req.notes,
            status,
            rooms: req.rooms.into_iter().map(Into::into).collect(),
            room_type_requests: req
                .room_type_requests
                .into_iter()
                .map(|r| RoomTypeRequestInput {
                    room_type_id: r.room_type_id,
                    quantity: r.quantity,
                })
                .collect(),
            articles: req
                .articles
                .into_iter()
                .map(|a| ArticleSelection {
                    article_id: a.article_id,
                    multiplier: a.multiplier,
                })
                .collect(),
        })
    }
}

/// PUT /reservations/{id} body; absent fields keep current values
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateReservationRequest {
    pub check_in_date: Option<NaiveDate>,
    pub check_out_date: Option<NaiveDate>,

    #[validate(range(min = 0))]
    pub adults: Option<i32>,

    #[validate(range(min = 0))]
    pub children: Option<i32>,

    pub rate_plan_id: Option<Uuid>,
    pub currency: Option<String>,
    pub notes: Option<String>,
    pub status: Option<String>,
    pub rooms: Option<Vec<RoomSelectionDto>>,
    pub room_type_requests: Option<Vec<RoomTypeRequestDto>>,
    pub articles: Option<Vec<ArticleDto>>,
}

impl TryFrom<UpdateReservationRequest> for ReservationUpdate {
    type Error = AppError;

    fn try_from(req: UpdateReservationRequest) -> Result<Self, Self::Error> {
        let status = req
            .status
            .as_deref()
            .map(ReservationStatus::parse)
            .transpose()?;

        Ok(ReservationUpdate {
            check_in_date: req.check_in_date,
            check_out_date: req.check_out_date,
            adults: req.adults,
            children: req.children,
            rate_plan_id: req.rate_plan_id,
            currency: req.currency,
            notes: req.notes,
            status,
            rooms: req
                .rooms
                .map(|rooms| rooms.into_iter().map(Into::into).collect()),
            room_type_requests: req.room_type_requests.map(|requests| {
                requests
                    .into_iter()
                    .map(|r| RoomTypeRequestInput {
                        room_type_id: r.room_type_id,
                        quantity: r.quantity,
                    })
                    .collect()
            }),
            articles: req.articles.map(|articles| {
                articles
                    .into_iter()
                    .map(|a| ArticleSelection {
                        article_id: a.article_id,
                        multiplier: a.multiplier,
                    })
                    .collect()
            }),
        })
    }
}

/// POST /reservations/{id}/status body
#[derive(Debug, Clone, Deserialize)]
pub struct ChangeStatusRequest {
    pub status: String,
    pub notes: Option<String>,
    pub recorded_by: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_room_selection_accepts_both_shapes() {
        let bare: RoomSelectionDto =
            serde_json::from_str(r#""9b2e7a1c-64c8-4fd0-9b6f-3a1a8b6f2f11""#).unwrap();
        let selection: RoomSelection = bare.into();
        assert!(selection.nightly_rate.is_none());

        let detailed: RoomSelectionDto = serde_json::from_str(
            r#"{"room_id": "9b2e7a1c-64c8-4fd0-9b6f-3a1a8b6f2f11", "nightly_rate": "95.00", "currency": "USD"}"#,
        )
        .unwrap();
        let selection: RoomSelection = detailed.into();
        assert_eq!(selection.nightly_rate, Some(dec!(95.00)));
        assert_eq!(selection.currency.as_deref(), Some("USD"));
    }

    #[test]
    fn test_guest_accepts_both_shapes() {
        let existing: GuestDto =
            serde_json::from_str(r#""9b2e7a1c-64c8-4fd0-9b6f-3a1a8b6f2f11""#).unwrap();
        assert!(matches!(existing, GuestDto::Existing(_)));

        let inline: GuestDto =
            serde_json::from_str(r#"{"first_name": "Ada", "last_name": "Lovelace"}"#).unwrap();
        assert!(matches!(inline, GuestDto::New { .. }));
    }

    #[test]
    fn test_create_request_rejects_bad_status() {
        let request = CreateReservationRequest {
            guest: GuestDto::Existing(Uuid::new_v4()),
            check_in_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            check_out_date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            adults: 2,
            children: 0,
            rate_plan_id: None,
            currency: None,
            notes: None,
            status: Some("archived".to_string()),
            rooms: Vec::new(),
            room_type_requests: Vec::new(),
            articles: Vec::new(),
        };

        assert!(matches!(
            NewReservation::try_from(request),
            Err(AppError::InvalidStatus(_))
        ));
    }

    #[test]
    fn test_update_request_maps_status() {
        let request = UpdateReservationRequest {
            status: Some("checked_in".to_string()),
            ..Default::default()
        };
        let update = ReservationUpdate::try_from(request).unwrap();
        assert_eq!(update.status, Some(ReservationStatus::CheckedIn));
        assert!(update.rooms.is_none());
    }
}
