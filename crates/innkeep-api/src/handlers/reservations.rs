//! Reservation handlers
//!
//! HTTP endpoints for the reservation lifecycle: create, read, modify,
//! and status transitions.

use actix_web::{web, HttpResponse};
use innkeep_core::{models::ReservationStatus, AppError};
use innkeep_services::{NewReservation, ReservationUpdate};
use tracing::{debug, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::dto::reservation::{
    ChangeStatusRequest, CreateReservationRequest, UpdateReservationRequest,
};
use crate::dto::ApiResponse;
use crate::PgReservationManager;

/// Create a reservation
///
/// POST /api/v1/reservations
#[instrument(skip(manager, body))]
pub async fn create_reservation(
    manager: web::Data<PgReservationManager>,
    body: web::Json<CreateReservationRequest>,
) -> Result<HttpResponse, AppError> {
    let request = body.into_inner();
    request.validate()?;

    debug!(
        "Creating reservation: {} -> {}",
        request.check_in_date, request.check_out_date
    );

    let input = NewReservation::try_from(request)?;
    let created = manager.create(input).await?;

    Ok(HttpResponse::Created().json(ApiResponse::with_message(
        created,
        "reservation created",
    )))
}

/// Fetch a reservation with its rooms, articles, and status history
///
/// GET /api/v1/reservations/{id}
#[instrument(skip(manager))]
pub async fn get_reservation(
    manager: web::Data<PgReservationManager>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let details = manager.details(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(details)))
}

/// Modify a reservation
///
/// PUT /api/v1/reservations/{id}
#[instrument(skip(manager, body))]
pub async fn update_reservation(
    manager: web::Data<PgReservationManager>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateReservationRequest>,
) -> Result<HttpResponse, AppError> {
    let request = body.into_inner();
    request.validate()?;

    let input = ReservationUpdate::try_from(request)?;
    let updated = manager.update(path.into_inner(), input).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::with_message(updated, "reservation updated")))
}

/// Change a reservation's status
///
/// POST /api/v1/reservations/{id}/status
#[instrument(skip(manager, body))]
pub async fn change_status(
    manager: web::Data<PgReservationManager>,
    path: web::Path<Uuid>,
    body: web::Json<ChangeStatusRequest>,
) -> Result<HttpResponse, AppError> {
    let request = body.into_inner();
    let status = ReservationStatus::parse(&request.status)?;

    let updated = manager
        .change_status(path.into_inner(), status, request.notes, request.recorded_by)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::with_message(
        updated,
        format!("reservation is now {status}"),
    )))
}

/// Configure reservation routes.
///
/// Registered as flat resources (not a scope) so the billing routes under
/// the same `/reservations/{id}` prefix resolve independently.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/reservations", web::post().to(create_reservation))
        .route("/reservations/{id}", web::get().to(get_reservation))
        .route("/reservations/{id}", web::put().to(update_reservation))
        .route("/reservations/{id}/status", web::post().to(change_status));
}
