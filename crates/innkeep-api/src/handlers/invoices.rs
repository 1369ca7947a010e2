//! Invoice and payment handlers
//!
//! Billing endpoints: invoice creation (including corrections), invoice
//! reads, and payment recording.

use actix_web::{web, HttpResponse};
use innkeep_core::AppError;
use innkeep_services::{InvoiceRequest, PaymentRequest};
use tracing::{debug, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::dto::invoice::{CreateInvoiceRequest, PayInvoiceRequest};
use crate::dto::ApiResponse;
use crate::PgBillingService;

/// Create an invoice or correction for a reservation
///
/// POST /api/v1/reservations/{id}/invoices
#[instrument(skip(billing, body))]
pub async fn create_invoice(
    billing: web::Data<PgBillingService>,
    path: web::Path<Uuid>,
    body: web::Json<CreateInvoiceRequest>,
) -> Result<HttpResponse, AppError> {
    let request = body.into_inner();
    request.validate()?;

    let input = InvoiceRequest::try_from(request)?;
    let document = billing.create_invoice(path.into_inner(), input).await?;

    debug!("Created invoice {}", document.invoice.invoice_number);
    Ok(HttpResponse::Created().json(ApiResponse::with_message(document, "invoice created")))
}

/// List a reservation's invoices, newest first
///
/// GET /api/v1/reservations/{id}/invoices
#[instrument(skip(billing))]
pub async fn list_invoices(
    billing: web::Data<PgBillingService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let invoices = billing.list_for_reservation(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(invoices)))
}

/// Pay a reservation's most recent invoice
///
/// POST /api/v1/reservations/{id}/payments
#[instrument(skip(billing, body))]
pub async fn pay_invoice(
    billing: web::Data<PgBillingService>,
    path: web::Path<Uuid>,
    body: web::Json<PayInvoiceRequest>,
) -> Result<HttpResponse, AppError> {
    let request = PaymentRequest::from(body.into_inner());
    let outcome = billing.pay_invoice(path.into_inner(), request).await?;

    let message = outcome.message.clone();
    Ok(HttpResponse::Ok().json(ApiResponse::with_message(outcome, message)))
}

/// Fetch an invoice with its items
///
/// GET /api/v1/invoices/{id}
#[instrument(skip(billing))]
pub async fn get_invoice(
    billing: web::Data<PgBillingService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let document = billing.document(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(document)))
}

/// Configure invoice and payment routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route(
        "/reservations/{id}/invoices",
        web::post().to(create_invoice),
    )
    .route("/reservations/{id}/invoices", web::get().to(list_invoices))
    .route("/reservations/{id}/payments", web::post().to(pay_invoice))
    .route("/invoices/{id}", web::get().to(get_invoice));
}
