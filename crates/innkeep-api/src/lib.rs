//! API layer for Innkeep
//!
//! HTTP handlers and DTOs for reservations, invoices, payments, and rate
//! calendar resolution.

#![forbid(unsafe_code)]

pub mod dto;
pub mod handlers;

use innkeep_db::{
    PgCatalogRepository, PgInvoiceRepository, PgReservationRepository, PgSequenceStore,
};
use innkeep_services::{BillingService, RateCalendarService, ReservationManager};

/// Reservation manager wired to the PostgreSQL repositories
pub type PgReservationManager =
    ReservationManager<PgCatalogRepository, PgReservationRepository, PgSequenceStore>;

/// Billing service wired to the PostgreSQL repositories
pub type PgBillingService = BillingService<
    PgCatalogRepository,
    PgReservationRepository,
    PgInvoiceRepository,
    PgSequenceStore,
>;

/// Rate calendar service wired to the PostgreSQL catalog
pub type PgRateCalendarService = RateCalendarService<PgCatalogRepository>;

pub use dto::ApiResponse;
pub use handlers::{configure_invoices, configure_rate_plans, configure_reservations, health_check};
