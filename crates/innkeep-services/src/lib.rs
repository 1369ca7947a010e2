//! Business logic services for Innkeep
//!
//! This crate contains the services that orchestrate the reservation
//! lifecycle and billing operations.
//!
//! # Architecture
//!
//! Services are designed to be composable and testable:
//! - Each service owns its dependencies (repositories, sequence store)
//! - Services are wrapped in Arc for safe sharing across async tasks
//! - Every logical operation runs inside one all-or-nothing transaction
//! - All operations are instrumented with tracing
//! - Comprehensive error handling with AppError
//!
//! # Services
//!
//! - `ReservationManager` - Reservation create/update and status lifecycle
//! - `BillingService` - Invoice creation, corrections, and payments
//! - `RateCalendarService` - Per-day rate/restriction resolution
//! - `SequenceGenerator` - Prefixed, zero-padded document numbering

pub mod billing;
pub mod rate_calendar;
pub mod reservation_manager;
pub mod sequences;

pub use billing::{
    BillingService, InvoiceDocument, InvoiceItemInput, InvoiceRequest, PayOutcome, PaymentRequest,
};
pub use rate_calendar::{RateCalendarService, ResolvedCalendar};
pub use reservation_manager::{
    ArticleSelection, CreatedReservation, GuestInput, NewReservation, ReservationDetails,
    ReservationManager, ReservationUpdate, RoomTypeRequestInput,
};
pub use sequences::SequenceGenerator;

/// Business logic constants
pub mod constants {
    /// Counter name for confirmation numbers
    pub const CONFIRMATION_SEQUENCE: &str = "confirmation_number";

    /// Counter name for invoice numbers
    pub const INVOICE_SEQUENCE: &str = "invoice_number";

    /// Counter name for correction numbers
    pub const CORRECTION_SEQUENCE: &str = "correction_number";

    /// Prefix on confirmation numbers
    pub const CONFIRMATION_PREFIX: &str = "RES";

    /// Prefix on invoice numbers
    pub const INVOICE_PREFIX: &str = "INV";

    /// Prefix on correction numbers
    pub const CORRECTION_PREFIX: &str = "COR";

    /// Zero-padding width of document numbers
    pub const SEQUENCE_PAD: usize = 6;

    /// Default payment method when none is supplied
    pub const DEFAULT_PAYMENT_METHOD: &str = "cash";
}
