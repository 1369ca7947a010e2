//! Domain models for Innkeep
//!
//! This module contains all the core domain models used throughout the
//! application, together with the pure domain algorithms that operate on
//! them (rate resolution, capacity validation, article pricing, invoice
//! arithmetic).

pub mod article;
pub mod guest;
pub mod invoice;
pub mod rate;
pub mod reservation;
pub mod room;

pub use article::{Article, ChargeScheme};
pub use guest::{Company, Guest};
pub use invoice::{
    correction_items, invoice_totals, round_money, Invoice, InvoiceItem, InvoiceStatus,
    InvoiceTotals, InvoiceType, Payment,
};
pub use rate::{
    resolve_rate_days, CancellationPolicy, PenaltyType, RateCalendarRule, RatePlan,
    ResolvedRateDay,
};
pub use reservation::{
    normalize_currency, ranges_overlap, validate_stay_dates, Reservation, ReservationArticle,
    ReservationRoom, ReservationStatus, RoomSelection, RoomTypeRequest, StatusLogEntry,
};
pub use room::{validate_capacity, CapacityUnit, Room, RoomStatus, RoomType};
