//! HTTP handlers

pub mod health;
pub mod invoices;
pub mod rate_plans;
pub mod reservations;

pub use health::health_check;
pub use invoices::configure as configure_invoices;
pub use rate_plans::configure as configure_rate_plans;
pub use reservations::configure as configure_reservations;
