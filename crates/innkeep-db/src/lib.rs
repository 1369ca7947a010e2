//! Innkeep Database Layer
//!
//! This crate provides PostgreSQL database access and repository
//! implementations for the Innkeep system. It includes:
//!
//! - Connection pool management with sqlx
//! - Repository implementations for catalog, reservation, and invoice reads
//! - A row-locked sequence counter store for document numbering
//! - Transaction support for atomic operations
//!
//! Expected schema (managed externally; migration tooling is out of scope):
//! `room_types`, `rooms`, `rate_plans`, `rate_calendars`,
//! `rate_calendar_rules`, `cancellation_policies`, `guests`, `companies`,
//! `articles`, `reservations`, `reservation_rooms`,
//! `reservation_room_requests`, `reservation_articles`,
//! `reservation_status_log`, `housekeeping_log`, `invoices`,
//! `invoice_items`, `payments`, `sequence_counters`.

pub mod pool;
pub mod repositories;

pub use pool::create_pool;
pub use repositories::*;

// Re-export commonly used types
pub use innkeep_core::{AppError, AppResult};
pub use sqlx::{PgPool, Postgres, Transaction};
