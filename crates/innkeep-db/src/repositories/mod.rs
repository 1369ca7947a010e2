//! Repository implementations
//!
//! This module contains concrete implementations of the repository traits
//! defined in innkeep-core, using sqlx for PostgreSQL access.

pub mod catalog_repo;
pub mod invoice_repo;
pub mod reservation_repo;
pub mod sequence_repo;

pub use catalog_repo::PgCatalogRepository;
pub use invoice_repo::PgInvoiceRepository;
pub use reservation_repo::PgReservationRepository;
pub use sequence_repo::PgSequenceStore;
