//! Common traits for repositories and the sequence store
//!
//! Defines the persistence abstractions the business services depend on.
//! Reads go through these traits; writes that must be atomic with sibling
//! writes run inside a `sqlx::Transaction` owned by the service.

use crate::error::AppError;
use crate::models::{
    Article, CancellationPolicy, Guest, Invoice, InvoiceItem, Payment, RateCalendarRule, RatePlan,
    Reservation, ReservationArticle, ReservationRoom, Room, RoomType, RoomTypeRequest,
    StatusLogEntry,
};
use async_trait::async_trait;
use uuid::Uuid;

/// Catalog lookups: rooms, room types, rate plans, policies, articles,
/// and guests. The reservation and billing services consult the catalog
/// for existence and attribute checks before any write.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Find a guest by id
    async fn find_guest(&self, id: Uuid) -> Result<Option<Guest>, AppError>;

    /// Find a room by id
    async fn find_room(&self, id: Uuid) -> Result<Option<Room>, AppError>;

    /// Find several rooms by id, preserving no particular order
    async fn find_rooms(&self, ids: &[Uuid]) -> Result<Vec<Room>, AppError>;

    /// Find a room type by id
    async fn find_room_type(&self, id: Uuid) -> Result<Option<RoomType>, AppError>;

    /// Find a rate plan by id
    async fn find_rate_plan(&self, id: Uuid) -> Result<Option<RatePlan>, AppError>;

    /// Find a cancellation policy by id
    async fn find_cancellation_policy(
        &self,
        id: Uuid,
    ) -> Result<Option<CancellationPolicy>, AppError>;

    /// All calendar rules attached to a rate plan's calendars
    async fn calendar_rules_for_plan(
        &self,
        rate_plan_id: Uuid,
    ) -> Result<Vec<RateCalendarRule>, AppError>;

    /// Find an article by id
    async fn find_article(&self, id: Uuid) -> Result<Option<Article>, AppError>;
}

/// Reservation reads: headers and owned child rows
#[async_trait]
pub trait ReservationRepository: Send + Sync {
    /// Find a reservation by id
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Reservation>, AppError>;

    /// Room assignments owned by a reservation
    async fn rooms(&self, reservation_id: Uuid) -> Result<Vec<ReservationRoom>, AppError>;

    /// Room-type request lines owned by a reservation
    async fn room_type_requests(
        &self,
        reservation_id: Uuid,
    ) -> Result<Vec<RoomTypeRequest>, AppError>;

    /// Article lines owned by a reservation
    async fn articles(&self, reservation_id: Uuid) -> Result<Vec<ReservationArticle>, AppError>;

    /// Status audit trail, oldest first
    async fn status_log(&self, reservation_id: Uuid) -> Result<Vec<StatusLogEntry>, AppError>;
}

/// Invoice reads
#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    /// Find an invoice by id
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Invoice>, AppError>;

    /// Items of an invoice in document order
    async fn items(&self, invoice_id: Uuid) -> Result<Vec<InvoiceItem>, AppError>;

    /// The most recently created invoice of a reservation
    async fn latest_for_reservation(
        &self,
        reservation_id: Uuid,
    ) -> Result<Option<Invoice>, AppError>;

    /// All invoices of a reservation, newest first
    async fn list_for_reservation(&self, reservation_id: Uuid)
        -> Result<Vec<Invoice>, AppError>;

    /// Payments recorded against an invoice
    async fn payments(&self, invoice_id: Uuid) -> Result<Vec<Payment>, AppError>;
}

/// Named monotonic counter store
///
/// `next_value` must serialize concurrent callers on the same counter
/// (row lock) so no two callers observe the same value. A missing counter
/// behaves as a fresh counter below the floor; the first issued value is
/// `floor`, subsequent values increase by one.
#[async_trait]
pub trait SequenceStore: Send + Sync {
    /// Atomically advance and return the next value of a named counter
    async fn next_value(&self, name: &str, floor: i64) -> Result<i64, AppError>;
}
