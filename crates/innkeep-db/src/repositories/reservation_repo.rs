//! Reservation repository implementation
//!
//! Provides PostgreSQL-backed reads for reservations and their owned
//! rows (room assignments, room-type requests, article lines, status log).
//! Writes that must be atomic with sibling writes run inside service
//! transactions; this repository covers the read paths.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use innkeep_core::{
    models::{
        ChargeScheme, Reservation, ReservationArticle, ReservationRoom, ReservationStatus,
        RoomTypeRequest, StatusLogEntry,
    },
    traits::ReservationRepository,
    AppError, AppResult,
};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::{debug, error, instrument};
use uuid::Uuid;

/// PostgreSQL implementation of ReservationRepository
pub struct PgReservationRepository {
    pool: PgPool,
}

impl PgReservationRepository {
    /// Create a new reservation repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn parse_status(s: &str) -> ReservationStatus {
        ReservationStatus::from_str(s).unwrap_or(ReservationStatus::Tentative)
    }
}

#[async_trait]
impl ReservationRepository for PgReservationRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Reservation>> {
        debug!("Finding reservation by id: {}", id);

        let result = sqlx::query_as::<sqlx::Postgres, ReservationRow>(
            r#"
            SELECT id, confirmation_number, guest_id, status,
                   check_in_date, check_out_date, adults, children,
                   rate_plan_id, total_amount, currency, notes,
                   created_at, updated_at
            FROM reservations
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding reservation {}: {}", id, e);
            AppError::Database(format!("Failed to find reservation: {}", e))
        })?;

        Ok(result.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn rooms(&self, reservation_id: Uuid) -> AppResult<Vec<ReservationRoom>> {
        let rows = sqlx::query_as::<sqlx::Postgres, ReservationRoomRow>(
            r#"
            SELECT id, reservation_id, room_id, nightly_rate, currency
            FROM reservation_rooms
            WHERE reservation_id = $1
            ORDER BY id
            "#,
        )
        .bind(reservation_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error loading reservation rooms: {}", e);
            AppError::Database(format!("Failed to load reservation rooms: {}", e))
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn room_type_requests(&self, reservation_id: Uuid) -> AppResult<Vec<RoomTypeRequest>> {
        let rows = sqlx::query_as::<sqlx::Postgres, RoomTypeRequestRow>(
            r#"
            SELECT id, reservation_id, room_type_id, quantity
            FROM reservation_room_requests
            WHERE reservation_id = $1
            ORDER BY id
            "#,
        )
        .bind(reservation_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error loading room-type requests: {}", e);
            AppError::Database(format!("Failed to load room-type requests: {}", e))
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn articles(&self, reservation_id: Uuid) -> AppResult<Vec<ReservationArticle>> {
        let rows = sqlx::query_as::<sqlx::Postgres, ReservationArticleRow>(
            r#"
            SELECT id, reservation_id, article_id, description, charge_scheme,
                   unit_price, tax_rate, multiplier, quantity, total
            FROM reservation_articles
            WHERE reservation_id = $1
            ORDER BY id
            "#,
        )
        .bind(reservation_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error loading reservation articles: {}", e);
            AppError::Database(format!("Failed to load reservation articles: {}", e))
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn status_log(&self, reservation_id: Uuid) -> AppResult<Vec<StatusLogEntry>> {
        let rows = sqlx::query_as::<sqlx::Postgres, StatusLogRow>(
            r#"
            SELECT id, reservation_id, status, notes, recorded_by, created_at
            FROM reservation_status_log
            WHERE reservation_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(reservation_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error loading status log: {}", e);
            AppError::Database(format!("Failed to load status log: {}", e))
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

/// Helper structs for mapping database rows

#[derive(Debug, sqlx::FromRow)]
struct ReservationRow {
    id: Uuid,
    confirmation_number: String,
    guest_id: Uuid,
    status: String,
    check_in_date: NaiveDate,
    check_out_date: NaiveDate,
    adults: i32,
    children: i32,
    rate_plan_id: Option<Uuid>,
    total_amount: Option<Decimal>,
    currency: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ReservationRow> for Reservation {
    fn from(row: ReservationRow) -> Self {
        Self {
            id: row.id,
            confirmation_number: row.confirmation_number,
            guest_id: row.guest_id,
            status: PgReservationRepository::parse_status(&row.status),
            check_in_date: row.check_in_date,
            check_out_date: row.check_out_date,
            adults: row.adults,
            children: row.children,
            rate_plan_id: row.rate_plan_id,
            total_amount: row.total_amount,
            currency: row.currency,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ReservationRoomRow {
    id: Uuid,
    reservation_id: Uuid,
    room_id: Uuid,
    nightly_rate: Option<Decimal>,
    currency: String,
}

impl From<ReservationRoomRow> for ReservationRoom {
    fn from(row: ReservationRoomRow) -> Self {
        Self {
            id: row.id,
            reservation_id: row.reservation_id,
            room_id: row.room_id,
            nightly_rate: row.nightly_rate,
            currency: row.currency,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct RoomTypeRequestRow {
    id: Uuid,
    reservation_id: Uuid,
    room_type_id: Uuid,
    quantity: i32,
}

impl From<RoomTypeRequestRow> for RoomTypeRequest {
    fn from(row: RoomTypeRequestRow) -> Self {
        Self {
            id: row.id,
            reservation_id: row.reservation_id,
            room_type_id: row.room_type_id,
            quantity: row.quantity,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ReservationArticleRow {
    id: Uuid,
    reservation_id: Uuid,
    article_id: Uuid,
    description: String,
    charge_scheme: String,
    unit_price: Decimal,
    tax_rate: Decimal,
    multiplier: Decimal,
    quantity: Decimal,
    total: Decimal,
}

impl From<ReservationArticleRow> for ReservationArticle {
    fn from(row: ReservationArticleRow) -> Self {
        Self {
            id: row.id,
            reservation_id: row.reservation_id,
            article_id: row.article_id,
            description: row.description,
            charge_scheme: ChargeScheme::from_str(&row.charge_scheme)
                .unwrap_or(ChargeScheme::PerStay),
            unit_price: row.unit_price,
            tax_rate: row.tax_rate,
            multiplier: row.multiplier,
            quantity: row.quantity,
            total: row.total,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct StatusLogRow {
    id: Uuid,
    reservation_id: Uuid,
    status: String,
    notes: Option<String>,
    recorded_by: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<StatusLogRow> for StatusLogEntry {
    fn from(row: StatusLogRow) -> Self {
        Self {
            id: row.id,
            reservation_id: row.reservation_id,
            status: PgReservationRepository::parse_status(&row.status),
            notes: row.notes,
            recorded_by: row.recorded_by,
            created_at: row.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status() {
        assert_eq!(
            PgReservationRepository::parse_status("confirmed"),
            ReservationStatus::Confirmed
        );
        assert_eq!(
            PgReservationRepository::parse_status("no_show"),
            ReservationStatus::NoShow
        );
        // Unknown stored values degrade to tentative rather than panicking
        assert_eq!(
            PgReservationRepository::parse_status("???"),
            ReservationStatus::Tentative
        );
    }
}
