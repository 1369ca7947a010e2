//! Catalog repository implementation
//!
//! PostgreSQL-backed lookups for rooms, room types, rate plans,
//! cancellation policies, rate calendar rules, articles, and guests.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use innkeep_core::{
    models::{
        Article, CancellationPolicy, ChargeScheme, Guest, PenaltyType, RateCalendarRule, RatePlan,
        Room, RoomStatus, RoomType,
    },
    traits::CatalogRepository,
    AppError, AppResult,
};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::{debug, error, instrument};
use uuid::Uuid;

/// PostgreSQL implementation of CatalogRepository
pub struct PgCatalogRepository {
    pool: PgPool,
}

impl PgCatalogRepository {
    /// Create a new catalog repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn parse_room_status(s: &str) -> RoomStatus {
        RoomStatus::from_str(s).unwrap_or(RoomStatus::Available)
    }

    fn parse_charge_scheme(s: &str) -> ChargeScheme {
        ChargeScheme::from_str(s).unwrap_or(ChargeScheme::PerStay)
    }

    fn parse_penalty_type(s: &str) -> PenaltyType {
        PenaltyType::from_str(s).unwrap_or(PenaltyType::Percent)
    }
}

#[async_trait]
impl CatalogRepository for PgCatalogRepository {
    #[instrument(skip(self))]
    async fn find_guest(&self, id: Uuid) -> AppResult<Option<Guest>> {
        debug!("Finding guest by id: {}", id);

        let result = sqlx::query_as::<sqlx::Postgres, GuestRow>(
            r#"
            SELECT id, first_name, last_name, email, phone, address,
                   company_id, created_at, updated_at
            FROM guests
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding guest {}: {}", id, e);
            AppError::Database(format!("Failed to find guest: {}", e))
        })?;

        Ok(result.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn find_room(&self, id: Uuid) -> AppResult<Option<Room>> {
        debug!("Finding room by id: {}", id);

        let result = sqlx::query_as::<sqlx::Postgres, RoomRow>(
            r#"
            SELECT id, room_number, room_type_id, status, created_at, updated_at
            FROM rooms
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding room {}: {}", id, e);
            AppError::Database(format!("Failed to find room: {}", e))
        })?;

        Ok(result.map(Into::into))
    }

    #[instrument(skip(self, ids))]
    async fn find_rooms(&self, ids: &[Uuid]) -> AppResult<Vec<Room>> {
        debug!("Finding {} rooms by id", ids.len());

        let rows = sqlx::query_as::<sqlx::Postgres, RoomRow>(
            r#"
            SELECT id, room_number, room_type_id, status, created_at, updated_at
            FROM rooms
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding rooms: {}", e);
            AppError::Database(format!("Failed to find rooms: {}", e))
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn find_room_type(&self, id: Uuid) -> AppResult<Option<RoomType>> {
        debug!("Finding room type by id: {}", id);

        let result = sqlx::query_as::<sqlx::Postgres, RoomTypeRow>(
            r#"
            SELECT id, name, base_occupancy, max_occupancy, currency, base_rate,
                   created_at, updated_at
            FROM room_types
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding room type {}: {}", id, e);
            AppError::Database(format!("Failed to find room type: {}", e))
        })?;

        Ok(result.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn find_rate_plan(&self, id: Uuid) -> AppResult<Option<RatePlan>> {
        debug!("Finding rate plan by id: {}", id);

        let result = sqlx::query_as::<sqlx::Postgres, RatePlanRow>(
            r#"
            SELECT id, name, base_price, currency, cancellation_policy_id,
                   created_at, updated_at
            FROM rate_plans
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding rate plan {}: {}", id, e);
            AppError::Database(format!("Failed to find rate plan: {}", e))
        })?;

        Ok(result.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn find_cancellation_policy(&self, id: Uuid) -> AppResult<Option<CancellationPolicy>> {
        debug!("Finding cancellation policy by id: {}", id);

        let result = sqlx::query_as::<sqlx::Postgres, PolicyRow>(
            r#"
            SELECT id, name, free_until_days, penalty_type, penalty_value, created_at
            FROM cancellation_policies
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding cancellation policy {}: {}", id, e);
            AppError::Database(format!("Failed to find cancellation policy: {}", e))
        })?;

        Ok(result.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn calendar_rules_for_plan(&self, rate_plan_id: Uuid) -> AppResult<Vec<RateCalendarRule>> {
        debug!("Loading calendar rules for rate plan: {}", rate_plan_id);

        let rows = sqlx::query_as::<sqlx::Postgres, RuleRow>(
            r#"
            SELECT r.id, r.calendar_id, r.start_date, r.end_date, r.weekdays,
                   r.price, r.cancellation_policy_id,
                   r.closed_for_arrival, r.closed_for_departure,
                   r.created_at, r.updated_at
            FROM rate_calendar_rules r
            JOIN rate_calendars c ON c.id = r.calendar_id
            WHERE c.rate_plan_id = $1
            ORDER BY r.updated_at DESC, r.created_at DESC
            "#,
        )
        .bind(rate_plan_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error loading calendar rules: {}", e);
            AppError::Database(format!("Failed to load calendar rules: {}", e))
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn find_article(&self, id: Uuid) -> AppResult<Option<Article>> {
        debug!("Finding article by id: {}", id);

        let result = sqlx::query_as::<sqlx::Postgres, ArticleRow>(
            r#"
            SELECT id, name, charge_scheme, unit_price, tax_rate, is_active,
                   created_at, updated_at
            FROM articles
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding article {}: {}", id, e);
            AppError::Database(format!("Failed to find article: {}", e))
        })?;

        Ok(result.map(Into::into))
    }
}

/// Helper structs for mapping database rows

#[derive(Debug, sqlx::FromRow)]
struct GuestRow {
    id: Uuid,
    first_name: String,
    last_name: String,
    email: Option<String>,
    phone: Option<String>,
    address: Option<String>,
    company_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<GuestRow> for Guest {
    fn from(row: GuestRow) -> Self {
        Self {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            phone: row.phone,
            address: row.address,
            company_id: row.company_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct RoomRow {
    id: Uuid,
    room_number: String,
    room_type_id: Uuid,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<RoomRow> for Room {
    fn from(row: RoomRow) -> Self {
        Self {
            id: row.id,
            room_number: row.room_number,
            room_type_id: row.room_type_id,
            status: PgCatalogRepository::parse_room_status(&row.status),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct RoomTypeRow {
    id: Uuid,
    name: String,
    base_occupancy: i32,
    max_occupancy: i32,
    currency: String,
    base_rate: Option<Decimal>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<RoomTypeRow> for RoomType {
    fn from(row: RoomTypeRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            base_occupancy: row.base_occupancy,
            max_occupancy: row.max_occupancy,
            currency: row.currency,
            base_rate: row.base_rate,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct RatePlanRow {
    id: Uuid,
    name: String,
    base_price: Decimal,
    currency: String,
    cancellation_policy_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<RatePlanRow> for RatePlan {
    fn from(row: RatePlanRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            base_price: row.base_price,
            currency: row.currency,
            cancellation_policy_id: row.cancellation_policy_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PolicyRow {
    id: Uuid,
    name: String,
    free_until_days: i32,
    penalty_type: String,
    penalty_value: Decimal,
    created_at: DateTime<Utc>,
}

impl From<PolicyRow> for CancellationPolicy {
    fn from(row: PolicyRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            free_until_days: row.free_until_days,
            penalty_type: PgCatalogRepository::parse_penalty_type(&row.penalty_type),
            penalty_value: row.penalty_value,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct RuleRow {
    id: Uuid,
    calendar_id: Uuid,
    start_date: NaiveDate,
    end_date: NaiveDate,
    weekdays: Vec<i16>,
    price: Option<Decimal>,
    cancellation_policy_id: Option<Uuid>,
    closed_for_arrival: bool,
    closed_for_departure: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<RuleRow> for RateCalendarRule {
    fn from(row: RuleRow) -> Self {
        Self {
            id: row.id,
            calendar_id: row.calendar_id,
            start_date: row.start_date,
            end_date: row.end_date,
            weekdays: row
                .weekdays
                .into_iter()
                .filter(|d| (0..=6).contains(d))
                .map(|d| d as u8)
                .collect(),
            price: row.price,
            cancellation_policy_id: row.cancellation_policy_id,
            closed_for_arrival: row.closed_for_arrival,
            closed_for_departure: row.closed_for_departure,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ArticleRow {
    id: Uuid,
    name: String,
    charge_scheme: String,
    unit_price: Decimal,
    tax_rate: Decimal,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ArticleRow> for Article {
    fn from(row: ArticleRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            charge_scheme: PgCatalogRepository::parse_charge_scheme(&row.charge_scheme),
            unit_price: row.unit_price,
            tax_rate: row.tax_rate,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_room_status() {
        assert_eq!(
            PgCatalogRepository::parse_room_status("occupied"),
            RoomStatus::Occupied
        );
        assert_eq!(
            PgCatalogRepository::parse_room_status("garbage"),
            RoomStatus::Available
        );
    }

    #[test]
    fn test_parse_charge_scheme() {
        assert_eq!(
            PgCatalogRepository::parse_charge_scheme("per_person_per_day"),
            ChargeScheme::PerPersonPerDay
        );
        assert_eq!(
            PgCatalogRepository::parse_charge_scheme("unknown"),
            ChargeScheme::PerStay
        );
    }

    #[test]
    fn test_rule_row_filters_invalid_weekdays() {
        let now = Utc::now();
        let row = RuleRow {
            id: Uuid::new_v4(),
            calendar_id: Uuid::new_v4(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            weekdays: vec![0, 6, 9, -1],
            price: None,
            cancellation_policy_id: None,
            closed_for_arrival: false,
            closed_for_departure: false,
            created_at: now,
            updated_at: now,
        };

        let rule: RateCalendarRule = row.into();
        assert_eq!(rule.weekdays, vec![0, 6]);
    }
}
