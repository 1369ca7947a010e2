//! Reservation lifecycle service
//!
//! Creation, modification, and status transitions for reservations. Every
//! operation that writes runs inside one transaction: room rows are locked
//! before the availability check so two concurrent bookings of the same
//! room cannot both pass, and the status log plus room side-effects commit
//! atomically with the reservation itself.

use chrono::{NaiveDate, Utc};
use innkeep_core::{
    config::BillingConfig,
    models::{
        normalize_currency, validate_capacity, validate_stay_dates, CapacityUnit,
        RatePlan, Reservation, ReservationArticle, ReservationRoom, ReservationStatus, Room,
        RoomSelection, RoomType, RoomTypeRequest, StatusLogEntry,
    },
    traits::{CatalogRepository, ReservationRepository, SequenceStore},
    AppError, AppResult,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use crate::sequences::SequenceGenerator;

/// Guest reference on reservation creation: an existing guest by id, or
/// an inline guest created atomically with the reservation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GuestInput {
    /// Reference to an existing guest
    Existing(Uuid),
    /// Inline guest, inserted in the same transaction
    New {
        first_name: String,
        last_name: String,
        email: Option<String>,
        phone: Option<String>,
    },
}

/// A room-type request line: N units of a type, no concrete rooms yet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomTypeRequestInput {
    pub room_type_id: Uuid,
    pub quantity: i32,
}

/// An article attached at booking time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleSelection {
    pub article_id: Uuid,
    /// Quantity multiplier; defaults to 1
    pub multiplier: Option<Decimal>,
}

/// Input for reservation creation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReservation {
    pub guest: GuestInput,
    pub check_in_date: NaiveDate,
    pub check_out_date: NaiveDate,
    pub adults: i32,
    #[serde(default)]
    pub children: i32,
    pub rate_plan_id: Option<Uuid>,
    pub currency: Option<String>,
    pub notes: Option<String>,
    /// Initial status; defaults to tentative
    pub status: Option<ReservationStatus>,
    #[serde(default)]
    pub rooms: Vec<RoomSelection>,
    #[serde(default)]
    pub room_type_requests: Vec<RoomTypeRequestInput>,
    #[serde(default)]
    pub articles: Vec<ArticleSelection>,
}

/// Input for reservation modification; absent fields keep current values.
///
/// `rooms`, `room_type_requests`, and `articles` replace the full set when
/// present. Article lines are always re-derived against the (possibly
/// changed) stay shape, whether or not they were re-supplied.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReservationUpdate {
    pub check_in_date: Option<NaiveDate>,
    pub check_out_date: Option<NaiveDate>,
    pub adults: Option<i32>,
    pub children: Option<i32>,
    pub rate_plan_id: Option<Uuid>,
    pub currency: Option<String>,
    pub notes: Option<String>,
    pub status: Option<ReservationStatus>,
    pub rooms: Option<Vec<RoomSelection>>,
    pub room_type_requests: Option<Vec<RoomTypeRequestInput>>,
    pub articles: Option<Vec<ArticleSelection>>,
}

/// Creation result surfaced to the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedReservation {
    pub id: Uuid,
    pub confirmation_number: String,
}

/// Full reservation read-back: header plus owned rows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationDetails {
    pub reservation: Reservation,
    pub rooms: Vec<ReservationRoom>,
    pub room_type_requests: Vec<RoomTypeRequest>,
    pub articles: Vec<ReservationArticle>,
    pub status_log: Vec<StatusLogEntry>,
}

/// Reservation lifecycle service
pub struct ReservationManager<C, R, S>
where
    C: CatalogRepository,
    R: ReservationRepository,
    S: SequenceStore,
{
    catalog: Arc<C>,
    reservations: Arc<R>,
    sequences: Arc<SequenceGenerator<S>>,
    pool: PgPool,
    config: BillingConfig,
}

impl<C, R, S> ReservationManager<C, R, S>
where
    C: CatalogRepository,
    R: ReservationRepository,
    S: SequenceStore,
{
    /// Create a new reservation manager
    pub fn new(
        catalog: Arc<C>,
        reservations: Arc<R>,
        sequences: Arc<SequenceGenerator<S>>,
        pool: PgPool,
        config: BillingConfig,
    ) -> Self {
        Self {
            catalog,
            reservations,
            sequences,
            pool,
            config,
        }
    }

    /// Create a reservation.
    ///
    /// Validates dates, guest, rate plan, and capacity, then inside one
    /// transaction locks the selected rooms, re-checks availability, and
    /// inserts the reservation with its rooms, requests, article lines,
    /// and initial status log entry. Room side-effects of the initial
    /// status (e.g. direct check-in) apply in the same transaction.
    #[instrument(skip(self, input))]
    pub async fn create(&self, input: NewReservation) -> AppResult<CreatedReservation> {
        validate_stay_dates(input.check_in_date, input.check_out_date)?;

        let status = input.status.unwrap_or_default();
        let plan = self.load_plan(input.rate_plan_id).await?;
        let currency = self.resolve_currency(input.currency.as_deref(), plan.as_ref())?;

        let guest_id = match &input.guest {
            GuestInput::Existing(id) => {
                self.catalog
                    .find_guest(*id)
                    .await?
                    .ok_or_else(|| AppError::GuestNotFound(id.to_string()))?;
                *id
            }
            GuestInput::New {
                first_name,
                last_name,
                ..
            } => {
                if first_name.trim().is_empty() || last_name.trim().is_empty() {
                    return Err(AppError::Validation(
                        "guest first and last name are required".to_string(),
                    ));
                }
                Uuid::new_v4()
            }
        };

        let room_bundle = self.load_room_bundle(&input.rooms).await?;
        let type_requests = self.load_type_requests(&input.room_type_requests).await?;

        let guest_count = input.adults.max(0) + input.children.max(0);
        let units = capacity_units(&room_bundle, &type_requests);
        validate_capacity(guest_count, &units)?;

        let reservation_id = Uuid::new_v4();
        let nights = (input.check_out_date - input.check_in_date).num_days().max(0);

        let rooms = assigned_rooms(
            reservation_id,
            &input.rooms,
            &room_bundle,
            plan.as_ref(),
            &currency,
        )?;
        let articles = self
            .build_article_lines(
                reservation_id,
                &input.articles,
                nights,
                guest_count,
                rooms.len().max(1) as i64,
            )
            .await?;
        let total_amount = estimated_total(&rooms, nights, &articles);

        // The counter advances in its own short transaction; a rollback
        // below leaves a gap in the series, never a duplicate.
        let confirmation_number = self.sequences.confirmation_number().await?;

        let mut tx = begin(&self.pool).await?;

        if let GuestInput::New {
            first_name,
            last_name,
            email,
            phone,
        } = &input.guest
        {
            insert_guest(&mut tx, guest_id, first_name, last_name, email, phone).await?;
        }

        let room_ids: Vec<Uuid> = rooms.iter().map(|r| r.room_id).collect();
        lock_rooms(&mut tx, &room_ids).await?;
        assert_rooms_free(
            &mut tx,
            &room_ids,
            input.check_in_date,
            input.check_out_date,
            None,
        )
        .await?;

        sqlx::query(
            r#"
            INSERT INTO reservations
                (id, confirmation_number, guest_id, status,
                 check_in_date, check_out_date, adults, children,
                 rate_plan_id, total_amount, currency, notes,
                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, NOW(), NOW())
            "#,
        )
        .bind(reservation_id)
        .bind(&confirmation_number)
        .bind(guest_id)
        .bind(status.to_string())
        .bind(input.check_in_date)
        .bind(input.check_out_date)
        .bind(input.adults)
        .bind(input.children)
        .bind(input.rate_plan_id)
        .bind(total_amount)
        .bind(&currency)
        .bind(&input.notes)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            error!("Failed to insert reservation: {}", e);
            AppError::Database(format!("Failed to insert reservation: {}", e))
        })?;

        insert_reservation_rooms(&mut tx, &rooms).await?;
        insert_type_requests(&mut tx, reservation_id, &type_requests).await?;
        insert_article_lines(&mut tx, &articles).await?;

        log_status(&mut tx, reservation_id, status, None, None).await?;
        apply_status_side_effects(&mut tx, reservation_id, status).await?;

        commit(tx).await?;

        info!(
            "Created reservation {} ({}) for {} nights",
            reservation_id, confirmation_number, nights
        );

        Ok(CreatedReservation {
            id: reservation_id,
            confirmation_number,
        })
    }

    /// Modify a reservation.
    ///
    /// Merges the supplied fields over the stored reservation, re-validates
    /// dates and capacity against the merged state, and re-checks room
    /// availability (ignoring the reservation's own assignments). Article
    /// lines are re-derived so quantity-bearing schemes follow date and
    /// guest-count changes.
    #[instrument(skip(self, input))]
    pub async fn update(&self, id: Uuid, input: ReservationUpdate) -> AppResult<Reservation> {
        let mut reservation = self
            .reservations
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::ReservationNotFound(id.to_string()))?;

        if let Some(check_in) = input.check_in_date {
            reservation.check_in_date = check_in;
        }
        if let Some(check_out) = input.check_out_date {
            reservation.check_out_date = check_out;
        }
        validate_stay_dates(reservation.check_in_date, reservation.check_out_date)?;

        if let Some(adults) = input.adults {
            reservation.adults = adults;
        }
        if let Some(children) = input.children {
            reservation.children = children;
        }
        if let Some(plan_id) = input.rate_plan_id {
            reservation.rate_plan_id = Some(plan_id);
        }
        if let Some(notes) = input.notes {
            reservation.notes = Some(notes);
        }

        let plan = self.load_plan(reservation.rate_plan_id).await?;
        if let Some(currency) = input.currency.as_deref() {
            reservation.currency = normalize_currency(currency)?;
        }

        // Room set: replaced wholesale when supplied, otherwise kept
        let selections: Vec<RoomSelection> = match &input.rooms {
            Some(rooms) => rooms.clone(),
            None => self
                .reservations
                .rooms(id)
                .await?
                .into_iter()
                .map(|r| RoomSelection {
                    room_id: r.room_id,
                    nightly_rate: r.nightly_rate,
                    currency: Some(r.currency),
                })
                .collect(),
        };
        let room_bundle = self.load_room_bundle(&selections).await?;

        let type_requests = match &input.room_type_requests {
            Some(requests) => self.load_type_requests(requests).await?,
            None => {
                let stored = self.reservations.room_type_requests(id).await?;
                let inputs: Vec<RoomTypeRequestInput> = stored
                    .iter()
                    .map(|r| RoomTypeRequestInput {
                        room_type_id: r.room_type_id,
                        quantity: r.quantity,
                    })
                    .collect();
                self.load_type_requests(&inputs).await?
            }
        };

        let guest_count = reservation.guest_count();
        let units = capacity_units(&room_bundle, &type_requests);
        validate_capacity(guest_count, &units)?;

        let nights = reservation.nights();
        let rooms = assigned_rooms(
            id,
            &selections,
            &room_bundle,
            plan.as_ref(),
            &reservation.currency,
        )?;

        let articles = match &input.articles {
            Some(selections) => {
                self.build_article_lines(
                    id,
                    selections,
                    nights,
                    guest_count,
                    rooms.len().max(1) as i64,
                )
                .await?
            }
            None => {
                let mut stored = self.reservations.articles(id).await?;
                for line in &mut stored {
                    line.recalculate(nights, guest_count, rooms.len().max(1) as i64);
                }
                stored
            }
        };

        reservation.total_amount = estimated_total(&rooms, nights, &articles);
        let new_status = apply_requested_status(&mut reservation, input.status);

        let mut tx = begin(&self.pool).await?;

        let room_ids: Vec<Uuid> = rooms.iter().map(|r| r.room_id).collect();
        lock_rooms(&mut tx, &room_ids).await?;
        assert_rooms_free(
            &mut tx,
            &room_ids,
            reservation.check_in_date,
            reservation.check_out_date,
            Some(id),
        )
        .await?;

        sqlx::query(
            r#"
            UPDATE reservations
            SET status = $2, check_in_date = $3, check_out_date = $4,
                adults = $5, children = $6, rate_plan_id = $7,
                total_amount = $8, currency = $9, notes = $10,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(reservation.status.to_string())
        .bind(reservation.check_in_date)
        .bind(reservation.check_out_date)
        .bind(reservation.adults)
        .bind(reservation.children)
        .bind(reservation.rate_plan_id)
        .bind(reservation.total_amount)
        .bind(&reservation.currency)
        .bind(&reservation.notes)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            error!("Failed to update reservation {}: {}", id, e);
            AppError::Database(format!("Failed to update reservation: {}", e))
        })?;

        replace_owned_rows(&mut tx, id, &rooms, &type_requests, &articles).await?;

        if let Some(status) = new_status {
            log_status(&mut tx, id, status, None, None).await?;
            apply_status_side_effects(&mut tx, id, status).await?;
        }

        commit(tx).await?;

        reservation.updated_at = Utc::now();
        info!("Updated reservation {}", id);
        Ok(reservation)
    }

    /// Change a reservation's status.
    ///
    /// Any recognized status may be set from any other; the transition is
    /// logged and room side-effects (occupy, send to cleaning, release)
    /// apply in the same transaction.
    #[instrument(skip(self))]
    pub async fn change_status(
        &self,
        id: Uuid,
        status: ReservationStatus,
        notes: Option<String>,
        recorded_by: Option<String>,
    ) -> AppResult<Reservation> {
        let mut reservation = self
            .reservations
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::ReservationNotFound(id.to_string()))?;

        debug!(
            "Changing reservation {} status: {} -> {}",
            id, reservation.status, status
        );

        let mut tx = begin(&self.pool).await?;

        sqlx::query("UPDATE reservations SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(status.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                error!("Failed to update reservation status: {}", e);
                AppError::Database(format!("Failed to update reservation status: {}", e))
            })?;

        log_status(&mut tx, id, status, notes, recorded_by).await?;
        apply_status_side_effects(&mut tx, id, status).await?;

        commit(tx).await?;

        reservation.status = status;
        reservation.updated_at = Utc::now();
        info!("Reservation {} is now {}", id, status);
        Ok(reservation)
    }

    /// Load a reservation with all of its owned rows
    #[instrument(skip(self))]
    pub async fn details(&self, id: Uuid) -> AppResult<ReservationDetails> {
        let reservation = self
            .reservations
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::ReservationNotFound(id.to_string()))?;

        Ok(ReservationDetails {
            rooms: self.reservations.rooms(id).await?,
            room_type_requests: self.reservations.room_type_requests(id).await?,
            articles: self.reservations.articles(id).await?,
            status_log: self.reservations.status_log(id).await?,
            reservation,
        })
    }

    async fn load_plan(&self, plan_id: Option<Uuid>) -> AppResult<Option<RatePlan>> {
        match plan_id {
            Some(id) => {
                let plan = self
                    .catalog
                    .find_rate_plan(id)
                    .await?
                    .ok_or_else(|| AppError::RatePlanNotFound(id.to_string()))?;
                Ok(Some(plan))
            }
            None => Ok(None),
        }
    }

    fn resolve_currency(
        &self,
        explicit: Option<&str>,
        plan: Option<&RatePlan>,
    ) -> AppResult<String> {
        let code = explicit
            .map(str::to_string)
            .or_else(|| plan.map(|p| p.currency.clone()))
            .unwrap_or_else(|| self.config.default_currency.clone());
        normalize_currency(&code)
    }

    /// Load the selected rooms together with their room types
    async fn load_room_bundle(
        &self,
        selections: &[RoomSelection],
    ) -> AppResult<Vec<(Room, RoomType)>> {
        if selections.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = selections.iter().map(|s| s.room_id).collect();
        let found = self.catalog.find_rooms(&ids).await?;
        let by_id: HashMap<Uuid, Room> = found.into_iter().map(|r| (r.id, r)).collect();

        let mut types: HashMap<Uuid, RoomType> = HashMap::new();
        let mut bundle = Vec::with_capacity(selections.len());
        for selection in selections {
            let room = by_id
                .get(&selection.room_id)
                .cloned()
                .ok_or_else(|| AppError::RoomNotFound(selection.room_id.to_string()))?;

            let room_type = match types.get(&room.room_type_id) {
                Some(rt) => rt.clone(),
                None => {
                    let rt = self
                        .catalog
                        .find_room_type(room.room_type_id)
                        .await?
                        .ok_or_else(|| {
                            AppError::RoomTypeNotFound(room.room_type_id.to_string())
                        })?;
                    types.insert(rt.id, rt.clone());
                    rt
                }
            };
            bundle.push((room, room_type));
        }

        Ok(bundle)
    }

    async fn load_type_requests(
        &self,
        requests: &[RoomTypeRequestInput],
    ) -> AppResult<Vec<(RoomType, i32)>> {
        let mut loaded = Vec::with_capacity(requests.len());
        for request in requests {
            let room_type = self
                .catalog
                .find_room_type(request.room_type_id)
                .await?
                .ok_or_else(|| AppError::RoomTypeNotFound(request.room_type_id.to_string()))?;
            loaded.push((room_type, request.quantity));
        }
        Ok(loaded)
    }

    /// Materialize article lines from selections, computing quantity and
    /// total from each article's charge scheme.
    async fn build_article_lines(
        &self,
        reservation_id: Uuid,
        selections: &[ArticleSelection],
        nights: i64,
        guests: i32,
        rooms: i64,
    ) -> AppResult<Vec<ReservationArticle>> {
        let mut lines = Vec::with_capacity(selections.len());
        for selection in selections {
            let article = self
                .catalog
                .find_article(selection.article_id)
                .await?
                .ok_or_else(|| AppError::ArticleNotFound(selection.article_id.to_string()))?;

            if !article.is_active {
                return Err(AppError::Validation(format!(
                    "article {} is no longer offered",
                    article.name
                )));
            }

            let mut line = ReservationArticle {
                id: Uuid::new_v4(),
                reservation_id,
                article_id: article.id,
                description: article.name.clone(),
                charge_scheme: article.charge_scheme,
                unit_price: article.unit_price,
                tax_rate: article.tax_rate,
                multiplier: selection.multiplier.unwrap_or(Decimal::ONE),
                quantity: Decimal::ZERO,
                total: Decimal::ZERO,
            };
            line.recalculate(nights, guests, rooms);
            lines.push(line);
        }
        Ok(lines)
    }
}

/// Capacity units for the validator: each concrete room counts its type's
/// max occupancy once, each type request counts it `quantity` times.
fn capacity_units(
    rooms: &[(Room, RoomType)],
    type_requests: &[(RoomType, i32)],
) -> Vec<CapacityUnit> {
    let mut units = Vec::with_capacity(rooms.len() + type_requests.len());
    for (room, room_type) in rooms {
        units.push(CapacityUnit::room(
            room.room_number.clone(),
            room_type.max_occupancy,
        ));
    }
    for (room_type, quantity) in type_requests {
        units.push(CapacityUnit::room_type(
            room_type.name.clone(),
            room_type.max_occupancy,
            *quantity,
        ));
    }
    units
}

/// Resolve the nightly rate for one room assignment: explicit override,
/// then the rate plan's base price, then the room type's base rate.
fn resolve_nightly_rate(
    selection: &RoomSelection,
    plan: Option<&RatePlan>,
    room_type: &RoomType,
) -> Option<Decimal> {
    selection
        .nightly_rate
        .or_else(|| plan.map(|p| p.base_price))
        .or(room_type.base_rate)
}

/// Build the reservation_rooms rows from selections and the loaded bundle
fn assigned_rooms(
    reservation_id: Uuid,
    selections: &[RoomSelection],
    bundle: &[(Room, RoomType)],
    plan: Option<&RatePlan>,
    reservation_currency: &str,
) -> AppResult<Vec<ReservationRoom>> {
    selections
        .iter()
        .zip(bundle)
        .map(|(selection, (room, room_type))| {
            let currency = match selection.currency.as_deref() {
                Some(code) => normalize_currency(code)?,
                None => reservation_currency.to_string(),
            };
            Ok(ReservationRoom {
                id: Uuid::new_v4(),
                reservation_id,
                room_id: room.id,
                nightly_rate: resolve_nightly_rate(selection, plan, room_type),
                currency,
            })
        })
        .collect()
}

/// Estimated stay total: room nights plus article line totals. None when
/// any room lacks a resolvable rate.
fn estimated_total(
    rooms: &[ReservationRoom],
    nights: i64,
    articles: &[ReservationArticle],
) -> Option<Decimal> {
    let nights = Decimal::from(nights.max(0));
    let mut total = Decimal::ZERO;
    for room in rooms {
        total += room.nightly_rate? * nights;
    }
    for line in articles {
        total += line.total;
    }
    Some(total)
}

/// Apply a requested status to the reservation, returning the status to
/// log. A value equal to the stored status still logs and re-applies its
/// room side-effects, the same as the status endpoint.
fn apply_requested_status(
    reservation: &mut Reservation,
    requested: Option<ReservationStatus>,
) -> Option<ReservationStatus> {
    if let Some(status) = requested {
        reservation.status = status;
    }
    requested
}

async fn begin(pool: &PgPool) -> AppResult<Transaction<'static, Postgres>> {
    pool.begin().await.map_err(|e| {
        error!("Failed to start transaction: {}", e);
        AppError::Transaction(format!("Failed to start transaction: {}", e))
    })
}

async fn commit(tx: Transaction<'static, Postgres>) -> AppResult<()> {
    tx.commit().await.map_err(|e| {
        error!("Failed to commit transaction: {}", e);
        AppError::Transaction(format!("Failed to commit transaction: {}", e))
    })
}

/// Lock the given room rows for the rest of the transaction. Ordered so
/// two transactions locking overlapping sets cannot deadlock.
async fn lock_rooms(tx: &mut Transaction<'static, Postgres>, room_ids: &[Uuid]) -> AppResult<()> {
    if room_ids.is_empty() {
        return Ok(());
    }
    let mut sorted = room_ids.to_vec();
    sorted.sort_unstable();

    sqlx::query("SELECT id FROM rooms WHERE id = ANY($1) ORDER BY id FOR UPDATE")
        .bind(&sorted)
        .fetch_all(&mut **tx)
        .await
        .map_err(|e| {
            error!("Failed to lock rooms: {}", e);
            AppError::Database(format!("Failed to lock rooms: {}", e))
        })?;
    Ok(())
}

/// Availability check under the room locks: any live reservation whose
/// stay overlaps `[check_in, check_out)` on one of the rooms blocks the
/// write. Cancelled and no-show reservations do not block.
async fn assert_rooms_free(
    tx: &mut Transaction<'static, Postgres>,
    room_ids: &[Uuid],
    check_in: NaiveDate,
    check_out: NaiveDate,
    exclude_reservation: Option<Uuid>,
) -> AppResult<()> {
    if room_ids.is_empty() {
        return Ok(());
    }

    let conflict: Option<(String,)> = sqlx::query_as(
        r#"
        SELECT rm.room_number
        FROM reservations r
        JOIN reservation_rooms rr ON rr.reservation_id = r.id
        JOIN rooms rm ON rm.id = rr.room_id
        WHERE rr.room_id = ANY($1)
          AND r.status NOT IN ('cancelled', 'no_show')
          AND ($2::uuid IS NULL OR r.id <> $2)
          AND NOT (r.check_out_date <= $3 OR r.check_in_date >= $4)
        LIMIT 1
        "#,
    )
    .bind(room_ids)
    .bind(exclude_reservation)
    .bind(check_in)
    .bind(check_out)
    .fetch_optional(&mut **tx)
    .await
    .map_err(|e| {
        error!("Failed to check room availability: {}", e);
        AppError::Database(format!("Failed to check room availability: {}", e))
    })?;

    match conflict {
        Some((room_number,)) => Err(AppError::RoomUnavailable(room_number)),
        None => Ok(()),
    }
}

async fn insert_guest(
    tx: &mut Transaction<'static, Postgres>,
    id: Uuid,
    first_name: &str,
    last_name: &str,
    email: &Option<String>,
    phone: &Option<String>,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO guests (id, first_name, last_name, email, phone, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, NOW(), NOW())
        "#,
    )
    .bind(id)
    .bind(first_name)
    .bind(last_name)
    .bind(email)
    .bind(phone)
    .execute(&mut **tx)
    .await
    .map_err(|e| {
        error!("Failed to insert guest: {}", e);
        AppError::Database(format!("Failed to insert guest: {}", e))
    })?;
    Ok(())
}

async fn insert_reservation_rooms(
    tx: &mut Transaction<'static, Postgres>,
    rooms: &[ReservationRoom],
) -> AppResult<()> {
    for room in rooms {
        sqlx::query(
            r#"
            INSERT INTO reservation_rooms (id, reservation_id, room_id, nightly_rate, currency)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(room.id)
        .bind(room.reservation_id)
        .bind(room.room_id)
        .bind(room.nightly_rate)
        .bind(&room.currency)
        .execute(&mut **tx)
        .await
        .map_err(|e| {
            error!("Failed to insert reservation room: {}", e);
            AppError::Database(format!("Failed to insert reservation room: {}", e))
        })?;
    }
    Ok(())
}

async fn insert_type_requests(
    tx: &mut Transaction<'static, Postgres>,
    reservation_id: Uuid,
    requests: &[(RoomType, i32)],
) -> AppResult<()> {
    for (room_type, quantity) in requests {
        sqlx::query(
            r#"
            INSERT INTO reservation_room_requests (id, reservation_id, room_type_id, quantity)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(reservation_id)
        .bind(room_type.id)
        .bind(quantity)
        .execute(&mut **tx)
        .await
        .map_err(|e| {
            error!("Failed to insert room-type request: {}", e);
            AppError::Database(format!("Failed to insert room-type request: {}", e))
        })?;
    }
    Ok(())
}

async fn insert_article_lines(
    tx: &mut Transaction<'static, Postgres>,
    lines: &[ReservationArticle],
) -> AppResult<()> {
    for line in lines {
        sqlx::query(
            r#"
            INSERT INTO reservation_articles
                (id, reservation_id, article_id, description, charge_scheme,
                 unit_price, tax_rate, multiplier, quantity, total)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(line.id)
        .bind(line.reservation_id)
        .bind(line.article_id)
        .bind(&line.description)
        .bind(line.charge_scheme.to_string())
        .bind(line.unit_price)
        .bind(line.tax_rate)
        .bind(line.multiplier)
        .bind(line.quantity)
        .bind(line.total)
        .execute(&mut **tx)
        .await
        .map_err(|e| {
            error!("Failed to insert article line: {}", e);
            AppError::Database(format!("Failed to insert article line: {}", e))
        })?;
    }
    Ok(())
}

/// Replace a reservation's owned rows wholesale
async fn replace_owned_rows(
    tx: &mut Transaction<'static, Postgres>,
    reservation_id: Uuid,
    rooms: &[ReservationRoom],
    requests: &[(RoomType, i32)],
    articles: &[ReservationArticle],
) -> AppResult<()> {
    for table in [
        "reservation_rooms",
        "reservation_room_requests",
        "reservation_articles",
    ] {
        sqlx::query(&format!("DELETE FROM {} WHERE reservation_id = $1", table))
            .bind(reservation_id)
            .execute(&mut **tx)
            .await
            .map_err(|e| {
                error!("Failed to clear {}: {}", table, e);
                AppError::Database(format!("Failed to clear {}: {}", table, e))
            })?;
    }

    insert_reservation_rooms(tx, rooms).await?;
    insert_type_requests(tx, reservation_id, requests).await?;
    insert_article_lines(tx, articles).await?;
    Ok(())
}

/// Append a status log entry
pub(crate) async fn log_status(
    tx: &mut Transaction<'static, Postgres>,
    reservation_id: Uuid,
    status: ReservationStatus,
    notes: Option<String>,
    recorded_by: Option<String>,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO reservation_status_log
            (id, reservation_id, status, notes, recorded_by, created_at)
        VALUES ($1, $2, $3, $4, $5, NOW())
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(reservation_id)
    .bind(status.to_string())
    .bind(notes)
    .bind(recorded_by)
    .execute(&mut **tx)
    .await
    .map_err(|e| {
        error!("Failed to insert status log entry: {}", e);
        AppError::Database(format!("Failed to insert status log entry: {}", e))
    })?;
    Ok(())
}

/// Apply the room side-effects of a status, if it has any: the assigned
/// rooms move to the mapped housekeeping state and the move is recorded in
/// the housekeeping log.
pub(crate) async fn apply_status_side_effects(
    tx: &mut Transaction<'static, Postgres>,
    reservation_id: Uuid,
    status: ReservationStatus,
) -> AppResult<()> {
    let Some(room_status) = status.room_status_effect() else {
        return Ok(());
    };

    sqlx::query(
        r#"
        UPDATE rooms
        SET status = $2, updated_at = NOW()
        WHERE id IN (SELECT room_id FROM reservation_rooms WHERE reservation_id = $1)
        "#,
    )
    .bind(reservation_id)
    .bind(room_status.to_string())
    .execute(&mut **tx)
    .await
    .map_err(|e| {
        error!("Failed to update room statuses: {}", e);
        AppError::Database(format!("Failed to update room statuses: {}", e))
    })?;

    sqlx::query(
        r#"
        INSERT INTO housekeeping_log (id, room_id, status, reservation_id, created_at)
        SELECT gen_random_uuid(), rr.room_id, $2, rr.reservation_id, NOW()
        FROM reservation_rooms rr
        WHERE rr.reservation_id = $1
        "#,
    )
    .bind(reservation_id)
    .bind(room_status.to_string())
    .execute(&mut **tx)
    .await
    .map_err(|e| {
        error!("Failed to insert housekeeping log entries: {}", e);
        AppError::Database(format!("Failed to insert housekeeping log entries: {}", e))
    })?;

    debug!(
        "Rooms of reservation {} moved to {}",
        reservation_id, room_status
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use innkeep_core::models::ChargeScheme;
    use rust_decimal_macros::dec;

    fn room_type(name: &str, max_occupancy: i32, base_rate: Option<Decimal>) -> RoomType {
        let now = Utc::now();
        RoomType {
            id: Uuid::new_v4(),
            name: name.to_string(),
            base_occupancy: 2,
            max_occupancy,
            currency: "EUR".to_string(),
            base_rate,
            created_at: now,
            updated_at: now,
        }
    }

    fn room(number: &str, room_type_id: Uuid) -> Room {
        let now = Utc::now();
        Room {
            id: Uuid::new_v4(),
            room_number: number.to_string(),
            room_type_id,
            status: Default::default(),
            created_at: now,
            updated_at: now,
        }
    }

    fn reservation(status: ReservationStatus) -> Reservation {
        let now = Utc::now();
        Reservation {
            id: Uuid::new_v4(),
            confirmation_number: "RES-001000".to_string(),
            guest_id: Uuid::new_v4(),
            status,
            check_in_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            check_out_date: NaiveDate::from_ymd_opt(2024, 6, 4).unwrap(),
            adults: 2,
            children: 0,
            rate_plan_id: None,
            total_amount: None,
            currency: "EUR".to_string(),
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn plan(base_price: Decimal) -> RatePlan {
        let now = Utc::now();
        RatePlan {
            id: Uuid::new_v4(),
            name: "Flexible".to_string(),
            base_price,
            currency: "EUR".to_string(),
            cancellation_policy_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_capacity_units_mix_rooms_and_requests() {
        let rt = room_type("Double", 3, None);
        let rooms = vec![(room("101", rt.id), rt.clone())];
        let requests = vec![(room_type("Twin", 2, None), 2)];

        let units = capacity_units(&rooms, &requests);
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].label, "101");
        assert_eq!(units[0].capacity, 3);
        assert_eq!(units[0].quantity, 1);
        assert_eq!(units[1].label, "Twin");
        assert_eq!(units[1].quantity, 2);

        // 3 + 2*2 = 7 sleeps 7, not 8
        assert!(validate_capacity(7, &units).is_ok());
        assert!(validate_capacity(8, &units).is_err());
    }

    #[test]
    fn test_nightly_rate_precedence() {
        let rt_with_rate = room_type("Double", 2, Some(dec!(70)));
        let p = plan(dec!(90));

        let explicit = RoomSelection {
            room_id: Uuid::new_v4(),
            nightly_rate: Some(dec!(110)),
            currency: None,
        };
        let bare = RoomSelection::by_id(Uuid::new_v4());

        // Explicit override beats the plan
        assert_eq!(
            resolve_nightly_rate(&explicit, Some(&p), &rt_with_rate),
            Some(dec!(110))
        );
        // Plan beats the room type's base rate
        assert_eq!(
            resolve_nightly_rate(&bare, Some(&p), &rt_with_rate),
            Some(dec!(90))
        );
        // No plan falls back to the room type
        assert_eq!(
            resolve_nightly_rate(&bare, None, &rt_with_rate),
            Some(dec!(70))
        );
        // Nothing resolvable
        let rt_bare = room_type("Single", 1, None);
        assert_eq!(resolve_nightly_rate(&bare, None, &rt_bare), None);
    }

    #[test]
    fn test_assigned_rooms_normalize_currency() {
        let rt = room_type("Double", 2, Some(dec!(70)));
        let r = room("101", rt.id);
        let selection = RoomSelection {
            room_id: r.id,
            nightly_rate: None,
            currency: Some("usd".to_string()),
        };
        let bundle = vec![(r, rt)];

        let rooms =
            assigned_rooms(Uuid::new_v4(), &[selection], &bundle, None, "EUR").unwrap();
        assert_eq!(rooms[0].currency, "USD");
        assert_eq!(rooms[0].nightly_rate, Some(dec!(70)));
    }

    #[test]
    fn test_assigned_rooms_reject_bad_currency() {
        let rt = room_type("Double", 2, None);
        let r = room("101", rt.id);
        let selection = RoomSelection {
            room_id: r.id,
            nightly_rate: None,
            currency: Some("EURO".to_string()),
        };
        let bundle = vec![(r, rt)];

        assert!(matches!(
            assigned_rooms(Uuid::new_v4(), &[selection], &bundle, None, "EUR"),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_estimated_total_sums_rooms_and_articles() {
        let reservation_id = Uuid::new_v4();
        let rooms = vec![
            ReservationRoom {
                id: Uuid::new_v4(),
                reservation_id,
                room_id: Uuid::new_v4(),
                nightly_rate: Some(dec!(80)),
                currency: "EUR".to_string(),
            },
            ReservationRoom {
                id: Uuid::new_v4(),
                reservation_id,
                room_id: Uuid::new_v4(),
                nightly_rate: Some(dec!(80)),
                currency: "EUR".to_string(),
            },
        ];
        let articles = vec![ReservationArticle {
            id: Uuid::new_v4(),
            reservation_id,
            article_id: Uuid::new_v4(),
            description: "Breakfast".to_string(),
            charge_scheme: ChargeScheme::PerPersonPerDay,
            unit_price: dec!(15),
            tax_rate: dec!(7),
            multiplier: Decimal::ONE,
            quantity: dec!(6),
            total: dec!(90),
        }];

        // 2 rooms x 3 nights x 80 + 90 breakfast
        assert_eq!(estimated_total(&rooms, 3, &articles), Some(dec!(570)));
    }

    #[test]
    fn test_estimated_total_none_when_rate_missing() {
        let rooms = vec![ReservationRoom {
            id: Uuid::new_v4(),
            reservation_id: Uuid::new_v4(),
            room_id: Uuid::new_v4(),
            nightly_rate: None,
            currency: "EUR".to_string(),
        }];
        assert_eq!(estimated_total(&rooms, 3, &[]), None);
    }

    #[test]
    fn test_estimated_total_empty_reservation_is_zero() {
        assert_eq!(estimated_total(&[], 3, &[]), Some(Decimal::ZERO));
    }

    #[test]
    fn test_resent_current_status_is_still_logged() {
        let mut r = reservation(ReservationStatus::CheckedIn);

        let logged = apply_requested_status(&mut r, Some(ReservationStatus::CheckedIn));

        assert_eq!(logged, Some(ReservationStatus::CheckedIn));
        assert_eq!(r.status, ReservationStatus::CheckedIn);
    }

    #[test]
    fn test_requested_status_replaces_and_logs() {
        let mut r = reservation(ReservationStatus::Confirmed);

        let logged = apply_requested_status(&mut r, Some(ReservationStatus::CheckedIn));

        assert_eq!(logged, Some(ReservationStatus::CheckedIn));
        assert_eq!(r.status, ReservationStatus::CheckedIn);
    }

    #[test]
    fn test_absent_status_logs_nothing() {
        let mut r = reservation(ReservationStatus::Confirmed);

        assert_eq!(apply_requested_status(&mut r, None), None);
        assert_eq!(r.status, ReservationStatus::Confirmed);
    }
}
