//! Invoice and payment service
//!
//! Builds invoices from a reservation's rooms and article lines, issues
//! correction documents that reverse a parent invoice, and records
//! payments. Invoice items are immutable snapshots: once issued, later
//! reservation edits never change the document. Paying an already-paid
//! reservation is an informational no-op, never a double charge.

use chrono::{DateTime, NaiveDate, Utc};
use innkeep_core::{
    config::BillingConfig,
    models::{
        correction_items, invoice_totals, Invoice, InvoiceItem, InvoiceStatus, InvoiceType,
        Payment, RatePlan, ReservationStatus,
    },
    traits::{CatalogRepository, InvoiceRepository, ReservationRepository, SequenceStore},
    AppError, AppResult,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use std::sync::Arc;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use crate::constants::DEFAULT_PAYMENT_METHOD;
use crate::reservation_manager::{apply_status_side_effects, log_status};
use crate::sequences::SequenceGenerator;

/// One explicit invoice line supplied by the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceItemInput {
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub tax_rate: Decimal,
}

/// Input for invoice creation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvoiceRequest {
    /// Document type; defaults to a regular invoice
    #[serde(default)]
    pub invoice_type: InvoiceType,

    /// Parent document; required for corrections
    pub parent_invoice_id: Option<Uuid>,

    /// Explicit lines; when absent, lines derive from the reservation
    /// (or, for corrections, from the parent document)
    pub items: Option<Vec<InvoiceItemInput>>,

    /// Whether derived invoices include the reservation's article lines
    #[serde(default = "default_include_articles")]
    pub include_articles: bool,

    /// Issue date; defaults to today
    pub issue_date: Option<NaiveDate>,

    /// Due date, if any
    pub due_date: Option<NaiveDate>,

    /// Initial document status; defaults to issued
    pub status: Option<InvoiceStatus>,
}

fn default_include_articles() -> bool {
    true
}

/// Input for payment recording; absent fields take invoice defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentRequest {
    /// Paid amount; defaults to the invoice total
    pub amount: Option<Decimal>,
    pub method: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub currency: Option<String>,
    pub reference: Option<String>,
    pub notes: Option<String>,
}

/// An invoice header with its items
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceDocument {
    pub invoice: Invoice,
    pub items: Vec<InvoiceItem>,
}

/// Result of a payment attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayOutcome {
    pub invoice: Invoice,
    /// The recorded payment; absent when the invoice was already paid
    pub payment: Option<Payment>,
    pub already_paid: bool,
    pub message: String,
}

/// Invoice and payment service
pub struct BillingService<C, R, I, S>
where
    C: CatalogRepository,
    R: ReservationRepository,
    I: InvoiceRepository,
    S: SequenceStore,
{
    catalog: Arc<C>,
    reservations: Arc<R>,
    invoices: Arc<I>,
    sequences: Arc<SequenceGenerator<S>>,
    pool: PgPool,
    config: BillingConfig,
}

impl<C, R, I, S> BillingService<C, R, I, S>
where
    C: CatalogRepository,
    R: ReservationRepository,
    I: InvoiceRepository,
    S: SequenceStore,
{
    /// Create a new billing service
    pub fn new(
        catalog: Arc<C>,
        reservations: Arc<R>,
        invoices: Arc<I>,
        sequences: Arc<SequenceGenerator<S>>,
        pool: PgPool,
        config: BillingConfig,
    ) -> Self {
        Self {
            catalog,
            reservations,
            invoices,
            sequences,
            pool,
            config,
        }
    }

    /// Create an invoice (or correction) for a reservation.
    ///
    /// Regular invoices derive their lines from the reservation's room
    /// assignments and article lines unless explicit items are supplied.
    /// Corrections reverse their parent document by negating quantities.
    /// Header and items insert in one transaction.
    #[instrument(skip(self, request))]
    pub async fn create_invoice(
        &self,
        reservation_id: Uuid,
        request: InvoiceRequest,
    ) -> AppResult<InvoiceDocument> {
        let reservation = self
            .reservations
            .find_by_id(reservation_id)
            .await?
            .ok_or_else(|| AppError::ReservationNotFound(reservation_id.to_string()))?;

        let invoice_id = Uuid::new_v4();

        let (invoice_number, parent_invoice_id, items) = match request.invoice_type {
            InvoiceType::Correction => {
                let parent_id = request.parent_invoice_id.ok_or_else(|| {
                    AppError::Validation(
                        "a correction requires a parent invoice".to_string(),
                    )
                })?;
                let parent = self
                    .invoices
                    .find_by_id(parent_id)
                    .await?
                    .ok_or_else(|| AppError::InvoiceNotFound(parent_id.to_string()))?;
                if parent.reservation_id != reservation_id {
                    return Err(AppError::Validation(format!(
                        "invoice {} does not belong to reservation {}",
                        parent.invoice_number, reservation_id
                    )));
                }

                let items = match &request.items {
                    Some(inputs) => items_from_inputs(invoice_id, inputs)?,
                    None => {
                        let parent_items = self.invoices.items(parent_id).await?;
                        correction_items(&parent_items, invoice_id)
                    }
                };
                (
                    self.sequences.correction_number().await?,
                    Some(parent_id),
                    items,
                )
            }
            InvoiceType::Invoice => {
                let items = match &request.items {
                    Some(inputs) => items_from_inputs(invoice_id, inputs)?,
                    None => {
                        let mut items = self.derive_room_items(invoice_id, &reservation).await?;
                        if request.include_articles {
                            let articles = self.reservations.articles(reservation_id).await?;
                            items.extend(article_items(
                                invoice_id,
                                items.len() as i32 + 1,
                                &articles,
                            ));
                        }
                        if items.is_empty() {
                            return Err(AppError::Validation(
                                "reservation has nothing to invoice".to_string(),
                            ));
                        }
                        items
                    }
                };
                (self.sequences.invoice_number().await?, None, items)
            }
        };

        let totals = invoice_totals(&items);
        let invoice = Invoice {
            id: invoice_id,
            reservation_id,
            invoice_number,
            invoice_type: request.invoice_type,
            parent_invoice_id,
            issue_date: request
                .issue_date
                .unwrap_or_else(|| Utc::now().date_naive()),
            due_date: request.due_date,
            total_amount: totals.total,
            tax_amount: totals.tax,
            currency: reservation.currency.clone(),
            status: request.status.unwrap_or_default(),
            created_at: Utc::now(),
        };

        let mut tx = begin(&self.pool).await?;
        insert_invoice(&mut tx, &invoice).await?;
        insert_items(&mut tx, &items).await?;
        commit(tx).await?;

        info!(
            "Created {} {} for reservation {}: total {} {}",
            invoice.invoice_type,
            invoice.invoice_number,
            reservation_id,
            invoice.total_amount,
            invoice.currency
        );

        Ok(InvoiceDocument { invoice, items })
    }

    /// Pay a reservation's most recent invoice.
    ///
    /// Records the payment, marks the invoice paid, and moves the
    /// reservation to `paid` (occupying its rooms) in one transaction.
    /// If the invoice is already paid the call reports that and changes
    /// nothing.
    #[instrument(skip(self, request))]
    pub async fn pay_invoice(
        &self,
        reservation_id: Uuid,
        request: PaymentRequest,
    ) -> AppResult<PayOutcome> {
        let mut invoice = self
            .invoices
            .latest_for_reservation(reservation_id)
            .await?
            .ok_or_else(|| {
                AppError::InvoiceNotFound(format!("no invoice for reservation {}", reservation_id))
            })?;

        if invoice.status == InvoiceStatus::Paid {
            debug!("Invoice {} is already paid", invoice.invoice_number);
            let message = format!("invoice {} is already paid", invoice.invoice_number);
            return Ok(PayOutcome {
                invoice,
                payment: None,
                already_paid: true,
                message,
            });
        }

        let amount = request.amount.unwrap_or(invoice.total_amount);
        if amount <= Decimal::ZERO {
            return Err(AppError::Validation(format!(
                "payment amount must be positive, got {}",
                amount
            )));
        }

        let currency = match request.currency.as_deref() {
            Some(code) => innkeep_core::models::normalize_currency(code)?,
            None => invoice.currency.clone(),
        };

        let payment = Payment {
            id: Uuid::new_v4(),
            invoice_id: invoice.id,
            method: request
                .method
                .unwrap_or_else(|| DEFAULT_PAYMENT_METHOD.to_string()),
            amount,
            currency,
            paid_at: request.paid_at.unwrap_or_else(Utc::now),
            reference: request.reference,
            notes: request.notes,
        };

        let mut tx = begin(&self.pool).await?;

        // The repository read above ran outside the transaction; re-read
        // under a row lock, a concurrent payment may have landed since.
        if lock_invoice_status(&mut tx, invoice.id).await? == InvoiceStatus::Paid {
            debug!("Invoice {} was paid concurrently", invoice.invoice_number);
            invoice.status = InvoiceStatus::Paid;
            let message = format!("invoice {} is already paid", invoice.invoice_number);
            return Ok(PayOutcome {
                invoice,
                payment: None,
                already_paid: true,
                message,
            });
        }

        insert_payment(&mut tx, &payment).await?;

        sqlx::query("UPDATE invoices SET status = 'paid' WHERE id = $1")
            .bind(invoice.id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                error!("Failed to mark invoice paid: {}", e);
                AppError::Database(format!("Failed to mark invoice paid: {}", e))
            })?;

        // Payment cascades to the reservation lifecycle
        sqlx::query("UPDATE reservations SET status = 'paid', updated_at = NOW() WHERE id = $1")
            .bind(reservation_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                error!("Failed to update reservation status: {}", e);
                AppError::Database(format!("Failed to update reservation status: {}", e))
            })?;
        log_status(
            &mut tx,
            reservation_id,
            ReservationStatus::Paid,
            Some(format!("payment on invoice {}", invoice.invoice_number)),
            None,
        )
        .await?;
        apply_status_side_effects(&mut tx, reservation_id, ReservationStatus::Paid).await?;

        commit(tx).await?;

        invoice.status = InvoiceStatus::Paid;
        let message = format!(
            "recorded payment of {} {} on invoice {}",
            payment.amount, payment.currency, invoice.invoice_number
        );
        info!("{}", message);

        Ok(PayOutcome {
            invoice,
            payment: Some(payment),
            already_paid: false,
            message,
        })
    }

    /// Load an invoice with its items
    #[instrument(skip(self))]
    pub async fn document(&self, invoice_id: Uuid) -> AppResult<InvoiceDocument> {
        let invoice = self
            .invoices
            .find_by_id(invoice_id)
            .await?
            .ok_or_else(|| AppError::InvoiceNotFound(invoice_id.to_string()))?;
        let items = self.invoices.items(invoice_id).await?;
        Ok(InvoiceDocument { invoice, items })
    }

    /// List a reservation's invoices, newest first
    #[instrument(skip(self))]
    pub async fn list_for_reservation(&self, reservation_id: Uuid) -> AppResult<Vec<Invoice>> {
        self.invoices.list_for_reservation(reservation_id).await
    }

    /// Build room-night items from the reservation's room assignments
    async fn derive_room_items(
        &self,
        invoice_id: Uuid,
        reservation: &innkeep_core::models::Reservation,
    ) -> AppResult<Vec<InvoiceItem>> {
        let assignments = self.reservations.rooms(reservation.id).await?;
        if assignments.is_empty() {
            return Ok(Vec::new());
        }

        let plan = match reservation.rate_plan_id {
            Some(id) => self.catalog.find_rate_plan(id).await?,
            None => None,
        };
        let nights = reservation.nights().max(1);
        let share = per_room_night_share(
            reservation.total_amount,
            assignments.len() as i64,
            nights,
        );
        let fallback = decimal_from_config(self.config.fallback_nightly_rate)?;
        let vat = decimal_from_config(self.config.room_vat_percent)?;

        let mut items = Vec::with_capacity(assignments.len());
        for (index, assignment) in assignments.iter().enumerate() {
            let room = self
                .catalog
                .find_room(assignment.room_id)
                .await?
                .ok_or_else(|| AppError::RoomNotFound(assignment.room_id.to_string()))?;
            let room_type = self
                .catalog
                .find_room_type(room.room_type_id)
                .await?
                .ok_or_else(|| AppError::RoomTypeNotFound(room.room_type_id.to_string()))?;

            let unit_price =
                room_night_unit_price(assignment.nightly_rate, plan.as_ref(), share, fallback);

            items.push(InvoiceItem {
                id: Uuid::new_v4(),
                invoice_id,
                position: index as i32 + 1,
                description: format!("Room {} ({})", room.room_number, room_type.name),
                quantity: Decimal::from(nights),
                unit_price,
                tax_rate: vat,
            });
        }
        Ok(items)
    }
}

/// Convert a configured f64 amount to Decimal, rejecting non-finite values
fn decimal_from_config(value: f64) -> AppResult<Decimal> {
    Decimal::try_from(value)
        .map_err(|_| AppError::Config(format!("invalid configured amount: {}", value)))
}

/// Per-room-night share of the reservation total, when one exists
fn per_room_night_share(
    total_amount: Option<Decimal>,
    rooms: i64,
    nights: i64,
) -> Option<Decimal> {
    let total = total_amount?;
    if rooms <= 0 || nights <= 0 {
        return None;
    }
    Some(total / Decimal::from(rooms) / Decimal::from(nights))
}

/// Nightly price for a room line: the stored rate, then the plan's base
/// price, then a proportional share of the reservation total, then the
/// configured fallback rate.
fn room_night_unit_price(
    stored_rate: Option<Decimal>,
    plan: Option<&RatePlan>,
    share: Option<Decimal>,
    fallback: Decimal,
) -> Decimal {
    stored_rate
        .or_else(|| plan.map(|p| p.base_price))
        .or(share)
        .unwrap_or(fallback)
}

/// Validate and convert explicit item inputs, assigning positions
fn items_from_inputs(invoice_id: Uuid, inputs: &[InvoiceItemInput]) -> AppResult<Vec<InvoiceItem>> {
    if inputs.is_empty() {
        return Err(AppError::Validation(
            "an invoice requires at least one item".to_string(),
        ));
    }

    inputs
        .iter()
        .enumerate()
        .map(|(index, input)| {
            if input.description.trim().is_empty() {
                return Err(AppError::Validation(format!(
                    "invoice item {} has no description",
                    index + 1
                )));
            }
            Ok(InvoiceItem {
                id: Uuid::new_v4(),
                invoice_id,
                position: index as i32 + 1,
                description: input.description.clone(),
                quantity: input.quantity,
                unit_price: input.unit_price,
                tax_rate: input.tax_rate,
            })
        })
        .collect()
}

/// Invoice items from a reservation's article lines. Lines with nothing
/// to bill (zero quantity or a negative price) are skipped.
fn article_items(
    invoice_id: Uuid,
    start_position: i32,
    articles: &[innkeep_core::models::ReservationArticle],
) -> Vec<InvoiceItem> {
    articles
        .iter()
        .filter(|line| line.quantity > Decimal::ZERO && line.unit_price >= Decimal::ZERO)
        .enumerate()
        .map(|(offset, line)| InvoiceItem {
            id: Uuid::new_v4(),
            invoice_id,
            position: start_position + offset as i32,
            description: line.description.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price,
            tax_rate: line.tax_rate,
        })
        .collect()
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

/// Lock an invoice row for the rest of the transaction and return its
/// current status
async fn lock_invoice_status(
    tx: &mut Transaction<'static, Postgres>,
    invoice_id: Uuid,
) -> AppResult<InvoiceStatus> {
    let status: String = sqlx::query_scalar("SELECT status FROM invoices WHERE id = $1 FOR UPDATE")
        .bind(invoice_id)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| {
            error!("Failed to lock invoice {}: {}", invoice_id, e);
            AppError::Database(format!("Failed to lock invoice: {}", e))
        })?;
    InvoiceStatus::from_str(&status)
        .ok_or_else(|| AppError::Internal(format!("unrecognized invoice status '{}'", status)))
}

async fn insert_invoice(
    tx: &mut Transaction<'static, Postgres>,
    invoice: &Invoice,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO invoices
            (id, reservation_id, invoice_number, invoice_type, parent_invoice_id,
             issue_date, due_date, total_amount, tax_amount, currency, status, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        "#,
    )
    .bind(invoice.id)
    .bind(invoice.reservation_id)
    .bind(&invoice.invoice_number)
    .bind(invoice.invoice_type.to_string())
    .bind(invoice.parent_invoice_id)
    .bind(invoice.issue_date)
    .bind(invoice.due_date)
    .bind(invoice.total_amount)
    .bind(invoice.tax_amount)
    .bind(&invoice.currency)
    .bind(invoice.status.to_string())
    .bind(invoice.created_at)
    .execute(&mut **tx)
    .await
    .map_err(|e| {
        error!("Failed to insert invoice: {}", e);
        AppError::Database(format!("Failed to insert invoice: {}", e))
    })?;
    Ok(())
}

async fn insert_items(
    tx: &mut Transaction<'static, Postgres>,
    items: &[InvoiceItem],
) -> AppResult<()> {
    for item in items {
        sqlx::query(
            r#"
            INSERT INTO invoice_items
                (id, invoice_id, position, description, quantity, unit_price, tax_rate)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(item.id)
        .bind(item.invoice_id)
        .bind(item.position)
        .bind(&item.description)
        .bind(item.quantity)
        .bind(item.unit_price)
        .bind(item.tax_rate)
        .execute(&mut **tx)
        .await
        .map_err(|e| {
            error!("Failed to insert invoice item: {}", e);
            AppError::Database(format!("Failed to insert invoice item: {}", e))
        })?;
    }
    Ok(())
}

async fn insert_payment(
    tx: &mut Transaction<'static, Postgres>,
    payment: &Payment,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO payments
            (id, invoice_id, method, amount, currency, paid_at, reference, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(payment.id)
    .bind(payment.invoice_id)
    .bind(&payment.method)
    .bind(payment.amount)
    .bind(&payment.currency)
    .bind(payment.paid_at)
    .bind(&payment.reference)
    .bind(&payment.notes)
    .execute(&mut **tx)
    .await
    .map_err(|e| {
        error!("Failed to insert payment: {}", e);
        AppError::Database(format!("Failed to insert payment: {}", e))
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use innkeep_core::models::{ChargeScheme, ReservationArticle};
    use rust_decimal_macros::dec;

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
    fn test_room_night_unit_price_precedence() {
        let p = plan(dec!(90));

        assert_eq!(
            room_night_unit_price(Some(dec!(110)), Some(&p), Some(dec!(85)), dec!(80)),
            dec!(110)
        );
        assert_eq!(
            room_night_unit_price(None, Some(&p), Some(dec!(85)), dec!(80)),
            dec!(90)
        );
        assert_eq!(
            room_night_unit_price(None, None, Some(dec!(85)), dec!(80)),
            dec!(85)
        );
        assert_eq!(room_night_unit_price(None, None, None, dec!(80)), dec!(80));
    }

    #[test]
    fn test_per_room_night_share() {
        // 480 total over 2 rooms x 3 nights
        assert_eq!(
            per_room_night_share(Some(dec!(480)), 2, 3),
            Some(dec!(80))
        );
        assert_eq!(per_room_night_share(None, 2, 3), None);
        assert_eq!(per_room_night_share(Some(dec!(480)), 0, 3), None);
    }

    #[test]
    fn test_items_from_inputs_assigns_positions() {
        let invoice_id = Uuid::new_v4();
        let inputs = vec![
            InvoiceItemInput {
                description: "Room 101 (Double)".to_string(),
                quantity: dec!(3),
                unit_price: dec!(80),
                tax_rate: dec!(7),
            },
            InvoiceItemInput {
                description: "City tax".to_string(),
                quantity: dec!(6),
                unit_price: dec!(2.50),
                tax_rate: dec!(0),
            },
        ];

        let items = items_from_inputs(invoice_id, &inputs).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].position, 1);
        assert_eq!(items[1].position, 2);
        assert!(items.iter().all(|i| i.invoice_id == invoice_id));
    }

    #[test]
    fn test_items_from_inputs_rejects_empty() {
        assert!(matches!(
            items_from_inputs(Uuid::new_v4(), &[]),
            Err(AppError::Validation(_))
        ));

        let blank = vec![InvoiceItemInput {
            description: "  ".to_string(),
            quantity: dec!(1),
            unit_price: dec!(10),
            tax_rate: dec!(7),
        }];
        assert!(matches!(
            items_from_inputs(Uuid::new_v4(), &blank),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_article_items_skip_empty_lines() {
        let reservation_id = Uuid::new_v4();
        let line = |description: &str, quantity: Decimal, unit_price: Decimal| {
            ReservationArticle {
                id: Uuid::new_v4(),
                reservation_id,
                article_id: Uuid::new_v4(),
                description: description.to_string(),
                charge_scheme: ChargeScheme::PerStay,
                unit_price,
                tax_rate: dec!(7),
                multiplier: Decimal::ONE,
                quantity,
                total: quantity * unit_price,
            }
        };

        let articles = vec![
            line("Breakfast", dec!(6), dec!(15)),
            line("Suppressed", Decimal::ZERO, dec!(15)),
            line("Parking", dec!(3), dec!(12)),
        ];

        let invoice_id = Uuid::new_v4();
        let items = article_items(invoice_id, 3, &articles);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].description, "Breakfast");
        assert_eq!(items[0].position, 3);
        assert_eq!(items[1].description, "Parking");
        assert_eq!(items[1].position, 4);
    }

    #[test]
    fn test_decimal_from_config() {
        assert_eq!(decimal_from_config(80.0).unwrap(), dec!(80));
        assert!(decimal_from_config(f64::NAN).is_err());
    }

    #[test]
    fn test_derived_totals_match_room_and_article_lines() {
        // 2 rooms x 3 nights at 80 with 7% VAT, plus breakfast
        let invoice_id = Uuid::new_v4();
        let mut items = vec![
            InvoiceItem {
                id: Uuid::new_v4(),
                invoice_id,
                position: 1,
                description: "Room 101 (Double)".to_string(),
                quantity: dec!(3),
                unit_price: dec!(80),
                tax_rate: dec!(7),
            },
            InvoiceItem {
                id: Uuid::new_v4(),
                invoice_id,
                position: 2,
                description: "Room 102 (Double)".to_string(),
                quantity: dec!(3),
                unit_price: dec!(80),
                tax_rate: dec!(7),
            },
        ];
        items.push(InvoiceItem {
            id: Uuid::new_v4(),
            invoice_id,
            position: 3,
            description: "Breakfast".to_string(),
            quantity: dec!(6),
            unit_price: dec!(15),
            tax_rate: dec!(7),
        });

        let totals = invoice_totals(&items);
        assert_eq!(totals.subtotal, dec!(570.00));
        assert_eq!(totals.tax, dec!(39.90));
        assert_eq!(totals.total, dec!(609.90));
    }

    use async_trait::async_trait;
    use innkeep_core::models::{
        Article, CancellationPolicy, Guest, RateCalendarRule, Reservation, ReservationRoom,
        Room, RoomType, RoomTypeRequest, StatusLogEntry,
    };

    struct EmptyCatalog;

    #[async_trait]
    impl CatalogRepository for EmptyCatalog {
        async fn find_guest(&self, _id: Uuid) -> Result<Option<Guest>, AppError> {
            Ok(None)
        }
        async fn find_room(&self, _id: Uuid) -> Result<Option<Room>, AppError> {
            Ok(None)
        }
        async fn find_rooms(&self, _ids: &[Uuid]) -> Result<Vec<Room>, AppError> {
            Ok(Vec::new())
        }
        async fn find_room_type(&self, _id: Uuid) -> Result<Option<RoomType>, AppError> {
            Ok(None)
        }
        async fn find_rate_plan(&self, _id: Uuid) -> Result<Option<RatePlan>, AppError> {
            Ok(None)
        }
        async fn find_cancellation_policy(
            &self,
            _id: Uuid,
        ) -> Result<Option<CancellationPolicy>, AppError> {
            Ok(None)
        }
        async fn calendar_rules_for_plan(
            &self,
            _rate_plan_id: Uuid,
        ) -> Result<Vec<RateCalendarRule>, AppError> {
            Ok(Vec::new())
        }
        async fn find_article(&self, _id: Uuid) -> Result<Option<Article>, AppError> {
            Ok(None)
        }
    }

    struct EmptyReservations;

    #[async_trait]
    impl ReservationRepository for EmptyReservations {
        async fn find_by_id(&self, _id: Uuid) -> Result<Option<Reservation>, AppError> {
            Ok(None)
        }
        async fn rooms(&self, _reservation_id: Uuid) -> Result<Vec<ReservationRoom>, AppError> {
            Ok(Vec::new())
        }
        async fn room_type_requests(
            &self,
            _reservation_id: Uuid,
        ) -> Result<Vec<RoomTypeRequest>, AppError> {
            Ok(Vec::new())
        }
        async fn articles(
            &self,
            _reservation_id: Uuid,
        ) -> Result<Vec<ReservationArticle>, AppError> {
            Ok(Vec::new())
        }
        async fn status_log(
            &self,
            _reservation_id: Uuid,
        ) -> Result<Vec<StatusLogEntry>, AppError> {
            Ok(Vec::new())
        }
    }

    struct FixedInvoices {
        invoice: Invoice,
    }

    #[async_trait]
    impl InvoiceRepository for FixedInvoices {
        async fn find_by_id(&self, _id: Uuid) -> Result<Option<Invoice>, AppError> {
            Ok(Some(self.invoice.clone()))
        }
        async fn items(&self, _invoice_id: Uuid) -> Result<Vec<InvoiceItem>, AppError> {
            Ok(Vec::new())
        }
        async fn latest_for_reservation(
            &self,
            _reservation_id: Uuid,
        ) -> Result<Option<Invoice>, AppError> {
            Ok(Some(self.invoice.clone()))
        }
        async fn list_for_reservation(
            &self,
            _reservation_id: Uuid,
        ) -> Result<Vec<Invoice>, AppError> {
            Ok(vec![self.invoice.clone()])
        }
        async fn payments(&self, _invoice_id: Uuid) -> Result<Vec<Payment>, AppError> {
            Ok(Vec::new())
        }
    }

    struct FlatSequences;

    #[async_trait]
    impl SequenceStore for FlatSequences {
        async fn next_value(&self, _name: &str, floor: i64) -> Result<i64, AppError> {
            Ok(floor)
        }
    }

    #[tokio::test]
    #[ignore] // Requires database
    async fn test_concurrent_payments_record_once() {
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgresql://localhost/innkeep".to_string());
        let pool = PgPool::connect(&database_url).await.unwrap();

        let guest_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO guests (id, first_name, last_name, created_at, updated_at)
             VALUES ($1, 'Paying', 'Guest', NOW(), NOW())",
        )
        .bind(guest_id)
        .execute(&pool)
        .await
        .unwrap();

        let reservation_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO reservations
                 (id, confirmation_number, guest_id, status, check_in_date,
                  check_out_date, adults, children, currency, created_at, updated_at)
             VALUES ($1, $2, $3, 'confirmed', '2024-06-01', '2024-06-04', 2, 0,
                     'EUR', NOW(), NOW())",
        )
        .bind(reservation_id)
        .bind(format!("RES-T{}", reservation_id.simple()))
        .bind(guest_id)
        .execute(&pool)
        .await
        .unwrap();

        let invoice = Invoice {
            id: Uuid::new_v4(),
            reservation_id,
            invoice_number: format!("INV-T{}", reservation_id.simple()),
            invoice_type: InvoiceType::Invoice,
            parent_invoice_id: None,
            issue_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            due_date: None,
            total_amount: dec!(240),
            tax_amount: dec!(16.80),
            currency: "EUR".to_string(),
            status: InvoiceStatus::Issued,
            created_at: Utc::now(),
        };
        sqlx::query(
            "INSERT INTO invoices
                 (id, reservation_id, invoice_number, invoice_type, parent_invoice_id,
                  issue_date, due_date, total_amount, tax_amount, currency, status, created_at)
             VALUES ($1, $2, $3, 'invoice', NULL, $4, NULL, $5, $6, $7, 'issued', $8)",
        )
        .bind(invoice.id)
        .bind(reservation_id)
        .bind(&invoice.invoice_number)
        .bind(invoice.issue_date)
        .bind(invoice.total_amount)
        .bind(invoice.tax_amount)
        .bind(&invoice.currency)
        .bind(invoice.created_at)
        .execute(&pool)
        .await
        .unwrap();

        let service = Arc::new(BillingService::new(
            Arc::new(EmptyCatalog),
            Arc::new(EmptyReservations),
            Arc::new(FixedInvoices {
                invoice: invoice.clone(),
            }),
            Arc::new(SequenceGenerator::new(
                Arc::new(FlatSequences),
                BillingConfig::default(),
            )),
            pool.clone(),
            BillingConfig::default(),
        ));

        let mut handles = Vec::new();
        for _ in 0..2 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                service
                    .pay_invoice(reservation_id, PaymentRequest::default())
                    .await
                    .unwrap()
            }));
        }

        let mut outcomes = Vec::new();
        for handle in handles {
            outcomes.push(handle.await.unwrap());
        }

        let recorded = outcomes.iter().filter(|o| !o.already_paid).count();
        assert_eq!(recorded, 1, "exactly one caller records the payment");

        let payments: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM payments WHERE invoice_id = $1")
                .bind(invoice.id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(payments, 1);
    }
}
