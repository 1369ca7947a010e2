//! Invoice repository implementation
//!
//! PostgreSQL-backed reads for invoices, invoice items, and payments.
//! Invoice creation and payment recording are transactional and live in
//! the billing service.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use innkeep_core::{
    models::{Invoice, InvoiceItem, InvoiceStatus, InvoiceType, Payment},
    traits::InvoiceRepository,
    AppError, AppResult,
};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::{debug, error, instrument};
use uuid::Uuid;

/// PostgreSQL implementation of InvoiceRepository
pub struct PgInvoiceRepository {
    pool: PgPool,
}

impl PgInvoiceRepository {
    /// Create a new invoice repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn parse_type(s: &str) -> InvoiceType {
        InvoiceType::from_str(s).unwrap_or(InvoiceType::Invoice)
    }

    fn parse_status(s: &str) -> InvoiceStatus {
        InvoiceStatus::from_str(s).unwrap_or(InvoiceStatus::Issued)
    }
}

const INVOICE_COLUMNS: &str = r#"
    id, reservation_id, invoice_number, invoice_type, parent_invoice_id,
    issue_date, due_date, total_amount, tax_amount, currency, status, created_at
"#;

#[async_trait]
impl InvoiceRepository for PgInvoiceRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Invoice>> {
        debug!("Finding invoice by id: {}", id);

        let result = sqlx::query_as::<sqlx::Postgres, InvoiceRow>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding invoice {}: {}", id, e);
            AppError::Database(format!("Failed to find invoice: {}", e))
        })?;

        Ok(result.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn items(&self, invoice_id: Uuid) -> AppResult<Vec<InvoiceItem>> {
        let rows = sqlx::query_as::<sqlx::Postgres, InvoiceItemRow>(
            r#"
            SELECT id, invoice_id, position, description, quantity, unit_price, tax_rate
            FROM invoice_items
            WHERE invoice_id = $1
            ORDER BY position ASC
            "#,
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error loading invoice items: {}", e);
            AppError::Database(format!("Failed to load invoice items: {}", e))
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn latest_for_reservation(&self, reservation_id: Uuid) -> AppResult<Option<Invoice>> {
        debug!("Finding latest invoice for reservation: {}", reservation_id);

        let result = sqlx::query_as::<sqlx::Postgres, InvoiceRow>(&format!(
            r#"
            SELECT {INVOICE_COLUMNS}
            FROM invoices
            WHERE reservation_id = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#
        ))
        .bind(reservation_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding latest invoice: {}", e);
            AppError::Database(format!("Failed to find latest invoice: {}", e))
        })?;

        Ok(result.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn list_for_reservation(&self, reservation_id: Uuid) -> AppResult<Vec<Invoice>> {
        let rows = sqlx::query_as::<sqlx::Postgres, InvoiceRow>(&format!(
            r#"
            SELECT {INVOICE_COLUMNS}
            FROM invoices
            WHERE reservation_id = $1
            ORDER BY created_at DESC
            "#
        ))
        .bind(reservation_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error listing invoices: {}", e);
            AppError::Database(format!("Failed to list invoices: {}", e))
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn payments(&self, invoice_id: Uuid) -> AppResult<Vec<Payment>> {
        let rows = sqlx::query_as::<sqlx::Postgres, PaymentRow>(
            r#"
            SELECT id, invoice_id, method, amount, currency, paid_at, reference, notes
            FROM payments
            WHERE invoice_id = $1
            ORDER BY paid_at ASC
            "#,
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error loading payments: {}", e);
            AppError::Database(format!("Failed to load payments: {}", e))
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

/// Helper structs for mapping database rows

#[derive(Debug, sqlx::FromRow)]
struct InvoiceRow {
    id: Uuid,
    reservation_id: Uuid,
    invoice_number: String,
    invoice_type: String,
    parent_invoice_id: Option<Uuid>,
    issue_date: NaiveDate,
    due_date: Option<NaiveDate>,
    total_amount: Decimal,
    tax_amount: Decimal,
    currency: String,
    status: String,
    created_at: DateTime<Utc>,
}

impl From<InvoiceRow> for Invoice {
    fn from(row: InvoiceRow) -> Self {
        Self {
            id: row.id,
            reservation_id: row.reservation_id,
            invoice_number: row.invoice_number,
            invoice_type: PgInvoiceRepository::parse_type(&row.invoice_type),
            parent_invoice_id: row.parent_invoice_id,
            issue_date: row.issue_date,
            due_date: row.due_date,
            total_amount: row.total_amount,
            tax_amount: row.tax_amount,
            currency: row.currency,
            status: PgInvoiceRepository::parse_status(&row.status),
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct InvoiceItemRow {
    id: Uuid,
    invoice_id: Uuid,
    position: i32,
    description: String,
    quantity: Decimal,
    unit_price: Decimal,
    tax_rate: Decimal,
}

impl From<InvoiceItemRow> for InvoiceItem {
    fn from(row: InvoiceItemRow) -> Self {
        Self {
            id: row.id,
            invoice_id: row.invoice_id,
            position: row.position,
            description: row.description,
            quantity: row.quantity,
            unit_price: row.unit_price,
            tax_rate: row.tax_rate,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    invoice_id: Uuid,
    method: String,
    amount: Decimal,
    currency: String,
    paid_at: DateTime<Utc>,
    reference: Option<String>,
    notes: Option<String>,
}

impl From<PaymentRow> for Payment {
    fn from(row: PaymentRow) -> Self {
        Self {
            id: row.id,
            invoice_id: row.invoice_id,
            method: row.method,
            amount: row.amount,
            currency: row.currency,
            paid_at: row.paid_at,
            reference: row.reference,
            notes: row.notes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_type_and_status() {
        assert_eq!(
            PgInvoiceRepository::parse_type("correction"),
            InvoiceType::Correction
        );
        assert_eq!(
            PgInvoiceRepository::parse_type("unknown"),
            InvoiceType::Invoice
        );
        assert_eq!(PgInvoiceRepository::parse_status("paid"), InvoiceStatus::Paid);
        assert_eq!(
            PgInvoiceRepository::parse_status("unknown"),
            InvoiceStatus::Issued
        );
    }
}
