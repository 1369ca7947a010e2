//! Invoice and payment request DTOs

use chrono::{DateTime, NaiveDate, Utc};
use innkeep_core::{
    models::{InvoiceStatus, InvoiceType},
    AppError,
};
use innkeep_services::{InvoiceItemInput, InvoiceRequest, PaymentRequest};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

/// One explicit invoice line
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct InvoiceItemDto {
    #[validate(length(min = 1))]
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub tax_rate: Decimal,
}

/// POST /reservations/{id}/invoices body
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CreateInvoiceRequest {
    /// "invoice" (default) or "correction"
    pub invoice_type: Option<String>,

    pub parent_invoice_id: Option<Uuid>,

    #[validate(nested)]
    pub items: Option<Vec<InvoiceItemDto>>,

    /// Whether derived invoices include article lines; defaults to true
    pub include_articles: Option<bool>,

    pub issue_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,

    /// "draft", "issued" (default), "paid", or "void"
    pub status: Option<String>,
}

impl TryFrom<CreateInvoiceRequest> for InvoiceRequest {
    type Error = AppError;

    fn try_from(req: CreateInvoiceRequest) -> Result<Self, Self::Error> {
        let invoice_type = match req.invoice_type.as_deref() {
            Some(s) => InvoiceType::from_str(s)
                .ok_or_else(|| AppError::Validation(format!("unknown invoice type: {s}")))?,
            None => InvoiceType::default(),
        };
        let status = match req.status.as_deref() {
            Some(s) => Some(
                InvoiceStatus::from_str(s)
                    .ok_or_else(|| AppError::Validation(format!("unknown invoice status: {s}")))?,
            ),
            None => None,
        };

        Ok(InvoiceRequest {
            invoice_type,
            parent_invoice_id: req.parent_invoice_id,
            items: req.items.map(|items| {
                items
                    .into_iter()
                    .map(|item| InvoiceItemInput {
                        description: item.description,
                        quantity: item.quantity,
                        unit_price: item.unit_price,
                        tax_rate: item.tax_rate,
                    })
                    .collect()
            }),
            include_articles: req.include_articles.unwrap_or(true),
            issue_date: req.issue_date,
            due_date: req.due_date,
            status,
        })
    }
}

/// POST /reservations/{id}/payments body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PayInvoiceRequest {
    /// Paid amount; defaults to the invoice total
    pub amount: Option<Decimal>,
    pub method: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub currency: Option<String>,
    pub reference: Option<String>,
    pub notes: Option<String>,
}

impl From<PayInvoiceRequest> for PaymentRequest {
    fn from(req: PayInvoiceRequest) -> Self {
        PaymentRequest {
            amount: req.amount,
            method: req.method,
            paid_at: req.paid_at,
            currency: req.currency,
            reference: req.reference,
            notes: req.notes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_regular_issued_invoice() {
        let request = InvoiceRequest::try_from(CreateInvoiceRequest::default()).unwrap();
        assert_eq!(request.invoice_type, InvoiceType::Invoice);
        assert!(request.include_articles);
        assert!(request.status.is_none());
        assert!(request.items.is_none());
    }

    #[test]
    fn test_correction_type_parses() {
        let request = InvoiceRequest::try_from(CreateInvoiceRequest {
            invoice_type: Some("correction".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(request.invoice_type, InvoiceType::Correction);
    }

    #[test]
    fn test_unknown_type_rejected() {
        let result = InvoiceRequest::try_from(CreateInvoiceRequest {
            invoice_type: Some("memo".to_string()),
            ..Default::default()
        });
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_empty_payment_body_parses() {
        let request: PayInvoiceRequest = serde_json::from_str("{}").unwrap();
        let payment = PaymentRequest::from(request);
        assert!(payment.amount.is_none());
        assert!(payment.method.is_none());
    }
}
