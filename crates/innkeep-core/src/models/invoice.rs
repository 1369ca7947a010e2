//! Invoice, invoice item, and payment models
//!
//! Invoice items are immutable snapshots taken at creation time; later
//! reservation edits never alter an issued invoice. Corrections reverse a
//! parent invoice by negating item quantities.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Invoice document type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceType {
    /// Regular invoice
    #[default]
    Invoice,
    /// Reversing document referencing a parent invoice
    Correction,
}

impl fmt::Display for InvoiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvoiceType::Invoice => write!(f, "invoice"),
            InvoiceType::Correction => write!(f, "correction"),
        }
    }
}

impl InvoiceType {
    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "invoice" => Some(InvoiceType::Invoice),
            "correction" => Some(InvoiceType::Correction),
            _ => None,
        }
    }
}

/// Invoice status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    /// Not yet issued
    Draft,
    /// Issued and awaiting payment
    #[default]
    Issued,
    /// Fully paid
    Paid,
    /// Voided
    Void,
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvoiceStatus::Draft => write!(f, "draft"),
            InvoiceStatus::Issued => write!(f, "issued"),
            InvoiceStatus::Paid => write!(f, "paid"),
            InvoiceStatus::Void => write!(f, "void"),
        }
    }
}

impl InvoiceStatus {
    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "draft" => Some(InvoiceStatus::Draft),
            "issued" => Some(InvoiceStatus::Issued),
            "paid" => Some(InvoiceStatus::Paid),
            "void" => Some(InvoiceStatus::Void),
            _ => None,
        }
    }
}

/// Invoice entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    /// Unique identifier
    pub id: Uuid,

    /// Billed reservation
    pub reservation_id: Uuid,

    /// Sequence-generated document number (invoice or correction series)
    pub invoice_number: String,

    /// Document type
    pub invoice_type: InvoiceType,

    /// Parent invoice for corrections
    pub parent_invoice_id: Option<Uuid>,

    /// Issue date
    pub issue_date: NaiveDate,

    /// Due date
    pub due_date: Option<NaiveDate>,

    /// Gross total (subtotal + tax)
    pub total_amount: Decimal,

    /// Tax portion of the total
    pub tax_amount: Decimal,

    /// Currency (ISO 4217)
    pub currency: String,

    /// Document status
    pub status: InvoiceStatus,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// One immutable invoice line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceItem {
    /// Unique identifier
    pub id: Uuid,

    /// Owning invoice
    pub invoice_id: Uuid,

    /// Ordinal position on the document
    pub position: i32,

    /// Line description
    pub description: String,

    /// Billable quantity (negative on corrections)
    pub quantity: Decimal,

    /// Price per unit
    pub unit_price: Decimal,

    /// Tax rate in percent
    pub tax_rate: Decimal,
}

impl InvoiceItem {
    /// Net line amount (quantity x unit price)
    pub fn net_amount(&self) -> Decimal {
        self.quantity * self.unit_price
    }

    /// Tax portion of the line
    pub fn tax_amount(&self) -> Decimal {
        self.net_amount() * self.tax_rate / Decimal::from(100)
    }

    /// Gross line total: qty x price x (1 + tax/100)
    pub fn line_total(&self) -> Decimal {
        self.net_amount() + self.tax_amount()
    }
}

/// Computed invoice totals, rounded to 2 decimals
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InvoiceTotals {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

/// Round a monetary amount to 2 decimals, midpoint away from zero
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Compute subtotal, tax, and gross total for a set of items.
///
/// total = round(subtotal + tax, 2); each component rounded to 2 decimals.
pub fn invoice_totals(items: &[InvoiceItem]) -> InvoiceTotals {
    let subtotal: Decimal = items.iter().map(InvoiceItem::net_amount).sum();
    let tax: Decimal = items.iter().map(InvoiceItem::tax_amount).sum();

    InvoiceTotals {
        subtotal: round_money(subtotal),
        tax: round_money(tax),
        total: round_money(subtotal + tax),
    }
}

/// Derive correction items from a parent invoice's items: identical
/// description, unit price, and tax rate with the quantity sign inverted.
pub fn correction_items(parent_items: &[InvoiceItem], correction_id: Uuid) -> Vec<InvoiceItem> {
    parent_items
        .iter()
        .map(|item| InvoiceItem {
            id: Uuid::new_v4(),
            invoice_id: correction_id,
            position: item.position,
            description: item.description.clone(),
            quantity: -item.quantity,
            unit_price: item.unit_price,
            tax_rate: item.tax_rate,
        })
        .collect()
}

/// Payment entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    /// Unique identifier
    pub id: Uuid,

    /// Paid invoice
    pub invoice_id: Uuid,

    /// Payment method (e.g., "card", "cash", "bank_transfer")
    pub method: String,

    /// Paid amount
    pub amount: Decimal,

    /// Currency (ISO 4217)
    pub currency: String,

    /// When the payment was made
    pub paid_at: DateTime<Utc>,

    /// External payment reference
    pub reference: Option<String>,

    /// Free-form notes
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn item(qty: Decimal, price: Decimal, tax: Decimal) -> InvoiceItem {
        InvoiceItem {
            id: Uuid::new_v4(),
            invoice_id: Uuid::new_v4(),
            position: 1,
            description: "Room 101 (Double)".to_string(),
            quantity: qty,
            unit_price: price,
            tax_rate: tax,
        }
    }

    #[test]
    fn test_line_total() {
        let line = item(dec!(3), dec!(80), dec!(7));
        assert_eq!(line.net_amount(), dec!(240));
        assert_eq!(line.tax_amount(), dec!(16.8));
        assert_eq!(line.line_total(), dec!(256.8));
    }

    #[test]
    fn test_invoice_totals_two_rooms_three_nights() {
        // 2 rooms x 3 nights at 80/night, reduced VAT 7%
        let items = vec![
            item(dec!(3), dec!(80), dec!(7)),
            item(dec!(3), dec!(80), dec!(7)),
        ];

        let totals = invoice_totals(&items);
        assert_eq!(totals.subtotal, dec!(480.00));
        assert_eq!(totals.tax, dec!(33.60));
        assert_eq!(totals.total, dec!(513.60));
    }

    #[test]
    fn test_totals_equal_sum_of_item_totals() {
        let items = vec![
            item(dec!(6), dec!(15.00), dec!(7)),
            item(dec!(2), dec!(12.50), dec!(19)),
        ];
        let totals = invoice_totals(&items);
        let summed: Decimal = items.iter().map(InvoiceItem::line_total).sum();
        assert_eq!(totals.total, round_money(summed));
    }

    #[test]
    fn test_correction_negates_quantities() {
        let parent_id = Uuid::new_v4();
        let mut parent = vec![
            item(dec!(3), dec!(80), dec!(7)),
            item(dec!(3), dec!(80), dec!(7)),
        ];
        parent[1].position = 2;

        let correction_id = Uuid::new_v4();
        let corrected = correction_items(&parent, correction_id);

        assert_eq!(corrected.len(), 2);
        for (orig, corr) in parent.iter().zip(&corrected) {
            assert_eq!(corr.invoice_id, correction_id);
            assert_ne!(corr.invoice_id, parent_id);
            assert_eq!(corr.quantity, -orig.quantity);
            assert_eq!(corr.unit_price, orig.unit_price);
            assert_eq!(corr.tax_rate, orig.tax_rate);
            assert_eq!(corr.position, orig.position);
        }

        let totals = invoice_totals(&corrected);
        assert_eq!(totals.total, dec!(-513.60));
    }

    #[test]
    fn test_round_money_away_from_zero() {
        assert_eq!(round_money(dec!(1.005)), dec!(1.01));
        assert_eq!(round_money(dec!(-1.005)), dec!(-1.01));
        assert_eq!(round_money(dec!(2.444)), dec!(2.44));
    }

    #[test]
    fn test_type_and_status_parse() {
        assert_eq!(InvoiceType::from_str("correction"), Some(InvoiceType::Correction));
        assert_eq!(InvoiceType::from_str("memo"), None);
        assert_eq!(InvoiceStatus::from_str("paid"), Some(InvoiceStatus::Paid));
        assert_eq!(InvoiceStatus::from_str("open"), None);
    }
}
