use core::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use fatoura_core::validation::{optional_text, percent, required_text};
use fatoura_core::{AccountId, ClientId, Currency, DomainError, DomainResult, InvoiceId, Owned};

/// Invoice status. Transitions are advisory: callers set the status directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    #[default]
    Draft,
    Sent,
    Paid,
    Overdue,
}

impl InvoiceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
        }
    }

    /// Sent or overdue: money is expected but not yet received.
    pub fn is_outstanding(self) -> bool {
        matches!(self, InvoiceStatus::Sent | InvoiceStatus::Overdue)
    }
}

impl FromStr for InvoiceStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "sent" => Ok(Self::Sent),
            "paid" => Ok(Self::Paid),
            "overdue" => Ok(Self::Overdue),
            _ => Err(DomainError::validation(
                "status must be one of: draft, sent, paid, overdue",
            )),
        }
    }
}

/// One invoice line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceItem {
    pub description: String,
    pub quantity: Decimal,
    #[serde(alias = "price")]
    pub unit_price: Decimal,
    #[serde(alias = "taxRate")]
    pub tax_rate_percent: Decimal,
}

/// Upper bound on a line quantity (10^9).
pub const MAX_QUANTITY: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

/// Upper bound on a line unit price (10^12).
pub const MAX_UNIT_PRICE: Decimal = Decimal::from_parts(3_567_587_328, 232, 0, false, 0);

impl InvoiceItem {
    /// `quantity * unit_price`, unrounded.
    pub fn net_amount(&self) -> DomainResult<Decimal> {
        self.quantity
            .checked_mul(self.unit_price)
            .ok_or_else(|| DomainError::validation("line amount overflow"))
    }

    /// Tax on this line, unrounded.
    pub fn tax_amount(&self) -> DomainResult<Decimal> {
        self.net_amount()?
            .checked_mul(self.tax_rate_percent)
            .and_then(|scaled| scaled.checked_div(Decimal::ONE_HUNDRED))
            .ok_or_else(|| DomainError::validation("line tax overflow"))
    }

    /// Validate a line; `line` is 1-based and used in error messages.
    pub fn validated(self, line: usize) -> DomainResult<Self> {
        let description = required_text(&format!("items[{line}].description"), &self.description, usize::MAX)?;
        if self.quantity <= Decimal::ZERO {
            return Err(DomainError::validation(format!(
                "items[{line}].quantity must be greater than 0"
            )));
        }
        if self.quantity > MAX_QUANTITY {
            return Err(DomainError::validation(format!(
                "items[{line}].quantity must not exceed {MAX_QUANTITY}"
            )));
        }
        if self.unit_price < Decimal::ZERO {
            return Err(DomainError::validation(format!(
                "items[{line}].unit_price must not be negative"
            )));
        }
        if self.unit_price > MAX_UNIT_PRICE {
            return Err(DomainError::validation(format!(
                "items[{line}].unit_price must not exceed {MAX_UNIT_PRICE}"
            )));
        }
        percent(&format!("items[{line}].tax_rate"), self.tax_rate_percent)?;

        Ok(Self {
            description,
            ..self
        })
    }
}

/// A persisted invoice.
///
/// Totals are derived by [`crate::compute_totals`] at write time and stored
/// as-is, so a wire round-trip reproduces them exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: InvoiceId,
    pub account_id: AccountId,
    pub invoice_number: String,
    pub client_id: ClientId,
    pub items: Vec<InvoiceItem>,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub status: InvoiceStatus,
    pub currency: Currency,
    pub notes: Option<String>,
    pub sub_total: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
    pub edit_count: u32,
    pub payment_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    pub fn is_paid(&self) -> bool {
        self.status == InvoiceStatus::Paid
    }

    /// Days between due date and payment date; negative when paid early.
    pub fn payment_delay_days(&self) -> Option<i64> {
        if !self.is_paid() {
            return None;
        }
        self.payment_date
            .map(|paid| (paid - self.due_date).num_days())
    }
}

impl Owned for Invoice {
    fn account_id(&self) -> AccountId {
        self.account_id
    }
}

/// Invoice fields as submitted on create/update.
///
/// `sub_total`, `tax_amount` and `total` are accepted for compatibility with
/// clients that compute them for display; they are never trusted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDraft {
    pub invoice_number: String,
    pub client_id: ClientId,
    pub items: Vec<InvoiceItem>,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub status: InvoiceStatus,
    /// Falls back to the account's default currency.
    #[serde(default)]
    pub currency: Option<Currency>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub payment_date: Option<NaiveDate>,
    #[serde(default)]
    pub sub_total: Option<Decimal>,
    #[serde(default)]
    pub tax_amount: Option<Decimal>,
    #[serde(default)]
    pub total: Option<Decimal>,
}

impl InvoiceDraft {
    /// The invoice number as it will be stored (trimmed).
    pub fn normalized_number(&self) -> &str {
        self.invoice_number.trim()
    }

    /// Validate header fields and every line. Totals are not checked here.
    pub fn validated(self) -> DomainResult<Self> {
        let invoice_number = required_text("invoice_number", &self.invoice_number, 100)?;
        if self.items.is_empty() {
            return Err(DomainError::validation("invoice must have at least one item"));
        }
        let items = self
            .items
            .into_iter()
            .enumerate()
            .map(|(i, item)| item.validated(i + 1))
            .collect::<DomainResult<Vec<_>>>()?;
        let notes = optional_text("notes", self.notes.as_deref(), None)?;

        Ok(Self {
            invoice_number,
            items,
            notes,
            ..self
        })
    }
}
