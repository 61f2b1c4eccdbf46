use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use fatoura_core::{DomainError, DomainResult, round_money};

use crate::invoice::InvoiceItem;

/// Derived invoice totals, rounded to 2 decimal places.
///
/// `total == sub_total + tax_amount` holds exactly on these values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceTotals {
    pub sub_total: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
}

/// Price a list of lines.
///
/// Sums are accumulated at full precision and rounded once at the end.
/// `tax_exempt` (auto-entrepreneur accounts) forces the tax to zero whatever
/// the per-line rates are.
pub fn compute_totals(items: &[InvoiceItem], tax_exempt: bool) -> DomainResult<InvoiceTotals> {
    if items.is_empty() {
        return Err(DomainError::validation("invoice must have at least one item"));
    }

    let mut net = Decimal::ZERO;
    let mut tax = Decimal::ZERO;
    for (i, item) in items.iter().enumerate() {
        let line = i + 1;
        if item.quantity <= Decimal::ZERO {
            return Err(DomainError::validation(format!(
                "items[{line}].quantity must be greater than 0"
            )));
        }
        if item.unit_price < Decimal::ZERO {
            return Err(DomainError::validation(format!(
                "items[{line}].unit_price must not be negative"
            )));
        }
        if item.tax_rate_percent < Decimal::ZERO || item.tax_rate_percent > Decimal::ONE_HUNDRED {
            return Err(DomainError::validation(format!(
                "items[{line}].tax_rate must be between 0 and 100"
            )));
        }

        net = net
            .checked_add(item.net_amount()?)
            .ok_or_else(|| DomainError::validation("invoice amount overflow"))?;
        if !tax_exempt {
            tax = tax
                .checked_add(item.tax_amount()?)
                .ok_or_else(|| DomainError::validation("invoice tax overflow"))?;
        }
    }

    let sub_total = round_money(net);
    let tax_amount = round_money(tax);
    let total = sub_total
        .checked_add(tax_amount)
        .ok_or_else(|| DomainError::validation("invoice total overflow"))?;
    Ok(InvoiceTotals {
        sub_total,
        tax_amount,
        total,
    })
}
