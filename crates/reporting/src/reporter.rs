use rust_decimal::Decimal;

use fatoura_core::{Currency, DomainError, DomainResult, ExchangeRateProvider};
use fatoura_invoicing::Invoice;

/// Report builder over one snapshot of invoices.
///
/// Report methods live next to their output types (`tva`, `forecast`,
/// `performance`).
pub struct Reporter<'a, R: ExchangeRateProvider + ?Sized> {
    pub(crate) invoices: &'a [Invoice],
    rates: &'a R,
    currency: Currency,
}

impl<'a, R: ExchangeRateProvider + ?Sized> Reporter<'a, R> {
    pub fn new(invoices: &'a [Invoice], rates: &'a R, currency: Currency) -> Self {
        Self {
            invoices,
            rates,
            currency,
        }
    }

    /// Currency every figure is expressed in.
    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// `amount` of `invoice` in the reporting currency, unrounded.
    pub(crate) fn convert(&self, invoice: &Invoice, amount: Decimal) -> DomainResult<Decimal> {
        self.rates.convert(amount, invoice.currency, self.currency)
    }
}

/// Add a converted amount to a running report total.
pub(crate) fn accumulate(total: &mut Decimal, amount: Decimal) -> DomainResult<()> {
    *total = total
        .checked_add(amount)
        .ok_or_else(|| DomainError::validation("report total overflow"))?;
    Ok(())
}
