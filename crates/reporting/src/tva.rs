//! TVA (value-added tax) declaration figures.
//!
//! Invoiced TVA follows the issue date; collected TVA follows the payment date.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use fatoura_core::{ClientId, Currency, DomainResult, ExchangeRateProvider, round_money};
use fatoura_invoicing::Invoice;

use crate::range::DateRange;
use crate::reporter::{Reporter, accumulate};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesLine {
    pub invoice_number: String,
    pub client_id: ClientId,
    pub issue_date: NaiveDate,
    pub sub_total: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionLine {
    pub invoice_number: String,
    pub client_id: ClientId,
    pub payment_date: NaiveDate,
    pub sub_total: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TvaDeclaration {
    pub range: DateRange,
    pub currency: Currency,
    pub invoiced_tax: Decimal,
    pub collected_tax: Decimal,
    pub sales: Vec<SalesLine>,
    pub collections: Vec<CollectionLine>,
}

impl<R: ExchangeRateProvider + ?Sized> Reporter<'_, R> {
    /// TVA on invoices issued within `range`.
    pub fn invoiced_tax(&self, range: DateRange) -> DomainResult<Decimal> {
        self.sum_tax(self.issued_in(range))
    }

    /// TVA on invoices paid within `range`.
    pub fn collected_tax(&self, range: DateRange) -> DomainResult<Decimal> {
        self.sum_tax(self.collected_in(range).map(|(inv, _)| inv))
    }

    pub fn tva_declaration(&self, range: DateRange) -> DomainResult<TvaDeclaration> {
        let sales = self
            .issued_in(range)
            .map(|inv| {
                Ok(SalesLine {
                    invoice_number: inv.invoice_number.clone(),
                    client_id: inv.client_id,
                    issue_date: inv.issue_date,
                    sub_total: round_money(self.convert(inv, inv.sub_total)?),
                    tax_amount: round_money(self.convert(inv, inv.tax_amount)?),
                    total: round_money(self.convert(inv, inv.total)?),
                })
            })
            .collect::<DomainResult<Vec<_>>>()?;

        let collections = self
            .collected_in(range)
            .map(|(inv, paid_on)| {
                Ok(CollectionLine {
                    invoice_number: inv.invoice_number.clone(),
                    client_id: inv.client_id,
                    payment_date: paid_on,
                    sub_total: round_money(self.convert(inv, inv.sub_total)?),
                    tax_amount: round_money(self.convert(inv, inv.tax_amount)?),
                    total: round_money(self.convert(inv, inv.total)?),
                })
            })
            .collect::<DomainResult<Vec<_>>>()?;

        Ok(TvaDeclaration {
            range,
            currency: self.currency(),
            invoiced_tax: self.invoiced_tax(range)?,
            collected_tax: self.collected_tax(range)?,
            sales,
            collections,
        })
    }

    fn sum_tax<'i>(&self, invoices: impl Iterator<Item = &'i Invoice>) -> DomainResult<Decimal> {
        let mut total = Decimal::ZERO;
        for inv in invoices {
            accumulate(&mut total, self.convert(inv, inv.tax_amount)?)?;
        }
        Ok(round_money(total))
    }

    fn issued_in(&self, range: DateRange) -> impl Iterator<Item = &Invoice> + '_ {
        self.invoices
            .iter()
            .filter(move |inv| range.contains(inv.issue_date))
    }

    fn collected_in(&self, range: DateRange) -> impl Iterator<Item = (&Invoice, NaiveDate)> + '_ {
        self.invoices.iter().filter_map(move |inv| {
            inv.payment_date
                .filter(|paid_on| range.contains(*paid_on))
                .map(|paid_on| (inv, paid_on))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{FixedRates, date, invoice, paid};
    use fatoura_core::DomainError;
    use fatoura_invoicing::InvoiceStatus;
    use rust_decimal_macros::dec;

    fn q1() -> DateRange {
        DateRange::new(date(2026, 1, 1), date(2026, 3, 31)).unwrap()
    }

    #[test]
    fn invoiced_and_collected_follow_different_dates() {
        let client = ClientId::new();
        let invoices = vec![
            // Issued in Q1, paid in Q2.
            paid(
                invoice(client, InvoiceStatus::Sent, date(2026, 3, 20), date(2026, 4, 20), dec!(1000), dec!(200)),
                date(2026, 4, 5),
            ),
            // Issued in Q4, paid in Q1.
            paid(
                invoice(client, InvoiceStatus::Sent, date(2025, 12, 10), date(2026, 1, 10), dec!(500), dec!(100)),
                date(2026, 1, 8),
            ),
            // Issued on the last day of Q1, unpaid.
            invoice(client, InvoiceStatus::Sent, date(2026, 3, 31), date(2026, 4, 30), dec!(100), dec!(20)),
        ];
        let reporter = Reporter::new(&invoices, &FixedRates, Currency::Mad);

        assert_eq!(reporter.invoiced_tax(q1()).unwrap(), dec!(220));
        assert_eq!(reporter.collected_tax(q1()).unwrap(), dec!(100));

        let declaration = reporter.tva_declaration(q1()).unwrap();
        assert_eq!(declaration.sales.len(), 2);
        assert_eq!(declaration.collections.len(), 1);
        assert_eq!(declaration.collections[0].payment_date, date(2026, 1, 8));
    }

    #[test]
    fn foreign_currency_is_converted_before_summing() {
        let mut eur = invoice(ClientId::new(), InvoiceStatus::Sent, date(2026, 2, 1), date(2026, 3, 1), dec!(100), dec!(20));
        eur.currency = Currency::Eur;
        let mad = invoice(ClientId::new(), InvoiceStatus::Sent, date(2026, 2, 2), date(2026, 3, 2), dec!(100), dec!(20));
        let invoices = vec![eur, mad];

        let reporter = Reporter::new(&invoices, &FixedRates, Currency::Mad);
        assert_eq!(reporter.invoiced_tax(q1()).unwrap(), dec!(240));
        assert_eq!(reporter.tva_declaration(q1()).unwrap().sales[0].total, dec!(1320));
    }

    #[test]
    fn empty_collection_reports_zero() {
        let reporter = Reporter::new(&[], &FixedRates, Currency::Mad);
        assert_eq!(reporter.invoiced_tax(q1()).unwrap(), Decimal::ZERO);
        assert_eq!(reporter.collected_tax(q1()).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn overflowing_sum_is_an_error() {
        let client = ClientId::new();
        let big = Decimal::MAX / dec!(2);
        let invoices = vec![
            invoice(client, InvoiceStatus::Sent, date(2026, 1, 5), date(2026, 2, 5), dec!(0), big),
            invoice(client, InvoiceStatus::Sent, date(2026, 1, 6), date(2026, 2, 6), dec!(0), big),
            invoice(client, InvoiceStatus::Sent, date(2026, 1, 7), date(2026, 2, 7), dec!(0), big),
        ];
        let reporter = Reporter::new(&invoices, &FixedRates, Currency::Mad);
        assert!(matches!(reporter.invoiced_tax(q1()), Err(DomainError::Validation(_))));
        assert!(reporter.tva_declaration(q1()).is_err());
    }
}
