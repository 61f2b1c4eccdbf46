//! Invoice builders shared by the report tests.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use fatoura_core::{AccountId, ClientId, Currency, ExchangeRateProvider, InvoiceId};
use fatoura_invoicing::{Invoice, InvoiceItem, InvoiceStatus};

/// 1 EUR = 11 MAD, everything else at par.
pub struct FixedRates;

impl ExchangeRateProvider for FixedRates {
    fn rate(&self, from: Currency, to: Currency) -> Decimal {
        match (from, to) {
            (Currency::Eur, Currency::Mad) => dec!(11),
            (Currency::Mad, Currency::Eur) => Decimal::ONE / dec!(11),
            _ => Decimal::ONE,
        }
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Invoice whose single line nets `sub_total` with `tax_amount` on top.
pub fn invoice(
    client_id: ClientId,
    status: InvoiceStatus,
    issue: NaiveDate,
    due: NaiveDate,
    sub_total: Decimal,
    tax_amount: Decimal,
) -> Invoice {
    let now = Utc::now();
    Invoice {
        id: InvoiceId::new(),
        account_id: AccountId::new(),
        invoice_number: format!("INV-{}", issue.format("%Y%m%d")),
        client_id,
        items: vec![InvoiceItem {
            description: "Service".to_string(),
            quantity: Decimal::ONE,
            unit_price: sub_total,
            tax_rate_percent: Decimal::ZERO,
        }],
        issue_date: issue,
        due_date: due,
        status,
        currency: Currency::Mad,
        notes: None,
        sub_total,
        tax_amount,
        total: sub_total + tax_amount,
        edit_count: 0,
        payment_date: None,
        created_at: now,
        updated_at: now,
    }
}

pub fn paid(mut invoice: Invoice, on: NaiveDate) -> Invoice {
    invoice.status = InvoiceStatus::Paid;
    invoice.payment_date = Some(on);
    invoice
}
