//! Revenue rankings and payment behaviour, computed over paid invoices.

use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::Serialize;

use fatoura_core::{ClientId, DomainResult, ExchangeRateProvider, round_money};
use fatoura_invoicing::Invoice;

use crate::reporter::{Reporter, accumulate};

/// Label used for lines whose description is blank.
pub const UNNAMED_SERVICE: &str = "Service";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRevenue {
    pub client_id: ClientId,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRevenue {
    pub description: String,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientPaymentDelay {
    pub client_id: ClientId,
    /// Mean days between due date and payment; negative means early.
    pub average_days: Decimal,
    pub invoice_count: usize,
}

impl<R: ExchangeRateProvider + ?Sized> Reporter<'_, R> {
    /// Clients ranked by the total of their paid invoices.
    pub fn top_clients_by_revenue(&self, n: usize) -> DomainResult<Vec<ClientRevenue>> {
        let mut revenue: IndexMap<ClientId, Decimal> = IndexMap::new();
        for inv in self.paid() {
            accumulate(revenue.entry(inv.client_id).or_default(), self.convert(inv, inv.total)?)?;
        }

        Ok(top_n(revenue, n)
            .into_iter()
            .map(|(client_id, total)| ClientRevenue { client_id, total })
            .collect())
    }

    /// Line descriptions ranked by the net amount billed on paid invoices.
    pub fn top_services_by_revenue(&self, n: usize) -> DomainResult<Vec<ServiceRevenue>> {
        let mut revenue: IndexMap<String, Decimal> = IndexMap::new();
        for inv in self.paid() {
            for item in &inv.items {
                let description = match item.description.trim() {
                    "" => UNNAMED_SERVICE,
                    d => d,
                };
                let amount = self.convert(inv, item.net_amount()?)?;
                accumulate(revenue.entry(description.to_string()).or_default(), amount)?;
            }
        }

        Ok(top_n(revenue, n)
            .into_iter()
            .map(|(description, total)| ServiceRevenue { description, total })
            .collect())
    }

    /// Mean payment delay of one client, `None` without paid invoices that
    /// carry a payment date.
    pub fn average_payment_delay(&self, client_id: ClientId) -> Option<Decimal> {
        self.payment_habits()
            .into_iter()
            .find(|habit| habit.client_id == client_id)
            .map(|habit| habit.average_days)
    }

    /// Mean payment delay for every client with qualifying invoices, in
    /// first-encountered order.
    pub fn payment_habits(&self) -> Vec<ClientPaymentDelay> {
        let mut delays: IndexMap<ClientId, (i64, usize)> = IndexMap::new();
        for inv in self.invoices {
            if let Some(days) = inv.payment_delay_days() {
                let entry = delays.entry(inv.client_id).or_default();
                entry.0 += days;
                entry.1 += 1;
            }
        }

        delays
            .into_iter()
            .map(|(client_id, (total_days, count))| ClientPaymentDelay {
                client_id,
                average_days: round_money(Decimal::from(total_days) / Decimal::from(count)),
                invoice_count: count,
            })
            .collect()
    }

    fn paid(&self) -> impl Iterator<Item = &Invoice> + '_ {
        self.invoices.iter().filter(|inv| inv.is_paid())
    }
}

/// Sort descending by amount and keep `n`; the stable sort keeps
/// first-encountered order among ties.
fn top_n<K>(totals: IndexMap<K, Decimal>, n: usize) -> Vec<(K, Decimal)> {
    let mut ranked: Vec<(K, Decimal)> = totals.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked.truncate(n);
    ranked
        .into_iter()
        .map(|(key, total)| (key, round_money(total)))
        .collect()
}
