use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;

use fatoura_core::{DomainResult, ExchangeRateProvider, round_money};

use crate::reporter::{Reporter, accumulate};

/// Expected incoming cash on one calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastDay {
    pub date: NaiveDate,
    pub total: Decimal,
}

impl<R: ExchangeRateProvider + ?Sized> Reporter<'_, R> {
    /// One entry per date in `today..today + days`: the total of sent or
    /// overdue invoices due that day. Overdue invoices due before `today`
    /// are not counted.
    pub fn cash_flow_forecast(&self, today: NaiveDate, days: u32) -> DomainResult<Vec<ForecastDay>> {
        let mut buckets: Vec<ForecastDay> = (0..days)
            .map_while(|offset| today.checked_add_days(Days::new(u64::from(offset))))
            .map(|date| ForecastDay {
                date,
                total: Decimal::ZERO,
            })
            .collect();

        for inv in self.invoices.iter().filter(|inv| inv.status.is_outstanding()) {
            let offset = (inv.due_date - today).num_days();
            let Ok(index) = usize::try_from(offset) else {
                continue;
            };
            if let Some(day) = buckets.get_mut(index) {
                accumulate(&mut day.total, self.convert(inv, inv.total)?)?;
            }
        }

        for day in &mut buckets {
            day.total = round_money(day.total);
        }
        Ok(buckets)
    }
}
