use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use fatoura_core::{ClientId, Currency, DomainError, DomainResult};
use fatoura_reporting::{ClientPaymentDelay, ClientRevenue, ForecastDay, ServiceRevenue};

/// Forecast horizon when `days` is omitted.
pub const DEFAULT_FORECAST_DAYS: u32 = 30;
pub const MAX_FORECAST_DAYS: u32 = 366;
/// Ranking length when `limit` is omitted.
pub const DEFAULT_TOP_LIMIT: usize = 5;
pub const MAX_TOP_LIMIT: usize = 100;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct GrantCreditsRequest {
    pub amount: u32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: String,
}

// -------------------------
// Query parameters
// -------------------------

#[derive(Debug, Deserialize)]
pub struct TvaQuery {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub currency: Option<Currency>,
}

#[derive(Debug, Deserialize)]
pub struct CashFlowQuery {
    pub days: Option<u32>,
    pub currency: Option<Currency>,
}

impl CashFlowQuery {
    pub fn days(&self) -> DomainResult<u32> {
        let days = self.days.unwrap_or(DEFAULT_FORECAST_DAYS);
        if days == 0 || days > MAX_FORECAST_DAYS {
            return Err(DomainError::validation(format!(
                "days must be between 1 and {MAX_FORECAST_DAYS}"
            )));
        }
        Ok(days)
    }
}

#[derive(Debug, Deserialize)]
pub struct PerformanceQuery {
    pub limit: Option<usize>,
    pub currency: Option<Currency>,
}

impl PerformanceQuery {
    pub fn limit(&self) -> DomainResult<usize> {
        let limit = self.limit.unwrap_or(DEFAULT_TOP_LIMIT);
        if limit == 0 || limit > MAX_TOP_LIMIT {
            return Err(DomainError::validation(format!(
                "limit must be between 1 and {MAX_TOP_LIMIT}"
            )));
        }
        Ok(limit)
    }
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NextNumberResponse {
    pub invoice_number: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CashFlowResponse {
    pub currency: Currency,
    pub days: Vec<ForecastDay>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceResponse {
    pub currency: Currency,
    pub top_clients: Vec<ClientRevenue>,
    pub top_services: Vec<ServiceRevenue>,
    pub payment_habits: Vec<ClientPaymentDelay>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDelayResponse {
    pub client_id: ClientId,
    /// `None` when the client has no paid invoice with a payment date.
    pub average_days: Option<Decimal>,
}
