//! Read-only reports over the caller's invoices.
//!
//! Each handler loads one snapshot of the account's invoices and runs the
//! pure [`Reporter`] over it. Figures are in the configured reporting currency
//! unless `?currency=` overrides it.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    routing::get,
};
use chrono::Utc;

use fatoura_core::{AccountId, ClientId, Currency};
use fatoura_invoicing::Invoice;
use fatoura_reporting::{DateRange, Reporter, TvaDeclaration};

use crate::app::dto::{
    CashFlowQuery, CashFlowResponse, PaymentDelayResponse, PerformanceQuery,
    PerformanceResponse, TvaQuery,
};
use crate::app::errors::{self, ApiResult};
use crate::app::services::AppServices;
use crate::context::AccountContext;

pub fn router() -> Router {
    Router::new()
        .route("/tva", get(tva))
        .route("/cash-flow", get(cash_flow))
        .route("/performance", get(performance))
        .route("/payment-delay/:client_id", get(payment_delay))
}

async fn snapshot(services: &AppServices, account_id: AccountId) -> ApiResult<Vec<Invoice>> {
    services
        .store
        .list_invoices(account_id)
        .await
        .map_err(errors::store_error_to_response)
}

fn currency_or_default(services: &AppServices, requested: Option<Currency>) -> Currency {
    requested.unwrap_or(services.reporting_currency)
}

/// GET /reports/tva?start&end
pub async fn tva(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(account): Extension<AccountContext>,
    Query(query): Query<TvaQuery>,
) -> ApiResult<Json<TvaDeclaration>> {
    let range = DateRange::new(query.start, query.end).map_err(errors::domain_error_to_response)?;
    let invoices = snapshot(&services, account.account_id()).await?;
    let currency = currency_or_default(&services, query.currency);

    let reporter = Reporter::new(&invoices, &*services.rates, currency);
    let declaration = reporter
        .tva_declaration(range)
        .map_err(errors::domain_error_to_response)?;
    Ok(Json(declaration))
}

/// GET /reports/cash-flow?days
pub async fn cash_flow(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(account): Extension<AccountContext>,
    Query(query): Query<CashFlowQuery>,
) -> ApiResult<Json<CashFlowResponse>> {
    let days = query.days().map_err(errors::domain_error_to_response)?;
    let invoices = snapshot(&services, account.account_id()).await?;
    let currency = currency_or_default(&services, query.currency);

    let reporter = Reporter::new(&invoices, &*services.rates, currency);
    let days = reporter
        .cash_flow_forecast(Utc::now().date_naive(), days)
        .map_err(errors::domain_error_to_response)?;
    Ok(Json(CashFlowResponse { currency, days }))
}

/// GET /reports/performance?limit
pub async fn performance(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(account): Extension<AccountContext>,
    Query(query): Query<PerformanceQuery>,
) -> ApiResult<Json<PerformanceResponse>> {
    let limit = query.limit().map_err(errors::domain_error_to_response)?;
    let invoices = snapshot(&services, account.account_id()).await?;
    let currency = currency_or_default(&services, query.currency);

    let reporter = Reporter::new(&invoices, &*services.rates, currency);
    Ok(Json(PerformanceResponse {
        currency,
        top_clients: reporter
            .top_clients_by_revenue(limit)
            .map_err(errors::domain_error_to_response)?,
        top_services: reporter
            .top_services_by_revenue(limit)
            .map_err(errors::domain_error_to_response)?,
        payment_habits: reporter.payment_habits(),
    }))
}

/// GET /reports/payment-delay/:client_id
pub async fn payment_delay(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(account): Extension<AccountContext>,
    Path(client_id): Path<String>,
) -> ApiResult<Json<PaymentDelayResponse>> {
    let client_id: ClientId = errors::parse_id(&client_id)?;
    // 404 for clients of other accounts.
    services
        .store
        .get_client(account.account_id(), client_id)
        .await
        .map_err(errors::store_error_to_response)?;

    let invoices = snapshot(&services, account.account_id()).await?;
    let reporter = Reporter::new(&invoices, &*services.rates, services.reporting_currency);

    Ok(Json(PaymentDelayResponse {
        client_id,
        average_days: reporter.average_payment_delay(client_id),
    }))
}
