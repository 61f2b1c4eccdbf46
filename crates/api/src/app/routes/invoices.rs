use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    routing::get,
};
use chrono::{Datelike, Utc};

use fatoura_core::InvoiceId;
use fatoura_infra::InvoiceReceipt;
use fatoura_invoicing::{Invoice, InvoiceDraft, next_invoice_number};

use crate::app::dto::NextNumberResponse;
use crate::app::errors::{self, ApiResult};
use crate::app::services::AppServices;
use crate::context::AccountContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_invoices).post(create_invoice))
        .route("/next-number", get(next_number))
        .route("/:id", get(get_invoice).put(update_invoice).delete(delete_invoice))
}

pub async fn list_invoices(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(account): Extension<AccountContext>,
) -> ApiResult<Json<Vec<Invoice>>> {
    services
        .store
        .list_invoices(account.account_id())
        .await
        .map(Json)
        .map_err(errors::store_error_to_response)
}

/// POST /invoices - consumes one credit.
pub async fn create_invoice(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(account): Extension<AccountContext>,
    Json(body): Json<InvoiceDraft>,
) -> ApiResult<(StatusCode, Json<InvoiceReceipt>)> {
    let receipt = services
        .store
        .create_invoice(account.account_id(), body, Utc::now())
        .await
        .map_err(errors::store_error_to_response)?;

    tracing::info!(
        account_id = %account.account_id(),
        invoice_id = %receipt.invoice.id,
        credits_remaining = receipt.credits_remaining,
        "invoice created"
    );
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// GET /invoices/next-number - suggestion only, nothing is reserved.
pub async fn next_number(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(account): Extension<AccountContext>,
) -> ApiResult<Json<NextNumberResponse>> {
    let current = services
        .store
        .get_account(account.account_id())
        .await
        .map_err(errors::store_error_to_response)?;
    let existing = services
        .store
        .list_invoices(account.account_id())
        .await
        .map_err(errors::store_error_to_response)?;

    let invoice_number = next_invoice_number(
        &current.settings.invoice_number_prefix,
        Utc::now().year(),
        existing.len(),
    );
    Ok(Json(NextNumberResponse { invoice_number }))
}

pub async fn get_invoice(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(account): Extension<AccountContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<Invoice>> {
    let invoice_id: InvoiceId = errors::parse_id(&id)?;
    services
        .store
        .get_invoice(account.account_id(), invoice_id)
        .await
        .map(Json)
        .map_err(errors::store_error_to_response)
}

/// PUT /invoices/:id - the first edit is free, later edits consume a credit.
pub async fn update_invoice(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(account): Extension<AccountContext>,
    Path(id): Path<String>,
    Json(body): Json<InvoiceDraft>,
) -> ApiResult<Json<InvoiceReceipt>> {
    let invoice_id: InvoiceId = errors::parse_id(&id)?;
    let receipt = services
        .store
        .update_invoice(account.account_id(), invoice_id, body, Utc::now())
        .await
        .map_err(errors::store_error_to_response)?;

    tracing::info!(
        account_id = %account.account_id(),
        invoice_id = %invoice_id,
        edit_count = receipt.invoice.edit_count,
        charged = receipt.charged,
        "invoice updated"
    );
    Ok(Json(receipt))
}

pub async fn delete_invoice(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(account): Extension<AccountContext>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let invoice_id: InvoiceId = errors::parse_id(&id)?;
    services
        .store
        .delete_invoice(account.account_id(), invoice_id)
        .await
        .map_err(errors::store_error_to_response)?;
    Ok(StatusCode::NO_CONTENT)
}
