//! Back-office routes (`admin` role).
//!
//! Account provisioning, credit grants and platform-wide settings. The role
//! check itself lives in [`crate::middleware::require_admin`].

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    routing::{get, post, put},
};
use chrono::Utc;

use fatoura_accounts::{Account, AdminGeneralSettings, CompanySettings, CompanySettingsPatch, NewAccount};
use fatoura_core::AccountId;

use crate::app::dto::GrantCreditsRequest;
use crate::app::errors::{self, ApiResult};
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/accounts", get(list_accounts).post(provision_account))
        .route("/accounts/:id/credits", post(grant_credits))
        .route("/accounts/:id/settings", put(update_account_settings))
        .route("/settings/general", get(general_settings).put(put_general_settings))
}

/// GET /admin/accounts
pub async fn list_accounts(
    Extension(services): Extension<Arc<AppServices>>,
) -> ApiResult<Json<Vec<Account>>> {
    services
        .store
        .list_accounts()
        .await
        .map(Json)
        .map_err(errors::store_error_to_response)
}

/// POST /admin/accounts - seeded from the general settings.
pub async fn provision_account(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<NewAccount>,
) -> ApiResult<(StatusCode, Json<Account>)> {
    let account = services
        .store
        .provision_account(body, Utc::now())
        .await
        .map_err(errors::store_error_to_response)?;

    tracing::info!(
        admin_id = %principal.account_id(),
        account_id = %account.id,
        credits = account.credits,
        "account provisioned"
    );
    Ok((StatusCode::CREATED, Json(account)))
}

/// POST /admin/accounts/:id/credits
pub async fn grant_credits(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<GrantCreditsRequest>,
) -> ApiResult<Json<Account>> {
    let account_id: AccountId = errors::parse_id(&id)?;
    let account = services
        .store
        .grant_credits(account_id, body.amount)
        .await
        .map_err(errors::store_error_to_response)?;

    tracing::info!(
        admin_id = %principal.account_id(),
        account_id = %account_id,
        amount = body.amount,
        credits = account.credits,
        "credits granted"
    );
    Ok(Json(account))
}

/// PUT /admin/accounts/:id/settings - partial merge, like `PATCH /settings`.
pub async fn update_account_settings(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(patch): Json<CompanySettingsPatch>,
) -> ApiResult<Json<CompanySettings>> {
    let account_id: AccountId = errors::parse_id(&id)?;
    services
        .store
        .update_company_settings(account_id, patch)
        .await
        .map(Json)
        .map_err(errors::store_error_to_response)
}

/// GET /admin/settings/general
pub async fn general_settings(
    Extension(services): Extension<Arc<AppServices>>,
) -> ApiResult<Json<AdminGeneralSettings>> {
    services
        .store
        .general_settings()
        .await
        .map(Json)
        .map_err(errors::store_error_to_response)
}

/// PUT /admin/settings/general
pub async fn put_general_settings(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<AdminGeneralSettings>,
) -> ApiResult<Json<AdminGeneralSettings>> {
    services
        .store
        .put_general_settings(body)
        .await
        .map(Json)
        .map_err(errors::store_error_to_response)
}
