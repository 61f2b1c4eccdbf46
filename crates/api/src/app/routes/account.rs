use std::sync::Arc;

use axum::{Json, extract::Extension};

use fatoura_accounts::{Account, CompanySettings, CompanySettingsPatch};
use fatoura_infra::InitialData;

use crate::app::dto::UpdateProfileRequest;
use crate::app::errors::{self, ApiResult};
use crate::app::services::AppServices;
use crate::context::AccountContext;

/// GET /me - the caller's account, credits and company settings.
pub async fn me(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(account): Extension<AccountContext>,
) -> ApiResult<Json<Account>> {
    services
        .store
        .get_account(account.account_id())
        .await
        .map(Json)
        .map_err(errors::store_error_to_response)
}

/// PATCH /me - rename the account holder.
pub async fn update_profile(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(account): Extension<AccountContext>,
    Json(request): Json<UpdateProfileRequest>,
) -> ApiResult<Json<Account>> {
    services
        .store
        .rename_account(account.account_id(), &request.name)
        .await
        .map(Json)
        .map_err(errors::store_error_to_response)
}

/// PATCH /settings - merge the given fields into the company settings.
pub async fn update_settings(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(account): Extension<AccountContext>,
    Json(patch): Json<CompanySettingsPatch>,
) -> ApiResult<Json<CompanySettings>> {
    services
        .store
        .update_company_settings(account.account_id(), patch)
        .await
        .map(Json)
        .map_err(errors::store_error_to_response)
}

/// GET /data/initial - account, clients and invoices in one payload.
pub async fn initial_data(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(account): Extension<AccountContext>,
) -> ApiResult<Json<InitialData>> {
    services
        .store
        .initial_data(account.account_id())
        .await
        .map(Json)
        .map_err(errors::store_error_to_response)
}
