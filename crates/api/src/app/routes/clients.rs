use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    routing::get,
};
use chrono::Utc;

use fatoura_clients::{Client, ClientDetails};
use fatoura_core::ClientId;

use crate::app::errors::{self, ApiResult};
use crate::app::services::AppServices;
use crate::context::AccountContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_clients).post(create_client))
        .route("/:id", get(get_client).put(update_client).delete(delete_client))
}

pub async fn list_clients(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(account): Extension<AccountContext>,
) -> ApiResult<Json<Vec<Client>>> {
    services
        .store
        .list_clients(account.account_id())
        .await
        .map(Json)
        .map_err(errors::store_error_to_response)
}

pub async fn create_client(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(account): Extension<AccountContext>,
    Json(body): Json<ClientDetails>,
) -> ApiResult<(StatusCode, Json<Client>)> {
    let client = services
        .store
        .create_client(account.account_id(), body, Utc::now())
        .await
        .map_err(errors::store_error_to_response)?;

    tracing::info!(account_id = %account.account_id(), client_id = %client.id, "client created");
    Ok((StatusCode::CREATED, Json(client)))
}

pub async fn get_client(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(account): Extension<AccountContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<Client>> {
    let client_id: ClientId = errors::parse_id(&id)?;
    services
        .store
        .get_client(account.account_id(), client_id)
        .await
        .map(Json)
        .map_err(errors::store_error_to_response)
}

pub async fn update_client(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(account): Extension<AccountContext>,
    Path(id): Path<String>,
    Json(body): Json<ClientDetails>,
) -> ApiResult<Json<Client>> {
    let client_id: ClientId = errors::parse_id(&id)?;
    services
        .store
        .update_client(account.account_id(), client_id, body, Utc::now())
        .await
        .map(Json)
        .map_err(errors::store_error_to_response)
}

/// DELETE /clients/:id - also removes the client's invoices.
pub async fn delete_client(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(account): Extension<AccountContext>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let client_id: ClientId = errors::parse_id(&id)?;
    services
        .store
        .delete_client(account.account_id(), client_id)
        .await
        .map_err(errors::store_error_to_response)?;

    tracing::info!(account_id = %account.account_id(), client_id = %client_id, "client deleted");
    Ok(StatusCode::NO_CONTENT)
}
