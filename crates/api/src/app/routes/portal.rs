//! Public client portal: no bearer token, the client id is the capability.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    routing::get,
};

use fatoura_core::ClientId;
use fatoura_infra::ClientPortal;

use crate::app::errors::{self, ApiResult};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new().route("/clients/:id", get(client_portal))
}

/// GET /portal/clients/:id
pub async fn client_portal(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult<Json<ClientPortal>> {
    let client_id: ClientId = errors::parse_id(&id)?;
    let portal = services
        .store
        .client_portal(client_id)
        .await
        .map_err(errors::store_error_to_response)?;
    Ok(Json(portal))
}
