use axum::{
    Router,
    routing::{get, patch},
};

pub mod account;
pub mod admin;
pub mod clients;
pub mod invoices;
pub mod portal;
pub mod reports;
pub mod system;

/// Router for all authenticated (account-scoped) endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/me", get(account::me).patch(account::update_profile))
        .route("/settings", patch(account::update_settings))
        .route("/data/initial", get(account::initial_data))
        .nest("/clients", clients::router())
        .nest("/invoices", invoices::router())
        .nest("/reports", reports::router())
}
