use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use fatoura_core::DomainError;
use fatoura_infra::StoreError;

/// Handler result: the error side is an already-rendered JSON error response.
pub type ApiResult<T> = Result<T, Response>;

pub fn store_error_to_response(err: StoreError) -> Response {
    match err {
        StoreError::Domain(e) => domain_error_to_response(e),
        StoreError::Database(msg) => {
            tracing::error!(error = %msg, "store failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", "internal store error")
        }
        StoreError::Unavailable(msg) => {
            tracing::error!(error = %msg, "store unavailable");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_unavailable", "store unavailable")
        }
    }
}

pub fn domain_error_to_response(err: DomainError) -> Response {
    let message = err.to_string();
    match err {
        DomainError::Validation(_) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "validation_error", message)
        }
        DomainError::InvalidId(_) => json_error(StatusCode::UNPROCESSABLE_ENTITY, "invalid_id", message),
        DomainError::InsufficientCredits => {
            json_error(StatusCode::FORBIDDEN, "insufficient_credits", message)
        }
        DomainError::DuplicateInvoiceNumber(_) => {
            json_error(StatusCode::CONFLICT, "duplicate_invoice_number", message)
        }
        DomainError::NotFound(_) => json_error(StatusCode::NOT_FOUND, "not_found", message),
        DomainError::Conflict(_) => json_error(StatusCode::CONFLICT, "conflict", message),
    }
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Parse a path identifier, mapping failures to a 422 response.
pub fn parse_id<T>(raw: &str) -> ApiResult<T>
where
    T: std::str::FromStr<Err = DomainError>,
{
    raw.parse().map_err(domain_error_to_response)
}
