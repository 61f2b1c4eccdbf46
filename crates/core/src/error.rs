//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Every variant is caller-correctable: the HTTP layer maps each one to a 4xx
/// response and nothing is retried. Infrastructure failures live in the store
/// error type, not here.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (malformed or out-of-range input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The account has no credit left for a billable invoice operation.
    #[error("insufficient credits")]
    InsufficientCredits,

    /// The invoice number is already used by another invoice of the same account.
    #[error("invoice number '{0}' already exists")]
    DuplicateInvoiceNumber(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A referenced record (client, invoice, account) does not exist for the caller.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The operation conflicts with current state (e.g. registration closed).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn duplicate_number(number: impl Into<String>) -> Self {
        Self::DuplicateInvoiceNumber(number.into())
    }

    pub fn not_found(entity: &'static str) -> Self {
        Self::NotFound(entity)
    }
}
