//! Field-level validation helpers shared by entity constructors.
//!
//! Each helper returns `DomainError::Validation` naming the offending field.

use std::sync::OnceLock;

use regex::Regex;
use rust_decimal::Decimal;

use crate::error::{DomainError, DomainResult};

/// Trim and require a non-empty value of at most `max` characters.
pub fn required_text(field: &str, value: &str, max: usize) -> DomainResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{field} is required")));
    }
    max_len(field, trimmed, max)?;
    Ok(trimmed.to_string())
}

/// Trim an optional value; blank becomes `None`.
pub fn optional_text(field: &str, value: Option<&str>, max: Option<usize>) -> DomainResult<Option<String>> {
    let Some(trimmed) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    if let Some(max) = max {
        max_len(field, trimmed, max)?;
    }
    Ok(Some(trimmed.to_string()))
}

/// Optional e-mail address (blank becomes `None`).
pub fn optional_email(field: &str, value: Option<&str>) -> DomainResult<Option<String>> {
    let email = optional_text(field, value, Some(255))?;
    if let Some(ref e) = email {
        if !is_valid_email(e) {
            return Err(DomainError::validation(format!("{field} must be a valid e-mail address")));
        }
    }
    Ok(email)
}

/// A tax rate expressed in percent, inclusive range 0..=100.
pub fn percent(field: &str, value: Decimal) -> DomainResult<Decimal> {
    if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
        return Err(DomainError::validation(format!("{field} must be between 0 and 100")));
    }
    Ok(value)
}

fn max_len(field: &str, value: &str, max: usize) -> DomainResult<()> {
    if value.chars().count() > max {
        return Err(DomainError::validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(())
}

pub fn is_valid_email(email: &str) -> bool {
    static EMAIL_REGEX: OnceLock<Option<Regex>> = OnceLock::new();
    EMAIL_REGEX
        .get_or_init(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").ok())
        .as_ref()
        .is_some_and(|regex| regex.is_match(email))
}
