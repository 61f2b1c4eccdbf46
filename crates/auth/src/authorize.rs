use thiserror::Error;

use crate::Role;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: missing role '{0}'")]
    MissingRole(String),
}

/// Require that `roles` contains `required`.
///
/// - No IO
/// - No panics
pub fn require_role(roles: &[Role], required: &Role) -> Result<(), AuthzError> {
    if roles.iter().any(|r| r == required) {
        Ok(())
    } else {
        Err(AuthzError::MissingRole(required.as_str().to_string()))
    }
}
