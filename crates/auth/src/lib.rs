//! `fatoura-auth`: bearer-token boundary (validation only).
//!
//! This crate is intentionally decoupled from HTTP and storage. It never issues
//! credentials; it turns a signed token into validated claims.

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod roles;

pub use authorize::{AuthzError, require_role};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256JwtValidator, JwtValidator};
pub use roles::Role;
