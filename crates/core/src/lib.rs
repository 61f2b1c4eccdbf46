//! `fatoura-core`: shared domain building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the domain error model, and money/currency helpers.

pub mod entity;
pub mod error;
pub mod id;
pub mod money;
pub mod validation;

pub use entity::Owned;
pub use error::{DomainError, DomainResult};
pub use id::{AccountId, ClientId, InvoiceId};
pub use money::{Currency, ExchangeRateProvider, round_money};
