//! Read-only reports over an account's invoices.
//!
//! Every report is a pure fold over a caller-supplied slice; amounts are
//! converted into the reporting currency before they are summed and rounded
//! once on output.

pub mod forecast;
pub mod performance;
pub mod range;
pub mod reporter;
pub mod tva;

pub use forecast::ForecastDay;
pub use performance::{ClientPaymentDelay, ClientRevenue, ServiceRevenue};
pub use range::DateRange;
pub use reporter::Reporter;
pub use tva::{CollectionLine, SalesLine, TvaDeclaration};

#[cfg(test)]
pub(crate) mod fixtures;
