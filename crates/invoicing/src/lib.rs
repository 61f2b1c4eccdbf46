//! Invoicing domain module.
//!
//! Pricing, the credit gate and write planning are deterministic domain logic
//! (no IO, no HTTP, no storage). Stores call [`plan_create`] / [`plan_update`]
//! inside their transactional unit and persist the result as-is.

pub mod billing;
pub mod invoice;
pub mod numbering;
pub mod pricing;
pub mod write;

pub use billing::{BillingDecision, InvoiceOperation, decide};
pub use invoice::{Invoice, InvoiceDraft, InvoiceItem, InvoiceStatus};
pub use numbering::next_invoice_number;
pub use pricing::{InvoiceTotals, compute_totals};
pub use write::{InvoiceWrite, WriteFacts, plan_create, plan_update};
