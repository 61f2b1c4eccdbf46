//! Persistence boundary for accounts, clients, invoices and global settings.
//!
//! Every write runs as one unit: the account record is locked (row lock in
//! Postgres, the store's write lock in memory) across the credit check and the
//! decrement, and a failed write leaves nothing behind.

mod in_memory;
mod postgres;

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use fatoura_accounts::{Account, AdminGeneralSettings, CompanySettings, CompanySettingsPatch, NewAccount};
use fatoura_clients::{Client, ClientDetails};
use fatoura_core::{AccountId, ClientId, DomainError, InvoiceId};
use fatoura_invoicing::{Invoice, InvoiceDraft};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("database error: {0}")]
    Database(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Result of a successful invoice write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceReceipt {
    pub invoice: Invoice,
    /// Whether the write consumed a credit.
    pub charged: bool,
    pub credits_remaining: u32,
}

/// Everything an account's dashboard loads on start-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialData {
    pub account: Account,
    pub clients: Vec<Client>,
    pub invoices: Vec<Invoice>,
}

/// Public view of a client: their invoices and the issuing company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientPortal {
    pub client: Client,
    pub invoices: Vec<Invoice>,
    pub settings: CompanySettings,
}

#[async_trait]
pub trait Store: Send + Sync {
    // Accounts and platform settings.

    /// Create an account seeded from the current [`AdminGeneralSettings`].
    async fn provision_account(&self, new: NewAccount, now: DateTime<Utc>) -> StoreResult<Account>;
    async fn get_account(&self, account_id: AccountId) -> StoreResult<Account>;
    async fn list_accounts(&self) -> StoreResult<Vec<Account>>;
    async fn grant_credits(&self, account_id: AccountId, amount: u32) -> StoreResult<Account>;
    async fn rename_account(&self, account_id: AccountId, name: &str) -> StoreResult<Account>;
    async fn update_company_settings(
        &self,
        account_id: AccountId,
        patch: CompanySettingsPatch,
    ) -> StoreResult<CompanySettings>;
    /// Stored general settings, or the defaults when none were saved.
    async fn general_settings(&self) -> StoreResult<AdminGeneralSettings>;
    async fn put_general_settings(
        &self,
        settings: AdminGeneralSettings,
    ) -> StoreResult<AdminGeneralSettings>;

    // Clients.

    async fn list_clients(&self, account_id: AccountId) -> StoreResult<Vec<Client>>;
    async fn get_client(&self, account_id: AccountId, client_id: ClientId) -> StoreResult<Client>;
    async fn create_client(
        &self,
        account_id: AccountId,
        details: ClientDetails,
        now: DateTime<Utc>,
    ) -> StoreResult<Client>;
    async fn update_client(
        &self,
        account_id: AccountId,
        client_id: ClientId,
        details: ClientDetails,
        now: DateTime<Utc>,
    ) -> StoreResult<Client>;
    /// Delete a client together with its invoices.
    async fn delete_client(&self, account_id: AccountId, client_id: ClientId) -> StoreResult<()>;

    // Invoices.

    async fn list_invoices(&self, account_id: AccountId) -> StoreResult<Vec<Invoice>>;
    async fn get_invoice(&self, account_id: AccountId, invoice_id: InvoiceId) -> StoreResult<Invoice>;
    async fn create_invoice(
        &self,
        account_id: AccountId,
        draft: InvoiceDraft,
        now: DateTime<Utc>,
    ) -> StoreResult<InvoiceReceipt>;
    async fn update_invoice(
        &self,
        account_id: AccountId,
        invoice_id: InvoiceId,
        draft: InvoiceDraft,
        now: DateTime<Utc>,
    ) -> StoreResult<InvoiceReceipt>;
    async fn delete_invoice(&self, account_id: AccountId, invoice_id: InvoiceId) -> StoreResult<()>;

    // Read views.

    async fn initial_data(&self, account_id: AccountId) -> StoreResult<InitialData>;
    /// Unauthenticated: looks the client up across all accounts.
    async fn client_portal(&self, client_id: ClientId) -> StoreResult<ClientPortal>;
}
