use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde_json::Value as JsonValue;

use fatoura_accounts::{
    ADMIN_GENERAL_SETTINGS_KEY, Account, AdminGeneralSettings, CompanySettings,
    CompanySettingsPatch, NewAccount,
};
use fatoura_clients::{Client, ClientDetails};
use fatoura_core::{AccountId, ClientId, DomainError, InvoiceId, Owned};
use fatoura_invoicing::{Invoice, InvoiceDraft, WriteFacts, plan_create, plan_update};

use super::{ClientPortal, InitialData, InvoiceReceipt, Store, StoreError, StoreResult};

#[derive(Debug, Default)]
struct State {
    accounts: IndexMap<AccountId, Account>,
    clients: IndexMap<ClientId, Client>,
    invoices: IndexMap<InvoiceId, Invoice>,
    settings: HashMap<String, JsonValue>,
}

/// In-memory store for tests/dev.
///
/// A single `RwLock` guards all state; every write holds the write guard for
/// its whole check-then-act sequence, which serializes credit consumption.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| StoreError::Unavailable("in-memory store lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| StoreError::Unavailable("in-memory store lock poisoned".to_string()))
    }
}

impl State {
    fn account(&self, account_id: AccountId) -> StoreResult<&Account> {
        self.accounts
            .get(&account_id)
            .ok_or_else(|| DomainError::not_found("account").into())
    }

    fn account_mut(&mut self, account_id: AccountId) -> StoreResult<&mut Account> {
        self.accounts
            .get_mut(&account_id)
            .ok_or_else(|| DomainError::not_found("account").into())
    }

    fn general_settings(&self) -> StoreResult<AdminGeneralSettings> {
        match self.settings.get(ADMIN_GENERAL_SETTINGS_KEY) {
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|e| StoreError::Database(format!("corrupt general settings: {e}"))),
            None => Ok(AdminGeneralSettings::default()),
        }
    }

    fn client(&self, account_id: AccountId, client_id: ClientId) -> Option<&Client> {
        self.clients
            .get(&client_id)
            .filter(|c| c.is_owned_by(account_id))
    }

    fn invoice(&self, account_id: AccountId, invoice_id: InvoiceId) -> Option<&Invoice> {
        self.invoices
            .get(&invoice_id)
            .filter(|inv| inv.is_owned_by(account_id))
    }

    fn number_taken(&self, account_id: AccountId, number: &str, except: Option<InvoiceId>) -> bool {
        self.invoices.values().any(|inv| {
            inv.is_owned_by(account_id)
                && inv.invoice_number == number
                && Some(inv.id) != except
        })
    }

    fn clients_of(&self, account_id: AccountId) -> Vec<Client> {
        self.clients
            .values()
            .filter(|c| c.is_owned_by(account_id))
            .cloned()
            .collect()
    }

    fn invoices_of(&self, account_id: AccountId) -> Vec<Invoice> {
        self.invoices
            .values()
            .filter(|inv| inv.is_owned_by(account_id))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn provision_account(&self, new: NewAccount, now: DateTime<Utc>) -> StoreResult<Account> {
        let mut state = self.write()?;
        let general = state.general_settings()?;
        let account = Account::provision(AccountId::new(), new, &general, now)?;

        if state
            .accounts
            .values()
            .any(|a| a.email.eq_ignore_ascii_case(&account.email))
        {
            return Err(DomainError::conflict("email already registered").into());
        }
        state.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn get_account(&self, account_id: AccountId) -> StoreResult<Account> {
        self.read()?.account(account_id).cloned()
    }

    async fn list_accounts(&self) -> StoreResult<Vec<Account>> {
        Ok(self.read()?.accounts.values().cloned().collect())
    }

    async fn grant_credits(&self, account_id: AccountId, amount: u32) -> StoreResult<Account> {
        let mut state = self.write()?;
        let account = state.account_mut(account_id)?;
        account.grant_credits(amount)?;
        Ok(account.clone())
    }

    async fn rename_account(&self, account_id: AccountId, name: &str) -> StoreResult<Account> {
        let mut state = self.write()?;
        let account = state.account_mut(account_id)?;
        account.rename(name)?;
        Ok(account.clone())
    }

    async fn update_company_settings(
        &self,
        account_id: AccountId,
        patch: CompanySettingsPatch,
    ) -> StoreResult<CompanySettings> {
        let mut state = self.write()?;
        let account = state.account_mut(account_id)?;
        account.settings = patch.apply(&account.settings)?;
        Ok(account.settings.clone())
    }

    async fn general_settings(&self) -> StoreResult<AdminGeneralSettings> {
        self.read()?.general_settings()
    }

    async fn put_general_settings(
        &self,
        settings: AdminGeneralSettings,
    ) -> StoreResult<AdminGeneralSettings> {
        let settings = settings.validated()?;
        let value = serde_json::to_value(&settings)
            .map_err(|e| StoreError::Database(format!("serialize general settings: {e}")))?;
        self.write()?
            .settings
            .insert(ADMIN_GENERAL_SETTINGS_KEY.to_string(), value);
        Ok(settings)
    }

    async fn list_clients(&self, account_id: AccountId) -> StoreResult<Vec<Client>> {
        Ok(self.read()?.clients_of(account_id))
    }

    async fn get_client(&self, account_id: AccountId, client_id: ClientId) -> StoreResult<Client> {
        self.read()?
            .client(account_id, client_id)
            .cloned()
            .ok_or_else(|| DomainError::not_found("client").into())
    }

    async fn create_client(
        &self,
        account_id: AccountId,
        details: ClientDetails,
        now: DateTime<Utc>,
    ) -> StoreResult<Client> {
        let mut state = self.write()?;
        state.account(account_id)?;
        let client = Client::create(ClientId::new(), account_id, details, now)?;
        state.clients.insert(client.id, client.clone());
        Ok(client)
    }

    async fn update_client(
        &self,
        account_id: AccountId,
        client_id: ClientId,
        details: ClientDetails,
        now: DateTime<Utc>,
    ) -> StoreResult<Client> {
        let mut state = self.write()?;
        let client = state
            .clients
            .get_mut(&client_id)
            .filter(|c| c.is_owned_by(account_id))
            .ok_or(DomainError::not_found("client"))?;
        client.update(details, now)?;
        Ok(client.clone())
    }

    async fn delete_client(&self, account_id: AccountId, client_id: ClientId) -> StoreResult<()> {
        let mut state = self.write()?;
        if state.client(account_id, client_id).is_none() {
            return Err(DomainError::not_found("client").into());
        }
        state.clients.shift_remove(&client_id);
        state.invoices.retain(|_, inv| inv.client_id != client_id);
        Ok(())
    }

    async fn list_invoices(&self, account_id: AccountId) -> StoreResult<Vec<Invoice>> {
        Ok(self.read()?.invoices_of(account_id))
    }

    async fn get_invoice(&self, account_id: AccountId, invoice_id: InvoiceId) -> StoreResult<Invoice> {
        self.read()?
            .invoice(account_id, invoice_id)
            .cloned()
            .ok_or_else(|| DomainError::not_found("invoice").into())
    }

    async fn create_invoice(
        &self,
        account_id: AccountId,
        draft: InvoiceDraft,
        now: DateTime<Utc>,
    ) -> StoreResult<InvoiceReceipt> {
        let mut guard = self.write()?;
        let state = &mut *guard;

        let facts = WriteFacts {
            client_exists: state.client(account_id, draft.client_id).is_some(),
            number_taken: state.number_taken(account_id, draft.normalized_number(), None),
            now,
        };
        let account = state.account_mut(account_id)?;
        let write = plan_create(account, InvoiceId::new(), draft, &facts)?;
        write.decision.settle(account)?;
        let credits_remaining = account.credits;

        state.invoices.insert(write.invoice.id, write.invoice.clone());
        Ok(InvoiceReceipt {
            invoice: write.invoice,
            charged: write.decision.charge,
            credits_remaining,
        })
    }

    async fn update_invoice(
        &self,
        account_id: AccountId,
        invoice_id: InvoiceId,
        draft: InvoiceDraft,
        now: DateTime<Utc>,
    ) -> StoreResult<InvoiceReceipt> {
        let mut guard = self.write()?;
        let state = &mut *guard;

        let existing = state
            .invoice(account_id, invoice_id)
            .cloned()
            .ok_or(DomainError::not_found("invoice"))?;
        let facts = WriteFacts {
            client_exists: state.client(account_id, draft.client_id).is_some(),
            number_taken: state.number_taken(
                account_id,
                draft.normalized_number(),
                Some(invoice_id),
            ),
            now,
        };
        let account = state.account_mut(account_id)?;
        let write = plan_update(account, &existing, draft, &facts)?;
        write.decision.settle(account)?;
        let credits_remaining = account.credits;

        state.invoices.insert(invoice_id, write.invoice.clone());
        Ok(InvoiceReceipt {
            invoice: write.invoice,
            charged: write.decision.charge,
            credits_remaining,
        })
    }

    async fn delete_invoice(&self, account_id: AccountId, invoice_id: InvoiceId) -> StoreResult<()> {
        let mut state = self.write()?;
        if state.invoice(account_id, invoice_id).is_none() {
            return Err(DomainError::not_found("invoice").into());
        }
        state.invoices.shift_remove(&invoice_id);
        Ok(())
    }

    async fn initial_data(&self, account_id: AccountId) -> StoreResult<InitialData> {
        let state = self.read()?;
        Ok(InitialData {
            account: state.account(account_id)?.clone(),
            clients: state.clients_of(account_id),
            invoices: state.invoices_of(account_id),
        })
    }

    async fn client_portal(&self, client_id: ClientId) -> StoreResult<ClientPortal> {
        let state = self.read()?;
        let client = state
            .clients
            .get(&client_id)
            .cloned()
            .ok_or(DomainError::not_found("client"))?;
        let settings = state.account(client.account_id)?.settings.clone();
        let invoices = state
            .invoices
            .values()
            .filter(|inv| inv.client_id == client_id)
            .cloned()
            .collect();
        Ok(ClientPortal {
            client,
            invoices,
            settings,
        })
    }
}
