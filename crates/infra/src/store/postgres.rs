//! Postgres-backed store.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Domain(DuplicateInvoiceNumber)` / `Domain(Conflict)` |
//! | Database (other) | Any other | `Database` |
//! | PoolClosed / PoolTimedOut / Io | N/A | `Unavailable` |
//! | Other | N/A | `Database` |
//!
//! ## Credit Serialization
//!
//! Invoice writes lock the owning account row with `SELECT ... FOR UPDATE`
//! before any check, so concurrent writes for one account run one after the
//! other and the credit check always sees the committed balance.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use tracing::{Span, instrument};
use uuid::Uuid;

use fatoura_accounts::{
    ADMIN_GENERAL_SETTINGS_KEY, Account, AdminGeneralSettings, CompanySettings,
    CompanySettingsPatch, NewAccount,
};
use fatoura_clients::{Client, ClientDetails};
use fatoura_core::{AccountId, ClientId, DomainError, InvoiceId};
use fatoura_invoicing::{
    Invoice, InvoiceDraft, InvoiceItem, InvoiceWrite, WriteFacts, plan_create, plan_update,
};

use super::{ClientPortal, InitialData, InvoiceReceipt, Store, StoreError, StoreResult};

const ACCOUNT_COLUMNS: &str = "id, name, email, phone, credits, settings, created_at";
const CLIENT_COLUMNS: &str =
    "id, account_id, name, email, phone, address, cin, ice, created_at, updated_at";
const INVOICE_COLUMNS: &str = "id, account_id, client_id, invoice_number, issue_date, due_date, \
     status, currency, notes, sub_total, tax_amount, total, edit_count, payment_date, \
     created_at, updated_at";

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a connection pool.
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Apply the embedded schema migrations.
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(format!("migration failed: {e}")))
    }

    async fn begin(&self, operation: &str) -> StoreResult<Transaction<'static, Postgres>> {
        self.pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error(operation, e))
    }

    async fn load_general_settings(
        &self,
        tx: &mut Transaction<'_, Postgres>,
    ) -> StoreResult<AdminGeneralSettings> {
        let row = sqlx::query("SELECT value FROM settings WHERE key = $1")
            .bind(ADMIN_GENERAL_SETTINGS_KEY)
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("load_general_settings", e))?;

        match row {
            Some(row) => {
                let Json(settings) = row
                    .try_get::<Json<AdminGeneralSettings>, _>("value")
                    .map_err(|e| map_sqlx_error("decode_general_settings", e))?;
                Ok(settings)
            }
            None => Ok(AdminGeneralSettings::default()),
        }
    }

    async fn fetch_invoices(&self, filter: &str, id: Uuid) -> StoreResult<Vec<Invoice>> {
        let rows = sqlx::query(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE {filter} = $1 ORDER BY created_at, id"
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_invoices", e))?;

        let headers = rows
            .iter()
            .map(InvoiceRow::from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error("decode_invoice", e))?;
        let ids: Vec<Uuid> = headers.iter().map(|h| h.id).collect();
        let mut items = fetch_items(&self.pool, &ids).await?;

        headers
            .into_iter()
            .map(|h| {
                let lines = items.remove(&h.id).unwrap_or_default();
                h.into_invoice(lines)
            })
            .collect()
    }

    async fn fetch_clients(&self, account_id: AccountId) -> StoreResult<Vec<Client>> {
        let rows = sqlx::query(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE account_id = $1 ORDER BY created_at, id"
        ))
        .bind(account_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_clients", e))?;

        rows.iter()
            .map(|row| ClientRow::from_row(row).map(Client::from))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error("decode_client", e))
    }

    /// Persist a planned invoice write and the resulting balance, then commit.
    async fn commit_invoice_write(
        &self,
        mut tx: Transaction<'static, Postgres>,
        mut account: Account,
        write: InvoiceWrite,
        is_update: bool,
    ) -> StoreResult<InvoiceReceipt> {
        write.decision.settle(&mut account)?;

        if write.decision.charge {
            sqlx::query("UPDATE accounts SET credits = $2 WHERE id = $1")
                .bind(account.id.as_uuid())
                .bind(to_i32("credits", account.credits)?)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("consume_credit", e))?;
        }

        let inv = &write.invoice;
        let statement = if is_update {
            "UPDATE invoices SET client_id = $3, invoice_number = $4, issue_date = $5, \
             due_date = $6, status = $7, currency = $8, notes = $9, sub_total = $10, \
             tax_amount = $11, total = $12, edit_count = $13, payment_date = $14, \
             created_at = $15, updated_at = $16 \
             WHERE id = $1 AND account_id = $2"
        } else {
            "INSERT INTO invoices (id, account_id, client_id, invoice_number, issue_date, \
             due_date, status, currency, notes, sub_total, tax_amount, total, edit_count, \
             payment_date, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)"
        };
        sqlx::query(statement)
            .bind(inv.id.as_uuid())
            .bind(inv.account_id.as_uuid())
            .bind(inv.client_id.as_uuid())
            .bind(&inv.invoice_number)
            .bind(inv.issue_date)
            .bind(inv.due_date)
            .bind(inv.status.as_str())
            .bind(inv.currency.code())
            .bind(&inv.notes)
            .bind(inv.sub_total)
            .bind(inv.tax_amount)
            .bind(inv.total)
            .bind(to_i32("edit_count", inv.edit_count)?)
            .bind(inv.payment_date)
            .bind(inv.created_at)
            .bind(inv.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::Domain(DomainError::duplicate_number(inv.invoice_number.clone()))
                } else {
                    map_sqlx_error("write_invoice", e)
                }
            })?;

        if is_update {
            sqlx::query("DELETE FROM invoice_items WHERE invoice_id = $1")
                .bind(inv.id.as_uuid())
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("delete_items", e))?;
        }
        for (position, item) in inv.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO invoice_items
                    (invoice_id, position, description, quantity, unit_price, tax_rate_percent)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(inv.id.as_uuid())
            .bind(to_i32("position", position)?)
            .bind(&item.description)
            .bind(item.quantity)
            .bind(item.unit_price)
            .bind(item.tax_rate_percent)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_item", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Span::current().record("charged", write.decision.charge);
        Ok(InvoiceReceipt {
            charged: write.decision.charge,
            credits_remaining: account.credits,
            invoice: write.invoice,
        })
    }
}

#[async_trait]
impl Store for PostgresStore {
    #[instrument(skip(self, new), err)]
    async fn provision_account(&self, new: NewAccount, now: DateTime<Utc>) -> StoreResult<Account> {
        let mut tx = self.begin("provision_account").await?;
        let general = self.load_general_settings(&mut tx).await?;
        let account = Account::provision(AccountId::new(), new, &general, now)?;

        sqlx::query(
            r#"
            INSERT INTO accounts (id, name, email, phone, credits, settings, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(account.id.as_uuid())
        .bind(&account.name)
        .bind(&account.email)
        .bind(&account.phone)
        .bind(to_i32("credits", account.credits)?)
        .bind(Json(&account.settings))
        .bind(account.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Domain(DomainError::conflict("email already registered"))
            } else {
                map_sqlx_error("insert_account", e)
            }
        })?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(account)
    }

    #[instrument(skip(self), fields(account_id = %account_id), err)]
    async fn get_account(&self, account_id: AccountId) -> StoreResult<Account> {
        let row = sqlx::query(&format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1"))
            .bind(account_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_account", e))?
            .ok_or(DomainError::not_found("account"))?;
        account_from_row(&row)
    }

    #[instrument(skip(self), err)]
    async fn list_accounts(&self) -> StoreResult<Vec<Account>> {
        let rows = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts ORDER BY created_at, id"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_accounts", e))?;
        rows.iter().map(account_from_row).collect()
    }

    #[instrument(skip(self), fields(account_id = %account_id), err)]
    async fn grant_credits(&self, account_id: AccountId, amount: u32) -> StoreResult<Account> {
        let mut tx = self.begin("grant_credits").await?;
        let mut account = lock_account(&mut tx, account_id).await?;
        account.grant_credits(amount)?;

        sqlx::query("UPDATE accounts SET credits = $2 WHERE id = $1")
            .bind(account_id.as_uuid())
            .bind(to_i32("credits", account.credits)?)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("grant_credits", e))?;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(account)
    }

    #[instrument(skip(self, name), fields(account_id = %account_id), err)]
    async fn rename_account(&self, account_id: AccountId, name: &str) -> StoreResult<Account> {
        let mut tx = self.begin("rename_account").await?;
        let mut account = lock_account(&mut tx, account_id).await?;
        account.rename(name)?;

        sqlx::query("UPDATE accounts SET name = $2 WHERE id = $1")
            .bind(account_id.as_uuid())
            .bind(&account.name)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("rename_account", e))?;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(account)
    }

    #[instrument(skip(self, patch), fields(account_id = %account_id), err)]
    async fn update_company_settings(
        &self,
        account_id: AccountId,
        patch: CompanySettingsPatch,
    ) -> StoreResult<CompanySettings> {
        let mut tx = self.begin("update_company_settings").await?;
        let account = lock_account(&mut tx, account_id).await?;
        let settings = patch.apply(&account.settings)?;

        sqlx::query("UPDATE accounts SET settings = $2 WHERE id = $1")
            .bind(account_id.as_uuid())
            .bind(Json(&settings))
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_company_settings", e))?;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(settings)
    }

    #[instrument(skip(self), err)]
    async fn general_settings(&self) -> StoreResult<AdminGeneralSettings> {
        let mut tx = self.begin("general_settings").await?;
        let settings = self.load_general_settings(&mut tx).await?;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(settings)
    }

    #[instrument(skip(self, settings), err)]
    async fn put_general_settings(
        &self,
        settings: AdminGeneralSettings,
    ) -> StoreResult<AdminGeneralSettings> {
        let settings = settings.validated()?;
        sqlx::query(
            r#"
            INSERT INTO settings (key, value, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (key)
            DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()
            "#,
        )
        .bind(ADMIN_GENERAL_SETTINGS_KEY)
        .bind(Json(&settings))
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("put_general_settings", e))?;
        Ok(settings)
    }

    #[instrument(skip(self), fields(account_id = %account_id), err)]
    async fn list_clients(&self, account_id: AccountId) -> StoreResult<Vec<Client>> {
        self.fetch_clients(account_id).await
    }

    #[instrument(skip(self), fields(account_id = %account_id, client_id = %client_id), err)]
    async fn get_client(&self, account_id: AccountId, client_id: ClientId) -> StoreResult<Client> {
        let row = sqlx::query(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE id = $1 AND account_id = $2"
        ))
        .bind(client_id.as_uuid())
        .bind(account_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_client", e))?
        .ok_or(DomainError::not_found("client"))?;

        ClientRow::from_row(&row)
            .map(Client::from)
            .map_err(|e| map_sqlx_error("decode_client", e))
    }

    #[instrument(skip(self, details), fields(account_id = %account_id), err)]
    async fn create_client(
        &self,
        account_id: AccountId,
        details: ClientDetails,
        now: DateTime<Utc>,
    ) -> StoreResult<Client> {
        let client = Client::create(ClientId::new(), account_id, details, now)?;
        let result = sqlx::query(
            r#"
            INSERT INTO clients (id, account_id, name, email, phone, address, cin, ice, created_at, updated_at)
            SELECT $1, id, $3, $4, $5, $6, $7, $8, $9, $10 FROM accounts WHERE id = $2
            "#,
        )
        .bind(client.id.as_uuid())
        .bind(account_id.as_uuid())
        .bind(&client.name)
        .bind(&client.email)
        .bind(&client.phone)
        .bind(&client.address)
        .bind(&client.cin)
        .bind(&client.ice)
        .bind(client.created_at)
        .bind(client.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_client", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("account").into());
        }
        Ok(client)
    }

    #[instrument(skip(self, details), fields(account_id = %account_id, client_id = %client_id), err)]
    async fn update_client(
        &self,
        account_id: AccountId,
        client_id: ClientId,
        details: ClientDetails,
        now: DateTime<Utc>,
    ) -> StoreResult<Client> {
        let mut client = self.get_client(account_id, client_id).await?;
        client.update(details, now)?;

        let result = sqlx::query(
            r#"
            UPDATE clients
            SET name = $3, email = $4, phone = $5, address = $6, cin = $7, ice = $8, updated_at = $9
            WHERE id = $1 AND account_id = $2
            "#,
        )
        .bind(client_id.as_uuid())
        .bind(account_id.as_uuid())
        .bind(&client.name)
        .bind(&client.email)
        .bind(&client.phone)
        .bind(&client.address)
        .bind(&client.cin)
        .bind(&client.ice)
        .bind(client.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_client", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("client").into());
        }
        Ok(client)
    }

    #[instrument(skip(self), fields(account_id = %account_id, client_id = %client_id), err)]
    async fn delete_client(&self, account_id: AccountId, client_id: ClientId) -> StoreResult<()> {
        // Invoices and their items go with the client (ON DELETE CASCADE).
        let result = sqlx::query("DELETE FROM clients WHERE id = $1 AND account_id = $2")
            .bind(client_id.as_uuid())
            .bind(account_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_client", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("client").into());
        }
        Ok(())
    }

    #[instrument(skip(self), fields(account_id = %account_id), err)]
    async fn list_invoices(&self, account_id: AccountId) -> StoreResult<Vec<Invoice>> {
        self.fetch_invoices("account_id", *account_id.as_uuid()).await
    }

    #[instrument(skip(self), fields(account_id = %account_id, invoice_id = %invoice_id), err)]
    async fn get_invoice(&self, account_id: AccountId, invoice_id: InvoiceId) -> StoreResult<Invoice> {
        let row = sqlx::query(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = $1 AND account_id = $2"
        ))
        .bind(invoice_id.as_uuid())
        .bind(account_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_invoice", e))?
        .ok_or(DomainError::not_found("invoice"))?;

        let header = InvoiceRow::from_row(&row).map_err(|e| map_sqlx_error("decode_invoice", e))?;
        let mut items = fetch_items(&self.pool, &[header.id]).await?;
        let lines = items.remove(&header.id).unwrap_or_default();
        header.into_invoice(lines)
    }

    #[instrument(
        skip(self, draft),
        fields(account_id = %account_id, invoice_number = %draft.normalized_number(), charged = tracing::field::Empty),
        err
    )]
    async fn create_invoice(
        &self,
        account_id: AccountId,
        draft: InvoiceDraft,
        now: DateTime<Utc>,
    ) -> StoreResult<InvoiceReceipt> {
        let mut tx = self.begin("create_invoice").await?;
        let account = lock_account(&mut tx, account_id).await?;

        let facts = WriteFacts {
            client_exists: client_exists(&mut tx, account_id, draft.client_id).await?,
            number_taken: number_taken(&mut tx, account_id, draft.normalized_number(), None).await?,
            now,
        };
        // Any error drops `tx`, which rolls back.
        let write = plan_create(&account, InvoiceId::new(), draft, &facts)?;
        self.commit_invoice_write(tx, account, write, false).await
    }

    #[instrument(
        skip(self, draft),
        fields(account_id = %account_id, invoice_id = %invoice_id, charged = tracing::field::Empty),
        err
    )]
    async fn update_invoice(
        &self,
        account_id: AccountId,
        invoice_id: InvoiceId,
        draft: InvoiceDraft,
        now: DateTime<Utc>,
    ) -> StoreResult<InvoiceReceipt> {
        let mut tx = self.begin("update_invoice").await?;
        let account = lock_account(&mut tx, account_id).await?;

        let row = sqlx::query(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = $1 AND account_id = $2 FOR UPDATE"
        ))
        .bind(invoice_id.as_uuid())
        .bind(account_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("lock_invoice", e))?
        .ok_or(DomainError::not_found("invoice"))?;
        let header = InvoiceRow::from_row(&row).map_err(|e| map_sqlx_error("decode_invoice", e))?;
        // Items are replaced wholesale, so the stored ones are not needed for planning.
        let existing = header.into_invoice(Vec::new())?;

        let facts = WriteFacts {
            client_exists: client_exists(&mut tx, account_id, draft.client_id).await?,
            number_taken: number_taken(
                &mut tx,
                account_id,
                draft.normalized_number(),
                Some(invoice_id),
            )
            .await?,
            now,
        };
        let write = plan_update(&account, &existing, draft, &facts)?;
        self.commit_invoice_write(tx, account, write, true).await
    }

    #[instrument(skip(self), fields(account_id = %account_id, invoice_id = %invoice_id), err)]
    async fn delete_invoice(&self, account_id: AccountId, invoice_id: InvoiceId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM invoices WHERE id = $1 AND account_id = $2")
            .bind(invoice_id.as_uuid())
            .bind(account_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_invoice", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("invoice").into());
        }
        Ok(())
    }

    #[instrument(skip(self), fields(account_id = %account_id), err)]
    async fn initial_data(&self, account_id: AccountId) -> StoreResult<InitialData> {
        let account = self.get_account(account_id).await?;
        let clients = self.fetch_clients(account_id).await?;
        let invoices = self
            .fetch_invoices("account_id", *account_id.as_uuid())
            .await?;
        Ok(InitialData {
            account,
            clients,
            invoices,
        })
    }

    #[instrument(skip(self), fields(client_id = %client_id), err)]
    async fn client_portal(&self, client_id: ClientId) -> StoreResult<ClientPortal> {
        let row = sqlx::query(&format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE id = $1"))
            .bind(client_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_client", e))?
            .ok_or(DomainError::not_found("client"))?;
        let client = ClientRow::from_row(&row)
            .map(Client::from)
            .map_err(|e| map_sqlx_error("decode_client", e))?;

        let settings = self.get_account(client.account_id).await?.settings;
        let invoices = self
            .fetch_invoices("client_id", *client_id.as_uuid())
            .await?;
        Ok(ClientPortal {
            client,
            invoices,
            settings,
        })
    }
}

/// Load an account and hold its row lock until the transaction ends.
async fn lock_account(
    tx: &mut Transaction<'_, Postgres>,
    account_id: AccountId,
) -> StoreResult<Account> {
    let row = sqlx::query(&format!(
        "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1 FOR UPDATE"
    ))
    .bind(account_id.as_uuid())
    .fetch_optional(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("lock_account", e))?
    .ok_or(DomainError::not_found("account"))?;
    account_from_row(&row)
}

async fn client_exists(
    tx: &mut Transaction<'_, Postgres>,
    account_id: AccountId,
    client_id: ClientId,
) -> StoreResult<bool> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM clients WHERE id = $1 AND account_id = $2)",
    )
    .bind(client_id.as_uuid())
    .bind(account_id.as_uuid())
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("client_exists", e))
}

async fn number_taken(
    tx: &mut Transaction<'_, Postgres>,
    account_id: AccountId,
    number: &str,
    except: Option<InvoiceId>,
) -> StoreResult<bool> {
    sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM invoices
            WHERE account_id = $1 AND invoice_number = $2 AND ($3::uuid IS NULL OR id <> $3)
        )
        "#,
    )
    .bind(account_id.as_uuid())
    .bind(number)
    .bind(except.map(|id| *id.as_uuid()))
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("number_taken", e))
}

/// Items of the given invoices, grouped by invoice and kept in line order.
async fn fetch_items(pool: &PgPool, invoice_ids: &[Uuid]) -> StoreResult<HashMap<Uuid, Vec<InvoiceItem>>> {
    let mut grouped: HashMap<Uuid, Vec<InvoiceItem>> = HashMap::new();
    if invoice_ids.is_empty() {
        return Ok(grouped);
    }

    let rows = sqlx::query(
        r#"
        SELECT invoice_id, description, quantity, unit_price, tax_rate_percent
        FROM invoice_items
        WHERE invoice_id = ANY($1)
        ORDER BY invoice_id, position
        "#,
    )
    .bind(invoice_ids)
    .fetch_all(pool)
    .await
    .map_err(|e| map_sqlx_error("list_items", e))?;

    for row in &rows {
        let item = ItemRow::from_row(row).map_err(|e| map_sqlx_error("decode_item", e))?;
        grouped.entry(item.invoice_id).or_default().push(InvoiceItem {
            description: item.description,
            quantity: item.quantity,
            unit_price: item.unit_price,
            tax_rate_percent: item.tax_rate_percent,
        });
    }
    Ok(grouped)
}

fn to_i32<T>(column: &str, value: T) -> StoreResult<i32>
where
    T: TryInto<i32> + Copy + std::fmt::Display,
{
    value
        .try_into()
        .map_err(|_| StoreError::Database(format!("{column} value {value} out of range")))
}

/// Map SQLx errors to store errors.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            StoreError::Database(format!("database error in {}: {}", operation, db_err.message()))
        }
        sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => {
            StoreError::Unavailable(format!("{operation}: {err}"))
        }
        _ => StoreError::Database(format!("sqlx error in {}: {}", operation, err)),
    }
}

/// Check if an error is a unique constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        if let Some(code) = db_err.code() {
            return code.as_ref() == "23505";
        }
    }
    false
}

// SQLx row types

fn account_from_row(row: &PgRow) -> StoreResult<Account> {
    AccountRow::from_row(row)
        .map_err(|e| map_sqlx_error("decode_account", e))?
        .try_into()
}

#[derive(Debug)]
struct AccountRow {
    id: Uuid,
    name: String,
    email: String,
    phone: Option<String>,
    credits: i32,
    settings: Json<CompanySettings>,
    created_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, PgRow> for AccountRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(AccountRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
            credits: row.try_get("credits")?,
            settings: row.try_get("settings")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl TryFrom<AccountRow> for Account {
    type Error = StoreError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        Ok(Account {
            id: AccountId::from_uuid(row.id),
            name: row.name,
            email: row.email,
            phone: row.phone,
            credits: u32::try_from(row.credits)
                .map_err(|_| StoreError::Database(format!("negative credits for {}", row.id)))?,
            settings: row.settings.0,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug)]
struct ClientRow {
    id: Uuid,
    account_id: Uuid,
    name: String,
    email: Option<String>,
    phone: Option<String>,
    address: Option<String>,
    cin: Option<String>,
    ice: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, PgRow> for ClientRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ClientRow {
            id: row.try_get("id")?,
            account_id: row.try_get("account_id")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
            address: row.try_get("address")?,
            cin: row.try_get("cin")?,
            ice: row.try_get("ice")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl From<ClientRow> for Client {
    fn from(row: ClientRow) -> Self {
        Client {
            id: ClientId::from_uuid(row.id),
            account_id: AccountId::from_uuid(row.account_id),
            name: row.name,
            email: row.email,
            phone: row.phone,
            address: row.address,
            cin: row.cin,
            ice: row.ice,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug)]
struct InvoiceRow {
    id: Uuid,
    account_id: Uuid,
    client_id: Uuid,
    invoice_number: String,
    issue_date: NaiveDate,
    due_date: NaiveDate,
    status: String,
    currency: String,
    notes: Option<String>,
    sub_total: Decimal,
    tax_amount: Decimal,
    total: Decimal,
    edit_count: i32,
    payment_date: Option<NaiveDate>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, PgRow> for InvoiceRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(InvoiceRow {
            id: row.try_get("id")?,
            account_id: row.try_get("account_id")?,
            client_id: row.try_get("client_id")?,
            invoice_number: row.try_get("invoice_number")?,
            issue_date: row.try_get("issue_date")?,
            due_date: row.try_get("due_date")?,
            status: row.try_get("status")?,
            currency: row.try_get("currency")?,
            notes: row.try_get("notes")?,
            sub_total: row.try_get("sub_total")?,
            tax_amount: row.try_get("tax_amount")?,
            total: row.try_get("total")?,
            edit_count: row.try_get("edit_count")?,
            payment_date: row.try_get("payment_date")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl InvoiceRow {
    fn into_invoice(self, items: Vec<InvoiceItem>) -> StoreResult<Invoice> {
        let id = self.id;
        let corrupt = |what: &str| StoreError::Database(format!("invalid {what} on invoice {id}"));
        Ok(Invoice {
            id: InvoiceId::from_uuid(self.id),
            account_id: AccountId::from_uuid(self.account_id),
            client_id: ClientId::from_uuid(self.client_id),
            items,
            issue_date: self.issue_date,
            due_date: self.due_date,
            status: self.status.parse().map_err(|_| corrupt("status"))?,
            currency: self.currency.parse().map_err(|_| corrupt("currency"))?,
            sub_total: self.sub_total,
            tax_amount: self.tax_amount,
            total: self.total,
            edit_count: u32::try_from(self.edit_count).map_err(|_| corrupt("edit_count"))?,
            payment_date: self.payment_date,
            created_at: self.created_at,
            updated_at: self.updated_at,
            invoice_number: self.invoice_number,
            notes: self.notes,
        })
    }
}

#[derive(Debug)]
struct ItemRow {
    invoice_id: Uuid,
    description: String,
    quantity: Decimal,
    unit_price: Decimal,
    tax_rate_percent: Decimal,
}

impl<'r> sqlx::FromRow<'r, PgRow> for ItemRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ItemRow {
            invoice_id: row.try_get("invoice_id")?,
            description: row.try_get("description")?,
            quantity: row.try_get("quantity")?,
            unit_price: row.try_get("unit_price")?,
            tax_rate_percent: row.try_get("tax_rate_percent")?,
        })
    }
}
