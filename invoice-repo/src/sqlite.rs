//! SQLite repository adapter.
#![allow(clippy::collapsible_if)]

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::str::FromStr;
use std::time::Duration;

use invoice_types::{
    Account, AccountId, DomainError, Invoice, InvoiceId, LedgerRepository, Money,
    OpenAccountRequest, RepoError, Settlement, TransferOrder,
};

use crate::types::{
    DbAccount, DbAccountRef, DbBalance, DbInvoice, db_err, is_unique_violation, tx_err,
    unknown_party,
};
use crate::{unclaimable, validate_new_invoice, validate_order};

const INVOICE_COLUMNS: &str =
    "id, amount, state, expiration_date, payer_account_id, receiver_account_id, created_at";

// ─────────────────────────────────────────────────────────────────────────────
// SQLite Repository
// ─────────────────────────────────────────────────────────────────────────────

/// SQLite repository implementation.
///
/// A settlement unit opens with its guarded invoice `UPDATE`, so the database
/// write lock is held before anything is read; concurrent units queue on the
/// busy timeout instead of interleaving.
pub struct SqliteRepo {
    pool: SqlitePool,
}

impl SqliteRepo {
    /// Creates a new SQLite repository with automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure on-disk SQLite target directory exists (no-op for in-memory).
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            // Remove query parameters
            let path = path.split('?').next().unwrap_or(path);
            if path != ":memory:" {
                let p = std::path::Path::new(path);
                if let Some(parent) = p.parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await?;

        let repo = Self { pool };
        repo.create_schema().await?;
        Ok(repo)
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Creates the database schema (for testing with existing pool).
    pub async fn create_schema(&self) -> Result<(), RepoError> {
        let ddl_accounts = include_str!("../migrations/0001_create_accounts.sql");
        sqlx::query(ddl_accounts)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        let ddl_invoices = include_str!("../migrations/0002_create_invoices.sql");
        sqlx::query(ddl_invoices)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(())
    }

    async fn fetch_invoice_in(
        db_tx: &mut Transaction<'_, Sqlite>,
        id: InvoiceId,
    ) -> Result<Option<Invoice>, RepoError> {
        let row: Option<DbInvoice> = sqlx::query_as(&format!(
            "SELECT {} FROM invoices WHERE id = ?",
            INVOICE_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&mut **db_tx)
        .await
        .map_err(db_err)?;

        row.map(DbInvoice::into_domain).transpose()
    }

    async fn balance_in(
        db_tx: &mut Transaction<'_, Sqlite>,
        id: AccountId,
    ) -> Result<Option<i64>, RepoError> {
        let row: Option<DbBalance> = sqlx::query_as(r#"SELECT balance FROM accounts WHERE id = ?"#)
            .bind(id.to_string())
            .fetch_optional(&mut **db_tx)
            .await
            .map_err(db_err)?;

        Ok(row.map(|r| r.balance))
    }

    async fn account_exists(&self, id: AccountId) -> Result<bool, RepoError> {
        let row: Option<DbAccountRef> = sqlx::query_as(r#"SELECT id FROM accounts WHERE id = ?"#)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(row.is_some())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Repository implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl LedgerRepository for SqliteRepo {
    async fn create_account(&self, req: OpenAccountRequest) -> Result<Account, RepoError> {
        let account = Account::open(
            req.name,
            req.surname,
            req.email,
            req.phone_number,
            Money::from_cents(req.initial_balance),
        )?;

        sqlx::query(
            r#"INSERT INTO accounts (id, name, surname, email, phone_number, balance, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(account.id.to_string())
        .bind(&account.name)
        .bind(&account.surname)
        .bind(&account.email)
        .bind(&account.phone_number)
        .bind(account.balance.cents())
        .bind(account.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                RepoError::Conflict(format!("Email already registered: {}", account.email))
            } else {
                db_err(e)
            }
        })?;

        Ok(account)
    }

    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, RepoError> {
        let row: Option<DbAccount> = sqlx::query_as(
            r#"SELECT id, name, surname, email, phone_number, balance, created_at
               FROM accounts WHERE id = ?"#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(DbAccount::into_domain).transpose()
    }

    async fn find_account_id_by_email(
        &self,
        email: &str,
    ) -> Result<Option<AccountId>, RepoError> {
        let row: Option<DbAccountRef> =
            sqlx::query_as(r#"SELECT id FROM accounts WHERE email = ?"#)
                .bind(email)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;

        row.map(DbAccountRef::into_domain).transpose()
    }

    async fn get_account_balance(&self, id: AccountId) -> Result<Money, RepoError> {
        let row: Option<DbBalance> = sqlx::query_as(r#"SELECT balance FROM accounts WHERE id = ?"#)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.map(|r| Money::from_cents(r.balance))
            .ok_or(DomainError::AccountNotFound(id).into())
    }

    async fn get_invoice(&self, id: InvoiceId) -> Result<Invoice, RepoError> {
        let row: Option<DbInvoice> = sqlx::query_as(&format!(
            "SELECT {} FROM invoices WHERE id = ?",
            INVOICE_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.ok_or(DomainError::InvoiceNotFound(id))?.into_domain()
    }

    async fn list_invoices_for_account(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<Invoice>, RepoError> {
        let account_id_str = account_id.to_string();

        let rows: Vec<DbInvoice> = sqlx::query_as(&format!(
            "SELECT {} FROM invoices WHERE payer_account_id = ? OR receiver_account_id = ?
             ORDER BY rowid ASC",
            INVOICE_COLUMNS
        ))
        .bind(&account_id_str)
        .bind(&account_id_str)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter().map(DbInvoice::into_domain).collect()
    }

    async fn insert_invoice(&self, invoice: Invoice) -> Result<Invoice, RepoError> {
        validate_new_invoice(&invoice)?;

        let payer_str = invoice.payer_account_id.to_string();
        let receiver_str = invoice.receiver_account_id.to_string();

        // Single statement: the account check and the insert are one atomic write.
        let result = sqlx::query(
            r#"INSERT INTO invoices (id, amount, state, expiration_date, payer_account_id, receiver_account_id, created_at)
               SELECT ?, ?, ?, ?, ?, ?, ?
               WHERE EXISTS (SELECT 1 FROM accounts WHERE id = ?)
                 AND EXISTS (SELECT 1 FROM accounts WHERE id = ?)"#,
        )
        .bind(invoice.id.to_string())
        .bind(invoice.amount.cents())
        .bind(invoice.state.as_str())
        .bind(invoice.expiration_date.to_rfc3339())
        .bind(&payer_str)
        .bind(&receiver_str)
        .bind(invoice.created_at.to_rfc3339())
        .bind(&payer_str)
        .bind(&receiver_str)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                RepoError::Domain(DomainError::AlreadyExists(invoice.id))
            } else {
                db_err(e)
            }
        })?;

        if result.rows_affected() == 0 {
            if !self.account_exists(invoice.payer_account_id).await? {
                return Err(unknown_party(invoice.payer_account_id));
            }
            return Err(unknown_party(invoice.receiver_account_id));
        }

        Ok(invoice)
    }

    async fn delete_invoice(&self, id: InvoiceId) -> Result<(), RepoError> {
        let result = sqlx::query(r#"DELETE FROM invoices WHERE id = ? AND state <> 'PAID'"#)
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            // Either absent or settled
            self.get_invoice(id).await?;
            return Err(DomainError::InvoiceSettled(id).into());
        }

        Ok(())
    }

    async fn apply_transfer(&self, order: TransferOrder) -> Result<Settlement, RepoError> {
        validate_order(&order)?;

        let invoice_id_str = order.invoice_id.to_string();
        let payer_str = order.payer.to_string();
        let receiver_str = order.receiver.to_string();
        let amount = order.amount.cents();

        let mut db_tx = self.pool.begin().await.map_err(tx_err)?;

        // Claim the invoice (takes the write lock)
        let claimed = sqlx::query(
            r#"UPDATE invoices SET state = ?
               WHERE id = ? AND state = 'PENDING' AND amount = ?
                 AND payer_account_id = ? AND receiver_account_id = ?"#,
        )
        .bind(order.new_state.as_str())
        .bind(&invoice_id_str)
        .bind(amount)
        .bind(&payer_str)
        .bind(&receiver_str)
        .execute(&mut *db_tx)
        .await
        .map_err(db_err)?;

        if claimed.rows_affected() == 0 {
            return Err(match Self::fetch_invoice_in(&mut db_tx, order.invoice_id).await? {
                Some(invoice) => unclaimable(&invoice, &order),
                None => DomainError::InvoiceNotFound(order.invoice_id).into(),
            });
        }

        // Debit payer
        let debited = sqlx::query(
            r#"UPDATE accounts SET balance = balance - ? WHERE id = ? AND balance >= ?"#,
        )
        .bind(amount)
        .bind(&payer_str)
        .bind(amount)
        .execute(&mut *db_tx)
        .await
        .map_err(db_err)?;

        if debited.rows_affected() == 0 {
            return Err(match Self::balance_in(&mut db_tx, order.payer).await? {
                Some(available) => DomainError::InsufficientFunds {
                    available,
                    requested: amount,
                },
                None => DomainError::AccountNotFound(order.payer),
            }
            .into());
        }

        // Credit receiver
        let credited = sqlx::query(r#"UPDATE accounts SET balance = balance + ? WHERE id = ?"#)
            .bind(amount)
            .bind(&receiver_str)
            .execute(&mut *db_tx)
            .await
            .map_err(db_err)?;

        if credited.rows_affected() == 0 {
            return Err(DomainError::AccountNotFound(order.receiver).into());
        }

        let invoice = Self::fetch_invoice_in(&mut db_tx, order.invoice_id)
            .await?
            .ok_or(DomainError::InvoiceNotFound(order.invoice_id))?;
        let payer_balance = Self::balance_in(&mut db_tx, order.payer)
            .await?
            .ok_or(DomainError::AccountNotFound(order.payer))?;
        let receiver_balance = Self::balance_in(&mut db_tx, order.receiver)
            .await?
            .ok_or(DomainError::AccountNotFound(order.receiver))?;

        db_tx.commit().await.map_err(tx_err)?;

        Ok(Settlement {
            invoice,
            payer_balance: Money::from_cents(payer_balance),
            receiver_balance: Money::from_cents(receiver_balance),
        })
    }
}
