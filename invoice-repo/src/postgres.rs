//! PostgreSQL repository adapter.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use invoice_types::{
    Account, AccountId, DomainError, Invoice, InvoiceId, InvoiceState, LedgerRepository, Money,
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
// PostgreSQL Repository
// ─────────────────────────────────────────────────────────────────────────────

/// PostgreSQL repository with row-level locking.
pub struct PostgresRepo {
    pool: PgPool,
}

/// Executes SQL statements from a migration file, splitting by semicolons.
async fn execute_migration(pool: &PgPool, sql: &str, name: &str) -> Result<(), anyhow::Error> {
    for statement in sql.split(';') {
        let stmt = statement.trim();
        if !stmt.is_empty() {
            sqlx::query(stmt)
                .execute(pool)
                .await
                .map_err(|e| anyhow::anyhow!("Migration {} failed: {}", name, e))?;
        }
    }
    Ok(())
}

async fn run_migrations(pool: &PgPool) -> Result<(), anyhow::Error> {
    execute_migration(
        pool,
        include_str!("../migrations/0001_create_accounts_pg.sql"),
        "0001",
    )
    .await?;

    execute_migration(
        pool,
        include_str!("../migrations/0002_create_invoices_pg.sql"),
        "0002",
    )
    .await?;

    Ok(())
}

impl PostgresRepo {
    /// Creates a new PostgreSQL repository with automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    /// Locks an account row and returns its balance.
    async fn lock_balance(
        db_tx: &mut Transaction<'_, Postgres>,
        id: AccountId,
    ) -> Result<i64, RepoError> {
        let row: Option<DbBalance> =
            sqlx::query_as(r#"SELECT balance FROM accounts WHERE id = $1 FOR UPDATE"#)
                .bind(id.into_uuid())
                .fetch_optional(&mut **db_tx)
                .await
                .map_err(db_err)?;

        row.map(|r| r.balance)
            .ok_or(DomainError::AccountNotFound(id).into())
    }

    async fn account_exists(&self, id: AccountId) -> Result<bool, RepoError> {
        let row: Option<DbAccountRef> = sqlx::query_as(r#"SELECT id FROM accounts WHERE id = $1"#)
            .bind(id.into_uuid())
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
impl LedgerRepository for PostgresRepo {
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
               VALUES ($1, $2, $3, $4, $5, $6, $7)"#,
        )
        .bind(account.id.into_uuid())
        .bind(&account.name)
        .bind(&account.surname)
        .bind(&account.email)
        .bind(&account.phone_number)
        .bind(account.balance.cents())
        .bind(account.created_at)
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
               FROM accounts WHERE id = $1"#,
        )
        .bind(id.into_uuid())
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
            sqlx::query_as(r#"SELECT id FROM accounts WHERE email = $1"#)
                .bind(email)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;

        row.map(DbAccountRef::into_domain).transpose()
    }

    async fn get_account_balance(&self, id: AccountId) -> Result<Money, RepoError> {
        let row: Option<DbBalance> =
            sqlx::query_as(r#"SELECT balance FROM accounts WHERE id = $1"#)
                .bind(id.into_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;

        row.map(|r| Money::from_cents(r.balance))
            .ok_or(DomainError::AccountNotFound(id).into())
    }

    async fn get_invoice(&self, id: InvoiceId) -> Result<Invoice, RepoError> {
        let row: Option<DbInvoice> = sqlx::query_as(&format!(
            "SELECT {} FROM invoices WHERE id = $1",
            INVOICE_COLUMNS
        ))
        .bind(id.into_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.ok_or(DomainError::InvoiceNotFound(id))?.into_domain()
    }

    async fn list_invoices_for_account(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<Invoice>, RepoError> {
        let rows: Vec<DbInvoice> = sqlx::query_as(&format!(
            "SELECT {} FROM invoices WHERE payer_account_id = $1 OR receiver_account_id = $1
             ORDER BY seq ASC",
            INVOICE_COLUMNS
        ))
        .bind(account_id.into_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter().map(DbInvoice::into_domain).collect()
    }

    async fn insert_invoice(&self, invoice: Invoice) -> Result<Invoice, RepoError> {
        validate_new_invoice(&invoice)?;

        let result = sqlx::query(
            r#"INSERT INTO invoices (id, amount, state, expiration_date, payer_account_id, receiver_account_id, created_at)
               SELECT $1, $2, $3, $4, $5, $6, $7
               WHERE EXISTS (SELECT 1 FROM accounts WHERE id = $5)
                 AND EXISTS (SELECT 1 FROM accounts WHERE id = $6)"#,
        )
        .bind(invoice.id.into_uuid())
        .bind(invoice.amount.cents())
        .bind(invoice.state.as_str())
        .bind(invoice.expiration_date)
        .bind(invoice.payer_account_id.into_uuid())
        .bind(invoice.receiver_account_id.into_uuid())
        .bind(invoice.created_at)
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
        let result = sqlx::query(r#"DELETE FROM invoices WHERE id = $1 AND state <> 'PAID'"#)
            .bind(id.into_uuid())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            self.get_invoice(id).await?;
            return Err(DomainError::InvoiceSettled(id).into());
        }

        Ok(())
    }

    async fn apply_transfer(&self, order: TransferOrder) -> Result<Settlement, RepoError> {
        validate_order(&order)?;

        let amount = order.amount.cents();
        let mut db_tx = self.pool.begin().await.map_err(tx_err)?;

        // Lock the invoice first; concurrent payers of the same invoice queue here
        let row: Option<DbInvoice> = sqlx::query_as(&format!(
            "SELECT {} FROM invoices WHERE id = $1 FOR UPDATE",
            INVOICE_COLUMNS
        ))
        .bind(order.invoice_id.into_uuid())
        .fetch_optional(&mut *db_tx)
        .await
        .map_err(db_err)?;

        let mut invoice = row
            .ok_or(DomainError::InvoiceNotFound(order.invoice_id))?
            .into_domain()?;

        if invoice.state != InvoiceState::Pending
            || invoice.amount != order.amount
            || invoice.payer_account_id != order.payer
            || invoice.receiver_account_id != order.receiver
        {
            return Err(unclaimable(&invoice, &order));
        }

        // Lock accounts in consistent order to prevent deadlocks
        let (first_id, second_id) = order.lock_order();
        let first = Self::lock_balance(&mut db_tx, first_id).await?;
        let second = Self::lock_balance(&mut db_tx, second_id).await?;
        let payer_balance = if first_id == order.payer { first } else { second };

        if payer_balance < amount {
            return Err(DomainError::InsufficientFunds {
                available: payer_balance,
                requested: amount,
            }
            .into());
        }

        invoice.transition(order.new_state)?;

        sqlx::query(r#"UPDATE invoices SET state = $1 WHERE id = $2"#)
            .bind(invoice.state.as_str())
            .bind(invoice.id.into_uuid())
            .execute(&mut *db_tx)
            .await
            .map_err(db_err)?;

        // Debit payer
        let payer_after: DbBalance = sqlx::query_as(
            r#"UPDATE accounts SET balance = balance - $1 WHERE id = $2 RETURNING balance"#,
        )
        .bind(amount)
        .bind(order.payer.into_uuid())
        .fetch_one(&mut *db_tx)
        .await
        .map_err(db_err)?;

        // Credit receiver
        let receiver_after: DbBalance = sqlx::query_as(
            r#"UPDATE accounts SET balance = balance + $1 WHERE id = $2 RETURNING balance"#,
        )
        .bind(amount)
        .bind(order.receiver.into_uuid())
        .fetch_one(&mut *db_tx)
        .await
        .map_err(db_err)?;

        db_tx.commit().await.map_err(tx_err)?;

        Ok(Settlement {
            invoice,
            payer_balance: Money::from_cents(payer_after.balance),
            receiver_balance: Money::from_cents(receiver_after.balance),
        })
    }
}
