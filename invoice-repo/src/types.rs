//! Shared database row types with feature-gated fields for SQLite and PostgreSQL.

use sqlx::FromRow;

use invoice_types::{
    Account, AccountId, DomainError, Invoice, InvoiceId, InvoiceState, Money, RepoError,
};

// ─────────────────────────────────────────────────────────────────────────────
// Feature-gated imports
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(feature = "postgres")]
use chrono::{DateTime, Utc};
#[cfg(feature = "postgres")]
use uuid::Uuid;

// ─────────────────────────────────────────────────────────────────────────────
// Database row structs (derive FromRow for automatic mapping)
// ─────────────────────────────────────────────────────────────────────────────

/// Account row from database.
#[derive(FromRow)]
pub struct DbAccount {
    #[cfg(feature = "postgres")]
    pub id: Uuid,
    #[cfg(not(feature = "postgres"))]
    pub id: String,

    pub name: String,
    pub surname: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub balance: i64,

    #[cfg(feature = "postgres")]
    pub created_at: DateTime<Utc>,
    #[cfg(not(feature = "postgres"))]
    pub created_at: String,
}

/// Invoice row from database.
#[derive(FromRow)]
pub struct DbInvoice {
    #[cfg(feature = "postgres")]
    pub id: Uuid,
    #[cfg(not(feature = "postgres"))]
    pub id: String,

    pub amount: i64,
    pub state: String,

    #[cfg(feature = "postgres")]
    pub expiration_date: DateTime<Utc>,
    #[cfg(not(feature = "postgres"))]
    pub expiration_date: String,

    #[cfg(feature = "postgres")]
    pub payer_account_id: Uuid,
    #[cfg(not(feature = "postgres"))]
    pub payer_account_id: String,

    #[cfg(feature = "postgres")]
    pub receiver_account_id: Uuid,
    #[cfg(not(feature = "postgres"))]
    pub receiver_account_id: String,

    #[cfg(feature = "postgres")]
    pub created_at: DateTime<Utc>,
    #[cfg(not(feature = "postgres"))]
    pub created_at: String,
}

/// Balance-only row for queries.
#[derive(FromRow)]
pub struct DbBalance {
    pub balance: i64,
}

/// Id-only row for directory lookups.
#[derive(FromRow)]
pub struct DbAccountRef {
    #[cfg(feature = "postgres")]
    pub id: Uuid,
    #[cfg(not(feature = "postgres"))]
    pub id: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Parsing helpers
// ─────────────────────────────────────────────────────────────────────────────

pub fn db_err(e: impl std::fmt::Display) -> RepoError {
    RepoError::Database(e.to_string())
}

pub fn tx_err(e: impl std::fmt::Display) -> RepoError {
    RepoError::Transaction(e.to_string())
}

pub fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

pub fn parse_state(s: &str) -> Result<InvoiceState, RepoError> {
    s.parse::<InvoiceState>().map_err(db_err)
}

#[cfg(not(feature = "postgres"))]
pub fn parse_uuid(s: &str) -> Result<uuid::Uuid, RepoError> {
    uuid::Uuid::parse_str(s).map_err(db_err)
}

#[cfg(not(feature = "postgres"))]
pub fn parse_timestamp(s: &str) -> Result<chrono::DateTime<chrono::Utc>, RepoError> {
    Ok(chrono::DateTime::parse_from_rfc3339(s)
        .map_err(db_err)?
        .with_timezone(&chrono::Utc))
}

/// Message used when an invoice names an account the ledger does not hold.
pub fn unknown_party(id: AccountId) -> RepoError {
    RepoError::Domain(DomainError::InvalidInvoice(format!(
        "Unknown account: {}",
        id
    )))
}

// ─────────────────────────────────────────────────────────────────────────────
// Domain conversion (feature-gated implementations)
// ─────────────────────────────────────────────────────────────────────────────

impl DbAccount {
    /// Convert database row to domain Account.
    pub fn into_domain(self) -> Result<Account, RepoError> {
        #[cfg(feature = "postgres")]
        let (id, created_at) = (AccountId::from_uuid(self.id), self.created_at);

        #[cfg(not(feature = "postgres"))]
        let (id, created_at) = (
            AccountId::from_uuid(parse_uuid(&self.id)?),
            parse_timestamp(&self.created_at)?,
        );

        Ok(Account::from_parts(
            id,
            self.name,
            self.surname,
            self.email,
            self.phone_number,
            Money::from_cents(self.balance),
            created_at,
        ))
    }
}

impl DbInvoice {
    /// Convert database row to domain Invoice.
    pub fn into_domain(self) -> Result<Invoice, RepoError> {
        let state = parse_state(&self.state)?;
        let amount = Money::positive(self.amount).map_err(RepoError::Domain)?;

        #[cfg(feature = "postgres")]
        let (id, expiration_date, payer, receiver, created_at) = (
            InvoiceId::from_uuid(self.id),
            self.expiration_date,
            AccountId::from_uuid(self.payer_account_id),
            AccountId::from_uuid(self.receiver_account_id),
            self.created_at,
        );

        #[cfg(not(feature = "postgres"))]
        let (id, expiration_date, payer, receiver, created_at) = (
            InvoiceId::from_uuid(parse_uuid(&self.id)?),
            parse_timestamp(&self.expiration_date)?,
            AccountId::from_uuid(parse_uuid(&self.payer_account_id)?),
            AccountId::from_uuid(parse_uuid(&self.receiver_account_id)?),
            parse_timestamp(&self.created_at)?,
        );

        Ok(Invoice::from_parts(
            id,
            amount,
            state,
            expiration_date,
            payer,
            receiver,
            created_at,
        ))
    }
}

impl DbAccountRef {
    pub fn into_domain(self) -> Result<AccountId, RepoError> {
        #[cfg(feature = "postgres")]
        let id = AccountId::from_uuid(self.id);

        #[cfg(not(feature = "postgres"))]
        let id = AccountId::from_uuid(parse_uuid(&self.id)?);

        Ok(id)
    }
}
