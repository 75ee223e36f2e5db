//! Ledger repository port trait.
//!
//! This is the primary port in our hexagonal architecture.
//! Adapters (Postgres, SQLite, InMemory) implement this trait.

use crate::domain::{Account, AccountId, Invoice, InvoiceId, Money, Settlement, TransferOrder};
use crate::dto::OpenAccountRequest;
use crate::error::RepoError;

/// The ledger store: account balances and invoice records.
///
/// `apply_transfer` MUST be all-or-nothing. Implementations use a database
/// transaction (or an equivalent single critical section) so that the debit,
/// the credit and the invoice state change commit together.
#[async_trait::async_trait]
pub trait LedgerRepository: Send + Sync + 'static {
    // ─────────────────────────────────────────────────────────────────────────────
    // Account Directory
    // ─────────────────────────────────────────────────────────────────────────────

    /// Opens an account with its starting balance.
    async fn create_account(&self, req: OpenAccountRequest) -> Result<Account, RepoError>;

    /// Gets an account by ID.
    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, RepoError>;

    /// Resolves the account registered under an email address.
    async fn find_account_id_by_email(
        &self,
        email: &str,
    ) -> Result<Option<AccountId>, RepoError>;

    /// Reads a balance. Fails with `AccountNotFound` if the account is absent.
    async fn get_account_balance(&self, id: AccountId) -> Result<Money, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Invoices
    // ─────────────────────────────────────────────────────────────────────────────

    /// Gets an invoice. Fails with `InvoiceNotFound` if absent.
    async fn get_invoice(&self, id: InvoiceId) -> Result<Invoice, RepoError>;

    /// All invoices where the account is payer or receiver, oldest first.
    async fn list_invoices_for_account(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<Invoice>, RepoError>;

    /// Persists a new invoice.
    ///
    /// Fails with `AlreadyExists` on id collision and `InvalidInvoice` when the
    /// amount is not positive, payer equals receiver, or an account is missing.
    async fn insert_invoice(&self, invoice: Invoice) -> Result<Invoice, RepoError>;

    /// Removes an invoice. Fails with `InvoiceNotFound` if absent and
    /// `InvoiceSettled` if it has been paid.
    async fn delete_invoice(&self, id: InvoiceId) -> Result<(), RepoError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Settlement (MUST be atomic)
    // ─────────────────────────────────────────────────────────────────────────────

    /// Debits the payer, credits the receiver and moves the invoice to
    /// `order.new_state` in one unit of work.
    ///
    /// The invoice must still be `Pending` and match the order, and the payer
    /// must cover the amount, at the moment the unit runs; otherwise nothing
    /// is written.
    async fn apply_transfer(&self, order: TransferOrder) -> Result<Settlement, RepoError>;
}
