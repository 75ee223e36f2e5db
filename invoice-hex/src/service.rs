//! Invoice Application Service
//!
//! The invoice transaction engine. Validates payability, drives the ledger's
//! atomic transfer and advances the invoice lifecycle. Contains no
//! infrastructure logic; every store access goes through the repository port.

use std::future::Future;
use std::time::Duration;

use invoice_types::{
    Account, AccountId, AppError, CreateInvoiceRequest, DomainError, Invoice, InvoiceDirection,
    InvoiceId, InvoiceSummary, IssueInvoiceRequest, LedgerRepository, OpenAccountRequest,
    PaymentReceipt, RepoError, TransferOrder,
};

/// Deadline applied when none is configured.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(5000);

/// Application service for invoice operations.
///
/// Generic over `R: LedgerRepository`; the store adapter is injected at
/// construction. Every operation runs under the request deadline: on expiry the
/// in-flight future is dropped, which rolls back any open unit of work.
pub struct InvoiceService<R: LedgerRepository> {
    repo: R,
    timeout: Duration,
}

impl<R: LedgerRepository> InvoiceService<R> {
    /// Creates a new invoice service with the default deadline.
    pub fn new(repo: R) -> Self {
        Self::with_timeout(repo, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Creates a new invoice service with a custom per-operation deadline.
    pub fn with_timeout(repo: R, timeout: Duration) -> Self {
        Self { repo, timeout }
    }

    /// Returns a reference to the underlying repository.
    pub fn repo(&self) -> &R {
        &self.repo
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn within<T, F>(&self, operation: &'static str, fut: F) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, AppError>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    operation,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Deadline exceeded"
                );
                Err(AppError::Timeout(format!(
                    "{} did not complete within {} ms",
                    operation,
                    self.timeout.as_millis()
                )))
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Account Operations
    // ─────────────────────────────────────────────────────────────────────────────

    /// Opens an account with a starting balance.
    #[tracing::instrument(skip(self, req), fields(email = %req.email))]
    pub async fn open_account(&self, req: OpenAccountRequest) -> Result<Account, AppError> {
        self.within("open_account", self.open(req)).await
    }

    /// Gets an account's profile and balance.
    pub async fn get_account(&self, id: AccountId) -> Result<Account, AppError> {
        self.within("get_account", self.load_account(id)).await
    }

    async fn open(&self, req: OpenAccountRequest) -> Result<Account, AppError> {
        if req.initial_balance < 0 {
            return Err(DomainError::NegativeAmount.into());
        }
        let account = self.repo.create_account(req).await?;
        tracing::info!(account_id = %account.id, "Account opened");
        Ok(account)
    }

    async fn load_account(&self, id: AccountId) -> Result<Account, AppError> {
        self.repo
            .get_account(id)
            .await?
            .ok_or_else(|| DomainError::AccountNotFound(id).into())
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Invoice Creation
    // ─────────────────────────────────────────────────────────────────────────────

    /// Creates a pending invoice between two accounts.
    ///
    /// A caller-supplied `id` is only checked for collisions; the stored
    /// invoice always gets a freshly generated id.
    #[tracing::instrument(skip(self, req), fields(amount = req.amount))]
    pub async fn create_invoice(&self, req: CreateInvoiceRequest) -> Result<Invoice, AppError> {
        self.within("create_invoice", self.insert_new(req)).await
    }

    /// Issues an invoice from `receiver_account_id` to the account registered
    /// under `payer_email`.
    #[tracing::instrument(skip(self, req), fields(receiver = %req.receiver_account_id))]
    pub async fn issue_invoice(&self, req: IssueInvoiceRequest) -> Result<Invoice, AppError> {
        self.within("issue_invoice", self.issue(req)).await
    }

    async fn issue(&self, req: IssueInvoiceRequest) -> Result<Invoice, AppError> {
        let payer = self.resolve_payer(&req.payer_email).await?;

        self.insert_new(CreateInvoiceRequest {
            id: None,
            amount: req.amount,
            expiration_date: req.expiration_date,
            payer_account_id: payer,
            receiver_account_id: req.receiver_account_id,
        })
        .await
    }

    async fn insert_new(&self, req: CreateInvoiceRequest) -> Result<Invoice, AppError> {
        let invoice = Invoice::new(
            req.amount,
            req.expiration_date,
            req.payer_account_id,
            req.receiver_account_id,
        )?;

        if let Some(id) = req.id {
            match self.repo.get_invoice(id).await {
                Ok(_) => return Err(DomainError::AlreadyExists(id).into()),
                Err(RepoError::Domain(DomainError::InvoiceNotFound(_))) => {}
                Err(e) => return Err(e.into()),
            }
        }

        let stored = self.repo.insert_invoice(invoice).await?;
        let invoice = self.repo.get_invoice(stored.id).await?;
        tracing::info!(invoice_id = %invoice.id, "Invoice created");
        Ok(invoice)
    }

    async fn resolve_payer(&self, email: &str) -> Result<AccountId, AppError> {
        let email = email.trim();
        if email.is_empty() {
            return Err(AppError::BadRequest("Payer email cannot be empty".into()));
        }

        self.repo
            .find_account_id_by_email(email)
            .await?
            .ok_or_else(|| AppError::NotFound {
                reason: "account_not_found",
                message: format!("No account registered for {}", email),
            })
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Payment
    // ─────────────────────────────────────────────────────────────────────────────

    /// Pays an invoice: debits the payer, credits the receiver and marks the
    /// invoice `Paid`, all in one unit of work.
    ///
    /// The checks before the transfer fail fast without side effects; the
    /// store repeats the state and balance guards inside the unit, so a
    /// concurrent payer that lost the race gets `AlreadyPaid`.
    #[tracing::instrument(skip(self))]
    pub async fn pay_invoice(&self, id: &str) -> Result<PaymentReceipt, AppError> {
        self.within("pay_invoice", self.settle(id)).await
    }

    async fn settle(&self, id: &str) -> Result<PaymentReceipt, AppError> {
        let id = InvoiceId::parse(id)?;
        let invoice = self.repo.get_invoice(id).await?;
        invoice.ensure_payable()?;

        let payer_balance = self
            .repo
            .get_account_balance(invoice.payer_account_id)
            .await?;
        self.repo
            .get_account_balance(invoice.receiver_account_id)
            .await?;

        if payer_balance < invoice.amount {
            return Err(DomainError::InsufficientFunds {
                available: payer_balance.cents(),
                requested: invoice.amount.cents(),
            }
            .into());
        }

        let settlement = self.repo.apply_transfer(TransferOrder::pay(&invoice)).await?;
        tracing::info!(
            invoice_id = %settlement.invoice.id,
            amount = %invoice.amount,
            payer_balance = %settlement.payer_balance,
            receiver_balance = %settlement.receiver_balance,
            "Invoice paid"
        );

        Ok(PaymentReceipt {
            invoice_id: settlement.invoice.id,
            paid: true,
            state: settlement.invoice.state,
        })
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Deletion and Reads
    // ─────────────────────────────────────────────────────────────────────────────

    /// Deletes an invoice that has not been paid.
    #[tracing::instrument(skip(self))]
    pub async fn delete_invoice(&self, id: &str) -> Result<(), AppError> {
        self.within("delete_invoice", self.remove(id)).await
    }

    /// Gets an invoice by ID.
    pub async fn get_invoice(&self, id: &str) -> Result<Invoice, AppError> {
        self.within("get_invoice", self.load_invoice(id)).await
    }

    /// Lists an account's invoices, oldest first, each with its counterparty.
    pub async fn list_invoices(
        &self,
        account_id: AccountId,
        direction: InvoiceDirection,
    ) -> Result<Vec<InvoiceSummary>, AppError> {
        self.within("list_invoices", self.summaries(account_id, direction))
            .await
    }

    async fn remove(&self, id: &str) -> Result<(), AppError> {
        let id = InvoiceId::parse(id)?;
        self.repo.delete_invoice(id).await?;
        tracing::info!(invoice_id = %id, "Invoice deleted");
        Ok(())
    }

    async fn load_invoice(&self, id: &str) -> Result<Invoice, AppError> {
        let id = InvoiceId::parse(id)?;
        self.repo.get_invoice(id).await.map_err(Into::into)
    }

    async fn summaries(
        &self,
        account_id: AccountId,
        direction: InvoiceDirection,
    ) -> Result<Vec<InvoiceSummary>, AppError> {
        // Verify account exists first
        self.load_account(account_id).await?;

        let invoices = self.repo.list_invoices_for_account(account_id).await?;
        Ok(invoices
            .iter()
            .filter(|invoice| direction.matches(invoice, account_id))
            .filter_map(|invoice| InvoiceSummary::for_account(invoice, account_id))
            .collect())
    }
}
