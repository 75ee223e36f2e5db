//! In-memory ledger adapter.
//!
//! All state sits behind one `RwLock`. Reads share the lock; every write,
//! including the whole settlement unit, runs under the write guard. A transfer
//! prepares the updated invoice and both accounts as copies and only publishes
//! them once every step has succeeded, so a failing step leaves the ledger
//! untouched.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use invoice_types::{
    Account, AccountId, DomainError, Invoice, InvoiceId, InvoiceState, LedgerRepository, Money,
    OpenAccountRequest, RepoError, Settlement, TransferOrder,
};

use crate::{unclaimable, validate_new_invoice, validate_order};

#[derive(Default)]
struct LedgerState {
    accounts: HashMap<AccountId, Account>,
    emails: HashMap<String, AccountId>,
    invoices: HashMap<InvoiceId, Invoice>,
    /// Invoice ids in insertion order
    invoice_order: Vec<InvoiceId>,
}

/// Ledger held in process memory. Used for tests and local development.
#[derive(Default)]
pub struct InMemoryLedger {
    state: RwLock<LedgerState>,
    fail_next_credit: AtomicBool,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms a one-shot storage failure between the debit and the credit of
    /// the next transfer.
    pub fn fail_next_credit(&self) {
        self.fail_next_credit.store(true, Ordering::SeqCst);
    }

    /// Marks a pending invoice `Expired`, as the external expiry process does.
    pub fn expire_invoice(&self, id: InvoiceId) -> Result<Invoice, RepoError> {
        let mut state = self.write()?;
        let invoice = state
            .invoices
            .get_mut(&id)
            .ok_or(DomainError::InvoiceNotFound(id))?;
        invoice.transition(InvoiceState::Expired)?;
        Ok(invoice.clone())
    }

    /// Sum of every account balance.
    pub fn total_balance(&self) -> Result<Money, RepoError> {
        let state = self.read()?;
        state
            .accounts
            .values()
            .try_fold(Money::zero(), |acc, a| acc.checked_add(a.balance))
            .map_err(RepoError::Domain)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, LedgerState>, RepoError> {
        self.state
            .read()
            .map_err(|_| RepoError::Database("Ledger lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, LedgerState>, RepoError> {
        self.state
            .write()
            .map_err(|_| RepoError::Database("Ledger lock poisoned".into()))
    }
}

#[async_trait]
impl LedgerRepository for InMemoryLedger {
    async fn create_account(&self, req: OpenAccountRequest) -> Result<Account, RepoError> {
        let account = Account::open(
            req.name,
            req.surname,
            req.email,
            req.phone_number,
            Money::from_cents(req.initial_balance),
        )?;

        let mut state = self.write()?;
        if state.emails.contains_key(&account.email) {
            return Err(RepoError::Conflict(format!(
                "Email already registered: {}",
                account.email
            )));
        }
        state.emails.insert(account.email.clone(), account.id);
        state.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, RepoError> {
        Ok(self.read()?.accounts.get(&id).cloned())
    }

    async fn find_account_id_by_email(
        &self,
        email: &str,
    ) -> Result<Option<AccountId>, RepoError> {
        Ok(self.read()?.emails.get(email).copied())
    }

    async fn get_account_balance(&self, id: AccountId) -> Result<Money, RepoError> {
        self.read()?
            .accounts
            .get(&id)
            .map(|a| a.balance)
            .ok_or(DomainError::AccountNotFound(id).into())
    }

    async fn get_invoice(&self, id: InvoiceId) -> Result<Invoice, RepoError> {
        self.read()?
            .invoices
            .get(&id)
            .cloned()
            .ok_or(DomainError::InvoiceNotFound(id).into())
    }

    async fn list_invoices_for_account(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<Invoice>, RepoError> {
        let state = self.read()?;
        Ok(state
            .invoice_order
            .iter()
            .filter_map(|id| state.invoices.get(id))
            .filter(|i| i.involves(account_id))
            .cloned()
            .collect())
    }

    async fn insert_invoice(&self, invoice: Invoice) -> Result<Invoice, RepoError> {
        validate_new_invoice(&invoice)?;

        let mut state = self.write()?;
        if state.invoices.contains_key(&invoice.id) {
            return Err(DomainError::AlreadyExists(invoice.id).into());
        }
        for party in [invoice.payer_account_id, invoice.receiver_account_id] {
            if !state.accounts.contains_key(&party) {
                return Err(DomainError::InvalidInvoice(format!("Unknown account: {}", party))
                    .into());
            }
        }

        state.invoice_order.push(invoice.id);
        state.invoices.insert(invoice.id, invoice.clone());
        Ok(invoice)
    }

    async fn delete_invoice(&self, id: InvoiceId) -> Result<(), RepoError> {
        let mut state = self.write()?;
        let invoice = state
            .invoices
            .get(&id)
            .ok_or(DomainError::InvoiceNotFound(id))?;
        if invoice.state == InvoiceState::Paid {
            return Err(DomainError::InvoiceSettled(id).into());
        }

        state.invoices.remove(&id);
        state.invoice_order.retain(|i| *i != id);
        Ok(())
    }

    async fn apply_transfer(&self, order: TransferOrder) -> Result<Settlement, RepoError> {
        validate_order(&order)?;

        let mut state = self.write()?;

        // Claim the invoice
        let mut invoice = state
            .invoices
            .get(&order.invoice_id)
            .cloned()
            .ok_or(DomainError::InvoiceNotFound(order.invoice_id))?;
        if invoice.state != InvoiceState::Pending
            || invoice.amount != order.amount
            || invoice.payer_account_id != order.payer
            || invoice.receiver_account_id != order.receiver
        {
            return Err(unclaimable(&invoice, &order));
        }
        invoice.transition(order.new_state)?;

        // Debit payer
        let mut payer = state
            .accounts
            .get(&order.payer)
            .cloned()
            .ok_or(DomainError::AccountNotFound(order.payer))?;
        payer.debit(order.amount)?;

        if self.fail_next_credit.swap(false, Ordering::SeqCst) {
            return Err(RepoError::Database(
                "Injected storage failure before credit".into(),
            ));
        }

        // Credit receiver
        let mut receiver = state
            .accounts
            .get(&order.receiver)
            .cloned()
            .ok_or(DomainError::AccountNotFound(order.receiver))?;
        receiver.credit(order.amount)?;

        // Publish all three writes together
        let settlement = Settlement {
            invoice: invoice.clone(),
            payer_balance: payer.balance,
            receiver_balance: receiver.balance,
        };
        state.accounts.insert(payer.id, payer);
        state.accounts.insert(receiver.id, receiver);
        state.invoices.insert(invoice.id, invoice);

        Ok(settlement)
    }
}
