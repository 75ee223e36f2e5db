//! Invoice domain model and lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::account::AccountId;
use super::money::Money;
use crate::error::DomainError;

/// Unique identifier for an Invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvoiceId(Uuid);

impl InvoiceId {
    /// Creates a new random InvoiceId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an InvoiceId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the UUID value.
    pub fn into_uuid(self) -> Uuid {
        self.0
    }

    /// Parses a caller-supplied id. Empty or malformed input is `NotAnId`.
    pub fn parse(s: &str) -> Result<Self, DomainError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(DomainError::NotAnId);
        }
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| DomainError::NotAnId)
    }
}

impl Default for InvoiceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for InvoiceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of an invoice.
///
/// ```text
/// Pending ──pay──▶ Paid
///    │
///    └──expire──▶ Expired
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum InvoiceState {
    #[default]
    Pending,
    Paid,
    Expired,
}

impl InvoiceState {
    /// Storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Paid => "PAID",
            Self::Expired => "EXPIRED",
        }
    }

    /// Only `Pending` may move, and only into a terminal state.
    pub fn can_transition_to(&self, next: InvoiceState) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Paid) | (Self::Pending, Self::Expired)
        )
    }
}

impl std::fmt::Display for InvoiceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for InvoiceState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "PAID" => Ok(Self::Paid),
            "EXPIRED" => Ok(Self::Expired),
            other => Err(DomainError::ValidationError(format!(
                "Unknown invoice state: {}",
                other
            ))),
        }
    }
}

/// A request for payment of a fixed amount from a payer to a receiver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    /// Fixed at creation
    pub amount: Money,
    pub state: InvoiceState,
    /// Advisory; nothing expires invoices automatically
    pub expiration_date: DateTime<Utc>,
    /// Account that owes the amount
    pub payer_account_id: AccountId,
    /// Account that is owed the amount (the issuer)
    pub receiver_account_id: AccountId,
    pub created_at: DateTime<Utc>,
}

impl Invoice {
    /// Creates a new pending invoice with a fresh id.
    ///
    /// # Validation
    /// - Amount must be positive
    /// - Both accounts must be set and distinct
    pub fn new(
        amount: i64,
        expiration_date: DateTime<Utc>,
        payer_account_id: AccountId,
        receiver_account_id: AccountId,
    ) -> Result<Self, DomainError> {
        let amount = Money::positive(amount).map_err(|e| match e {
            DomainError::NegativeAmount => {
                DomainError::InvalidInvoice("Invoice amount must be positive".into())
            }
            other => other,
        })?;

        if payer_account_id.is_nil() || receiver_account_id.is_nil() {
            return Err(DomainError::InvalidInvoice(
                "Invoice must name a payer and a receiver".into(),
            ));
        }
        if payer_account_id == receiver_account_id {
            return Err(DomainError::InvalidInvoice(
                "Payer and receiver must be different accounts".into(),
            ));
        }

        Ok(Self {
            id: InvoiceId::new(),
            amount,
            state: InvoiceState::Pending,
            expiration_date,
            payer_account_id,
            receiver_account_id,
            created_at: Utc::now(),
        })
    }

    /// Reconstructs an invoice from database fields.
    pub fn from_parts(
        id: InvoiceId,
        amount: Money,
        state: InvoiceState,
        expiration_date: DateTime<Utc>,
        payer_account_id: AccountId,
        receiver_account_id: AccountId,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            amount,
            state,
            expiration_date,
            payer_account_id,
            receiver_account_id,
            created_at,
        }
    }

    /// True if the account is the payer or the receiver.
    pub fn involves(&self, account: AccountId) -> bool {
        self.payer_account_id == account || self.receiver_account_id == account
    }

    /// The other party of the invoice, seen from `account`.
    pub fn counterparty(&self, account: AccountId) -> Option<AccountId> {
        if self.payer_account_id == account {
            Some(self.receiver_account_id)
        } else if self.receiver_account_id == account {
            Some(self.payer_account_id)
        } else {
            None
        }
    }

    /// Fails unless the invoice can still be paid.
    pub fn ensure_payable(&self) -> Result<(), DomainError> {
        match self.state {
            InvoiceState::Pending => Ok(()),
            InvoiceState::Paid => Err(DomainError::AlreadyPaid(self.id)),
            InvoiceState::Expired => Err(DomainError::InvoiceExpired(self.id)),
        }
    }

    /// Moves the invoice to `next`, enforcing the lifecycle.
    pub fn transition(&mut self, next: InvoiceState) -> Result<(), DomainError> {
        self.ensure_payable()?;
        if !self.state.can_transition_to(next) {
            return Err(DomainError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(amount: i64) -> Invoice {
        Invoice::new(amount, Utc::now(), AccountId::new(), AccountId::new()).unwrap()
    }

    #[test]
    fn test_invoice_creation() {
        let invoice = pending(4000);
        assert_eq!(invoice.state, InvoiceState::Pending);
        assert_eq!(invoice.amount.cents(), 4000);
    }

    #[test]
    fn test_zero_amount_fails() {
        let result = Invoice::new(0, Utc::now(), AccountId::new(), AccountId::new());
        assert!(matches!(result, Err(DomainError::InvalidInvoice(_))));
    }

    #[test]
    fn test_negative_amount_fails() {
        let result = Invoice::new(-10, Utc::now(), AccountId::new(), AccountId::new());
        assert!(matches!(result, Err(DomainError::InvalidInvoice(_))));
    }

    #[test]
    fn test_self_invoice_fails() {
        let account = AccountId::new();
        let result = Invoice::new(100, Utc::now(), account, account);
        assert!(matches!(result, Err(DomainError::InvalidInvoice(_))));
    }

    #[test]
    fn test_nil_account_fails() {
        let nil = AccountId::from_uuid(Uuid::nil());
        let result = Invoice::new(100, Utc::now(), nil, AccountId::new());
        assert!(matches!(result, Err(DomainError::InvalidInvoice(_))));
    }

    #[test]
    fn test_paid_is_terminal() {
        let mut invoice = pending(100);
        invoice.transition(InvoiceState::Paid).unwrap();
        assert_eq!(invoice.state, InvoiceState::Paid);

        let again = invoice.transition(InvoiceState::Paid);
        assert!(matches!(again, Err(DomainError::AlreadyPaid(_))));
    }

    #[test]
    fn test_expired_cannot_be_paid() {
        let mut invoice = pending(100);
        invoice.transition(InvoiceState::Expired).unwrap();
        assert!(matches!(
            invoice.ensure_payable(),
            Err(DomainError::InvoiceExpired(_))
        ));
    }

    #[test]
    fn test_pending_to_pending_rejected() {
        let mut invoice = pending(100);
        let result = invoice.transition(InvoiceState::Pending);
        assert!(matches!(result, Err(DomainError::InvalidTransition { .. })));
    }

    #[test]
    fn test_counterparty() {
        let invoice = pending(100);
        assert_eq!(
            invoice.counterparty(invoice.payer_account_id),
            Some(invoice.receiver_account_id)
        );
        assert_eq!(invoice.counterparty(AccountId::new()), None);
    }

    #[test]
    fn test_parse_invoice_id() {
        assert!(matches!(InvoiceId::parse(""), Err(DomainError::NotAnId)));
        assert!(matches!(InvoiceId::parse("lmao"), Err(DomainError::NotAnId)));

        let id = InvoiceId::new();
        assert_eq!(InvoiceId::parse(&id.to_string()).unwrap(), id);
        assert_eq!(InvoiceId::parse(&format!("  {}\n", id)).unwrap(), id);
    }

    #[test]
    fn test_state_storage_round_trip() {
        for state in [InvoiceState::Pending, InvoiceState::Paid, InvoiceState::Expired] {
            assert_eq!(state.as_str().parse::<InvoiceState>().unwrap(), state);
        }
        assert!("UNKNOWN".parse::<InvoiceState>().is_err());
    }
}
