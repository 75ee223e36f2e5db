//! Data Transfer Objects (DTOs) for requests and responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{AccountId, Invoice, InvoiceId, InvoiceState};

// ─────────────────────────────────────────────────────────────────────────────
// Account DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Store-level request to open an account in the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAccountRequest {
    pub name: String,
    pub surname: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    /// Starting balance in minor units
    #[serde(default)]
    pub initial_balance: i64,
}

// ─────────────────────────────────────────────────────────────────────────────
// Invoice DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to create an invoice between two known accounts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateInvoiceRequest {
    /// Optional caller-side id; only checked for collisions, never reused
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<InvoiceId>,
    /// Amount in minor units
    pub amount: i64,
    pub expiration_date: DateTime<Utc>,
    pub payer_account_id: AccountId,
    pub receiver_account_id: AccountId,
}

/// Request to issue an invoice to the account registered under an email.
///
/// The issuing account is the receiver of the payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueInvoiceRequest {
    pub receiver_account_id: AccountId,
    pub payer_email: String,
    pub amount: i64,
    pub expiration_date: DateTime<Utc>,
}

/// Outcome of a payment attempt that committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub invoice_id: InvoiceId,
    pub paid: bool,
    pub state: InvoiceState,
}

/// Which side of the invoices to list for an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceDirection {
    /// Invoices the account issued (it is the receiver)
    Created,
    /// Invoices the account has to pay (it is the payer)
    Received,
    #[default]
    All,
}

impl InvoiceDirection {
    pub fn matches(&self, invoice: &Invoice, account: AccountId) -> bool {
        match self {
            Self::Created => invoice.receiver_account_id == account,
            Self::Received => invoice.payer_account_id == account,
            Self::All => invoice.involves(account),
        }
    }
}

/// Query string for invoice listings.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ListInvoicesQuery {
    #[serde(default)]
    pub direction: InvoiceDirection,
}

/// An invoice as seen from one of its parties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceSummary {
    pub id: InvoiceId,
    pub amount: i64,
    pub state: InvoiceState,
    pub expiration_date: DateTime<Utc>,
    /// The other party of the invoice
    pub with_account_id: AccountId,
}

impl InvoiceSummary {
    /// Returns `None` if `account` is not a party of the invoice.
    pub fn for_account(invoice: &Invoice, account: AccountId) -> Option<Self> {
        invoice.counterparty(account).map(|with_account_id| Self {
            id: invoice.id,
            amount: invoice.amount.cents(),
            state: invoice.state,
            expiration_date: invoice.expiration_date,
            with_account_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_filters() {
        let payer = AccountId::new();
        let receiver = AccountId::new();
        let invoice = Invoice::new(100, Utc::now(), payer, receiver).unwrap();

        assert!(InvoiceDirection::Created.matches(&invoice, receiver));
        assert!(!InvoiceDirection::Created.matches(&invoice, payer));
        assert!(InvoiceDirection::Received.matches(&invoice, payer));
        assert!(InvoiceDirection::All.matches(&invoice, payer));
        assert!(!InvoiceDirection::All.matches(&invoice, AccountId::new()));
    }

    #[test]
    fn test_direction_query_defaults_to_all() {
        let query: ListInvoicesQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.direction, InvoiceDirection::All);

        let query: ListInvoicesQuery =
            serde_json::from_str(r#"{"direction":"received"}"#).unwrap();
        assert_eq!(query.direction, InvoiceDirection::Received);
    }

    #[test]
    fn test_summary_shows_counterparty() {
        let payer = AccountId::new();
        let receiver = AccountId::new();
        let invoice = Invoice::new(4000, Utc::now(), payer, receiver).unwrap();

        let summary = InvoiceSummary::for_account(&invoice, receiver).unwrap();
        assert_eq!(summary.with_account_id, payer);
        assert_eq!(summary.amount, 4000);
        assert!(InvoiceSummary::for_account(&invoice, AccountId::new()).is_none());
    }
}
