//! Input and output of the atomic payment unit.

use serde::{Deserialize, Serialize};

use super::account::AccountId;
use super::invoice::{Invoice, InvoiceId, InvoiceState};
use super::money::Money;

/// Everything the ledger needs to settle one invoice in a single unit of work.
///
/// The ledger re-checks each field against the stored invoice inside the unit;
/// a mismatch aborts the transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferOrder {
    pub invoice_id: InvoiceId,
    pub payer: AccountId,
    pub receiver: AccountId,
    pub amount: Money,
    pub new_state: InvoiceState,
}

impl TransferOrder {
    /// Builds the order that pays `invoice` in full.
    pub fn pay(invoice: &Invoice) -> Self {
        Self {
            invoice_id: invoice.id,
            payer: invoice.payer_account_id,
            receiver: invoice.receiver_account_id,
            amount: invoice.amount,
            new_state: InvoiceState::Paid,
        }
    }

    /// Account ids in lock order (ascending).
    pub fn lock_order(&self) -> (AccountId, AccountId) {
        if self.payer <= self.receiver {
            (self.payer, self.receiver)
        } else {
            (self.receiver, self.payer)
        }
    }
}

/// Committed result of a transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub invoice: Invoice,
    pub payer_balance: Money,
    pub receiver_balance: Money,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_lock_order_is_stable() {
        let invoice = Invoice::new(100, Utc::now(), AccountId::new(), AccountId::new()).unwrap();
        let order = TransferOrder::pay(&invoice);
        let (first, second) = order.lock_order();

        assert!(first < second);
        assert_eq!(order.new_state, InvoiceState::Paid);
        assert_eq!(order.amount, invoice.amount);
    }
}
