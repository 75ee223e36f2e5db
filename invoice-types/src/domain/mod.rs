//! Domain models for the invoice ledger.

pub mod account;
pub mod invoice;
pub mod money;
pub mod settlement;

pub use account::{Account, AccountId};
pub use invoice::{Invoice, InvoiceId, InvoiceState};
pub use money::Money;
pub use settlement::{Settlement, TransferOrder};
