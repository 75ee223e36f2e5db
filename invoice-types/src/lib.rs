//! # Invoice Types
//!
//! Domain types and port traits for the invoice ledger service.
//! This crate has ZERO external IO dependencies - only data structures,
//! business rules, and trait definitions.
//!
//! ## Architecture
//!
//! This crate is the innermost core of the hexagonal architecture:
//! - `domain/` - Pure domain types (Money, Account, Invoice, Settlement)
//! - `ports/` - Trait definitions that adapters must implement
//! - `dto/` - Data Transfer Objects for API boundaries
//! - `error/` - Domain, repository and application error types

pub mod domain;
pub mod dto;
pub mod error;
pub mod ports;

// Re-export commonly used types
pub use domain::{
    Account, AccountId, Invoice, InvoiceId, InvoiceState, Money, Settlement, TransferOrder,
};
pub use dto::*;
pub use error::{AppError, DomainError, RepoError};
pub use ports::LedgerRepository;
