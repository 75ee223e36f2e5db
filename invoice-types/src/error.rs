//! Error types for the invoice ledger.

use crate::domain::{AccountId, InvoiceId, InvoiceState};

/// Domain-level errors (business rule violations).
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("Amount cannot be negative")]
    NegativeAmount,

    #[error("Invalid invoice: {0}")]
    InvalidInvoice(String),

    #[error("Not an invoice ID")]
    NotAnId,

    #[error("Invoice not found: {0}")]
    InvoiceNotFound(InvoiceId),

    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    #[error("Invoice already exists: {0}")]
    AlreadyExists(InvoiceId),

    #[error("Invoice already paid: {0}")]
    AlreadyPaid(InvoiceId),

    #[error("Invoice expired: {0}")]
    InvoiceExpired(InvoiceId),

    #[error("Invoice {0} is settled and cannot be deleted")]
    InvoiceSettled(InvoiceId),

    #[error("Invalid invoice transition: {from} -> {to}")]
    InvalidTransition {
        from: InvoiceState,
        to: InvoiceState,
    },

    #[error("Insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds { available: i64, requested: i64 },

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl DomainError {
    /// Stable machine-readable name for the error, carried in API responses.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::NegativeAmount => "negative_amount",
            Self::InvalidInvoice(_) => "invalid_invoice",
            Self::NotAnId => "not_an_id",
            Self::InvoiceNotFound(_) => "invoice_not_found",
            Self::AccountNotFound(_) => "account_not_found",
            Self::AlreadyExists(_) => "invoice_exists",
            Self::AlreadyPaid(_) => "already_paid",
            Self::InvoiceExpired(_) => "invoice_expired",
            Self::InvoiceSettled(_) => "invoice_settled",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::InsufficientFunds { .. } => "insufficient_funds",
            Self::ValidationError(_) => "validation_error",
        }
    }
}

/// Repository-level errors (data access failures).
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Conflict: {0}")]
    Conflict(String),
}

/// Application-level errors handed to the caller.
///
/// One variant per error kind; maps cleanly to HTTP status codes. Kinds that
/// group several domain failures keep the originating `reason`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {message}")]
    NotFound {
        reason: &'static str,
        message: String,
    },

    #[error("Conflict: {message}")]
    Conflict {
        reason: &'static str,
        message: String,
    },

    #[error("Insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds { available: i64, requested: i64 },

    #[error("Deadline exceeded: {0}")]
    Timeout(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn reason(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::NotFound { reason, .. } | Self::Conflict { reason, .. } => *reason,
            Self::InsufficientFunds { .. } => "insufficient_funds",
            Self::Timeout(_) => "timeout",
            Self::Internal(_) => "internal",
        }
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::InsufficientFunds {
                available,
                requested,
            } => AppError::InsufficientFunds {
                available,
                requested,
            },
            e @ (DomainError::InvoiceNotFound(_) | DomainError::AccountNotFound(_)) => {
                AppError::NotFound {
                    reason: e.reason(),
                    message: e.to_string(),
                }
            }
            e @ (DomainError::AlreadyExists(_)
            | DomainError::AlreadyPaid(_)
            | DomainError::InvoiceExpired(_)
            | DomainError::InvoiceSettled(_)
            | DomainError::InvalidTransition { .. }) => AppError::Conflict {
                reason: e.reason(),
                message: e.to_string(),
            },
            DomainError::InvalidInvoice(msg) | DomainError::ValidationError(msg) => {
                AppError::BadRequest(msg)
            }
            e @ (DomainError::NotAnId | DomainError::NegativeAmount) => {
                AppError::BadRequest(e.to_string())
            }
        }
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Domain(e) => e.into(),
            RepoError::Database(e) => AppError::Internal(e),
            RepoError::Transaction(e) => AppError::Internal(e),
            RepoError::Conflict(e) => AppError::Conflict {
                reason: "conflict",
                message: e,
            },
        }
    }
}
