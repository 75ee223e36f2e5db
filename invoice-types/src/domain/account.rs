//! Account domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::money::Money;
use crate::error::DomainError;

/// Unique identifier for an Account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(Uuid);

impl AccountId {
    /// Creates a new random AccountId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an AccountId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the UUID value.
    pub fn into_uuid(self) -> Uuid {
        self.0
    }

    /// True for the all-zero id, which never names a stored account.
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for AccountId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// An account holder and its ledger balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier
    pub id: AccountId,
    pub name: String,
    pub surname: String,
    /// Contact address, unique across accounts
    pub email: String,
    pub phone_number: Option<String>,
    /// Current balance in minor units
    pub balance: Money,
    /// When the account was opened
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Opens a new account with the given starting balance.
    ///
    /// # Validation
    /// - Name cannot be empty
    /// - Email must look like an address
    pub fn open(
        name: String,
        surname: String,
        email: String,
        phone_number: Option<String>,
        balance: Money,
    ) -> Result<Self, DomainError> {
        if name.trim().is_empty() {
            return Err(DomainError::ValidationError(
                "Account name cannot be empty".into(),
            ));
        }
        if !email.contains('@') {
            return Err(DomainError::ValidationError(format!(
                "Invalid email address: {}",
                email
            )));
        }

        Ok(Self {
            id: AccountId::new(),
            name,
            surname,
            email,
            phone_number,
            balance,
            created_at: Utc::now(),
        })
    }

    /// Creates an account with all fields specified (for database reconstruction).
    pub fn from_parts(
        id: AccountId,
        name: String,
        surname: String,
        email: String,
        phone_number: Option<String>,
        balance: Money,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            surname,
            email,
            phone_number,
            balance,
            created_at,
        }
    }

    /// Credits (adds) money to the account.
    pub fn credit(&mut self, amount: Money) -> Result<(), DomainError> {
        self.balance = self.balance.checked_add(amount)?;
        Ok(())
    }

    /// Debits (subtracts) money from the account.
    pub fn debit(&mut self, amount: Money) -> Result<(), DomainError> {
        self.balance = self.balance.checked_sub(amount)?;
        Ok(())
    }
}
