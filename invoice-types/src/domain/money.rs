//! Monetary amounts in minor units.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DomainError;

/// Monetary amount in the smallest unit of the ledger currency (cents).
///
/// Stored as an integer to avoid floating-point precision issues. Balances may
/// be negative; invoice amounts are validated to be strictly positive by
/// [`Money::positive`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Creates a strictly positive Money value (invoice amounts).
    pub fn positive(cents: i64) -> Result<Self, DomainError> {
        if cents < 0 {
            return Err(DomainError::NegativeAmount);
        }
        if cents == 0 {
            return Err(DomainError::InvalidInvoice(
                "Invoice amount must be positive".into(),
            ));
        }
        Ok(Self(cents))
    }

    pub fn zero() -> Self {
        Self(0)
    }

    /// Returns the amount in minor units.
    pub fn cents(&self) -> i64 {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checked addition, fails on overflow.
    pub fn checked_add(&self, other: Money) -> Result<Money, DomainError> {
        self.0
            .checked_add(other.0)
            .map(Money)
            .ok_or_else(|| DomainError::ValidationError("Amount overflow".into()))
    }

    /// Checked subtraction - fails if the result would drop below zero.
    pub fn checked_sub(&self, other: Money) -> Result<Money, DomainError> {
        if self.0 < other.0 {
            return Err(DomainError::InsufficientFunds {
                available: self.0,
                requested: other.0,
            });
        }
        Ok(Money(self.0 - other.0))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_money() {
        let money = Money::positive(4000).unwrap();
        assert_eq!(money.cents(), 4000);
        assert!(money.is_positive());
    }

    #[test]
    fn test_zero_invoice_amount_fails() {
        let result = Money::positive(0);
        assert!(matches!(result, Err(DomainError::InvalidInvoice(_))));
    }

    #[test]
    fn test_negative_money_fails() {
        let result = Money::positive(-100);
        assert!(matches!(result, Err(DomainError::NegativeAmount)));
    }

    #[test]
    fn test_checked_sub_insufficient() {
        let balance = Money::from_cents(100);
        let result = balance.checked_sub(Money::from_cents(250));
        assert!(matches!(
            result,
            Err(DomainError::InsufficientFunds {
                available: 100,
                requested: 250
            })
        ));
    }

    #[test]
    fn test_checked_add_overflow() {
        let result = Money::from_cents(i64::MAX).checked_add(Money::from_cents(1));
        assert!(matches!(result, Err(DomainError::ValidationError(_))));
    }

    #[test]
    fn test_money_display() {
        assert_eq!(Money::from_cents(10000).to_string(), "100.00");
        assert_eq!(Money::from_cents(1050).to_string(), "10.50");
        assert_eq!(Money::from_cents(-5).to_string(), "-0.05");
    }
}
