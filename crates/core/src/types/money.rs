//! Type-safe monetary amounts using decimal arithmetic.
//!
//! Amounts are `rust_decimal::Decimal` in the currency's standard unit
//! (pesos, reais, dollars), never floats and never minor units.

use core::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Errors from money arithmetic.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoneyError {
    /// Attempted to combine amounts in different currencies.
    #[error("cannot combine {left} with {right}")]
    CurrencyMismatch {
        /// Currency of the left operand.
        left: CurrencyCode,
        /// Currency of the right operand.
        right: CurrencyCode,
    },
    /// The result does not fit in a `Decimal`.
    #[error("amount overflow")]
    Overflow,
}

/// ISO 4217 currency codes accepted by the store.
///
/// The set follows the markets Mercado Pago operates in, plus USD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum CurrencyCode {
    #[default]
    Ars,
    Brl,
    Clp,
    Cop,
    Mxn,
    Pen,
    Uyu,
    Usd,
}

impl CurrencyCode {
    /// The ISO code, e.g. `"ARS"`.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Ars => "ARS",
            Self::Brl => "BRL",
            Self::Clp => "CLP",
            Self::Cop => "COP",
            Self::Mxn => "MXN",
            Self::Pen => "PEN",
            Self::Uyu => "UYU",
            Self::Usd => "USD",
        }
    }

    /// Symbol shown before the amount.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Ars | Self::Clp | Self::Cop | Self::Mxn | Self::Uyu => "$",
            Self::Brl => "R$",
            Self::Pen => "S/",
            Self::Usd => "US$",
        }
    }

    /// Number of decimal places used when displaying amounts.
    #[must_use]
    pub const fn minor_units(self) -> u32 {
        match self {
            Self::Clp => 0,
            _ => 2,
        }
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A monetary amount with its currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    /// Amount in the currency's standard unit.
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Money {
    /// Create a new amount.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Zero in the given currency.
    #[must_use]
    pub const fn zero(currency_code: CurrencyCode) -> Self {
        Self::new(Decimal::ZERO, currency_code)
    }

    /// Add two amounts of the same currency.
    ///
    /// # Errors
    ///
    /// Returns `CurrencyMismatch` for different currencies and `Overflow`
    /// when the sum is not representable.
    pub fn checked_add(self, other: Self) -> Result<Self, MoneyError> {
        if self.currency_code != other.currency_code {
            return Err(MoneyError::CurrencyMismatch {
                left: self.currency_code,
                right: other.currency_code,
            });
        }
        let amount = self
            .amount
            .checked_add(other.amount)
            .ok_or(MoneyError::Overflow)?;
        Ok(Self::new(amount, self.currency_code))
    }

    /// Multiply by a line quantity.
    ///
    /// # Errors
    ///
    /// Returns `Overflow` when the product is not representable.
    pub fn times(self, quantity: u32) -> Result<Self, MoneyError> {
        let amount = self
            .amount
            .checked_mul(Decimal::from(quantity))
            .ok_or(MoneyError::Overflow)?;
        Ok(Self::new(amount, self.currency_code))
    }

    /// Whether the amount is exactly zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Format for display, e.g. `"R$ 1,234.50"` or `"$ 1,200"` for CLP.
    #[must_use]
    pub fn display(&self) -> String {
        let digits = self.currency_code.minor_units();
        let rounded = self
            .amount
            .round_dp_with_strategy(digits, RoundingStrategy::MidpointAwayFromZero);
        let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
            "-"
        } else {
            ""
        };
        let plain = format!("{:.*}", digits as usize, rounded.abs());
        let (integer, fraction) = plain
            .split_once('.')
            .map_or((plain.as_str(), None), |(i, f)| (i, Some(f)));

        let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
        for (i, ch) in integer.chars().enumerate() {
            if i > 0 && (integer.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }

        match fraction {
            Some(fraction) => format!(
                "{sign}{} {grouped}.{fraction}",
                self.currency_code.symbol()
            ),
            None => format!("{sign}{} {grouped}", self.currency_code.symbol()),
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn money(amount: &str, currency: CurrencyCode) -> Money {
        Money::new(Decimal::from_str(amount).unwrap(), currency)
    }

    #[test]
    fn test_display_groups_thousands() {
        assert_eq!(money("1234.5", CurrencyCode::Brl).display(), "R$ 1,234.50");
        assert_eq!(money("1234567.891", CurrencyCode::Ars).display(), "$ 1,234,567.89");
        assert_eq!(money("999", CurrencyCode::Usd).display(), "US$ 999.00");
    }

    #[test]
    fn test_display_zero_decimal_currency() {
        assert_eq!(money("1200.4", CurrencyCode::Clp).display(), "$ 1,200");
        assert_eq!(money("0.5", CurrencyCode::Clp).display(), "$ 1");
    }

    #[test]
    fn test_display_negative() {
        assert_eq!(money("-15.005", CurrencyCode::Pen).display(), "-S/ 15.01");
    }

    #[test]
    fn test_checked_add_same_currency() {
        let total = money("10.10", CurrencyCode::Ars)
            .checked_add(money("0.90", CurrencyCode::Ars))
            .unwrap();
        assert_eq!(total, money("11.00", CurrencyCode::Ars));
    }

    #[test]
    fn test_checked_add_currency_mismatch() {
        let err = money("1", CurrencyCode::Ars)
            .checked_add(money("1", CurrencyCode::Usd))
            .unwrap_err();
        assert_eq!(
            err,
            MoneyError::CurrencyMismatch {
                left: CurrencyCode::Ars,
                right: CurrencyCode::Usd,
            }
        );
    }

    #[test]
    fn test_times() {
        let line = money("19.99", CurrencyCode::Mxn).times(3).unwrap();
        assert_eq!(line, money("59.97", CurrencyCode::Mxn));
        assert!(money("5", CurrencyCode::Mxn).times(0).unwrap().is_zero());
    }

    #[test]
    fn test_serde_accepts_string_and_number_amounts() {
        let from_str: Money =
            serde_json::from_str(r#"{"amount":"12.50","currency_code":"ARS"}"#).unwrap();
        let from_num: Money =
            serde_json::from_str(r#"{"amount":12.5,"currency_code":"ARS"}"#).unwrap();
        assert_eq!(from_str, from_num);
        assert_eq!(from_str.currency_code, CurrencyCode::Ars);
    }
}
