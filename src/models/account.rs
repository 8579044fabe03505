//! Account balances as read from the externally owned `accounts` table.
//!
//! The table holds one row per person with a `name` and a numeric `balance`.
//! The column type of `balance` is not fixed, so `Balance` decodes whichever
//! of the common numeric types the server returns.

use rust_decimal::Decimal;
use sqlx::{FromRow, Row, mysql::MySqlRow};
use std::fmt;

/// Account the dirty read, deadlock and lost update demonstrations write to.
pub const ALICE: &str = "Alice";

/// Account the repeatable and non-repeatable read demonstrations read from.
pub const BOB: &str = "Bob";

/// A balance value, kept in the representation the column uses.
///
/// # Decoding
///
/// The first column of the row is tried as:
/// 1. a signed integer (`INT`, `BIGINT`, ...)
/// 2. a fixed-point `DECIMAL`, which keeps its scale (`1500.00` stays `1500.00`)
/// 3. a floating point `FLOAT` or `DOUBLE`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Balance {
    Integer(i64),
    Decimal(Decimal),
    Float(f64),
}

impl Balance {
    /// Add `amount`, returning `None` if the result no longer fits.
    pub fn checked_add(self, amount: i64) -> Option<Self> {
        match self {
            Balance::Integer(value) => value.checked_add(amount).map(Balance::Integer),
            Balance::Decimal(value) => value.checked_add(Decimal::from(amount)).map(Balance::Decimal),
            Balance::Float(value) => {
                let sum = value + amount as f64;
                sum.is_finite().then_some(Balance::Float(sum))
            }
        }
    }
}

impl<'r> FromRow<'r, MySqlRow> for Balance {
    fn from_row(row: &'r MySqlRow) -> Result<Self, sqlx::Error> {
        if let Ok(value) = row.try_get::<i64, _>(0) {
            return Ok(Balance::Integer(value));
        }

        if let Ok(value) = row.try_get::<Decimal, _>(0) {
            return Ok(Balance::Decimal(value));
        }

        row.try_get::<f64, _>(0).map(Balance::Float)
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Balance::Integer(value) => write!(f, "{value}"),
            Balance::Decimal(value) => write!(f, "{value}"),
            Balance::Float(value) => write!(f, "{value}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn displays_value_as_stored() {
        assert_eq!(Balance::Integer(9999).to_string(), "9999");
        assert_eq!(
            Balance::Decimal(Decimal::from_str("1500.00").unwrap()).to_string(),
            "1500.00"
        );
        assert_eq!(Balance::Float(12.5).to_string(), "12.5");
    }

    #[test]
    fn adds_within_representation() {
        assert_eq!(
            Balance::Integer(1000).checked_add(200),
            Some(Balance::Integer(1200))
        );
        assert_eq!(
            Balance::Decimal(Decimal::from_str("10.50").unwrap()).checked_add(-1),
            Some(Balance::Decimal(Decimal::from_str("9.50").unwrap()))
        );
        assert_eq!(Balance::Float(0.5).checked_add(1), Some(Balance::Float(1.5)));
    }

    #[test]
    fn reports_integer_overflow() {
        assert_eq!(Balance::Integer(i64::MAX).checked_add(1), None);
        assert_eq!(Balance::Integer(i64::MIN).checked_add(-1), None);
    }

    #[test]
    fn reports_non_finite_float() {
        assert_eq!(Balance::Float(f64::INFINITY).checked_add(1), None);
        assert_eq!(Balance::Float(f64::NEG_INFINITY).checked_add(-1), None);
        assert_eq!(Balance::Float(f64::NAN).checked_add(0), None);
    }
}
