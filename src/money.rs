//! A fixed point amount of money and its conversions to and from forms and the database.

use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Sub},
    str::FromStr,
};

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rust_decimal::{
    Decimal,
    prelude::{FromPrimitive, ToPrimitive},
};
use serde::{Deserialize, Serialize};

use crate::Error;

/// The number of digits allowed after the decimal point.
const MAX_DECIMAL_PLACES: u32 = 2;

/// An amount of money in dollars.
///
/// Stored in the database as text so that no precision is lost.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// No money at all.
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// Wrap a decimal number.
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create an amount from a whole number of dollars in a const context.
    pub const fn from_whole_dollars(dollars: u32) -> Self {
        Self(Decimal::from_parts(dollars, 0, 0, false, 0))
    }

    /// Create an amount from a whole number of dollars.
    pub fn from_dollars(dollars: i64) -> Self {
        Self(Decimal::from(dollars))
    }

    /// Parse an amount typed by a user into a form.
    ///
    /// # Errors
    /// Returns [Error::InvalidAmount] if `text` is not a number, is not
    /// positive, or has more than two decimal places.
    pub fn parse_positive(text: &str) -> Result<Self, Error> {
        let text = text.trim();

        if text.is_empty() {
            return Err(Error::InvalidAmount("Enter an amount.".to_owned()));
        }

        let amount = Decimal::from_str(text)
            .map_err(|_| Error::InvalidAmount(format!("\"{text}\" is not a number.")))?;

        if amount.normalize().scale() > MAX_DECIMAL_PLACES {
            return Err(Error::InvalidAmount(
                "Amounts can have at most two decimal places.".to_owned(),
            ));
        }

        if amount <= Decimal::ZERO {
            return Err(Error::InvalidAmount(
                "The amount must be greater than zero.".to_owned(),
            ));
        }

        Ok(Self(amount.round_dp(MAX_DECIMAL_PLACES)))
    }

    /// An approximation of the amount as a float, for display purposes only.
    pub fn as_f64(&self) -> f64 {
        self.0.to_f64().unwrap_or_default()
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Self) -> Self::Output {
        Money(self.0 - rhs.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Money::ZERO, |total, amount| total + amount)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl ToSql for Money {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0.to_string()))
    }
}

impl FromSql for Money {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Text(text) => {
                let text = std::str::from_utf8(text)
                    .map_err(|error| FromSqlError::Other(Box::new(error)))?;

                Decimal::from_str(text)
                    .map(Money)
                    .map_err(|error| FromSqlError::Other(Box::new(error)))
            }
            ValueRef::Integer(integer) => Ok(Money(Decimal::from(integer))),
            ValueRef::Real(real) => Decimal::from_f64(real)
                .map(Money)
                .ok_or(FromSqlError::InvalidType),
            _ => Err(FromSqlError::InvalidType),
        }
    }
}
