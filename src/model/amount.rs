use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AmountError {
    /// Unable to parse decimal string.
    #[error("Unable to parse decimal string")]
    Decimal(#[from] rust_decimal::Error),

    /// Not an optionally signed run of digits with at most one decimal point.
    #[error("Malformed decimal string `{0}`")]
    Syntax(String),
}

/// A signed monetary amount: a balance or a balance delta.
///
/// Backed by [`Decimal`] so that repeated additions are exact. The scale of the input is kept, so
/// `"10.50"` displays as `10.50`, and sums take the larger scale of their operands.
///
/// [`Decimal`] holds at most 28 significant digits and would otherwise round past that. Parsing
/// and addition refuse to round instead.
#[derive(Copy, Clone, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Amount(Decimal);

impl Amount {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    /// Returns `None` when the sum is outside the range of [`Decimal`], or when it cannot be
    /// represented without rounding.
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        let sum = self.0.checked_add(rhs.0)?;

        // A rounded sum has dropped fractional digits from one of the operands.
        let exact = sum.scale() >= self.0.scale().max(rhs.0.scale())
            && sum.checked_sub(rhs.0) == Some(self.0);

        exact.then_some(Self(sum))
    }

    /// Flip the sign. Zero is its own negation.
    pub fn negate(self) -> Self {
        if self.is_zero() {
            self
        } else {
            Self(-self.0)
        }
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl From<Amount> for Decimal {
    fn from(value: Amount) -> Self {
        value.0
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unsigned = s.strip_prefix(['-', '+']).unwrap_or(s);
        let (int, frac) = unsigned.split_once('.').unwrap_or((unsigned, ""));
        let digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if int.len() + frac.len() == 0 || !digits(int) || !digits(frac) {
            return Err(AmountError::Syntax(s.to_string()));
        }

        // Fails rather than rounds when the digits do not fit.
        Ok(Self(Decimal::from_str_exact(s)?))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amount(s: &str) -> Amount {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!(amount("10.50").to_string(), "10.50");
        assert_eq!(amount("-3.25").to_string(), "-3.25");
        assert_eq!(amount("0").to_string(), "0");
        assert_eq!(amount("42").to_string(), "42");
        assert_eq!(Amount::ZERO.to_string(), "0");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for input in [
            "", "abc", "12abc", "1.2.3", "--5", "+-5", "ten", "1_000", "1,5", ".", "-", " 5", "1e3",
        ] {
            assert!(input.parse::<Amount>().is_err(), "{input:?} should not parse");
        }
    }

    #[test]
    fn test_parse_signs_and_points() {
        assert_eq!(amount("+5").to_string(), "5");
        assert_eq!(amount(".5").to_string(), "0.5");
        assert_eq!(amount("-0.5").to_string(), "-0.5");
    }

    #[test]
    fn test_parse_rejects_rounding() {
        // 29 fractional digits do not fit in 28.
        assert!(matches!(
            "0.00000000000000000000000000001".parse::<Amount>(),
            Err(AmountError::Decimal(_))
        ));

        assert_eq!(
            amount("0.0000000000000000000000000001").to_string(),
            "0.0000000000000000000000000001"
        );
    }

    #[test]
    fn test_exact_sums() {
        // 0.1 + 0.2 is the classic floating-point trap.
        let sum = amount("0.1").checked_add(amount("0.2")).unwrap();
        assert_eq!(sum.to_string(), "0.3");

        let sum = amount("10.50").checked_add(amount("-3.25")).unwrap();
        assert_eq!(sum.to_string(), "7.25");

        assert!(Amount::from(Decimal::MAX)
            .checked_add(amount("1"))
            .is_none());
    }

    #[test]
    fn test_inexact_sums_are_refused() {
        let big = amount("10000000000000000000");
        let small = amount("0.123456789012");

        assert!(big.checked_add(small).is_none());
        assert!(small.checked_add(big).is_none());

        // Twenty-eight significant digits still fit.
        let sum = big.checked_add(amount("0.12345678")).unwrap();
        assert_eq!(sum.to_string(), "10000000000000000000.12345678");
        assert_eq!(
            sum.checked_add(big.negate()).unwrap().to_string(),
            "0.12345678"
        );
    }

    #[test]
    fn test_negate() {
        assert_eq!(amount("10.50").negate().to_string(), "-10.50");
        assert_eq!(amount("-3.25").negate().to_string(), "3.25");
        assert_eq!(amount("0").negate().to_string(), "0");
        assert_eq!(amount("0.00").negate().to_string(), "0.00");
        assert_eq!(amount("7").negate().negate(), amount("7"));
    }
}
