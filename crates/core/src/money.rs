use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::Add;

use crate::error::CoreError;

/// A non-negative monetary magnitude. Direction (income vs expense) is carried
/// separately by whoever owns the amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    /// Absolute value of `amount`. The scale is preserved; no rounding happens.
    pub fn magnitude_of(amount: Decimal) -> Self {
        Money(amount.abs())
    }

    pub fn zero() -> Self {
        Money(Decimal::ZERO)
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    pub fn as_decimal(self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl TryFrom<Decimal> for Money {
    type Error = CoreError;
    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(CoreError::NegativeAmount(value));
        }
        Ok(Money(value))
    }
}

impl From<Money> for Decimal {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl Add for Money {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Money(self.0 + rhs.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |a, b| a + b)
    }
}

/// Three-letter upper-case currency code, e.g. `SEK`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    pub fn parse(code: &str) -> Result<Self, CoreError> {
        let code = code.trim();
        if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
            Ok(Currency(code.to_ascii_uppercase()))
        } else {
            Err(CoreError::InvalidCurrency(code.to_string()))
        }
    }

    pub fn sek() -> Self {
        Currency("SEK".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Currency {
    type Err = CoreError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Currency::parse(s)
    }
}

impl TryFrom<String> for Currency {
    type Error = CoreError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Currency::parse(&value)
    }
}

impl From<Currency> for String {
    fn from(value: Currency) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn magnitude_drops_sign() {
        assert_eq!(Money::magnitude_of(dec("-123.50")).as_decimal(), dec("123.50"));
        assert_eq!(Money::magnitude_of(dec("42")).as_decimal(), dec("42"));
    }

    #[test]
    fn magnitude_keeps_scale() {
        // 0.005 must not be rounded away
        assert_eq!(Money::magnitude_of(dec("-0.005")).as_decimal(), dec("0.005"));
    }

    #[test]
    fn sum_of_amounts() {
        let total: Money = [dec("1.10"), dec("-2.20"), dec("3.30")]
            .into_iter()
            .map(Money::magnitude_of)
            .sum();
        assert_eq!(total.as_decimal(), dec("6.60"));
    }

    #[test]
    fn display_two_decimals() {
        assert_eq!(Money::magnitude_of(dec("5")).to_string(), "5.00");
        assert_eq!(Money::magnitude_of(dec("-1234.5")).to_string(), "1234.50");
    }

    #[test]
    fn serde_rejects_negative_amounts() {
        let ok: Money = serde_json::from_str("\"123.50\"").unwrap();
        assert_eq!(ok.as_decimal(), dec("123.50"));
        assert_eq!(serde_json::to_string(&ok).unwrap(), "\"123.50\"");
        assert!(serde_json::from_str::<Money>("\"-5.00\"").is_err());
        assert!(serde_json::from_str::<Money>("-5.00").is_err());
        assert_eq!(
            Money::try_from(dec("-0.01")),
            Err(CoreError::NegativeAmount(dec("-0.01")))
        );
    }

    #[test]
    fn currency_normalizes_case() {
        assert_eq!(Currency::parse(" sek ").unwrap().as_str(), "SEK");
    }

    #[test]
    fn currency_rejects_garbage() {
        assert!(Currency::parse("SE").is_err());
        assert!(Currency::parse("S3K").is_err());
        assert!(Currency::parse("").is_err());
    }

    #[test]
    fn currency_serde_validates() {
        let ok: Currency = serde_json::from_str("\"eur\"").unwrap();
        assert_eq!(ok.as_str(), "EUR");
        assert!(serde_json::from_str::<Currency>("\"euro\"").is_err());
    }
}
