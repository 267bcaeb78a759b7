use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("Invalid currency code: '{0}'")]
    InvalidCurrency(String),
    #[error("Amount must not be negative: {0}")]
    NegativeAmount(Decimal),
}
