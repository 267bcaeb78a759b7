use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::money::{Currency, Money};

/// Longest description kept on a normalized record, counted in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 500;

/// One bank/broker row after normalization. The amount is always a magnitude;
/// direction lives only in `is_income`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredTransaction")]
pub struct NormalizedTransaction {
    date: NaiveDate,
    amount: Money,
    is_income: bool,
    description: String,
    currency: Currency,
    source_bank: String,
    reference: Option<String>,
}

impl NormalizedTransaction {
    pub fn new(
        date: NaiveDate,
        amount: Money,
        is_income: bool,
        description: &str,
        currency: Currency,
        source_bank: &str,
    ) -> Self {
        NormalizedTransaction {
            date,
            amount,
            is_income,
            description: truncate_description(description.trim()),
            currency,
            source_bank: source_bank.to_string(),
            reference: None,
        }
    }

    /// Builds a record from a signed amount, classifying by sign
    /// (strictly positive is income).
    pub fn from_signed(
        date: NaiveDate,
        signed_amount: Decimal,
        description: &str,
        currency: Currency,
        source_bank: &str,
    ) -> Self {
        let is_income = signed_amount > Decimal::ZERO;
        Self::new(
            date,
            Money::magnitude_of(signed_amount),
            is_income,
            description,
            currency,
            source_bank,
        )
    }

    pub fn with_reference(mut self, reference: Option<String>) -> Self {
        self.reference = reference.filter(|r| !r.trim().is_empty());
        self
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn amount(&self) -> Money {
        self.amount
    }

    pub fn is_income(&self) -> bool {
        self.is_income
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn currency(&self) -> &Currency {
        &self.currency
    }

    pub fn source_bank(&self) -> &str {
        &self.source_bank
    }

    pub fn reference(&self) -> Option<&str> {
        self.reference.as_deref()
    }
}

/// Wire shape of [`NormalizedTransaction`]. Deserializing goes through
/// `NormalizedTransaction::new` so stored descriptions obey the same limit.
#[derive(Deserialize)]
struct StoredTransaction {
    date: NaiveDate,
    amount: Money,
    is_income: bool,
    description: String,
    currency: Currency,
    source_bank: String,
    #[serde(default)]
    reference: Option<String>,
}

impl From<StoredTransaction> for NormalizedTransaction {
    fn from(raw: StoredTransaction) -> Self {
        NormalizedTransaction::new(
            raw.date,
            raw.amount,
            raw.is_income,
            &raw.description,
            raw.currency,
            &raw.source_bank,
        )
        .with_reference(raw.reference)
    }
}

/// A holding reported by a broker positions export. Not a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    pub account_id: Option<String>,
    pub name: String,
    pub quantity: Decimal,
    pub average_cost: Option<Decimal>,
    pub market_value: Option<Decimal>,
    pub isin: Option<String>,
    pub currency: Currency,
    pub source_bank: String,
}

fn truncate_description(s: &str) -> String {
    match s.char_indices().nth(MAX_DESCRIPTION_CHARS) {
        Some((byte_idx, _)) => s[..byte_idx].to_string(),
        None => s.to_string(),
    }
}
