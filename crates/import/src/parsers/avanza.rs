//! Avanza broker exports: transaction history and current holdings.

use kassa_core::{Currency, NormalizedTransaction, PositionSnapshot};
use rust_decimal::Decimal;

use crate::columns::{optional, required, ColumnSpec, Field, HeaderMapping};
use crate::delimited::{parse_delimited, Record};
use crate::error::{ImportError, ValueError};
use crate::parsers::{ParseContext, ParsedFile};
use crate::value::{parse_amount, parse_date, DecimalMark, CSV_DATE_FORMATS};

pub const SOURCE_BANK: &str = "Avanza";

const TRANSACTION_COLUMNS: &[ColumnSpec] = &[
    required(Field::Date),
    required(Field::TransactionType),
    required(Field::Amount),
    optional(Field::Description),
    optional(Field::Isin),
];

const HOLDINGS_COLUMNS: &[ColumnSpec] = &[
    required(Field::Name),
    required(Field::Quantity),
    required(Field::MarketValue),
    optional(Field::AccountId),
    optional(Field::AverageCost),
    optional(Field::Currency),
    optional(Field::Isin),
];

pub(crate) fn is_transactions_header(folded: &str) -> bool {
    folded.contains("datum") && folded.contains("typ av transaktion") && folded.contains("belopp")
}

pub(crate) fn is_holdings_header(folded: &str) -> bool {
    folded.contains("kontonummer")
        && folded.contains("namn")
        && folded.contains("volym")
        && folded.contains("marknadsvarde")
}

/// Avanza writes `-` for "no value".
fn numeric(m: &HeaderMapping, field: Field, row: &[String]) -> Result<Option<Decimal>, ValueError> {
    match m.value(field, row) {
        None | Some("-") => Ok(None),
        Some(raw) => parse_amount(raw, DecimalMark::Comma).map(Some),
    }
}

pub fn parse_transactions(text: &str, ctx: &ParseContext<'_>) -> Result<ParsedFile, ImportError> {
    parse_delimited(text, ctx, TRANSACTION_COLUMNS, is_transactions_header, |m, row| {
        // Splits, transfers of securities and similar events carry no amount.
        let Some(amount) = numeric(m, Field::Amount, row)? else {
            return Ok(None);
        };
        let date = parse_date(m.require(Field::Date, row)?, CSV_DATE_FORMATS)?;
        let kind = m.require(Field::TransactionType, row)?;
        let description = match m.value(Field::Description, row) {
            Some(security) => format!("{kind}: {security}"),
            None => kind.to_string(),
        };

        let transaction = NormalizedTransaction::from_signed(
            date,
            amount,
            &description,
            ctx.settlement.clone(),
            SOURCE_BANK,
        );
        Ok(Some(Record::Transaction(transaction)))
    })
}

pub fn parse_holdings(text: &str, ctx: &ParseContext<'_>) -> Result<ParsedFile, ImportError> {
    parse_delimited(text, ctx, HOLDINGS_COLUMNS, is_holdings_header, |m, row| {
        let name = m.require(Field::Name, row)?;
        let quantity = numeric(m, Field::Quantity, row)?.ok_or(ValueError::MissingField(Field::Quantity))?;
        let currency = match m.value(Field::Currency, row) {
            Some(code) => Currency::parse(code).map_err(|_| ValueError::InvalidCurrency(code.to_string()))?,
            None => ctx.settlement.clone(),
        };

        Ok(Some(Record::Position(PositionSnapshot {
            account_id: m.value(Field::AccountId, row).map(str::to_string),
            name: name.to_string(),
            quantity,
            average_cost: numeric(m, Field::AverageCost, row)?,
            market_value: numeric(m, Field::MarketValue, row)?,
            isin: m.value(Field::Isin, row).map(str::to_string),
            currency,
            source_bank: SOURCE_BANK.to_string(),
        })))
    })
}
