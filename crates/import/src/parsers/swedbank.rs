//! Swedbank exports. Two unrelated layouts exist and are told apart only by
//! header vocabulary: the legacy English export (row type codes, explicit
//! debit/credit flag) and the newer Swedish CSN export.

use kassa_core::{Currency, Money, NormalizedTransaction};

use crate::columns::{optional, required, ColumnSpec, Field, HeaderMapping};
use crate::delimited::{join_description, parse_delimited, Record};
use crate::error::{ImportError, ValueError};
use crate::parsers::{ParseContext, ParsedFile};
use crate::value::{parse_amount, parse_date, DecimalMark, CSV_DATE_FORMATS};

pub const SOURCE_BANK: &str = "Swedbank";

/// Legacy row type code of an actual transaction. Other codes are opening
/// balance, turnover and closing balance lines.
const TRANSACTION_ROW_TYPE: &str = "20";

const LEGACY_COLUMNS: &[ColumnSpec] = &[
    required(Field::RowType),
    required(Field::Date),
    required(Field::Amount),
    required(Field::DebitCredit),
    optional(Field::Beneficiary),
    optional(Field::Details),
    optional(Field::Currency),
    optional(Field::Reference),
];

const CSN_COLUMNS: &[ColumnSpec] = &[
    required(Field::Date),
    required(Field::Amount),
    required(Field::Description),
    optional(Field::Currency),
    optional(Field::Reference),
];

pub(crate) fn is_legacy_header(folded: &str) -> bool {
    folded.contains("row type")
        && folded.contains("debit/credit")
        && (folded.contains("client account") || folded.contains("details"))
}

pub(crate) fn is_csn_header(folded: &str) -> bool {
    folded.contains("radnummer")
        && folded.contains("bokforingsdag")
        && folded.contains("belopp")
        && folded.contains("beskrivning")
}

/// `true` when the row names a currency other than the settlement one.
fn is_foreign(m: &HeaderMapping, row: &[String], settlement: &Currency) -> bool {
    m.value(Field::Currency, row)
        .is_some_and(|c| !c.eq_ignore_ascii_case(settlement.as_str()))
}

/// `K`/`C` credit the account, `D` debits it.
fn credit_flag(raw: &str) -> Result<bool, ValueError> {
    match raw.trim().to_ascii_uppercase().as_str() {
        "K" | "C" => Ok(true),
        "D" => Ok(false),
        _ => Err(ValueError::InvalidFlag(raw.trim().to_string())),
    }
}

pub fn parse_legacy(text: &str, ctx: &ParseContext<'_>) -> Result<ParsedFile, ImportError> {
    parse_delimited(text, ctx, LEGACY_COLUMNS, is_legacy_header, |m, row| {
        if m.value(Field::RowType, row) != Some(TRANSACTION_ROW_TYPE) {
            return Ok(None);
        }
        if is_foreign(m, row, &ctx.settlement) {
            return Ok(None);
        }

        let date = parse_date(m.require(Field::Date, row)?, CSV_DATE_FORMATS)?;
        let amount = parse_amount(m.require(Field::Amount, row)?, DecimalMark::Comma)?;
        let is_income = credit_flag(m.require(Field::DebitCredit, row)?)?;
        let description = join_description(
            m.value(Field::Beneficiary, row),
            m.value(Field::Details, row),
            " - ",
        );

        let transaction = NormalizedTransaction::new(
            date,
            Money::magnitude_of(amount),
            is_income,
            &description,
            ctx.settlement.clone(),
            SOURCE_BANK,
        )
        .with_reference(m.value(Field::Reference, row).map(str::to_string));
        Ok(Some(Record::Transaction(transaction)))
    })
}

pub fn parse_csn(text: &str, ctx: &ParseContext<'_>) -> Result<ParsedFile, ImportError> {
    parse_delimited(text, ctx, CSN_COLUMNS, is_csn_header, |m, row| {
        if is_foreign(m, row, &ctx.settlement) {
            return Ok(None);
        }

        let date = parse_date(m.require(Field::Date, row)?, CSV_DATE_FORMATS)?;
        let amount = parse_amount(m.require(Field::Amount, row)?, DecimalMark::Auto)?;
        let description = m.value(Field::Description, row).unwrap_or("");

        let transaction = NormalizedTransaction::from_signed(
            date,
            amount,
            description,
            ctx.settlement.clone(),
            SOURCE_BANK,
        )
        .with_reference(m.value(Field::Reference, row).map(str::to_string));
        Ok(Some(Record::Transaction(transaction)))
    })
}
