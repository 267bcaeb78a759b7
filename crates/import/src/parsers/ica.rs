//! ICA-banken account export.

use kassa_core::NormalizedTransaction;

use crate::columns::{optional, required, ColumnSpec, Field};
use crate::delimited::{parse_delimited, Record};
use crate::error::ImportError;
use crate::parsers::{ParseContext, ParsedFile};
use crate::value::{parse_amount, parse_date, DecimalMark, CSV_DATE_FORMATS};

pub const SOURCE_BANK: &str = "ICA-banken";

const COLUMNS: &[ColumnSpec] = &[
    required(Field::Date),
    required(Field::Amount),
    required(Field::Description),
    optional(Field::Reference),
];

pub(crate) fn is_header(folded: &str) -> bool {
    folded.contains("datum")
        && folded.contains("belopp")
        && (folded.contains("beskrivning") || folded.contains("text"))
}

pub fn parse(text: &str, ctx: &ParseContext<'_>) -> Result<ParsedFile, ImportError> {
    parse_delimited(text, ctx, COLUMNS, is_header, |m, row| {
        let date = parse_date(m.require(Field::Date, row)?, CSV_DATE_FORMATS)?;
        let amount = parse_amount(m.require(Field::Amount, row)?, DecimalMark::Comma)?;
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
