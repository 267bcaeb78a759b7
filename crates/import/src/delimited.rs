//! The row loop shared by every delimited-text dialect.

use kassa_core::{NormalizedTransaction, PositionSnapshot};

use crate::columns::{map_columns, ColumnSpec, HeaderMapping};
use crate::error::{ImportError, RowError, StructuralError, ValueError};
use crate::header::{is_rule_row, locate_header, split_fields};
use crate::parsers::{ParseContext, ParsedFile, ParsedRow};

/// What one data row turned into.
#[derive(Debug, Clone)]
pub enum Record {
    Transaction(NormalizedTransaction),
    Position(PositionSnapshot),
}

/// Locates the header, maps `specs`, then feeds each data row to `row_fn`.
///
/// `row_fn` returns `Ok(None)` for rows the dialect filters out on purpose;
/// those are not counted. A `ValueError` becomes a [`RowError`] and the loop
/// moves on. Rows with non-empty cells past the header's width never reach
/// `row_fn`: an unquoted decimal comma would otherwise shift every column.
pub(crate) fn parse_delimited<F>(
    text: &str,
    ctx: &ParseContext<'_>,
    specs: &[ColumnSpec],
    is_header: fn(&str) -> bool,
    mut row_fn: F,
) -> Result<ParsedFile, ImportError>
where
    F: FnMut(&HeaderMapping, &[String]) -> Result<Option<Record>, ValueError>,
{
    let header = locate_header(text, ctx.config.header_scan_lines, is_header)?;
    let mapping = map_columns(&header.cells, specs)?;
    let min_width = mapping.min_width(specs);

    let mut parsed = ParsedFile::default();
    for (idx, line) in text.lines().enumerate().skip(header.line_index + 1) {
        ctx.cancel.check()?;
        let row_number = idx + 1;

        if line.trim().is_empty() || is_rule_row(line) {
            continue;
        }
        let fields = split_fields(line, header.delimiter);
        if fields.len() < min_width {
            tracing::trace!(row = row_number, width = fields.len(), "skipping short row");
            continue;
        }

        let outcome = if overflows(&fields, header.cells.len()) {
            Err(ValueError::ExtraFields {
                expected: header.cells.len(),
                found: fields.len(),
            })
        } else {
            match row_fn(&mapping, &fields) {
                Ok(None) => {
                    tracing::trace!(row = row_number, "row filtered by dialect");
                    continue;
                }
                Ok(Some(record)) => Ok(record),
                Err(e) => Err(e),
            }
        };

        parsed.total_rows += 1;
        if let Some(limit) = ctx.config.max_rows {
            if parsed.total_rows > limit {
                return Err(StructuralError::TooManyRows { limit }.into());
            }
        }

        match outcome {
            Ok(Record::Transaction(transaction)) => parsed.rows.push(ParsedRow {
                row_number,
                raw_line: line.to_string(),
                transaction,
            }),
            Ok(Record::Position(position)) => parsed.positions.push(position),
            Err(e) => parsed.errors.push(RowError::new(row_number, line, &e)),
        }
    }

    Ok(parsed)
}

/// True when a cell beyond `width` carries a value. Trailing empty cells
/// from a dangling delimiter are tolerated.
fn overflows(fields: &[String], width: usize) -> bool {
    fields.iter().skip(width).any(|f| !f.is_empty())
}

/// Joins two optional description parts, skipping blanks.
pub(crate) fn join_description(first: Option<&str>, second: Option<&str>, sep: &str) -> String {
    match (first, second) {
        (Some(a), Some(b)) => format!("{a}{sep}{b}"),
        (Some(a), None) => a.to_string(),
        (None, Some(b)) => b.to_string(),
        (None, None) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancelToken;
    use crate::columns::{required, Field};
    use crate::config::ImportConfig;
    use crate::error::RowErrorKind;
    use crate::value::{parse_amount, DecimalMark};
    use chrono::NaiveDate;
    use kassa_core::Currency;

    const SPECS: &[ColumnSpec] = &[required(Field::Date), required(Field::Amount)];

    fn is_header(l: &str) -> bool {
        l.contains("datum") && l.contains("belopp")
    }

    fn run(text: &str, config: &ImportConfig) -> Result<ParsedFile, ImportError> {
        let cancel = CancelToken::new();
        let ctx = ParseContext::new(config, &cancel).unwrap();
        parse_delimited(text, &ctx, SPECS, is_header, |m, row| {
            let amount = parse_amount(m.require(Field::Amount, row)?, DecimalMark::Comma)?;
            if amount.is_zero() {
                return Ok(None);
            }
            Ok(Some(Record::Transaction(NormalizedTransaction::from_signed(
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                amount,
                "x",
                Currency::sek(),
                "test",
            ))))
        })
    }

    #[test]
    fn counts_rows_and_errors() {
        let text = "Datum;Belopp\n2024-01-01;1,00\n2024-01-02;abc\n\n|---|---|\n2024-01-03;0\n2024-01-04;-2,00\n";
        let parsed = run(text, &ImportConfig::default()).unwrap();
        assert_eq!(parsed.total_rows, 3);
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.errors.len(), 1);
        assert_eq!(parsed.errors[0].row_number, 3);
        assert_eq!(parsed.errors[0].kind, RowErrorKind::InvalidAmount);
        assert_eq!(parsed.errors[0].raw_line, "2024-01-02;abc");
        assert_eq!(parsed.rows[1].row_number, 7);
    }

    #[test]
    fn short_rows_skipped() {
        let text = "Datum;Belopp\n2024-01-01\n2024-01-02;5\n";
        let parsed = run(text, &ImportConfig::default()).unwrap();
        assert_eq!(parsed.total_rows, 1);
    }

    #[test]
    fn split_decimal_comma_is_malformed() {
        let text = "Datum,Belopp\n2024-01-15,-123,50\n2024-01-16,-7\n";
        let parsed = run(text, &ImportConfig::default()).unwrap();
        assert_eq!(parsed.total_rows, 2);
        assert_eq!(parsed.rows.len(), 1);
        assert_eq!(parsed.errors.len(), 1);
        assert_eq!(parsed.errors[0].row_number, 2);
        assert_eq!(parsed.errors[0].kind, RowErrorKind::Malformed);
        assert_eq!(parsed.errors[0].raw_line, "2024-01-15,-123,50");
    }

    #[test]
    fn trailing_empty_cells_tolerated() {
        let text = "Datum;Belopp\n2024-01-01;1,00;;\n";
        let parsed = run(text, &ImportConfig::default()).unwrap();
        assert_eq!(parsed.rows.len(), 1);
        assert!(parsed.errors.is_empty());
    }

    #[test]
    fn row_limit_enforced() {
        let config = ImportConfig {
            max_rows: Some(1),
            ..ImportConfig::default()
        };
        let text = "Datum;Belopp\n2024-01-01;1\n2024-01-02;2\n";
        assert!(matches!(
            run(text, &config),
            Err(ImportError::Structural(StructuralError::TooManyRows { limit: 1 }))
        ));
    }

    #[test]
    fn cancelled_before_rows() {
        let config = ImportConfig::default();
        let cancel = CancelToken::new();
        cancel.cancel();
        let ctx = ParseContext::new(&config, &cancel).unwrap();
        let result = parse_delimited("Datum;Belopp\n2024-01-01;1\n", &ctx, SPECS, is_header, |_, _| Ok(None));
        assert!(matches!(result, Err(ImportError::Cancelled)));
    }

    #[test]
    fn join_description_parts() {
        assert_eq!(join_description(Some("ICA"), Some("Mat"), " - "), "ICA - Mat");
        assert_eq!(join_description(None, Some("Mat"), " - "), "Mat");
        assert_eq!(join_description(None, None, " - "), "");
    }
}
