use chrono::NaiveDate;
use kassa_core::{DateRange, Money, NormalizedTransaction, PositionSnapshot};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::cancel::CancelToken;
use crate::error::{ImportError, ImportWarning, RowError};
use crate::parsers::{ParsedFile, ParserKind};

/// Duplicate test supplied by whoever persists the records.
pub trait DuplicateCheck {
    fn is_duplicate(
        &self,
        date: NaiveDate,
        amount: &Money,
        description: &str,
        bank_source_id: Option<i64>,
    ) -> bool;
}

impl<F> DuplicateCheck for F
where
    F: Fn(NaiveDate, &Money, &str, Option<i64>) -> bool,
{
    fn is_duplicate(
        &self,
        date: NaiveDate,
        amount: &Money,
        description: &str,
        bank_source_id: Option<i64>,
    ) -> bool {
        self(date, amount, description, bank_source_id)
    }
}

/// Treats every record as new.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDuplicates;

impl DuplicateCheck for NoDuplicates {
    fn is_duplicate(&self, _: NaiveDate, _: &Money, _: &str, _: Option<i64>) -> bool {
        false
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    /// Sum of magnitudes, income and expense alike.
    pub total_amount: Money,
    pub income_amount: Money,
    pub expense_amount: Money,
    pub income_count: usize,
    pub expense_count: usize,
    /// Income minus expense.
    pub net_amount: Decimal,
    /// Earliest to latest record date; `None` without records.
    pub period: Option<DateRange>,
}

impl ImportSummary {
    fn from_records(records: &[NormalizedTransaction]) -> Self {
        let (income, expense): (Vec<_>, Vec<_>) = records.iter().partition(|t| t.is_income());
        let income_amount: Money = income.iter().map(|t| t.amount()).sum();
        let expense_amount: Money = expense.iter().map(|t| t.amount()).sum();

        ImportSummary {
            total_amount: income_amount + expense_amount,
            income_amount,
            expense_amount,
            income_count: income.len(),
            expense_count: expense.len(),
            net_amount: income_amount.as_decimal() - expense_amount.as_decimal(),
            period: DateRange::covering(records.iter().map(|t| t.date())),
        }
    }
}

/// Result of one import call.
///
/// `imported_count + duplicate_count + error_count == total_rows`. Records
/// flagged as duplicates are counted but not returned.
#[derive(Debug, Clone, Serialize)]
pub struct ImportOutcome {
    pub format: ParserKind,
    pub total_rows: usize,
    pub imported_count: usize,
    pub duplicate_count: usize,
    pub error_count: usize,
    pub errors: Vec<RowError>,
    pub records: Vec<NormalizedTransaction>,
    pub positions: Vec<PositionSnapshot>,
    pub warnings: Vec<ImportWarning>,
    pub summary: ImportSummary,
}

/// Filters duplicates out of `parsed` and computes the totals.
pub(crate) fn aggregate(
    format: ParserKind,
    parsed: ParsedFile,
    duplicates: &dyn DuplicateCheck,
    bank_source_id: Option<i64>,
    warnings: Vec<ImportWarning>,
    cancel: &CancelToken,
) -> Result<ImportOutcome, ImportError> {
    let mut records = Vec::with_capacity(parsed.rows.len());
    let mut duplicate_count = 0;
    for row in parsed.rows {
        cancel.check()?;
        let t = &row.transaction;
        if duplicates.is_duplicate(t.date(), &t.amount(), t.description(), bank_source_id) {
            tracing::trace!(row = row.row_number, "duplicate");
            duplicate_count += 1;
        } else {
            records.push(row.transaction);
        }
    }

    let summary = ImportSummary::from_records(&records);
    let outcome = ImportOutcome {
        format,
        total_rows: parsed.total_rows,
        imported_count: records.len() + parsed.positions.len(),
        duplicate_count,
        error_count: parsed.errors.len(),
        errors: parsed.errors,
        records,
        positions: parsed.positions,
        warnings,
        summary,
    };

    let period = outcome
        .summary
        .period
        .map_or_else(|| "-".to_string(), |p| p.to_string());
    tracing::info!(
        format = %format,
        total = outcome.total_rows,
        imported = outcome.imported_count,
        duplicates = outcome.duplicate_count,
        errors = outcome.error_count,
        income = %outcome.summary.income_amount,
        expense = %outcome.summary.expense_amount,
        period = %period,
        "import finished"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValueError;
    use crate::parsers::ParsedRow;
    use kassa_core::Currency;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn row(n: usize, day: u32, cents: i64, desc: &str) -> ParsedRow {
        ParsedRow {
            row_number: n,
            raw_line: String::new(),
            transaction: NormalizedTransaction::from_signed(
                d(day),
                Decimal::new(cents, 2),
                desc,
                Currency::sek(),
                "test",
            ),
        }
    }

    fn parsed() -> ParsedFile {
        ParsedFile {
            total_rows: 4,
            rows: vec![
                row(2, 15, -12350, "ICA Maxi"),
                row(3, 25, 2500000, "Lön"),
                row(4, 3, -5000, "ICA Maxi"),
            ],
            positions: Vec::new(),
            errors: vec![RowError::new(5, "bad", &ValueError::InvalidDate("x".into()))],
        }
    }

    #[test]
    fn totals_without_duplicates() {
        let out = aggregate(
            ParserKind::IcaBanken,
            parsed(),
            &NoDuplicates,
            None,
            Vec::new(),
            &CancelToken::new(),
        )
        .unwrap();
        assert_eq!(out.total_rows, 4);
        assert_eq!(out.imported_count, 3);
        assert_eq!(out.error_count, 1);
        assert_eq!(out.imported_count + out.duplicate_count + out.error_count, out.total_rows);

        let s = &out.summary;
        assert_eq!(s.income_count, 1);
        assert_eq!(s.expense_count, 2);
        assert_eq!(s.income_amount.as_decimal(), Decimal::new(2500000, 2));
        assert_eq!(s.expense_amount.as_decimal(), Decimal::new(17350, 2));
        assert_eq!(s.total_amount.as_decimal(), Decimal::new(2517350, 2));
        assert_eq!(s.net_amount, Decimal::new(2482650, 2));
        assert_eq!(s.period, Some(DateRange::new(d(3), d(25))));
    }

    #[test]
    fn duplicates_are_counted_and_dropped() {
        let seen = |date: NaiveDate, _: &Money, desc: &str, source: Option<i64>| {
            assert_eq!(source, Some(7));
            date == d(15) && desc == "ICA Maxi"
        };
        let out = aggregate(
            ParserKind::IcaBanken,
            parsed(),
            &seen,
            Some(7),
            Vec::new(),
            &CancelToken::new(),
        )
        .unwrap();
        assert_eq!(out.duplicate_count, 1);
        assert_eq!(out.imported_count, 2);
        assert_eq!(out.records.len(), 2);
        assert_eq!(out.summary.expense_count, 1);
        assert_eq!(out.imported_count + out.duplicate_count + out.error_count, out.total_rows);
    }

    #[test]
    fn empty_file_has_no_period() {
        let out = aggregate(
            ParserKind::Ofx,
            ParsedFile::default(),
            &NoDuplicates,
            None,
            Vec::new(),
            &CancelToken::new(),
        )
        .unwrap();
        assert_eq!(out.summary.period, None);
        assert!(out.summary.total_amount.is_zero());
    }
}
