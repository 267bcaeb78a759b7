use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

use crate::encoding::fold_for_matching;
use crate::error::{StructuralError, ValueError};

/// Semantic columns a parser may ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Date,
    Amount,
    Description,
    Currency,
    Reference,
    AccountId,
    Isin,
    Quantity,
    RowType,
    DebitCredit,
    Beneficiary,
    Details,
    TransactionType,
    Name,
    MarketValue,
    AverageCost,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Field::Date => "date",
            Field::Amount => "amount",
            Field::Description => "description",
            Field::Currency => "currency",
            Field::Reference => "reference",
            Field::AccountId => "account_id",
            Field::Isin => "isin",
            Field::Quantity => "quantity",
            Field::RowType => "row_type",
            Field::DebitCredit => "debit_credit",
            Field::Beneficiary => "beneficiary",
            Field::Details => "details",
            Field::TransactionType => "transaction_type",
            Field::Name => "name",
            Field::MarketValue => "market_value",
            Field::AverageCost => "average_cost",
        };
        f.write_str(s)
    }
}

impl Field {
    /// Header spellings that identify this field, in priority order.
    pub fn synonyms(self) -> &'static [&'static str] {
        match self {
            Field::Date => &["datum", "date", "transaktionsdag", "bokföringsdag", "bokforingsdag"],
            Field::Amount => &["belopp", "amount"],
            Field::Description => &["beskrivning", "text", "description", "specifikation"],
            Field::Currency => &["valuta", "currency"],
            Field::Reference => &["referens", "reference", "archive id"],
            Field::AccountId => &["kontonummer", "konto", "client account", "account"],
            Field::Isin => &["isin"],
            Field::Quantity => &["volym", "antal", "quantity"],
            Field::RowType => &["row type", "radtyp"],
            Field::DebitCredit => &["debit/credit", "d/k"],
            Field::Beneficiary => &["beneficiary", "payer", "mottagare"],
            Field::Details => &["details"],
            Field::TransactionType => &["typ av transaktion", "transaktionstyp", "transaction type"],
            Field::Name => &["namn", "name"],
            Field::MarketValue => &["marknadsvärde", "market value"],
            Field::AverageCost => &["gav", "average cost"],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub field: Field,
    pub required: bool,
}

pub const fn required(field: Field) -> ColumnSpec {
    ColumnSpec { field, required: true }
}

pub const fn optional(field: Field) -> ColumnSpec {
    ColumnSpec { field, required: false }
}

/// Field → column index for one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMapping {
    columns: HashMap<Field, usize>,
}

impl HeaderMapping {
    pub fn get(&self, field: Field) -> Option<usize> {
        self.columns.get(&field).copied()
    }

    /// Trimmed, non-empty cell for `field`, if the column exists.
    pub fn value<'a>(&self, field: Field, row: &'a [String]) -> Option<&'a str> {
        self.get(field)
            .and_then(|i| row.get(i))
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }

    pub fn require<'a>(&self, field: Field, row: &'a [String]) -> Result<&'a str, ValueError> {
        self.value(field, row).ok_or(ValueError::MissingField(field))
    }

    /// Rows shorter than this cannot hold every mapped required column.
    pub fn min_width(&self, specs: &[ColumnSpec]) -> usize {
        specs
            .iter()
            .filter(|s| s.required)
            .filter_map(|s| self.get(s.field))
            .max()
            .map_or(0, |i| i + 1)
    }
}

/// Maps each `ColumnSpec` to a header cell. Exact matches win; otherwise the first
/// cell, left to right, containing any synonym. Unmatched required fields
/// are reported together.
///
/// This is not plain "first matching cell wins": in a header reading
/// `GAV (SEK);GAV`, [`Field::AverageCost`] maps to the later `GAV` cell
/// because it equals a synonym outright.
pub fn map_columns(cells: &[String], specs: &[ColumnSpec]) -> Result<HeaderMapping, StructuralError> {
    let folded: Vec<String> = cells.iter().map(|c| fold_for_matching(c.trim())).collect();
    let mut mapping = HeaderMapping::default();
    let mut missing = Vec::new();

    for spec in specs {
        let synonyms: Vec<String> = spec.field.synonyms().iter().map(|s| fold_for_matching(s)).collect();
        let exact = folded.iter().position(|cell| synonyms.iter().any(|s| cell == s));
        let found = exact.or_else(|| {
            folded
                .iter()
                .position(|cell| synonyms.iter().any(|s| cell.contains(s.as_str())))
        });

        match found {
            Some(idx) => {
                mapping.columns.insert(spec.field, idx);
            }
            None if spec.required => missing.push(spec.field),
            None => {}
        }
    }

    if !missing.is_empty() {
        return Err(StructuralError::MissingColumns(missing));
    }
    tracing::debug!(mapping = ?mapping.columns, "mapped columns");
    Ok(mapping)
}
