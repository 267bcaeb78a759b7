use serde::Serialize;
use thiserror::Error;

use crate::columns::Field;

/// Fatal failures. Any of these aborts the whole import with no records.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unrecognized file format")]
    UnrecognizedFormat,
    #[error("Structural error: {0}")]
    Structural(#[from] StructuralError),
    #[error("Import cancelled")]
    Cancelled,
    #[error("Invalid configuration: {0}")]
    Config(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StructuralError {
    #[error("No header row found in the first {scanned} lines")]
    HeaderNotFound { scanned: usize },
    #[error("Header row has no recognizable delimiter")]
    NoDelimiter,
    #[error("Missing required column(s): {}", join_fields(.0))]
    MissingColumns(Vec<Field>),
    #[error("File exceeds the row limit of {limit}")]
    TooManyRows { limit: usize },
}

fn join_fields(fields: &[Field]) -> String {
    fields
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Failure to normalize a single value. Always downgraded to a [`RowError`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    #[error("Invalid amount: '{0}'")]
    InvalidAmount(String),
    #[error("Invalid date: '{0}'")]
    InvalidDate(String),
    #[error("Missing value for column {0}")]
    MissingField(Field),
    #[error("Invalid currency: '{0}'")]
    InvalidCurrency(String),
    #[error("Unknown debit/credit flag: '{0}'")]
    InvalidFlag(String),
    #[error("Row has {found} fields but the header has {expected}")]
    ExtraFields { expected: usize, found: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowErrorKind {
    InvalidDate,
    InvalidAmount,
    MissingField,
    InvalidCurrency,
    Malformed,
}

impl std::fmt::Display for RowErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RowErrorKind::InvalidDate => write!(f, "invalid_date"),
            RowErrorKind::InvalidAmount => write!(f, "invalid_amount"),
            RowErrorKind::MissingField => write!(f, "missing_field"),
            RowErrorKind::InvalidCurrency => write!(f, "invalid_currency"),
            RowErrorKind::Malformed => write!(f, "malformed"),
        }
    }
}

/// One skipped row, kept so the user can correct the source line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    /// 1-based line number in the decoded file (block number for OFX).
    pub row_number: usize,
    pub kind: RowErrorKind,
    pub message: String,
    pub raw_line: String,
}

impl RowError {
    pub fn new(row_number: usize, raw_line: &str, err: &ValueError) -> Self {
        let kind = match err {
            ValueError::InvalidAmount(_) => RowErrorKind::InvalidAmount,
            ValueError::InvalidDate(_) => RowErrorKind::InvalidDate,
            ValueError::MissingField(_) => RowErrorKind::MissingField,
            ValueError::InvalidCurrency(_) => RowErrorKind::InvalidCurrency,
            ValueError::InvalidFlag(_) | ValueError::ExtraFields { .. } => RowErrorKind::Malformed,
        };
        RowError {
            row_number,
            kind,
            message: err.to_string(),
            raw_line: raw_line.to_string(),
        }
    }
}

/// Informational notes attached to a successful import.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImportWarning {
    EncodingRecovered {
        from: String,
        to: String,
        confidence: f32,
    },
}
