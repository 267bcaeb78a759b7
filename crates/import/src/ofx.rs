//! OFX statements, SGML (1.x) or XML (2.x).

use chrono::{NaiveDate, NaiveDateTime};
use kassa_core::{Currency, Money, NormalizedTransaction};
use rust_decimal::Decimal;

use crate::cancel::CancelToken;
use crate::columns::Field;
use crate::error::{ImportError, RowError, StructuralError, ValueError};
use crate::parsers::{ParseContext, ParsedFile, ParsedRow};
use crate::sgml::{self, decode_entities, Tree};
use crate::util::{contains_ignore_ascii_case, re};
use crate::value::{parse_amount, parse_date, DecimalMark, CSV_DATE_FORMATS};

pub const SOURCE_BANK: &str = "OFX";

re!(re_block_open, r"(?i)<(?:CC)?STMTTRN>");
re!(re_block_end, r"(?i)</?(?:CC)?STMTTRN>|</BANKTRANLIST>");
re!(
    re_leaf_value,
    r"(?i)<(TRNTYPE|DTPOSTED|TRNAMT|NAME|MEMO|FITID|CURDEF|ACCTID|ORG)>\s*([^<\r\n]*)"
);

const OFX_DATETIME_FORMATS: &[&str] = &["%Y%m%d%H%M%S%.f", "%Y%m%d%H%M%S", "%Y%m%d%H%M"];

/// Which extraction path produced a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extraction {
    Tree,
    Fallback,
}

/// One `STMTTRN`/`CCSTMTTRN` block, values as written in the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OfxTransaction {
    /// The block's source text, opening tag through its closer if it has one.
    pub raw: String,
    pub trn_type: Option<String>,
    pub date_posted: Option<String>,
    pub amount: Option<String>,
    pub name: Option<String>,
    pub memo: Option<String>,
    pub fit_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfxStatement {
    pub account_id: Option<String>,
    pub currency: Option<String>,
    pub org: Option<String>,
    pub transactions: Vec<OfxTransaction>,
    pub extraction: Extraction,
}

pub fn looks_like_ofx(content: &str) -> bool {
    ["OFXHEADER:", "<OFX>", "<?OFX"]
        .iter()
        .any(|marker| contains_ignore_ascii_case(content, marker))
}

/// Repairs the markup and reads it as a tree; when that still fails, pulls
/// the blocks out with per-tag patterns instead.
pub fn read_statement(content: &str, cancel: &CancelToken) -> Result<OfxStatement, ImportError> {
    let repaired = sgml::repair(content);
    cancel.check()?;
    match Tree::parse(&repaired) {
        Ok(tree) => {
            tracing::debug!("OFX parsed as tree");
            from_tree(&tree, content, cancel)
        }
        Err(e) => {
            tracing::warn!(error = %e, "OFX tree parse failed, using pattern extraction");
            from_patterns(content, cancel)
        }
    }
}

fn from_tree(tree: &Tree, content: &str, cancel: &CancelToken) -> Result<OfxStatement, ImportError> {
    let owned = |s: Option<&str>| s.map(str::to_string);
    let ids = tree.find_all(&["STMTTRN", "CCSTMTTRN"]);
    let spans = block_spans(content);
    let aligned = spans.len() == ids.len();
    if !aligned {
        tracing::warn!(
            tree = ids.len(),
            source = spans.len(),
            "OFX block count differs from source, raw text unavailable"
        );
    }

    let mut transactions = Vec::new();
    for (idx, id) in ids.into_iter().enumerate() {
        cancel.check()?;
        let raw = match spans.get(idx) {
            Some(span) if aligned => span.raw.to_string(),
            _ => String::new(),
        };
        transactions.push(OfxTransaction {
            raw,
            trn_type: owned(tree.child_text(id, "TRNTYPE")),
            date_posted: owned(tree.child_text(id, "DTPOSTED")),
            amount: owned(tree.child_text(id, "TRNAMT")),
            name: owned(tree.child_text(id, "NAME")),
            memo: owned(tree.child_text(id, "MEMO")),
            fit_id: owned(tree.child_text(id, "FITID")),
        });
    }
    Ok(OfxStatement {
        account_id: owned(tree.first_text("ACCTID")),
        currency: owned(tree.first_text("CURDEF")),
        org: owned(tree.first_text("ORG")),
        transactions,
        extraction: Extraction::Tree,
    })
}

/// One transaction block located in the source text.
struct BlockSpan<'a> {
    /// Opening tag through the closing tag, when the block has one.
    raw: &'a str,
    /// Between the opening tag and wherever the block ends.
    body: &'a str,
}

/// A block runs from its opening tag to its closing tag, the next block's
/// opening tag, or the end of the transaction list, whichever comes first.
fn block_spans(content: &str) -> Vec<BlockSpan<'_>> {
    re_block_open()
        .find_iter(content)
        .map(|open| {
            let rest = &content[open.end()..];
            let (body_end, raw_end) = match re_block_end().find(rest) {
                Some(end) if is_block_closer(end.as_str()) => (end.start(), end.end()),
                Some(end) => (end.start(), end.start()),
                None => (rest.len(), rest.len()),
            };
            BlockSpan {
                raw: content[open.start()..open.end() + raw_end].trim_end(),
                body: &rest[..body_end],
            }
        })
        .collect()
}

fn is_block_closer(tag: &str) -> bool {
    tag.starts_with("</") && !tag.eq_ignore_ascii_case("</BANKTRANLIST>")
}

fn from_patterns(content: &str, cancel: &CancelToken) -> Result<OfxStatement, ImportError> {
    let mut transactions = Vec::new();
    for span in block_spans(content) {
        cancel.check()?;
        let mut trn = OfxTransaction {
            raw: span.raw.to_string(),
            ..OfxTransaction::default()
        };
        for (tag, value) in leaf_values(span.body) {
            let slot = match tag.as_str() {
                "TRNTYPE" => &mut trn.trn_type,
                "DTPOSTED" => &mut trn.date_posted,
                "TRNAMT" => &mut trn.amount,
                "NAME" => &mut trn.name,
                "MEMO" => &mut trn.memo,
                "FITID" => &mut trn.fit_id,
                _ => continue,
            };
            slot.get_or_insert(value);
        }
        transactions.push(trn);
    }

    let header_value = |wanted: &str| {
        leaf_values(content)
            .find(|(tag, _)| tag == wanted)
            .map(|(_, value)| value)
    };
    Ok(OfxStatement {
        account_id: header_value("ACCTID"),
        currency: header_value("CURDEF"),
        org: header_value("ORG"),
        transactions,
        extraction: Extraction::Fallback,
    })
}

/// Non-empty `(TAG, value)` pairs in document order.
fn leaf_values(s: &str) -> impl Iterator<Item = (String, String)> + '_ {
    re_leaf_value().captures_iter(s).filter_map(|caps| {
        let tag = caps.get(1)?.as_str().to_ascii_uppercase();
        let value = decode_entities(caps.get(2)?.as_str().trim());
        (!value.is_empty()).then_some((tag, value))
    })
}

/// `YYYYMMDD[HHMMSS[.fff]][tz]`; a bracketed zone like `[-5:EST]` is ignored.
pub fn parse_ofx_date(raw: &str) -> Result<NaiveDate, ValueError> {
    let trimmed = raw.trim();
    let s = trimmed.split('[').next().unwrap_or(trimmed).trim();

    if let Some(dt) = OFX_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
    {
        return Ok(dt.date());
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y%m%d") {
        return Ok(date);
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Ok(dt.date_naive());
    }
    if let Ok(date) = parse_date(s, CSV_DATE_FORMATS) {
        return Ok(date);
    }
    s.get(..8)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y%m%d").ok())
        .ok_or_else(|| ValueError::InvalidDate(trimmed.to_string()))
}

/// Explicit transaction type codes win over the amount's sign.
pub fn is_income(trn_type: Option<&str>, amount: Decimal) -> bool {
    match trn_type.map(|t| t.trim().to_ascii_uppercase()).as_deref() {
        Some("CREDIT" | "DEP" | "INT" | "DIV") => true,
        Some("DEBIT" | "PAYMENT" | "FEE" | "SRVCHG") => false,
        _ => amount > Decimal::ZERO,
    }
}

impl OfxTransaction {
    pub fn to_normalized(&self, currency: &Currency) -> Result<NormalizedTransaction, ValueError> {
        let date = parse_ofx_date(self.date_posted.as_deref().ok_or(ValueError::MissingField(Field::Date))?)?;
        let raw_amount = self.amount.as_deref().ok_or(ValueError::MissingField(Field::Amount))?;
        let amount = parse_amount(raw_amount, DecimalMark::Dot)?;
        let description = self.name.as_deref().or(self.memo.as_deref()).unwrap_or("");

        Ok(NormalizedTransaction::new(
            date,
            Money::magnitude_of(amount),
            is_income(self.trn_type.as_deref(), amount),
            description,
            currency.clone(),
            SOURCE_BANK,
        )
        .with_reference(self.fit_id.clone()))
    }
}

/// Runs one OFX file through extraction and normalization. Row numbers are
/// 1-based block positions.
pub fn parse(text: &str, ctx: &ParseContext<'_>) -> Result<ParsedFile, ImportError> {
    let statement = read_statement(text, ctx.cancel)?;
    let currency = match statement.currency.as_deref() {
        Some(code) => Currency::parse(code).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "ignoring CURDEF");
            ctx.settlement.clone()
        }),
        None => ctx.settlement.clone(),
    };
    tracing::debug!(
        extraction = ?statement.extraction,
        blocks = statement.transactions.len(),
        currency = %currency,
        account = statement.account_id.as_deref().unwrap_or("-"),
        org = statement.org.as_deref().unwrap_or("-"),
        "read OFX statement"
    );

    if let Some(limit) = ctx.config.max_rows {
        if statement.transactions.len() > limit {
            return Err(StructuralError::TooManyRows { limit }.into());
        }
    }

    let mut parsed = ParsedFile::default();
    for (idx, trn) in statement.transactions.iter().enumerate() {
        ctx.cancel.check()?;
        let row_number = idx + 1;
        parsed.total_rows += 1;
        match trn.to_normalized(&currency) {
            Ok(transaction) => parsed.rows.push(ParsedRow {
                row_number,
                raw_line: trn.raw.clone(),
                transaction,
            }),
            Err(e) => parsed.errors.push(RowError::new(row_number, &trn.raw, &e)),
        }
    }
    Ok(parsed)
}
