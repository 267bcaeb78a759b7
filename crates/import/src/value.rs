//! Locale-aware amount and date parsing shared by every parser.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::error::ValueError;

/// Which separator a dialect uses for decimals. Only consulted when a value
/// is ambiguous, i.e. a single separator followed by exactly three digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecimalMark {
    Comma,
    Dot,
    Auto,
}

/// Date formats accepted in delimited exports, tried in order.
pub const CSV_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", "%d.%m.%Y", "%d-%m-%Y", "%Y/%m/%d", "%Y%m%d", "%d/%m/%Y",
];

const CURRENCY_SYMBOLS: &[char] = &['$', '€', '£', '¤'];

/// Parses a signed decimal amount.
///
/// Accepts unit text around the number (`kr`, `SEK`, `€`), space and
/// non-breaking-space thousands groups, decimal comma or dot, accounting
/// parentheses, Unicode minus and trailing minus. Anything else left over
/// after that is an error rather than silently dropped.
pub fn parse_amount(raw: &str, mark: DecimalMark) -> Result<Decimal, ValueError> {
    let invalid = || ValueError::InvalidAmount(raw.trim().to_string());

    let s = raw.trim().replace('\u{2212}', "-");
    let s = s
        .trim_start_matches(|c: char| c.is_alphabetic() || CURRENCY_SYMBOLS.contains(&c))
        .trim_end_matches(|c: char| {
            c.is_alphabetic() || CURRENCY_SYMBOLS.contains(&c) || c.is_whitespace() || c == ':'
        })
        .trim();

    let (mut negative, s) = if s.starts_with('(') && s.ends_with(')') && s.len() >= 2 {
        (true, &s[1..s.len() - 1])
    } else {
        (false, s)
    };

    let s: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    let s = if let Some(rest) = s.strip_suffix('-') {
        negative = !negative;
        rest.to_string()
    } else {
        s
    };
    let s = s.strip_prefix('+').unwrap_or(&s);

    let decimal_sep = decimal_separator(s, mark).ok_or_else(invalid)?;
    let mut canonical = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            ',' | '.' if Some(c) == decimal_sep => canonical.push('.'),
            ',' | '.' => {}
            '-' if canonical.is_empty() => canonical.push('-'),
            '0'..='9' => canonical.push(c),
            _ => return Err(invalid()),
        }
    }

    if !canonical.chars().any(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }

    let mut value = Decimal::from_str(&canonical).map_err(|_| invalid())?;
    if negative {
        value = -value;
    }
    Ok(value)
}

/// Decides which separator (if any) is the decimal point. `None` in the outer
/// Option means the grouping is inconsistent and the amount must be rejected.
fn decimal_separator(s: &str, mark: DecimalMark) -> Option<Option<char>> {
    let commas = s.matches(',').count();
    let dots = s.matches('.').count();
    let three_after = |sep: char| {
        s.rfind(sep)
            .map(|i| s[i + 1..].len() == 3 && s[i + 1..].chars().all(|c| c.is_ascii_digit()))
            .unwrap_or(false)
    };

    match (commas, dots) {
        (0, 0) => Some(None),
        (c, d) if c > 0 && d > 0 => {
            let last = if s.rfind(',') > s.rfind('.') { ',' } else { '.' };
            let count = if last == ',' { c } else { d };
            (count == 1).then_some(Some(last))
        }
        (1, 0) => match mark {
            DecimalMark::Dot if three_after(',') => Some(None),
            _ => Some(Some(',')),
        },
        (0, 1) => match mark {
            DecimalMark::Comma if three_after('.') => Some(None),
            _ => Some(Some('.')),
        },
        // Repeated separators of one kind can only be thousands groups.
        (_, 0) if three_after(',') => Some(None),
        (0, _) if three_after('.') => Some(None),
        _ => None,
    }
}

/// Parses a calendar date against `formats`, first match wins. A trailing
/// time-of-day component is ignored.
pub fn parse_date(raw: &str, formats: &[&str]) -> Result<NaiveDate, ValueError> {
    let s = raw.trim();
    let date_part = s
        .split_whitespace()
        .next()
        .and_then(|p| p.split('T').next())
        .unwrap_or("");

    formats
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
        .ok_or_else(|| ValueError::InvalidDate(s.to_string()))
}
