use crate::encoding::fold_for_matching;
use crate::error::StructuralError;

/// Delimiter candidates in tie-break order.
pub const DELIMITER_CANDIDATES: [u8; 4] = [b';', b'\t', b',', b'|'];

/// Where the real header sits and how its fields are separated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedHeader {
    /// 0-based index of the header line in the decoded text.
    pub line_index: usize,
    pub delimiter: u8,
    pub cells: Vec<String>,
}

/// Finds the first of the leading `scan_lines` lines whose folded text
/// satisfies `is_header`, tolerating preamble lines before it.
pub fn locate_header<F>(
    text: &str,
    scan_lines: usize,
    is_header: F,
) -> Result<LocatedHeader, StructuralError>
where
    F: Fn(&str) -> bool,
{
    let mut scanned = 0;
    for (line_index, line) in text.lines().take(scan_lines).enumerate() {
        scanned += 1;
        if !is_header(&fold_for_matching(line)) {
            continue;
        }
        let delimiter = detect_delimiter(line).ok_or(StructuralError::NoDelimiter)?;
        let cells = split_fields(line, delimiter);
        tracing::debug!(
            line = line_index + 1,
            delimiter = %(delimiter as char).escape_debug(),
            columns = cells.len(),
            "located header"
        );
        return Ok(LocatedHeader {
            line_index,
            delimiter,
            cells,
        });
    }
    Err(StructuralError::HeaderNotFound { scanned })
}

/// Most frequent candidate outside quoted spans; ties go to the earlier
/// candidate. `None` when the line has no candidate at all.
pub fn detect_delimiter(line: &str) -> Option<u8> {
    let mut counts = [0usize; DELIMITER_CANDIDATES.len()];
    let mut in_quotes = false;
    for b in line.bytes() {
        if b == b'"' {
            // A doubled quote toggles twice and leaves the state unchanged.
            in_quotes = !in_quotes;
            continue;
        }
        if in_quotes {
            continue;
        }
        if let Some(pos) = DELIMITER_CANDIDATES.iter().position(|&c| c == b) {
            counts[pos] += 1;
        }
    }

    let mut best: Option<(u8, usize)> = None;
    for (candidate, count) in DELIMITER_CANDIDATES.iter().zip(counts) {
        if count > best.map_or(0, |(_, c)| c) {
            best = Some((*candidate, count));
        }
    }
    best.map(|(d, _)| d)
}

/// Quote-aware split of one line. Delimiters inside double quotes are
/// literal and `""` inside a quoted field is an escaped quote.
pub fn split_fields(line: &str, delimiter: u8) -> Vec<String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .flexible(true)
        .double_quote(true)
        .from_reader(line.as_bytes());

    let mut record = csv::StringRecord::new();
    match reader.read_record(&mut record) {
        Ok(true) => record.iter().map(|f| f.trim().to_string()).collect(),
        _ => Vec::new(),
    }
}

/// Rows made only of rule characters, e.g. a markdown `|---|---|` line.
pub fn is_rule_row(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty()
        && trimmed.contains(['-', '='])
        && trimmed
            .chars()
            .all(|c| matches!(c, '-' | '=' | ':' | '+' | '|' | ';' | ',' | '\t' | ' '))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn semicolon_wins() {
        assert_eq!(detect_delimiter("Datum;Belopp;Beskrivning"), Some(b';'));
    }

    #[test]
    fn delimiters_inside_quotes_ignored() {
        assert_eq!(
            detect_delimiter(r#""Client account","Row type","a;b;c;d""#),
            Some(b',')
        );
    }

    #[test]
    fn tie_break_order() {
        assert_eq!(detect_delimiter("a;b,c"), Some(b';'));
        assert_eq!(detect_delimiter("a\tb,c"), Some(b'\t'));
        assert_eq!(detect_delimiter("a|b,c"), Some(b','));
    }

    #[test]
    fn no_delimiter() {
        assert_eq!(detect_delimiter("justoneword"), None);
    }

    #[test]
    fn split_handles_quotes_and_escapes() {
        let fields = split_fields(r#"2024-01-15;"Köp; Coop";"He said ""hi""";-10,00"#, b';');
        assert_eq!(fields, vec!["2024-01-15", "Köp; Coop", r#"He said "hi""#, "-10,00"]);
    }

    #[test]
    fn split_empty_line() {
        assert!(split_fields("", b';').is_empty());
    }

    #[test]
    fn header_after_preamble() {
        let text = "* Transaktioner Period 2024-01-01 – 2024-01-31\nRadnummer,Bokföringsdag,Belopp\n1,2024-01-02,-5\n";
        let h = locate_header(text, 5, |l| l.contains("radnummer")).unwrap();
        assert_eq!(h.line_index, 1);
        assert_eq!(h.delimiter, b',');
        assert_eq!(h.cells, vec!["Radnummer", "Bokföringsdag", "Belopp"]);
    }

    #[test]
    fn header_outside_window_fails() {
        let text = "a\nb\nc\nd\ne\nDatum;Belopp\n";
        let err = locate_header(text, 5, |l| l.contains("datum")).unwrap_err();
        assert_eq!(err, StructuralError::HeaderNotFound { scanned: 5 });
    }

    #[test]
    fn rule_rows() {
        assert!(is_rule_row("|---|---|---|"));
        assert!(is_rule_row(" ----;----;---- "));
        assert!(!is_rule_row("2024-01-15;-10"));
        assert!(!is_rule_row(";;;"));
    }
}
