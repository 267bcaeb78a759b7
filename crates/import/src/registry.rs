use crate::error::ImportError;
use crate::parsers::{ParserKind, DEFAULT_SCAN_LINES};

/// Detection order. Narrow vocabularies come before broad ones: an Avanza
/// transaction header also satisfies the ICA-banken keywords.
pub const REGISTRY: &[ParserKind] = &[
    ParserKind::Ofx,
    ParserKind::SwedbankCsn,
    ParserKind::SwedbankLegacy,
    ParserKind::AvanzaHoldings,
    ParserKind::AvanzaTransactions,
    ParserKind::IcaBanken,
];

pub fn sniff(content: &str) -> Result<ParserKind, ImportError> {
    sniff_within(content, DEFAULT_SCAN_LINES)
}

/// First registered parser whose detector accepts `content`.
pub fn sniff_within(content: &str, scan_lines: usize) -> Result<ParserKind, ImportError> {
    let kind = REGISTRY
        .iter()
        .copied()
        .find(|kind| kind.detect_within(content, scan_lines))
        .ok_or(ImportError::UnrecognizedFormat)?;
    tracing::debug!(format = %kind, "detected format");
    Ok(kind)
}
