pub mod cancel;
pub mod columns;
pub mod config;
mod delimited;
pub mod encoding;
pub mod error;
pub mod header;
pub mod ofx;
pub mod outcome;
pub mod parsers;
pub mod registry;
pub mod sgml;
pub(crate) mod util;
pub mod value;

pub use cancel::CancelToken;
pub use columns::Field;
pub use config::ImportConfig;
pub use delimited::Record;
pub use error::{ImportError, ImportWarning, RowError, RowErrorKind, StructuralError, ValueError};
pub use outcome::{DuplicateCheck, ImportOutcome, ImportSummary, NoDuplicates};
pub use parsers::{ParseContext, ParsedFile, ParserKind};
pub use registry::{sniff, sniff_within, REGISTRY};

use std::io::Read;

/// Runs the whole pipeline over one buffered file: decode, detect the
/// format, parse every row, then drop duplicates and total up.
pub fn import_bytes(
    data: &[u8],
    config: &ImportConfig,
    duplicates: &dyn DuplicateCheck,
    cancel: &CancelToken,
) -> Result<ImportOutcome, ImportError> {
    let ctx = ParseContext::new(config, cancel)?;
    cancel.check()?;

    let decoded = encoding::decode(data);
    let mut warnings = Vec::new();
    if let Some(from) = decoded.fallback_from {
        tracing::warn!(
            from,
            to = decoded.encoding,
            confidence = decoded.confidence,
            "input was not clean UTF-8, decoded with fallback encoding"
        );
        warnings.push(ImportWarning::EncodingRecovered {
            from: from.to_string(),
            to: decoded.encoding.to_string(),
            confidence: decoded.confidence,
        });
    }
    cancel.check()?;

    let format = sniff_within(&decoded.text, config.header_scan_lines)?;
    let parsed = format.parse(&decoded.text, &ctx)?;
    cancel.check()?;

    outcome::aggregate(
        format,
        parsed,
        duplicates,
        config.bank_source_id,
        warnings,
        cancel,
    )
}

/// Reads `reader` to the end, then behaves like [`import_bytes`].
pub fn import_reader<R: Read>(
    mut reader: R,
    config: &ImportConfig,
    duplicates: &dyn DuplicateCheck,
    cancel: &CancelToken,
) -> Result<ImportOutcome, ImportError> {
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;
    import_bytes(&data, config, duplicates, cancel)
}
