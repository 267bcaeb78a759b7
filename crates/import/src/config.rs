use kassa_core::Currency;
use serde::{Deserialize, Serialize};

use crate::error::ImportError;

/// Knobs for one import call. Every field has a default, so an empty TOML
/// document is a valid configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Currency assumed when a file carries none, and the only currency kept
    /// by dialects that filter on a currency column.
    pub settlement_currency: String,
    /// How many leading lines may precede the header row.
    pub header_scan_lines: usize,
    /// Passed unchanged to the duplicate check.
    pub bank_source_id: Option<i64>,
    /// Refuse files with more data rows than this.
    pub max_rows: Option<usize>,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            settlement_currency: "SEK".to_string(),
            header_scan_lines: 5,
            bank_source_id: None,
            max_rows: None,
        }
    }
}

impl ImportConfig {
    pub fn from_toml(toml_content: &str) -> Result<Self, ImportError> {
        let config: ImportConfig = toml::from_str(toml_content)
            .map_err(|e| ImportError::Config(format!("Failed to parse TOML: {e}")))?;
        config.settlement_currency()?;
        if config.header_scan_lines == 0 {
            return Err(ImportError::Config("header_scan_lines must be at least 1".into()));
        }
        Ok(config)
    }

    pub fn settlement_currency(&self) -> Result<Currency, ImportError> {
        Currency::parse(&self.settlement_currency)
            .map_err(|e| ImportError::Config(e.to_string()))
    }
}
