// Scanner configuration, loaded from a JSON file or taken from defaults

use crate::utils::ScanError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const NEW_CARD_LABEL: &str = "Hong Kong New Smart Identity Card";
pub const OLD_CARD_LABEL: &str = "Hong Kong Smart Identity Card";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Classifications at or below this confidence are reported as unknown.
    pub confidence_threshold_percent: f64,
    pub new_card_label: String,
    pub old_card_label: String,
    /// JSON code table to use instead of the embedded one.
    pub code_table_path: Option<PathBuf>,
    pub redact_small_number_field: bool,
    pub pass_timeout_ms: Option<u64>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig {
            confidence_threshold_percent: 60.0,
            new_card_label: NEW_CARD_LABEL.to_string(),
            old_card_label: OLD_CARD_LABEL.to_string(),
            code_table_path: None,
            redact_small_number_field: true,
            pass_timeout_ms: None,
        }
    }
}

impl ScanConfig {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ScanError> {
        let raw = std::fs::read_to_string(&path).map_err(|e| {
            ScanError::ConfigError(format!(
                "Failed to read {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ScanError> {
        let config: ScanConfig = serde_json::from_str(raw)?;
        config.check()?;
        Ok(config)
    }

    pub fn pass_timeout(&self) -> Option<Duration> {
        self.pass_timeout_ms.map(Duration::from_millis)
    }

    fn check(&self) -> Result<(), ScanError> {
        if !(0.0..=100.0).contains(&self.confidence_threshold_percent) {
            return Err(ScanError::ConfigError(format!(
                "confidence_threshold_percent must be within 0..=100, got {}",
                self.confidence_threshold_percent
            )));
        }
        if self.new_card_label == self.old_card_label {
            return Err(ScanError::ConfigError(
                "new_card_label and old_card_label must differ".to_string(),
            ));
        }
        Ok(())
    }
}
