// Chinese Commercial Code lookup table
// Keys are 4-digit zero-padded codes, values are single ideographs

use crate::utils::ScanError;
use lazy_static::lazy_static;
use std::collections::HashMap;
use std::path::Path;

const EMBEDDED_TABLE: &str = include_str!("../../data/ctc2hanzi.json");

lazy_static! {
    static ref DEFAULT_TABLE: CodeTable = match CodeTable::from_json_str(EMBEDDED_TABLE) {
        Ok(table) => table,
        Err(e) => {
            log::error!("Embedded code table is invalid: {}", e);
            CodeTable::default()
        }
    };
}

#[derive(Debug, Clone, Default)]
pub struct CodeTable {
    entries: HashMap<String, String>,
}

impl CodeTable {
    /// The table bundled with the crate, parsed on first use.
    pub fn embedded() -> &'static CodeTable {
        &DEFAULT_TABLE
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ScanError> {
        let raw = std::fs::read_to_string(&path).map_err(|e| {
            ScanError::CodeTableError(format!(
                "Failed to read {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        let table = Self::from_json_str(&raw)?;
        log::info!(
            "Loaded {} codes from {}",
            table.len(),
            path.as_ref().display()
        );
        Ok(table)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ScanError> {
        let entries: HashMap<String, String> = serde_json::from_str(raw)
            .map_err(|e| ScanError::CodeTableError(format!("Malformed code table: {}", e)))?;

        for (code, text) in &entries {
            if code.len() != 4 || !code.chars().all(|c| c.is_ascii_digit()) {
                return Err(ScanError::CodeTableError(format!(
                    "Key {:?} is not a 4-digit code",
                    code
                )));
            }
            if text.chars().count() != 1 {
                return Err(ScanError::CodeTableError(format!(
                    "Code {} maps to {:?}, expected a single character",
                    code, text
                )));
            }
        }

        Ok(CodeTable { entries })
    }

    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        CodeTable {
            entries: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
