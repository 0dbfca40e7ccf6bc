use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, ToolError};

/// Extensions treated as spreadsheets when none are configured.
pub const DEFAULT_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls", "xlsb", "ods"];

/// How header cells are canonicalised before columns are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HeaderPolicy {
    /// Remove every whitespace character, so `"first name "` becomes `"firstname"`.
    #[default]
    StripAll,
    /// Only trim leading and trailing whitespace.
    Trim,
}

impl HeaderPolicy {
    pub fn normalize(self, header: &str) -> String {
        match self {
            HeaderPolicy::StripAll => header.chars().filter(|ch| !ch.is_whitespace()).collect(),
            HeaderPolicy::Trim => header.trim().to_string(),
        }
    }
}

/// What a folder merge does with a table that lacks a key column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SchemaMismatchPolicy {
    /// Fail the whole merge with [`ToolError::SchemaMismatch`].
    #[default]
    Abort,
    /// Log the file, leave it out of the merge and continue.
    Skip,
}

/// Settings shared by discovery, loading and merging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeOptions {
    /// Lower-case file extensions (without the dot) considered spreadsheets.
    pub extensions: Vec<String>,
    pub header_policy: HeaderPolicy,
    pub on_schema_mismatch: SchemaMismatchPolicy,
    /// Files never picked up by discovery, typically the merge output itself.
    pub exclude: Vec<PathBuf>,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|ext| ext.to_string()).collect(),
            header_policy: HeaderPolicy::default(),
            on_schema_mismatch: SchemaMismatchPolicy::default(),
            exclude: Vec::new(),
        }
    }
}

impl MergeOptions {
    /// Loads options from a JSON document. Absent fields keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ToolError::MissingInput(path.to_path_buf()));
        }
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Case-insensitive extension check against the configured set.
    pub fn accepts_extension(&self, path: &Path) -> bool {
        let Some(extension) = path.extension().and_then(|ext| ext.to_str()) else {
            return false;
        };
        self.extensions
            .iter()
            .any(|candidate| candidate.trim_start_matches('.').eq_ignore_ascii_case(extension))
    }
}

/// Splits a comma-separated key list such as `"class, name"`.
pub fn parse_key_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::to_string)
        .collect()
}

/// Normalises user-selected key columns with the header policy so they compare
/// equal to loaded headers. Rejects empty and duplicate key sets.
pub fn normalize_key_columns(keys: &[String], policy: HeaderPolicy) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    let mut normalized = Vec::with_capacity(keys.len());

    for key in keys {
        let name = policy.normalize(key);
        if name.is_empty() {
            continue;
        }
        if !seen.insert(name.clone()) {
            return Err(ToolError::InvalidKeys(format!(
                "column '{name}' selected more than once"
            )));
        }
        normalized.push(name);
    }

    if normalized.is_empty() {
        return Err(ToolError::InvalidKeys(
            "at least one key column is required".into(),
        ));
    }

    Ok(normalized)
}
