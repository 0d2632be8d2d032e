use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::data::export::ExportFormat;
use crate::pipeline::{BatchOptions, FileOptions, DEFAULT_PREVIEW_ROWS};

// ---------------------------------------------------------------------------
// Partial per-file options
// ---------------------------------------------------------------------------

/// Options that are only set where given; unset fields fall through to the
/// layer below.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileOverrides {
    pub remove_duplicates: Option<bool>,
    pub fill_missing_numeric: Option<bool>,
    pub columns: Option<Vec<String>>,
    pub chart: Option<bool>,
}

impl FileOverrides {
    pub fn apply_to(&self, base: &FileOptions) -> FileOptions {
        FileOptions {
            remove_duplicates: self.remove_duplicates.unwrap_or(base.remove_duplicates),
            fill_missing_numeric: self
                .fill_missing_numeric
                .unwrap_or(base.fill_missing_numeric),
            columns: self.columns.clone().or_else(|| base.columns.clone()),
            chart: self.chart.unwrap_or(base.chart),
        }
    }
}

// ---------------------------------------------------------------------------
// Options file
// ---------------------------------------------------------------------------

/// JSON options file:
///
/// ```json
/// {
///   "format": "excel",
///   "preview_rows": 10,
///   "defaults": { "remove_duplicates": true },
///   "files": {
///     "sales.csv": { "fill_missing_numeric": true, "columns": ["region", "total"], "chart": true }
///   }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OptionsFile {
    pub format: Option<ExportFormat>,
    pub preview_rows: Option<usize>,
    pub defaults: FileOverrides,
    pub files: BTreeMap<String, FileOverrides>,
}

impl OptionsFile {
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading options file {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("parsing options file {}", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("invalid options JSON")
    }
}

/// Settings given directly on the command line. They beat the options
/// file's `format`, `preview_rows` and `defaults`, but per-file entries of
/// the options file still win over them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandLine {
    pub format: Option<ExportFormat>,
    pub preview_rows: Option<usize>,
    pub defaults: FileOverrides,
}

/// Layer built-in defaults, options file and command line into batch options.
pub fn resolve(file: &OptionsFile, cli: &CommandLine) -> BatchOptions {
    let defaults = cli
        .defaults
        .apply_to(&file.defaults.apply_to(&FileOptions::default()));
    let files = file
        .files
        .iter()
        .map(|(name, overrides)| (name.clone(), overrides.apply_to(&defaults)))
        .collect();
    BatchOptions {
        format: cli.format.or(file.format).unwrap_or_default(),
        defaults,
        files,
        preview_rows: cli
            .preview_rows
            .or(file.preview_rows)
            .unwrap_or(DEFAULT_PREVIEW_ROWS),
    }
}
