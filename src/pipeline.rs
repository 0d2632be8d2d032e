use std::collections::BTreeMap;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::data::chart::BarChart;
use crate::data::cleaner::{self, CleanReport, CleaningOptions};
use crate::data::export::{self, ExportFormat, ExportResult};
use crate::data::loader;
use crate::data::model::{Table, UploadedFile};
use crate::data::select::{self, ColumnSelection};
use crate::error::{Result, SweepError};

/// Rows shown in a preview unless configured otherwise.
pub const DEFAULT_PREVIEW_ROWS: usize = 5;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Choices made for one file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileOptions {
    pub remove_duplicates: bool,
    pub fill_missing_numeric: bool,
    /// Columns to keep, in output order. `None` keeps every column.
    pub columns: Option<Vec<String>>,
    /// Emit a bar chart of the first numeric columns.
    pub chart: bool,
}

impl FileOptions {
    pub fn cleaning(&self) -> CleaningOptions {
        CleaningOptions {
            remove_duplicates: self.remove_duplicates,
            fill_missing_numeric: self.fill_missing_numeric,
        }
    }

    /// The explicit selection, or every column of `table` in table order.
    pub fn selection(&self, table: &Table) -> ColumnSelection {
        match &self.columns {
            Some(names) => ColumnSelection::new(names.iter().cloned()),
            None => ColumnSelection::all(table),
        }
    }
}

/// Everything the host decides for one batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOptions {
    /// Output format shared by every file of the batch.
    pub format: ExportFormat,
    /// Options for files without an entry in `files`.
    pub defaults: FileOptions,
    /// Per-file options keyed by uploaded file name.
    pub files: BTreeMap<String, FileOptions>,
    pub preview_rows: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            format: ExportFormat::default(),
            defaults: FileOptions::default(),
            files: BTreeMap::new(),
            preview_rows: DEFAULT_PREVIEW_ROWS,
        }
    }
}

impl BatchOptions {
    pub fn for_file(&self, name: &str) -> &FileOptions {
        self.files.get(name).unwrap_or(&self.defaults)
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// Loaded fine but has no rows.
    Empty,
    Error(SweepError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedFile {
    pub file_name: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummary {
    /// One result per successfully converted file, in upload order.
    pub exported: Vec<ExportResult>,
    pub skipped: Vec<SkippedFile>,
}

// ---------------------------------------------------------------------------
// Reporter – how the host observes a batch
// ---------------------------------------------------------------------------

/// Signals emitted while a batch runs. Every method defaults to a no-op.
pub trait Reporter {
    /// Called before file `index` (0-based) is processed; `fraction` is `(index + 1) / total`.
    fn progress(&mut self, _index: usize, _total: usize, _fraction: f64) {}

    fn file_started(&mut self, _file: &UploadedFile) {}

    /// First rows of the freshly loaded table.
    fn preview(&mut self, _file_name: &str, _head: &Table) {}

    fn cleaned(&mut self, _file_name: &str, _report: &CleanReport) {}

    fn chart(&mut self, _file_name: &str, _chart: &BarChart) {}

    fn skipped(&mut self, _skipped: &SkippedFile) {}

    /// A converted file is ready to be offered for download.
    fn exported(&mut self, _result: &ExportResult) {}

    /// Every file of the batch has been attempted.
    fn completed(&mut self, _summary: &BatchSummary) {}
}

/// Reporter that ignores every signal.
pub struct Silent;

impl Reporter for Silent {}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Run every uploaded file through load → clean → select → export.
///
/// Files are processed one after another in upload order. A file that fails
/// to load, has no rows, names an unknown column or fails to export is
/// skipped; the batch always reaches the end.
pub fn run_batch(
    files: &[UploadedFile],
    options: &BatchOptions,
    reporter: &mut dyn Reporter,
) -> BatchSummary {
    let total = files.len();
    let mut summary = BatchSummary::default();

    for (index, file) in files.iter().enumerate() {
        reporter.progress(index, total, (index + 1) as f64 / total as f64);
        reporter.file_started(file);

        let reason = match process_file(file, options, reporter) {
            Ok(Some(result)) => {
                info!("Converted {} → {}", file.name, result.file_name);
                reporter.exported(&result);
                summary.exported.push(result);
                continue;
            }
            Ok(None) => {
                warn!("Skipping empty file: {}", file.name);
                SkipReason::Empty
            }
            Err(e) => {
                warn!("Skipping {}: {e}", file.name);
                SkipReason::Error(e)
            }
        };
        let skipped = SkippedFile {
            file_name: file.name.clone(),
            reason,
        };
        reporter.skipped(&skipped);
        summary.skipped.push(skipped);
    }

    info!(
        "Batch done: {} converted, {} skipped",
        summary.exported.len(),
        summary.skipped.len()
    );
    reporter.completed(&summary);
    summary
}

/// Process one file. `Ok(None)` means the file loaded but had no rows.
fn process_file(
    file: &UploadedFile,
    options: &BatchOptions,
    reporter: &mut dyn Reporter,
) -> Result<Option<ExportResult>> {
    let table = loader::load(file)?;
    if table.is_empty() {
        return Ok(None);
    }
    reporter.preview(&file.name, &table.head(options.preview_rows));

    let file_options = options.for_file(&file.name);
    let (table, report) = cleaner::clean(table, file_options.cleaning());
    reporter.cleaned(&file.name, &report);

    let selection = file_options.selection(&table);
    let table = select::select_columns(table, &selection)?;

    if file_options.chart {
        reporter.chart(&file.name, &BarChart::from_table(&table));
    }

    export::export(&table, options.format, &file.name).map(Some)
}
