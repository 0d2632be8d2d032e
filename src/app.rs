use std::fmt::Write as _;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};

use crate::data::chart::BarChart;
use crate::data::cleaner::CleanReport;
use crate::data::export::ExportResult;
use crate::data::model::{Table, UploadedFile};
use crate::error::SweepError;
use crate::pipeline::{BatchSummary, Reporter, SkipReason, SkippedFile};

const PROGRESS_TEMPLATE: &str = "{bar:30} {pos}/{len} {msg}";
const CHART_WIDTH: usize = 40;
const CHART_MAX_ROWS: usize = 20;

// ---------------------------------------------------------------------------
// Terminal front end
// ---------------------------------------------------------------------------

/// Terminal host for a batch: prints progress, previews and charts to `out`
/// and "downloads" every exported buffer into `output_dir`.
pub struct ConsoleApp<W: Write> {
    out: W,
    output_dir: PathBuf,
    progress: Option<ProgressBar>,
    written: Vec<PathBuf>,
    converted: usize,
    save_error: Option<anyhow::Error>,
    io_error: Option<io::Error>,
}

impl<W: Write> ConsoleApp<W> {
    /// Create the front end, creating `output_dir` if needed.
    pub fn new(out: W, output_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(output_dir)
            .with_context(|| format!("creating output directory {}", output_dir.display()))?;
        Ok(Self {
            out,
            output_dir: output_dir.to_path_buf(),
            progress: None,
            written: Vec::new(),
            converted: 0,
            save_error: None,
            io_error: None,
        })
    }

    /// Files written so far, or the first terminal or save error that occurred.
    pub fn finish(self) -> Result<Vec<PathBuf>> {
        if let Some(e) = self.io_error {
            return Err(e).context("writing to the terminal");
        }
        match self.save_error {
            Some(e) => Err(e),
            None => Ok(self.written),
        }
    }

    fn emit(&mut self, text: &str) {
        if self.io_error.is_some() {
            return;
        }
        if let Err(e) = self.out.write_all(text.as_bytes()) {
            self.io_error = Some(e);
        }
    }

    fn save(&mut self, result: &ExportResult) -> io::Result<PathBuf> {
        let path = self.output_dir.join(&result.file_name);
        if self.written.contains(&path) {
            warn!("{} is written twice in this batch; keeping the latest", path.display());
        }
        if let Err(e) = std::fs::write(&path, &result.buffer) {
            // Drop whatever part of the file made it to disk.
            match std::fs::remove_file(&path) {
                Ok(()) => self.written.retain(|p| p != &path),
                Err(remove) if remove.kind() == io::ErrorKind::NotFound => {}
                Err(remove) => warn!("Could not remove {}: {remove}", path.display()),
            }
            return Err(e);
        }
        Ok(path)
    }

    fn progress_bar(&mut self, total: usize) -> &ProgressBar {
        self.progress.get_or_insert_with(|| {
            let style = ProgressStyle::with_template(PROGRESS_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar());
            let bar = ProgressBar::new(total as u64);
            bar.set_style(style);
            bar
        })
    }
}

impl<W: Write> Reporter for ConsoleApp<W> {
    fn progress(&mut self, index: usize, total: usize, _fraction: f64) {
        self.progress_bar(total).set_position((index + 1) as u64);
    }

    fn file_started(&mut self, file: &UploadedFile) {
        if let Some(bar) = &self.progress {
            bar.set_message(file.name.clone());
        }
        let text = format!(
            "\n== Processing: {}\nSize: {:.2} KB\n",
            file.name,
            file.size_kb()
        );
        self.emit(&text);
    }

    fn preview(&mut self, _file_name: &str, head: &Table) {
        let text = render_table(head);
        self.emit(&text);
    }

    fn cleaned(&mut self, _file_name: &str, report: &CleanReport) {
        let mut text = String::new();
        if report.duplicates_removed > 0 {
            let _ = writeln!(text, "Removed {} duplicates", report.duplicates_removed);
        }
        for (column, count, mean) in &report.filled {
            let _ = writeln!(text, "Filled {count} missing values in '{column}' with {mean}");
        }
        self.emit(&text);
    }

    fn chart(&mut self, file_name: &str, chart: &BarChart) {
        let text = if chart.is_empty() {
            format!("No numeric columns to chart in {file_name}\n")
        } else {
            render_chart(chart)
        };
        self.emit(&text);
    }

    fn skipped(&mut self, skipped: &SkippedFile) {
        let text = match &skipped.reason {
            SkipReason::Empty => format!("Skipping empty/invalid file: {}\n", skipped.file_name),
            SkipReason::Error(e @ SweepError::ExportFailure(_)) => {
                format!("Skipping {}: {e}\n", skipped.file_name)
            }
            SkipReason::Error(e) => format!(
                "Skipping empty/invalid file: {} ({e})\n",
                skipped.file_name
            ),
        };
        self.emit(&text);
    }

    fn exported(&mut self, result: &ExportResult) {
        match self.save(result) {
            Ok(path) => {
                info!("Saved {} ({})", path.display(), result.media_type);
                let text = format!("Saved {}\n", path.display());
                self.emit(&text);
                self.written.push(path);
                self.converted += 1;
            }
            Err(e) => {
                error!("Failed to save {}: {e}", result.file_name);
                let text = format!("Could not save {}: {e}\n", result.file_name);
                self.emit(&text);
                if self.save_error.is_none() {
                    let context = format!("saving {}", result.file_name);
                    self.save_error = Some(anyhow::Error::new(e).context(context));
                }
            }
        }
    }

    fn completed(&mut self, summary: &BatchSummary) {
        if let Some(bar) = &self.progress {
            bar.finish_and_clear();
        }
        // Exports that could not be saved count as skipped.
        let unsaved = summary.exported.len().saturating_sub(self.converted);
        let text = format!(
            "\nAll files processed: {} converted, {} skipped\n",
            self.converted,
            summary.skipped.len() + unsaved
        );
        self.emit(&text);
    }
}

// ---------------------------------------------------------------------------
// Text rendering
// ---------------------------------------------------------------------------

/// Render a table with a leading row index and a dtype line, columns padded
/// to their widest cell.
pub fn render_table(table: &Table) -> String {
    let index_width = table.n_rows().saturating_sub(1).to_string().len();
    let cells: Vec<Vec<String>> = table
        .columns()
        .iter()
        .map(|c| c.values().iter().map(|v| v.to_string()).collect())
        .collect();
    let widths: Vec<usize> = table
        .columns()
        .iter()
        .zip(&cells)
        .map(|(column, values)| {
            values
                .iter()
                .map(|v| v.chars().count())
                .chain([column.name().chars().count(), column.dtype().as_str().len()])
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut text = String::new();
    let _ = write!(text, "{:index_width$}", "");
    for (column, width) in table.columns().iter().zip(widths.iter().copied()) {
        let _ = write!(text, "  {:>width$}", column.name());
    }
    text.push('\n');
    for row in 0..table.n_rows() {
        let _ = write!(text, "{row:>index_width$}");
        for (values, width) in cells.iter().zip(widths.iter().copied()) {
            let _ = write!(text, "  {:>width$}", values[row]);
        }
        text.push('\n');
    }
    let _ = write!(text, "{:index_width$}", "");
    for (column, width) in table.columns().iter().zip(widths.iter().copied()) {
        let _ = write!(text, "  {:>width$}", column.dtype().as_str());
    }
    text.push('\n');
    text
}

/// Horizontal bars, one line per row and series, scaled to the largest value.
pub fn render_chart(chart: &BarChart) -> String {
    let scale = chart.max_abs();
    let label_width = chart
        .series
        .iter()
        .map(|s| s.name.chars().count())
        .max()
        .unwrap_or(0);

    let mut text = String::new();
    for row in 0..chart.n_rows.min(CHART_MAX_ROWS) {
        for series in &chart.series {
            let value = series.values.get(row).copied().flatten();
            let bar = match value {
                Some(v) if scale > 0.0 => {
                    let len = ((v.abs() / scale) * CHART_WIDTH as f64).round() as usize;
                    let mark = if v < 0.0 { "-" } else { "#" };
                    mark.repeat(len)
                }
                _ => String::new(),
            };
            let shown = value.map(|v| v.to_string()).unwrap_or_else(|| "NaN".into());
            let _ = writeln!(text, "{row:>3} {:label_width$} |{bar} {shown}", series.name);
        }
    }
    if chart.n_rows > CHART_MAX_ROWS {
        let _ = writeln!(text, "... {} more rows", chart.n_rows - CHART_MAX_ROWS);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{Column, Value};

    #[test]
    fn progress_tracks_files_and_clears_on_completion() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut app = ConsoleApp::new(Vec::new(), dir.path()).unwrap();
        app.progress(0, 3, 1.0 / 3.0);
        app.progress(1, 3, 2.0 / 3.0);

        let bar = app.progress.clone().unwrap();
        assert_eq!(bar.length(), Some(3));
        assert_eq!(bar.position(), 2);
        assert!(!bar.is_finished());

        app.completed(&BatchSummary::default());
        assert!(bar.is_finished());
    }

    #[test]
    fn export_failure_message_names_the_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut console = Vec::new();
        let mut app = ConsoleApp::new(&mut console, dir.path()).unwrap();
        app.skipped(&SkippedFile {
            file_name: "wide.csv".to_string(),
            reason: SkipReason::Error(SweepError::ExportFailure("too many columns".into())),
        });
        app.finish().unwrap();
        assert_eq!(
            String::from_utf8(console).unwrap(),
            "Skipping wide.csv: Conversion failed: too many columns\n"
        );
    }

    #[test]
    fn renders_preview_with_index_and_dtypes() {
        let table = Table::new(vec![
            Column::new("id", vec![Value::Integer(1), Value::Integer(22)]),
            Column::new("name", vec![Value::String("ann".into()), Value::Null]),
        ])
        .unwrap();
        let text = render_table(&table);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "      id    name");
        assert_eq!(lines[1], "0      1     ann");
        assert_eq!(lines[2], "1     22     NaN");
        assert_eq!(lines[3], "   int64  object");
    }

    #[test]
    fn chart_scales_to_largest_value() {
        let table = Table::new(vec![Column::new(
            "v",
            vec![Value::Integer(2), Value::Integer(4)],
        )])
        .unwrap();
        let text = render_chart(&BarChart::from_table(&table));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], format!("  0 v |{} 2", "#".repeat(20)));
        assert_eq!(lines[1], format!("  1 v |{} 4", "#".repeat(40)));
    }
}
