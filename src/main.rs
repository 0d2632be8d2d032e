use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, ValueEnum};

use data_sweeper::app::ConsoleApp;
use data_sweeper::config::{self, CommandLine, FileOverrides, OptionsFile};
use data_sweeper::data::export::ExportFormat;
use data_sweeper::data::model::UploadedFile;
use data_sweeper::pipeline;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Csv,
    #[value(alias = "xlsx")]
    Excel,
}

impl From<FormatArg> for ExportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Csv => ExportFormat::Csv,
            FormatArg::Excel => ExportFormat::Excel,
        }
    }
}

/// Convert CSV / Excel files, optionally dropping duplicate rows, filling
/// missing numbers and keeping only some columns.
#[derive(Debug, Parser)]
#[command(name = "data-sweeper", version, about)]
struct Cli {
    /// Input files (.csv or .xlsx)
    files: Vec<PathBuf>,

    /// Output format for every file of the batch
    #[arg(short, long, value_enum, env = "SWEEPER_FORMAT")]
    format: Option<FormatArg>,

    /// Directory the converted files are written to
    #[arg(short, long, env = "SWEEPER_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Remove duplicate rows
    #[arg(long)]
    dedup: bool,

    /// Fill missing numeric values with the column mean
    #[arg(long)]
    fill_missing: bool,

    /// Columns to keep, in output order
    #[arg(long, value_delimiter = ',')]
    columns: Option<Vec<String>>,

    /// Print a bar chart of the first two numeric columns
    #[arg(long)]
    chart: bool,

    /// Rows shown in each preview
    #[arg(long)]
    preview_rows: Option<usize>,

    /// JSON file with per-file options
    #[arg(long)]
    options: Option<PathBuf>,
}

impl Cli {
    fn command_line(&self) -> CommandLine {
        CommandLine {
            format: self.format.map(ExportFormat::from),
            preview_rows: self.preview_rows,
            defaults: FileOverrides {
                remove_duplicates: self.dedup.then_some(true),
                fill_missing_numeric: self.fill_missing.then_some(true),
                columns: self.columns.clone(),
                chart: self.chart.then_some(true),
            },
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let options_file = match &cli.options {
        Some(path) => OptionsFile::from_path(path)?,
        None => OptionsFile::default(),
    };
    let options = config::resolve(&options_file, &cli.command_line());
    log::debug!("Batch options: {options:?}");

    // Unreadable inputs are reported and left out, like any other bad upload.
    let mut uploads = Vec::with_capacity(cli.files.len());
    for path in &cli.files {
        match UploadedFile::from_path(path) {
            Ok(file) => uploads.push(file),
            Err(e) => log::warn!("Skipping {}: {e:#}", path.display()),
        }
    }
    if uploads.is_empty() {
        log::info!("No files to process");
        return Ok(());
    }
    log::info!(
        "Converting {} file(s) to {} into {}",
        uploads.len(),
        options.format,
        cli.output_dir.display()
    );

    let mut app = ConsoleApp::new(io::stdout().lock(), &cli.output_dir)?;
    pipeline::run_batch(&uploads, &options, &mut app);
    let written = app.finish()?;
    log::info!("Wrote {} file(s)", written.len());
    Ok(())
}
