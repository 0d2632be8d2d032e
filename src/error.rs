use thiserror::Error;

/// Failures a single file can run into on its way through the pipeline.
///
/// Every variant is recovered per file by the orchestrator; none of them
/// aborts a batch.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SweepError {
    /// The file name carries an extension the loader does not read.
    /// The extension is lowercased and keeps its leading dot (`.txt`).
    #[error("Unsupported file type: {extension}")]
    UnsupportedFormat { extension: String },

    #[error("{0}")]
    LoadFailure(String),

    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("Conversion failed: {0}")]
    ExportFailure(String),

    /// Columns of unequal length or repeated column names.
    #[error("Invalid table: {0}")]
    InvalidTable(String),
}

pub type Result<T, E = SweepError> = std::result::Result<T, E>;
