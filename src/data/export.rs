use std::fmt;

use log::debug;
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use serde::{Deserialize, Serialize};

use super::model::{Table, Value};
use crate::error::{Result, SweepError};

pub const CSV_MEDIA_TYPE: &str = "text/csv";
pub const XLSX_MEDIA_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Target format of a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    #[serde(alias = "xlsx")]
    Excel,
}

impl ExportFormat {
    pub fn media_type(self) -> &'static str {
        match self {
            ExportFormat::Csv => CSV_MEDIA_TYPE,
            ExportFormat::Excel => XLSX_MEDIA_TYPE,
        }
    }

    /// Extension given to exported files, dot included.
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => ".csv",
            ExportFormat::Excel => ".xlsx",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Csv => f.write_str("CSV"),
            ExportFormat::Excel => f.write_str("Excel"),
        }
    }
}

/// A serialized table ready to be offered for download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportResult {
    pub buffer: Vec<u8>,
    pub media_type: &'static str,
    pub file_name: String,
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Serialize `table` without a row-index column. Nothing is returned on failure.
pub fn export(table: &Table, format: ExportFormat, original_name: &str) -> Result<ExportResult> {
    let buffer = match format {
        ExportFormat::Csv => write_csv(table)?,
        ExportFormat::Excel => write_xlsx(table)?,
    };
    let file_name = output_file_name(original_name, format.extension());
    debug!("Exported {file_name} ({} bytes)", buffer.len());
    Ok(ExportResult {
        buffer,
        media_type: format.media_type(),
        file_name,
    })
}

/// Replace the last extension segment of `original` with `extension`.
/// Names without one (including dot-files like `.csv`) get it appended.
pub fn output_file_name(original: &str, extension: &str) -> String {
    match original.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => format!("{stem}{extension}"),
        _ => format!("{original}{extension}"),
    }
}

fn export_failure(err: impl fmt::Display) -> SweepError {
    SweepError::ExportFailure(err.to_string())
}

// ---------------------------------------------------------------------------
// CSV writer
// ---------------------------------------------------------------------------

fn write_csv(table: &Table) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(table.column_names())
        .map_err(export_failure)?;
    for row in table.rows() {
        writer
            .write_record(row.iter().map(|v| v.to_field()))
            .map_err(export_failure)?;
    }
    writer.into_inner().map_err(export_failure)
}

// ---------------------------------------------------------------------------
// XLSX writer
// ---------------------------------------------------------------------------

/// Single worksheet named `Sheet1`, bold header row, typed cells.
fn write_xlsx(table: &Table) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let sheet = workbook.add_worksheet();

    for (col_idx, column) in table.columns().iter().enumerate() {
        let col = u16::try_from(col_idx)
            .map_err(|_| export_failure(format!("too many columns ({})", table.n_columns())))?;
        sheet
            .write_string_with_format(0, col, column.name(), &header)
            .map_err(export_failure)?;
        for (row_idx, value) in column.values().iter().enumerate() {
            let row = u32::try_from(row_idx + 1)
                .map_err(|_| export_failure(format!("too many rows ({})", table.n_rows())))?;
            write_cell(sheet, row, col, value).map_err(export_failure)?;
        }
    }

    workbook.save_to_buffer().map_err(export_failure)
}

fn write_cell(sheet: &mut Worksheet, row: u32, col: u16, value: &Value) -> Result<(), XlsxError> {
    match value {
        Value::Null => {}
        Value::Integer(i) => {
            sheet.write_number(row, col, *i as f64)?;
        }
        Value::Float(f) if f.is_finite() => {
            sheet.write_number(row, col, *f)?;
        }
        Value::Bool(b) => {
            sheet.write_boolean(row, col, *b)?;
        }
        other => {
            sheet.write_string(row, col, other.to_field())?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Column;

    fn sample() -> Table {
        Table::new(vec![
            Column::new("a", vec![Value::Integer(1), Value::Integer(2)]),
            Column::new("b", vec![Value::Float(0.5), Value::Null]),
            Column::new(
                "c",
                vec![Value::String("x".into()), Value::String("y,z".into())],
            ),
        ])
        .unwrap()
    }

    #[test]
    fn csv_has_header_and_no_index() {
        let result = export(&sample(), ExportFormat::Csv, "data.xlsx").unwrap();
        assert_eq!(
            String::from_utf8(result.buffer).unwrap(),
            "a,b,c\n1,0.5,x\n2,,\"y,z\"\n"
        );
        assert_eq!(result.media_type, "text/csv");
        assert_eq!(result.file_name, "data.csv");
    }

    #[test]
    fn excel_buffer_is_a_zip_archive() {
        let result = export(&sample(), ExportFormat::Excel, "data.csv").unwrap();
        assert!(result.buffer.starts_with(b"PK"));
        assert_eq!(result.media_type, XLSX_MEDIA_TYPE);
        assert_eq!(result.file_name, "data.xlsx");
    }

    #[test]
    fn replaces_only_the_last_extension() {
        assert_eq!(output_file_name("csv_report.csv", ".xlsx"), "csv_report.xlsx");
        assert_eq!(output_file_name("a.csv.csv", ".xlsx"), "a.csv.xlsx");
        assert_eq!(output_file_name("noext", ".csv"), "noext.csv");
        assert_eq!(output_file_name(".csv", ".xlsx"), ".csv.xlsx");
    }

    #[test]
    fn format_names_deserialize() {
        let f: ExportFormat = serde_json::from_str("\"excel\"").unwrap();
        assert_eq!(f, ExportFormat::Excel);
        let f: ExportFormat = serde_json::from_str("\"xlsx\"").unwrap();
        assert_eq!(f, ExportFormat::Excel);
        let f: ExportFormat = serde_json::from_str("\"csv\"").unwrap();
        assert_eq!(f, ExportFormat::Csv);
    }
}
