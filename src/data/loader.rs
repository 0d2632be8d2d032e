use std::collections::HashSet;
use std::io::Cursor;
use std::path::Path;

use calamine::{Data, DataType, Reader, Xlsx};
use log::debug;

use super::model::{Column, Table, UploadedFile, Value};
use crate::error::{Result, SweepError};

/// Cell spellings read as missing values in delimited files.
const NA_VALUES: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load an uploaded file into a [`Table`]. Dispatch by extension.
///
/// Supported formats:
/// * `.csv`  – comma separated, first row is the header
/// * `.xlsx` – first worksheet, first row is the header
pub fn load(file: &UploadedFile) -> Result<Table> {
    let ext = extension_of(&file.name);
    let table = match ext.as_str() {
        ".csv" => load_csv(&file.content)?,
        ".xlsx" => load_xlsx(&file.content)?,
        _ => return Err(SweepError::UnsupportedFormat { extension: ext }),
    };
    debug!(
        "Loaded {}: {} rows x {} columns",
        file.name,
        table.n_rows(),
        table.n_columns()
    );
    Ok(table)
}

/// Lowercased extension including its dot, or `""` when the name has none.
pub fn extension_of(name: &str) -> String {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// Parse comma separated bytes. Rows shorter than the header are padded
/// with missing values, longer rows are an error.
pub fn load_csv(bytes: &[u8]) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let raw_headers: Vec<String> = reader
        .headers()
        .map_err(load_failure)?
        .iter()
        .map(|h| h.to_string())
        .collect();
    if raw_headers.is_empty() {
        return Err(SweepError::LoadFailure(
            "No columns to parse from file".to_string(),
        ));
    }
    let headers = unique_headers(raw_headers);
    let width = headers.len();

    // Fields stay as text until the whole column is seen, so a text column
    // can keep cells such as `007` exactly as written.
    let mut fields: Vec<Vec<String>> = vec![Vec::new(); width];
    let mut n_rows = 0;
    for result in reader.records() {
        let record = result.map_err(load_failure)?;
        if record.len() > width {
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            return Err(SweepError::LoadFailure(format!(
                "Error tokenizing data. Expected {width} fields in line {line}, saw {}",
                record.len()
            )));
        }
        for (idx, column) in fields.iter_mut().enumerate() {
            // Short rows are padded with an empty field, read as missing.
            column.push(record.get(idx).unwrap_or("").to_string());
        }
        n_rows += 1;
    }

    let columns = headers
        .into_iter()
        .zip(fields)
        .map(|(name, column)| Column::from_fields(name, column, guess_value))
        .collect();
    Table::with_row_count(columns, n_rows)
}

fn load_failure(err: impl std::fmt::Display) -> SweepError {
    SweepError::LoadFailure(err.to_string())
}

/// Type a raw text field: missing marker, integer, float, boolean or string.
pub fn guess_value(s: &str) -> Value {
    if NA_VALUES.contains(&s) {
        return Value::Null;
    }
    let trimmed = s.trim();
    if let Ok(i) = trimmed.parse::<i64>() {
        return Value::Integer(i);
    }
    if let Ok(f) = trimmed.parse::<f64>() {
        // `NAN` and friends that slipped past the list above.
        return if f.is_nan() { Value::Null } else { Value::Float(f) };
    }
    match trimmed {
        "True" | "TRUE" | "true" => Value::Bool(true),
        "False" | "FALSE" | "false" => Value::Bool(false),
        _ => Value::String(s.to_string()),
    }
}

/// Blank header cells become `Unnamed: {idx}`; repeated names get `.1`, `.2`, …
fn unique_headers(raw: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    raw.into_iter()
        .enumerate()
        .map(|(idx, name)| {
            let base = if name.trim().is_empty() {
                format!("Unnamed: {idx}")
            } else {
                name
            };
            let mut candidate = base.clone();
            let mut suffix = 1;
            while seen.contains(&candidate) {
                candidate = format!("{base}.{suffix}");
                suffix += 1;
            }
            seen.insert(candidate.clone());
            candidate
        })
        .collect()
}

// ---------------------------------------------------------------------------
// XLSX loader
// ---------------------------------------------------------------------------

/// Parse the first worksheet of an `.xlsx` workbook.
///
/// A sheet without any cells yields an empty table rather than an error.
pub fn load_xlsx(bytes: &[u8]) -> Result<Table> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes)).map_err(load_failure)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| SweepError::LoadFailure("Workbook contains no worksheets".to_string()))?
        .map_err(load_failure)?;

    let mut grid = range.rows();
    let Some(header_row) = grid.next() else {
        return Ok(Table::default());
    };
    let headers = unique_headers(
        header_row
            .iter()
            .map(|cell| match cell_value(cell) {
                Value::Null => String::new(),
                other => other.to_field(),
            })
            .collect(),
    );

    let rows = grid
        .map(|row| row.iter().map(cell_value).collect())
        .collect();
    Table::from_rows(headers, rows)
}

/// Convert one spreadsheet cell. Integral floats are read back as integers,
/// error cells count as missing.
fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty | Data::Error(_) => Value::Null,
        Data::Int(i) => Value::Integer(*i),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
            Value::Integer(*f as i64)
        }
        Data::Float(f) => Value::Float(*f),
        Data::Bool(b) => Value::Bool(*b),
        Data::String(s) if s.is_empty() => Value::Null,
        Data::String(s) => Value::String(s.clone()),
        other => match other.as_datetime() {
            Some(dt) => Value::Date(dt.to_string()),
            None => Value::String(other.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::ColumnType;

    fn csv_file(name: &str, text: &str) -> UploadedFile {
        UploadedFile::new(name, text.as_bytes().to_vec())
    }

    #[test]
    fn rejects_unknown_extension() {
        let err = load(&csv_file("report.txt", "a,b\n1,2\n")).unwrap_err();
        assert_eq!(
            err,
            SweepError::UnsupportedFormat {
                extension: ".txt".to_string()
            }
        );
    }

    #[test]
    fn missing_extension_is_unsupported() {
        let err = load(&csv_file("README", "a\n1\n")).unwrap_err();
        assert_eq!(
            err,
            SweepError::UnsupportedFormat {
                extension: String::new()
            }
        );
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        let table = load(&csv_file("DATA.CSV", "a,b\n1,x\n")).unwrap();
        assert_eq!(table.column_names(), vec!["a", "b"]);
        assert_eq!(table.n_rows(), 1);
    }

    #[test]
    fn infers_types_and_missing_values() {
        let table = load_csv(b"id,score,name,flag\n1,2.5,ann,True\n2,,bob,False\n3,NA,,true\n")
            .unwrap();
        let types: Vec<ColumnType> = table.columns().iter().map(|c| c.dtype()).collect();
        assert_eq!(
            types,
            vec![
                ColumnType::Integer,
                ColumnType::Float,
                ColumnType::Text,
                ColumnType::Boolean
            ]
        );
        assert_eq!(table.column("score").unwrap().missing_count(), 2);
        assert_eq!(table.column("name").unwrap().values()[2], Value::Null);
    }

    #[test]
    fn pads_short_rows_and_rejects_long_ones() {
        let table = load_csv(b"a,b,c\n1,2\n").unwrap();
        assert_eq!(table.row(0)[2], &Value::Null);

        let err = load_csv(b"a,b\n1,2,3\n").unwrap_err();
        assert!(matches!(err, SweepError::LoadFailure(_)));
    }

    #[test]
    fn header_only_csv_has_zero_rows() {
        let table = load_csv(b"a,b\n").unwrap();
        assert!(table.is_empty());
        assert_eq!(table.n_columns(), 2);
    }

    #[test]
    fn empty_csv_is_a_load_failure() {
        let err = load_csv(b"").unwrap_err();
        assert!(matches!(err, SweepError::LoadFailure(_)));
    }

    #[test]
    fn invalid_utf8_is_a_load_failure() {
        let err = load_csv(b"a,b\n\xff\xfe,1\n").unwrap_err();
        assert!(matches!(err, SweepError::LoadFailure(_)));
    }

    #[test]
    fn blank_and_repeated_headers_are_made_unique() {
        let table = load_csv(b"a,,a,a\n1,2,3,4\n").unwrap();
        assert_eq!(table.column_names(), vec!["a", "Unnamed: 1", "a.1", "a.2"]);
    }

    #[test]
    fn corrupt_xlsx_is_a_load_failure() {
        let err = load(&UploadedFile::new("broken.xlsx", b"not a zip".to_vec())).unwrap_err();
        assert!(matches!(err, SweepError::LoadFailure(_)));
    }
}
