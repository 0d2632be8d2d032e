use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use anyhow::{Context, Result as AnyResult};

use crate::error::{Result, SweepError};

// ---------------------------------------------------------------------------
// Value – a single cell
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value mirroring common dataframe dtypes.
/// `Null` is the missing marker, distinct from `0` and from `""`.
#[derive(Debug, Clone)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    /// Spreadsheet date/time kept as ISO-ish text.
    Date(String),
    Null,
}

// -- Manual Eq/Ord/Hash so rows can be hashed and compared for deduplication.
// Floats compare with `total_cmp`, which agrees with hashing by bit pattern.

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        use Value::*;
        fn discriminant(v: &Value) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                String(_) => 4,
                Date(_) => 5,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (String(a), String(b)) | (Date(a), Date(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::String(s) | Value::Date(s) => s.hash(state),
            Value::Integer(i) => i.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Bool(b) => b.hash(state),
            Value::Null => {}
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NaN"),
            other => write!(f, "{}", other.to_field()),
        }
    }
}

impl Value {
    /// Numeric view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Text form used when the value is written into a delimited file.
    /// Missing values become an empty field.
    pub fn to_field(&self) -> String {
        match self {
            Value::String(s) | Value::Date(s) => s.clone(),
            Value::Integer(i) => i.to_string(),
            // Debug keeps the decimal point (`20.0`) and round-trips exactly.
            Value::Float(v) => format!("{v:?}"),
            Value::Bool(true) => "True".to_string(),
            Value::Bool(false) => "False".to_string(),
            Value::Null => String::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Column
// ---------------------------------------------------------------------------

/// Declared type shared by every non-missing cell of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Integer,
    Float,
    Boolean,
    Text,
    Date,
}

impl ColumnType {
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Float)
    }

    /// Dataframe-style dtype label, shown in previews.
    pub fn as_str(self) -> &'static str {
        match self {
            ColumnType::Integer => "int64",
            ColumnType::Float => "float64",
            ColumnType::Boolean => "bool",
            ColumnType::Text => "object",
            ColumnType::Date => "datetime64",
        }
    }

    /// Infer the declared type from raw cell values.
    ///
    /// * no non-missing values        → `Float`
    /// * integers only, none missing  → `Integer`
    /// * integers with missing cells, or any float among numbers → `Float`
    /// * booleans only / dates only   → `Boolean` / `Date`
    /// * anything mixed or textual    → `Text`
    pub fn infer(values: &[Value]) -> Self {
        let (mut ints, mut floats, mut bools, mut dates, mut nulls) =
            (false, false, false, false, false);
        for value in values {
            match value {
                Value::String(_) => return ColumnType::Text,
                Value::Integer(_) => ints = true,
                Value::Float(_) => floats = true,
                Value::Bool(_) => bools = true,
                Value::Date(_) => dates = true,
                Value::Null => nulls = true,
            }
        }
        let numeric = ints || floats;
        match (numeric, bools, dates) {
            (true, false, false) if floats || nulls => ColumnType::Float,
            (true, false, false) => ColumnType::Integer,
            (false, true, false) => ColumnType::Boolean,
            (false, false, true) => ColumnType::Date,
            (false, false, false) => ColumnType::Float,
            _ => ColumnType::Text,
        }
    }

    fn coerce(self, value: Value) -> Value {
        match (self, value) {
            (_, Value::Null) => Value::Null,
            (ColumnType::Float, Value::Integer(i)) => Value::Float(i as f64),
            (ColumnType::Text, Value::String(s)) => Value::String(s),
            (ColumnType::Text, other) => Value::String(other.to_field()),
            (_, other) => other,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named column whose cells all share one declared type.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    dtype: ColumnType,
    values: Vec<Value>,
}

impl Column {
    /// Build a column, inferring its type and coercing cells to it.
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        let dtype = ColumnType::infer(&values);
        let values = values.into_iter().map(|v| dtype.coerce(v)).collect();
        Column {
            name: name.into(),
            dtype,
            values,
        }
    }

    /// Build a column from raw text fields, typing each one with `parse`.
    ///
    /// When the column ends up as `Text`, every non-missing cell keeps its
    /// field exactly as written (`007` stays `007`, ` 5` keeps its space).
    pub fn from_fields(
        name: impl Into<String>,
        fields: Vec<String>,
        parse: impl Fn(&str) -> Value,
    ) -> Self {
        let parsed: Vec<Value> = fields.iter().map(|f| parse(f)).collect();
        let dtype = ColumnType::infer(&parsed);
        let values = if dtype == ColumnType::Text {
            parsed
                .into_iter()
                .zip(fields)
                .map(|(value, raw)| match value {
                    Value::Null => Value::Null,
                    _ => Value::String(raw),
                })
                .collect()
        } else {
            parsed.into_iter().map(|v| dtype.coerce(v)).collect()
        };
        Column {
            name: name.into(),
            dtype,
            values,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dtype(&self) -> ColumnType {
        self.dtype
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_numeric(&self) -> bool {
        self.dtype.is_numeric()
    }

    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_null()).count()
    }

    /// Arithmetic mean of the non-missing numeric cells, `None` when there are none.
    pub fn mean(&self) -> Option<f64> {
        let (sum, count) = self
            .values
            .iter()
            .filter_map(Value::as_f64)
            .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
        (count > 0).then(|| sum / count as f64)
    }

    /// Turn an integer column into a float column, leaving other types alone.
    pub(crate) fn promote_to_float(&mut self) {
        if self.dtype == ColumnType::Integer {
            self.dtype = ColumnType::Float;
            for value in &mut self.values {
                *value = ColumnType::Float.coerce(std::mem::replace(value, Value::Null));
            }
        }
    }

    /// Replace every missing cell with `fill`. Returns the number of cells written.
    pub(crate) fn fill_missing(&mut self, fill: Value) -> usize {
        let fill = self.dtype.coerce(fill);
        let mut filled = 0;
        for value in self.values.iter_mut().filter(|v| v.is_null()) {
            *value = fill.clone();
            filled += 1;
        }
        filled
    }

    fn retain(&mut self, keep: &[bool]) {
        let mut flags = keep.iter();
        self.values.retain(|_| flags.next().copied().unwrap_or(false));
    }

    fn head(&self, n: usize) -> Column {
        Column {
            name: self.name.clone(),
            dtype: self.dtype,
            values: self.values.iter().take(n).cloned().collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Table – ordered columns with aligned rows
// ---------------------------------------------------------------------------

/// In-memory table: ordered, uniquely named columns of equal length.
///
/// The row count is stored explicitly so that a projection onto zero
/// columns still knows how many rows it has.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<Column>,
    n_rows: usize,
}

impl Table {
    /// Build a table from columns; the row count is taken from the first column.
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let n_rows = columns.first().map(Column::len).unwrap_or(0);
        Self::with_row_count(columns, n_rows)
    }

    /// Build a table with an explicit row count (needed when `columns` is empty).
    pub fn with_row_count(columns: Vec<Column>, n_rows: usize) -> Result<Self> {
        let mut seen = BTreeSet::new();
        for column in &columns {
            if column.len() != n_rows {
                return Err(SweepError::InvalidTable(format!(
                    "column '{}' has {} rows, expected {n_rows}",
                    column.name,
                    column.len()
                )));
            }
            if !seen.insert(column.name.as_str()) {
                return Err(SweepError::InvalidTable(format!(
                    "duplicate column name '{}'",
                    column.name
                )));
            }
        }
        Ok(Table { columns, n_rows })
    }

    /// Build a table from a header and row-major cells. Every row must be
    /// exactly as wide as the header.
    pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self> {
        let n_rows = rows.len();
        let mut cells: Vec<Vec<Value>> = headers
            .iter()
            .map(|_| Vec::with_capacity(n_rows))
            .collect();
        for (row_no, row) in rows.into_iter().enumerate() {
            if row.len() != headers.len() {
                return Err(SweepError::InvalidTable(format!(
                    "row {row_no} has {} fields, expected {}",
                    row.len(),
                    headers.len()
                )));
            }
            for (slot, value) in cells.iter_mut().zip(row) {
                slot.push(value);
            }
        }
        let columns = headers
            .into_iter()
            .zip(cells)
            .map(|(name, values)| Column::new(name, values))
            .collect();
        Self::with_row_count(columns, n_rows)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub(crate) fn columns_mut(&mut self) -> &mut [Column] {
        &mut self.columns
    }

    pub fn into_columns(self) -> Vec<Column> {
        self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Ordered list of column names.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    /// A table is empty when it has no rows.
    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    /// Cells of one row, in column order.
    pub fn row(&self, idx: usize) -> Vec<&Value> {
        self.columns.iter().map(|c| &c.values[idx]).collect()
    }

    pub fn rows(&self) -> impl Iterator<Item = Vec<&Value>> + '_ {
        (0..self.n_rows).map(move |idx| self.row(idx))
    }

    /// First `n` rows (the preview).
    pub fn head(&self, n: usize) -> Table {
        Table {
            columns: self.columns.iter().map(|c| c.head(n)).collect(),
            n_rows: self.n_rows.min(n),
        }
    }

    /// Keep the rows whose flag is `true`; `keep` is indexed by row.
    pub(crate) fn retain_rows(&mut self, keep: &[bool]) {
        for column in &mut self.columns {
            column.retain(keep);
        }
        self.n_rows = keep.iter().take(self.n_rows).filter(|k| **k).count();
    }
}

// ---------------------------------------------------------------------------
// UploadedFile – what the host hands to the pipeline
// ---------------------------------------------------------------------------

/// A file as received from the host: declared name, raw bytes and declared size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub name: String,
    pub content: Vec<u8>,
    pub size: u64,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, content: Vec<u8>) -> Self {
        let size = content.len() as u64;
        UploadedFile {
            name: name.into(),
            content,
            size,
        }
    }

    /// Read a file from disk; the declared name is the path's final component.
    pub fn from_path(path: &Path) -> AnyResult<Self> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("{} has no usable file name", path.display()))?
            .to_string();
        let content =
            std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        Ok(Self::new(name, content))
    }

    /// Declared size in KiB.
    pub fn size_kb(&self) -> f64 {
        self.size as f64 / 1024.0
    }
}
