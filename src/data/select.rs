use super::model::{Column, Table};
use crate::error::{Result, SweepError};

// ---------------------------------------------------------------------------
// Column selection: which columns survive, and in what order
// ---------------------------------------------------------------------------

/// Ordered list of column names to keep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnSelection(Vec<String>);

impl ColumnSelection {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ColumnSelection(names.into_iter().map(Into::into).collect())
    }

    /// Default selection: every column of `table`, in table order.
    pub fn all(table: &Table) -> Self {
        Self::new(table.column_names())
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Project `table` onto the selected columns, in selection order.
///
/// * A name missing from the table fails with [`SweepError::UnknownColumn`].
/// * An empty selection yields a table with no columns and the same row count.
/// * Selecting every column in table order returns the table as is.
pub fn select_columns(table: Table, selection: &ColumnSelection) -> Result<Table> {
    if let Some(unknown) = selection
        .names()
        .iter()
        .find(|name| table.column(name).is_none())
    {
        return Err(SweepError::UnknownColumn(unknown.clone()));
    }
    if table
        .column_names()
        .iter()
        .copied()
        .eq(selection.names().iter().map(String::as_str))
    {
        return Ok(table);
    }

    let n_rows = table.n_rows();
    let mut pool: Vec<Option<Column>> = table.into_columns().into_iter().map(Some).collect();
    let mut picked = Vec::with_capacity(selection.names().len());
    for name in selection.names() {
        // A name listed twice finds its slot already emptied and is skipped.
        let position = pool
            .iter()
            .position(|c| c.as_ref().is_some_and(|c| c.name() == name.as_str()));
        if let Some(column) = position.and_then(|idx| pool[idx].take()) {
            picked.push(column);
        }
    }
    Table::with_row_count(picked, n_rows)
}
