use std::collections::HashSet;

use log::debug;
use serde::{Deserialize, Serialize};

use super::model::{Table, Value};

/// Which cleaning steps to run on one file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningOptions {
    pub remove_duplicates: bool,
    pub fill_missing_numeric: bool,
}

/// What a cleaning pass changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanReport {
    /// Row count before deduplication minus row count after.
    pub duplicates_removed: usize,
    /// `(column, cells filled, fill value)` for every numeric column that had gaps.
    pub filled: Vec<(String, usize, f64)>,
}

/// Apply the enabled cleaning steps. Deduplication runs before mean filling.
pub fn clean(mut table: Table, options: CleaningOptions) -> (Table, CleanReport) {
    let mut report = CleanReport::default();
    if options.remove_duplicates {
        report.duplicates_removed = remove_duplicates(&mut table);
    }
    if options.fill_missing_numeric {
        report.filled = fill_missing_numeric(&mut table);
    }
    (table, report)
}

/// Drop every row that repeats an earlier row value-for-value. The first
/// occurrence is kept and the order of the remaining rows is preserved.
pub fn remove_duplicates(table: &mut Table) -> usize {
    let before = table.n_rows();
    let keep: Vec<bool> = {
        let mut seen: HashSet<Vec<&Value>> = HashSet::with_capacity(before);
        table.rows().map(|row| seen.insert(row)).collect()
    };
    table.retain_rows(&keep);
    let removed = before - table.n_rows();
    debug!("Removed {removed} duplicate rows");
    removed
}

/// Replace missing cells of numeric columns with the column mean.
///
/// The mean is taken over the non-missing cells before anything is filled.
/// Columns without any non-missing cell are left untouched.
pub fn fill_missing_numeric(table: &mut Table) -> Vec<(String, usize, f64)> {
    let mut filled = Vec::new();
    for column in table.columns_mut() {
        if !column.is_numeric() || column.missing_count() == 0 {
            continue;
        }
        let Some(mean) = column.mean() else {
            debug!("Column '{}' has no values, nothing to average", column.name());
            continue;
        };
        column.promote_to_float();
        let count = column.fill_missing(Value::Float(mean));
        filled.push((column.name().to_string(), count, mean));
    }
    filled
}
