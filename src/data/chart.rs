use super::model::Table;

/// Numeric columns plotted against the row index.
pub const MAX_SERIES: usize = 2;

/// One plotted column. Missing cells stay `None` so bars remain aligned.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

/// Bar chart data: up to the first [`MAX_SERIES`] numeric columns of a table.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BarChart {
    pub series: Vec<Series>,
    pub n_rows: usize,
}

impl BarChart {
    pub fn from_table(table: &Table) -> Self {
        let series = table
            .columns()
            .iter()
            .filter(|c| c.is_numeric())
            .take(MAX_SERIES)
            .map(|c| Series {
                name: c.name().to_string(),
                values: c.values().iter().map(|v| v.as_f64()).collect(),
            })
            .collect();
        BarChart {
            series,
            n_rows: table.n_rows(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Largest absolute value over all series, used to scale bars.
    pub fn max_abs(&self) -> f64 {
        self.series
            .iter()
            .flat_map(|s| s.values.iter().flatten())
            .fold(0.0, |acc: f64, v| acc.max(v.abs()))
    }
}
