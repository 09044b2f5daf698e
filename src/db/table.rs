use crate::stats::Sample;
use std::collections::HashMap;
use std::fmt;

/// A single cell of a [`MetricTable`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Missing,
    Num(f64),
    Str(String),
}

impl Value {
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Num(value) => Some(*value),
            _ => None,
        }
    }

    /// The categorical label of a cell, used for factor matching and axis
    /// ticks. Numbers drop a trailing `.0` so that `1.0` and `"1"` name the
    /// same factor level.
    pub fn label(&self) -> Option<String> {
        match self {
            Value::Missing => None,
            Value::Num(value) => Some(fmt_num(*value)),
            Value::Str(value) => Some(value.trim().to_string()),
        }
    }
}

/// Formats a number the way axis labels expect: no trailing `.0`, no
/// scientific notation for the magnitudes benchmark summaries carry.
pub fn fmt_num(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        let mut s = format!("{}", value);
        if s.contains('.') {
            while s.ends_with('0') {
                s.pop();
            }
            if s.ends_with('.') {
                s.pop();
            }
        }
        s
    }
}

/// An ordered collection of rows loaded from one or more summary files.
///
/// Column order is first-seen order; rows keep file order then in-file order.
/// The column set is a union: a row simply misses cells for columns another
/// source contributed.
#[derive(Debug, Default, Clone)]
pub struct MetricTable {
    columns: Vec<String>,
    rows: Vec<HashMap<String, Value>>,
}

impl MetricTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Registers a column without touching any row.
    pub fn ensure_column(&mut self, column: &str) {
        if !self.has_column(column) {
            self.columns.push(column.to_string());
        }
    }

    pub fn push_row(&mut self, row: HashMap<String, Value>) {
        for column in row.keys() {
            self.ensure_column(column);
        }
        self.rows.push(row);
    }

    pub fn get(&self, row: usize, column: &str) -> &Value {
        self.rows[row].get(column).unwrap_or(&Value::Missing)
    }

    pub fn set(&mut self, row: usize, column: &str, value: Value) {
        self.ensure_column(column);
        self.rows[row].insert(column.to_string(), value);
    }

    /// Sets `value` in every row, registering the column if needed.
    pub fn set_all(&mut self, column: &str, value: Value) {
        self.ensure_column(column);
        for row in self.rows.iter_mut() {
            row.insert(column.to_string(), value.clone());
        }
    }

    /// One entry per row: the numeric value of `column`, `None` for missing
    /// or non-numeric cells.
    pub fn numbers(&self, column: &str) -> Vec<Option<f64>> {
        self.rows
            .iter()
            .map(|row| row.get(column).and_then(Value::as_f64))
            .collect()
    }

    /// The non-missing numeric values of `column`, ready for aggregation.
    pub fn sample(&self, column: &str) -> Sample {
        Sample::from(self.numbers(column).into_iter().flatten())
    }

    /// One entry per row: the categorical label of `column`.
    pub fn labels(&self, column: &str) -> Vec<Option<String>> {
        self.rows
            .iter()
            .map(|row| row.get(column).and_then(Value::label))
            .collect()
    }

    /// Appends all rows of `other`, merging its column set in order.
    pub fn append(&mut self, other: MetricTable) {
        for column in other.columns {
            self.ensure_column(&column);
        }
        self.rows.extend(other.rows);
    }

    /// Drops rows not matching `keep`; returns how many were removed.
    pub fn retain_rows<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&HashMap<String, Value>) -> bool,
    {
        let before = self.rows.len();
        self.rows.retain(|row| keep(row));
        before - self.rows.len()
    }

    /// Keeps only the first `limit` rows.
    pub fn truncate(&mut self, limit: usize) {
        self.rows.truncate(limit);
    }

    /// Coerces the listed columns to numbers. Cells that fail to parse become
    /// missing; columns absent from the table are reported back, not created.
    pub fn coerce_numeric(&mut self, columns: &[String]) -> CoercionSummary {
        let mut summary = CoercionSummary::default();
        for column in columns {
            if !self.has_column(column) {
                summary.missing_columns.push(column.clone());
                continue;
            }
            for row in self.rows.iter_mut() {
                let cell = match row.get_mut(column) {
                    Some(cell) => cell,
                    None => continue,
                };
                match cell {
                    Value::Num(_) | Value::Missing => {}
                    Value::Str(text) => match text.trim().parse::<f64>() {
                        Ok(value) if value.is_finite() => {
                            *cell = Value::Num(value);
                        }
                        _ => {
                            summary.failed_cells += 1;
                            *cell = Value::Missing;
                        }
                    },
                }
            }
        }
        summary
    }
}

/// Outcome of a numeric coercion pass.
#[derive(Debug, Default, Clone)]
pub struct CoercionSummary {
    pub missing_columns: Vec<String>,
    pub failed_cells: usize,
}

impl fmt::Display for MetricTable {
    /// Fixed-width console rendering, for printed summary tables.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cells: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .map(|column| match row.get(column) {
                        Some(Value::Num(value)) => format!("{:.4}", value),
                        Some(Value::Str(value)) => value.clone(),
                        Some(Value::Missing) | None => String::new(),
                    })
                    .collect()
            })
            .collect();
        let widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, column)| {
                cells
                    .iter()
                    .map(|row| row[i].len())
                    .chain(std::iter::once(column.len()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        for (column, width) in self.columns.iter().zip(widths.iter()) {
            write!(f, "{:<width$}  ", column, width = *width)?;
        }
        writeln!(f)?;
        for row in cells {
            for (cell, width) in row.iter().zip(widths.iter()) {
                write!(f, "{:<width$}  ", cell, width = *width)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
