//! In-memory tabular data and its CSV representation.

use booking_core::persistence::atomic_write;
use booking_core::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// A batch of data rows.
///
/// Cells are JSON values: `Null` for missing, numbers, strings and booleans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataBatch {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub total_rows: usize,
}

impl DataBatch {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let total_rows = rows.len();
        Self {
            columns,
            rows,
            total_rows,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new())
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// All values of one column, in row order.
    pub fn column_values(&self, name: &str) -> Option<Vec<&Value>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|row| &row[idx]).collect())
    }

    /// Numeric view of one column; `None` for cells that are not numbers.
    pub fn numeric_column(&self, name: &str) -> Option<Vec<Option<f64>>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|row| as_f64(&row[idx])).collect())
    }

    /// Remove the named columns. Names that are not present are skipped.
    ///
    /// Returns the names that were actually removed.
    pub fn drop_columns(&mut self, names: &[String]) -> Vec<String> {
        let mut dropped = Vec::new();
        for name in names {
            if let Some(idx) = self.column_index(name) {
                self.columns.remove(idx);
                for row in &mut self.rows {
                    row.remove(idx);
                }
                dropped.push(name.clone());
            }
        }
        dropped
    }

    /// Append a column. `values` must have one entry per row.
    pub fn push_column(&mut self, name: impl Into<String>, values: Vec<Value>) -> Result<()> {
        if values.len() != self.rows.len() {
            return Err(PipelineError::invalid_input(format!(
                "column has {} values but batch has {} rows",
                values.len(),
                self.rows.len()
            )));
        }
        self.columns.push(name.into());
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(value);
        }
        Ok(())
    }

    /// Keep only the rows for which `keep` returns true.
    pub fn retain_rows(&mut self, mut keep: impl FnMut(&[Value]) -> bool) -> usize {
        let before = self.rows.len();
        self.rows.retain(|row| keep(row));
        self.total_rows = self.rows.len();
        before - self.rows.len()
    }

    /// A new batch holding the given rows, in the given order.
    pub fn select_rows(&self, indices: &[usize]) -> DataBatch {
        let rows = indices.iter().map(|&i| self.rows[i].clone()).collect();
        DataBatch::new(self.columns.clone(), rows)
    }

    /// Replace string cells equal to `placeholder` (case-insensitive) with `Null`.
    pub fn replace_placeholder(&mut self, placeholder: &str) -> usize {
        let mut replaced = 0;
        for cell in self.rows.iter_mut().flatten() {
            let is_placeholder =
                matches!(cell, Value::String(s) if s.eq_ignore_ascii_case(placeholder));
            if is_placeholder {
                *cell = Value::Null;
                replaced += 1;
            }
        }
        replaced
    }

    /// Read a CSV file with a header row.
    pub fn read_csv(path: &Path) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| {
                PipelineError::not_found(format!("failed to open CSV '{}': {e}", path.display()))
            })?;

        let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(parse_cell).collect());
        }
        Ok(Self::new(columns, rows))
    }

    /// Write the batch as CSV with a header row.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row.iter().map(format_cell))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| PipelineError::Io(e.into_error()))?;
        atomic_write(path, &bytes)?;
        Ok(())
    }
}

/// Numeric value of a cell. Booleans count as 0/1.
pub fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// JSON number for a float; non-finite values become `Null`.
pub fn number(value: f64) -> Value {
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// Category key of a cell, used by encoders and drift statistics.
pub fn cell_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => format_cell(other),
    }
}

fn parse_cell(raw: &str) -> Value {
    if raw.is_empty() {
        return Value::Null;
    }
    if let Ok(i) = raw.parse::<i64>() {
        return Value::from(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        if f.is_finite() {
            return number(f);
        }
    }
    match raw {
        "true" | "True" => Value::Bool(true),
        "false" | "False" => Value::Bool(false),
        _ => Value::String(raw.to_string()),
    }
}

fn format_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::TempDir;

    fn sample() -> DataBatch {
        DataBatch::new(
            vec!["hotel".into(), "adr".into(), "name".into()],
            vec![
                vec![json!("City Hotel"), json!(95.5), json!("Ann")],
                vec![json!("Resort Hotel"), Value::Null, json!("Bob")],
            ],
        )
    }

    #[test]
    fn test_drop_columns_skips_absent() {
        let mut batch = sample();
        let dropped = batch.drop_columns(&["name".into(), "missing".into()]);
        assert_eq!(dropped, vec!["name".to_string()]);
        assert_eq!(batch.columns, vec!["hotel", "adr"]);
        assert_eq!(batch.rows[0].len(), 2);
    }

    #[test]
    fn test_csv_roundtrip_keeps_types() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("data.csv");
        let batch = sample();
        batch.write_csv(&path).unwrap();

        let loaded = DataBatch::read_csv(&path).unwrap();
        assert_eq!(loaded, batch);
    }

    #[test]
    fn test_replace_placeholder() {
        let mut batch = DataBatch::new(
            vec!["agent".into()],
            vec![vec![json!("NA")], vec![json!("9")], vec![json!("na")]],
        );
        assert_eq!(batch.replace_placeholder("na"), 2);
        assert_eq!(batch.rows[0][0], Value::Null);
        assert_eq!(batch.rows[1][0], json!("9"));
    }

    #[test]
    fn test_retain_and_select_rows() {
        let mut batch = sample();
        let selected = batch.select_rows(&[1]);
        assert_eq!(selected.row_count(), 1);
        assert_eq!(selected.rows[0][2], json!("Bob"));

        let removed = batch.retain_rows(|row| !row[1].is_null());
        assert_eq!(removed, 1);
        assert_eq!(batch.total_rows, 1);
    }

    #[test]
    fn test_numeric_column() {
        let batch = sample();
        assert_eq!(batch.numeric_column("adr").unwrap(), vec![Some(95.5), None]);
        assert!(batch.numeric_column("nope").is_none());
    }
}
