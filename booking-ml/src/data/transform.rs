//! Fitted feature transformations, persisted as `preprocessor.json`.
//!
//! A [`Preprocessor`] is an ordered list of [`TransformStep`]s. Steps carry every
//! fitted parameter (label mappings, one-hot categories, scaler bounds), so the
//! exact transformation used at training time can be replayed on new rows.

use crate::data::batch::{DataBatch, as_f64, cell_key, number};
use crate::data::schema::TransformationConfig;
use booking_core::persistence::{atomic_write_json, read_json};
use booking_core::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Fixed codes for the `hotel` column.
pub const HOTEL_MAPPING: [(&str, i64); 2] = [("Resort Hotel", 0), ("City Hotel", 1)];

/// Calendar order for `arrival_date_month`, encoded as 1..=12.
pub const MONTH_ORDER: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// A single transformation step with its fitted parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransformStep {
    DropColumns {
        columns: Vec<String>,
    },
    FillNull {
        value: i64,
    },
    LabelEncode {
        column: String,
        mapping: BTreeMap<String, i64>,
    },
    /// `categories` excludes the dropped first category.
    OneHot {
        column: String,
        categories: Vec<String>,
    },
    MinMax {
        column: String,
        min: f64,
        max: f64,
    },
}

/// The fitted preprocessing pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Preprocessor {
    pub steps: Vec<TransformStep>,
}

impl Preprocessor {
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn add_step(mut self, step: TransformStep) -> Self {
        self.steps.push(step);
        self
    }

    /// Apply every step, in order.
    pub fn apply(&self, mut batch: DataBatch) -> Result<DataBatch> {
        for step in &self.steps {
            batch = apply_step(batch, step)?;
        }
        Ok(batch)
    }

    /// Fit label encoders, one-hot encoders and the scaler on `batch`, in that order.
    ///
    /// Each fitted step is appended to the pipeline and applied before the next
    /// one is fitted. Columns absent from the batch are skipped.
    pub fn fit_encoders(
        &mut self,
        transformation: &TransformationConfig,
        batch: DataBatch,
    ) -> Result<DataBatch> {
        let batch = self.fit_columns(batch, &transformation.label_encoding, fit_label_encoder)?;
        let batch = self.fit_columns(batch, &transformation.onehot_encoding, fit_one_hot)?;
        self.fit_columns(batch, &transformation.scaling, fit_min_max)
    }

    fn fit_columns(
        &mut self,
        mut batch: DataBatch,
        columns: &[String],
        fit: impl Fn(&DataBatch, &str) -> Result<TransformStep>,
    ) -> Result<DataBatch> {
        for column in columns {
            if !batch.has_column(column) {
                tracing::warn!(column = %column, "column not present, skipping transform");
                continue;
            }
            let step = fit(&batch, column)?;
            batch = apply_step(batch, &step)?;
            self.steps.push(step);
        }
        Ok(batch)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        atomic_write_json(path, self)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        read_json(path)
    }
}

fn fit_label_encoder(batch: &DataBatch, column: &str) -> Result<TransformStep> {
    let mapping: BTreeMap<String, i64> = match column {
        "hotel" => HOTEL_MAPPING
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect(),
        "arrival_date_month" => MONTH_ORDER
            .iter()
            .zip(1..)
            .map(|(m, code)| (m.to_string(), code))
            .collect(),
        _ => distinct_keys(batch, column)
            .into_iter()
            .zip(0..)
            .collect(),
    };
    tracing::debug!(column, classes = mapping.len(), "fitted label encoder");
    Ok(TransformStep::LabelEncode {
        column: column.to_string(),
        mapping,
    })
}

fn fit_one_hot(batch: &DataBatch, column: &str) -> Result<TransformStep> {
    let categories: Vec<String> = distinct_keys(batch, column).into_iter().skip(1).collect();
    tracing::debug!(column, dummies = categories.len(), "fitted one-hot encoder");
    Ok(TransformStep::OneHot {
        column: column.to_string(),
        categories,
    })
}

fn fit_min_max(batch: &DataBatch, column: &str) -> Result<TransformStep> {
    let values = batch.column_values(column).unwrap_or_default();
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for value in values {
        let x = as_f64(value).ok_or_else(|| {
            PipelineError::preprocessing(format!(
                "cannot scale non-numeric value '{}' in column {column}",
                cell_key(value)
            ))
        })?;
        min = min.min(x);
        max = max.max(x);
    }
    if !min.is_finite() {
        min = 0.0;
        max = 0.0;
    }
    Ok(TransformStep::MinMax {
        column: column.to_string(),
        min,
        max,
    })
}

fn distinct_keys(batch: &DataBatch, column: &str) -> BTreeSet<String> {
    batch
        .column_values(column)
        .unwrap_or_default()
        .into_iter()
        .filter(|v| !v.is_null())
        .map(cell_key)
        .collect()
}

fn apply_step(mut batch: DataBatch, step: &TransformStep) -> Result<DataBatch> {
    match step {
        TransformStep::DropColumns { columns } => {
            let dropped = batch.drop_columns(columns);
            tracing::debug!(?dropped, "dropped columns");
            Ok(batch)
        }
        TransformStep::FillNull { value } => {
            for cell in batch.rows.iter_mut().flatten() {
                if cell.is_null() {
                    *cell = Value::from(*value);
                }
            }
            Ok(batch)
        }
        TransformStep::LabelEncode { column, mapping } => {
            let Some(idx) = batch.column_index(column) else {
                return Ok(batch);
            };
            for row in &mut batch.rows {
                row[idx] = Value::from(label_code(&row[idx], column, mapping)?);
            }
            Ok(batch)
        }
        TransformStep::OneHot { column, categories } => {
            let Some(idx) = batch.column_index(column) else {
                return Ok(batch);
            };
            batch.columns.remove(idx);
            batch
                .columns
                .extend(categories.iter().map(|c| format!("{column}_{c}")));
            for row in &mut batch.rows {
                let key = cell_key(&row.remove(idx));
                row.extend(
                    categories
                        .iter()
                        .map(|c| Value::from(i64::from(*c == key))),
                );
            }
            Ok(batch)
        }
        TransformStep::MinMax { column, min, max } => {
            let Some(idx) = batch.column_index(column) else {
                return Ok(batch);
            };
            let range = max - min;
            for row in &mut batch.rows {
                let x = as_f64(&row[idx]).ok_or_else(|| {
                    PipelineError::preprocessing(format!(
                        "cannot scale non-numeric value '{}' in column {column}",
                        cell_key(&row[idx])
                    ))
                })?;
                let scaled = if range > 0.0 { (x - min) / range } else { 0.0 };
                row[idx] = number(scaled);
            }
            Ok(batch)
        }
    }
}

/// Code for one cell, looked up by its category key only.
///
/// A numeric cell is not taken as an existing code, so a null filled with `0`
/// in a column with a fixed mapping is reported instead of becoming class `0`.
fn label_code(value: &Value, column: &str, mapping: &BTreeMap<String, i64>) -> Result<i64> {
    mapping.get(&cell_key(value)).copied().ok_or_else(|| {
        PipelineError::preprocessing(format!(
            "unseen value '{}' in label-encoded column {column}",
            cell_key(value)
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::TempDir;

    fn batch() -> DataBatch {
        DataBatch::new(
            vec![
                "hotel".into(),
                "arrival_date_month".into(),
                "meal".into(),
                "adr".into(),
            ],
            vec![
                vec![json!("City Hotel"), json!("July"), json!("BB"), json!(100.0)],
                vec![json!("Resort Hotel"), json!("January"), json!("HB"), json!(50.0)],
                vec![json!("City Hotel"), json!("December"), json!("SC"), json!(0.0)],
            ],
        )
    }

    fn transformation() -> TransformationConfig {
        TransformationConfig {
            label_encoding: vec!["hotel".into(), "arrival_date_month".into()],
            onehot_encoding: vec!["meal".into()],
            scaling: vec!["adr".into(), "missing".into()],
        }
    }

    #[test]
    fn test_fit_encoders() {
        let mut pre = Preprocessor::new();
        let out = pre.fit_encoders(&transformation(), batch()).unwrap();

        assert_eq!(
            out.columns,
            vec!["hotel", "arrival_date_month", "adr", "meal_HB", "meal_SC"]
        );
        assert_eq!(
            out.rows[0],
            vec![json!(1), json!(7), json!(1.0), json!(0), json!(0)]
        );
        assert_eq!(
            out.rows[1],
            vec![json!(0), json!(1), json!(0.5), json!(1), json!(0)]
        );
        assert_eq!(out.rows[2][2], json!(0.0));
        assert_eq!(pre.steps.len(), 4);
    }

    #[test]
    fn test_replay_matches_fit() {
        let mut pre = Preprocessor::new();
        let fitted = pre.fit_encoders(&transformation(), batch()).unwrap();
        let replayed = pre.apply(batch()).unwrap();
        assert_eq!(replayed, fitted);
    }

    #[test]
    fn test_unknown_category_encodes_as_zeros() {
        let pre = Preprocessor::new().add_step(TransformStep::OneHot {
            column: "meal".into(),
            categories: vec!["HB".into(), "SC".into()],
        });
        let data = DataBatch::new(vec!["meal".into()], vec![vec![json!("FB")]]);
        let out = pre.apply(data).unwrap();
        assert_eq!(out.rows[0], vec![json!(0), json!(0)]);
    }

    #[test]
    fn test_unseen_label_is_an_error() {
        let mut pre = Preprocessor::new();
        pre.fit_encoders(&transformation(), batch()).unwrap();
        let mut data = batch();
        data.rows[0][0] = json!("Airport Hotel");
        let err = pre.apply(data).unwrap_err();
        assert!(matches!(err, PipelineError::Preprocessing(_)));
    }

    #[test]
    fn test_filled_null_in_fixed_mapping_is_an_error() {
        let mut pre = Preprocessor::new().add_step(TransformStep::FillNull { value: 0 });
        let mut data = batch();
        data.rows[1][0] = Value::Null;
        let data = pre.apply(data).unwrap();
        let err = pre.fit_encoders(&transformation(), data).unwrap_err();
        assert!(err.to_string().contains("column hotel"));
    }

    #[test]
    fn test_constant_column_scales_to_zero() {
        let data = DataBatch::new(vec!["x".into()], vec![vec![json!(3)], vec![json!(3)]]);
        let mut pre = Preprocessor::new();
        let cfg = TransformationConfig {
            scaling: vec!["x".into()],
            ..TransformationConfig::default()
        };
        let out = pre.fit_encoders(&cfg, data).unwrap();
        assert_eq!(out.rows[1][0], json!(0.0));
    }

    #[test]
    fn test_fill_null_and_drop() {
        let pre = Preprocessor::new()
            .add_step(TransformStep::DropColumns {
                columns: vec!["reservation_status".into()],
            })
            .add_step(TransformStep::FillNull { value: 0 });
        let data = DataBatch::new(
            vec!["agent".into(), "reservation_status".into()],
            vec![vec![Value::Null, json!("Canceled")]],
        );
        let out = pre.apply(data).unwrap();
        assert_eq!(out.columns, vec!["agent"]);
        assert_eq!(out.rows[0][0], json!(0));
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("preprocessor.json");
        let mut pre = Preprocessor::new().add_step(TransformStep::FillNull { value: 0 });
        pre.fit_encoders(&transformation(), batch()).unwrap();
        pre.save(&path).unwrap();
        assert_eq!(Preprocessor::load(&path).unwrap(), pre);
    }
}
