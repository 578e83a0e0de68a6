//! Schema conformance checks and the drift report.

use crate::data::batch::{DataBatch, as_f64, cell_key};
use crate::data::schema::{ColumnType, SchemaConfig};
use crate::data::split::shuffled_indices;
use booking_core::config::ValidationConfig;
use booking_core::layout::ValidationPaths;
use booking_core::persistence::atomic_write_yaml;
use booking_core::{DataIngestionArtifact, DataValidationArtifact, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// Everything data validation found, written as `drift_report.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataValidationReport {
    pub generated_at: chrono::DateTime<chrono::Utc>,
    pub total_rows: usize,
    pub total_columns: usize,
    pub expected_columns: usize,
    pub missing_columns: Vec<String>,
    pub unexpected_columns: Vec<String>,
    pub type_mismatches: Vec<TypeMismatch>,
    pub null_percentage: BTreeMap<String, f64>,
    pub drift: DriftReport,
    pub validation_status: bool,
    pub message: String,
}

/// A column whose values do not match its declared type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeMismatch {
    pub column: String,
    pub expected_type: ColumnType,
    /// Number of offending cells.
    pub count: usize,
    /// First offending value, for the report.
    pub example: String,
}

/// Distribution comparison between a reference and a current sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriftReport {
    pub reference_rows: usize,
    pub current_rows: usize,
    pub threshold: f64,
    pub columns: Vec<ColumnDrift>,
    pub drifted_columns: usize,
    pub share_of_drifted_columns: f64,
    pub dataset_drift: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDrift {
    pub column: String,
    pub method: DriftMethod,
    pub statistic: f64,
    pub drifted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftMethod {
    /// Two-sample Kolmogorov-Smirnov statistic.
    KolmogorovSmirnov,
    /// Total variation distance between category frequencies.
    TotalVariation,
}

/// Validates the ingested dataset against the schema.
pub struct DataValidation<'a> {
    schema: &'a SchemaConfig,
    config: ValidationConfig,
    seed: u64,
    paths: ValidationPaths,
}

impl<'a> DataValidation<'a> {
    pub fn new(
        schema: &'a SchemaConfig,
        config: ValidationConfig,
        seed: u64,
        paths: ValidationPaths,
    ) -> Self {
        Self {
            schema,
            config,
            seed,
            paths,
        }
    }

    /// Schema columns that are absent from the batch.
    pub fn missing_columns(&self, batch: &DataBatch) -> Vec<String> {
        self.schema
            .expected_columns()
            .into_iter()
            .filter(|c| !batch.has_column(&c.name))
            .map(|c| c.name.clone())
            .collect()
    }

    /// Batch columns the schema does not declare (sensitive columns count as unexpected).
    pub fn unexpected_columns(&self, batch: &DataBatch) -> Vec<String> {
        let expected = self.schema.expected_columns();
        batch
            .columns
            .iter()
            .filter(|name| !expected.iter().any(|c| &c.name == *name))
            .cloned()
            .collect()
    }

    pub fn type_mismatches(&self, batch: &DataBatch) -> Vec<TypeMismatch> {
        let mut mismatches = Vec::new();
        for column in self.schema.expected_columns() {
            let Some(values) = batch.column_values(&column.name) else {
                continue;
            };
            let offending: Vec<&Value> = values
                .into_iter()
                .filter(|v| !v.is_null() && !conforms(v, column.dtype))
                .collect();
            if let Some(first) = offending.first() {
                mismatches.push(TypeMismatch {
                    column: column.name.clone(),
                    expected_type: column.dtype,
                    count: offending.len(),
                    example: cell_key(first),
                });
            }
        }
        mismatches
    }

    /// Compare a seeded current sample against the remaining reference rows.
    pub fn detect_drift(&self, batch: &DataBatch) -> DriftReport {
        let n = batch.row_count();
        let indices = shuffled_indices(n, self.seed);
        let current_len = ((n as f64) * self.config.drift_split_ratio).round() as usize;
        let current_len = current_len.min(n);
        let (current_idx, reference_idx) = indices.split_at(current_len);
        let current = batch.select_rows(current_idx);
        let reference = batch.select_rows(reference_idx);

        let mut columns = Vec::new();
        for column in self.schema.expected_columns() {
            if !batch.has_column(&column.name) {
                continue;
            }
            let (method, statistic) = if column.dtype.is_numeric() {
                let a = numeric_sample(&reference, &column.name);
                let b = numeric_sample(&current, &column.name);
                if a.is_empty() || b.is_empty() {
                    tracing::debug!(column = %column.name, "no numeric values, skipping drift");
                    continue;
                }
                (DriftMethod::KolmogorovSmirnov, ks_statistic(a, b))
            } else {
                let a = category_sample(&reference, &column.name);
                let b = category_sample(&current, &column.name);
                if a.is_empty() || b.is_empty() {
                    continue;
                }
                (DriftMethod::TotalVariation, total_variation(&a, &b))
            };
            let drifted = statistic > self.config.drift_threshold;
            if drifted {
                tracing::warn!(column = %column.name, statistic, "column drift detected");
            }
            columns.push(ColumnDrift {
                column: column.name.clone(),
                method,
                statistic,
                drifted,
            });
        }

        let drifted_columns = columns.iter().filter(|c| c.drifted).count();
        let share_of_drifted_columns = if columns.is_empty() {
            0.0
        } else {
            drifted_columns as f64 / columns.len() as f64
        };
        DriftReport {
            reference_rows: reference.row_count(),
            current_rows: current.row_count(),
            threshold: self.config.drift_threshold,
            columns,
            drifted_columns,
            share_of_drifted_columns,
            dataset_drift: drifted_columns > 0
                && share_of_drifted_columns >= self.config.drift_share,
        }
    }

    /// Run every check and build the report.
    pub fn validate(&self, batch: &DataBatch) -> DataValidationReport {
        let missing_columns = self.missing_columns(batch);
        let unexpected_columns = self.unexpected_columns(batch);
        let type_mismatches = self.type_mismatches(batch);
        let drift = self.detect_drift(batch);
        let expected_columns = self.schema.expected_columns().len();

        let mut problems = Vec::new();
        if !missing_columns.is_empty() {
            problems.push(format!("missing columns: {}", missing_columns.join(", ")));
        }
        if batch.column_count() != expected_columns {
            problems.push(format!(
                "expected {expected_columns} columns, found {}",
                batch.column_count()
            ));
        }
        if !unexpected_columns.is_empty() {
            problems.push(format!(
                "unexpected columns: {}",
                unexpected_columns.join(", ")
            ));
        }
        for m in &type_mismatches {
            problems.push(format!(
                "column {} expected {:?} but {} values do not conform (e.g. '{}')",
                m.column, m.expected_type, m.count, m.example
            ));
        }
        if drift.dataset_drift {
            if self.config.fail_on_drift {
                problems.push(format!(
                    "dataset drift detected in {} of {} columns",
                    drift.drifted_columns,
                    drift.columns.len()
                ));
            } else {
                tracing::warn!(
                    drifted = drift.drifted_columns,
                    "dataset drift detected, not failing validation"
                );
            }
        }

        let validation_status = problems.is_empty();
        let message = if validation_status {
            "data validation passed".to_string()
        } else {
            problems.join("; ")
        };

        DataValidationReport {
            generated_at: chrono::Utc::now(),
            total_rows: batch.row_count(),
            total_columns: batch.column_count(),
            expected_columns,
            missing_columns,
            unexpected_columns,
            type_mismatches,
            null_percentage: null_percentage(batch),
            drift,
            validation_status,
            message,
        }
    }

    pub fn initiate_data_validation(
        &self,
        ingestion: &DataIngestionArtifact,
    ) -> Result<DataValidationArtifact> {
        let batch = DataBatch::read_csv(&ingestion.data_file_path)?;
        let report = self.validate(&batch);
        atomic_write_yaml(&self.paths.report_file, &report)?;

        if report.validation_status {
            tracing::info!(path = %self.paths.report_file.display(), "data validation passed");
        } else {
            tracing::warn!(message = %report.message, "data validation failed");
        }

        Ok(DataValidationArtifact {
            validation_status: report.validation_status,
            message: report.message,
            report_file_path: self.paths.report_file.clone(),
        })
    }
}

fn conforms(value: &Value, dtype: ColumnType) -> bool {
    match dtype {
        ColumnType::Int => value.as_f64().is_some_and(|f| f.fract() == 0.0),
        ColumnType::Float => value.is_number(),
        ColumnType::Bool => {
            value.is_boolean() || value.as_f64().is_some_and(|f| f == 0.0 || f == 1.0)
        }
        ColumnType::Category => true,
    }
}

fn null_percentage(batch: &DataBatch) -> BTreeMap<String, f64> {
    let total = batch.row_count().max(1) as f64;
    batch
        .columns
        .iter()
        .enumerate()
        .map(|(i, col)| {
            let nulls = batch.rows.iter().filter(|row| row[i].is_null()).count();
            (col.clone(), nulls as f64 / total * 100.0)
        })
        .collect()
}

fn numeric_sample(batch: &DataBatch, column: &str) -> Vec<f64> {
    batch
        .column_values(column)
        .unwrap_or_default()
        .into_iter()
        .filter_map(as_f64)
        .collect()
}

fn category_sample(batch: &DataBatch, column: &str) -> Vec<String> {
    batch
        .column_values(column)
        .unwrap_or_default()
        .into_iter()
        .filter(|v| !v.is_null())
        .map(cell_key)
        .collect()
}

/// Maximum distance between the two empirical distribution functions.
pub fn ks_statistic(mut a: Vec<f64>, mut b: Vec<f64>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    a.sort_by(f64::total_cmp);
    b.sort_by(f64::total_cmp);
    let (n, m) = (a.len() as f64, b.len() as f64);
    let (mut i, mut j) = (0, 0);
    let mut d: f64 = 0.0;
    while i < a.len() && j < b.len() {
        let x = a[i].min(b[j]);
        while i < a.len() && a[i] <= x {
            i += 1;
        }
        while j < b.len() && b[j] <= x {
            j += 1;
        }
        d = d.max((i as f64 / n - j as f64 / m).abs());
    }
    d
}

/// Half the L1 distance between the category frequency distributions.
pub fn total_variation(a: &[String], b: &[String]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let mut freq: HashMap<&str, (f64, f64)> = HashMap::new();
    for k in a {
        freq.entry(k.as_str()).or_default().0 += 1.0;
    }
    for k in b {
        freq.entry(k.as_str()).or_default().1 += 1.0;
    }
    let (n, m) = (a.len() as f64, b.len() as f64);
    0.5 * freq
        .values()
        .map(|(ca, cb)| (ca / n - cb / m).abs())
        .sum::<f64>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use booking_core::ArtifactLayout;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::TempDir;

    fn schema() -> SchemaConfig {
        serde_yaml::from_str(
            r#"
columns:
  - hotel: category
  - lead_time: int
  - adr: float
  - name: category
sensitive_columns: [name]
"#,
        )
        .unwrap()
    }

    fn batch(rows: usize) -> DataBatch {
        let rows = (0..rows)
            .map(|i| {
                vec![
                    json!(if i % 2 == 0 { "City Hotel" } else { "Resort Hotel" }),
                    json!(i as i64 % 7),
                    json!(50.0 + (i % 5) as f64),
                ]
            })
            .collect();
        DataBatch::new(vec!["hotel".into(), "lead_time".into(), "adr".into()], rows)
    }

    fn validator<'a>(schema: &'a SchemaConfig, dir: &TempDir) -> DataValidation<'a> {
        DataValidation::new(
            schema,
            ValidationConfig::default(),
            42,
            ArtifactLayout::new(dir.path()).validation(),
        )
    }

    #[test]
    fn test_conforming_batch_passes() {
        let schema = schema();
        let dir = TempDir::new().unwrap();
        let report = validator(&schema, &dir).validate(&batch(40));
        assert!(report.validation_status, "{}", report.message);
        assert_eq!(report.expected_columns, 3);
        assert_eq!(report.drift.reference_rows + report.drift.current_rows, 40);
    }

    #[test]
    fn test_missing_column_fails() {
        let schema = schema();
        let dir = TempDir::new().unwrap();
        let mut data = batch(10);
        data.drop_columns(&["adr".into()]);
        let report = validator(&schema, &dir).validate(&data);
        assert!(!report.validation_status);
        assert_eq!(report.missing_columns, vec!["adr"]);
        assert!(report.message.contains("missing columns: adr"));
    }

    #[test]
    fn test_sensitive_column_is_unexpected() {
        let schema = schema();
        let dir = TempDir::new().unwrap();
        let mut data = batch(4);
        data.push_column("name", vec![json!("a"); 4]).unwrap();
        let report = validator(&schema, &dir).validate(&data);
        assert!(!report.validation_status);
        assert_eq!(report.unexpected_columns, vec!["name"]);
    }

    #[test]
    fn test_type_mismatch_fails() {
        let schema = schema();
        let dir = TempDir::new().unwrap();
        let mut data = batch(6);
        data.rows[2][1] = json!("soon");
        data.rows[3][1] = json!(2.5);
        let report = validator(&schema, &dir).validate(&data);
        assert!(!report.validation_status);
        assert_eq!(report.type_mismatches.len(), 1);
        assert_eq!(report.type_mismatches[0].column, "lead_time");
        assert_eq!(report.type_mismatches[0].count, 2);
    }

    #[test]
    fn test_ks_statistic() {
        assert_eq!(ks_statistic(vec![1.0, 2.0, 3.0], vec![1.0, 2.0, 3.0]), 0.0);
        assert_eq!(ks_statistic(vec![1.0, 2.0], vec![3.0, 4.0]), 1.0);
        let d = ks_statistic(vec![1.0, 2.0, 3.0, 4.0], vec![3.0, 4.0]);
        assert!((d - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_total_variation() {
        let a: Vec<String> = ["x", "x", "y", "y"].iter().map(|s| s.to_string()).collect();
        let b: Vec<String> = ["x", "x", "x", "x"].iter().map(|s| s.to_string()).collect();
        assert!((total_variation(&a, &b) - 0.5).abs() < 1e-12);
        assert_eq!(total_variation(&a, &a), 0.0);
    }

    #[test]
    fn test_drift_fails_only_when_configured() {
        let schema = schema();
        let dir = TempDir::new().unwrap();
        let data = batch(50);
        let mut config = ValidationConfig {
            drift_threshold: -1.0,
            ..ValidationConfig::default()
        };
        let paths = ArtifactLayout::new(dir.path()).validation();

        let report = DataValidation::new(&schema, config.clone(), 7, paths.clone()).validate(&data);
        assert!(report.drift.dataset_drift);
        assert!(report.validation_status);

        config.fail_on_drift = true;
        let report = DataValidation::new(&schema, config, 7, paths).validate(&data);
        assert!(!report.validation_status);
        assert!(report.message.contains("dataset drift"));
    }

    #[test]
    fn test_initiate_writes_yaml_report() {
        let schema = schema();
        let dir = TempDir::new().unwrap();
        let data_file = dir.path().join("data.csv");
        batch(20).write_csv(&data_file).unwrap();
        let ingestion = DataIngestionArtifact {
            raw_file_path: data_file.clone(),
            data_file_path: data_file,
        };

        let artifact = validator(&schema, &dir)
            .initiate_data_validation(&ingestion)
            .unwrap();
        assert!(artifact.validation_status);
        let text = std::fs::read_to_string(&artifact.report_file_path).unwrap();
        let report: DataValidationReport = serde_yaml::from_str(&text).unwrap();
        assert_eq!(report.total_rows, 20);
    }
}
