//! The persisted cancellation model.

use crate::algorithms::{ClassicalAlgorithm, Estimator};
use crate::data::batch::DataBatch;
use crate::data::features::FeatureMatrix;
use booking_core::persistence::{atomic_write_json, read_json};
use booking_core::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;

/// A fitted estimator together with the feature layout it was trained on.
///
/// Prediction takes a preprocessed [`DataBatch`]; the feature columns are
/// selected by name in training order, so extra columns (including the target)
/// are ignored and missing ones are an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingModel {
    pub name: String,
    pub target_column: String,
    pub feature_names: Vec<String>,
    /// Full parameter set the estimator was built from.
    pub params: Map<String, Value>,
    pub estimator: ClassicalAlgorithm,
    pub trained_at: DateTime<Utc>,
}

impl BookingModel {
    pub fn new(
        name: impl Into<String>,
        target_column: impl Into<String>,
        feature_names: Vec<String>,
        params: Map<String, Value>,
        estimator: ClassicalAlgorithm,
    ) -> Self {
        Self {
            name: name.into(),
            target_column: target_column.into(),
            feature_names,
            params,
            estimator,
            trained_at: Utc::now(),
        }
    }

    pub fn features(&self, batch: &DataBatch) -> Result<FeatureMatrix> {
        FeatureMatrix::from_batch(batch, &self.feature_names)
    }

    pub fn predict(&self, batch: &DataBatch) -> Result<Vec<u8>> {
        self.estimator.predict(&self.features(batch)?)
    }

    pub fn predict_proba(&self, batch: &DataBatch) -> Result<Vec<f64>> {
        self.estimator.predict_proba(&self.features(batch)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        atomic_write_json(path, self)?;
        tracing::info!(model = %self.name, path = %path.display(), "model saved");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        read_json(path)
    }
}

impl fmt::Display for BookingModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, {} features, trained {})",
            self.name,
            self.estimator.family(),
            self.feature_names.len(),
            self.trained_at.format("%Y-%m-%d %H:%M:%S")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use booking_core::PipelineError;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::TempDir;

    fn fitted() -> BookingModel {
        let x = FeatureMatrix {
            feature_names: vec!["lead_time".into(), "adr".into()],
            rows: (0..20).map(|i| vec![i as f64, 1.0]).collect(),
        };
        let y: Vec<u8> = (0..20).map(|i| u8::from(i >= 10)).collect();
        let mut estimator =
            ClassicalAlgorithm::from_params("decision_tree", &Map::new()).unwrap();
        estimator.fit(&x, &y).unwrap();
        BookingModel::new("dtc", "is_canceled", x.feature_names, Map::new(), estimator)
    }

    #[test]
    fn test_predict_selects_columns_by_name() {
        let model = fitted();
        let batch = DataBatch::new(
            vec!["is_canceled".into(), "adr".into(), "lead_time".into()],
            vec![
                vec![json!(0), json!(1.0), json!(2)],
                vec![json!(1), json!(1.0), json!(15)],
            ],
        );
        assert_eq!(model.predict(&batch).unwrap(), vec![0, 1]);
        let proba = model.predict_proba(&batch).unwrap();
        assert!(proba[0] < 0.5 && proba[1] >= 0.5);
    }

    #[test]
    fn test_missing_feature_column() {
        let batch = DataBatch::new(vec!["adr".into()], vec![vec![json!(1.0)]]);
        assert!(matches!(
            fitted().predict(&batch).unwrap_err(),
            PipelineError::InvalidInput(_)
        ));
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model").join("model.json");
        let model = fitted();
        model.save(&path).unwrap();
        let loaded = BookingModel::load(&path).unwrap();
        assert_eq!(
            serde_json::to_value(&loaded).unwrap(),
            serde_json::to_value(&model).unwrap()
        );
        assert!(loaded.to_string().starts_with("dtc (decision_tree, 2 features"));
    }
}
