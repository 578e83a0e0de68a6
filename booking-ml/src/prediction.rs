//! Batch prediction with the persisted preprocessor and model.

use crate::data::batch::DataBatch;
use crate::data::ingestion::MISSING_PLACEHOLDER;
use crate::data::transform::Preprocessor;
use crate::training::model::BookingModel;
use booking_core::{ArtifactLayout, PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Prediction for one input row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Zero-based row index in the input file.
    pub row: usize,
    pub prediction: u8,
    /// Probability of cancellation.
    pub probability: f64,
}

/// Fitted preprocessor and model loaded from an artifacts directory.
pub struct Predictor {
    preprocessor: Preprocessor,
    model: BookingModel,
}

impl Predictor {
    pub fn new(preprocessor: Preprocessor, model: BookingModel) -> Self {
        Self {
            preprocessor,
            model,
        }
    }

    pub fn from_layout(layout: &ArtifactLayout) -> Result<Self> {
        let preprocessor = Preprocessor::load(&layout.preprocessing().preprocessor_file)?;
        let model = BookingModel::load(&layout.trainer().model_file)?;
        tracing::info!(model = %model, "loaded model for prediction");
        Ok(Self::new(preprocessor, model))
    }

    pub fn model(&self) -> &BookingModel {
        &self.model
    }

    /// Transform raw rows and predict. Noisy rows are kept, never dropped.
    pub fn predict_batch(&self, mut batch: DataBatch) -> Result<Vec<Prediction>> {
        if batch.row_count() == 0 {
            return Err(PipelineError::invalid_input("no rows to predict"));
        }
        batch.replace_placeholder(MISSING_PLACEHOLDER);
        let batch = self.preprocessor.apply(batch)?;
        let proba = self.model.predict_proba(&batch)?;
        let labels = self.model.predict(&batch)?;
        Ok(proba
            .into_iter()
            .zip(labels)
            .enumerate()
            .map(|(row, (probability, prediction))| Prediction {
                row,
                prediction,
                probability,
            })
            .collect())
    }
}

/// Predict every row of a raw CSV file using the artifacts under `layout`.
pub fn predict_file(layout: &ArtifactLayout, csv_path: &Path) -> Result<Vec<Prediction>> {
    let predictor = Predictor::from_layout(layout)?;
    let batch = DataBatch::read_csv(csv_path)?;
    let predictions = predictor.predict_batch(batch)?;
    tracing::info!(
        rows = predictions.len(),
        cancellations = predictions.iter().filter(|p| p.prediction == 1).count(),
        "predicted"
    );
    Ok(predictions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::{ClassicalAlgorithm, Estimator};
    use crate::data::features::FeatureMatrix;
    use crate::data::transform::TransformStep;
    use pretty_assertions::assert_eq;
    use serde_json::{Map, json};
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn predictor() -> Predictor {
        let preprocessor = Preprocessor::new()
            .add_step(TransformStep::DropColumns {
                columns: vec!["reservation_status".into()],
            })
            .add_step(TransformStep::FillNull { value: 0 })
            .add_step(TransformStep::LabelEncode {
                column: "hotel".into(),
                mapping: BTreeMap::from([("City Hotel".into(), 1), ("Resort Hotel".into(), 0)]),
            });

        let x = FeatureMatrix {
            feature_names: vec!["hotel".into(), "lead_time".into()],
            rows: (0..20).map(|i| vec![(i % 2) as f64, i as f64]).collect(),
        };
        let y: Vec<u8> = (0..20).map(|i| u8::from(i >= 10)).collect();
        let mut estimator =
            ClassicalAlgorithm::from_params("decision_tree", &Map::new()).unwrap();
        estimator.fit(&x, &y).unwrap();
        let model = BookingModel::new("dtc", "is_canceled", x.feature_names, Map::new(), estimator);
        Predictor::new(preprocessor, model)
    }

    #[test]
    fn test_predict_batch_applies_preprocessor() {
        let batch = DataBatch::new(
            vec![
                "hotel".into(),
                "lead_time".into(),
                "reservation_status".into(),
            ],
            vec![
                vec![json!("City Hotel"), json!(3), json!("Check-Out")],
                vec![json!("Resort Hotel"), json!(17), json!("Canceled")],
                vec![json!("Resort Hotel"), json!("na"), json!("Canceled")],
            ],
        );
        let predictions = predictor().predict_batch(batch).unwrap();
        let labels: Vec<u8> = predictions.iter().map(|p| p.prediction).collect();
        assert_eq!(labels, vec![0, 1, 0]);
        assert_eq!(predictions[2].row, 2);
    }

    #[test]
    fn test_predict_file_missing_artifacts() {
        let dir = TempDir::new().unwrap();
        let csv = dir.path().join("bookings.csv");
        std::fs::write(&csv, "hotel,lead_time\nCity Hotel,3\n").unwrap();
        let err = predict_file(&ArtifactLayout::new(dir.path()), &csv).unwrap_err();
        assert!(matches!(err, PipelineError::NotFound(_)));
    }
}
