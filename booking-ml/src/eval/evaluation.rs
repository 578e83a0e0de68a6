//! Model evaluation stage: score the trained model on the held-out validation split.

use crate::data::batch::DataBatch;
use crate::data::features::separate_features_and_target;
use crate::training::metrics::{
    ClassReport, ConfusionMatrix, classification_report, roc_auc, weighted_average,
};
use crate::training::model::BookingModel;
use booking_core::layout::EvaluationPaths;
use booking_core::persistence::atomic_write_json;
use booking_core::{
    DataSplitArtifact, ModelEvaluationArtifact, ModelTrainerArtifact, PipelineError, Result,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Contents of `report.json`.
///
/// Precision, recall and F1 are support-weighted over both classes; AUC is for
/// the positive class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub model_name: String,
    pub evaluated_at: DateTime<Utc>,
    pub samples: usize,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub auc: Option<f64>,
    /// `[[tn, fp], [fn, tp]]`
    pub confusion_matrix: [[usize; 2]; 2],
    pub classification_report: BTreeMap<String, ClassReport>,
}

impl EvaluationReport {
    pub fn from_predictions(
        model_name: impl Into<String>,
        y_true: &[u8],
        y_pred: &[u8],
        proba: &[f64],
    ) -> Self {
        let cm = ConfusionMatrix::from_labels(y_true, y_pred);
        Self {
            model_name: model_name.into(),
            evaluated_at: Utc::now(),
            samples: y_true.len(),
            accuracy: cm.accuracy(),
            precision: weighted_average(&cm, ConfusionMatrix::precision),
            recall: weighted_average(&cm, ConfusionMatrix::recall),
            f1_score: weighted_average(&cm, ConfusionMatrix::f1),
            auc: roc_auc(y_true, proba),
            confusion_matrix: cm.to_matrix(),
            classification_report: classification_report(&cm),
        }
    }
}

pub struct ModelEvaluation {
    paths: EvaluationPaths,
}

impl ModelEvaluation {
    pub fn new(paths: EvaluationPaths) -> Self {
        Self { paths }
    }

    pub fn evaluate(&self, model: &BookingModel, batch: &DataBatch) -> Result<EvaluationReport> {
        if batch.row_count() == 0 {
            return Err(PipelineError::evaluation("validation split is empty"));
        }
        let (_, y_true) = separate_features_and_target(batch, &model.target_column)?;
        let proba = model.predict_proba(batch)?;
        let y_pred = model.predict(batch)?;
        Ok(EvaluationReport::from_predictions(
            &model.name,
            &y_true,
            &y_pred,
            &proba,
        ))
    }

    pub fn initiate_model_evaluation(
        &self,
        split: &DataSplitArtifact,
        trainer: &ModelTrainerArtifact,
    ) -> Result<ModelEvaluationArtifact> {
        let model = BookingModel::load(&trainer.model_file_path)?;
        let batch = DataBatch::read_csv(&split.validation_file_path)?;
        let report = self.evaluate(&model, &batch)?;

        atomic_write_json(&self.paths.report_file, &report)?;
        tracing::info!(
            model = %model.name,
            samples = report.samples,
            accuracy = report.accuracy,
            f1_score = report.f1_score,
            auc = ?report.auc,
            path = %self.paths.report_file.display(),
            "evaluation report saved"
        );

        Ok(ModelEvaluationArtifact {
            report_file_path: self.paths.report_file.clone(),
        })
    }
}
