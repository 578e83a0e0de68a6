//! Model validation gate: the evaluated accuracy must reach the expected accuracy.

use crate::eval::evaluation::EvaluationReport;
use booking_core::layout::EvaluationPaths;
use booking_core::persistence::{atomic_write_json, read_json};
use booking_core::{ModelEvaluationArtifact, ModelValidationArtifact, Result};
use serde::{Deserialize, Serialize};

/// Contents of `validation.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateResult {
    pub metric: String,
    pub actual_value: f64,
    pub threshold: f64,
    pub passed: bool,
    pub message: String,
}

/// `accuracy >= threshold` passes.
pub fn validate_accuracy(accuracy: f64, threshold: f64) -> GateResult {
    let passed = accuracy >= threshold;
    let message = if passed {
        format!("model accuracy {accuracy:.4} meets threshold {threshold:.4}")
    } else {
        format!("model accuracy {accuracy:.4} below threshold {threshold:.4}")
    };
    GateResult {
        metric: "accuracy".to_string(),
        actual_value: accuracy,
        threshold,
        passed,
        message,
    }
}

pub struct ModelValidation {
    expected_accuracy: f64,
    paths: EvaluationPaths,
}

impl ModelValidation {
    pub fn new(expected_accuracy: f64, paths: EvaluationPaths) -> Self {
        Self {
            expected_accuracy,
            paths,
        }
    }

    /// A failing gate is reported through the artifact, not as an error.
    pub fn initiate_model_validation(
        &self,
        evaluation: &ModelEvaluationArtifact,
    ) -> Result<ModelValidationArtifact> {
        let report: EvaluationReport = read_json(&evaluation.report_file_path)?;
        let gate = validate_accuracy(report.accuracy, self.expected_accuracy);
        atomic_write_json(&self.paths.validation_file, &gate)?;

        if gate.passed {
            tracing::info!(model = %report.model_name, "{}", gate.message);
        } else {
            tracing::warn!(model = %report.model_name, "{}", gate.message);
        }

        Ok(ModelValidationArtifact {
            validation_status: gate.passed,
            message: gate.message,
            report_file_path: self.paths.validation_file.clone(),
        })
    }
}
