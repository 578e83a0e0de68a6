//! Artifact records handed from one pipeline stage to the next.
//!
//! Each record is produced once per run by its stage. Every path it carries points
//! to a file the producing stage has already written.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Output of data ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataIngestionArtifact {
    /// Snapshot exactly as exported from the source.
    pub raw_file_path: PathBuf,
    /// Snapshot with sensitive columns removed.
    pub data_file_path: PathBuf,
}

/// Output of data validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataValidationArtifact {
    pub validation_status: bool,
    pub message: String,
    pub report_file_path: PathBuf,
}

/// Output of data preprocessing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataPreprocessingArtifact {
    pub processed_data_file_path: PathBuf,
    /// Fitted encoders and scaler, reusable at inference time.
    pub preprocessor_file_path: PathBuf,
}

/// Output of the train/test/validation split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSplitArtifact {
    pub train_file_path: PathBuf,
    pub test_file_path: PathBuf,
    pub validation_file_path: PathBuf,
}

/// Output of the model trainer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelTrainerArtifact {
    pub model_file_path: PathBuf,
    pub best_params_file_path: PathBuf,
    pub metrics_file_path: PathBuf,
}

/// Output of model evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelEvaluationArtifact {
    pub report_file_path: PathBuf,
}

/// Output of the model validation gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelValidationArtifact {
    pub validation_status: bool,
    pub message: String,
    pub report_file_path: PathBuf,
}
