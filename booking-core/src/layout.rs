//! Fixed artifact file locations.
//!
//! Every stage reads and writes at paths derived from a single artifacts root:
//!
//! ```text
//! artifacts/
//!   data/raw/{raw,data}.csv
//!   data/processed/processed.csv
//!   data/interim/{train,test,validation}.csv
//!   reports/validation/drift_report.yaml
//!   reports/params/params.json
//!   reports/metrics/metrics.json
//!   reports/evaluation/{report,validation}.json
//!   objects/preprocessor/preprocessor.json
//!   objects/model/model.json
//! ```

use std::path::{Path, PathBuf};

const DATA_DIR: &str = "data";
const REPORTS_DIR: &str = "reports";
const OBJECTS_DIR: &str = "objects";

const RAW_DATA_DIR: &str = "raw";
const PROCESSED_DATA_DIR: &str = "processed";
const INTERIM_DATA_DIR: &str = "interim";

const VALIDATION_REPORT_DIR: &str = "validation";
const BEST_MODEL_PARAMS_DIR: &str = "params";
const BEST_MODEL_METRICS_DIR: &str = "metrics";
const EVALUATION_REPORT_DIR: &str = "evaluation";

const PREPROCESSOR_OBJECT_DIR: &str = "preprocessor";
const MODEL_OBJECT_DIR: &str = "model";

/// Resolved artifact locations for one pipeline workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLayout {
    root: PathBuf,
}

/// Paths written by data ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionPaths {
    pub raw_file: PathBuf,
    pub data_file: PathBuf,
}

/// Paths written by data validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationPaths {
    pub report_file: PathBuf,
}

/// Paths written by data preprocessing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreprocessingPaths {
    pub processed_file: PathBuf,
    pub preprocessor_file: PathBuf,
}

/// Paths written by the data split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitPaths {
    pub train_file: PathBuf,
    pub test_file: PathBuf,
    pub validation_file: PathBuf,
}

/// Paths written by the model trainer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainerPaths {
    pub model_file: PathBuf,
    pub best_params_file: PathBuf,
    pub metrics_file: PathBuf,
}

/// Paths written by model evaluation and the validation gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationPaths {
    pub report_file: PathBuf,
    pub validation_file: PathBuf,
}

impl ArtifactLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn data(&self, sub: &str) -> PathBuf {
        self.root.join(DATA_DIR).join(sub)
    }

    fn reports(&self, sub: &str) -> PathBuf {
        self.root.join(REPORTS_DIR).join(sub)
    }

    fn objects(&self, sub: &str) -> PathBuf {
        self.root.join(OBJECTS_DIR).join(sub)
    }

    pub fn ingestion(&self) -> IngestionPaths {
        let dir = self.data(RAW_DATA_DIR);
        IngestionPaths {
            raw_file: dir.join("raw.csv"),
            data_file: dir.join("data.csv"),
        }
    }

    pub fn validation(&self) -> ValidationPaths {
        ValidationPaths {
            report_file: self.reports(VALIDATION_REPORT_DIR).join("drift_report.yaml"),
        }
    }

    pub fn preprocessing(&self) -> PreprocessingPaths {
        PreprocessingPaths {
            processed_file: self.data(PROCESSED_DATA_DIR).join("processed.csv"),
            preprocessor_file: self.objects(PREPROCESSOR_OBJECT_DIR).join("preprocessor.json"),
        }
    }

    pub fn split(&self) -> SplitPaths {
        let dir = self.data(INTERIM_DATA_DIR);
        SplitPaths {
            train_file: dir.join("train.csv"),
            test_file: dir.join("test.csv"),
            validation_file: dir.join("validation.csv"),
        }
    }

    pub fn trainer(&self) -> TrainerPaths {
        TrainerPaths {
            model_file: self.objects(MODEL_OBJECT_DIR).join("model.json"),
            best_params_file: self.reports(BEST_MODEL_PARAMS_DIR).join("params.json"),
            metrics_file: self.reports(BEST_MODEL_METRICS_DIR).join("metrics.json"),
        }
    }

    pub fn evaluation(&self) -> EvaluationPaths {
        let dir = self.reports(EVALUATION_REPORT_DIR);
        EvaluationPaths {
            report_file: dir.join("report.json"),
            validation_file: dir.join("validation.json"),
        }
    }
}
