//! Configuration system for the booking pipeline.
//!
//! Uses `figment` for layered configuration: defaults -> `settings/pipeline.toml`
//! -> environment (`BOOKING_*`) -> explicit overrides.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, Result};

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Root directory for every artifact the pipeline writes.
    #[serde(default = "default_artifacts_dir")]
    pub artifacts_dir: PathBuf,
    /// Column roles and types (YAML).
    #[serde(default = "default_schema_file")]
    pub schema_file: PathBuf,
    /// Candidate models and search grids (YAML).
    #[serde(default = "default_model_params_file")]
    pub model_params_file: PathBuf,
    /// Binary label column.
    #[serde(default = "default_target_column")]
    pub target_column: String,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub split: SplitConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub training: TrainingConfig,
    #[serde(default)]
    pub evaluation: EvaluationConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            artifacts_dir: default_artifacts_dir(),
            schema_file: default_schema_file(),
            model_params_file: default_model_params_file(),
            target_column: default_target_column(),
            source: SourceConfig::default(),
            split: SplitConfig::default(),
            validation: ValidationConfig::default(),
            training: TrainingConfig::default(),
            evaluation: EvaluationConfig::default(),
        }
    }
}

fn default_artifacts_dir() -> PathBuf {
    PathBuf::from("artifacts")
}

fn default_schema_file() -> PathBuf {
    PathBuf::from("settings").join("schema.yaml")
}

fn default_model_params_file() -> PathBuf {
    PathBuf::from("settings").join("model.yaml")
}

fn default_target_column() -> String {
    "is_canceled".to_string()
}

/// Where the booking table snapshot comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceConfig {
    Sqlite {
        path: PathBuf,
        #[serde(default = "default_table")]
        table: String,
    },
    Csv {
        path: PathBuf,
    },
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self::Sqlite {
            path: PathBuf::from("data").join("projects_db.sqlite"),
            table: default_table(),
        }
    }
}

fn default_table() -> String {
    "hotel_booking".to_string()
}

/// Train/test/validation split settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitConfig {
    /// Share of rows held out of the training set.
    #[serde(default = "default_test_ratio")]
    pub test_ratio: f64,
    /// Share of the held-out rows assigned to validation.
    #[serde(default = "default_validation_ratio")]
    pub validation_ratio: f64,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_ratio: default_test_ratio(),
            validation_ratio: default_validation_ratio(),
            seed: default_seed(),
        }
    }
}

fn default_test_ratio() -> f64 {
    0.3
}

fn default_validation_ratio() -> f64 {
    0.5
}

fn default_seed() -> u64 {
    42
}

/// Data validation and drift report settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Share of ingested rows used as the "current" sample in the drift report.
    #[serde(default = "default_drift_split_ratio")]
    pub drift_split_ratio: f64,
    /// Per-column statistic above which a column is reported as drifted.
    #[serde(default = "default_drift_threshold")]
    pub drift_threshold: f64,
    /// Share of drifted columns at which the whole dataset is reported as drifted.
    #[serde(default = "default_drift_share")]
    pub drift_share: f64,
    /// Fail validation when dataset drift is detected.
    #[serde(default)]
    pub fail_on_drift: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            drift_split_ratio: default_drift_split_ratio(),
            drift_threshold: default_drift_threshold(),
            drift_share: default_drift_share(),
            fail_on_drift: false,
        }
    }
}

fn default_drift_split_ratio() -> f64 {
    0.2
}

fn default_drift_threshold() -> f64 {
    0.1
}

fn default_drift_share() -> f64 {
    0.5
}

/// Model trainer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Share of the training split used for hyperparameter search.
    #[serde(default = "default_tuning_fraction")]
    pub tuning_fraction: f64,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            tuning_fraction: default_tuning_fraction(),
            seed: default_seed(),
        }
    }
}

fn default_tuning_fraction() -> f64 {
    0.3
}

/// Model evaluation and validation gate settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Minimum accuracy for the model validation gate to pass.
    #[serde(default = "default_expected_accuracy")]
    pub expected_accuracy: f64,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            expected_accuracy: default_expected_accuracy(),
        }
    }
}

fn default_expected_accuracy() -> f64 {
    0.8
}

impl PipelineConfig {
    /// Make every relative path absolute against `root`.
    pub fn resolve_paths(mut self, root: &Path) -> Self {
        let resolve = |p: &Path| {
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                root.join(p)
            }
        };
        self.artifacts_dir = resolve(&self.artifacts_dir);
        self.schema_file = resolve(&self.schema_file);
        self.model_params_file = resolve(&self.model_params_file);
        self.source = match self.source {
            SourceConfig::Sqlite { path, table } => SourceConfig::Sqlite {
                path: resolve(&path),
                table,
            },
            SourceConfig::Csv { path } => SourceConfig::Csv {
                path: resolve(&path),
            },
        };
        self
    }

    /// Reject settings no stage can work with.
    pub fn validate(&self) -> Result<()> {
        let unit = |name: &str, v: f64| {
            if v > 0.0 && v < 1.0 {
                Ok(())
            } else {
                Err(PipelineError::config(format!(
                    "{name} must be in (0, 1), got {v}"
                )))
            }
        };
        unit("split.test_ratio", self.split.test_ratio)?;
        unit("split.validation_ratio", self.split.validation_ratio)?;
        unit("validation.drift_split_ratio", self.validation.drift_split_ratio)?;
        unit("training.tuning_fraction", self.training.tuning_fraction)?;
        if !(0.0..=1.0).contains(&self.evaluation.expected_accuracy) {
            return Err(PipelineError::config(format!(
                "evaluation.expected_accuracy must be in [0, 1], got {}",
                self.evaluation.expected_accuracy
            )));
        }
        if self.target_column.trim().is_empty() {
            return Err(PipelineError::config("target_column must not be empty"));
        }
        Ok(())
    }
}

/// Path of the workspace-level pipeline settings file.
pub fn settings_path(workspace: &Path) -> PathBuf {
    workspace.join("settings").join("pipeline.toml")
}

/// Load configuration from defaults, the workspace settings file, and environment.
pub fn load_config(
    workspace: Option<&Path>,
    overrides: Option<&PipelineConfig>,
) -> std::result::Result<PipelineConfig, Box<figment::Error>> {
    let mut figment = Figment::from(Serialized::defaults(PipelineConfig::default()));

    // Workspace-level config
    if let Some(ws) = workspace {
        let ws_config = settings_path(ws);
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    // Environment variables (BOOKING_SOURCE__PATH, BOOKING_EVALUATION__EXPECTED_ACCURACY, etc.)
    figment = figment.merge(Env::prefixed("BOOKING_").split("__"));

    // Explicit overrides
    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    figment.extract().map_err(Box::new)
}
