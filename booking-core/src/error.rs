//! Error types for the booking pipeline.
//!
//! Every failure is a [`PipelineError`]. When a stage fails, the orchestrator wraps
//! the underlying error in [`PipelineError::Stage`], recording which stage failed and
//! the source location of the call that observed the failure.

use std::fmt;
use std::panic::Location;

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Top-level error type for pipeline operations.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Ingestion error: {0}")]
    Ingestion(String),

    #[error("Data validation error: {0}")]
    Validation(String),

    #[error("Preprocessing error: {0}")]
    Preprocessing(String),

    #[error("Split error: {0}")]
    Split(String),

    #[error("Training error: {0}")]
    Training(String),

    #[error("Evaluation error: {0}")]
    Evaluation(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Error in {stage} stage at {location}: {source}")]
    Stage {
        stage: Stage,
        location: &'static Location<'static>,
        #[source]
        source: Box<PipelineError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Configuration error: {0}")]
    Figment(#[from] Box<figment::Error>),
}

impl PipelineError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }

    pub fn ingestion(msg: impl Into<String>) -> Self {
        Self::Ingestion(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn preprocessing(msg: impl Into<String>) -> Self {
        Self::Preprocessing(msg.into())
    }

    pub fn split(msg: impl Into<String>) -> Self {
        Self::Split(msg.into())
    }

    pub fn training(msg: impl Into<String>) -> Self {
        Self::Training(msg.into())
    }

    pub fn evaluation(msg: impl Into<String>) -> Self {
        Self::Evaluation(msg.into())
    }

    pub fn model(msg: impl Into<String>) -> Self {
        Self::Model(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// The stage that failed, if this error was raised through a stage boundary.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// The innermost error, skipping any stage wrappers.
    pub fn root_cause(&self) -> &PipelineError {
        match self {
            Self::Stage { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Ingestion,
    DataValidation,
    Preprocessing,
    Split,
    Training,
    Evaluation,
    ModelValidation,
    Prediction,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ingestion => "data ingestion",
            Self::DataValidation => "data validation",
            Self::Preprocessing => "data preprocessing",
            Self::Split => "data split",
            Self::Training => "model trainer",
            Self::Evaluation => "model evaluation",
            Self::ModelValidation => "model validation",
            Self::Prediction => "prediction",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attach stage context to a failing result.
pub trait StageContext<T> {
    /// Wrap an error in [`PipelineError::Stage`], recording the caller's location.
    ///
    /// Errors that already carry stage context are passed through untouched so the
    /// innermost location is preserved.
    fn in_stage(self, stage: Stage) -> Result<T>;
}

impl<T> StageContext<T> for Result<T> {
    #[track_caller]
    fn in_stage(self, stage: Stage) -> Result<T> {
        let location = Location::caller();
        self.map_err(|err| match err {
            already @ PipelineError::Stage { .. } => already,
            other => {
                tracing::error!(%stage, %location, error = %other, "stage failed");
                PipelineError::Stage {
                    stage,
                    location,
                    source: Box::new(other),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failing() -> Result<()> {
        Err(PipelineError::training("no suitable model found"))
    }

    #[test]
    fn test_in_stage_records_location() {
        let err = failing().in_stage(Stage::Training).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Training));
        match &err {
            PipelineError::Stage { location, .. } => {
                assert!(location.file().ends_with("error.rs"));
            }
            other => panic!("expected stage error, got {other:?}"),
        }
        let msg = err.to_string();
        assert!(msg.contains("model trainer"));
        assert!(msg.contains("no suitable model found"));
    }

    #[test]
    fn test_in_stage_does_not_double_wrap() {
        let err = failing()
            .in_stage(Stage::Training)
            .in_stage(Stage::Evaluation)
            .unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Training));
        assert!(matches!(err.root_cause(), PipelineError::Training(_)));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: PipelineError = io.into();
        assert!(err.to_string().starts_with("IO error"));
        assert_eq!(err.stage(), None);
    }
}
