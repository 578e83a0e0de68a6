//! # booking-core
//!
//! Shared foundation for the hotel booking cancellation pipeline:
//!
//! - [`error`]: the single pipeline error type and stage context wrapping
//! - [`config`]: layered pipeline configuration (defaults, TOML file, environment)
//! - [`artifact`]: typed records handed from one stage to the next
//! - [`layout`]: where every stage reads and writes its files
//! - [`persistence`]: atomic JSON/YAML writes and loads

pub mod artifact;
pub mod config;
pub mod error;
pub mod layout;
pub mod persistence;

pub use artifact::{
    DataIngestionArtifact, DataPreprocessingArtifact, DataSplitArtifact, DataValidationArtifact,
    ModelEvaluationArtifact, ModelTrainerArtifact, ModelValidationArtifact,
};
pub use config::{PipelineConfig, SourceConfig, load_config};
pub use error::{PipelineError, Result, Stage, StageContext};
pub use layout::ArtifactLayout;
