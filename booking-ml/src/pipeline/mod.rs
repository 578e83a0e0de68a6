//! Stage orchestration.
//!
//! Each `start_*` method runs one stage and wraps its failure with the stage name
//! and the call site. Stages hand typed artifact records to the next stage; the
//! first failure stops the run.

pub mod data;
pub mod model;

pub use data::DataPipeline;
pub use model::{ModelPipeline, split_artifact_from_layout};

use crate::data::open_source;
use booking_core::{
    DataSplitArtifact, ModelValidationArtifact, PipelineConfig, Result, Stage, StageContext,
};
use uuid::Uuid;

/// Outcome of a full pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub run_id: Uuid,
    pub split: DataSplitArtifact,
    pub model_validation: ModelValidationArtifact,
}

/// Run the data pipeline and then the model pipeline.
pub fn run_pipeline(config: &PipelineConfig) -> Result<PipelineRun> {
    config.validate()?;
    let run_id = Uuid::new_v4();
    let span = tracing::info_span!("pipeline", %run_id);
    let _guard = span.enter();
    tracing::info!(artifacts = %config.artifacts_dir.display(), "pipeline started");

    let data_pipeline = DataPipeline::new(config)?;
    let model_pipeline = ModelPipeline::new(config)?;

    let source = open_source(&config.source).in_stage(Stage::Ingestion)?;
    let split = data_pipeline.run_data_pipeline(source.as_ref())?;
    let model_validation = model_pipeline.run_model_pipeline(&split)?;

    tracing::info!(
        passed = model_validation.validation_status,
        message = %model_validation.message,
        "pipeline finished"
    );
    Ok(PipelineRun {
        run_id,
        split,
        model_validation,
    })
}
