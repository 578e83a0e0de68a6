//! Model pipeline: trainer, evaluation and the validation gate.

use crate::eval::{ModelEvaluation, ModelValidation};
use crate::training::{ModelConfig, ModelTrainer};
use booking_core::{
    ArtifactLayout, DataSplitArtifact, ModelEvaluationArtifact, ModelTrainerArtifact,
    ModelValidationArtifact, PipelineConfig, PipelineError, Result, Stage, StageContext,
};

pub struct ModelPipeline<'a> {
    config: &'a PipelineConfig,
    layout: ArtifactLayout,
    model_config: ModelConfig,
}

impl<'a> ModelPipeline<'a> {
    pub fn new(config: &'a PipelineConfig) -> Result<Self> {
        let model_config =
            ModelConfig::load(&config.model_params_file).in_stage(Stage::Training)?;
        Ok(Self {
            config,
            layout: ArtifactLayout::new(&config.artifacts_dir),
            model_config,
        })
    }

    pub fn start_model_trainer(&self, split: &DataSplitArtifact) -> Result<ModelTrainerArtifact> {
        tracing::info!("entered model trainer");
        let artifact = ModelTrainer::new(
            &self.model_config,
            self.config.training.clone(),
            self.config.target_column.clone(),
            self.layout.trainer(),
        )
        .initiate_model_trainer(split)
        .in_stage(Stage::Training)?;
        tracing::info!(path = %artifact.model_file_path.display(), "exited model trainer");
        Ok(artifact)
    }

    pub fn start_model_evaluation(
        &self,
        split: &DataSplitArtifact,
        trainer: &ModelTrainerArtifact,
    ) -> Result<ModelEvaluationArtifact> {
        tracing::info!("entered model evaluation");
        let artifact = ModelEvaluation::new(self.layout.evaluation())
            .initiate_model_evaluation(split, trainer)
            .in_stage(Stage::Evaluation)?;
        tracing::info!(path = %artifact.report_file_path.display(), "exited model evaluation");
        Ok(artifact)
    }

    pub fn start_model_validation(
        &self,
        evaluation: &ModelEvaluationArtifact,
    ) -> Result<ModelValidationArtifact> {
        tracing::info!("entered model validation");
        let artifact = ModelValidation::new(
            self.config.evaluation.expected_accuracy,
            self.layout.evaluation(),
        )
        .initiate_model_validation(evaluation)
        .in_stage(Stage::ModelValidation)?;
        tracing::info!(status = artifact.validation_status, "exited model validation");
        Ok(artifact)
    }

    /// Train, evaluate and validate, in that order.
    pub fn run_model_pipeline(&self, split: &DataSplitArtifact) -> Result<ModelValidationArtifact> {
        let trainer = self.start_model_trainer(split)?;
        let evaluation = self.start_model_evaluation(split, &trainer)?;
        self.start_model_validation(&evaluation)
    }
}

/// Split artifact of a previous data pipeline run under `layout`.
pub fn split_artifact_from_layout(layout: &ArtifactLayout) -> Result<DataSplitArtifact> {
    let paths = layout.split();
    for path in [&paths.train_file, &paths.test_file, &paths.validation_file] {
        if !path.exists() {
            return Err(PipelineError::not_found(format!(
                "{} does not exist; run the data pipeline first",
                path.display()
            )));
        }
    }
    Ok(DataSplitArtifact {
        train_file_path: paths.train_file,
        test_file_path: paths.test_file,
        validation_file_path: paths.validation_file,
    })
}
