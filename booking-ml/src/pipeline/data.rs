//! Data pipeline: ingestion, validation, preprocessing and split.

use crate::data::{
    DataIngestion, DataPreprocessing, DataSource, DataSplit, DataValidation, SchemaConfig,
};
use booking_core::{
    ArtifactLayout, DataIngestionArtifact, DataPreprocessingArtifact, DataSplitArtifact,
    DataValidationArtifact, PipelineConfig, Result, Stage, StageContext,
};

pub struct DataPipeline<'a> {
    config: &'a PipelineConfig,
    layout: ArtifactLayout,
    schema: SchemaConfig,
}

impl<'a> DataPipeline<'a> {
    pub fn new(config: &'a PipelineConfig) -> Result<Self> {
        // ingestion is the first consumer of the schema
        let schema = SchemaConfig::load(&config.schema_file).in_stage(Stage::Ingestion)?;
        Ok(Self {
            config,
            layout: ArtifactLayout::new(&config.artifacts_dir),
            schema,
        })
    }

    pub fn schema(&self) -> &SchemaConfig {
        &self.schema
    }

    pub fn start_data_ingestion(&self, source: &dyn DataSource) -> Result<DataIngestionArtifact> {
        tracing::info!("entered data ingestion");
        let artifact = DataIngestion::new(
            source,
            self.layout.ingestion(),
            self.schema.sensitive_columns.clone(),
        )
        .initiate_data_ingestion()
        .in_stage(Stage::Ingestion)?;
        tracing::info!(path = %artifact.data_file_path.display(), "exited data ingestion");
        Ok(artifact)
    }

    pub fn start_data_validation(
        &self,
        ingestion: &DataIngestionArtifact,
    ) -> Result<DataValidationArtifact> {
        tracing::info!("entered data validation");
        let artifact = DataValidation::new(
            &self.schema,
            self.config.validation.clone(),
            self.config.split.seed,
            self.layout.validation(),
        )
        .initiate_data_validation(ingestion)
        .in_stage(Stage::DataValidation)?;
        tracing::info!(
            status = artifact.validation_status,
            path = %artifact.report_file_path.display(),
            "exited data validation"
        );
        Ok(artifact)
    }

    pub fn start_data_preprocessing(
        &self,
        ingestion: &DataIngestionArtifact,
        validation: &DataValidationArtifact,
    ) -> Result<DataPreprocessingArtifact> {
        tracing::info!("entered data preprocessing");
        let artifact = DataPreprocessing::new(&self.schema, self.layout.preprocessing())
            .initiate_data_preprocessing(ingestion, validation)
            .in_stage(Stage::Preprocessing)?;
        tracing::info!(
            path = %artifact.processed_data_file_path.display(),
            "exited data preprocessing"
        );
        Ok(artifact)
    }

    pub fn start_data_split(
        &self,
        preprocessing: &DataPreprocessingArtifact,
    ) -> Result<DataSplitArtifact> {
        tracing::info!("entered data split");
        let artifact = DataSplit::new(self.config.split.clone(), self.layout.split())
            .initiate_data_split(preprocessing)
            .in_stage(Stage::Split)?;
        tracing::info!(path = %artifact.train_file_path.display(), "exited data split");
        Ok(artifact)
    }

    /// Ingest, validate, preprocess and split, in that order.
    pub fn run_data_pipeline(&self, source: &dyn DataSource) -> Result<DataSplitArtifact> {
        let ingestion = self.start_data_ingestion(source)?;
        let validation = self.start_data_validation(&ingestion)?;
        let preprocessing = self.start_data_preprocessing(&ingestion, &validation)?;
        self.start_data_split(&preprocessing)
    }
}
