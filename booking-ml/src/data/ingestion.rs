//! Data ingestion: export the booking table snapshot and strip personal data.

use crate::data::batch::DataBatch;
use crate::data::source::DataSource;
use booking_core::layout::IngestionPaths;
use booking_core::{DataIngestionArtifact, PipelineError, Result};

/// Placeholder the source database uses for missing values.
pub const MISSING_PLACEHOLDER: &str = "na";

/// Exports a table snapshot into the raw data artifacts.
pub struct DataIngestion<'a> {
    source: &'a dyn DataSource,
    paths: IngestionPaths,
    sensitive_columns: Vec<String>,
}

impl<'a> DataIngestion<'a> {
    pub fn new(
        source: &'a dyn DataSource,
        paths: IngestionPaths,
        sensitive_columns: Vec<String>,
    ) -> Self {
        Self {
            source,
            paths,
            sensitive_columns,
        }
    }

    /// Load the full table, normalize missing placeholders and write `raw.csv`.
    pub fn export_data_into_raw_artifact(&self) -> Result<DataBatch> {
        let info = self.source.source_info();
        tracing::info!(
            source_type = %info.source_type,
            location = %info.location,
            "exporting source table"
        );

        let mut batch = self.source.load(None)?;
        if batch.column_count() == 0 {
            return Err(PipelineError::ingestion(format!(
                "source {} returned no columns",
                info.location
            )));
        }
        if batch.row_count() == 0 {
            return Err(PipelineError::ingestion(format!(
                "source {} returned no rows",
                info.location
            )));
        }

        let replaced = batch.replace_placeholder(MISSING_PLACEHOLDER);
        tracing::debug!(replaced, "replaced missing placeholders with null");

        batch.write_csv(&self.paths.raw_file)?;
        tracing::info!(
            rows = batch.row_count(),
            columns = batch.column_count(),
            path = %self.paths.raw_file.display(),
            "raw data exported"
        );
        Ok(batch)
    }

    /// Remove every sensitive column present in the batch.
    pub fn drop_sensitive_columns(&self, batch: &mut DataBatch) -> Vec<String> {
        let dropped = batch.drop_columns(&self.sensitive_columns);
        for name in &self.sensitive_columns {
            if !dropped.contains(name) {
                tracing::debug!(column = %name, "sensitive column not present, skipping");
            }
        }
        dropped
    }

    pub fn initiate_data_ingestion(&self) -> Result<DataIngestionArtifact> {
        let mut batch = self.export_data_into_raw_artifact()?;
        let dropped = self.drop_sensitive_columns(&mut batch);
        tracing::info!(?dropped, "dropped sensitive columns");

        batch.write_csv(&self.paths.data_file)?;

        Ok(DataIngestionArtifact {
            raw_file_path: self.paths.raw_file.clone(),
            data_file_path: self.paths.data_file.clone(),
        })
    }
}
