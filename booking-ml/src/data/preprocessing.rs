//! Data preprocessing stage: clean, encode and scale the ingested data.

use crate::data::batch::DataBatch;
use crate::data::noise::handle_noisy_data;
use crate::data::schema::SchemaConfig;
use crate::data::transform::{Preprocessor, TransformStep};
use booking_core::layout::PreprocessingPaths;
use booking_core::{
    DataIngestionArtifact, DataPreprocessingArtifact, DataValidationArtifact, PipelineError,
    Result,
};

/// Value missing cells are filled with.
pub const FILL_VALUE: i64 = 0;

pub struct DataPreprocessing<'a> {
    schema: &'a SchemaConfig,
    paths: PreprocessingPaths,
}

impl<'a> DataPreprocessing<'a> {
    pub fn new(schema: &'a SchemaConfig, paths: PreprocessingPaths) -> Self {
        Self { schema, paths }
    }

    /// Drop, fill, clean noise, then fit and apply the encoders.
    ///
    /// Returns the fitted preprocessor together with the transformed batch.
    pub fn preprocess(&self, batch: DataBatch) -> Result<(Preprocessor, DataBatch)> {
        let mut preprocessor = Preprocessor::new()
            .add_step(TransformStep::DropColumns {
                columns: self.schema.drop_columns.clone(),
            })
            .add_step(TransformStep::FillNull { value: FILL_VALUE });
        let mut batch = preprocessor.apply(batch)?;

        let summary = handle_noisy_data(&mut batch, &self.schema.noisy_values_columns);
        tracing::info!(
            replaced = summary.replaced_values,
            dropped_rows = summary.dropped_rows,
            "handled noisy data"
        );
        if batch.row_count() == 0 {
            return Err(PipelineError::preprocessing(
                "no rows left after removing noisy data",
            ));
        }

        let batch = preprocessor.fit_encoders(&self.schema.transformation, batch)?;
        Ok((preprocessor, batch))
    }

    pub fn initiate_data_preprocessing(
        &self,
        ingestion: &DataIngestionArtifact,
        validation: &DataValidationArtifact,
    ) -> Result<DataPreprocessingArtifact> {
        if !validation.validation_status {
            return Err(PipelineError::validation(validation.message.clone()));
        }

        let batch = DataBatch::read_csv(&ingestion.data_file_path)?;
        let rows_in = batch.row_count();
        let (preprocessor, batch) = self.preprocess(batch)?;

        batch.write_csv(&self.paths.processed_file)?;
        preprocessor.save(&self.paths.preprocessor_file)?;
        tracing::info!(
            rows_in,
            rows_out = batch.row_count(),
            columns = batch.column_count(),
            path = %self.paths.processed_file.display(),
            "preprocessed data saved"
        );

        Ok(DataPreprocessingArtifact {
            processed_data_file_path: self.paths.processed_file.clone(),
            preprocessor_file_path: self.paths.preprocessor_file.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use booking_core::ArtifactLayout;
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};
    use tempfile::TempDir;

    fn schema() -> SchemaConfig {
        serde_yaml::from_str(
            r#"
columns:
  - hotel: category
  - adults: int
  - adr: float
  - meal: category
  - reservation_status: category
drop_columns: [reservation_status]
noisy_values_columns: [adr, adults]
transformation:
  label_encoding: [hotel]
  onehot_encoding: [meal]
  scaling: [adr]
"#,
        )
        .unwrap()
    }

    fn raw() -> DataBatch {
        DataBatch::new(
            vec![
                "hotel".into(),
                "adults".into(),
                "adr".into(),
                "meal".into(),
                "reservation_status".into(),
            ],
            vec![
                vec![json!("City Hotel"), json!(2), json!(100.0), json!("BB"), json!("Check-Out")],
                vec![json!("Resort Hotel"), json!(0), json!(40.0), json!("HB"), json!("Canceled")],
                vec![json!("Resort Hotel"), json!(1), Value::Null, json!("HB"), json!("Canceled")],
            ],
        )
    }

    #[test]
    fn test_preprocess() {
        let schema = schema();
        let dir = TempDir::new().unwrap();
        let stage = DataPreprocessing::new(&schema, ArtifactLayout::new(dir.path()).preprocessing());
        let (pre, out) = stage.preprocess(raw()).unwrap();

        assert_eq!(out.columns, vec!["hotel", "adults", "adr", "meal_HB"]);
        assert_eq!(out.row_count(), 2);
        assert_eq!(out.rows[0], vec![json!(1), json!(2), json!(1.0), json!(0)]);
        assert_eq!(out.rows[1], vec![json!(0), json!(1), json!(0.0), json!(1)]);
        // drop, fill, label, one-hot, scale
        assert_eq!(pre.steps.len(), 5);
    }

    #[test]
    fn test_refuses_failed_validation() {
        let schema = schema();
        let dir = TempDir::new().unwrap();
        let stage = DataPreprocessing::new(&schema, ArtifactLayout::new(dir.path()).preprocessing());
        let ingestion = DataIngestionArtifact {
            raw_file_path: dir.path().join("raw.csv"),
            data_file_path: dir.path().join("data.csv"),
        };
        let validation = booking_core::DataValidationArtifact {
            validation_status: false,
            message: "missing columns: adr".into(),
            report_file_path: dir.path().join("drift_report.yaml"),
        };
        let err = stage
            .initiate_data_preprocessing(&ingestion, &validation)
            .unwrap_err();
        assert_eq!(err.to_string(), "Data validation error: missing columns: adr");
    }

    #[test]
    fn test_initiate_writes_artifacts() {
        let schema = schema();
        let dir = TempDir::new().unwrap();
        let data_file = dir.path().join("data.csv");
        raw().write_csv(&data_file).unwrap();
        let layout = ArtifactLayout::new(dir.path());
        let stage = DataPreprocessing::new(&schema, layout.preprocessing());
        let ingestion = DataIngestionArtifact {
            raw_file_path: data_file.clone(),
            data_file_path: data_file,
        };
        let validation = DataValidationArtifact {
            validation_status: true,
            message: "data validation passed".into(),
            report_file_path: dir.path().join("drift_report.yaml"),
        };

        let artifact = stage
            .initiate_data_preprocessing(&ingestion, &validation)
            .unwrap();
        let processed = DataBatch::read_csv(&artifact.processed_data_file_path).unwrap();
        assert_eq!(processed.row_count(), 2);
        let pre = Preprocessor::load(&artifact.preprocessor_file_path).unwrap();
        assert_eq!(pre.steps.len(), 5);
    }
}
