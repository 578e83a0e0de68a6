//! Data engineering: sources, schema, validation, preprocessing and splitting.

pub mod batch;
pub mod features;
pub mod ingestion;
pub mod noise;
pub mod preprocessing;
pub mod schema;
pub mod source;
pub mod split;
pub mod transform;
pub mod validate;

pub use batch::DataBatch;
pub use features::{FeatureMatrix, separate_features_and_target};
pub use ingestion::DataIngestion;
pub use preprocessing::DataPreprocessing;
pub use schema::SchemaConfig;
pub use source::{CsvSource, DataSource, SqliteSource, open_source};
pub use split::DataSplit;
pub use transform::Preprocessor;
pub use validate::DataValidation;
