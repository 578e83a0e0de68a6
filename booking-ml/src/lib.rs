//! # booking-ml: Data Engineering, Training & Evaluation
//!
//! Stages of the hotel booking cancellation pipeline, each reading the artifacts of
//! the previous stage and writing its own under the artifacts root:
//!
//! 1. **Ingestion**: table snapshot from SQLite or CSV, sensitive columns removed
//! 2. **Data validation**: schema conformance and a drift report
//! 3. **Preprocessing**: cleaning, encoding and scaling with a persisted preprocessor
//! 4. **Split**: seeded train/test/validation split
//! 5. **Training**: cached parameters or grid search, best recall wins
//! 6. **Evaluation**: validation-split report and the accuracy gate

// Data Engineering
pub mod data;

// Estimators
pub mod algorithms;

// Training & Evaluation
pub mod eval;
pub mod training;

// Orchestration & Inference
pub mod pipeline;
pub mod prediction;

pub use pipeline::{DataPipeline, ModelPipeline, PipelineRun, run_pipeline};
pub use prediction::{Prediction, Predictor, predict_file};
pub use training::BookingModel;
