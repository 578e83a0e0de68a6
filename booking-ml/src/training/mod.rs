//! Training: candidate configuration, metrics, grid search and the trainer stage.

pub mod metrics;
pub mod model;
pub mod model_config;
pub mod sweep;
pub mod trainer;

pub use metrics::{ClassificationMetrics, ConfusionMatrix, Scoring};
pub use model::BookingModel;
pub use model_config::{ModelCandidate, ModelConfig};
pub use sweep::GridSearch;
pub use trainer::{ModelTrainer, select_best};
