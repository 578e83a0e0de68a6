//! Evaluation on the validation split and the accuracy gate.

pub mod evaluation;
pub mod validation;

pub use evaluation::{EvaluationReport, ModelEvaluation};
pub use validation::{GateResult, ModelValidation, validate_accuracy};
