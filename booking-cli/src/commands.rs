//! CLI subcommand handlers.

use crate::Commands;
use booking_core::{ArtifactLayout, PipelineConfig};
use booking_ml::data::open_source;
use booking_ml::pipeline::split_artifact_from_layout;
use booking_ml::{DataPipeline, ModelPipeline, Prediction, predict_file, run_pipeline};
use std::fmt::Write as _;
use std::path::Path;

/// Handle a CLI subcommand.
pub(crate) fn handle_command(command: Commands, config: &PipelineConfig) -> anyhow::Result<()> {
    config.validate()?;
    match command {
        Commands::Data => handle_data(config),
        Commands::Model => handle_model(config),
        Commands::Predict { csv, json } => handle_predict(config, &csv, json),
    }
}

pub(crate) fn run_full_pipeline(config: &PipelineConfig) -> anyhow::Result<()> {
    let run = run_pipeline(config)?;
    println!("Run {}", run.run_id);
    print_gate(
        run.model_validation.validation_status,
        &run.model_validation.message,
    );
    Ok(())
}

fn handle_data(config: &PipelineConfig) -> anyhow::Result<()> {
    let pipeline = DataPipeline::new(config)?;
    let source = open_source(&config.source)?;
    let split = pipeline.run_data_pipeline(source.as_ref())?;
    println!("Train split:      {}", split.train_file_path.display());
    println!("Test split:       {}", split.test_file_path.display());
    println!("Validation split: {}", split.validation_file_path.display());
    Ok(())
}

fn handle_model(config: &PipelineConfig) -> anyhow::Result<()> {
    let split = split_artifact_from_layout(&ArtifactLayout::new(&config.artifacts_dir))?;
    let validation = ModelPipeline::new(config)?.run_model_pipeline(&split)?;
    print_gate(validation.validation_status, &validation.message);
    Ok(())
}

fn handle_predict(config: &PipelineConfig, csv: &Path, json: bool) -> anyhow::Result<()> {
    let predictions = predict_file(&ArtifactLayout::new(&config.artifacts_dir), csv)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&predictions)?);
    } else {
        print!("{}", format_predictions(&predictions));
    }
    Ok(())
}

fn print_gate(passed: bool, message: &str) {
    if passed {
        println!("Model validation passed: {message}");
    } else {
        println!("Model validation failed: {message}");
    }
}

/// `row,prediction,probability` lines with a header.
fn format_predictions(predictions: &[Prediction]) -> String {
    let mut out = String::from("row,prediction,probability\n");
    for p in predictions {
        let _ = writeln!(out, "{},{},{:.4}", p.row, p.prediction, p.probability);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_format_predictions() {
        let predictions = vec![
            Prediction {
                row: 0,
                prediction: 1,
                probability: 0.87654,
            },
            Prediction {
                row: 1,
                prediction: 0,
                probability: 0.1,
            },
        ];
        assert_eq!(
            format_predictions(&predictions),
            "row,prediction,probability\n0,1,0.8765\n1,0,0.1000\n"
        );
    }

    #[test]
    fn test_model_without_split_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = PipelineConfig::default().resolve_paths(dir.path());
        assert!(handle_model(&config).is_err());
    }
}
