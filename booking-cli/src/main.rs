//! Booking CLI: runs the hotel booking cancellation pipeline.
//!
//! With no subcommand the full pipeline runs: data stages, then model stages.

mod commands;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Train and validate the hotel booking cancellation model
#[derive(Parser, Debug)]
#[command(name = "booking", version, about, long_about = None)]
struct Cli {
    /// Workspace directory (holds settings/, artifacts/ and logs/)
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,

    /// Subcommand
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run ingestion, validation, preprocessing and split
    Data,
    /// Run training, evaluation and the validation gate on an existing split
    Model,
    /// Predict cancellations for a CSV of raw bookings
    Predict {
        /// CSV file with the same columns as the source table
        csv: PathBuf,

        /// Print predictions as JSON instead of CSV
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Resolve workspace
    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    // Set up tracing: human-readable stderr + JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter));

    let log_dir = workspace.join("logs");
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "booking.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let config = booking_core::load_config(Some(&workspace), None)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?
        .resolve_paths(&workspace);

    let result = match cli.command {
        Some(command) => commands::handle_command(command, &config),
        None => commands::run_full_pipeline(&config),
    };
    if let Err(e) = &result {
        tracing::error!(error = %e, "pipeline run failed");
    }
    result
}
