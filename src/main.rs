//! Churnflow: Churn-Prediction Pipeline CLI
//!
//! Two batch entry points over local files: `train` fits and persists a
//! score-named model artifact from the most recent raw training file;
//! `infer` scores the most recent raw inference file with the best
//! persisted artifact.

mod cli;
mod config;
mod inference;
mod model;
mod pipeline;
mod report;
mod tracking;
mod utils;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use config::Settings;
use inference::make_inference;
use model::train_and_validate;
use pipeline::data_load_pipeline;
use tracking::{FileTracker, EXPERIMENT_NAME, RUN_NAME};
use utils::{print_banner, print_completion, print_config, print_step_header, print_success};

fn main() -> Result<()> {
    // Logging is configured exactly once here; components receive no other
    // process-wide state.
    init_logging();

    let cli = Cli::parse();
    let settings = Settings::resolve(cli.root.clone())?;

    print_banner(env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Train => run_training(&settings),
        Commands::Infer => run_inference(&settings),
    }
}

fn run_training(settings: &Settings) -> Result<()> {
    let training_dir = settings.training_raw_dir();
    print_config(&training_dir, &settings.models_dir(), &settings.tracking_uri);

    print_step_header(1, "Load Training Data");
    let spinner = utils::create_spinner("Loading most recent training batch...");
    let customer_churn_df = data_load_pipeline(&training_dir)?;
    utils::finish_with_success(&spinner, "Training data loaded");
    print_success(&format!(
        "Loaded {} rows x {} columns",
        customer_churn_df.height(),
        customer_churn_df.width()
    ));

    print_step_header(2, "Train & Validate");
    let mut tracker = FileTracker::new(&settings.tracking_uri, EXPERIMENT_NAME, RUN_NAME);
    let artifact_path =
        train_and_validate(&customer_churn_df, &settings.models_dir(), &mut tracker)?;
    print_success(&format!("Model stored in {}", artifact_path.display()));

    print_completion("Training pipeline complete!");
    Ok(())
}

fn run_inference(settings: &Settings) -> Result<()> {
    let inference_dir = settings.inference_raw_dir();
    print_config(&inference_dir, &settings.models_dir(), &settings.tracking_uri);

    print_step_header(1, "Load Inference Data");
    let spinner = utils::create_spinner("Loading most recent inference batch...");
    let customer_data = data_load_pipeline(&inference_dir)?;
    utils::finish_with_success(&spinner, "Inference data loaded");
    print_success(&format!("Loaded {} rows", customer_data.height()));

    print_step_header(2, "Predict");
    let predictions_path = make_inference(
        &customer_data,
        &settings.models_dir(),
        &settings.predictions_dir(),
    )?;
    print_success(&format!(
        "Predictions written to {}",
        predictions_path.display()
    ));

    print_completion("Inference pipeline complete!");
    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
