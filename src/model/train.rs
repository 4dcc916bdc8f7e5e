//! Training orchestration: split, search, refit, evaluate, persist

use anyhow::{Context, Result};
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::model::artifact::{model_file_name, ModelArtifact};
use crate::model::metrics::evaluate_model;
use crate::model::search::{train_model, SearchSpace};
use crate::pipeline::split::generate_train_test_valid_data;
use crate::report::TrainingSummary;
use crate::tracking::ExperimentTracker;

/// Run the full training pipeline on a labeled customer batch.
///
/// Splits and processes the batch, tunes and refits the classifier,
/// evaluates it, and persists the artifact (model + feature-schema state)
/// under a name encoding today's date and the test F1 score. Returns the
/// artifact path.
pub fn train_and_validate(
    customer_churn_df: &polars::prelude::DataFrame,
    models_dir: &Path,
    tracker: &mut dyn ExperimentTracker,
) -> Result<PathBuf> {
    let training_data = generate_train_test_valid_data(customer_churn_df)?;

    let space = SearchSpace::default();
    let outcome = train_model(&training_data, &space, tracker)?;
    let evaluation = evaluate_model(&outcome.model, &training_data, tracker)?;

    let model_name = model_file_name(Local::now().date_naive(), evaluation.test_f1);
    let model_path = models_dir.join(model_name);
    info!(
        "Model training pipeline finished. Storing model in {}.",
        model_path.display()
    );

    fs::create_dir_all(models_dir)
        .with_context(|| format!("Failed to create model directory: {}", models_dir.display()))?;
    let summary = TrainingSummary::new(&training_data, &outcome, &evaluation, &model_path);
    let artifact = ModelArtifact {
        model: outcome.model,
        geography_vocab: training_data.geography_vocab.clone(),
        feature_names: training_data.feature_names.clone(),
    };
    artifact.save(&model_path)?;

    summary.display();
    info!("Finished pipeline");

    Ok(model_path)
}
