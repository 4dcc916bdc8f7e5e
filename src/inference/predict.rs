//! Batch inference with the best persisted model artifact

use anyhow::{Context, Result};
use chrono::Local;
use polars::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::model::artifact::{get_best_model_path, ModelArtifact};
use crate::model::booster::GradientBooster;
use crate::pipeline::error::PipelineError;
use crate::pipeline::features::{processing_pipeline, to_feature_matrix};

/// Assemble the prediction table: the original row numbers keyed against
/// the predicted classes.
pub fn generate_predictions(
    model: &GradientBooster,
    prediction_data: &[Vec<f64>],
    row_numbers: &Column,
) -> Result<DataFrame> {
    let preds = model.predict(prediction_data);
    let predicted: Vec<i32> = preds.into_iter().map(i32::from).collect();

    let predictions = DataFrame::new(vec![
        row_numbers.clone(),
        Column::new("predictedValues".into(), predicted),
    ])?;
    Ok(predictions)
}

/// Score a raw customer batch with the best artifact in `models_dir` and
/// write the dated prediction CSV into `predictions_dir`.
///
/// The batch is transformed with the artifact's persisted geography
/// vocabulary and assembled in its stored feature order, so the inference
/// schema always matches the one the model was trained on. Returns the
/// written file path.
pub fn make_inference(
    customer_data: &DataFrame,
    models_dir: &Path,
    predictions_dir: &Path,
) -> Result<PathBuf> {
    let candidates = list_artifacts(models_dir)?;
    let best_model_path = get_best_model_path(&candidates)?;
    info!("Loading model artifact {}", best_model_path.display());
    let artifact = ModelArtifact::load(best_model_path)?;

    let row_numbers = customer_data
        .column("RowNumber")
        .map_err(|_| PipelineError::MissingColumn("RowNumber".to_string()))?
        .clone();

    let processed = processing_pipeline(customer_data, &artifact.geography_vocab)?;
    let features = to_feature_matrix(&processed, &artifact.feature_names)?;

    let mut predictions = generate_predictions(&artifact.model, &features, &row_numbers)?;

    fs::create_dir_all(predictions_dir).with_context(|| {
        format!(
            "Failed to create predictions directory: {}",
            predictions_dir.display()
        )
    })?;
    let predictions_name = format!("preds_{}.csv", Local::now().date_naive().format("%Y-%m-%d"));
    let predictions_path = predictions_dir.join(predictions_name);

    let mut file = fs::File::create(&predictions_path).with_context(|| {
        format!(
            "Failed to create predictions file: {}",
            predictions_path.display()
        )
    })?;
    CsvWriter::new(&mut file)
        .finish(&mut predictions)
        .with_context(|| {
            format!(
                "Failed to write predictions file: {}",
                predictions_path.display()
            )
        })?;

    info!("Predictions written to {}", predictions_path.display());
    Ok(predictions_path)
}

/// Immediate entries of the model directory, in name order so selection
/// ties resolve deterministically.
fn list_artifacts(models_dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(models_dir)
        .with_context(|| format!("Failed to read model directory: {}", models_dir.display()))?;

    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in entries {
        let entry =
            entry.with_context(|| format!("Failed to list {}", models_dir.display()))?;
        paths.push(entry.path());
    }
    paths.sort();
    Ok(paths)
}
