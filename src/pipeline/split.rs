//! Stratified train/validation/test split generation

use anyhow::{Context, Result};
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::info;

use crate::pipeline::error::PipelineError;
use crate::pipeline::features::{processing_pipeline, GeographyVocab, TARGET_COLUMN};

/// Seed driving both stratified splits, for reproducible partitions.
const SPLIT_SEED: u64 = 0;

/// Fraction of rows held out of training (split 50/50 into valid and test).
const HOLDOUT_FRACTION: f64 = 0.3;

/// Processed feature partitions with row-aligned targets.
///
/// Partitions are 70/15/15 stratified on the target. The geography
/// vocabulary fitted on the full labeled batch (and applied to every
/// partition) travels with the data so it can be persisted alongside the
/// trained model.
#[derive(Debug, Clone)]
pub struct TrainingData {
    pub x_train: DataFrame,
    pub x_valid: DataFrame,
    pub x_test: DataFrame,
    pub y_train: Vec<u8>,
    pub y_valid: Vec<u8>,
    pub y_test: Vec<u8>,
    pub geography_vocab: GeographyVocab,
    pub feature_names: Vec<String>,
}

/// Partition a labeled customer batch into processed 70/15/15 splits.
///
/// Separates features from the `Exited` target, performs a stratified
/// 70/30 split followed by a stratified 50/50 split of the held-out rows,
/// and passes each feature partition independently through the feature
/// transformer with the shared vocabulary.
pub fn generate_train_test_valid_data(customer_churn_df: &DataFrame) -> Result<TrainingData> {
    let y = target_values(customer_churn_df)?;
    let x = customer_churn_df.drop(TARGET_COLUMN)?;

    info!("Start training data split");
    let mut rng = StdRng::seed_from_u64(SPLIT_SEED);
    let (train_idx, holdout_idx) = stratified_split(&y, HOLDOUT_FRACTION, &mut rng);
    let holdout_y: Vec<u8> = holdout_idx.iter().map(|&i| y[i]).collect();
    let (valid_local, test_local) = stratified_split(&holdout_y, 0.5, &mut rng);
    let valid_idx: Vec<usize> = valid_local.iter().map(|&i| holdout_idx[i]).collect();
    let test_idx: Vec<usize> = test_local.iter().map(|&i| holdout_idx[i]).collect();

    let vocab = GeographyVocab::fit(&x)?;

    info!("Start training data processing");
    let x_train = processing_pipeline(&take_rows(&x, &train_idx)?, &vocab)?;
    let x_valid = processing_pipeline(&take_rows(&x, &valid_idx)?, &vocab)?;
    let x_test = processing_pipeline(&take_rows(&x, &test_idx)?, &vocab)?;

    let feature_names: Vec<String> = x_train
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();

    Ok(TrainingData {
        x_train,
        x_valid,
        x_test,
        y_train: train_idx.iter().map(|&i| y[i]).collect(),
        y_valid: valid_idx.iter().map(|&i| y[i]).collect(),
        y_test: test_idx.iter().map(|&i| y[i]).collect(),
        geography_vocab: vocab,
        feature_names,
    })
}

/// Extract the binary target column as a vector.
fn target_values(df: &DataFrame) -> Result<Vec<u8>> {
    let target = df
        .column(TARGET_COLUMN)
        .map_err(|_| PipelineError::MissingColumn(TARGET_COLUMN.to_string()))?;
    target
        .cast(&DataType::Int32)
        .with_context(|| format!("column '{}' is not numeric", TARGET_COLUMN))?
        .i32()?
        .into_iter()
        .map(|value| {
            value
                .map(|v| v as u8)
                .ok_or_else(|| anyhow::anyhow!("null value in target column '{}'", TARGET_COLUMN))
        })
        .collect()
}

/// Split row indices into (kept, held-out) parts, stratified on `y`.
///
/// Each class contributes `round(n_class * holdout_fraction)` rows to the
/// held-out part, so both parts preserve the overall class ratio. Index
/// order within each part follows the original row order.
fn stratified_split(y: &[u8], holdout_fraction: f64, rng: &mut StdRng) -> (Vec<usize>, Vec<usize>) {
    let mut kept = Vec::new();
    let mut held_out = Vec::new();

    let classes: std::collections::BTreeSet<u8> = y.iter().copied().collect();
    for class in classes {
        let mut indices: Vec<usize> = (0..y.len()).filter(|&i| y[i] == class).collect();
        indices.shuffle(rng);

        let n_holdout = ((indices.len() as f64) * holdout_fraction).round() as usize;
        let n_holdout = n_holdout.min(indices.len());
        held_out.extend_from_slice(&indices[..n_holdout]);
        kept.extend_from_slice(&indices[n_holdout..]);
    }

    kept.sort_unstable();
    held_out.sort_unstable();
    (kept, held_out)
}

/// Select the given rows of a frame, in order.
fn take_rows(df: &DataFrame, indices: &[usize]) -> Result<DataFrame> {
    let idx: Vec<u32> = indices.iter().map(|&i| i as u32).collect();
    let idx = IdxCa::from_vec("idx".into(), idx);
    Ok(df.take(&idx)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stratified_split_preserves_class_counts() {
        let y: Vec<u8> = (0..100).map(|i| (i % 5 == 0) as u8).collect(); // 20% positive
        let mut rng = StdRng::seed_from_u64(0);
        let (kept, held_out) = stratified_split(&y, 0.3, &mut rng);

        assert_eq!(kept.len(), 70);
        assert_eq!(held_out.len(), 30);
        let held_out_pos = held_out.iter().filter(|&&i| y[i] == 1).count();
        assert_eq!(held_out_pos, 6);
    }

    #[test]
    fn test_stratified_split_is_a_partition() {
        let y: Vec<u8> = (0..37).map(|i| (i % 3 == 0) as u8).collect();
        let mut rng = StdRng::seed_from_u64(1);
        let (kept, held_out) = stratified_split(&y, 0.5, &mut rng);

        let mut all: Vec<usize> = kept.iter().chain(held_out.iter()).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..37).collect::<Vec<_>>());
    }
}
