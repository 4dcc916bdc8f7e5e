//! Classification metrics and model evaluation

use anyhow::Result;
use std::collections::BTreeMap;
use tracing::info;

use crate::model::booster::GradientBooster;
use crate::pipeline::features::to_feature_matrix;
use crate::pipeline::split::TrainingData;
use crate::tracking::ExperimentTracker;

/// Binary F1 score with the positive class labelled 1.
///
/// A zero denominator (no predicted or no actual positives) scores 0.0.
pub fn f1_score(y_true: &[u8], y_pred: &[u8]) -> f64 {
    let mut tp = 0usize;
    let mut fp = 0usize;
    let mut fn_ = 0usize;
    for (&truth, &pred) in y_true.iter().zip(y_pred.iter()) {
        match (truth, pred) {
            (1, 1) => tp += 1,
            (0, 1) => fp += 1,
            (1, 0) => fn_ += 1,
            _ => {}
        }
    }

    let denom = 2 * tp + fp + fn_;
    if denom == 0 {
        0.0
    } else {
        (2 * tp) as f64 / denom as f64
    }
}

/// Fraction of correctly classified rows.
pub fn accuracy_score(y_true: &[u8], y_pred: &[u8]) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let correct = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(truth, pred)| truth == pred)
        .count();
    correct as f64 / y_true.len() as f64
}

/// The four held-out metrics of one training run.
#[derive(Debug, Clone, Copy)]
pub struct Evaluation {
    pub validation_f1: f64,
    pub test_f1: f64,
    pub validation_accuracy: f64,
    pub test_accuracy: f64,
}

/// Score a fitted model on the validation and test partitions and report
/// the metrics to the experiment tracker.
///
/// The test F1 score is the headline number used for artifact naming.
pub fn evaluate_model(
    model: &GradientBooster,
    data: &TrainingData,
    tracker: &mut dyn ExperimentTracker,
) -> Result<Evaluation> {
    info!("Start model evaluation");

    let x_valid = to_feature_matrix(&data.x_valid, &data.feature_names)?;
    let x_test = to_feature_matrix(&data.x_test, &data.feature_names)?;

    let validation_preds = model.predict(&x_valid);
    let test_preds = model.predict(&x_test);

    let evaluation = Evaluation {
        validation_f1: f1_score(&data.y_valid, &validation_preds),
        test_f1: f1_score(&data.y_test, &test_preds),
        validation_accuracy: accuracy_score(&data.y_valid, &validation_preds),
        test_accuracy: accuracy_score(&data.y_test, &test_preds),
    };

    let mut metrics = BTreeMap::new();
    metrics.insert("Validation F1 Score".to_string(), evaluation.validation_f1);
    metrics.insert("Test F1 Score".to_string(), evaluation.test_f1);
    metrics.insert(
        "Validation Accuracy".to_string(),
        evaluation.validation_accuracy,
    );
    metrics.insert("Test Accuracy".to_string(), evaluation.test_accuracy);
    tracker.log_metrics(&metrics)?;

    Ok(evaluation)
}
