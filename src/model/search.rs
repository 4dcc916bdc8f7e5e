//! TPE hyperparameter search and final model fitting
//!
//! Sequential model-based search over the boosting hyperparameters: one
//! Tree-structured Parzen Estimator per tunable dimension, 25 trials
//! minimizing `1 - F1` on the full validation partition, each trial fitted
//! on a 50% subsample with early stopping. The best assignment is refit on
//! the full training partition.

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::BTreeMap;
use tpe::{categorical_range, histogram_estimator, parzen_estimator, range, TpeOptimizer};
use tracing::{debug, info};

use crate::model::booster::{BoostParams, GradientBooster};
use crate::model::metrics::f1_score;
use crate::pipeline::features::to_feature_matrix;
use crate::pipeline::split::TrainingData;
use crate::tracking::ExperimentTracker;
use crate::utils::create_progress_bar;

/// Search budget: number of TPE trials.
pub const MAX_EVALS: usize = 25;

/// Early-stopping patience (rounds without held-out improvement) per trial.
pub const EARLY_STOPPING_ROUNDS: usize = 150;

/// Fraction of the train/valid partitions each trial fits on.
const TRIAL_SAMPLE_FRACTION: f64 = 0.5;

/// Seed for the trial subsample draw.
const SAMPLE_SEED: u64 = 0;

/// Seed for the TPE ask/tell loop.
const SEARCH_SEED: u64 = 42;

/// A uniform draw quantized to the nearest multiple of `q`.
///
/// Quantization happens after the draw, so the low edge can round below the
/// range (learning_rate can quantize to 0.0).
#[derive(Debug, Clone, Copy)]
pub struct Quantized {
    pub low: f64,
    pub high: f64,
    pub q: f64,
}

impl Quantized {
    fn quantize(&self, raw: f64) -> f64 {
        (raw / self.q).round() * self.q
    }
}

/// The hyperparameter search space: fixed assignments plus tuned
/// distributions, in natural values.
#[derive(Debug, Clone)]
pub struct SearchSpace {
    pub objective: &'static str,
    pub n_estimators: usize,
    pub colsample_bytree: (f64, f64),
    pub gamma: (f64, f64),
    pub learning_rate: Quantized,
    pub max_depth_choices: Vec<usize>,
    pub min_child_weight: Quantized,
    pub reg_alpha: (f64, f64),
    pub reg_lambda: (f64, f64),
    pub eval_metric: &'static str,
    pub tree_method: &'static str,
    pub subsample: f64,
    pub seed: u64,
}

impl Default for SearchSpace {
    fn default() -> Self {
        Self {
            objective: "binary:logistic",
            n_estimators: 1500,
            colsample_bytree: (0.2, 0.7),
            gamma: (0.0, 0.5),
            learning_rate: Quantized {
                low: 0.001,
                high: 0.05,
                q: 0.01,
            },
            max_depth_choices: (5..15).collect(),
            min_child_weight: Quantized {
                low: 1.0,
                high: 5.0,
                q: 1.0,
            },
            reg_alpha: (0.0, 10.0),
            reg_lambda: (0.1, 5.0),
            eval_metric: "error",
            tree_method: "hist",
            subsample: 0.6,
            seed: 42,
        }
    }
}

impl SearchSpace {
    /// The space resolved to a concrete assignment, as a loggable
    /// name -> value mapping (fixed entries included).
    pub fn param_map(&self, params: &BoostParams) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        map.insert("objective".to_string(), self.objective.to_string());
        map.insert("eval_metric".to_string(), self.eval_metric.to_string());
        map.insert("tree_method".to_string(), self.tree_method.to_string());
        map.insert("n_estimators".to_string(), params.n_estimators.to_string());
        map.insert("max_depth".to_string(), params.max_depth.to_string());
        map.insert(
            "learning_rate".to_string(),
            format!("{}", params.learning_rate),
        );
        map.insert("gamma".to_string(), format!("{}", params.gamma));
        map.insert("reg_alpha".to_string(), format!("{}", params.reg_alpha));
        map.insert("reg_lambda".to_string(), format!("{}", params.reg_lambda));
        map.insert(
            "min_child_weight".to_string(),
            format!("{}", params.min_child_weight),
        );
        map.insert(
            "colsample_bytree".to_string(),
            format!("{}", params.colsample_bytree),
        );
        map.insert("subsample".to_string(), format!("{}", params.subsample));
        map.insert("seed".to_string(), params.seed.to_string());
        map
    }
}

/// One completed search trial.
#[derive(Debug, Clone)]
pub struct TrialRecord {
    pub params: BoostParams,
    pub loss: f64,
}

/// Result of the search: the refit final model, the winning assignment,
/// its full-validation F1, and the retained trial history.
#[derive(Debug)]
pub struct TuningOutcome {
    pub model: GradientBooster,
    pub best_params: BoostParams,
    pub validation_f1: f64,
    pub trials: Vec<TrialRecord>,
}

/// Run the TPE search and refit the best assignment on the full training
/// partition. The chosen hyperparameters are reported to the tracker.
pub fn train_model(
    data: &TrainingData,
    space: &SearchSpace,
    tracker: &mut dyn ExperimentTracker,
) -> Result<TuningOutcome> {
    let x_train = to_feature_matrix(&data.x_train, &data.feature_names)?;
    let x_valid = to_feature_matrix(&data.x_valid, &data.feature_names)?;

    // 50% subsamples keep the 25-trial search affordable; trials still
    // score against the full validation partition.
    let mut sample_rng = StdRng::seed_from_u64(SAMPLE_SEED);
    let (x_train_sample, y_train_sample) =
        sample_fraction(&x_train, &data.y_train, TRIAL_SAMPLE_FRACTION, &mut sample_rng);
    let (x_valid_sample, y_valid_sample) =
        sample_fraction(&x_valid, &data.y_valid, TRIAL_SAMPLE_FRACTION, &mut sample_rng);

    let mut colsample_optim = TpeOptimizer::new(
        parzen_estimator(),
        range(space.colsample_bytree.0, space.colsample_bytree.1)?,
    );
    let mut gamma_optim =
        TpeOptimizer::new(parzen_estimator(), range(space.gamma.0, space.gamma.1)?);
    let mut learning_rate_optim = TpeOptimizer::new(
        parzen_estimator(),
        range(space.learning_rate.low, space.learning_rate.high)?,
    );
    let mut max_depth_optim = TpeOptimizer::new(
        histogram_estimator(),
        categorical_range(space.max_depth_choices.len())?,
    );
    let mut min_child_weight_optim = TpeOptimizer::new(
        parzen_estimator(),
        range(space.min_child_weight.low, space.min_child_weight.high)?,
    );
    let mut reg_alpha_optim =
        TpeOptimizer::new(parzen_estimator(), range(space.reg_alpha.0, space.reg_alpha.1)?);
    let mut reg_lambda_optim = TpeOptimizer::new(
        parzen_estimator(),
        range(space.reg_lambda.0, space.reg_lambda.1)?,
    );

    let mut rng = StdRng::seed_from_u64(SEARCH_SEED);
    let mut trials: Vec<TrialRecord> = Vec::with_capacity(MAX_EVALS);

    info!("Start hyperparameter tuning");
    let progress = create_progress_bar(MAX_EVALS as u64, "Tuning");

    for trial in 0..MAX_EVALS {
        let colsample_raw = colsample_optim.ask(&mut rng)?;
        let gamma_raw = gamma_optim.ask(&mut rng)?;
        let learning_rate_raw = learning_rate_optim.ask(&mut rng)?;
        let max_depth_raw = max_depth_optim.ask(&mut rng)?;
        let min_child_weight_raw = min_child_weight_optim.ask(&mut rng)?;
        let reg_alpha_raw = reg_alpha_optim.ask(&mut rng)?;
        let reg_lambda_raw = reg_lambda_optim.ask(&mut rng)?;

        let depth_idx = (max_depth_raw as usize).min(space.max_depth_choices.len() - 1);
        let params = BoostParams {
            n_estimators: space.n_estimators,
            max_depth: space.max_depth_choices[depth_idx],
            learning_rate: space.learning_rate.quantize(learning_rate_raw),
            gamma: gamma_raw,
            reg_alpha: reg_alpha_raw,
            reg_lambda: reg_lambda_raw,
            min_child_weight: space.min_child_weight.quantize(min_child_weight_raw),
            colsample_bytree: colsample_raw,
            subsample: space.subsample,
            seed: space.seed,
        };

        let model = GradientBooster::fit(
            &params,
            &x_train_sample,
            &y_train_sample,
            Some((&x_valid_sample, &y_valid_sample)),
            Some(EARLY_STOPPING_ROUNDS),
        )?;

        let preds = model.predict(&x_valid);
        let score = f1_score(&data.y_valid, &preds);
        let loss = 1.0 - score;

        colsample_optim.tell(colsample_raw, loss)?;
        gamma_optim.tell(gamma_raw, loss)?;
        learning_rate_optim.tell(learning_rate_raw, loss)?;
        max_depth_optim.tell(max_depth_raw, loss)?;
        min_child_weight_optim.tell(min_child_weight_raw, loss)?;
        reg_alpha_optim.tell(reg_alpha_raw, loss)?;
        reg_lambda_optim.tell(reg_lambda_raw, loss)?;

        debug!(
            "trial {}/{}: depth={} lr={:.3} loss={:.4}",
            trial + 1,
            MAX_EVALS,
            params.max_depth,
            params.learning_rate,
            loss
        );
        trials.push(TrialRecord { params, loss });
        progress.inc(1);
    }
    progress.finish_and_clear();

    // First minimal loss wins, matching the optimizer's own argmin.
    let best = trials
        .iter()
        .reduce(|best, trial| if trial.loss < best.loss { trial } else { best })
        .context("hyperparameter search produced no trials")?;
    let best_params = best.params.clone();

    info!("Done. Logging parameters");
    tracker.log_params(&space.param_map(&best_params))?;

    info!("Model fit and prediction.");
    let model = GradientBooster::fit(&best_params, &x_train, &data.y_train, None, None)?;
    let preds = model.predict(&x_valid);
    let validation_f1 = f1_score(&data.y_valid, &preds);
    info!("F1 Score: {:.4}", validation_f1);

    Ok(TuningOutcome {
        model,
        best_params,
        validation_f1,
        trials,
    })
}

/// Draw a `fraction` subsample of aligned rows and targets.
fn sample_fraction(
    x: &[Vec<f64>],
    y: &[u8],
    fraction: f64,
    rng: &mut StdRng,
) -> (Vec<Vec<f64>>, Vec<u8>) {
    let k = ((x.len() as f64) * fraction).round() as usize;
    let k = k.clamp(1, x.len().max(1));
    let mut indices = rand::seq::index::sample(rng, x.len(), k).into_vec();
    indices.sort_unstable();

    let sampled_x = indices.iter().map(|&i| x[i].clone()).collect();
    let sampled_y = indices.iter().map(|&i| y[i]).collect();
    (sampled_x, sampled_y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_space_matches_training_configuration() {
        let space = SearchSpace::default();
        assert_eq!(space.n_estimators, 1500);
        assert_eq!(space.max_depth_choices, (5..15).collect::<Vec<_>>());
        assert_eq!(space.subsample, 0.6);
        assert_eq!(space.seed, 42);
    }

    #[test]
    fn test_quantized_rounds_to_step() {
        let q = Quantized {
            low: 0.001,
            high: 0.05,
            q: 0.01,
        };
        assert_eq!(q.quantize(0.034), 0.03);
        assert_eq!(q.quantize(0.046), 0.05);
        // The low edge rounds below the range.
        assert_eq!(q.quantize(0.001), 0.0);
    }

    #[test]
    fn test_param_map_carries_fixed_entries() {
        let space = SearchSpace::default();
        let params = BoostParams::default();
        let map = space.param_map(&params);
        assert_eq!(map.get("objective").unwrap(), "binary:logistic");
        assert_eq!(map.get("eval_metric").unwrap(), "error");
        assert_eq!(map.get("tree_method").unwrap(), "hist");
        assert_eq!(map.get("n_estimators").unwrap(), "100");
    }

    #[test]
    fn test_sample_fraction_is_half_sized() {
        let x: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64]).collect();
        let y: Vec<u8> = (0..10).map(|i| (i % 2) as u8).collect();
        let mut rng = StdRng::seed_from_u64(0);
        let (sx, sy) = sample_fraction(&x, &y, 0.5, &mut rng);
        assert_eq!(sx.len(), 5);
        assert_eq!(sy.len(), 5);
        // Rows and targets stay aligned.
        for (row, &label) in sx.iter().zip(sy.iter()) {
            assert_eq!((row[0] as usize % 2) as u8, label);
        }
    }
}
