//! Gradient-boosted binary classifier
//!
//! Binary-logistic boosting over the histogram trees in [`crate::model::tree`]:
//! per-round Bernoulli row subsampling, per-tree column subsampling, and
//! optional early stopping on a held-out classification-error metric.

use anyhow::{bail, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::tree::{Tree, TreeBuilder, TreeParams};

/// Hessians are floored here so leaf weights stay finite on saturated nodes.
const MIN_HESSIAN: f64 = 1e-16;

/// Hyperparameters of one boosted classifier.
///
/// The searched dimensions mirror the tuning space; `seed` drives the
/// row/column sampling so fits are reproducible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub learning_rate: f64,
    pub gamma: f64,
    pub reg_alpha: f64,
    pub reg_lambda: f64,
    pub min_child_weight: f64,
    pub colsample_bytree: f64,
    pub subsample: f64,
    pub seed: u64,
}

impl Default for BoostParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: 6,
            learning_rate: 0.3,
            gamma: 0.0,
            reg_alpha: 0.0,
            reg_lambda: 1.0,
            min_child_weight: 1.0,
            colsample_bytree: 1.0,
            subsample: 1.0,
            seed: 42,
        }
    }
}

/// A fitted gradient-boosted binary classifier.
///
/// The margin is the sum of leaf outputs over all trees (leaf weights carry
/// the learning rate); probabilities are the logistic transform of the
/// margin from a 0.5 base score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBooster {
    pub params: BoostParams,
    pub trees: Vec<Tree>,
}

impl GradientBooster {
    /// Fit a classifier on `x`/`y`, optionally early-stopping against an
    /// evaluation set.
    ///
    /// With `eval` and `early_stopping_rounds` given, the held-out
    /// classification error is measured after every round; when it fails to
    /// improve for the given number of rounds, fitting stops and the
    /// ensemble is truncated to its best round.
    pub fn fit(
        params: &BoostParams,
        x: &[Vec<f64>],
        y: &[u8],
        eval: Option<(&[Vec<f64>], &[u8])>,
        early_stopping_rounds: Option<usize>,
    ) -> Result<Self> {
        if x.is_empty() {
            bail!("cannot fit on an empty training set");
        }
        if x.len() != y.len() {
            bail!(
                "feature/target length mismatch: {} rows vs {} targets",
                x.len(),
                y.len()
            );
        }

        let n = x.len();
        let n_features = x[0].len();
        let mut rng = StdRng::seed_from_u64(params.seed);

        let tree_params = TreeParams {
            max_depth: params.max_depth,
            min_child_weight: params.min_child_weight,
            gamma: params.gamma,
            reg_alpha: params.reg_alpha,
            reg_lambda: params.reg_lambda,
            learning_rate: params.learning_rate,
        };

        let mut margins = vec![0.0f64; n];
        let mut eval_margins = eval.map(|(ex, _)| vec![0.0f64; ex.len()]);
        let mut gradients = vec![0.0f64; n];
        let mut hessians = vec![0.0f64; n];

        let mut trees: Vec<Tree> = Vec::new();
        let mut best_round = 0usize;
        let mut best_error = f64::INFINITY;

        for round in 0..params.n_estimators {
            for i in 0..n {
                let p = sigmoid(margins[i]);
                gradients[i] = p - f64::from(y[i]);
                hessians[i] = (p * (1.0 - p)).max(MIN_HESSIAN);
            }

            let rows = sample_rows(n, params.subsample, &mut rng);
            let columns = sample_columns(n_features, params.colsample_bytree, &mut rng);

            let builder = TreeBuilder::new(x, &gradients, &hessians, &columns, &tree_params);
            let tree = builder.build(&rows);

            for i in 0..n {
                margins[i] += tree.predict_row(&x[i]);
            }

            if let (Some((eval_x, eval_y)), Some(eval_margins)) = (eval, eval_margins.as_mut()) {
                for (margin, row) in eval_margins.iter_mut().zip(eval_x.iter()) {
                    *margin += tree.predict_row(row);
                }
                trees.push(tree);

                let error = classification_error(eval_margins, eval_y);
                if error < best_error {
                    best_error = error;
                    best_round = round;
                }

                if let Some(patience) = early_stopping_rounds {
                    if round - best_round >= patience {
                        debug!(
                            "early stopping at round {} (best round {}, error {:.4})",
                            round, best_round, best_error
                        );
                        trees.truncate(best_round + 1);
                        break;
                    }
                }
            } else {
                trees.push(tree);
            }
        }

        Ok(Self {
            params: params.clone(),
            trees,
        })
    }

    /// Raw margin (log-odds relative to the 0.5 base score) per row.
    pub fn predict_margin(&self, x: &[Vec<f64>]) -> Vec<f64> {
        x.iter()
            .map(|row| self.trees.iter().map(|tree| tree.predict_row(row)).sum())
            .collect()
    }

    /// Positive-class probability per row.
    pub fn predict_proba(&self, x: &[Vec<f64>]) -> Vec<f64> {
        self.predict_margin(x).into_iter().map(sigmoid).collect()
    }

    /// Predicted class per row at the 0.5 probability threshold.
    pub fn predict(&self, x: &[Vec<f64>]) -> Vec<u8> {
        self.predict_margin(x)
            .into_iter()
            .map(|margin| u8::from(margin > 0.0))
            .collect()
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Bernoulli row subsample; falls back to the full set if the draw is empty.
fn sample_rows(n: usize, subsample: f64, rng: &mut StdRng) -> Vec<usize> {
    if subsample >= 1.0 {
        return (0..n).collect();
    }
    let rows: Vec<usize> = (0..n).filter(|_| rng.gen::<f64>() < subsample).collect();
    if rows.is_empty() {
        (0..n).collect()
    } else {
        rows
    }
}

/// Sorted column subsample of `ceil(colsample * n_features)` features.
fn sample_columns(n_features: usize, colsample: f64, rng: &mut StdRng) -> Vec<usize> {
    if colsample >= 1.0 {
        return (0..n_features).collect();
    }
    let k = ((n_features as f64 * colsample).ceil() as usize).clamp(1, n_features);
    let mut columns = rand::seq::index::sample(rng, n_features, k).into_vec();
    columns.sort_unstable();
    columns
}

/// The `error` evaluation metric: misclassification rate at threshold 0.5.
fn classification_error(margins: &[f64], y: &[u8]) -> f64 {
    if margins.is_empty() {
        return 0.0;
    }
    let wrong = margins
        .iter()
        .zip(y.iter())
        .filter(|(&margin, &label)| u8::from(margin > 0.0) != label)
        .count();
    wrong as f64 / margins.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two well-separated clusters along one feature.
    fn toy_problem() -> (Vec<Vec<f64>>, Vec<u8>) {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..20 {
            x.push(vec![i as f64, (i % 3) as f64]);
            y.push(u8::from(i >= 10));
        }
        (x, y)
    }

    #[test]
    fn test_fit_learns_separable_data() {
        let (x, y) = toy_problem();
        let params = BoostParams {
            n_estimators: 20,
            max_depth: 2,
            learning_rate: 0.5,
            ..BoostParams::default()
        };

        let model = GradientBooster::fit(&params, &x, &y, None, None).unwrap();
        assert_eq!(model.predict(&x), y);
    }

    #[test]
    fn test_fit_is_deterministic() {
        let (x, y) = toy_problem();
        let params = BoostParams {
            n_estimators: 10,
            subsample: 0.8,
            colsample_bytree: 0.5,
            ..BoostParams::default()
        };

        let a = GradientBooster::fit(&params, &x, &y, None, None).unwrap();
        let b = GradientBooster::fit(&params, &x, &y, None, None).unwrap();
        assert_eq!(a.predict_margin(&x), b.predict_margin(&x));
    }

    #[test]
    fn test_early_stopping_truncates() {
        let (x, y) = toy_problem();
        let params = BoostParams {
            n_estimators: 200,
            max_depth: 2,
            learning_rate: 0.5,
            ..BoostParams::default()
        };

        let model =
            GradientBooster::fit(&params, &x, &y, Some((&x, &y)), Some(5)).unwrap();
        assert!(
            model.trees.len() < 200,
            "perfectly separable data should stop early, got {} trees",
            model.trees.len()
        );
    }

    #[test]
    fn test_empty_training_set_rejected() {
        let params = BoostParams::default();
        let result = GradientBooster::fit(&params, &[], &[], None, None);
        assert!(result.is_err());
    }

    #[test]
    fn test_probabilities_are_bounded() {
        let (x, y) = toy_problem();
        let params = BoostParams {
            n_estimators: 5,
            ..BoostParams::default()
        };
        let model = GradientBooster::fit(&params, &x, &y, None, None).unwrap();
        for p in model.predict_proba(&x) {
            assert!((0.0..=1.0).contains(&p));
        }
    }
}
