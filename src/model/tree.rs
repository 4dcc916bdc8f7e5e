//! Regression tree construction for gradient boosting
//!
//! Greedy depth-first CART over histogram candidate thresholds, with the
//! second-order regularized split gain and L1/L2 shrunk leaf weights.
//! Rows with a missing (NaN) feature value always route left.

use serde::{Deserialize, Serialize};

/// Maximum candidate thresholds evaluated per feature per node.
const MAX_BINS: usize = 256;

/// Minimum gain (after the `gamma` penalty) for a split to be kept.
const MIN_SPLIT_GAIN: f64 = 1e-6;

/// A single tree node: either an internal split or a leaf.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub feature: u32,
    pub threshold: f64,
    pub left: u32,
    pub right: u32,
    pub leaf: Option<f64>,
}

impl Node {
    fn leaf(value: f64) -> Self {
        Self {
            feature: 0,
            threshold: 0.0,
            left: 0,
            right: 0,
            leaf: Some(value),
        }
    }
}

/// A fitted regression tree, stored as a flat node arena rooted at index 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    /// A single-leaf tree with a constant output.
    pub fn single_leaf(value: f64) -> Self {
        Self {
            nodes: vec![Node::leaf(value)],
        }
    }

    /// Evaluate the tree on one feature row.
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        let mut idx = 0usize;
        loop {
            let node = match self.nodes.get(idx) {
                Some(node) => node,
                None => return 0.0,
            };
            if let Some(value) = node.leaf {
                return value;
            }

            let value = row.get(node.feature as usize).copied().unwrap_or(f64::NAN);
            idx = if value.is_nan() || value <= node.threshold {
                node.left as usize
            } else {
                node.right as usize
            };
        }
    }
}

/// Structural and regularization parameters for one tree.
#[derive(Debug, Clone)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_child_weight: f64,
    pub gamma: f64,
    pub reg_alpha: f64,
    pub reg_lambda: f64,
    /// Applied to leaf weights, so prediction is a plain sum over trees.
    pub learning_rate: f64,
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

/// Builds one tree from gradient/hessian statistics over a row and column
/// subsample of the training matrix.
pub struct TreeBuilder<'a> {
    features: &'a [Vec<f64>],
    gradients: &'a [f64],
    hessians: &'a [f64],
    columns: &'a [usize],
    params: &'a TreeParams,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(
        features: &'a [Vec<f64>],
        gradients: &'a [f64],
        hessians: &'a [f64],
        columns: &'a [usize],
        params: &'a TreeParams,
    ) -> Self {
        debug_assert_eq!(features.len(), gradients.len());
        debug_assert_eq!(features.len(), hessians.len());
        Self {
            features,
            gradients,
            hessians,
            columns,
            params,
        }
    }

    /// Build the tree over the given row subset.
    pub fn build(&self, rows: &[usize]) -> Tree {
        let mut nodes = Vec::new();
        self.build_node(rows, 0, &mut nodes);
        Tree { nodes }
    }

    fn build_node(&self, rows: &[usize], depth: usize, nodes: &mut Vec<Node>) -> u32 {
        let current = nodes.len() as u32;

        if depth >= self.params.max_depth || rows.len() < 2 {
            nodes.push(Node::leaf(self.leaf_value(rows)));
            return current;
        }

        let split = match self.find_best_split(rows) {
            Some(split) => split,
            None => {
                nodes.push(Node::leaf(self.leaf_value(rows)));
                return current;
            }
        };

        let (left_rows, right_rows) = self.partition(rows, split.feature, split.threshold);

        nodes.push(Node {
            feature: split.feature as u32,
            threshold: split.threshold,
            left: 0,
            right: 0,
            leaf: None,
        });

        let left = self.build_node(&left_rows, depth + 1, nodes);
        let right = self.build_node(&right_rows, depth + 1, nodes);
        nodes[current as usize].left = left;
        nodes[current as usize].right = right;

        current
    }

    /// Scan every sampled column for the best regularized split.
    fn find_best_split(&self, rows: &[usize]) -> Option<SplitCandidate> {
        let lambda = self.params.reg_lambda;
        let (g_total, h_total) = self.stat_sums(rows);
        let parent_score = score(g_total, h_total, lambda);

        let mut best: Option<SplitCandidate> = None;
        for &feature in self.columns {
            // Missing values sit on the left of every threshold, so their
            // statistics seed the left accumulator.
            let mut sorted: Vec<(f64, f64, f64)> = Vec::with_capacity(rows.len());
            let mut g_left = 0.0;
            let mut h_left = 0.0;
            for &row in rows {
                let value = self.features[row][feature];
                if value.is_nan() {
                    g_left += self.gradients[row];
                    h_left += self.hessians[row];
                } else {
                    sorted.push((value, self.gradients[row], self.hessians[row]));
                }
            }
            if sorted.len() < 2 {
                continue;
            }
            sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

            let boundaries = candidate_boundaries(&sorted, MAX_BINS);
            let mut boundary_iter = boundaries.iter().copied().peekable();

            for (i, &(value, g, h)) in sorted.iter().enumerate() {
                g_left += g;
                h_left += h;

                match boundary_iter.peek() {
                    Some(&boundary) if boundary == i => {
                        boundary_iter.next();
                    }
                    _ => continue,
                }

                let g_right = g_total - g_left;
                let h_right = h_total - h_left;
                if h_left < self.params.min_child_weight
                    || h_right < self.params.min_child_weight
                {
                    continue;
                }

                let gain = 0.5
                    * (score(g_left, h_left, lambda) + score(g_right, h_right, lambda)
                        - parent_score)
                    - self.params.gamma;
                if gain < MIN_SPLIT_GAIN {
                    continue;
                }

                let better = match &best {
                    None => true,
                    Some(current) => gain > current.gain,
                };
                if better {
                    best = Some(SplitCandidate {
                        feature,
                        threshold: value,
                        gain,
                    });
                }
            }
        }

        best
    }

    fn partition(&self, rows: &[usize], feature: usize, threshold: f64) -> (Vec<usize>, Vec<usize>) {
        let mut left = Vec::new();
        let mut right = Vec::new();
        for &row in rows {
            let value = self.features[row][feature];
            if value.is_nan() || value <= threshold {
                left.push(row);
            } else {
                right.push(row);
            }
        }
        (left, right)
    }

    fn stat_sums(&self, rows: &[usize]) -> (f64, f64) {
        let mut g = 0.0;
        let mut h = 0.0;
        for &row in rows {
            g += self.gradients[row];
            h += self.hessians[row];
        }
        (g, h)
    }

    /// Optimal leaf weight `-T_alpha(G) / (H + lambda)`, scaled by the
    /// learning rate.
    fn leaf_value(&self, rows: &[usize]) -> f64 {
        let (g, h) = self.stat_sums(rows);
        let g = soft_threshold(g, self.params.reg_alpha);
        if h + self.params.reg_lambda <= 0.0 {
            return 0.0;
        }
        self.params.learning_rate * (-g / (h + self.params.reg_lambda))
    }
}

/// Indices (into the sorted value array) after which a split threshold may
/// be placed: the last occurrence of each distinct value except the maximum,
/// thinned to at most `max_bins` candidates.
fn candidate_boundaries(sorted: &[(f64, f64, f64)], max_bins: usize) -> Vec<usize> {
    let mut boundaries = Vec::new();
    for i in 0..sorted.len() - 1 {
        if sorted[i + 1].0 > sorted[i].0 {
            boundaries.push(i);
        }
    }
    if boundaries.len() > max_bins {
        let stride = boundaries.len().div_ceil(max_bins);
        boundaries = boundaries.into_iter().step_by(stride).collect();
    }
    boundaries
}

fn score(g: f64, h: f64, lambda: f64) -> f64 {
    let g = g * g;
    let denom = h + lambda;
    if denom <= 0.0 {
        0.0
    } else {
        g / denom
    }
}

fn soft_threshold(g: f64, alpha: f64) -> f64 {
    if g > alpha {
        g - alpha
    } else if g < -alpha {
        g + alpha
    } else {
        0.0
    }
}
