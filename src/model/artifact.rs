//! Model artifact naming, selection, and persistence
//!
//! Artifacts are named `xgb_<date>_score_<score>.pkl` with the held-out test
//! F1 score encoded to four decimals. Selection among persisted artifacts
//! decodes scores with a start-anchored `_<float>.pkl` pattern and picks the
//! minimum; names the pattern cannot decode count as infinity. NOTE: the
//! anchored pattern never matches a real artifact name (they start with
//! `xgb_`), so in practice every candidate scores infinity and selection
//! degenerates to the first candidate in list order. Tests pin exactly this
//! behavior; do not invert the comparison or loosen the anchor without
//! re-pinning downstream consumers.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::model::booster::GradientBooster;
use crate::pipeline::features::GeographyVocab;

static SCORE_PATTERN: OnceLock<Regex> = OnceLock::new();

fn score_pattern() -> &'static Regex {
    SCORE_PATTERN
        .get_or_init(|| Regex::new(r"^_(\d+\.\d+)\.pkl$").expect("score pattern is valid"))
}

/// Encode the training date and held-out score into an artifact file name.
pub fn model_file_name(date: NaiveDate, score: f64) -> String {
    format!("xgb_{}_score_{:.4}.pkl", date.format("%Y-%m-%d"), score)
}

/// Decode the score component of an artifact name.
///
/// Returns `None` unless the whole string has the form `_<float>.pkl`.
pub fn score_from_name(file_name: &str) -> Option<f64> {
    let captures = score_pattern().captures(file_name)?;
    captures.get(1)?.as_str().parse().ok()
}

/// Pick the best artifact among the candidates: minimum decoded score,
/// undecodable names counting as infinity, first candidate winning ties.
pub fn get_best_model_path(file_paths: &[PathBuf]) -> Result<&PathBuf> {
    if file_paths.is_empty() {
        bail!("no model artifacts found; train a model first");
    }

    let mut best = &file_paths[0];
    let mut best_score = decoded_score(best);
    for path in &file_paths[1..] {
        let score = decoded_score(path);
        if score < best_score {
            best = path;
            best_score = score;
        }
    }
    Ok(best)
}

fn decoded_score(path: &Path) -> f64 {
    score_from_name(&path.to_string_lossy()).unwrap_or(f64::INFINITY)
}

/// A persisted training result: the fitted classifier together with the
/// feature-schema state needed to reproduce its inputs at inference time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub model: GradientBooster,
    pub geography_vocab: GeographyVocab,
    pub feature_names: Vec<String>,
}

impl ModelArtifact {
    /// Serialize the artifact to `path`. Artifacts are written once and
    /// never modified.
    pub fn save(&self, path: &Path) -> Result<()> {
        let payload = serde_json::to_vec(self).context("Failed to serialize model artifact")?;
        fs::write(path, payload)
            .with_context(|| format!("Failed to write model artifact: {}", path.display()))?;
        Ok(())
    }

    /// Load an artifact previously written by [`ModelArtifact::save`].
    pub fn load(path: &Path) -> Result<Self> {
        let payload = fs::read(path)
            .with_context(|| format!("Failed to read model artifact: {}", path.display()))?;
        serde_json::from_slice(&payload)
            .with_context(|| format!("Failed to decode model artifact: {}", path.display()))
    }
}
