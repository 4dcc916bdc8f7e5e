//! Experiment-tracking collaborator
//!
//! Training reports two payloads per run: the chosen hyperparameters and
//! the held-out metrics. The trait is the interface boundary; the provided
//! implementation appends JSON files under the tracking root, scoped to a
//! named run within a named experiment.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Experiment name used by the training pipeline.
pub const EXPERIMENT_NAME: &str = "BANK CHURN PROJECT";

/// Run name used by the training pipeline.
pub const RUN_NAME: &str = "XGBoost Model Training";

/// Receives the hyperparameters and metrics of a training run.
pub trait ExperimentTracker {
    /// Record the resolved hyperparameter assignment.
    fn log_params(&mut self, params: &BTreeMap<String, String>) -> Result<()>;

    /// Record named metric values.
    fn log_metrics(&mut self, metrics: &BTreeMap<String, f64>) -> Result<()>;
}

/// File-backed tracker writing `params.json` and `metrics.json` under
/// `<tracking root>/<experiment>/<run> <timestamp>/`.
#[derive(Debug, Clone)]
pub struct FileTracker {
    run_dir: PathBuf,
}

impl FileTracker {
    pub fn new(tracking_uri: &Path, experiment: &str, run_name: &str) -> Self {
        let timestamp = chrono::Local::now().format("%Y-%m-%d_%H-%M-%S");
        let run_dir = tracking_uri
            .join(experiment)
            .join(format!("{} {}", run_name, timestamp));
        Self { run_dir }
    }

    /// Directory this run's payloads are written to.
    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    fn write_json<T: serde::Serialize>(&self, file_name: &str, payload: &T) -> Result<()> {
        fs::create_dir_all(&self.run_dir).with_context(|| {
            format!("Failed to create tracking directory: {}", self.run_dir.display())
        })?;
        let path = self.run_dir.join(file_name);
        let json =
            serde_json::to_string_pretty(payload).context("Failed to serialize tracking payload")?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write tracking file: {}", path.display()))?;
        Ok(())
    }
}

impl ExperimentTracker for FileTracker {
    fn log_params(&mut self, params: &BTreeMap<String, String>) -> Result<()> {
        self.write_json("params.json", params)
    }

    fn log_metrics(&mut self, metrics: &BTreeMap<String, f64>) -> Result<()> {
        self.write_json("metrics.json", metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_tracker_writes_params_and_metrics() {
        let temp_dir = TempDir::new().unwrap();
        let mut tracker = FileTracker::new(temp_dir.path(), "exp", "run");

        let mut params = BTreeMap::new();
        params.insert("max_depth".to_string(), "6".to_string());
        tracker.log_params(&params).unwrap();

        let mut metrics = BTreeMap::new();
        metrics.insert("Test F1 Score".to_string(), 0.81);
        tracker.log_metrics(&metrics).unwrap();

        let params_json = std::fs::read_to_string(tracker.run_dir().join("params.json")).unwrap();
        assert!(params_json.contains("max_depth"));
        let metrics_json = std::fs::read_to_string(tracker.run_dir().join("metrics.json")).unwrap();
        assert!(metrics_json.contains("Test F1 Score"));
    }
}
