//! Environment-driven pipeline settings
//!
//! The pipeline is configured through the environment: `ROOT_PATH` locates
//! the raw data directories and `TRACKING_URI` points the experiment
//! tracker at its storage root. Both resolve once at startup; a missing
//! `ROOT_PATH` is a configuration error and aborts the run.

use anyhow::Result;
use std::path::PathBuf;

/// Environment variable naming the project root.
pub const ROOT_PATH_VAR: &str = "ROOT_PATH";

/// Environment variable naming the experiment-tracking root (optional).
pub const TRACKING_URI_VAR: &str = "TRACKING_URI";

const DEFAULT_TRACKING_URI: &str = "./mlruns";

/// Resolved pipeline settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Project root containing `data/training/raw/` and `data/inference/raw/`.
    pub root_path: PathBuf,
    /// Storage root for the experiment tracker.
    pub tracking_uri: PathBuf,
}

impl Settings {
    /// Resolve settings from the environment, with an optional explicit
    /// root overriding `ROOT_PATH`.
    pub fn resolve(root_override: Option<PathBuf>) -> Result<Self> {
        let root_path = match root_override {
            Some(root) => root,
            None => std::env::var(ROOT_PATH_VAR)
                .map(PathBuf::from)
                .map_err(|_| {
                    anyhow::anyhow!(
                        "{} environment variable is not set. \
                         Point it at the project root or pass --root.",
                        ROOT_PATH_VAR
                    )
                })?,
        };

        let tracking_uri = std::env::var(TRACKING_URI_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_TRACKING_URI));

        Ok(Self {
            root_path,
            tracking_uri,
        })
    }

    /// Directory scanned for the most recent raw training file.
    pub fn training_raw_dir(&self) -> PathBuf {
        self.root_path.join("data/training/raw")
    }

    /// Directory scanned for the most recent raw inference file.
    pub fn inference_raw_dir(&self) -> PathBuf {
        self.root_path.join("data/inference/raw")
    }

    /// Directory model artifacts are written to and selected from.
    pub fn models_dir(&self) -> PathBuf {
        PathBuf::from("models")
    }

    /// Directory batch predictions are written to.
    pub fn predictions_dir(&self) -> PathBuf {
        PathBuf::from("predictions")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_root_overrides_env() {
        let settings = Settings::resolve(Some(PathBuf::from("/tmp/project"))).unwrap();
        assert_eq!(settings.root_path, PathBuf::from("/tmp/project"));
        assert_eq!(
            settings.training_raw_dir(),
            PathBuf::from("/tmp/project/data/training/raw")
        );
        assert_eq!(
            settings.inference_raw_dir(),
            PathBuf::from("/tmp/project/data/inference/raw")
        );
    }
}
