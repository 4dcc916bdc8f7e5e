//! Command-line argument definitions using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Churnflow - Train and serve a churn-prediction model from raw customer batches
#[derive(Parser, Debug)]
#[command(name = "churnflow")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Project root containing data/training/raw/ and data/inference/raw/.
    /// Overrides the ROOT_PATH environment variable.
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train a churn classifier on the most recent raw training file
    /// and persist a score-named model artifact
    Train,

    /// Run batch inference with the best persisted artifact on the most
    /// recent raw inference file
    Infer,
}
