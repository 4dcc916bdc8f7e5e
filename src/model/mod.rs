//! Model module - boosted-tree training, search, evaluation, and artifacts

pub mod artifact;
pub mod booster;
pub mod metrics;
pub mod search;
pub mod train;
pub mod tree;

pub use artifact::{get_best_model_path, model_file_name, score_from_name, ModelArtifact};
pub use booster::{BoostParams, GradientBooster};
pub use metrics::{accuracy_score, evaluate_model, f1_score, Evaluation};
pub use search::{SearchSpace, TrialRecord, TuningOutcome, EARLY_STOPPING_ROUNDS, MAX_EVALS};
pub use train::train_and_validate;
pub use tree::Tree;
