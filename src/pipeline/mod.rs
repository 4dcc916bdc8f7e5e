//! Pipeline module - data loading, feature engineering, and splitting

pub mod error;
pub mod features;
pub mod loader;
pub mod split;

pub use error::PipelineError;
pub use features::{processing_pipeline, to_feature_matrix, GeographyVocab, TARGET_COLUMN};
pub use loader::{data_load_pipeline, load_table, most_recent_file, sniff_delimiter};
pub use split::{generate_train_test_valid_data, TrainingData};
