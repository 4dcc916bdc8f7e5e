//! Inference module - artifact selection and batch prediction

pub mod predict;

pub use predict::{generate_predictions, make_inference};
