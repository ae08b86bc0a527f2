//! Classifier runtime: artifacts on disk, the predictor that serves them, and
//! the offline dataset/training pipeline that produces them.
//!
//! The API and the CLI both score through [`Predictor`], so served
//! probabilities always match what offline scoring reports.

pub mod artifacts;
pub mod dataset;
pub mod predictor;
pub mod train;

pub use artifacts::{ArtifactPaths, LogisticModel, ModelMeta, StandardScaler};
pub use predictor::Predictor;
