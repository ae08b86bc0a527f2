//! Feature engineering shared by training and serving.

pub mod frame;
pub mod indicators;

pub use frame::{build_features, FeatureFrame, FeatureRow, Matrix, FEATURE_NAMES};
