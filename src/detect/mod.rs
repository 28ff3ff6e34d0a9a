//! Outlier detection over bead feature vectors.
//!
//! - [`FeatureMatrix`] — selected beads and their features, in selection order
//! - [`score_anomalies`] / [`detect_anomalies`] — isolation forest scoring
//! - [`project`] — principal component view for plotting

pub mod forest;
pub mod matrix;
pub mod projection;

pub use forest::{
    detect_anomalies, score_anomalies, AnomalyLabel, AnomalyScore, Contamination, ForestConfig,
};
pub use matrix::{FeatureMatrix, FeatureRow};
pub use projection::project;
