//! Per-signal processing: bead segmentation and waveform features.

pub mod features;
pub mod segment;
pub mod spectrum;

pub use features::{extract_features, FeatureVector, FEATURE_COUNT, FEATURE_NAMES};
pub use segment::{segment, BeadInterval};
