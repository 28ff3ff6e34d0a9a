//! Pipeline configuration, read from an optional JSON file.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::aggregate::BatchPolicy;
use crate::detect::ForestConfig;

/// Bead segmentation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentationConfig {
    /// Column whose samples decide where beads are.
    #[serde(default = "default_filter_column")]
    pub filter_column: String,

    /// A sample belongs to a bead when it is strictly above this value.
    #[serde(default)]
    pub threshold: f64,
}

fn default_filter_column() -> String {
    "power".to_string()
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            filter_column: default_filter_column(),
            threshold: 0.0,
        }
    }
}

/// Anomaly detection parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectionConfig {
    #[serde(flatten)]
    pub forest: ForestConfig,

    /// Principal components to add to each detection row, if any.
    #[serde(default)]
    pub projection_dims: Option<usize>,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub segmentation: SegmentationConfig,

    #[serde(default)]
    pub detection: DetectionConfig,

    #[serde(default)]
    pub batch_policy: BatchPolicy,
}

impl PipelineConfig {
    /// Read a JSON config file; missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Defaults, or the file at `path` when given.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::Contamination;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.segmentation.filter_column, "power");
        assert_eq!(config.segmentation.threshold, 0.0);
        assert_eq!(config.detection.forest.n_trees, 100);
        assert_eq!(config.detection.forest.max_samples, 256);
        assert_eq!(config.detection.forest.contamination, Contamination::Auto);
        assert_eq!(config.batch_policy, BatchPolicy::SkipAndReport);
    }

    #[test]
    fn test_partial_json() {
        let config: PipelineConfig = serde_json::from_str(
            r#"{
                "segmentation": { "threshold": 1.5 },
                "detection": { "seed": 42, "contamination": { "fraction": 0.1 }, "projection_dims": 3 },
                "batch_policy": "fail_fast"
            }"#,
        )
        .unwrap();
        assert_eq!(config.segmentation.filter_column, "power");
        assert_eq!(config.segmentation.threshold, 1.5);
        assert_eq!(config.detection.forest.seed, Some(42));
        assert_eq!(config.detection.forest.n_trees, 100);
        assert_eq!(
            config.detection.forest.contamination,
            Contamination::Fraction(0.1)
        );
        assert_eq!(config.detection.projection_dims, Some(3));
        assert_eq!(config.batch_policy, BatchPolicy::FailFast);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.json");
        std::fs::write(&path, r#"{ "segmentation": { "filter_column": "intensity" } }"#).unwrap();
        let config = PipelineConfig::load_or_default(Some(&path)).unwrap();
        assert_eq!(config.segmentation.filter_column, "intensity");
        assert!(PipelineConfig::load(&dir.path().join("missing.json")).is_err());
    }
}
