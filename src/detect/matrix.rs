use serde::Serialize;

use crate::data::select::BeadSignal;
use crate::error::{PipelineError, Result};
use crate::signal::{extract_features, FeatureVector, FEATURE_COUNT};

/// Features of one selected bead, tagged with where it came from.
#[derive(Debug, Clone, Serialize)]
pub struct FeatureRow {
    pub file_id: String,
    pub bead_number: usize,
    pub features: FeatureVector,
}

/// Model input: one row per selected (file, bead) pair, in selection order.
#[derive(Debug, Clone, Default)]
pub struct FeatureMatrix {
    pub rows: Vec<FeatureRow>,
}

impl FeatureMatrix {
    /// Extract features from every selected bead waveform.
    pub fn from_signals(signals: &[BeadSignal]) -> Self {
        let rows = signals
            .iter()
            .map(|s| FeatureRow {
                file_id: s.file_id.clone(),
                bead_number: s.bead_number,
                features: extract_features(&s.signal),
            })
            .collect();
        FeatureMatrix { rows }
    }

    pub fn push(
        &mut self,
        file_id: impl Into<String>,
        bead_number: usize,
        features: FeatureVector,
    ) {
        self.rows.push(FeatureRow {
            file_id: file_id.into(),
            bead_number,
            features,
        });
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row-major numeric view.
    pub fn values(&self) -> Vec<[f64; FEATURE_COUNT]> {
        self.rows.iter().map(|r| r.features.to_array()).collect()
    }

    /// Fails on the first row holding a NaN or infinite feature.
    pub fn check_finite(&self) -> Result<()> {
        let bad = self
            .rows
            .iter()
            .position(|r| r.features.to_array().iter().any(|v| !v.is_finite()));
        match bad {
            Some(i) => {
                let row = &self.rows[i];
                Err(PipelineError::ModelFitFailure(format!(
                    "row {i} ({} bead {}) has a non-finite feature",
                    row.file_id, row.bead_number
                )))
            }
            None => Ok(()),
        }
    }
}
