//! The detection stage end to end: cut beads, extract features, score,
//! and optionally project.

use std::collections::BTreeSet;

use log::info;
use serde::Serialize;

use crate::config::DetectionConfig;
use crate::data::aggregate::{BatchPolicy, FileBeadMap, FileFailure};
use crate::data::loader::TabularSource;
use crate::data::select::select_beads;
use crate::detect::{project, score_anomalies, AnomalyLabel, FeatureMatrix};
use crate::error::Result;
use crate::signal::FeatureVector;

/// One scored bead.
#[derive(Debug, Clone, Serialize)]
pub struct DetectionRow {
    pub file_id: String,
    pub bead_number: usize,
    pub samples: usize,
    pub features: FeatureVector,
    pub score: f64,
    pub label: AnomalyLabel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection: Option<Vec<f64>>,
    /// Raw bead waveform the features were computed from.
    pub signal: Vec<f64>,
}

/// Output of one detection run.
#[derive(Debug, Default)]
pub struct DetectionReport {
    pub target_column: String,
    pub bead_numbers: Vec<usize>,
    pub rows: Vec<DetectionRow>,
    pub failures: Vec<FileFailure>,
}

impl DetectionReport {
    pub fn anomalies(&self) -> impl Iterator<Item = &DetectionRow> {
        self.rows
            .iter()
            .filter(|r| r.label == AnomalyLabel::Anomalous)
    }
}

/// Run detection for `bead_numbers` of `target_column` across `files`.
///
/// No selected bead at all is not an error: the report just has no rows.
pub fn run_detection<S: TabularSource>(
    map: &FileBeadMap,
    files: &[S],
    target_column: &str,
    bead_numbers: &BTreeSet<usize>,
    config: &DetectionConfig,
    policy: BatchPolicy,
) -> Result<DetectionReport> {
    let selection = select_beads(map, files, target_column, bead_numbers, policy)?;
    let matrix = FeatureMatrix::from_signals(&selection.beads);

    let scores = score_anomalies(&matrix, &config.forest)?;
    let projections = match config.projection_dims {
        Some(k) => Some(project(&matrix, k)?),
        None => None,
    };

    let rows: Vec<DetectionRow> = matrix
        .rows
        .into_iter()
        .zip(scores)
        .zip(selection.beads)
        .enumerate()
        .map(|(i, ((row, score), bead))| DetectionRow {
            file_id: row.file_id,
            bead_number: row.bead_number,
            samples: bead.signal.len(),
            features: row.features,
            score: score.score,
            label: score.label,
            projection: projections.as_ref().map(|p| p[i].clone()),
            signal: bead.signal,
        })
        .collect();

    let report = DetectionReport {
        target_column: target_column.to_string(),
        bead_numbers: bead_numbers.iter().copied().collect(),
        rows,
        failures: selection.failures,
    };
    info!(
        "detection on '{target_column}': {} beads scored, {} anomalous",
        report.rows.len(),
        report.anomalies().count()
    );
    Ok(report)
}
