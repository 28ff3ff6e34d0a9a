use std::collections::BTreeSet;

use crate::config::PipelineConfig;
use crate::data::aggregate::{aggregate, AggregateReport};
use crate::data::loader::TabularSource;
use crate::error::{PipelineError, Result};
use crate::pipeline::{run_detection, DetectionReport};

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// Pipeline context for one batch of recordings.
///
/// Each stage replaces its own output wholesale; re-segmenting drops any
/// detection result computed from the previous bead map.
pub struct Session<S: TabularSource> {
    /// Recordings of the active batch.
    pub files: Vec<S>,

    pub config: PipelineConfig,

    /// Output of the last segmentation run.
    pub segmentation: Option<AggregateReport>,

    /// Output of the last detection run.
    pub detection: Option<DetectionReport>,
}

impl<S: TabularSource> Session<S> {
    pub fn new(files: Vec<S>, config: PipelineConfig) -> Self {
        Self {
            files,
            config,
            segmentation: None,
            detection: None,
        }
    }

    /// Switch to another batch; earlier results no longer apply.
    pub fn set_files(&mut self, files: Vec<S>) {
        self.files = files;
        self.segmentation = None;
        self.detection = None;
    }

    /// Segment every file with the configured filter column and threshold.
    ///
    /// Earlier outputs are dropped first, so a failed run leaves none behind.
    pub fn segment(&mut self) -> Result<&AggregateReport> {
        self.segmentation = None;
        self.detection = None;
        let seg = &self.config.segmentation;
        let report = aggregate(
            &self.files,
            &seg.filter_column,
            seg.threshold,
            self.config.batch_policy,
        )?;
        Ok(&*self.segmentation.insert(report))
    }

    /// Bead numbers that exist in at least one file, `1..=max`.
    pub fn bead_numbers(&self) -> Vec<usize> {
        let max = self
            .segmentation
            .as_ref()
            .map_or(0, |s| s.beads.max_bead_count());
        (1..=max).collect()
    }

    /// Score the chosen beads of `target_column`. Requires [`Session::segment`].
    pub fn detect(
        &mut self,
        target_column: &str,
        bead_numbers: &BTreeSet<usize>,
    ) -> Result<&DetectionReport> {
        let segmentation = self.segmentation.as_ref().ok_or_else(|| {
            PipelineError::InvalidParameter("run bead segmentation before detection".into())
        })?;
        let report = run_detection(
            &segmentation.beads,
            &self.files,
            target_column,
            bead_numbers,
            &self.config.detection,
            self.config.batch_policy,
        )?;
        Ok(&*self.detection.insert(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::aggregate::BatchPolicy;
    use crate::data::loader::MemorySource;
    use crate::data::model::{CellValue, Column, Table};
    use crate::detect::AnomalyLabel;

    fn recording(id: &str, power: Vec<f64>) -> MemorySource {
        let intensity: Vec<f64> = power.iter().map(|p| p * 10.0).collect();
        let column = |name: &str, values: Vec<f64>| Column {
            name: name.to_string(),
            values: values.into_iter().map(CellValue::Float).collect(),
        };
        MemorySource {
            id: id.to_string(),
            table: Table::from_columns(vec![
                column("power", power),
                column("intensity", intensity),
            ]),
        }
    }

    fn session() -> Session<MemorySource> {
        let mut files = Vec::new();
        for i in 0..12 {
            let wobble = (i as f64 * 0.7).sin() * 0.05;
            files.push(recording(
                &format!("run_{i:02}.csv"),
                vec![0.0, 1.0 + wobble, 1.2, 1.1 - wobble, 0.0, 2.0, 2.1 + wobble, 0.0],
            ));
        }
        files.push(recording(
            "run_bad.csv",
            vec![0.0, 9.0, 0.5, 7.0, 0.0, 2.0, 2.0, 0.0],
        ));

        let mut config = PipelineConfig::default();
        config.detection.forest.seed = Some(11);
        config.detection.projection_dims = Some(3);
        Session::new(files, config)
    }

    #[test]
    fn test_detect_requires_segmentation() {
        let mut s = session();
        let err = s.detect("intensity", &BTreeSet::from([1])).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidParameter(_)));
    }

    #[test]
    fn test_stages_replace_outputs() {
        let mut s = session();
        assert_eq!(s.segment().unwrap().beads.len(), 13);
        assert_eq!(s.bead_numbers(), vec![1, 2]);

        let report = s.detect("intensity", &BTreeSet::from([1])).unwrap();
        assert_eq!(report.rows.len(), 13);
        assert!(report.rows.iter().all(|r| r.projection.as_ref().map(Vec::len) == Some(3)));
        let bad = report.rows.iter().find(|r| r.file_id == "run_bad.csv").unwrap();
        assert_eq!(bad.label, AnomalyLabel::Anomalous);

        s.segment().unwrap();
        assert!(s.detection.is_none());

        s.set_files(Vec::new());
        assert!(s.segmentation.is_none());
        assert!(s.bead_numbers().is_empty());
    }

    #[test]
    fn test_failed_segmentation_clears_outputs() {
        let mut s = session();
        s.segment().unwrap();
        s.detect("intensity", &BTreeSet::from([1])).unwrap();

        s.config.batch_policy = BatchPolicy::FailFast;
        s.config.segmentation.filter_column = "speed".into();
        let err = s.segment().unwrap_err();
        assert!(matches!(err, PipelineError::SchemaMismatch { .. }));
        assert!(s.segmentation.is_none());
        assert!(s.detection.is_none());
        assert!(s.bead_numbers().is_empty());

        let err = s.detect("intensity", &BTreeSet::from([1])).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidParameter(_)));
    }

    #[test]
    fn test_absent_bead_gives_empty_report() {
        let mut s = session();
        s.segment().unwrap();
        let report = s.detect("intensity", &BTreeSet::from([7])).unwrap();
        assert!(report.rows.is_empty());
        assert!(report.failures.is_empty());
    }
}
