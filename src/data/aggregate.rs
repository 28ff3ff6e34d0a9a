use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::loader::TabularSource;
use crate::error::{PipelineError, Result};
use crate::signal::{segment, BeadInterval};

// ---------------------------------------------------------------------------
// Batch policy / failures
// ---------------------------------------------------------------------------

/// What a batch operation does when one file cannot be processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchPolicy {
    /// Record the failure and continue with the remaining files.
    #[default]
    SkipAndReport,
    /// Stop at the first failing file.
    FailFast,
}

/// A file that was left out of a batch result.
#[derive(Debug)]
pub struct FileFailure {
    pub file_id: String,
    pub error: PipelineError,
}

/// Apply `policy` to a per-file failure: either hand the error back or log
/// and record it.
pub(crate) fn handle_failure(
    policy: BatchPolicy,
    file_id: &str,
    error: PipelineError,
    failures: &mut Vec<FileFailure>,
) -> Result<()> {
    match policy {
        BatchPolicy::FailFast => Err(error),
        BatchPolicy::SkipAndReport => {
            warn!("skipping {file_id}: {error}");
            failures.push(FileFailure {
                file_id: file_id.to_string(),
                error,
            });
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// FileBeadMap
// ---------------------------------------------------------------------------

/// Beads found in one file, bead number `i` at index `i - 1`.
#[derive(Debug, Clone, Serialize)]
pub struct FileBeads {
    pub file_id: String,
    pub beads: Vec<BeadInterval>,
}

/// Per-file bead intervals in processing order. Files without any bead have
/// no entry.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FileBeadMap {
    pub entries: Vec<FileBeads>,
}

impl FileBeadMap {
    /// Set the beads of `file_id`, replacing any earlier entry.
    pub fn insert(&mut self, file_id: impl Into<String>, beads: Vec<BeadInterval>) {
        let file_id = file_id.into();
        match self.entries.iter_mut().find(|e| e.file_id == file_id) {
            Some(entry) => entry.beads = beads,
            None => self.entries.push(FileBeads { file_id, beads }),
        }
    }

    pub fn get(&self, file_id: &str) -> Option<&[BeadInterval]> {
        self.entries
            .iter()
            .find(|e| e.file_id == file_id)
            .map(|e| e.beads.as_slice())
    }

    /// Interval of 1-based `bead_number` in `file_id`, if that file has it.
    pub fn bead(&self, file_id: &str, bead_number: usize) -> Option<BeadInterval> {
        let beads = self.get(file_id)?;
        bead_number
            .checked_sub(1)
            .and_then(|i| beads.get(i))
            .copied()
    }

    /// Highest bead count of any file.
    pub fn max_bead_count(&self) -> usize {
        self.entries.iter().map(|e| e.beads.len()).max().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bead lengths (sample counts) per file, 0 where a bead is absent.
    pub fn length_table(&self, file_ids: &[String]) -> BeadLengthTable {
        let bead_numbers: Vec<usize> = (1..=self.max_bead_count()).collect();
        let rows = file_ids
            .iter()
            .map(|id| {
                let beads = self.get(id).unwrap_or(&[]);
                let lengths = bead_numbers
                    .iter()
                    .map(|&n| beads.get(n - 1).map_or(0, |b| b.len()))
                    .collect();
                (id.clone(), lengths)
            })
            .collect();
        BeadLengthTable { bead_numbers, rows }
    }
}

/// File × bead number grid of bead lengths.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BeadLengthTable {
    pub bead_numbers: Vec<usize>,
    pub rows: Vec<(String, Vec<usize>)>,
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Result of segmenting a batch of files.
#[derive(Debug, Default)]
pub struct AggregateReport {
    pub beads: FileBeadMap,
    /// Files that were loaded and segmented, in order, with or without beads.
    pub scanned: Vec<String>,
    pub failures: Vec<FileFailure>,
}

impl AggregateReport {
    /// Length grid over every scanned file.
    pub fn length_table(&self) -> BeadLengthTable {
        self.beads.length_table(&self.scanned)
    }
}

/// Segment `filter_column` of every file and number the beads of each file
/// from 1 in discovery order.
pub fn aggregate<S: TabularSource>(
    files: &[S],
    filter_column: &str,
    threshold: f64,
    policy: BatchPolicy,
) -> Result<AggregateReport> {
    let mut report = AggregateReport::default();

    for source in files {
        let id = source.id();
        match segment_file(source, filter_column, threshold) {
            Ok(beads) => {
                debug!("{id}: {} beads", beads.len());
                report.scanned.push(id.to_string());
                if !beads.is_empty() {
                    report.beads.insert(id, beads);
                }
            }
            Err(err) => handle_failure(policy, id, err, &mut report.failures)?,
        }
    }

    info!(
        "segmented {} files on '{filter_column}' > {threshold}: {} with beads, {} failed",
        report.scanned.len(),
        report.beads.len(),
        report.failures.len()
    );
    Ok(report)
}

fn segment_file<S: TabularSource>(
    source: &S,
    filter_column: &str,
    threshold: f64,
) -> Result<Vec<BeadInterval>> {
    let table = source.load().map_err(|e| PipelineError::Load {
        file: source.id().to_string(),
        source: e,
    })?;
    let signal = table.numeric_column(source.id(), filter_column)?;
    Ok(segment(&signal, threshold))
}
