use std::collections::BTreeSet;

use log::{debug, info};

use super::aggregate::{handle_failure, BatchPolicy, FileBeadMap, FileFailure};
use super::loader::TabularSource;
use crate::error::{PipelineError, Result};

/// Waveform of one bead, cut from the target column.
#[derive(Debug, Clone, PartialEq)]
pub struct BeadSignal {
    pub file_id: String,
    pub bead_number: usize,
    pub signal: Vec<f64>,
}

/// Beads cut from a batch, plus the files that could not be read.
#[derive(Debug, Default)]
pub struct Selection {
    pub beads: Vec<BeadSignal>,
    pub failures: Vec<FileFailure>,
}

/// Cut the requested beads out of `target_column` for every file.
///
/// Files are visited in order and bead numbers ascending. A bead number a
/// file does not have is skipped for that file only, so the result can be
/// shorter than `files × bead_numbers`. Files holding none of the requested
/// beads are not loaded.
pub fn select_beads<S: TabularSource>(
    map: &FileBeadMap,
    files: &[S],
    target_column: &str,
    bead_numbers: &BTreeSet<usize>,
    policy: BatchPolicy,
) -> Result<Selection> {
    let mut selection = Selection::default();

    for source in files {
        let id = source.id();
        let wanted: Vec<usize> = bead_numbers
            .iter()
            .copied()
            .filter(|&n| map.bead(id, n).is_some())
            .collect();
        if wanted.is_empty() {
            continue;
        }

        let signal = match load_column(source, target_column) {
            Ok(signal) => signal,
            Err(err) => {
                handle_failure(policy, id, err, &mut selection.failures)?;
                continue;
            }
        };

        let before = selection.beads.len();
        for number in wanted {
            let Some(bead) = map.bead(id, number) else {
                continue;
            };
            // Target column may be shorter than the filter column.
            let end = (bead.end + 1).min(signal.len());
            let start = bead.start.min(end);
            selection.beads.push(BeadSignal {
                file_id: id.to_string(),
                bead_number: number,
                signal: signal[start..end].to_vec(),
            });
        }
        debug!(
            "{id}: cut {} beads from '{target_column}'",
            selection.beads.len() - before
        );
    }

    info!(
        "selected {} beads of {:?} from '{target_column}', {} files failed",
        selection.beads.len(),
        bead_numbers,
        selection.failures.len()
    );
    Ok(selection)
}

fn load_column<S: TabularSource>(source: &S, column: &str) -> Result<Vec<f64>> {
    let table = source.load().map_err(|e| PipelineError::Load {
        file: source.id().to_string(),
        source: e,
    })?;
    table.numeric_column(source.id(), column)
}
