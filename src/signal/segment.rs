use serde::Serialize;

/// One bead: an inclusive `[start, end]` run of samples above the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BeadInterval {
    pub start: usize,
    pub end: usize,
}

impl BeadInterval {
    /// Number of samples covered by the bead.
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    /// Always false; a bead holds at least one sample.
    pub fn is_empty(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Outside,
    Inside { start: usize },
}

/// Split `signal` into the maximal runs where `signal[i] > threshold`.
///
/// Intervals come back sorted and non-overlapping. A run still open at the
/// end of the signal closes at the last sample. NaN never exceeds the
/// threshold.
pub fn segment(signal: &[f64], threshold: f64) -> Vec<BeadInterval> {
    let mut beads = Vec::new();
    let mut state = ScanState::Outside;

    for (i, &x) in signal.iter().enumerate() {
        let above = x > threshold;
        state = match (state, above) {
            (ScanState::Outside, true) => ScanState::Inside { start: i },
            (ScanState::Inside { start }, false) => {
                beads.push(BeadInterval { start, end: i - 1 });
                ScanState::Outside
            }
            (s, _) => s,
        };
    }

    if let ScanState::Inside { start } = state {
        beads.push(BeadInterval {
            start,
            end: signal.len() - 1,
        });
    }

    beads
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(beads: &[BeadInterval]) -> Vec<(usize, usize)> {
        beads.iter().map(|b| (b.start, b.end)).collect()
    }

    /// Union of intervals must equal the above-threshold index set.
    fn assert_covers_exactly(signal: &[f64], threshold: f64) {
        let beads = segment(signal, threshold);
        let mut covered = vec![false; signal.len()];
        let mut prev_end: Option<usize> = None;
        for b in &beads {
            assert!(b.start <= b.end);
            if let Some(pe) = prev_end {
                // strictly after the previous bead, with a gap of at least one sample
                assert!(b.start > pe + 1, "beads {beads:?} touch or overlap");
            }
            prev_end = Some(b.end);
            for c in &mut covered[b.start..=b.end] {
                *c = true;
            }
        }
        for (i, &x) in signal.iter().enumerate() {
            assert_eq!(covered[i], x > threshold, "index {i} of {signal:?}");
        }
    }

    #[test]
    fn test_reference_example() {
        let beads = segment(&[0.0, 0.0, 2.0, 3.0, 0.0, 5.0, 0.0], 0.0);
        assert_eq!(pairs(&beads), vec![(2, 3), (5, 5)]);
    }

    #[test]
    fn test_empty_and_quiet_signals() {
        assert!(segment(&[], 0.0).is_empty());
        assert!(segment(&[0.0, -1.0, 0.0], 0.0).is_empty());
    }

    #[test]
    fn test_threshold_is_strict() {
        assert!(segment(&[1.0, 1.0, 1.0], 1.0).is_empty());
        assert_eq!(pairs(&segment(&[1.0, 1.5, 1.0], 1.0)), vec![(1, 1)]);
    }

    #[test]
    fn test_open_run_closes_at_end() {
        let beads = segment(&[0.0, 4.0, 4.0, 4.0], 1.0);
        assert_eq!(pairs(&beads), vec![(1, 3)]);
        assert_eq!(beads[0].len(), 3);

        let whole = segment(&[9.0; 5], 1.0);
        assert_eq!(pairs(&whole), vec![(0, 4)]);
    }

    #[test]
    fn test_nan_breaks_a_run() {
        let beads = segment(&[2.0, f64::NAN, 2.0], 1.0);
        assert_eq!(pairs(&beads), vec![(0, 0), (2, 2)]);
    }

    #[test]
    fn test_coverage_property() {
        let signals: Vec<Vec<f64>> = vec![
            vec![],
            vec![5.0],
            vec![-5.0],
            vec![1.0, 0.0, 1.0, 0.0, 1.0],
            vec![0.0, 3.0, 3.0, 0.5, 0.5, 3.0, 0.0, 0.0, 2.0],
            (0..200).map(|i| ((i as f64) * 0.37).sin() * 3.0).collect(),
        ];
        for s in &signals {
            for threshold in [-1.0, 0.0, 0.5, 2.0] {
                assert_covers_exactly(s, threshold);
            }
        }
    }

    #[test]
    fn test_deterministic() {
        let s: Vec<f64> = (0..100).map(|i| ((i * 7919) % 13) as f64 - 6.0).collect();
        assert_eq!(segment(&s, 0.0), segment(&s, 0.0));
    }
}
