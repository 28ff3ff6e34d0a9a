//! Isolation forest outlier scoring.
//!
//! Every call builds a fresh ensemble over exactly the rows it is given,
//! scores them and drops the model again.
//!
//! # References
//!
//! - Liu, F.T., Ting, K.M., Zhou, Z.-H. (2008). "Isolation Forest",
//!   *ICDM '08*, pp. 413-422.

use std::fmt;
use std::str::FromStr;

use log::debug;
use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::matrix::FeatureMatrix;
use crate::error::{PipelineError, Result};
use crate::signal::FEATURE_COUNT;

type Row = [f64; FEATURE_COUNT];

/// Euler–Mascheroni constant.
const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// How the normal/anomalous cut is placed on the anomaly scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Contamination {
    /// Anomalous when the score exceeds 0.5.
    Auto,
    /// The given share of rows with the highest scores.
    Fraction(f64),
}

impl Default for Contamination {
    fn default() -> Self {
        Contamination::Auto
    }
}

impl fmt::Display for Contamination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Contamination::Auto => write!(f, "auto"),
            Contamination::Fraction(v) => write!(f, "{v}"),
        }
    }
}

impl FromStr for Contamination {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("auto") {
            return Ok(Contamination::Auto);
        }
        s.parse::<f64>()
            .map(Contamination::Fraction)
            .map_err(|_| format!("expected 'auto' or a fraction, got '{s}'"))
    }
}

/// Ensemble parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestConfig {
    #[serde(default = "default_n_trees")]
    pub n_trees: usize,

    /// Upper bound on the per-tree subsample size.
    #[serde(default = "default_max_samples")]
    pub max_samples: usize,

    #[serde(default)]
    pub contamination: Contamination,

    /// Fixed seed for reproducible runs; entropy-seeded when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_n_trees() -> usize {
    100
}

fn default_max_samples() -> usize {
    256
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: default_n_trees(),
            max_samples: default_max_samples(),
            contamination: Contamination::default(),
            seed: None,
        }
    }
}

impl ForestConfig {
    fn validate(&self) -> Result<()> {
        if self.n_trees == 0 {
            return Err(PipelineError::InvalidParameter("n_trees must be at least 1".into()));
        }
        if self.max_samples < 2 {
            return Err(PipelineError::InvalidParameter(
                "max_samples must be at least 2".into(),
            ));
        }
        if let Contamination::Fraction(f) = self.contamination {
            if !(f > 0.0 && f <= 0.5) {
                return Err(PipelineError::InvalidParameter(format!(
                    "contamination must be in (0, 0.5], got {f}"
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnomalyLabel {
    Normal,
    Anomalous,
}

impl fmt::Display for AnomalyLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnomalyLabel::Normal => write!(f, "normal"),
            AnomalyLabel::Anomalous => write!(f, "anomalous"),
        }
    }
}

/// Score and label of one matrix row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AnomalyScore {
    /// `2^(-E[h] / c(ψ))`, in (0, 1]; higher isolates faster.
    pub score: f64,
    /// Mean path length over the ensemble.
    pub mean_path_length: f64,
    pub label: AnomalyLabel,
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Label every row of `matrix` as normal or anomalous.
pub fn detect_anomalies(
    matrix: &FeatureMatrix,
    config: &ForestConfig,
) -> Result<Vec<AnomalyLabel>> {
    Ok(score_anomalies(matrix, config)?
        .into_iter()
        .map(|s| s.label)
        .collect())
}

/// Score and label every row of `matrix`.
///
/// An empty matrix yields an empty result without building a model.
pub fn score_anomalies(
    matrix: &FeatureMatrix,
    config: &ForestConfig,
) -> Result<Vec<AnomalyScore>> {
    config.validate()?;
    if matrix.is_empty() {
        return Ok(Vec::new());
    }

    let data = matrix.values();
    matrix.check_finite()?;
    check_fittable(&data)?;

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let subsample = config.max_samples.min(data.len());
    let height_limit = (subsample as f64).log2().ceil() as usize;
    debug!(
        "isolation forest: {} rows, {} trees, subsample {subsample}, height limit {height_limit}",
        data.len(),
        config.n_trees
    );

    let trees: Vec<Node> = (0..config.n_trees)
        .map(|_| {
            let sample = index::sample(&mut rng, data.len(), subsample).into_vec();
            grow(&data, sample, 0, height_limit, &mut rng)
        })
        .collect();

    let norm = average_path_length(subsample);
    let scored: Vec<(f64, f64)> = data
        .iter()
        .map(|row| {
            let total: f64 = trees.iter().map(|t| path_length(t, row, 0)).sum();
            let mean = total / trees.len() as f64;
            (2f64.powf(-mean / norm), mean)
        })
        .collect();

    let cut = match config.contamination {
        Contamination::Auto => 0.5,
        Contamination::Fraction(f) => {
            let scores: Vec<f64> = scored.iter().map(|(s, _)| *s).collect();
            percentile(&scores, 1.0 - f)
        }
    };

    Ok(scored
        .into_iter()
        .map(|(score, mean_path_length)| AnomalyScore {
            score,
            mean_path_length,
            label: if score > cut {
                AnomalyLabel::Anomalous
            } else {
                AnomalyLabel::Normal
            },
        })
        .collect())
}

fn check_fittable(data: &[Row]) -> Result<()> {
    if data.len() < 2 {
        return Err(PipelineError::ModelFitFailure(format!(
            "need at least 2 rows, got {}",
            data.len()
        )));
    }
    let varies = (0..FEATURE_COUNT).any(|f| data.iter().any(|row| row[f] != data[0][f]));
    if !varies {
        return Err(PipelineError::ModelFitFailure(
            "every feature is constant across rows".into(),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Trees
// ---------------------------------------------------------------------------

enum Node {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

fn grow(data: &[Row], rows: Vec<usize>, depth: usize, limit: usize, rng: &mut StdRng) -> Node {
    if depth >= limit || rows.len() <= 1 {
        return Node::Leaf { size: rows.len() };
    }

    // (feature, min, max) for every feature that still varies in this node
    let candidates: Vec<(usize, f64, f64)> = (0..FEATURE_COUNT)
        .filter_map(|f| {
            let (lo, hi) = rows.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &r| {
                (lo.min(data[r][f]), hi.max(data[r][f]))
            });
            (hi > lo).then_some((f, lo, hi))
        })
        .collect();

    if candidates.is_empty() {
        return Node::Leaf { size: rows.len() };
    }

    let (feature, lo, hi) = candidates[rng.gen_range(0..candidates.len())];
    let threshold = rng.gen_range(lo..hi);
    let (left, right): (Vec<usize>, Vec<usize>) =
        rows.into_iter().partition(|&r| data[r][feature] < threshold);

    Node::Split {
        feature,
        threshold,
        left: Box::new(grow(data, left, depth + 1, limit, rng)),
        right: Box::new(grow(data, right, depth + 1, limit, rng)),
    }
}

fn path_length(node: &Node, row: &Row, depth: usize) -> f64 {
    match node {
        Node::Leaf { size } => depth as f64 + average_path_length(*size),
        Node::Split {
            feature,
            threshold,
            left,
            right,
        } => {
            if row[*feature] < *threshold {
                path_length(left, row, depth + 1)
            } else {
                path_length(right, row, depth + 1)
            }
        }
    }
}

/// Average path length of an unsuccessful BST search over `n` items, `c(n)`.
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// Linearly interpolated quantile, `q` in [0, 1].
fn percentile(values: &[f64], q: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}
