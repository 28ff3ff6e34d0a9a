use nalgebra::{DMatrix, SymmetricEigen};

use super::matrix::FeatureMatrix;
use crate::error::{PipelineError, Result};
use crate::signal::FEATURE_COUNT;

/// Project every row onto the top `k` principal components.
///
/// Used for 3D scatter views only; labels never depend on it. Components are
/// eigenvectors of the feature covariance matrix, each flipped so that its
/// largest-magnitude entry is positive, which keeps the output stable for a
/// given input. A matrix with a NaN or infinite feature is rejected with
/// [`PipelineError::ModelFitFailure`].
pub fn project(matrix: &FeatureMatrix, k: usize) -> Result<Vec<Vec<f64>>> {
    if k == 0 || k > FEATURE_COUNT {
        return Err(PipelineError::InvalidParameter(format!(
            "projection needs 1..={FEATURE_COUNT} components, got {k}"
        )));
    }
    if matrix.is_empty() {
        return Ok(Vec::new());
    }
    matrix.check_finite()?;

    let values = matrix.values();
    let n = values.len();
    let means: Vec<f64> = (0..FEATURE_COUNT)
        .map(|c| values.iter().map(|row| row[c]).sum::<f64>() / n as f64)
        .collect();
    let centred = DMatrix::from_fn(n, FEATURE_COUNT, |r, c| values[r][c] - means[c]);

    let denom = if n > 1 { (n - 1) as f64 } else { 1.0 };
    let covariance = (centred.transpose() * &centred) / denom;
    let eigen = SymmetricEigen::new(covariance);

    let mut order: Vec<usize> = (0..FEATURE_COUNT).collect();
    order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));

    let mut components = DMatrix::<f64>::zeros(FEATURE_COUNT, k);
    for (out, &src) in order.iter().take(k).enumerate() {
        let mut axis = eigen.eigenvectors.column(src).clone_owned();
        let pivot = axis.iter().copied().fold(0.0f64, |acc, v| {
            if v.abs() > acc.abs() {
                v
            } else {
                acc
            }
        });
        if pivot < 0.0 {
            axis.neg_mut();
        }
        components.set_column(out, &axis);
    }

    let projected = centred * components;
    Ok(projected
        .row_iter()
        .map(|row| row.iter().copied().collect())
        .collect())
}
