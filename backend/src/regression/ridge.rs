//! Ridge regression of hourly mean temperatures on heat source statuses.
//!
//! Every lapse sample holding a mean temperature becomes one observation. The
//! features are the heat sources seen in any of those samples (sorted by name),
//! valued 1 when the source was only seen on during the hour and 0 otherwise;
//! a source seen both on and off in the same hour counts as off. The
//! model is fitted with an intercept by centring the data and solving the
//! penalized normal equations `(XᵀX + αI) β = Xᵀy`.

use std::collections::BTreeSet;

use super::error::{RegressionError, RegressionResult};
use super::protocol::{RegressionModel, SourceCoefficient};
use crate::monitoring::LapseSample;

/// Default ridge penalty.
pub const DEFAULT_ALPHA: f64 = 0.4;

/// Fit a ridge model on the samples.
///
/// Returns `Ok(None)` when there is nothing to fit: no sample with a mean
/// temperature, or no heat source seen in those samples.
pub fn fit_regression_model(samples: &[LapseSample], alpha: f64) -> RegressionResult<Option<RegressionModel>> {
    if !(alpha.is_finite() && alpha >= 0.0) {
        return Err(RegressionError::InvalidParameter(format!(
            "alpha must be a non-negative number, got {}",
            alpha
        )));
    }

    let observations: Vec<(&LapseSample, f64)> = samples
        .iter()
        .filter_map(|sample| sample.mean_temperature.map(|mean| (sample, mean)))
        .collect();
    if observations.is_empty() {
        return Ok(None);
    }

    let sources: Vec<&String> = observations
        .iter()
        .flat_map(|(sample, _)| sample.statuses_on.iter().chain(sample.statuses_off.iter()))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if sources.is_empty() {
        return Ok(None);
    }

    let rows: Vec<Vec<f64>> = observations
        .iter()
        .map(|(sample, _)| {
            sources
                .iter()
                .map(|source| {
                    let on = sample.statuses_on.contains(*source) && !sample.statuses_off.contains(*source);
                    if on { 1.0 } else { 0.0 }
                })
                .collect()
        })
        .collect();
    let targets: Vec<f64> = observations.iter().map(|(_, mean)| *mean).collect();

    let n = rows.len() as f64;
    let features = sources.len();
    let feature_means: Vec<f64> = (0..features)
        .map(|j| rows.iter().map(|row| row[j]).sum::<f64>() / n)
        .collect();
    let target_mean = targets.iter().sum::<f64>() / n;

    // centred normal equations
    let mut gram = vec![vec![0.0; features]; features];
    let mut moment = vec![0.0; features];
    for (row, target) in rows.iter().zip(&targets) {
        let centred: Vec<f64> = row.iter().zip(&feature_means).map(|(x, m)| x - m).collect();
        let target = target - target_mean;
        for i in 0..features {
            moment[i] += centred[i] * target;
            for j in 0..features {
                gram[i][j] += centred[i] * centred[j];
            }
        }
    }
    for (i, row) in gram.iter_mut().enumerate() {
        row[i] += alpha;
    }

    let coefficients =
        solve_linear_system(gram, moment).ok_or(RegressionError::SingularSystem { features })?;
    let intercept = target_mean
        - coefficients
            .iter()
            .zip(&feature_means)
            .map(|(coef, mean)| coef * mean)
            .sum::<f64>();

    let predictions: Vec<f64> = rows
        .iter()
        .map(|row| intercept + row.iter().zip(&coefficients).map(|(x, c)| x * c).sum::<f64>())
        .collect();

    Ok(Some(RegressionModel {
        intercept,
        score: r2_score(&targets, &predictions),
        coefficients: sources
            .into_iter()
            .zip(coefficients)
            .map(|(source, coef)| SourceCoefficient {
                source: source.clone(),
                coef,
            })
            .collect(),
    }))
}

/// Coefficient of determination; constant targets score 1 when perfectly predicted, else 0.
pub fn r2_score(targets: &[f64], predictions: &[f64]) -> f64 {
    let mean = targets.iter().sum::<f64>() / targets.len() as f64;
    let residual: f64 = targets
        .iter()
        .zip(predictions)
        .map(|(y, p)| (y - p).powi(2))
        .sum();
    let total: f64 = targets.iter().map(|y| (y - mean).powi(2)).sum();

    if total == 0.0 {
        return if residual == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - residual / total
}

/// Gaussian elimination with partial pivoting. `None` for singular systems.
fn solve_linear_system(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    const EPSILON: f64 = 1e-12;
    let n = b.len();

    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot][col].abs() < EPSILON {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Some(x)
}
