use ndarray::{Array1, Array2};
use tracing::debug;

use crate::data::validate_aligned;
use crate::types::{ScmError, SolverOptions, StepSize, WeightVector};

/// Clamp negatives to zero and rescale onto the unit simplex.
///
/// Falls back to uniform weights when nothing positive is left.
fn project_to_simplex(w: &mut Array1<f64>) {
    w.mapv_inplace(|v| if v > 0.0 { v } else { 0.0 });
    let total = w.sum();
    if total > 0.0 && total.is_finite() {
        *w /= total;
    } else {
        w.fill(1.0 / w.len() as f64);
    }
}

fn max_abs(x: &Array2<f64>) -> f64 {
    x.iter().fold(0.0_f64, |acc, &v| acc.max(v.abs()))
}

fn step_length(x_norm: &Array2<f64>, step: &StepSize) -> f64 {
    match *step {
        StepSize::Fixed { rate } => rate,
        StepSize::Lipschitz => {
            // ||X||_F^2 >= largest eigenvalue of X^T X
            let frob_sq: f64 = x_norm.iter().map(|&v| v * v).sum();
            if frob_sq > 0.0 {
                1.0 / frob_sq
            } else {
                0.0
            }
        }
    }
}

/// Find simplex-constrained donor weights that track the treated series.
///
/// Minimizes `sum_t (treated[t] - sum_d w[d] * donors[t, d])^2` subject to
/// `w >= 0` and `sum(w) == 1`, using projected gradient descent from the
/// uniform vector. Both inputs are divided by the largest absolute donor value
/// before iterating, so the step size is independent of the indicator's units.
///
/// The solver is deterministic: identical inputs give bit-identical weights.
///
/// # Arguments
/// * `donors_pre` - Pre-period donor matrix (years x donors)
/// * `treated_pre` - Pre-period treated series, aligned with `donors_pre` rows
/// * `opts` - Iteration count, step rule and optional early-stop tolerance
///
/// # Errors
/// Returns `ScmError::EmptyInput` for an empty matrix and
/// `ScmError::LengthMismatch` when rows and treated length differ. Degenerate
/// numerics (all-zero donors, weights clamped to nothing) fall back to uniform
/// weights instead of failing.
pub fn solve_weights(
    donors_pre: &Array2<f64>,
    treated_pre: &Array1<f64>,
    opts: &SolverOptions,
) -> Result<WeightVector, ScmError> {
    let (_rows, d) = validate_aligned(donors_pre, treated_pre)?;

    let mut w = Array1::<f64>::from_elem(d, 1.0 / d as f64);

    let scale = max_abs(donors_pre);
    if scale == 0.0 || !scale.is_finite() {
        debug!(donors = d, "degenerate donor scale; returning uniform weights");
        return Ok(WeightVector::from_projected(w.to_vec()));
    }

    let x = donors_pre / scale;
    let y = treated_pre / scale;
    let lr = step_length(&x, &opts.step);
    let xt = x.t();

    let mut iterations = 0;
    for _iter in 0..opts.max_iter {
        iterations += 1;
        let error = x.dot(&w) - &y;
        let grad = xt.dot(&error);

        let prev = if opts.tolerance.is_some() {
            Some(w.clone())
        } else {
            None
        };

        w.scaled_add(-lr, &grad);
        project_to_simplex(&mut w);

        if let (Some(tol), Some(prev)) = (opts.tolerance, prev) {
            let max_delta = w
                .iter()
                .zip(prev.iter())
                .fold(0.0_f64, |acc, (a, b)| acc.max((a - b).abs()));
            if max_delta < tol {
                break;
            }
        }
    }

    debug!(donors = d, iterations, step = lr, "weight solver finished");
    Ok(WeightVector::from_projected(w.to_vec()))
}
