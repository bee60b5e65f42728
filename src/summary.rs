use std::cmp::Ordering;
use std::collections::BTreeMap;

use ndarray::Array1;

use crate::types::{Contributor, EffectPoint, FitStats, ScmError, WeightVector, Year};

/// Pair observed and synthetic values per year and compute the gap.
///
/// # Errors
/// Returns `ScmError::LengthMismatch` if the three inputs differ in length.
pub fn effect_series(
    years: &[Year],
    observed: &Array1<f64>,
    synthetic: &Array1<f64>,
) -> Result<Vec<EffectPoint>, ScmError> {
    if years.len() != observed.len() || years.len() != synthetic.len() {
        return Err(ScmError::LengthMismatch);
    }

    Ok(years
        .iter()
        .zip(observed.iter().zip(synthetic.iter()))
        .map(|(&year, (&obs, &syn))| EffectPoint {
            year,
            observed: obs,
            synthetic: syn,
            gap: obs - syn,
        })
        .collect())
}

/// Root mean squared value of `gaps`; 0 for an empty slice.
pub fn rmse(gaps: &[f64]) -> f64 {
    if gaps.is_empty() {
        return 0.0;
    }
    let mse = gaps.iter().map(|g| g * g).sum::<f64>() / gaps.len() as f64;
    mse.sqrt()
}

/// Pre/post RMSE split at `cutoff` (post includes the cutoff year).
///
/// The ratio is post/pre, or 0 when the pre-period fit is exact.
pub fn fit_stats(effects: &[EffectPoint], cutoff: Year) -> FitStats {
    let (pre, post): (Vec<&EffectPoint>, Vec<&EffectPoint>) =
        effects.iter().partition(|p| p.year < cutoff);
    let pre_gaps: Vec<f64> = pre.iter().map(|p| p.gap).collect();
    let post_gaps: Vec<f64> = post.iter().map(|p| p.gap).collect();

    let pre_rmse = rmse(&pre_gaps);
    let post_rmse = rmse(&post_gaps);
    let ratio = if pre_rmse > 0.0 {
        post_rmse / pre_rmse
    } else {
        0.0
    };

    FitStats {
        pre_rmse,
        post_rmse,
        ratio,
    }
}

/// Gaps for the first `count` years from the cutoff, keyed `gap_<year>`.
///
/// Years missing from the series report 0. Stops early rather than wrapping
/// if `cutoff + offset` leaves the `Year` range.
pub fn headline_gaps(effects: &[EffectPoint], cutoff: Year, count: usize) -> BTreeMap<String, f64> {
    (0..count)
        .map_while(|offset| Year::try_from(offset).ok().and_then(|o| cutoff.checked_add(o)))
        .map(|year| {
            let gap = effects
                .iter()
                .find(|p| p.year == year)
                .map(|p| p.gap)
                .unwrap_or(0.0);
            (format!("gap_{}", year), gap)
        })
        .collect()
}

fn round_pct(weight: f64) -> f64 {
    (weight * 1000.0).round() / 10.0
}

/// Donors whose weight exceeds `threshold`, heaviest first.
///
/// # Errors
/// Returns `ScmError::LengthMismatch` if donor names and weights differ in length.
pub fn rank_contributors(
    donors: &[String],
    weights: &WeightVector,
    threshold: f64,
) -> Result<Vec<Contributor>, ScmError> {
    if donors.len() != weights.len() {
        return Err(ScmError::LengthMismatch);
    }

    let mut kept: Vec<(&String, f64)> = donors
        .iter()
        .zip(weights.iter())
        .filter(|&(_, &w)| w > threshold)
        .map(|(unit, &w)| (unit, w))
        .collect();
    // stable: ties keep donor order
    kept.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

    Ok(kept
        .into_iter()
        .map(|(unit, w)| Contributor {
            unit: unit.clone(),
            weight_pct: round_pct(w),
        })
        .collect())
}
