use tracing::{debug, info};

use crate::config::ScmConfig;
use crate::data::validate_solvable;
use crate::panel::{build_panel, Panel};
use crate::projector::project_counterfactual;
use crate::provider::{FetchRequest, IndicatorSource};
use crate::solver::solve_weights;
use crate::summary::{effect_series, fit_stats, headline_gaps, rank_contributors};
use crate::types::{ScmError, ScmEstimate, SolverOptions, SummaryOptions, Year};

/// Estimate the treatment effect on `treated` with default solver and summary options.
pub fn estimate(panel: &Panel, treated: &str, cutoff: Year) -> Result<ScmEstimate, ScmError> {
    estimate_effect(
        panel,
        treated,
        cutoff,
        &SolverOptions::default(),
        &SummaryOptions::default(),
    )
}

/// Run solver, projector and summarizer over an already built panel.
///
/// Every panel unit other than `treated` is a donor. Weights are learned on
/// the years before `cutoff` and applied to the whole horizon.
///
/// # Errors
/// * `ScmError::TreatedUnavailable` if `treated` is not a panel column
/// * `ScmError::InsufficientDonors` with fewer than two donors
/// * `ScmError::InsufficientHistory` with fewer than five pre-cutoff years
pub fn estimate_effect(
    panel: &Panel,
    treated: &str,
    cutoff: Year,
    solver: &SolverOptions,
    summary: &SummaryOptions,
) -> Result<ScmEstimate, ScmError> {
    let observed = panel
        .series(treated)
        .ok_or_else(|| ScmError::TreatedUnavailable {
            unit: treated.to_string(),
            indicator: String::new(),
        })?;
    let donors = panel.donors_for(treated);
    let pre_rows = panel.pre_period_len(cutoff);
    validate_solvable(pre_rows, donors.len())?;

    let donors_full = panel.columns(&donors)?;
    let donors_pre = donors_full.slice(ndarray::s![..pre_rows, ..]).to_owned();
    let treated_pre = observed.slice(ndarray::s![..pre_rows]).to_owned();

    let weights = solve_weights(&donors_pre, &treated_pre, solver)?;
    let synthetic = project_counterfactual(&donors_full, &weights)?;

    let data = effect_series(panel.years(), &observed, &synthetic)?;
    let stats = fit_stats(&data, cutoff);
    let metrics = headline_gaps(&data, cutoff, summary.headline_years);
    let contributors = rank_contributors(&donors, &weights, summary.contributor_threshold)?;

    debug!(
        pre_rows,
        donors = donors.len(),
        pre_rmse = stats.pre_rmse,
        post_rmse = stats.post_rmse,
        "synthetic control fitted"
    );

    Ok(ScmEstimate {
        data,
        metrics,
        stats,
        contributors,
        indicator: String::new(),
        donors,
        weights,
    })
}

/// Fetch, build and estimate for one indicator key of the configured study.
///
/// # Errors
/// Returns `ScmError::UnknownIndicator` for keys outside the configured
/// table, provider failures unchanged, and the panel/estimation errors of
/// [`build_panel`] and [`estimate_effect`].
pub async fn run_scm<S>(
    source: &S,
    config: &ScmConfig,
    indicator_key: &str,
) -> Result<ScmEstimate, ScmError>
where
    S: IndicatorSource + ?Sized,
{
    let spec = config.indicator(indicator_key)?;
    let request = FetchRequest {
        indicator_code: spec.code.clone(),
        units: config.all_units(),
        start_year: config.start_year,
        end_year: config.end_year,
    };

    let observations = source.fetch(&request).await?;
    let panel = build_panel(
        &observations,
        &config.treated_unit,
        &config.donor_pool,
        config.start_year,
        config.end_year,
        &spec.code,
    )?;

    let mut result = estimate_effect(
        &panel,
        &config.treated_unit,
        config.cutoff_year,
        &config.solver,
        &config.summary,
    )?;
    result.indicator = indicator_key.to_string();

    info!(
        indicator = indicator_key,
        ratio = result.stats.ratio,
        contributors = result.contributors.len(),
        "estimate complete"
    );
    Ok(result)
}
