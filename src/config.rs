//! Experiment design and service configuration.
//!
//! Every design parameter of the estimation (treated unit, donor pool, window,
//! cutoff, indicator table) lives in [`ScmConfig`], which is passed explicitly
//! to the panel builder and the orchestration. Defaults reproduce the 2022
//! sanctions study; a TOML file can override any subset of fields.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::defaults::{
    DEFAULT_CUTOFF_YEAR, DEFAULT_DONOR_POOL, DEFAULT_END_YEAR, DEFAULT_FETCH_TIMEOUT_SECS,
    DEFAULT_INDICATOR, DEFAULT_INDICATORS, DEFAULT_PER_PAGE, DEFAULT_PROVIDER_URL,
    DEFAULT_START_YEAR, DEFAULT_TREATED_UNIT, MAX_HEADLINE_YEARS,
};
use crate::types::{ScmError, SolverOptions, StepSize, SummaryOptions, Year};

/// Provider code and display label of one indicator key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSpec {
    pub code: String,
    pub label: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub per_page: usize,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_PROVIDER_URL.to_string(),
            timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

/// Full estimator configuration.
///
/// # Example
/// ```
/// use synth_scm::ScmConfig;
/// let config: ScmConfig = toml::from_str(r#"
///     treated_unit = "TTT"
///     donor_pool = ["AAA", "BBB", "CCC"]
///     cutoff_year = 2020
/// "#).unwrap();
/// assert!(config.validate().is_ok());
/// assert_eq!(config.start_year, 2010);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScmConfig {
    pub treated_unit: String,
    pub donor_pool: Vec<String>,
    pub start_year: Year,
    pub end_year: Year,
    /// First post-treatment year.
    pub cutoff_year: Year,
    pub default_indicator: String,
    pub indicators: BTreeMap<String, IndicatorSpec>,
    pub provider: ProviderConfig,
    pub solver: SolverOptions,
    pub summary: SummaryOptions,
    /// Enables the fetch cache with this time-to-live.
    pub cache_ttl_secs: Option<u64>,
}

impl Default for ScmConfig {
    fn default() -> Self {
        Self {
            treated_unit: DEFAULT_TREATED_UNIT.to_string(),
            donor_pool: DEFAULT_DONOR_POOL.iter().map(|s| s.to_string()).collect(),
            start_year: DEFAULT_START_YEAR,
            end_year: DEFAULT_END_YEAR,
            cutoff_year: DEFAULT_CUTOFF_YEAR,
            default_indicator: DEFAULT_INDICATOR.to_string(),
            indicators: DEFAULT_INDICATORS
                .iter()
                .map(|&(key, code, label)| {
                    (
                        key.to_string(),
                        IndicatorSpec {
                            code: code.to_string(),
                            label: label.to_string(),
                        },
                    )
                })
                .collect(),
            provider: ProviderConfig::default(),
            solver: SolverOptions::default(),
            summary: SummaryOptions::default(),
            cache_ttl_secs: None,
        }
    }
}

impl ScmConfig {
    /// Read and validate a TOML configuration file.
    ///
    /// # Errors
    /// Returns `ScmError::InvalidConfig` if the file cannot be read, parsed or validated.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ScmError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ScmError::InvalidConfig(format!("{}: {}", path.display(), e)))?;
        let config: Self = toml::from_str(&text)
            .map_err(|e| ScmError::InvalidConfig(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Look up an indicator key.
    ///
    /// # Errors
    /// Returns `ScmError::UnknownIndicator` for keys missing from the table.
    pub fn indicator(&self, key: &str) -> Result<&IndicatorSpec, ScmError> {
        self.indicators
            .get(key)
            .ok_or_else(|| ScmError::UnknownIndicator(key.to_string()))
    }

    /// Treated unit followed by the donor pool, as sent to the provider.
    pub fn all_units(&self) -> Vec<String> {
        std::iter::once(self.treated_unit.clone())
            .chain(self.donor_pool.iter().cloned())
            .collect()
    }

    pub fn validate(&self) -> Result<(), ScmError> {
        let invalid = |msg: String| Err(ScmError::InvalidConfig(msg));

        if self.treated_unit.trim().is_empty() {
            return invalid("treated_unit must not be empty".to_string());
        }
        if self.donor_pool.iter().any(|d| d == &self.treated_unit) {
            return invalid(format!(
                "treated unit {} is also listed as a donor",
                self.treated_unit
            ));
        }
        let mut seen = HashSet::new();
        for donor in &self.donor_pool {
            if !seen.insert(donor.as_str()) {
                return invalid(format!("duplicate donor {}", donor));
            }
        }
        if self.start_year > self.end_year {
            return invalid(format!(
                "start_year {} is after end_year {}",
                self.start_year, self.end_year
            ));
        }
        if self.cutoff_year <= self.start_year || self.cutoff_year > self.end_year {
            return invalid(format!(
                "cutoff_year {} must lie in ({}, {}]",
                self.cutoff_year, self.start_year, self.end_year
            ));
        }
        if self.indicators.is_empty() {
            return invalid("indicator table is empty".to_string());
        }
        if !self.indicators.contains_key(&self.default_indicator) {
            return invalid(format!(
                "default indicator {} is not in the indicator table",
                self.default_indicator
            ));
        }
        if self.provider.timeout_secs == 0 {
            return invalid("provider.timeout_secs must be positive".to_string());
        }
        if self.solver.max_iter == 0 {
            return invalid("solver.max_iter must be positive".to_string());
        }
        if let StepSize::Fixed { rate } = self.solver.step {
            if !(rate.is_finite() && rate > 0.0) {
                return invalid(format!("solver step rate {} must be positive", rate));
            }
        }
        let threshold = self.summary.contributor_threshold;
        if !(threshold.is_finite() && (0.0..1.0).contains(&threshold)) {
            return invalid(format!(
                "summary.contributor_threshold {} must lie in [0, 1)",
                threshold
            ));
        }
        if self.summary.headline_years > MAX_HEADLINE_YEARS {
            return invalid(format!(
                "summary.headline_years {} exceeds {}",
                self.summary.headline_years, MAX_HEADLINE_YEARS
            ));
        }
        if self.cache_ttl_secs == Some(0) {
            return invalid("cache_ttl_secs must be positive when set".to_string());
        }
        Ok(())
    }
}
