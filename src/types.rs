use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::defaults::{
    DEFAULT_CONTRIBUTOR_THRESHOLD, DEFAULT_HEADLINE_YEARS, DEFAULT_MAX_ITER,
    REFERENCE_LEARNING_RATE,
};

/// Calendar year of an annual observation.
pub type Year = i32;

/// Single `(unit, year, value)` record returned by the statistics provider.
///
/// Null values at the source never become an `Observation`; they are dropped
/// while parsing.
#[derive(Clone, Debug, PartialEq)]
pub struct Observation {
    pub unit: String,
    pub year: Year,
    pub value: f64,
}

impl Observation {
    pub fn new(unit: impl Into<String>, year: Year, value: f64) -> Self {
        Self {
            unit: unit.into(),
            year,
            value,
        }
    }
}

/// Donor weights of a synthetic control.
///
/// Invariant: every entry >= 0 and the entries sum to 1. Instances are only
/// built by the solver (or as the uniform fallback) and cannot be mutated.
///
/// # Example
/// ```
/// use synth_scm::WeightVector;
/// let w = WeightVector::uniform(4);
/// assert_eq!(w.as_slice(), &[0.25, 0.25, 0.25, 0.25]);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct WeightVector(Vec<f64>);

impl WeightVector {
    /// `[1/D, ..., 1/D]`. Empty when `d == 0`.
    pub fn uniform(d: usize) -> Self {
        if d == 0 {
            return Self(Vec::new());
        }
        Self(vec![1.0 / d as f64; d])
    }

    pub(crate) fn from_projected(weights: Vec<f64>) -> Self {
        Self(weights)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, f64> {
        self.0.iter()
    }

    pub fn sum(&self) -> f64 {
        self.0.iter().sum()
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.0
    }
}

/// Step rule for the projected gradient solver.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepSize {
    /// Constant learning rate applied to the normalized problem.
    Fixed { rate: f64 },
    /// `1 / ||X||_F^2` of the normalized donor matrix.
    Lipschitz,
}

impl StepSize {
    /// The fixed learning rate the estimator was originally calibrated with.
    pub fn reference() -> Self {
        Self::Fixed {
            rate: REFERENCE_LEARNING_RATE,
        }
    }
}

impl Default for StepSize {
    fn default() -> Self {
        Self::Lipschitz
    }
}

/// Options for the simplex weight solver.
///
/// # Example
/// ```
/// use synth_scm::{SolverOptions, StepSize};
/// let opts = SolverOptions {
///     max_iter: 3000,
///     step: StepSize::Fixed { rate: 1e-4 },
///     tolerance: None,
/// };
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverOptions {
    /// Number of projected gradient iterations.
    pub max_iter: usize,
    pub step: StepSize,
    /// Stop early once no weight moves by more than this in one iteration.
    /// `None` always runs `max_iter` iterations.
    pub tolerance: Option<f64>,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            max_iter: DEFAULT_MAX_ITER,
            step: StepSize::default(),
            tolerance: None,
        }
    }
}

/// Reporting options for the effect summary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryOptions {
    /// Donors at or below this weight are left out of the contributor list.
    pub contributor_threshold: f64,
    /// Number of years, starting at the cutoff, reported as headline gaps.
    pub headline_years: usize,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            contributor_threshold: DEFAULT_CONTRIBUTOR_THRESHOLD,
            headline_years: DEFAULT_HEADLINE_YEARS,
        }
    }
}

/// Observed vs. synthetic value for one year.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EffectPoint {
    pub year: Year,
    #[serde(rename = "Real")]
    pub observed: f64,
    #[serde(rename = "Synthetic")]
    pub synthetic: f64,
    #[serde(rename = "Gap")]
    pub gap: f64,
}

/// Pre/post fit quality. `ratio` is 0 when `pre_rmse` is 0, which callers
/// should read as "undefined".
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct FitStats {
    pub pre_rmse: f64,
    pub post_rmse: f64,
    pub ratio: f64,
}

/// Donor with a reportable share of the synthetic unit.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Contributor {
    pub unit: String,
    /// Weight in percent, rounded to one decimal.
    pub weight_pct: f64,
}

/// Full result of one synthetic-control estimation.
#[derive(Clone, Debug, Serialize)]
pub struct ScmEstimate {
    pub data: Vec<EffectPoint>,
    /// Headline gaps keyed `gap_<year>`.
    pub metrics: BTreeMap<String, f64>,
    pub stats: FitStats,
    pub contributors: Vec<Contributor>,
    pub indicator: String,
    #[serde(skip)]
    pub donors: Vec<String>,
    #[serde(skip)]
    pub weights: WeightVector,
}

/// Coarse classification of [`ScmError`] used at the HTTP boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    DataUnavailable,
    InvalidRequest,
    TransportFailure,
    Internal,
}

/// Library error type.
#[derive(thiserror::Error, Debug)]
pub enum ScmError {
    /// `indicator` is empty when the panel was built without a provider code.
    #[error("no usable series for treated unit {unit}{}", indicator_suffix(.indicator))]
    TreatedUnavailable { unit: String, indicator: String },
    #[error("insufficient donors with complete data ({found} found, {required} required)")]
    InsufficientDonors { found: usize, required: usize },
    #[error("insufficient pre-period history ({found} years, {required} required)")]
    InsufficientHistory { found: usize, required: usize },
    #[error("unknown indicator: {0}")]
    UnknownIndicator(String),
    #[error("statistics provider request failed: {0}")]
    Transport(String),
    #[error("statistics provider timed out after {secs}s")]
    Timeout { secs: u64 },
    #[error("malformed statistics provider response: {0}")]
    MalformedResponse(String),
    #[error("input lengths mismatch")]
    LengthMismatch,
    #[error("empty input")]
    EmptyInput,
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

fn indicator_suffix(indicator: &str) -> String {
    if indicator.is_empty() {
        String::new()
    } else {
        format!(" ({})", indicator)
    }
}

impl ScmError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::TreatedUnavailable { .. }
            | Self::InsufficientDonors { .. }
            | Self::InsufficientHistory { .. } => ErrorKind::DataUnavailable,
            Self::UnknownIndicator(_) => ErrorKind::InvalidRequest,
            Self::Transport(_) | Self::Timeout { .. } | Self::MalformedResponse(_) => {
                ErrorKind::TransportFailure
            }
            Self::LengthMismatch | Self::EmptyInput | Self::InvalidConfig(_) => {
                ErrorKind::Internal
            }
        }
    }
}

impl From<reqwest::Error> for ScmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::MalformedResponse(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_weights() {
        let w = WeightVector::uniform(5);
        assert_eq!(w.len(), 5);
        assert!((w.sum() - 1.0).abs() < 1e-12);
        assert!(WeightVector::uniform(0).is_empty());
    }

    #[test]
    fn test_error_kinds() {
        let unavailable = ScmError::TreatedUnavailable {
            unit: "RUS".into(),
            indicator: "NY.GDP.MKTP.KD".into(),
        };
        assert_eq!(unavailable.kind(), ErrorKind::DataUnavailable);
        assert_eq!(
            ScmError::InsufficientHistory {
                found: 3,
                required: 5
            }
            .kind(),
            ErrorKind::DataUnavailable
        );
        assert_eq!(
            ScmError::UnknownIndicator("X".into()).kind(),
            ErrorKind::InvalidRequest
        );
        assert_eq!(
            ScmError::Timeout { secs: 15 }.kind(),
            ErrorKind::TransportFailure
        );
        assert_eq!(ScmError::LengthMismatch.kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_treated_unavailable_message() {
        let tagged = ScmError::TreatedUnavailable {
            unit: "RUS".into(),
            indicator: "NY.GDP.MKTP.KD".into(),
        };
        assert_eq!(
            tagged.to_string(),
            "no usable series for treated unit RUS (NY.GDP.MKTP.KD)"
        );

        let untagged = ScmError::TreatedUnavailable {
            unit: "TTT".into(),
            indicator: String::new(),
        };
        assert_eq!(untagged.to_string(), "no usable series for treated unit TTT");
    }

    #[test]
    fn test_effect_point_field_names() {
        let point = EffectPoint {
            year: 2022,
            observed: 10.0,
            synthetic: 8.0,
            gap: 2.0,
        };
        let json = serde_json::to_value(&point).unwrap();
        assert_eq!(json["year"], 2022);
        assert_eq!(json["Real"], 10.0);
        assert_eq!(json["Synthetic"], 8.0);
        assert_eq!(json["Gap"], 2.0);
    }

    #[test]
    fn test_step_size_from_toml() {
        let opts: SolverOptions =
            toml::from_str("max_iter = 10\nstep = { kind = \"fixed\", rate = 0.5 }").unwrap();
        assert_eq!(opts.max_iter, 10);
        assert_eq!(opts.step, StepSize::Fixed { rate: 0.5 });
        assert_eq!(opts.tolerance, None);

        let opts: SolverOptions = toml::from_str("step = { kind = \"lipschitz\" }").unwrap();
        assert_eq!(opts.step, StepSize::Lipschitz);
        assert_eq!(opts.max_iter, DEFAULT_MAX_ITER);
    }
}
