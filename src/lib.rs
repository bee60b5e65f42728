//! # synth_scm
//!
//! Synthetic-control estimation of the effect of a shock on one country's
//! macroeconomic indicators.
//!
//! The pipeline runs strictly forward for each request:
//!
//! * **Panel**: fetch `(unit, year, value)` observations and pivot them into a
//!   complete year × unit matrix, dropping any unit with a missing year
//! * **Solve**: learn simplex weights (non-negative, summing to 1) over the
//!   donors that track the treated unit before the cutoff
//! * **Project**: apply the weights to every year, including post-cutoff years
//! * **Summarize**: observed − synthetic gaps, pre/post RMSE and their ratio,
//!   ranked contributing donors
//!
//! ## Example
//!
//! ```
//! use synth_scm::{estimate, Observation, Panel};
//!
//! let mut obs = Vec::new();
//! for year in 2010..=2021 {
//!     let t = (year - 2010) as f64;
//!     let (a, b, c) = (100.0 + 10.0 * t, 200.0 - 8.0 * t, 150.0 + 30.0 * t.sin());
//!     obs.push(Observation::new("AAA", year, a));
//!     obs.push(Observation::new("BBB", year, b));
//!     obs.push(Observation::new("CCC", year, c));
//!     obs.push(Observation::new("TTT", year, 0.5 * a + 0.3 * b + 0.2 * c));
//! }
//! let units: Vec<String> = ["TTT", "AAA", "BBB", "CCC"].iter().map(|s| s.to_string()).collect();
//! let panel = Panel::from_observations(&obs, &units, 2010, 2021).unwrap();
//!
//! let result = estimate(&panel, "TTT", 2018).unwrap();
//! println!("weights: {:?}", result.weights);
//! println!("pre RMSE {:.4}  post RMSE {:.4}", result.stats.pre_rmse, result.stats.post_rmse);
//! ```

// Module declarations
pub mod cache;
pub mod config;
pub mod data;
mod defaults;
pub mod estimate;
pub mod panel;
pub mod projector;
pub mod provider;
pub mod server;
pub mod solver;
pub mod summary;
mod types;

// Re-export public types
pub use cache::CachedSource;
pub use config::{IndicatorSpec, ProviderConfig, ScmConfig};
pub use panel::{build_panel, Panel};
pub use provider::{FetchRequest, IndicatorSource, StaticSource, WorldBankClient};
pub use types::{
    Contributor, EffectPoint, ErrorKind, FitStats, Observation, ScmError, ScmEstimate,
    SolverOptions, StepSize, SummaryOptions, WeightVector, Year,
};

// Re-export main public functions
pub use estimate::{estimate, estimate_effect, run_scm};
pub use projector::project_counterfactual;
pub use solver::solve_weights;
