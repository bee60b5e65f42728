//! Statistics-provider access.
//!
//! [`IndicatorSource`] is the seam between the estimator and the outside
//! world. [`WorldBankClient`] talks to the World Bank v2 API; [`StaticSource`]
//! serves a fixed set of observations (captured data, tests).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ProviderConfig;
use crate::types::{Observation, ScmError, Year};

/// One outbound indicator query: every unit, one indicator, one year window.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FetchRequest {
    pub indicator_code: String,
    pub units: Vec<String>,
    pub start_year: Year,
    pub end_year: Year,
}

/// Anything that can answer a [`FetchRequest`] with raw observations.
#[async_trait]
pub trait IndicatorSource: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<Observation>, ScmError>;
}

#[derive(Debug, Deserialize)]
struct WbRecord {
    #[serde(default)]
    countryiso3code: String,
    date: String,
    value: Option<f64>,
}

/// Parse a World Bank v2 JSON payload into observations.
///
/// The payload is `[page_info, records]`. Records with a null value, an empty
/// country code or a non-numeric date are skipped. A `null` record page means
/// the provider has no data and yields an empty list.
///
/// # Errors
/// Returns `ScmError::MalformedResponse` if the payload is not a two-element
/// array or the record page cannot be decoded.
pub fn parse_world_bank_payload(payload: Value) -> Result<Vec<Observation>, ScmError> {
    let mut parts = match payload {
        Value::Array(parts) if parts.len() >= 2 => parts,
        Value::Array(parts) => {
            return Err(ScmError::MalformedResponse(format!(
                "expected [page_info, records], got {} element(s): {}",
                parts.len(),
                Value::Array(parts.clone())
            )))
        }
        other => {
            return Err(ScmError::MalformedResponse(format!(
                "expected a JSON array, got {}",
                other
            )))
        }
    };

    let records = parts.swap_remove(1);
    if records.is_null() {
        return Ok(Vec::new());
    }
    let records: Vec<WbRecord> = serde_json::from_value(records)
        .map_err(|e| ScmError::MalformedResponse(e.to_string()))?;

    let total = records.len();
    let observations: Vec<Observation> = records
        .into_iter()
        .filter_map(|r| {
            let value = r.value?;
            if r.countryiso3code.is_empty() {
                return None;
            }
            let year = r.date.trim().parse::<Year>().ok()?;
            Some(Observation {
                unit: r.countryiso3code,
                year,
                value,
            })
        })
        .collect();

    debug!(
        records = total,
        kept = observations.len(),
        "parsed provider payload"
    );
    Ok(observations)
}

/// HTTP client for the World Bank indicators API.
pub struct WorldBankClient {
    client: reqwest::Client,
    base_url: String,
    per_page: usize,
    timeout: Duration,
}

impl WorldBankClient {
    /// # Errors
    /// Returns `ScmError::InvalidConfig` if the HTTP client cannot be built.
    pub fn new(config: &ProviderConfig) -> Result<Self, ScmError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("synth_scm/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ScmError::InvalidConfig(format!("http client: {}", e)))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            per_page: config.per_page,
            timeout,
        })
    }

    pub fn url_for(&self, request: &FetchRequest) -> String {
        format!(
            "{}/country/{}/indicator/{}",
            self.base_url,
            request.units.join(";"),
            request.indicator_code
        )
    }

    async fn get_payload(&self, request: &FetchRequest) -> Result<Value, ScmError> {
        let url = self.url_for(request);
        let date = format!("{}:{}", request.start_year, request.end_year);
        let per_page = self.per_page.to_string();
        debug!(%url, %date, "fetching indicator");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("format", "json"),
                ("per_page", per_page.as_str()),
                ("date", date.as_str()),
            ])
            .send()
            .await
            .map_err(|e| self.classify(e))?
            .error_for_status()
            .map_err(|e| self.classify(e))?;

        response.json::<Value>().await.map_err(|e| self.classify(e))
    }

    fn classify(&self, err: reqwest::Error) -> ScmError {
        if err.is_timeout() {
            ScmError::Timeout {
                secs: self.timeout.as_secs(),
            }
        } else {
            err.into()
        }
    }
}

#[async_trait]
impl IndicatorSource for WorldBankClient {
    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<Observation>, ScmError> {
        // overall deadline, including connect and body
        let payload = tokio::time::timeout(self.timeout, self.get_payload(request))
            .await
            .map_err(|_| ScmError::Timeout {
                secs: self.timeout.as_secs(),
            })?
            .map_err(|e| {
                warn!(indicator = %request.indicator_code, error = %e, "provider request failed");
                e
            })?;
        parse_world_bank_payload(payload)
    }
}

/// In-memory source answering every request from a fixed observation set.
///
/// Observations are filtered to the requested units and window, mirroring what
/// the remote provider returns. `indicator_code` is not checked.
#[derive(Debug, Default)]
pub struct StaticSource {
    observations: Vec<Observation>,
    calls: AtomicUsize,
}

impl StaticSource {
    pub fn new(observations: Vec<Observation>) -> Self {
        Self {
            observations,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of `fetch` calls served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IndicatorSource for StaticSource {
    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<Observation>, ScmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .observations
            .iter()
            .filter(|o| {
                request.units.iter().any(|u| u == &o.unit)
                    && o.year >= request.start_year
                    && o.year <= request.end_year
            })
            .cloned()
            .collect())
    }
}
