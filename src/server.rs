//! HTTP surface of the estimator.
//!
//! Routes:
//! - `GET /scm?indicator=KEY` (also served at `/api/scm`)
//! - `GET /indicators`
//! - `GET /health`

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::config::ScmConfig;
use crate::estimate::run_scm;
use crate::provider::IndicatorSource;
use crate::types::{ErrorKind, ScmError, ScmEstimate};

/// Shared, read-only server state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ScmConfig>,
    pub source: Arc<dyn IndicatorSource>,
}

impl AppState {
    pub fn new(config: ScmConfig, source: Arc<dyn IndicatorSource>) -> Self {
        Self {
            config: Arc::new(config),
            source,
        }
    }
}

/// Query parameters of the estimation endpoint.
#[derive(Debug, Deserialize)]
pub struct ScmQuery {
    pub indicator: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct IndicatorEntry {
    pub key: String,
    pub code: String,
    pub label: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    detail: String,
    kind: ErrorKind,
}

/// `ScmError` rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub ScmError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            ScmError::TreatedUnavailable { .. } => StatusCode::NOT_FOUND,
            ScmError::InsufficientDonors { .. }
            | ScmError::InsufficientHistory { .. }
            | ScmError::UnknownIndicator(_) => StatusCode::BAD_REQUEST,
            ScmError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            ScmError::Transport(_) | ScmError::MalformedResponse(_) => StatusCode::BAD_GATEWAY,
            ScmError::LengthMismatch | ScmError::EmptyInput | ScmError::InvalidConfig(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<ScmError> for ApiError {
    fn from(err: ScmError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self.0, "request failed");
        } else {
            warn!(status = status.as_u16(), error = %self.0, "request rejected");
        }
        let body = ErrorBody {
            detail: self.0.to_string(),
            kind: self.0.kind(),
        };
        (status, Json(body)).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/scm", get(scm_handler))
        .route("/api/scm", get(scm_handler))
        .route("/indicators", get(indicators_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(bind: &str, state: AppState) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("synthetic-control server listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn scm_handler(
    State(state): State<AppState>,
    Query(q): Query<ScmQuery>,
) -> Result<Json<ScmEstimate>, ApiError> {
    let key = q
        .indicator
        .unwrap_or_else(|| state.config.default_indicator.clone());
    let estimate = run_scm(state.source.as_ref(), &state.config, &key).await?;
    Ok(Json(estimate))
}

async fn indicators_handler(State(state): State<AppState>) -> Json<Vec<IndicatorEntry>> {
    Json(
        state
            .config
            .indicators
            .iter()
            .map(|(key, spec)| IndicatorEntry {
                key: key.clone(),
                code: spec.code.clone(),
                label: spec.label.clone(),
            })
            .collect(),
    )
}

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "synth_scm",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
