use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use synth_scm::provider::{IndicatorSource, WorldBankClient};
use synth_scm::server::{serve, AppState};
use synth_scm::{CachedSource, ScmConfig};

/// Synthetic-control effect estimation service
#[derive(Parser, Debug)]
#[command(name = "synth-scm-server")]
#[command(about = "Serve synthetic-control estimates over World Bank indicators")]
struct Args {
    /// Address to bind
    #[arg(long, env = "SCM_BIND", default_value = "0.0.0.0:8000")]
    bind: String,

    /// TOML configuration file (built-in study design if omitted)
    #[arg(long, env = "SCM_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => ScmConfig::from_file(path)?,
        None => {
            let config = ScmConfig::default();
            config.validate()?;
            config
        }
    };
    info!(
        treated = %config.treated_unit,
        donors = config.donor_pool.len(),
        window = %format!("{}:{}", config.start_year, config.end_year),
        cutoff = config.cutoff_year,
        "loaded study design"
    );

    let client = WorldBankClient::new(&config.provider)?;
    let source: Arc<dyn IndicatorSource> = match config.cache_ttl_secs {
        Some(ttl) => {
            info!(ttl_secs = ttl, "provider cache enabled");
            Arc::new(CachedSource::new(client, Duration::from_secs(ttl)))
        }
        None => Arc::new(client),
    };

    serve(&args.bind, AppState::new(config, source)).await
}
