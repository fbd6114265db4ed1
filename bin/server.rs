// Paycheck Recon - Web Server
// POST /api/calculate-taxes, GET /health

use anyhow::{Context, Result};
use clap::Parser;
use paycheck_recon::api::{build_router, AppState};
use paycheck_recon::{controller_from_config, AppConfig};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for paycheck-server
#[derive(Parser, Debug)]
#[command(name = "paycheck-server")]
#[command(about = "HTTP endpoint for reconciled paycheck withholding")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "PAYCHECK_RECON_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "paycheck_recon=info,paycheck_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = AppConfig::resolve(args.config.as_deref()).context("Failed to load configuration")?;

    info!(
        tolerance_pct = config.reconciliation.tolerance_pct,
        exclude_net_pay = config.reconciliation.exclude_net_pay,
        max_attempts = config.retry.max_attempts,
        "configuration loaded"
    );

    let controller = controller_from_config(&config).context("Failed to build source adapters")?;
    let app = build_router(AppState::new(controller));

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.server.bind))?;

    info!("Server running on http://{}", config.server.bind);

    axum::serve(listener, app)
        .await
        .context("Failed to start server")?;

    Ok(())
}
