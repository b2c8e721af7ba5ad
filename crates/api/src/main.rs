use anyhow::{Context, Result};
use api::config::AppConfig;
use api::{AppState, build_router};
use clap::Parser;
use cloud::Clients;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "dashboards", version, about = "Responsible AI dashboards")]
struct Args {
    /// TOML configuration file (defaults to ./dashboards.toml if present)
    #[arg(short, long, env = "DASHBOARDS_CONFIG")]
    config: Option<PathBuf>,

    /// Override the listen address
    #[arg(short, long)]
    bind: Option<String>,
}

fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }

    init_tracing(&config.logging.level, config.logging.json);
    info!("Starting dashboards v{}", env!("CARGO_PKG_VERSION"));

    let clients = Clients::connect(&config.cloud)?;
    let underwriting = Clients::connect(&config.underwriting_cloud())?;

    let bind = config.server.bind.clone();
    let app = build_router(AppState::new(config, clients, underwriting));

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;
    info!("Server listening on http://{}", bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
