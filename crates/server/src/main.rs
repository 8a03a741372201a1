use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use vigil_server::config::{self, LogConfig, ServerConfig};
use vigil_server::metrics::server_metrics::ServerMetrics;
use vigil_server::rest::{self, AppState};
use vigil_server::store::{Fixtures, Stores};

#[derive(Parser)]
#[command(name = "vigil_server", version, about = "Alert rule status API")]
struct Args {
    #[arg(long, env = "VIGIL_CONFIG", help = "Path to the server config file")]
    config: Option<PathBuf>,

    #[arg(long, help = "REST listen address (overrides config)")]
    rest_addr: Option<SocketAddr>,
}

fn init_logging(log: &LogConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));
    if log.json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!("SIGTERM handler unavailable: {e}");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut cfg = match &args.config {
        Some(path) => config::load_from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ServerConfig::default(),
    };
    if let Some(addr) = args.rest_addr {
        cfg.rest_addr = addr;
    }
    init_logging(&cfg.log);

    let stores = Stores::new();
    if let Some(path) = &cfg.fixtures {
        Fixtures::load_from_file(path)
            .with_context(|| format!("loading fixtures {}", path.display()))?
            .apply(&stores);
    }

    let state = AppState {
        service: stores.service(cfg.pagination),
        stores,
        metrics: ServerMetrics::new(),
        default_org_id: cfg.default_org_id,
    };
    let app = rest::router(state);

    let rest_addr = cfg.rest_addr;
    tracing::info!(%rest_addr, pagination = ?cfg.pagination, "REST server starting");
    let listener = tokio::net::TcpListener::bind(rest_addr)
        .await
        .with_context(|| format!("binding {rest_addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown())
        .await
        .context("REST server failed")?;

    tracing::info!("REST server stopped");
    Ok(())
}
