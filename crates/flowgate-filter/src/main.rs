//! flowgate gateway binary.
//!
//! - Loads `flowgate.yaml` (override with `FLOWGATE_CONFIG`)
//! - Serves `/healthz`, `/metrics`, and the flow-controlled fallback

use std::net::SocketAddr;
use std::process::ExitCode;

use tracing_subscriber::{fmt, EnvFilter};

use flowgate_core::error::{FlowGateError, Result};
use flowgate_filter::{app_state, config, router};

#[tokio::main]
async fn main() -> ExitCode {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "flowgate exited with error");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let path = std::env::var("FLOWGATE_CONFIG").unwrap_or_else(|_| "flowgate.yaml".into());
    let cfg = config::load_from_file(&path)?;
    let listen: SocketAddr = cfg
        .gateway
        .listen
        .parse()
        .map_err(|e| FlowGateError::InvalidConfig(format!("gateway.listen: {e}")))?;

    let state = app_state::AppState::new(cfg)?;
    let app = router::build_router(state);

    tracing::info!(%listen, "flowgate starting");
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| FlowGateError::Internal(format!("bind failed: {e}")))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| FlowGateError::Internal(format!("server failed: {e}")))
}
