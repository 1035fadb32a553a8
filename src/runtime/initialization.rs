//! # Initialization
//!
//! Controller startup: tracing, metrics registration, the HTTP server with a
//! readiness poll, the Kubernetes client, and the reconciler context.

use crate::config::OperatorConfig;
use crate::constants;
use crate::controller::reconciler::Reconciler;
use crate::observability;
use crate::runtime::server::{start_server, ServerState};
use crate::store::KubeStore;
use anyhow::Result;
use kube::Client;
use std::sync::Arc;
use tracing::{error, info};

/// Initialization result with everything the watch loop needs
pub struct InitializationResult {
    /// Kubernetes client
    pub client: Client,
    /// Reconciler context
    pub reconciler: Arc<Reconciler>,
    /// Server state for health checks
    pub server_state: Arc<ServerState>,
}

/// Initialize the operator runtime
pub async fn initialize() -> Result<InitializationResult> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "terraform_operator=info".into()),
        )
        .init();

    info!("Starting Terraform Operator");

    let config = OperatorConfig::from_env();

    observability::metrics::register_metrics()?;

    // Start the HTTP server in the background and wait until it is bound so
    // readiness probes pass immediately after startup
    let server_state = ServerState::new();
    let server_state_clone = server_state.clone();
    let metrics_port = config.metrics_port;

    let server_handle = tokio::spawn(async move {
        if let Err(err) = start_server(metrics_port, server_state_clone).await {
            error!(%err, "HTTP server error");
        }
    });

    wait_for_server_ready(&server_state, &server_handle).await?;

    let client = Client::try_default().await?;

    let store = Arc::new(KubeStore::new(client.clone()));
    let reconciler = Arc::new(Reconciler::new(store, config));

    info!("Operator initialized, starting watch loop...");

    Ok(InitializationResult {
        client,
        reconciler,
        server_state,
    })
}

/// Wait for the HTTP server to become ready
async fn wait_for_server_ready(
    server_state: &Arc<ServerState>,
    server_handle: &tokio::task::JoinHandle<()>,
) -> Result<()> {
    let startup_timeout =
        std::time::Duration::from_secs(constants::DEFAULT_SERVER_STARTUP_TIMEOUT_SECS);
    let poll_interval =
        std::time::Duration::from_millis(constants::DEFAULT_SERVER_POLL_INTERVAL_MS);
    let start_time = std::time::Instant::now();

    loop {
        if server_handle.is_finished() {
            return Err(anyhow::anyhow!("HTTP server failed to start"));
        }

        if server_state
            .is_ready
            .load(std::sync::atomic::Ordering::Relaxed)
        {
            info!("HTTP server is ready and accepting connections");
            break;
        }

        if start_time.elapsed() > startup_timeout {
            return Err(anyhow::anyhow!(
                "HTTP server failed to become ready within {} seconds",
                startup_timeout.as_secs()
            ));
        }

        tokio::time::sleep(poll_interval).await;
    }

    Ok(())
}
