use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use jacport_api::config::ServerConfig;
use jacport_api::router::build_app_router;
use jacport_api::state::AppState;
use jacport_events::JobRegistry;
use jacport_github::{GitHubClient, GitHubConfig};
use jacport_llm::{AnthropicClient, AnthropicConfig, Gateway, GatewayConfig};
use jacport_pipeline::Pipeline;
use tokio_util::task::TaskTracker;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "jacport_api=debug,jacport_pipeline=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Text generation ---
    let anthropic = AnthropicConfig::from_env();
    let gateway_config = GatewayConfig::from_env();
    tracing::info!(
        max_parallel = gateway_config.max_parallel,
        model = %gateway_config.default_model,
        "Text-generation gateway configured",
    );
    let gateway = Arc::new(Gateway::new(
        Arc::new(AnthropicClient::new(anthropic)),
        gateway_config,
    ));

    // --- Source hosting ---
    let github = Arc::new(GitHubClient::new(GitHubConfig::from_env()));

    // --- Registry and pipeline ---
    let registry = Arc::new(JobRegistry::new(config.job_ttl()));
    let pipeline = Arc::new(Pipeline::new(
        Arc::clone(&gateway),
        github,
        Arc::clone(&registry),
        config.pipeline.clone(),
    ));
    tracing::info!(output_dir = %config.pipeline.output_dir.display(), "Pipeline ready");

    // --- App state ---
    let tasks = TaskTracker::new();
    let state = AppState {
        config: Arc::new(config.clone()),
        registry,
        pipeline,
        tasks: tasks.clone(),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!(running = tasks.len(), "Server stopped accepting connections, draining pipelines");

    tasks.close();
    let drain = Duration::from_secs(config.shutdown_timeout_secs);
    if tokio::time::timeout(drain, tasks.wait()).await.is_err() {
        tracing::warn!(remaining = tasks.len(), "Shutdown timeout reached, abandoning running pipelines");
    }
    gateway.close();

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
