use std::net::SocketAddr;
use std::process::ExitCode;

use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use repository_http::{AppState, Config, LogFormat, build_router, metrics, utils};

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            // Logging is configured from the same environment; fall back to stderr.
            eprintln!("Configuration error: {e}");
            return ExitCode::from(exitcode::CONFIG as u8);
        }
    };

    init_tracing(&config);

    info!(
        "Starting repository HTTP service v{}",
        env!("CARGO_PKG_VERSION")
    );

    match run(config).await {
        Ok(()) => ExitCode::from(exitcode::OK as u8),
        Err(exit_code) => ExitCode::from(exit_code as u8),
    }
}

fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true);

    match config.log_format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Text => subscriber.init(),
    }
}

/// Run the application, returning an exit code on error.
async fn run(config: Config) -> Result<(), exitcode::ExitCode> {
    info!(
        host = %config.host,
        port = %config.port,
        base_path = %config.base_path,
        forwarded_headers = config.forwarded_headers_enabled,
        log_format = %config.log_format,
        "Configuration loaded"
    );

    if let Some(metrics_addr) = config.metrics_addr() {
        metrics::try_init_metrics(metrics_addr);
    }

    let addr: SocketAddr = config.server_addr().parse().map_err(|e| {
        error!("Invalid server address: {e}");
        exitcode::CONFIG
    })?;
    let listener = TcpListener::bind(addr).await.map_err(|e| {
        error!("Failed to bind to {addr}: {e}");
        exitcode::UNAVAILABLE
    })?;

    let prefix = config.base_path.trim_end_matches('/').to_string();
    let app = build_router(AppState::new(config));

    info!("Server listening on http://{addr}");
    info!("API endpoints:");
    info!("  GET    {prefix}/health                - Health check");
    info!("  GET    {prefix}/ready                 - Readiness check");
    info!("  GET    {prefix}/rest[/{{path}}]         - Describe resource");
    info!("  POST   {prefix}/rest[/{{path}}]         - Create child (Slug header)");
    info!("  PUT    {prefix}/rest/{{path}}           - Create resource");
    info!("  DELETE {prefix}/rest/{{path}}           - Delete resource tree");
    info!("  GET    {prefix}/namespaces            - List namespace prefixes");
    info!("  PUT    {prefix}/namespaces/{{prefix}}   - Register prefix");
    info!("  DELETE {prefix}/namespaces/{{prefix}}   - Remove prefix");

    axum::serve(listener, app)
        .with_graceful_shutdown(utils::shutdown_signal())
        .await
        .map_err(|e| {
            error!("Server error: {e}");
            exitcode::SOFTWARE
        })?;

    info!("Server shutdown complete");
    Ok(())
}
