use service_core::observability::init_tracing;
use statement_service::config::StatementConfig;
use statement_service::services::metrics::init_metrics;
use statement_service::startup::Application;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_metrics();

    let config = StatementConfig::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        std::io::Error::other(format!("Configuration error: {}", e))
    })?;

    init_tracing(
        "statement-service",
        &config.common.log_level,
        config.otlp_endpoint.as_deref(),
    );

    let application = Application::build(config).await.map_err(|e| {
        tracing::error!("Failed to build application: {}", e);
        std::io::Error::other(format!("Startup error: {}", e))
    })?;

    tracing::info!(port = application.port(), "Starting statement-service");
    application.run_until_stopped().await
}
