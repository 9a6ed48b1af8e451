use crate::config::StatementConfig;
use crate::handlers;
use crate::pipeline::{Categorizer, ExtractionClient, PipelineDeps, StatementPipeline};
use crate::services::{
    CategoryCache, GeminiConfig, GeminiTextProvider, PdfTextExtractor, StatementDb, TextProvider,
    TransactionStore,
};
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, patch, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::request_id_middleware;
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;

/// Files accepted in one preview request.
const MAX_FILES_PER_PREVIEW: usize = 10;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<StatementPipeline>,
    pub transactions: Arc<dyn TransactionStore>,
    pub cache: Arc<dyn CategoryCache>,
    /// Providers health-checked by `/ready`.
    pub models: Vec<Arc<dyn TextProvider>>,
    pub admin_token: Option<String>,
    pub max_upload_bytes: usize,
}

pub fn build_router(state: AppState) -> Router {
    let preview_body_limit = state
        .max_upload_bytes
        .saturating_mul(MAX_FILES_PER_PREVIEW);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness))
        .route("/metrics", get(handlers::metrics))
        .route(
            "/statements/preview",
            post(handlers::preview_statement).layer(DefaultBodyLimit::max(preview_body_limit)),
        )
        .route("/statements/confirm", post(handlers::confirm_statement))
        .route(
            "/transactions/:id/category",
            patch(handlers::override_category),
        )
        .route(
            "/admin/category-cache/:merchant_key",
            delete(handlers::invalidate_category_cache),
        )
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn gemini(api_key: &str, model: &str) -> Result<Arc<dyn TextProvider>, AppError> {
    let provider = GeminiTextProvider::new(GeminiConfig {
        api_key: api_key.to_string(),
        model: model.to_string(),
    })
    .map_err(|e| AppError::ConfigError(anyhow::anyhow!("Gemini provider for {}: {}", model, e)))?;
    Ok(Arc::new(provider))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

pub struct Application {
    port: u16,
    server: Box<dyn std::future::Future<Output = std::io::Result<()>> + Send + Unpin>,
}

impl Application {
    pub async fn build(config: StatementConfig) -> Result<Self, AppError> {
        let db = StatementDb::connect(&config.mongodb.uri, &config.mongodb.database)
            .await
            .map_err(|e| {
                tracing::error!("Failed to connect to MongoDB: {}", e);
                e
            })?;
        db.initialize_indexes().await.map_err(|e| {
            tracing::error!("Failed to initialize database indexes: {}", e);
            e
        })?;

        let llm = &config.llm;
        let fast = gemini(&llm.api_key, &llm.fast_model)?;
        let strong = gemini(&llm.api_key, &llm.strong_model)?;
        let categorization = gemini(&llm.api_key, &llm.categorization_model)?;

        let store = Arc::new(db);
        let extraction_timeout = Duration::from_secs(config.uploads.extraction_timeout_secs);

        // One health check per distinct model name.
        let mut models: Vec<Arc<dyn TextProvider>> = Vec::new();
        for provider in [&fast, &strong, &categorization] {
            if !models.iter().any(|m| m.model() == provider.model()) {
                models.push(provider.clone());
            }
        }

        let pipeline = StatementPipeline::new(PipelineDeps {
            extraction: ExtractionClient::new(fast, strong),
            categorizer: Categorizer::new(categorization, store.clone()),
            text_extractor: Arc::new(PdfTextExtractor::new(
                config.uploads.tmp_dir.clone(),
                extraction_timeout,
            )),
            accounts: store.clone(),
            cards: store.clone(),
            transactions: store.clone(),
            quotas: config.quotas,
            extraction_timeout,
        });

        let state = AppState {
            pipeline: Arc::new(pipeline),
            transactions: store.clone(),
            cache: store,
            models,
            admin_token: config.admin_token.clone(),
            max_upload_bytes: config.uploads.max_bytes,
        };

        let app = build_router(state);

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(
            port,
            fast_model = %llm.fast_model,
            strong_model = %llm.strong_model,
            "statement-service listening"
        );

        let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());

        Ok(Self {
            port,
            server: Box::new(server.into_future()),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.server.await
    }
}
