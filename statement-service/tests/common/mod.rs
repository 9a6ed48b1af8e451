//! Common test utilities for statement-service integration tests.
//!
//! The router runs on an ephemeral port over the in-memory store, scripted
//! model providers and a text extractor that returns canned statement text.

use async_trait::async_trait;
use service_core::error::AppError;
use statement_service::config::QuotaConfig;
use statement_service::pipeline::{Categorizer, ExtractionClient, PipelineDeps, StatementPipeline};
use statement_service::services::{InMemoryStore, MockTextProvider, TextExtractor, TextProvider};
use statement_service::startup::{build_router, AppState};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;
use tokio::net::TcpListener;

static INIT: Once = Once::new();

pub const ADMIN_TOKEN: &str = "test-admin-token";

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,statement_service=debug")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Returns registered text per file name; unknown files fail like an
/// unreadable PDF, and hanging files never return.
#[derive(Default)]
pub struct StaticTextExtractor {
    texts: Mutex<HashMap<String, String>>,
    hanging: Mutex<HashSet<String>>,
}

impl StaticTextExtractor {
    pub fn register(&self, file_name: &str, text: &str) {
        if let Ok(mut texts) = self.texts.lock() {
            texts.insert(file_name.to_string(), text.to_string());
        }
    }

    #[allow(dead_code)]
    pub fn register_hanging(&self, file_name: &str) {
        if let Ok(mut hanging) = self.hanging.lock() {
            hanging.insert(file_name.to_string());
        }
    }

    fn hangs(&self, file_name: &str) -> bool {
        self.hanging
            .lock()
            .map(|hanging| hanging.contains(file_name))
            .unwrap_or(false)
    }
}

#[async_trait]
impl TextExtractor for StaticTextExtractor {
    async fn extract_text(&self, file_name: &str, _bytes: &[u8]) -> Result<String, AppError> {
        if self.hangs(file_name) {
            std::future::pending::<()>().await;
        }

        self.texts
            .lock()
            .ok()
            .and_then(|texts| texts.get(file_name).cloned())
            .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("pdftotext failed")))
    }
}

/// Test application wrapper.
#[allow(dead_code)]
pub struct TestApp {
    pub address: String,
    pub store: Arc<InMemoryStore>,
    pub fast: Arc<MockTextProvider>,
    pub strong: Arc<MockTextProvider>,
    pub categorize: Arc<MockTextProvider>,
    pub texts: Arc<StaticTextExtractor>,
    client: reqwest::Client,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with_quotas(QuotaConfig::default()).await
    }

    pub async fn spawn_with_quotas(quotas: QuotaConfig) -> Self {
        Self::spawn_with(quotas, Duration::from_secs(5)).await
    }

    pub async fn spawn_with(quotas: QuotaConfig, extraction_timeout: Duration) -> Self {
        init_tracing();

        let store = Arc::new(InMemoryStore::new());
        let fast = Arc::new(MockTextProvider::new("fast-test"));
        let strong = Arc::new(MockTextProvider::new("strong-test"));
        let categorize = Arc::new(MockTextProvider::new("categorize-test").with_fallback("Other"));
        let texts = Arc::new(StaticTextExtractor::default());

        let pipeline = StatementPipeline::new(PipelineDeps {
            extraction: ExtractionClient::new(fast.clone(), strong.clone()),
            categorizer: Categorizer::new(categorize.clone(), store.clone()),
            text_extractor: texts.clone(),
            accounts: store.clone(),
            cards: store.clone(),
            transactions: store.clone(),
            quotas,
            extraction_timeout,
        });

        let state = AppState {
            pipeline: Arc::new(pipeline),
            transactions: store.clone(),
            cache: store.clone(),
            models: vec![
                fast.clone() as Arc<dyn TextProvider>,
                strong.clone() as Arc<dyn TextProvider>,
                categorize.clone() as Arc<dyn TextProvider>,
            ],
            admin_token: Some(ADMIN_TOKEN.to_string()),
            max_upload_bytes: 1024 * 1024,
        };

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let port = listener
            .local_addr()
            .expect("Failed to read local address")
            .port();

        tokio::spawn(async move {
            axum::serve(listener, build_router(state)).await.ok();
        });

        TestApp {
            address: format!("http://127.0.0.1:{}", port),
            store,
            fast,
            strong,
            categorize,
            texts,
            client: reqwest::Client::new(),
        }
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Upload one file to the preview endpoint as `user_id`.
    pub async fn preview(
        &self,
        user_id: &str,
        file_name: &str,
        content_type: &str,
    ) -> reqwest::Response {
        let part = reqwest::multipart::Part::bytes(b"%PDF-1.4 test".to_vec())
            .file_name(file_name.to_string())
            .mime_str(content_type)
            .expect("Invalid mime type");
        let form = reqwest::multipart::Form::new().part("file", part);

        self.client
            .post(format!("{}/statements/preview", self.address))
            .header("X-User-ID", user_id)
            .multipart(form)
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Upload several PDFs in one preview request, in the given order.
    #[allow(dead_code)]
    pub async fn preview_files(&self, user_id: &str, file_names: &[&str]) -> reqwest::Response {
        let mut form = reqwest::multipart::Form::new();
        for file_name in file_names {
            let part = reqwest::multipart::Part::bytes(b"%PDF-1.4 test".to_vec())
                .file_name(file_name.to_string())
                .mime_str("application/pdf")
                .expect("Invalid mime type");
            form = form.part("files", part);
        }

        self.client
            .post(format!("{}/statements/preview", self.address))
            .header("X-User-ID", user_id)
            .multipart(form)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn confirm(&self, user_id: &str, body: serde_json::Value) -> reqwest::Response {
        self.client
            .post(format!("{}/statements/confirm", self.address))
            .header("X-User-ID", user_id)
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }
}

/// Statement text long enough to pass the extractable-text check.
#[allow(dead_code)]
pub fn statement_text(lines: &[&str]) -> String {
    let mut text = String::from(
        "First Example Bank Checking Statement\nNovember 5, 2025 through December 4, 2025\n",
    );
    for line in lines {
        text.push_str(line);
        text.push('\n');
    }
    text
}
