use serde::Deserialize;
use service_core::config::{self as core_config, get_env, is_production};
use service_core::error::AppError;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Deserialize)]
pub struct StatementConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub mongodb: MongoConfig,
    pub llm: LlmConfig,
    pub quotas: QuotaConfig,
    pub uploads: UploadConfig,
    /// Shared secret for `/admin` routes; admin routes are disabled when unset.
    pub admin_token: Option<String>,
    pub otlp_endpoint: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub api_key: String,
    pub fast_model: String,
    pub strong_model: String,
    pub categorization_model: String,
}

/// Daily limits for free accounts. Paying accounts are unlimited.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct QuotaConfig {
    pub daily_previews: u32,
    pub daily_uploads: u32,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            daily_previews: 3,
            daily_uploads: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    pub tmp_dir: PathBuf,
    pub max_bytes: usize,
    pub extraction_timeout_secs: u64,
}

fn parse_env<T: FromStr>(key: &str, default: &str, is_prod: bool) -> Result<T, AppError> {
    let raw = get_env(key, Some(default), is_prod)?;
    raw.parse().map_err(|_| {
        AppError::ConfigError(anyhow::anyhow!("{} has an invalid value: {}", key, raw))
    })
}

impl StatementConfig {
    pub fn load() -> Result<Self, AppError> {
        // Load common config (handles .env and APP__ prefix)
        let common_config = core_config::Config::load()?;
        let is_prod = is_production();

        let fast_model = get_env("EXTRACTION_FAST_MODEL", Some("gemini-2.0-flash"), is_prod)?;

        Ok(StatementConfig {
            common: common_config,
            mongodb: MongoConfig {
                uri: get_env("MONGODB_URI", None, is_prod)?,
                database: get_env("MONGODB_DATABASE", Some("statement_db"), is_prod)?,
            },
            llm: LlmConfig {
                api_key: get_env("GOOGLE_API_KEY", None, is_prod)?,
                strong_model: get_env("EXTRACTION_STRONG_MODEL", Some("gemini-2.5-pro"), is_prod)?,
                categorization_model: get_env("CATEGORIZATION_MODEL", Some(&fast_model), is_prod)?,
                fast_model,
            },
            quotas: QuotaConfig {
                daily_previews: parse_env("FREE_DAILY_PREVIEW_LIMIT", "3", is_prod)?,
                daily_uploads: parse_env("FREE_DAILY_UPLOAD_LIMIT", "3", is_prod)?,
            },
            uploads: UploadConfig {
                tmp_dir: env::var("UPLOAD_TMP_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| env::temp_dir().join("statement-uploads")),
                max_bytes: parse_env("MAX_UPLOAD_BYTES", "20971520", is_prod)?,
                extraction_timeout_secs: parse_env("EXTRACTION_TIMEOUT_SECS", "90", is_prod)?,
            },
            admin_token: env::var("ADMIN_TOKEN").ok().filter(|t| !t.is_empty()),
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|e| !e.is_empty()),
        })
    }
}
