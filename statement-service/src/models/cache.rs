use super::category::Category;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Global merchant -> category mapping learned from model answers.
///
/// Shared across all users: only the merchant key and category are stored,
/// never amounts or user identifiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryCacheEntry {
    pub merchant_key: String,
    pub category: Category,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

fn default_confidence() -> f64 {
    crate::pipeline::policy::AI_CACHE_CONFIDENCE
}

impl CategoryCacheEntry {
    pub fn new(merchant_key: String, category: Category) -> Self {
        Self {
            merchant_key,
            category,
            confidence: default_confidence(),
            created_at: Utc::now(),
        }
    }
}
