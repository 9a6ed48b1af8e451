//! Rule-table categorization with a cached model fallback.

use super::merchant::merchant_key;
use super::policy::{
    AI_CACHE_CONFIDENCE, CATEGORIZATION_FAILURE_CONFIDENCE, EMPTY_DESCRIPTION_CONFIDENCE,
    ESCALATE_CATEGORY_BELOW, RULE_CONFIDENCE,
};
use crate::models::{Category, CategoryAssignment, CategoryCacheEntry, CategorySource};
use crate::services::metrics::record_categorization;
use crate::services::providers::{GenerationParams, ProviderError, TextProvider};
use crate::services::stores::CategoryCache;
use std::sync::Arc;
use thiserror::Error;

pub struct CategoryRule {
    pub category: Category,
    pub keywords: &'static [&'static str],
}

/// Evaluated top to bottom; the first category with any matching keyword
/// wins. Order is significant (e.g. "uber eats" before "uber").
pub const RULE_TABLE: &[CategoryRule] = &[
    CategoryRule {
        category: Category::FoodAndDining,
        keywords: &[
            "uber eats", "doordash", "grubhub", "restaurant", "cafe", "coffee", "starbucks",
            "mcdonald", "pizza", "burger", "chipotle", "dunkin", "diner", "bakery", "taco",
        ],
    },
    CategoryRule {
        category: Category::Groceries,
        keywords: &[
            "grocery", "groceries", "supermarket", "whole foods", "trader joe", "safeway",
            "kroger", "costco", "aldi", "publix", "wegmans",
        ],
    },
    CategoryRule {
        category: Category::Transportation,
        keywords: &[
            "uber", "lyft", "taxi", "shell", "chevron", "exxon", "gas station", "fuel",
            "parking", "transit", "toll", "airline", "amtrak",
        ],
    },
    CategoryRule {
        category: Category::Shopping,
        keywords: &[
            "amazon", "walmart", "target", "best buy", "ebay", "etsy", "ikea", "home depot",
            "macy", "nordstrom",
        ],
    },
    CategoryRule {
        category: Category::Entertainment,
        keywords: &[
            "cinema", "movie", "theater", "theatre", "concert", "ticketmaster", "steam games",
            "playstation", "xbox", "bowling",
        ],
    },
    CategoryRule {
        category: Category::Utilities,
        keywords: &[
            "electric", "water bill", "utility", "comcast", "verizon", "at&t", "t-mobile",
            "internet", "pg&e", "energy",
        ],
    },
    CategoryRule {
        category: Category::Healthcare,
        keywords: &[
            "pharmacy", "cvs", "walgreens", "hospital", "clinic", "dental", "doctor", "medical",
        ],
    },
    CategoryRule {
        category: Category::Education,
        keywords: &["tuition", "university", "college", "school", "coursera", "udemy"],
    },
    CategoryRule {
        category: Category::Income,
        keywords: &["salary", "payroll", "direct deposit", "paycheck", "dividend"],
    },
    CategoryRule {
        category: Category::Taxes,
        keywords: &["tax", "internal revenue", "irs treas"],
    },
    CategoryRule {
        category: Category::Transfers,
        keywords: &["zelle", "venmo", "transfer", "paypal", "cash app"],
    },
    CategoryRule {
        category: Category::Subscriptions,
        keywords: &[
            "netflix", "spotify", "hulu", "disney+", "youtube premium", "subscription",
            "membership", "adobe",
        ],
    },
    CategoryRule {
        category: Category::CreditCardPayment,
        keywords: &["payment thank you", "credit card payment", "autopay", "card payment"],
    },
];

#[derive(Debug, Error)]
pub enum CategorizationError {
    #[error("categorization provider failed: {0}")]
    Provider(#[from] ProviderError),
}

impl CategorizationError {
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Provider(e) => e.is_transient(),
        }
    }
}

/// Rule-table lookup. A miss is `UNKNOWN` at confidence 0.
pub fn categorize_by_rules(description: &str) -> CategoryAssignment {
    let lowered = description.to_lowercase();

    RULE_TABLE
        .iter()
        .find(|rule| rule.keywords.iter().any(|keyword| lowered.contains(keyword)))
        .map(|rule| CategoryAssignment::new(rule.category, RULE_CONFIDENCE, CategorySource::Rule))
        .unwrap_or_else(|| CategoryAssignment::new(Category::Unknown, 0.0, CategorySource::Rule))
}

/// Whether a rule result should be replaced by a model answer.
pub fn needs_model(assignment: &CategoryAssignment) -> bool {
    assignment.category.is_unresolved() || assignment.confidence < ESCALATE_CATEGORY_BELOW
}

fn categorization_prompt(description: &str) -> String {
    let names: Vec<&str> = Category::ALL.iter().map(|c| c.as_str()).collect();
    format!(
        "Categorize this bank transaction description into exactly one of: {}.\n\
         Reply with the category name only.\n\n\
         Description: {}",
        names.join(", "),
        description
    )
}

pub struct Categorizer {
    provider: Arc<dyn TextProvider>,
    cache: Arc<dyn CategoryCache>,
}

impl Categorizer {
    pub fn new(provider: Arc<dyn TextProvider>, cache: Arc<dyn CategoryCache>) -> Self {
        Self { provider, cache }
    }

    /// Ask the model for a category. An answer outside the closed set is `Other`.
    pub async fn ask_model(&self, description: &str) -> Result<Category, CategorizationError> {
        let params = GenerationParams {
            temperature: Some(0.0),
            max_tokens: Some(20),
            system_instruction: None,
        };

        let response = self
            .provider
            .generate(&categorization_prompt(description), &params)
            .await?;

        let category = response
            .text
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .and_then(Category::from_name)
            .unwrap_or(Category::Other);
        Ok(category)
    }

    /// Never fails: provider errors degrade to `Other` at low confidence.
    pub async fn categorize(&self, description: &str) -> CategoryAssignment {
        let description = description.trim();
        if description.is_empty() {
            record_categorization(CategorySource::Rule.as_str());
            return CategoryAssignment::new(
                Category::Other,
                EMPTY_DESCRIPTION_CONFIDENCE,
                CategorySource::Rule,
            );
        }

        let by_rules = categorize_by_rules(description);
        if !needs_model(&by_rules) {
            record_categorization(CategorySource::Rule.as_str());
            return by_rules;
        }

        let assignment = self.categorize_with_model(description).await;
        record_categorization(assignment.source.as_str());
        assignment
    }

    async fn categorize_with_model(&self, description: &str) -> CategoryAssignment {
        let key = merchant_key(description);

        if !key.is_empty() {
            match self.cache.get(&key).await {
                Ok(Some(entry)) => {
                    tracing::debug!(merchant_key = %key, category = %entry.category, "Category cache hit");
                    return CategoryAssignment::new(
                        entry.category,
                        entry.confidence,
                        CategorySource::AiCache,
                    );
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(merchant_key = %key, error = %e, "Category cache read failed"),
            }
        }

        match self.ask_model(description).await {
            Ok(category) => {
                if !key.is_empty() {
                    let entry = CategoryCacheEntry::new(key.clone(), category);
                    if let Err(e) = self.cache.put(entry).await {
                        tracing::warn!(merchant_key = %key, error = %e, "Category cache write failed");
                    }
                }
                tracing::debug!(merchant_key = %key, category = %category, "Model categorization");
                CategoryAssignment::new(category, AI_CACHE_CONFIDENCE, CategorySource::Ai)
            }
            Err(e) => {
                tracing::warn!(
                    model = %self.provider.model(),
                    error = %e,
                    transient = e.is_transient(),
                    "Categorization failed, falling back to Other"
                );
                CategoryAssignment::new(
                    Category::Other,
                    CATEGORIZATION_FAILURE_CONFIDENCE,
                    CategorySource::Rule,
                )
            }
        }
    }
}
