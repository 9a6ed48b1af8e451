//! Transaction models: ephemeral extraction rows, preview rows and the
//! persisted ledger entry.

use super::category::{Category, CategorySource};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Direction of a transaction, derived from the sign of its amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionType {
    Income,
    Expense,
}

impl TransactionType {
    pub fn from_amount(amount: Decimal) -> Self {
        if amount.is_sign_negative() && !amount.is_zero() {
            Self::Expense
        } else {
            Self::Income
        }
    }
}

/// A row produced by the LLM extraction client or the regex statement parser.
///
/// Never persisted: it always goes through the normalizer and the categorizer
/// first. `date` is the raw token (ISO from the model, ISO or `MM/DD` from
/// the parser).
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateRow {
    pub date: String,
    pub description: String,
    pub amount: Decimal,
    pub kind: TransactionType,
    pub category: Option<Category>,
}

impl CandidateRow {
    pub fn new(date: impl Into<String>, description: impl Into<String>, amount: Decimal) -> Self {
        Self {
            date: date.into(),
            description: description.into(),
            amount,
            kind: TransactionType::from_amount(amount),
            category: None,
        }
    }

    pub fn with_category(mut self, kind: TransactionType, category: Category) -> Self {
        self.kind = kind;
        self.category = Some(category);
        self
    }
}

/// A categorized row returned by preview for user review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewTransaction {
    pub id: String,
    pub date: NaiveDate,
    pub description: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub category: Category,
    pub confidence: f64,
    pub source: CategorySource,
    pub selected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

/// A confirmed transaction as stored in the `transactions` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub card_id: String,
    /// ISO `YYYY-MM-DD`; kept as a string so the dedupe index compares exactly.
    pub date: String,
    pub description: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub currency: String,
    pub category: Category,
    pub confidence: f64,
    pub category_source: CategorySource,
    pub user_overridden: bool,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

/// Fields of a confirmed row that the persisted transaction is built from.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub card_id: String,
    pub date: NaiveDate,
    pub description: String,
    pub amount: Decimal,
    pub currency: String,
    pub category: Category,
    pub confidence: f64,
    pub category_source: CategorySource,
}

impl Transaction {
    pub fn new(user_id: &str, new: NewTransaction) -> Self {
        let user_overridden = new.category_source == CategorySource::Manual;
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            card_id: new.card_id,
            date: new.date.format("%Y-%m-%d").to_string(),
            description: new.description,
            amount: new.amount,
            currency: new.currency,
            category: new.category,
            // A human decision is final.
            confidence: if user_overridden { 1.0 } else { new.confidence },
            category_source: new.category_source,
            user_overridden,
            created_at: Utc::now(),
        }
    }
}
