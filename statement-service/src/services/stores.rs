//! Storage seams used by the pipeline. Each has a MongoDB implementation
//! ([`super::database`]) and an in-memory one ([`super::memory`]).

use crate::models::{Account, Category, CategoryCacheEntry, QuotaKind, Transaction};
use async_trait::async_trait;
use chrono::NaiveDate;
use service_core::error::AppError;
use std::collections::HashSet;

#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Insert as one unordered batch. Rows that collide with the dedupe
    /// index are skipped; the return value counts rows actually stored.
    async fn insert_unordered(&self, transactions: Vec<Transaction>) -> Result<u64, AppError>;

    /// Pin a user-chosen category. `false` when the transaction does not
    /// exist for this user.
    async fn override_category(
        &self,
        user_id: &str,
        transaction_id: &str,
        category: Category,
    ) -> Result<bool, AppError>;

    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }
}

/// Global merchant-key cache of model categorizations.
#[async_trait]
pub trait CategoryCache: Send + Sync {
    async fn get(&self, merchant_key: &str) -> Result<Option<CategoryCacheEntry>, AppError>;

    /// First write wins; a concurrent duplicate insert is a silent no-op.
    async fn put(&self, entry: CategoryCacheEntry) -> Result<(), AppError>;

    /// Remove an entry so the next lookup asks the model again.
    async fn invalidate(&self, merchant_key: &str) -> Result<bool, AppError>;
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_account(&self, user_id: &str) -> Result<Option<Account>, AppError>;

    /// Bump the daily counter for `day`, resetting it first when the stored
    /// counter belongs to an earlier day.
    async fn increment_quota(
        &self,
        user_id: &str,
        kind: QuotaKind,
        day: NaiveDate,
    ) -> Result<(), AppError>;
}

#[async_trait]
pub trait CardRegistry: Send + Sync {
    /// The subset of `card_ids` owned by `user_id`.
    async fn owned_cards(
        &self,
        user_id: &str,
        card_ids: &[String],
    ) -> Result<HashSet<String>, AppError>;
}
