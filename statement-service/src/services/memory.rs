//! In-memory storage for tests and local runs without MongoDB.
//!
//! Mirrors the Mongo semantics that matter to the pipeline: the transaction
//! dedupe key, first-write-wins cache inserts and day-stamped quota counters.

use super::stores::{AccountStore, CardRegistry, CategoryCache, TransactionStore};
use crate::models::{
    account::format_day, Account, Card, Category, CategoryCacheEntry, CategorySource, QuotaKind,
    Transaction,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use service_core::error::AppError;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

type DedupeKey = (String, String, String, String, Decimal);

fn dedupe_key(txn: &Transaction) -> DedupeKey {
    (
        txn.user_id.clone(),
        txn.card_id.clone(),
        txn.date.clone(),
        txn.description.clone(),
        txn.amount.normalize(),
    )
}

#[derive(Default)]
pub struct InMemoryStore {
    transactions: RwLock<Vec<Transaction>>,
    cache: RwLock<HashMap<String, CategoryCacheEntry>>,
    accounts: RwLock<HashMap<String, Account>>,
    cards: RwLock<HashMap<String, Card>>,
    cache_writes: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_card(&self, user_id: &str, card_id: &str) {
        self.cards.write().await.insert(
            card_id.to_string(),
            Card {
                card_id: card_id.to_string(),
                user_id: user_id.to_string(),
                name: None,
            },
        );
    }

    pub async fn set_account(&self, account: Account) {
        self.accounts
            .write()
            .await
            .insert(account.user_id.clone(), account);
    }

    pub async fn transactions(&self) -> Vec<Transaction> {
        self.transactions.read().await.clone()
    }

    pub async fn transactions_for(&self, user_id: &str) -> Vec<Transaction> {
        self.transactions
            .read()
            .await
            .iter()
            .filter(|txn| txn.user_id == user_id)
            .cloned()
            .collect()
    }

    /// Number of successful (non-duplicate) cache inserts.
    pub fn cache_writes(&self) -> usize {
        self.cache_writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransactionStore for InMemoryStore {
    async fn insert_unordered(&self, transactions: Vec<Transaction>) -> Result<u64, AppError> {
        let mut stored = self.transactions.write().await;
        let mut seen: HashSet<DedupeKey> = stored.iter().map(dedupe_key).collect();

        let mut inserted = 0;
        for txn in transactions {
            if seen.insert(dedupe_key(&txn)) {
                stored.push(txn);
                inserted += 1;
            }
        }

        Ok(inserted)
    }

    async fn override_category(
        &self,
        user_id: &str,
        transaction_id: &str,
        category: Category,
    ) -> Result<bool, AppError> {
        let mut stored = self.transactions.write().await;
        let Some(txn) = stored
            .iter_mut()
            .find(|txn| txn.id == transaction_id && txn.user_id == user_id)
        else {
            return Ok(false);
        };

        txn.category = category;
        txn.category_source = CategorySource::Manual;
        txn.confidence = 1.0;
        txn.user_overridden = true;
        Ok(true)
    }
}

#[async_trait]
impl CategoryCache for InMemoryStore {
    async fn get(&self, merchant_key: &str) -> Result<Option<CategoryCacheEntry>, AppError> {
        Ok(self.cache.read().await.get(merchant_key).cloned())
    }

    async fn put(&self, entry: CategoryCacheEntry) -> Result<(), AppError> {
        let mut cache = self.cache.write().await;
        if !cache.contains_key(&entry.merchant_key) {
            cache.insert(entry.merchant_key.clone(), entry);
            self.cache_writes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    async fn invalidate(&self, merchant_key: &str) -> Result<bool, AppError> {
        Ok(self.cache.write().await.remove(merchant_key).is_some())
    }
}

#[async_trait]
impl AccountStore for InMemoryStore {
    async fn find_account(&self, user_id: &str) -> Result<Option<Account>, AppError> {
        Ok(self.accounts.read().await.get(user_id).cloned())
    }

    async fn increment_quota(
        &self,
        user_id: &str,
        kind: QuotaKind,
        day: NaiveDate,
    ) -> Result<(), AppError> {
        let today = format_day(day);
        let mut accounts = self.accounts.write().await;
        let account = accounts
            .entry(user_id.to_string())
            .or_insert_with(|| Account::new_free(user_id));

        let (stamp, count) = match kind {
            QuotaKind::Preview => (&mut account.preview_day, &mut account.preview_count),
            QuotaKind::Upload => (&mut account.upload_day, &mut account.upload_count),
        };

        if stamp.as_deref() == Some(today.as_str()) {
            *count += 1;
        } else {
            *stamp = Some(today);
            *count = 1;
        }
        Ok(())
    }
}

#[async_trait]
impl CardRegistry for InMemoryStore {
    async fn owned_cards(
        &self,
        user_id: &str,
        card_ids: &[String],
    ) -> Result<HashSet<String>, AppError> {
        let cards = self.cards.read().await;
        Ok(card_ids
            .iter()
            .filter(|id| cards.get(*id).is_some_and(|card| card.user_id == user_id))
            .cloned()
            .collect())
    }
}
