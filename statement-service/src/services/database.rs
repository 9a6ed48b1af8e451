use super::metrics::record_db_query;
use super::stores::{AccountStore, CardRegistry, CategoryCache, TransactionStore};
use crate::models::{
    account::format_day, Account, Card, Category, CategoryCacheEntry, CategorySource, QuotaKind,
    Transaction,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use futures::TryStreamExt;
use mongodb::{
    bson::doc,
    error::{ErrorKind, WriteFailure},
    options::{IndexOptions, InsertManyOptions, UpdateOptions},
    Client as MongoClient, Collection, Database, IndexModel,
};
use service_core::error::AppError;
use std::collections::HashSet;
use std::time::Instant;

const DUPLICATE_KEY: i32 = 11000;

#[derive(Clone)]
pub struct StatementDb {
    client: MongoClient,
    db: Database,
}

impl StatementDb {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        tracing::info!("Connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!("Failed to connect to MongoDB: {}", e);
            AppError::from(e)
        })?;
        let db = client.database(database);
        tracing::info!(database = %database, "Successfully connected to MongoDB database");
        Ok(Self { client, db })
    }

    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        tracing::info!("Creating MongoDB indexes for statement-service");

        let transactions = self.transactions();

        // A resubmitted confirm batch collides row by row on this index.
        let dedupe_index = IndexModel::builder()
            .keys(doc! { "user_id": 1, "card_id": 1, "date": 1, "description": 1, "amount": 1 })
            .options(
                IndexOptions::builder()
                    .name("transaction_dedupe".to_string())
                    .unique(true)
                    .build(),
            )
            .build();

        transactions
            .create_index(dedupe_index, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create dedupe index on transactions: {}", e);
                AppError::from(e)
            })?;
        tracing::info!("Created unique index on transactions.(user_id, card_id, date, description, amount)");

        for field in ["user_id", "card_id"] {
            let index = IndexModel::builder()
                .keys(doc! { field: 1 })
                .options(
                    IndexOptions::builder()
                        .name(format!("{}_lookup", field))
                        .build(),
                )
                .build();

            transactions.create_index(index, None).await.map_err(|e| {
                tracing::error!("Failed to create {} index on transactions: {}", field, e);
                AppError::from(e)
            })?;
            tracing::info!("Created index on transactions.{}", field);
        }

        let merchant_index = IndexModel::builder()
            .keys(doc! { "merchant_key": 1 })
            .options(
                IndexOptions::builder()
                    .name("merchant_key_unique".to_string())
                    .unique(true)
                    .build(),
            )
            .build();

        self.category_cache()
            .create_index(merchant_index, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create merchant_key index on category_cache: {}", e);
                AppError::from(e)
            })?;
        tracing::info!("Created unique index on category_cache.merchant_key");

        let card_owner_index = IndexModel::builder()
            .keys(doc! { "user_id": 1 })
            .options(
                IndexOptions::builder()
                    .name("card_owner_lookup".to_string())
                    .build(),
            )
            .build();

        self.cards()
            .create_index(card_owner_index, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create user_id index on cards: {}", e);
                AppError::from(e)
            })?;
        tracing::info!("Created index on cards.user_id");

        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), AppError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                AppError::from(e)
            })?;
        Ok(())
    }

    pub fn transactions(&self) -> Collection<Transaction> {
        self.db.collection("transactions")
    }

    pub fn category_cache(&self) -> Collection<CategoryCacheEntry> {
        self.db.collection("category_cache")
    }

    pub fn accounts(&self) -> Collection<Account> {
        self.db.collection("accounts")
    }

    pub fn cards(&self) -> Collection<Card> {
        self.db.collection("cards")
    }
}

fn is_duplicate_key(error: &mongodb::error::Error) -> bool {
    matches!(
        error.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == DUPLICATE_KEY
    )
}

#[async_trait]
impl TransactionStore for StatementDb {
    async fn insert_unordered(&self, transactions: Vec<Transaction>) -> Result<u64, AppError> {
        if transactions.is_empty() {
            return Ok(0);
        }

        let total = transactions.len() as u64;
        let started = Instant::now();
        let options = InsertManyOptions::builder().ordered(false).build();
        let result = self.transactions().insert_many(transactions, options).await;
        record_db_query("insert_transactions", started.elapsed().as_secs_f64());

        match result {
            Ok(inserted) => Ok(inserted.inserted_ids.len() as u64),
            Err(e) => match e.kind.as_ref() {
                ErrorKind::BulkWrite(failure) if failure.write_concern_error.is_none() => {
                    let write_errors = failure.write_errors.as_deref().unwrap_or_default();
                    let duplicates = write_errors
                        .iter()
                        .filter(|we| we.code == DUPLICATE_KEY)
                        .count();
                    let failed = write_errors.len() as u64;

                    tracing::warn!(
                        total,
                        failed,
                        duplicates,
                        "Unordered insert stored a partial batch"
                    );
                    Ok(total.saturating_sub(failed))
                }
                _ => {
                    tracing::error!("Failed to insert transactions: {}", e);
                    Err(AppError::from(e))
                }
            },
        }
    }

    async fn override_category(
        &self,
        user_id: &str,
        transaction_id: &str,
        category: Category,
    ) -> Result<bool, AppError> {
        let started = Instant::now();
        let result = self
            .transactions()
            .update_one(
                doc! { "_id": transaction_id, "user_id": user_id },
                doc! {
                    "$set": {
                        "category": category.as_str(),
                        "category_source": CategorySource::Manual.as_str(),
                        "confidence": 1.0,
                        "user_overridden": true,
                    }
                },
                None,
            )
            .await
            .map_err(|e| {
                tracing::error!("Failed to override transaction category: {}", e);
                AppError::from(e)
            })?;
        record_db_query("override_category", started.elapsed().as_secs_f64());

        Ok(result.matched_count > 0)
    }

    async fn health_check(&self) -> Result<(), AppError> {
        StatementDb::health_check(self).await
    }
}

#[async_trait]
impl CategoryCache for StatementDb {
    async fn get(&self, merchant_key: &str) -> Result<Option<CategoryCacheEntry>, AppError> {
        let started = Instant::now();
        let entry = self
            .category_cache()
            .find_one(doc! { "merchant_key": merchant_key }, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to read category cache: {}", e);
                AppError::from(e)
            })?;
        record_db_query("cache_get", started.elapsed().as_secs_f64());
        Ok(entry)
    }

    async fn put(&self, entry: CategoryCacheEntry) -> Result<(), AppError> {
        let started = Instant::now();
        let result = self.category_cache().insert_one(&entry, None).await;
        record_db_query("cache_put", started.elapsed().as_secs_f64());

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => {
                tracing::debug!(merchant_key = %entry.merchant_key, "Category cache entry already present");
                Ok(())
            }
            Err(e) => {
                tracing::error!("Failed to write category cache: {}", e);
                Err(AppError::from(e))
            }
        }
    }

    async fn invalidate(&self, merchant_key: &str) -> Result<bool, AppError> {
        let result = self
            .category_cache()
            .delete_one(doc! { "merchant_key": merchant_key }, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to invalidate category cache: {}", e);
                AppError::from(e)
            })?;
        Ok(result.deleted_count > 0)
    }
}

#[async_trait]
impl AccountStore for StatementDb {
    async fn find_account(&self, user_id: &str) -> Result<Option<Account>, AppError> {
        self.accounts()
            .find_one(doc! { "_id": user_id }, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to load account: {}", e);
                AppError::from(e)
            })
    }

    async fn increment_quota(
        &self,
        user_id: &str,
        kind: QuotaKind,
        day: NaiveDate,
    ) -> Result<(), AppError> {
        let (day_field, count_field) = kind.fields();
        let today = format_day(day);
        let accounts = self.accounts();

        let bumped = accounts
            .update_one(
                doc! { "_id": user_id, day_field: &today },
                doc! { "$inc": { count_field: 1 } },
                None,
            )
            .await
            .map_err(AppError::from)?;

        // First use today (or ever): restart the counter at 1.
        if bumped.matched_count == 0 {
            accounts
                .update_one(
                    doc! { "_id": user_id },
                    doc! { "$set": { day_field: &today, count_field: 1 } },
                    UpdateOptions::builder().upsert(true).build(),
                )
                .await
                .map_err(|e| {
                    tracing::error!("Failed to reset {} quota: {}", kind.as_str(), e);
                    AppError::from(e)
                })?;
        }

        Ok(())
    }
}

#[async_trait]
impl CardRegistry for StatementDb {
    async fn owned_cards(
        &self,
        user_id: &str,
        card_ids: &[String],
    ) -> Result<HashSet<String>, AppError> {
        let cursor = self
            .cards()
            .find(doc! { "user_id": user_id, "_id": { "$in": card_ids.to_vec() } }, None)
            .await
            .map_err(AppError::from)?;

        let cards: Vec<Card> = cursor.try_collect().await.map_err(|e| {
            tracing::error!("Failed to read cards: {}", e);
            AppError::from(e)
        })?;

        Ok(cards.into_iter().map(|card| card.card_id).collect())
    }
}
