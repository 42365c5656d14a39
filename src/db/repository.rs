//! Relational operations the import pipeline depends on.
//!
//! `DbPool` is the production implementation; tests substitute an in-memory one.

use async_trait::async_trait;

use crate::error::AppResult;
use crate::models::{Card, CardBatch, Collection};

use super::DbPool;

#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Highest card ID currently persisted (0 when empty).
    async fn max_card_id(&self) -> AppResult<i64>;

    async fn get_collection(&self, key: &str) -> AppResult<Option<Collection>>;

    /// Persist a collection immediately, outside any card transaction.
    async fn create_collection(&self, collection: &Collection) -> AppResult<Collection>;

    /// Existing cards in `collection_key` with this name (case-insensitive).
    async fn find_cards_by_name(&self, collection_key: &str, name: &str) -> AppResult<Vec<Card>>;

    /// Apply every row change of one import atomically.
    async fn apply_card_batch(&self, batch: &CardBatch) -> AppResult<()>;
}

#[async_trait]
impl CatalogRepository for DbPool {
    async fn max_card_id(&self) -> AppResult<i64> {
        self.get_max_card_id().await
    }

    async fn get_collection(&self, key: &str) -> AppResult<Option<Collection>> {
        self.get_collection_by_key(key).await
    }

    async fn create_collection(&self, collection: &Collection) -> AppResult<Collection> {
        self.insert_collection(collection).await
    }

    async fn find_cards_by_name(&self, collection_key: &str, name: &str) -> AppResult<Vec<Card>> {
        self.get_cards_by_name(collection_key, name).await
    }

    async fn apply_card_batch(&self, batch: &CardBatch) -> AppResult<()> {
        self.write_card_batch(batch).await
    }
}
