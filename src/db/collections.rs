//! Database queries for collections.

use sea_orm::{ActiveModelTrait, EntityTrait, Set};

use crate::entity::collection::{ActiveModel, Entity as CollectionEntity};
use crate::error::{AppError, AppResult};
use crate::models::Collection;

use super::DbPool;

impl DbPool {
    /// Get a collection by its key.
    pub async fn get_collection_by_key(&self, key: &str) -> AppResult<Option<Collection>> {
        let result = CollectionEntity::find_by_id(key.to_string())
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get collection: {}", e)))?;

        Ok(result.map(Collection::from))
    }

    /// Insert a new collection.
    pub async fn insert_collection(&self, collection: &Collection) -> AppResult<Collection> {
        let model = ActiveModel {
            id: Set(collection.key.clone()),
            name: Set(collection.display_name.clone()),
            origin: Set(collection.origin.clone()),
            aliases: Set(serde_json::to_value(&collection.aliases)?),
            promo: Set(collection.is_promotional),
            compressed: Set(true),
            fragments: Set(false),
            tags: Set(serde_json::to_value(&collection.tags)?),
            created_at: Set(collection.created_at),
            updated_at: Set(collection.updated_at),
        };

        let result = model
            .insert(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to insert collection: {}", e)))?;

        Ok(Collection::from(result))
    }
}
