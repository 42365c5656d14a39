//! Database queries for cards.
//!
//! Card IDs come from the import pipeline; `write_card_batch` is the only
//! write path used by imports and runs every row change in one transaction.

use chrono::Utc;
use sea_orm::prelude::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use tracing::debug;

use crate::entity::card::{self, ActiveModel, Entity as CardEntity};
use crate::error::{AppError, AppResult};
use crate::models::{Card, CardBatch};

use super::DbPool;

/// Escape LIKE metacharacters so ILIKE behaves as case-insensitive equality.
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn to_card(model: card::Model) -> AppResult<Card> {
    Card::try_from(model).map_err(AppError::Database)
}

impl DbPool {
    /// Highest card ID in use, or 0 when there are no cards.
    pub async fn get_max_card_id(&self) -> AppResult<i64> {
        let result = CardEntity::find()
            .order_by_desc(card::Column::Id)
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get last card ID: {}", e)))?;

        Ok(result.map(|c| c.id).unwrap_or(0))
    }

    /// Cards in a collection whose name matches case-insensitively.
    pub async fn get_cards_by_name(&self, collection_key: &str, name: &str) -> AppResult<Vec<Card>> {
        let models = CardEntity::find()
            .filter(card::Column::ColId.eq(collection_key))
            .filter(Expr::col((CardEntity, card::Column::Name)).ilike(escape_like(name)))
            .order_by_asc(card::Column::Id)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get cards by name: {}", e)))?;

        models.into_iter().map(to_card).collect()
    }

    /// Apply removals, updates and inserts atomically.
    ///
    /// Any failing statement rolls the whole batch back: the transaction is
    /// dropped without commit.
    pub async fn write_card_batch(&self, batch: &CardBatch) -> AppResult<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let txn = self
            .connection()
            .begin()
            .await
            .map_err(|e| AppError::Database(format!("Failed to start transaction: {}", e)))?;

        for id in &batch.removals {
            delete_card(&txn, *id).await?;
        }

        for existing in &batch.updates {
            update_card(&txn, existing).await?;
        }

        for new_card in &batch.inserts {
            insert_card(&txn, new_card).await?;
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(format!("Failed to commit transaction: {}", e)))?;

        debug!(
            removed = batch.removals.len(),
            updated = batch.updates.len(),
            inserted = batch.inserts.len(),
            "Card batch committed"
        );

        Ok(())
    }
}

async fn insert_card<C: ConnectionTrait>(conn: &C, new_card: &Card) -> AppResult<()> {
    let model = ActiveModel {
        id: Set(new_card.id),
        name: Set(new_card.name.clone()),
        level: Set(new_card.level),
        animated: Set(new_card.is_animated),
        image_ext: Set(new_card.extension.as_str().to_string()),
        col_id: Set(new_card.collection_key.clone()),
        tags: Set(serde_json::to_value(&new_card.tags)?),
        created_at: Set(new_card.created_at),
        updated_at: Set(new_card.updated_at),
    };

    model.insert(conn).await.map_err(|e| {
        AppError::Database(format!("Failed to insert card {}: {}", new_card.id, e))
    })?;

    Ok(())
}

async fn update_card<C: ConnectionTrait>(conn: &C, existing: &Card) -> AppResult<()> {
    let model = ActiveModel {
        id: Set(existing.id),
        level: Set(existing.level),
        animated: Set(existing.is_animated),
        updated_at: Set(Utc::now()),
        ..Default::default()
    };

    model.update(conn).await.map_err(|e| {
        AppError::Database(format!("Failed to update card {}: {}", existing.id, e))
    })?;

    Ok(())
}

async fn delete_card<C: ConnectionTrait>(conn: &C, id: i64) -> AppResult<()> {
    CardEntity::delete_by_id(id)
        .exec(conn)
        .await
        .map_err(|e| AppError::Database(format!("Failed to delete card {}: {}", id, e)))?;

    Ok(())
}
