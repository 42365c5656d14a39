//! Card domain models.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::collection::strings_from_json;
use super::import::ImageExtension;
use crate::entity::card;

/// A persisted card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Card {
    pub id: i64,
    pub name: String,
    pub level: i32,
    pub is_animated: bool,
    pub extension: ImageExtension,
    pub collection_key: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<card::Model> for Card {
    type Error = String;

    fn try_from(model: card::Model) -> Result<Self, Self::Error> {
        let extension = ImageExtension::parse(&model.image_ext)
            .ok_or_else(|| format!("card {} has unknown image extension '{}'", model.id, model.image_ext))?;

        Ok(Self {
            tags: strings_from_json(&model.tags),
            id: model.id,
            name: model.name,
            level: model.level,
            is_animated: model.animated,
            extension,
            collection_key: model.col_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

/// A card staged in memory during an import, before an ID is assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedCard {
    pub name: String,
    pub level: i32,
    pub is_animated: bool,
    pub extension: ImageExtension,
    pub collection_key: String,
    pub tags: Vec<String>,
    /// Object key the image was published under.
    pub storage_key: String,
}

impl StagedCard {
    /// Turn the staged card into a persistable card with its final ID.
    pub fn into_card(self, id: i64, now: DateTime<Utc>) -> Card {
        Card {
            id,
            name: self.name,
            level: self.level,
            is_animated: self.is_animated,
            extension: self.extension,
            collection_key: self.collection_key,
            tags: self.tags,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Every row change produced by one import request.
///
/// Applied inside a single transaction: removals first, then updates, then inserts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardBatch {
    /// IDs of existing cards replaced in overwrite mode.
    pub removals: Vec<i64>,
    /// Existing cards mutated in update mode.
    pub updates: Vec<Card>,
    /// Newly created cards, in file-processing order.
    pub inserts: Vec<Card>,
}

impl CardBatch {
    pub fn is_empty(&self) -> bool {
        self.removals.is_empty() && self.updates.is_empty() && self.inserts.is_empty()
    }
}
