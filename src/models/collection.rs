//! Collection domain model.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::entity::collection;

/// A logical grouping of cards, keyed by an opaque string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Collection {
    pub key: String,
    pub display_name: String,
    pub origin: String,
    pub aliases: Vec<String>,
    pub is_promotional: bool,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Collection {
    /// Build the collection an import creates when the target does not exist yet.
    ///
    /// Aliases default to the key itself and the group tag becomes the only tag.
    pub fn for_import(key: &str, display_name: &str, group_tag: &str, is_promotional: bool) -> Self {
        let now = Utc::now();
        Self {
            key: key.to_string(),
            display_name: display_name.to_string(),
            origin: String::new(),
            aliases: vec![key.to_string()],
            is_promotional,
            tags: vec![group_tag.to_string()],
            created_at: now,
            updated_at: now,
        }
    }
}

impl From<collection::Model> for Collection {
    fn from(model: collection::Model) -> Self {
        Self {
            aliases: strings_from_json(&model.aliases),
            tags: strings_from_json(&model.tags),
            key: model.id,
            display_name: model.name,
            origin: model.origin,
            is_promotional: model.promo,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Read a JSONB string array, ignoring anything that is not a string.
pub(crate) fn strings_from_json(value: &JsonValue) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}
