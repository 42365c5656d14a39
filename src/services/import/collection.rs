//! Target collection resolution.

use tracing::info;

use crate::db::CatalogRepository;
use crate::error::AppError;
use crate::models::{Collection, FailureKind};

/// A collection an import may write into.
#[derive(Debug, Clone)]
pub struct ResolvedCollection {
    pub collection: Collection,
    /// True when this import created the collection.
    pub created: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("Collection '{0}' not found")]
    NotFound(String),

    #[error("Collection '{key}' promotional flag is {existing}, request says {requested}")]
    PromoMismatch {
        key: String,
        existing: bool,
        requested: bool,
    },

    #[error(transparent)]
    Repository(#[from] AppError),
}

impl ResolveError {
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::NotFound(_) => FailureKind::CollectionNotFound,
            Self::PromoMismatch { .. } => FailureKind::CollectionMismatch,
            Self::Repository(_) => FailureKind::RepositoryError,
        }
    }
}

/// Make sure the target collection exists and agrees with the request.
///
/// A created collection is persisted immediately and stays even if the
/// import later rolls back.
pub async fn resolve_collection(
    repo: &dyn CatalogRepository,
    key: &str,
    display_name: &str,
    group_tag: &str,
    is_promotional: bool,
    allow_create: bool,
) -> Result<ResolvedCollection, ResolveError> {
    if let Some(existing) = repo.get_collection(key).await? {
        if existing.is_promotional != is_promotional {
            return Err(ResolveError::PromoMismatch {
                key: key.to_string(),
                existing: existing.is_promotional,
                requested: is_promotional,
            });
        }
        return Ok(ResolvedCollection {
            collection: existing,
            created: false,
        });
    }

    if !allow_create {
        return Err(ResolveError::NotFound(key.to_string()));
    }

    let collection = repo
        .create_collection(&Collection::for_import(
            key,
            display_name,
            group_tag,
            is_promotional,
        ))
        .await?;

    info!(collection = %key, promo = is_promotional, "Created collection");

    Ok(ResolvedCollection {
        collection,
        created: true,
    })
}
