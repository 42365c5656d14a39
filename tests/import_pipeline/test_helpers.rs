//! Shared builders for pipeline tests.

use std::sync::Arc;

use card_import_lib::config::ImportLimits;
use card_import_lib::models::{Card, Collection, FileAsset, ImageExtension, ImportRequest, OverwriteMode};
use card_import_lib::services::ImportService;
use chrono::Utc;

use super::fakes::{MemoryCatalog, MemoryStore};

pub const COLLECTION: &str = "twice";
pub const GROUP: &str = "girlgroups";

pub struct Harness {
    pub catalog: Arc<MemoryCatalog>,
    pub store: Arc<MemoryStore>,
    pub service: ImportService,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_limits(ImportLimits::default())
    }

    pub fn with_limits(limits: ImportLimits) -> Self {
        let catalog = Arc::new(MemoryCatalog::new());
        let store = Arc::new(MemoryStore::new());
        let service = ImportService::new(catalog.clone(), store.clone(), limits);
        Self {
            catalog,
            store,
            service,
        }
    }

    /// Harness whose target collection already exists (not promotional).
    pub fn with_collection() -> Self {
        let harness = Self::new();
        harness
            .catalog
            .seed_collection(Collection::for_import(COLLECTION, "TWICE", GROUP, false));
        harness
    }
}

/// A file whose content type agrees with its extension.
pub fn image(name: &str) -> FileAsset {
    let content_type = name
        .rsplit('.')
        .next()
        .and_then(ImageExtension::parse)
        .map(|e| e.content_type())
        .unwrap_or("application/octet-stream");
    FileAsset::new(name, content_type, name.as_bytes().to_vec())
}

pub fn images(names: &[&str]) -> Vec<FileAsset> {
    names.iter().map(|n| image(n)).collect()
}

pub fn request(files: Vec<FileAsset>) -> ImportRequest {
    ImportRequest {
        collection_key: COLLECTION.to_string(),
        display_name: "TWICE".to_string(),
        group_tag: GROUP.to_string(),
        is_promotional: false,
        create_collection: true,
        overwrite_mode: OverwriteMode::Skip,
        validate_only: false,
        files,
    }
}

pub fn request_with_mode(files: Vec<FileAsset>, mode: OverwriteMode) -> ImportRequest {
    ImportRequest {
        overwrite_mode: mode,
        ..request(files)
    }
}

pub fn existing_card(id: i64, name: &str, level: i32, extension: ImageExtension) -> Card {
    let now = Utc::now();
    Card {
        id,
        name: name.to_string(),
        level,
        is_animated: extension.is_animated(),
        extension,
        collection_key: COLLECTION.to_string(),
        tags: vec![GROUP.to_string()],
        created_at: now,
        updated_at: now,
    }
}

pub fn key(file: &str) -> String {
    format!("cards/{}/{}/{}", GROUP, COLLECTION, file)
}
