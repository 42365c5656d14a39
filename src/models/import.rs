//! Import request/result models and validation diagnostics.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::ImportLimits;
use crate::error::{AppError, AppResult};

// ============================================================================
// Input
// ============================================================================

/// A raw image file submitted for import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAsset {
    pub name: String,
    /// Declared size in bytes.
    pub size: u64,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl FileAsset {
    /// Create a file asset whose declared size matches its data.
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            size: data.len() as u64,
            content_type: content_type.into(),
            data,
        }
    }
}

/// Image formats accepted for card art.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageExtension {
    Jpg,
    Jpeg,
    Png,
    Gif,
}

impl ImageExtension {
    /// Parse an extension, case-insensitively, without the leading dot.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "jpg" => Some(Self::Jpg),
            "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "gif" => Some(Self::Gif),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpg => "jpg",
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Gif => "gif",
        }
    }

    /// Whether cards using this format are animated.
    pub fn is_animated(&self) -> bool {
        matches!(self, Self::Gif)
    }

    /// Canonical MIME type for the format.
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Jpg | Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
        }
    }
}

impl std::fmt::Display for ImageExtension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file name that matched `<level>_<name>.<ext>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedName {
    /// File name as submitted.
    pub original: String,
    pub level: i32,
    /// Lowercased name with underscores turned into single spaces.
    pub display_name: String,
    pub extension: ImageExtension,
    pub is_animated: bool,
    /// `{level}_{name_with_underscores}.{ext}`, used as the object file name.
    pub canonical_key: String,
}

impl ParsedName {
    /// Level plus normalized name; two files sharing this collide within a batch
    /// regardless of their extension.
    pub fn duplicate_key(&self) -> String {
        format!("{}_{}", self.level, self.display_name)
    }
}

/// Why a file name could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameRejection {
    #[error("Filename must follow format: level_name.ext (e.g., 1_hello.jpg)")]
    Pattern,
    #[error("Level must be between 1 and 5, got {0}")]
    LevelOutOfRange(String),
    #[error("Card name cannot be empty")]
    EmptyName,
    #[error("Card name is longer than {0} characters")]
    TooLong(usize),
}

/// How an import treats files whose card already exists in the collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverwriteMode {
    /// Leave the existing card alone and count the file as skipped.
    #[default]
    Skip,
    /// Replace the existing card row(s) with a freshly created card.
    Overwrite,
    /// Update level/animated flags of the existing card in place.
    ///
    /// Storage is not touched, so the card keeps its original extension and
    /// object: updating a `jpg` card from a `gif` file marks it animated
    /// while its image stays the static one.
    Update,
}

impl OverwriteMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "" | "skip" => Some(Self::Skip),
            "overwrite" => Some(Self::Overwrite),
            "update" => Some(Self::Update),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Skip => "skip",
            Self::Overwrite => "overwrite",
            Self::Update => "update",
        }
    }
}

/// A request to import a batch of images into a collection.
#[derive(Debug, Clone)]
pub struct ImportRequest {
    pub collection_key: String,
    pub display_name: String,
    /// Group tag, also the second segment of every object key.
    pub group_tag: String,
    pub is_promotional: bool,
    /// Create the collection if it does not exist.
    pub create_collection: bool,
    pub overwrite_mode: OverwriteMode,
    /// Run parsing and validation only; touch neither storage nor the database.
    pub validate_only: bool,
    pub files: Vec<FileAsset>,
}

fn path_segment_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("Invalid regex pattern defined in code"))
}

impl ImportRequest {
    /// Validate request-level fields. File contents are checked by the validator.
    pub fn validate(&self, limits: &ImportLimits) -> AppResult<()> {
        if self.collection_key.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Missing required field: collection_key".to_string(),
            ));
        }

        if !path_segment_regex().is_match(&self.collection_key) {
            return Err(AppError::InvalidInput(format!(
                "collection_key '{}' may only contain letters, digits, '-' and '_'",
                self.collection_key
            )));
        }

        if self.display_name.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Missing required field: display_name".to_string(),
            ));
        }

        if !path_segment_regex().is_match(&self.group_tag) {
            return Err(AppError::InvalidInput(format!(
                "group_tag '{}' may only contain letters, digits, '-' and '_'",
                self.group_tag
            )));
        }

        if self.files.is_empty() {
            return Err(AppError::InvalidInput(
                "At least one file is required".to_string(),
            ));
        }

        if self.files.len() > limits.max_files_per_import {
            return Err(AppError::InvalidInput(format!(
                "Too many files: {} (max {})",
                self.files.len(),
                limits.max_files_per_import
            )));
        }

        Ok(())
    }
}

// ============================================================================
// Findings
// ============================================================================

/// Finding severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Critical findings abort the whole batch before any side effect.
    pub fn blocks_batch(&self) -> bool {
        matches!(self, Self::Critical)
    }

    /// High and critical findings keep the affected file out of the import.
    pub fn skips_file(&self) -> bool {
        *self >= Self::High
    }
}

/// What a finding is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    MalformedName,
    MalformedFile,
    DuplicateName,
    SizeExceeded,
    LargeFile,
    ContentTypeMismatch,
    UploadFailed,
    WriteFailed,
}

/// A validation or processing diagnostic attached to one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub file_name: String,
    pub kind: FindingKind,
    pub severity: Severity,
    pub message: String,
}

impl Finding {
    pub fn new(
        file_name: impl Into<String>,
        kind: FindingKind,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            kind,
            severity,
            message: message.into(),
        }
    }
}

// ============================================================================
// Result
// ============================================================================

/// Pipeline states. `Committed` and `RolledBack` are terminal; earlier states
/// are reported when the import stopped there without side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportPhase {
    Validating,
    CollectionResolving,
    Uploading,
    Writing,
    Committed,
    RolledBack,
}

/// Category of a failed import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    ValidationFailed,
    CollectionNotFound,
    CollectionMismatch,
    UploadFailed,
    WriteFailed,
    Cancelled,
    RepositoryError,
}

/// Why an import did not commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportFailure {
    pub kind: FailureKind,
    pub message: String,
}

/// Outcome of undoing the storage writes of a failed import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompensationReport {
    /// Keys deleted, in deletion (reverse upload) order.
    pub deleted: Vec<String>,
    /// Overwritten keys whose previous object was put back.
    pub restored: Vec<String>,
    /// Keys whose delete or restore failed, plus backups that could not be
    /// removed; these objects are orphaned or hold the new bytes.
    pub failed: Vec<String>,
}

impl CompensationReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Aggregate statistics for one import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub total_files: usize,
    pub valid_files: usize,
    pub invalid_files: usize,
    pub processed_files: usize,
    pub failed_files: usize,
    /// level -> staged card count
    pub level_stats: BTreeMap<i32, usize>,
    /// extension -> staged card count
    pub file_type_stats: BTreeMap<String, usize>,
    pub duplicates: Vec<String>,
    pub large_files: Vec<String>,
}

/// Result of one import request. Always returned, even on failure.
#[derive(Debug, Clone, Serialize)]
pub struct ImportResult {
    pub import_id: Uuid,
    pub collection_key: String,
    pub collection_created: bool,
    pub phase: ImportPhase,
    pub cards_created: usize,
    pub cards_skipped: usize,
    pub cards_updated: usize,
    pub files_failed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_card_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_card_id: Option<i64>,
    /// Object keys uploaded, in upload order.
    pub uploaded_keys: Vec<String>,
    pub files_skipped: Vec<String>,
    pub findings: Vec<Finding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compensation: Option<CompensationReport>,
    pub success: bool,
    pub partial_success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<ImportFailure>,
    pub processing_time_ms: u64,
    pub summary: ImportSummary,
}

impl ImportResult {
    pub fn new(collection_key: &str, total_files: usize) -> Self {
        Self {
            import_id: Uuid::now_v7(),
            collection_key: collection_key.to_string(),
            collection_created: false,
            phase: ImportPhase::Validating,
            cards_created: 0,
            cards_skipped: 0,
            cards_updated: 0,
            files_failed: 0,
            first_card_id: None,
            last_card_id: None,
            uploaded_keys: Vec::new(),
            files_skipped: Vec::new(),
            findings: Vec::new(),
            compensation: None,
            success: false,
            partial_success: false,
            failure: None,
            processing_time_ms: 0,
            summary: ImportSummary {
                total_files,
                ..Default::default()
            },
        }
    }

    /// True if any finding aborts the batch.
    pub fn has_critical_findings(&self) -> bool {
        self.findings.iter().any(|f| f.severity.blocks_batch())
    }

    /// True if any finding kept a file out of the import.
    pub fn has_blocking_findings(&self) -> bool {
        self.findings.iter().any(|f| f.severity.skips_file())
    }

    /// Findings attached to one file.
    pub fn findings_for<'a>(&'a self, file_name: &'a str) -> impl Iterator<Item = &'a Finding> + 'a {
        self.findings.iter().filter(move |f| f.file_name == file_name)
    }

    /// Percentage of submitted files that were processed.
    pub fn success_rate(&self) -> f64 {
        if self.summary.total_files == 0 {
            return 0.0;
        }
        self.summary.processed_files as f64 / self.summary.total_files as f64 * 100.0
    }

    pub(crate) fn fail(&mut self, kind: FailureKind, message: impl Into<String>) {
        self.success = false;
        self.partial_success = false;
        self.failure = Some(ImportFailure {
            kind,
            message: message.into(),
        });
    }
}
