//! Domain models for the card import service.

pub mod card;
pub mod collection;
pub mod import;

// Re-export commonly used types
pub use card::{Card, CardBatch, StagedCard};
pub use collection::Collection;
pub use import::{
    CompensationReport, FailureKind, FileAsset, Finding, FindingKind, ImageExtension,
    ImportFailure, ImportPhase, ImportRequest, ImportResult, ImportSummary, NameRejection,
    OverwriteMode, ParsedName, Severity,
};
