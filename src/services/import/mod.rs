//! Card import pipeline.
//!
//! One request moves through
//! `Validating -> CollectionResolving -> Uploading -> Writing -> Committed | RolledBack`.
//! Images are uploaded before any card row is written; if anything fails after
//! the first upload, new objects are deleted, overwritten ones are restored
//! from their backups, and no row from the request is persisted.

pub mod allocator;
pub mod collection;
pub mod compensation;
pub mod filename;
pub mod validation;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ImportLimits;
use crate::db::CatalogRepository;
use crate::error::{AppError, AppResult};
use crate::models::{
    CardBatch, FailureKind, Finding, FindingKind, ImportPhase, ImportRequest, ImportResult,
    OverwriteMode, Severity, StagedCard,
};
use crate::services::storage::{ObjectStore, canonical_path};

use allocator::IdAllocator;
use collection::resolve_collection;
use compensation::{Backup, UploadLedger, backup_key, compensate, discard_backups};
use validation::validate_files;

pub use filename::parse_card_filename;

/// Runs imports against a catalog repository and an object store.
///
/// Clones share the ID allocation gate.
#[derive(Clone)]
pub struct ImportService {
    repo: Arc<dyn CatalogRepository>,
    store: Arc<dyn ObjectStore>,
    limits: ImportLimits,
    allocator: Arc<IdAllocator>,
}

impl ImportService {
    pub fn new(
        repo: Arc<dyn CatalogRepository>,
        store: Arc<dyn ObjectStore>,
        limits: ImportLimits,
    ) -> Self {
        Self {
            repo,
            store,
            limits,
            allocator: Arc::new(IdAllocator::new()),
        }
    }

    /// Import a batch of files.
    ///
    /// Returns `Err` only for a malformed request; every pipeline failure is
    /// reported through [`ImportResult::failure`].
    pub async fn import(&self, request: ImportRequest) -> AppResult<ImportResult> {
        self.import_with_cancel(request, CancellationToken::new()).await
    }

    /// Like [`import`](Self::import), stopping before the next upload or the
    /// write once `cancel` fires.
    pub async fn import_with_cancel(
        &self,
        request: ImportRequest,
        cancel: CancellationToken,
    ) -> AppResult<ImportResult> {
        request.validate(&self.limits)?;

        let started = Instant::now();
        let ImportRequest {
            collection_key,
            display_name,
            group_tag,
            is_promotional,
            create_collection,
            overwrite_mode,
            validate_only,
            files,
        } = request;

        let mut result = ImportResult::new(&collection_key, files.len());
        let import_id = result.import_id;

        info!(
            import_id = %import_id,
            collection = %collection_key,
            files = files.len(),
            mode = overwrite_mode.as_str(),
            validate_only,
            "Starting card import"
        );

        // Validating
        let report = validate_files(&files, &self.limits);
        let has_critical = report.has_critical();
        result.summary.valid_files = report.valid_files();
        result.summary.invalid_files = files.len() - result.summary.valid_files;
        result.summary.duplicates = report.duplicates;
        result.summary.large_files = report.large_files;
        result.findings = report.findings;

        if validate_only {
            result.success = result.findings.is_empty();
            info!(
                import_id = %import_id,
                findings = result.findings.len(),
                "Validation-only import finished"
            );
            return Ok(finish(result, ImportPhase::Validating, started));
        }

        if has_critical {
            let critical = result
                .findings
                .iter()
                .filter(|f| f.severity.blocks_batch())
                .count();
            warn!(import_id = %import_id, critical, "Import rejected by validation");
            result.files_failed = result.summary.invalid_files;
            result.fail(
                FailureKind::ValidationFailed,
                format!("{} critical finding(s); nothing was imported", critical),
            );
            return Ok(finish(result, ImportPhase::Validating, started));
        }

        // CollectionResolving
        result.phase = ImportPhase::CollectionResolving;
        let resolved = match resolve_collection(
            self.repo.as_ref(),
            &collection_key,
            &display_name,
            &group_tag,
            is_promotional,
            create_collection,
        )
        .await
        {
            Ok(resolved) => resolved,
            Err(e) => {
                warn!(import_id = %import_id, collection = %collection_key, error = %e, "Collection resolution failed");
                result.fail(e.failure_kind(), e.to_string());
                return Ok(finish(result, ImportPhase::CollectionResolving, started));
            }
        };
        result.collection_created = resolved.created;

        // Uploading
        result.phase = ImportPhase::Uploading;
        let mut batch = CardBatch::default();
        let mut staged: Vec<(String, StagedCard)> = Vec::new();
        let mut ledger = UploadLedger::default();
        // Existing card ID -> file whose update of it is staged
        let mut staged_updates: HashMap<i64, String> = HashMap::new();

        for (file, check) in files.into_iter().zip(report.files) {
            let eligible = check.is_eligible();
            let parsed = match check.parsed {
                Some(parsed) if eligible => parsed,
                _ => {
                    debug!(import_id = %import_id, file = %file.name, "Skipping file with blocking findings");
                    result.files_skipped.push(file.name);
                    result.files_failed += 1;
                    continue;
                }
            };

            if cancel.is_cancelled() {
                return Ok(self
                    .roll_back(
                        result,
                        &ledger,
                        FailureKind::Cancelled,
                        AppError::Cancelled(format!("before uploading {}", file.name)).to_string(),
                        started,
                    )
                    .await);
            }

            let existing = match self
                .repo
                .find_cards_by_name(&collection_key, &parsed.display_name)
                .await
            {
                Ok(existing) => existing,
                Err(e) => {
                    return Ok(self
                        .roll_back(
                            result,
                            &ledger,
                            FailureKind::RepositoryError,
                            format!("Failed to look up existing card for {}: {}", file.name, e),
                            started,
                        )
                        .await);
                }
            };

            let replacing = !existing.is_empty();
            if let Some(current) = existing.first() {
                match overwrite_mode {
                    OverwriteMode::Skip => {
                        debug!(import_id = %import_id, file = %file.name, card_id = current.id, "Card exists, skipping");
                        result.cards_skipped += 1;
                        continue;
                    }
                    OverwriteMode::Update => {
                        if let Some(earlier) = staged_updates.get(&current.id) {
                            result.findings.push(Finding::new(
                                &file.name,
                                FindingKind::DuplicateName,
                                Severity::High,
                                format!(
                                    "Card {} is already updated by {} in this import",
                                    current.id, earlier
                                ),
                            ));
                            result.summary.duplicates.push(file.name.clone());
                            result.files_skipped.push(file.name);
                            result.files_failed += 1;
                            continue;
                        }
                        if current.level == parsed.level && current.is_animated == parsed.is_animated {
                            result.cards_skipped += 1;
                            continue;
                        }
                        let mut updated = current.clone();
                        updated.level = parsed.level;
                        updated.is_animated = parsed.is_animated;
                        debug!(import_id = %import_id, file = %file.name, card_id = updated.id, "Staging card update");
                        staged_updates.insert(updated.id, file.name);
                        batch.updates.push(updated);
                        continue;
                    }
                    OverwriteMode::Overwrite => {
                        for card in &existing {
                            if !batch.removals.contains(&card.id) {
                                batch.removals.push(card.id);
                            }
                        }
                    }
                }
            }

            let key = canonical_path(&group_tag, &collection_key, is_promotional, &parsed);

            if let Err(e) = self
                .publish(
                    import_id,
                    &mut ledger,
                    &key,
                    file.data,
                    parsed.extension.content_type(),
                    replacing,
                )
                .await
            {
                warn!(import_id = %import_id, file = %file.name, key = %key, error = %e, "Upload failed");
                result.findings.push(Finding::new(
                    &file.name,
                    FindingKind::UploadFailed,
                    Severity::High,
                    e.to_string(),
                ));
                result.files_failed += 1;
                return Ok(self
                    .roll_back(
                        result,
                        &ledger,
                        FailureKind::UploadFailed,
                        format!("Failed to upload {}: {}", file.name, e),
                        started,
                    )
                    .await);
            }

            info!(import_id = %import_id, file = %file.name, key = %key, "Uploaded card image");
            result.uploaded_keys.push(key.clone());

            *result.summary.level_stats.entry(parsed.level).or_default() += 1;
            *result
                .summary
                .file_type_stats
                .entry(parsed.extension.to_string())
                .or_default() += 1;

            staged.push((
                file.name,
                StagedCard {
                    name: parsed.display_name,
                    level: parsed.level,
                    is_animated: parsed.is_animated,
                    extension: parsed.extension,
                    collection_key: collection_key.clone(),
                    tags: vec![group_tag.clone()],
                    storage_key: key,
                },
            ));
        }

        if cancel.is_cancelled() {
            return Ok(self
                .roll_back(
                    result,
                    &ledger,
                    FailureKind::Cancelled,
                    AppError::Cancelled("before writing cards".to_string()).to_string(),
                    started,
                )
                .await);
        }

        // Writing
        result.phase = ImportPhase::Writing;
        if staged.is_empty() && batch.is_empty() {
            info!(import_id = %import_id, "No card changes to write");
            return Ok(commit(result, started));
        }

        let gate = self.allocator.lock().await;
        let range = match gate.allocate(self.repo.as_ref(), staged.len()).await {
            Ok(range) => range,
            Err(e) => {
                drop(gate);
                return Ok(self
                    .roll_back(
                        result,
                        &ledger,
                        FailureKind::RepositoryError,
                        format!("Failed to allocate card IDs: {}", e),
                        started,
                    )
                    .await);
            }
        };

        let now = Utc::now();
        let mut staged_files = Vec::with_capacity(staged.len());
        for ((file_name, card), id) in staged.into_iter().zip(range.ids()) {
            debug!(import_id = %import_id, card_id = id, key = %card.storage_key, "Assigned card ID");
            staged_files.push(file_name);
            batch.inserts.push(card.into_card(id, now));
        }

        if range.count > 0 {
            info!(
                import_id = %import_id,
                first_id = range.first,
                last_id = range.last(),
                "Allocated card IDs"
            );
        }

        let written = self.repo.apply_card_batch(&batch).await;
        drop(gate);

        if let Err(e) = written {
            for file_name in &staged_files {
                result.findings.push(Finding::new(
                    file_name,
                    FindingKind::WriteFailed,
                    Severity::High,
                    e.to_string(),
                ));
            }
            result.files_failed += staged_files.len();
            return Ok(self
                .roll_back(
                    result,
                    &ledger,
                    FailureKind::WriteFailed,
                    format!("Failed to write cards: {}", e),
                    started,
                )
                .await);
        }

        discard_backups(self.store.as_ref(), import_id, &ledger).await;

        result.cards_created = batch.inserts.len();
        result.cards_updated = batch.updates.len();
        if range.count > 0 {
            result.first_card_id = Some(range.first);
            result.last_card_id = range.last();
        }

        Ok(commit(result, started))
    }

    /// Upload one image. An object it replaces is first copied to a backup key
    /// so rollback can put it back.
    async fn publish(
        &self,
        import_id: Uuid,
        ledger: &mut UploadLedger,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
        replacing: bool,
    ) -> AppResult<()> {
        if replacing && !matches!(self.store.exists(key).await, Ok(false)) {
            let backup_key = backup_key(import_id, key);
            self.store.copy(key, &backup_key).await?;
            debug!(import_id = %import_id, key = %key, backup = %backup_key, "Backed up object before overwrite");
            ledger.record_backup(Backup {
                key: key.to_string(),
                backup_key,
            });
            return self.store.put(key, data, content_type).await;
        }

        self.store.put(key, data, content_type).await?;
        ledger.record_created(key.to_string());
        Ok(())
    }

    /// Undo what this import wrote to storage and mark it rolled back.
    async fn roll_back(
        &self,
        mut result: ImportResult,
        ledger: &UploadLedger,
        kind: FailureKind,
        message: String,
        started: Instant,
    ) -> ImportResult {
        warn!(
            import_id = %result.import_id,
            phase = ?result.phase,
            uploaded = result.uploaded_keys.len(),
            "Rolling back import: {}",
            message
        );

        let report = compensate(self.store.as_ref(), result.import_id, ledger).await;
        result.compensation = Some(report);
        result.fail(kind, message);
        finish(result, ImportPhase::RolledBack, started)
    }
}

fn commit(mut result: ImportResult, started: Instant) -> ImportResult {
    result.success = !result.has_blocking_findings();
    result.partial_success = result.cards_created > 0 && !result.success;
    result.summary.processed_files = result.cards_created + result.cards_updated;

    info!(
        import_id = %result.import_id,
        collection = %result.collection_key,
        created = result.cards_created,
        updated = result.cards_updated,
        skipped = result.cards_skipped,
        failed = result.files_failed,
        "Card import committed"
    );

    finish(result, ImportPhase::Committed, started)
}

fn finish(mut result: ImportResult, phase: ImportPhase, started: Instant) -> ImportResult {
    result.phase = phase;
    result.summary.failed_files = result.files_failed;
    result.processing_time_ms = started.elapsed().as_millis() as u64;
    result
}
