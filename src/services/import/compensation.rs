//! Best-effort undo of the storage writes of an import that did not commit.

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::models::CompensationReport;
use crate::services::storage::ObjectStore;

/// A replaced object, saved under `backup_key` before it was overwritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backup {
    pub key: String,
    pub backup_key: String,
}

/// Key a replaced object is saved under for the duration of one import.
pub fn backup_key(import_id: Uuid, key: &str) -> String {
    format!("backup/{}/{}", import_id, key)
}

/// Storage writes of one import, in order.
#[derive(Debug, Default)]
pub struct UploadLedger {
    /// Keys that did not exist before this import.
    created: Vec<String>,
    backups: Vec<Backup>,
}

impl UploadLedger {
    pub fn record_created(&mut self, key: String) {
        self.created.push(key);
    }

    pub fn record_backup(&mut self, backup: Backup) {
        self.backups.push(backup);
    }

    pub fn created(&self) -> &[String] {
        &self.created
    }

    pub fn backups(&self) -> &[Backup] {
        &self.backups
    }
}

/// Delete created keys in reverse upload order, then put every replaced
/// object back from its backup.
///
/// Every step is attempted; failures are logged and reported, never returned.
pub async fn compensate(
    store: &dyn ObjectStore,
    import_id: Uuid,
    ledger: &UploadLedger,
) -> CompensationReport {
    let mut report = CompensationReport::default();

    for key in ledger.created.iter().rev() {
        match store.delete(key).await {
            Ok(()) => report.deleted.push(key.clone()),
            Err(e) => {
                warn!(import_id = %import_id, key = %key, error = %e, "Failed to delete uploaded object");
                report.failed.push(key.clone());
            }
        }
    }

    for backup in ledger.backups.iter().rev() {
        if let Err(e) = store.copy(&backup.backup_key, &backup.key).await {
            error!(
                import_id = %import_id,
                key = %backup.key,
                backup = %backup.backup_key,
                error = %e,
                "Failed to restore overwritten object; backup kept"
            );
            report.failed.push(backup.key.clone());
            continue;
        }
        report.restored.push(backup.key.clone());

        if let Err(e) = store.delete(&backup.backup_key).await {
            warn!(import_id = %import_id, backup = %backup.backup_key, error = %e, "Failed to delete backup");
            report.failed.push(backup.backup_key.clone());
        }
    }

    if report.is_complete() {
        info!(
            import_id = %import_id,
            deleted = report.deleted.len(),
            restored = report.restored.len(),
            "Compensation undid all storage writes"
        );
    } else {
        error!(
            import_id = %import_id,
            orphaned = report.failed.len(),
            "Compensation left objects behind: {:?}",
            report.failed
        );
    }

    report
}

/// Remove the backups of a committed import.
pub async fn discard_backups(store: &dyn ObjectStore, import_id: Uuid, ledger: &UploadLedger) {
    for backup in &ledger.backups {
        match store.delete(&backup.backup_key).await {
            Ok(()) => debug!(import_id = %import_id, backup = %backup.backup_key, "Backup removed"),
            Err(e) => {
                warn!(import_id = %import_id, backup = %backup.backup_key, error = %e, "Failed to delete backup")
            }
        }
    }
}
