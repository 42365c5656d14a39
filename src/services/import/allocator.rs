//! Card ID allocation.
//!
//! IDs are `max + 1 ..= max + count`, read from the repository. The read is
//! only safe while the caller holds the [`WriteGate`] returned by
//! [`IdAllocator::lock`] until its batch write has finished.

use tokio::sync::{Mutex, MutexGuard};

use crate::db::CatalogRepository;
use crate::error::{AppError, AppResult};

/// A contiguous block of card IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdRange {
    pub first: i64,
    pub count: usize,
}

impl IdRange {
    /// Last ID of the block, `None` when empty.
    pub fn last(&self) -> Option<i64> {
        (self.count > 0).then(|| self.first + self.count as i64 - 1)
    }

    pub fn ids(self) -> impl Iterator<Item = i64> {
        (0..self.count as i64).map(move |offset| self.first + offset)
    }
}

/// Serializes allocate-then-write sequences within one process.
#[derive(Debug, Default)]
pub struct IdAllocator {
    gate: Mutex<()>,
}

/// Held from allocation until the batch write completes.
pub struct WriteGate<'a> {
    _guard: MutexGuard<'a, ()>,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self) -> WriteGate<'_> {
        WriteGate {
            _guard: self.gate.lock().await,
        }
    }
}

impl WriteGate<'_> {
    /// Reserve `count` IDs following the current maximum.
    pub async fn allocate(&self, repo: &dyn CatalogRepository, count: usize) -> AppResult<IdRange> {
        let max = repo.max_card_id().await?;
        let first = max
            .checked_add(1)
            .filter(|first| first.checked_add(count as i64).is_some())
            .ok_or_else(|| AppError::Conflict(format!("Card ID space exhausted at {}", max)))?;

        Ok(IdRange { first, count })
    }
}
