//! Batch purge engine
//!
//! Erases every version and delete marker of a bucket, one page at a time.
//! Each page of the listing becomes exactly one batch delete request, so the
//! amount of memory held and the damage a failed request can do are both
//! bounded by the page size.
//!
//! The engine is fail-fast. The first failed listing or delete call ends the
//! purge, and the result reports how many records were erased before it.
//! Nothing is retried here.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::Error;
use crate::traits::{DeleteTarget, MAX_BATCH_SIZE, ObjectStore};
use crate::versions::VersionLister;

/// Shared flag asking a running purge to stop
///
/// Cloning yields a handle to the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Running totals reported after every completed batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeProgress {
    pub batches: usize,
    pub deleted: u64,
}

/// Outcome of a purge
#[derive(Debug, Default)]
pub struct PurgeResult {
    /// Records confirmed deleted
    pub deleted: u64,

    /// Batch delete calls issued
    pub batches: usize,

    /// The failure that stopped the purge, if any
    pub failed: Option<Error>,

    /// Whether the purge stopped because it was cancelled
    pub cancelled: bool,
}

impl PurgeResult {
    /// True when the listing was exhausted and every batch succeeded
    pub fn is_complete(&self) -> bool {
        self.failed.is_none() && !self.cancelled
    }
}

type ProgressFn<'a> = Box<dyn FnMut(PurgeProgress) + Send + 'a>;

/// Deletes all versions and delete markers of a bucket
pub struct PurgeEngine<'a, S: ObjectStore + ?Sized> {
    store: &'a S,
    batch_size: usize,
    cancel: CancelFlag,
    on_progress: Option<ProgressFn<'a>>,
}

impl<'a, S: ObjectStore + ?Sized> PurgeEngine<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            batch_size: MAX_BATCH_SIZE,
            cancel: CancelFlag::new(),
            on_progress: None,
        }
    }

    /// Records per page and per delete call (clamped to 1..=1000)
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.clamp(1, MAX_BATCH_SIZE);
        self
    }

    pub fn cancel_flag(mut self, flag: CancelFlag) -> Self {
        self.cancel = flag;
        self
    }

    pub fn on_progress(mut self, callback: impl FnMut(PurgeProgress) + Send + 'a) -> Self {
        self.on_progress = Some(Box::new(callback));
        self
    }

    /// Delete every record the listing yields until it is exhausted
    pub async fn purge_all(&mut self, bucket: &str) -> PurgeResult {
        let mut lister = VersionLister::new(self.store, bucket).page_size(self.batch_size);
        let mut result = PurgeResult::default();

        loop {
            if self.cancel.is_cancelled() {
                tracing::info!(bucket, deleted = result.deleted, "purge cancelled");
                result.cancelled = true;
                return result;
            }

            let page = match lister.next_page().await {
                Ok(Some(page)) => page,
                Ok(None) => break,
                Err(e) => {
                    tracing::debug!(bucket, error = %e, "listing failed during purge");
                    result.failed = Some(e);
                    return result;
                }
            };

            if page.records.is_empty() {
                continue;
            }

            if self.cancel.is_cancelled() {
                tracing::info!(bucket, deleted = result.deleted, "purge cancelled");
                result.cancelled = true;
                return result;
            }

            let targets: Vec<DeleteTarget> = page.records.iter().map(DeleteTarget::from).collect();
            let requested = targets.len();

            let report = match self.store.delete_object_versions(bucket, targets).await {
                Ok(report) => report,
                Err(e) => {
                    tracing::debug!(bucket, batch = result.batches + 1, error = %e, "batch delete failed");
                    result.failed = Some(e);
                    return result;
                }
            };

            result.batches += 1;
            result.deleted += report.deleted;
            tracing::debug!(
                bucket,
                batch = result.batches,
                requested,
                deleted = report.deleted,
                "batch deleted"
            );

            if let Some(callback) = self.on_progress.as_mut() {
                callback(PurgeProgress {
                    batches: result.batches,
                    deleted: result.deleted,
                });
            }

            if let Some(first) = report.errors.first() {
                tracing::warn!(
                    bucket,
                    failed = report.errors.len(),
                    key = %first.target.key,
                    code = %first.code,
                    "service rejected some deletions"
                );
                result.failed = Some(Error::PartialDelete {
                    failed: report.errors.len(),
                    first: format!("{} ({}: {})", first.target.key, first.code, first.message),
                });
                return result;
            }
        }

        tracing::info!(bucket, deleted = result.deleted, batches = result.batches, "purge complete");
        result
    }
}
