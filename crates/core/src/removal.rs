//! Bucket removal
//!
//! Deleting a versioned bucket takes several steps. The service only removes
//! buckets that hold no versions and no delete markers, so a non-empty bucket
//! has to be purged first, and purging destroys data, so it needs consent.
//!
//! [`BucketRemoval`] runs those steps as a small state machine:
//!
//! ```text
//! CheckingEmpty ─┬─ Empty ───────────────────────────────────────────┬─ Deleting ─ Deleted
//!                └─ NotEmpty ─ AwaitingConfirmation ─┬─ Confirmed ─ Purging ─ CheckingEmpty
//!                                                    └─ Declined ─ Aborted
//! ```
//!
//! Any step that cannot be completed ends in `Failed`. An emptiness probe that
//! cannot reach the service is a failure, never a guess. The bucket is only
//! removed when the probe right before it said `Empty`.

use serde::Serialize;

use crate::error::Error;
use crate::probe::{Emptiness, probe_bucket_empty};
use crate::purge::{CancelFlag, PurgeEngine, PurgeProgress};
use crate::traits::{MAX_BATCH_SIZE, ObjectStore};

/// Asks whether a non-empty bucket may be purged
pub trait Confirm: Send + Sync {
    fn confirm(&self, bucket: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn confirm(&self, bucket: &str) -> bool {
        self(bucket)
    }
}

/// Steps of a bucket removal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalState {
    CheckingEmpty,
    Empty,
    NotEmpty,
    AwaitingConfirmation,
    Confirmed,
    Declined,
    Purging,
    Deleting,
    Deleted,
    Aborted,
    Failed,
}

/// Why and where a removal stopped
#[derive(Debug)]
pub struct RemovalFailure {
    /// The step that could not be completed
    pub stage: RemovalState,

    /// Records erased before the failure
    pub purged: u64,

    pub error: Error,
}

#[derive(Debug)]
pub enum RemovalOutcome {
    /// The bucket is gone; `purged` records were erased on the way
    Deleted { purged: u64 },

    /// Confirmation was declined; nothing was touched
    Aborted,

    Failed(RemovalFailure),
}

/// Result of one removal run
#[derive(Debug)]
pub struct RemovalReport {
    pub bucket: String,
    pub outcome: RemovalOutcome,

    /// Every state visited, in order
    pub trail: Vec<RemovalState>,
}

impl RemovalReport {
    pub fn is_deleted(&self) -> bool {
        matches!(self.outcome, RemovalOutcome::Deleted { .. })
    }

    /// Records erased during the run
    pub fn purged(&self) -> u64 {
        match &self.outcome {
            RemovalOutcome::Deleted { purged } => *purged,
            RemovalOutcome::Aborted => 0,
            RemovalOutcome::Failed(failure) => failure.purged,
        }
    }
}

type ProgressFn<'a> = Box<dyn FnMut(PurgeProgress) + Send + 'a>;

/// Removes a bucket, purging it first when the caller confirms
pub struct BucketRemoval<'a, S: ObjectStore + ?Sized, C: Confirm + ?Sized> {
    store: &'a S,
    confirm: &'a C,
    batch_size: usize,
    cancel: CancelFlag,
    on_progress: Option<ProgressFn<'a>>,
}

impl<'a, S, C> BucketRemoval<'a, S, C>
where
    S: ObjectStore + ?Sized,
    C: Confirm + ?Sized,
{
    pub fn new(store: &'a S, confirm: &'a C) -> Self {
        Self {
            store,
            confirm,
            batch_size: MAX_BATCH_SIZE,
            cancel: CancelFlag::new(),
            on_progress: None,
        }
    }

    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    pub fn cancel_flag(mut self, flag: CancelFlag) -> Self {
        self.cancel = flag;
        self
    }

    /// Called after every purged batch
    pub fn on_progress(mut self, callback: impl FnMut(PurgeProgress) + Send + 'a) -> Self {
        self.on_progress = Some(Box::new(callback));
        self
    }

    pub async fn run(&mut self, bucket: &str) -> RemovalReport {
        let mut run = Run {
            bucket: bucket.to_string(),
            trail: Vec::new(),
            purged: 0,
        };

        let outcome = match self.drive(&mut run).await {
            Ok(outcome) => outcome,
            Err((stage, error)) => {
                run.trail.push(RemovalState::Failed);
                tracing::info!(bucket, stage = ?stage, purged = run.purged, error = %error, "bucket removal failed");
                RemovalOutcome::Failed(RemovalFailure {
                    stage,
                    purged: run.purged,
                    error,
                })
            }
        };

        RemovalReport {
            bucket: run.bucket,
            outcome,
            trail: run.trail,
        }
    }

    async fn drive(&mut self, run: &mut Run) -> Result<RemovalOutcome, (RemovalState, Error)> {
        let bucket = run.bucket.clone();

        if !self.check_empty(run).await? {
            run.trail.push(RemovalState::AwaitingConfirmation);
            // an interrupt while the question was open counts as a no
            if !self.confirm.confirm(&bucket) || self.cancel.is_cancelled() {
                run.trail.push(RemovalState::Declined);
                run.trail.push(RemovalState::Aborted);
                tracing::info!(bucket = %bucket, "bucket removal declined");
                return Ok(RemovalOutcome::Aborted);
            }
            run.trail.push(RemovalState::Confirmed);

            self.purge(run).await?;

            // objects written during the purge keep the bucket alive
            if !self.check_empty(run).await? {
                return Err((
                    RemovalState::CheckingEmpty,
                    Error::BucketNotEmpty(format!("{bucket} received new objects during the purge")),
                ));
            }
        }

        run.trail.push(RemovalState::Deleting);
        self.store
            .delete_bucket(&bucket)
            .await
            .map_err(|e| (RemovalState::Deleting, e))?;

        run.trail.push(RemovalState::Deleted);
        tracing::info!(bucket = %bucket, purged = run.purged, "bucket deleted");
        Ok(RemovalOutcome::Deleted { purged: run.purged })
    }

    /// Probe the bucket and record the answer; `Unknown` is a failure
    async fn check_empty(&self, run: &mut Run) -> Result<bool, (RemovalState, Error)> {
        run.trail.push(RemovalState::CheckingEmpty);

        match probe_bucket_empty(self.store, &run.bucket).await {
            Ok(Emptiness::Empty) => {
                run.trail.push(RemovalState::Empty);
                Ok(true)
            }
            Ok(Emptiness::NotEmpty) => {
                run.trail.push(RemovalState::NotEmpty);
                Ok(false)
            }
            Ok(Emptiness::Unknown(e)) | Err(e) => Err((RemovalState::CheckingEmpty, e)),
        }
    }

    async fn purge(&mut self, run: &mut Run) -> Result<(), (RemovalState, Error)> {
        run.trail.push(RemovalState::Purging);

        let mut engine = PurgeEngine::new(self.store)
            .batch_size(self.batch_size)
            .cancel_flag(self.cancel.clone());
        if let Some(callback) = self.on_progress.take() {
            engine = engine.on_progress(callback);
        }

        let result = engine.purge_all(&run.bucket).await;
        run.purged = result.deleted;

        if result.cancelled {
            return Err((
                RemovalState::Purging,
                Error::Interrupted(format!(
                    "purge of {} stopped after {} deletion(s)",
                    run.bucket, result.deleted
                )),
            ));
        }
        match result.failed {
            Some(e) => Err((RemovalState::Purging, e)),
            None => Ok(()),
        }
    }
}

struct Run {
    bucket: String,
    trail: Vec<RemovalState>,
    purged: u64,
}
