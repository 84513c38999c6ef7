//! pail-core: Core library for the cloudpail S3 CLI
//!
//! This crate provides the core functionality for cloudpail, including:
//! - Configuration and profile management
//! - Path parsing
//! - ObjectStore trait for S3 operations
//! - Version listing, emptiness probes, batch purge and bucket removal
//!
//! This crate is designed to be independent of any specific S3 SDK,
//! so the removal logic can be tested against mocks and in-memory stores.

pub mod config;
pub mod error;
pub mod path;
pub mod probe;
pub mod profile;
pub mod purge;
pub mod removal;
pub mod traits;
pub mod versions;

#[cfg(test)]
mod testing;

pub use config::{Config, ConfigManager};
pub use error::{Error, Result};
pub use path::{RemotePath, parse_remote_path, validate_bucket_name};
pub use probe::{Emptiness, Existence, probe_bucket_empty, probe_object};
pub use profile::{Profile, ProfileManager, TimeoutConfig};
pub use purge::{CancelFlag, PurgeEngine, PurgeProgress, PurgeResult};
pub use removal::{BucketRemoval, Confirm, RemovalFailure, RemovalOutcome, RemovalReport, RemovalState};
pub use traits::{
    DeleteFailure, DeleteReport, DeleteTarget, ListOptions, ListResult, MAX_BATCH_SIZE,
    ObjectInfo, ObjectStore, VersionListOptions,
};
pub use versions::{
    ContinuationToken, VersionKind, VersionLister, VersionPage, VersionRecord, collect_versions,
};
