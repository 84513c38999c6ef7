//! Point-in-time probes
//!
//! Both probes answer a yes/no question about remote state with a third
//! outcome for "the service could not be reached". Callers must treat
//! `Unknown` as a stop signal, never as either answer.

use crate::error::{Error, Result};
use crate::path::RemotePath;
use crate::traits::ObjectStore;
use crate::versions::VersionLister;

/// Whether a bucket holds any version or delete marker
#[derive(Debug)]
pub enum Emptiness {
    Empty,
    NotEmpty,
    /// The listing could not be fetched; carries the transport error
    Unknown(Error),
}

impl Emptiness {
    pub fn is_empty(&self) -> bool {
        matches!(self, Emptiness::Empty)
    }
}

/// Whether a single object exists
#[derive(Debug)]
pub enum Existence {
    Exists,
    Missing,
    /// The service could not be asked; carries the transport error
    Unknown(Error),
}

/// Check whether `bucket` is empty, counting delete markers
///
/// Reads a single page capped at one record. Transport failures become
/// [`Emptiness::Unknown`]; errors reported by the service are returned as `Err`.
pub async fn probe_bucket_empty<S: ObjectStore + ?Sized>(
    store: &S,
    bucket: &str,
) -> Result<Emptiness> {
    let mut lister = VersionLister::new(store, bucket).page_size(1);

    match lister.next_page().await {
        Ok(Some(page)) if !page.records.is_empty() => Ok(Emptiness::NotEmpty),
        Ok(_) => Ok(Emptiness::Empty),
        Err(e) if e.is_transport() => {
            tracing::warn!(bucket, error = %e, "could not determine whether bucket is empty");
            Ok(Emptiness::Unknown(e))
        }
        Err(e) => Err(e),
    }
}

/// Check whether the object at `path` exists
///
/// `Missing` is only reported when the service says the key does not exist.
pub async fn probe_object<S: ObjectStore + ?Sized>(
    store: &S,
    path: &RemotePath,
) -> Result<Existence> {
    match store.head_object(path).await {
        Ok(_) => Ok(Existence::Exists),
        Err(Error::NotFound(_)) => Ok(Existence::Missing),
        Err(e) if e.is_transport() => {
            tracing::warn!(path = %path, error = %e, "could not determine whether object exists");
            Ok(Existence::Unknown(e))
        }
        Err(e) => Err(e),
    }
}
