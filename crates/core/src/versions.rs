//! Paginated version listing
//!
//! A bucket's history is exposed by the service as pages of object versions
//! and delete markers. [`VersionLister`] walks those pages with an explicit
//! cursor: each call to [`VersionLister::next_page`] issues at most one request,
//! and the sequence ends when the service stops returning a continuation token.
//! A lister cannot be rewound; restart by building a new one.

use futures::stream::{self, Stream, TryStreamExt};
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::traits::{MAX_BATCH_SIZE, ObjectStore, VersionListOptions};

/// Largest page size the service accepts
pub const MAX_PAGE_SIZE: i32 = MAX_BATCH_SIZE as i32;

/// Whether a record is a stored revision or a tombstone
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionKind {
    Version,
    DeleteMarker,
}

/// One version or delete marker of an object key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionRecord {
    pub key: String,

    /// Version id; `"null"` for objects written while versioning was off
    pub version_id: String,

    pub kind: VersionKind,

    /// Whether this is the current version of the key
    #[serde(default)]
    pub is_latest: bool,

    /// Size in bytes (delete markers have none)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<Timestamp>,
}

impl VersionRecord {
    pub fn new(key: impl Into<String>, version_id: impl Into<String>, kind: VersionKind) -> Self {
        Self {
            key: key.into(),
            version_id: version_id.into(),
            kind,
            is_latest: false,
            size_bytes: None,
            last_modified: None,
        }
    }

    pub fn is_delete_marker(&self) -> bool {
        self.kind == VersionKind::DeleteMarker
    }
}

/// Identity is (key, version id, kind); display attributes are ignored
impl PartialEq for VersionRecord {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.version_id == other.version_id && self.kind == other.kind
    }
}

impl Eq for VersionRecord {}

/// Opaque position in a version listing
///
/// For S3 this is the `(key-marker, version-id-marker)` pair of the last page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContinuationToken {
    pub key_marker: String,
    pub version_id_marker: Option<String>,
}

impl ContinuationToken {
    pub fn new(key_marker: impl Into<String>, version_id_marker: Option<String>) -> Self {
        Self {
            key_marker: key_marker.into(),
            version_id_marker,
        }
    }
}

/// One page of a version listing
#[derive(Debug, Clone, Default)]
pub struct VersionPage {
    /// Records in arrival order: versions first, then delete markers
    pub records: Vec<VersionRecord>,

    /// Present only when more pages remain
    pub next: Option<ContinuationToken>,
}

impl VersionPage {
    pub fn is_last(&self) -> bool {
        self.next.is_none()
    }
}

/// Cursor over the version pages of one bucket
pub struct VersionLister<'a, S: ObjectStore + ?Sized> {
    store: &'a S,
    bucket: String,
    page_size: Option<i32>,
    next: Option<ContinuationToken>,
    finished: bool,
}

impl<'a, S: ObjectStore + ?Sized> VersionLister<'a, S> {
    pub fn new(store: &'a S, bucket: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            page_size: None,
            next: None,
            finished: false,
        }
    }

    /// Cap the number of records per page (clamped to 1..=1000)
    pub fn page_size(mut self, size: usize) -> Self {
        self.page_size = Some(size.clamp(1, MAX_BATCH_SIZE) as i32);
        self
    }

    /// Whether the listing has ended, by exhaustion or by error
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Fetch the next page
    ///
    /// Returns `Ok(None)` once the service has reported the final page. An
    /// error also ends the sequence: later calls return `Ok(None)`.
    pub async fn next_page(&mut self) -> Result<Option<VersionPage>> {
        if self.finished {
            return Ok(None);
        }

        let options = VersionListOptions {
            max_keys: self.page_size,
            continuation: self.next.take(),
        };

        match self.store.list_object_versions(&self.bucket, options).await {
            Ok(page) => {
                tracing::debug!(
                    bucket = %self.bucket,
                    records = page.records.len(),
                    more = !page.is_last(),
                    "fetched version page"
                );
                self.next = page.next.clone();
                self.finished = page.is_last();
                Ok(Some(page))
            }
            Err(e) => {
                self.finished = true;
                Err(e)
            }
        }
    }

    /// Turn the cursor into a stream of pages
    ///
    /// The stream yields an error at most once and then ends.
    pub fn into_stream(self) -> impl Stream<Item = Result<VersionPage>> + 'a
    where
        S: 'a,
    {
        stream::try_unfold(self, |mut lister| async move {
            Ok::<_, Error>(lister.next_page().await?.map(|page| (page, lister)))
        })
    }
}

/// Collect every version and delete marker of a bucket
pub async fn collect_versions<S: ObjectStore + ?Sized>(
    store: &S,
    bucket: &str,
) -> Result<Vec<VersionRecord>> {
    VersionLister::new(store, bucket)
        .page_size(MAX_BATCH_SIZE)
        .into_stream()
        .map_ok(|page| page.records)
        .try_concat()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::MockObjectStore;
    use mockall::Sequence;

    fn page(keys: &[&str], next: Option<&str>) -> VersionPage {
        VersionPage {
            records: keys
                .iter()
                .map(|k| VersionRecord::new(*k, "v1", VersionKind::Version))
                .collect(),
            next: next.map(|marker| ContinuationToken::new(marker, Some("v1".to_string()))),
        }
    }

    #[test]
    fn test_record_identity_ignores_display_fields() {
        let mut a = VersionRecord::new("k", "v1", VersionKind::Version);
        let b = VersionRecord::new("k", "v1", VersionKind::Version);
        a.is_latest = true;
        a.size_bytes = Some(10);
        assert_eq!(a, b);

        let marker = VersionRecord::new("k", "v1", VersionKind::DeleteMarker);
        assert_ne!(b, marker);
        assert!(marker.is_delete_marker());
    }

    #[tokio::test]
    async fn test_follows_continuation_tokens() {
        let mut store = MockObjectStore::new();
        let mut seq = Sequence::new();

        store
            .expect_list_object_versions()
            .withf(|bucket, options| bucket == "b1" && options.continuation.is_none())
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(page(&["a", "b"], Some("b"))));
        store
            .expect_list_object_versions()
            .withf(|_, options| {
                options.continuation.as_ref().map(|t| t.key_marker.as_str()) == Some("b")
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(page(&["c"], None)));

        let mut lister = VersionLister::new(&store, "b1");
        assert_eq!(lister.next_page().await.unwrap().unwrap().records.len(), 2);
        assert_eq!(lister.next_page().await.unwrap().unwrap().records.len(), 1);
        assert!(lister.is_finished());
        assert!(lister.next_page().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_page_with_token_is_not_the_end() {
        let mut store = MockObjectStore::new();
        let mut seq = Sequence::new();

        store
            .expect_list_object_versions()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(page(&[], Some("m"))));
        store
            .expect_list_object_versions()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(page(&["z"], None)));

        let records = collect_versions(&store, "b1").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].key, "z");
    }

    #[tokio::test]
    async fn test_page_size_is_clamped_and_forwarded() {
        let mut store = MockObjectStore::new();
        store
            .expect_list_object_versions()
            .withf(|_, options| options.max_keys == Some(1000))
            .times(1)
            .returning(|_, _| Ok(page(&[], None)));

        let mut lister = VersionLister::new(&store, "b1").page_size(5000);
        let first = lister.next_page().await.unwrap().unwrap();
        assert!(first.records.is_empty());
        assert!(first.is_last());
    }

    #[tokio::test]
    async fn test_error_terminates_sequence() {
        let mut store = MockObjectStore::new();
        store
            .expect_list_object_versions()
            .times(1)
            .returning(|_, _| Err(Error::NetworkUnavailable("connection refused".into())));

        let mut lister = VersionLister::new(&store, "b1");
        let err = lister.next_page().await.unwrap_err();
        assert!(matches!(err, Error::NetworkUnavailable(_)));
        assert!(lister.next_page().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_collect_surfaces_service_errors() {
        let mut store = MockObjectStore::new();
        store
            .expect_list_object_versions()
            .times(1)
            .returning(|_, _| Err(Error::service("AccessDenied", "Access Denied")));

        let err = collect_versions(&store, "b1").await.unwrap_err();
        assert!(err.is_access_denied());
    }
}
