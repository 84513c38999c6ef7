//! In-memory object store for stateful tests
//!
//! Records are kept sorted by (key, version id) and listing resumes strictly
//! after the continuation marker, so pagination stays consistent while a
//! purge deletes records between pages.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::path::RemotePath;
use crate::traits::{
    DeleteFailure, DeleteReport, DeleteTarget, ListOptions, ListResult, ObjectInfo, ObjectStore,
    VersionListOptions,
};
use crate::versions::{ContinuationToken, VersionKind, VersionPage, VersionRecord};

type Entry = (String, String, VersionKind);

#[derive(Default)]
struct State {
    buckets: BTreeMap<String, BTreeSet<Entry>>,
    list_calls: usize,
    delete_calls: usize,
    batch_sizes: Vec<usize>,
    delete_bucket_calls: Vec<String>,
    list_failures: HashMap<usize, Error>,
    delete_failures: HashMap<usize, Error>,
    rejected_keys: BTreeSet<String>,
    late_writes: HashMap<usize, (String, Entry)>,
}

#[derive(Default)]
pub struct FakeStore {
    state: Mutex<State>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bucket(self, bucket: &str) -> Self {
        self.lock().buckets.entry(bucket.to_string()).or_default();
        self
    }

    /// Add `count` plain objects named `obj-00000`, `obj-00001`, ...
    pub fn with_objects(self, bucket: &str, count: usize) -> Self {
        {
            let mut state = self.lock();
            let records = state.buckets.entry(bucket.to_string()).or_default();
            for i in 0..count {
                records.insert((format!("obj-{i:05}"), "null".to_string(), VersionKind::Version));
            }
        }
        self
    }

    pub fn with_record(self, bucket: &str, key: &str, version: &str, kind: VersionKind) -> Self {
        self.lock()
            .buckets
            .entry(bucket.to_string())
            .or_default()
            .insert((key.to_string(), version.to_string(), kind));
        self
    }

    /// Make the `n`th listing call (1-based) fail
    pub fn fail_list_call(self, n: usize, error: Error) -> Self {
        self.lock().list_failures.insert(n, error);
        self
    }

    /// Make the `n`th batch delete call (1-based) fail
    pub fn fail_delete_call(self, n: usize, error: Error) -> Self {
        self.lock().delete_failures.insert(n, error);
        self
    }

    /// Refuse to delete any version of `key`
    pub fn reject_key(self, key: &str) -> Self {
        self.lock().rejected_keys.insert(key.to_string());
        self
    }

    /// Write a new record into `bucket` right after the `n`th batch delete call
    pub fn write_after_delete_call(self, n: usize, bucket: &str, key: &str) -> Self {
        self.lock().late_writes.insert(
            n,
            (
                bucket.to_string(),
                (key.to_string(), "late".to_string(), VersionKind::Version),
            ),
        );
        self
    }

    pub fn list_calls(&self) -> usize {
        self.lock().list_calls
    }

    pub fn delete_calls(&self) -> usize {
        self.lock().delete_calls
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.lock().batch_sizes.clone()
    }

    pub fn delete_bucket_calls(&self) -> Vec<String> {
        self.lock().delete_bucket_calls.clone()
    }

    pub fn has_bucket(&self, bucket: &str) -> bool {
        self.lock().buckets.contains_key(bucket)
    }

    pub fn remaining(&self, bucket: &str) -> usize {
        self.lock().buckets.get(bucket).map_or(0, BTreeSet::len)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }
}

#[async_trait]
impl ObjectStore for FakeStore {
    async fn list_buckets(&self) -> Result<Vec<ObjectInfo>> {
        Ok(self.lock().buckets.keys().map(ObjectInfo::bucket).collect())
    }

    async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        Ok(self.has_bucket(bucket))
    }

    async fn create_bucket(&self, bucket: &str, _region: Option<String>) -> Result<()> {
        self.lock().buckets.entry(bucket.to_string()).or_default();
        Ok(())
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<()> {
        let mut state = self.lock();
        state.delete_bucket_calls.push(bucket.to_string());
        match state.buckets.get(bucket) {
            None => Err(Error::NotFound(bucket.to_string())),
            Some(records) if !records.is_empty() => Err(Error::BucketNotEmpty(bucket.to_string())),
            Some(_) => {
                state.buckets.remove(bucket);
                Ok(())
            }
        }
    }

    async fn list_objects(&self, path: &RemotePath, _options: ListOptions) -> Result<ListResult> {
        let state = self.lock();
        let records = state
            .buckets
            .get(&path.bucket)
            .ok_or_else(|| Error::NotFound(path.bucket.clone()))?;
        let items = records
            .iter()
            .filter(|(key, _, kind)| *kind == VersionKind::Version && key.starts_with(&path.key))
            .map(|(key, _, _)| ObjectInfo::file(key.clone(), 0))
            .collect();
        Ok(ListResult {
            items,
            truncated: false,
            continuation_token: None,
        })
    }

    async fn list_object_versions(
        &self,
        bucket: &str,
        options: VersionListOptions,
    ) -> Result<VersionPage> {
        let mut state = self.lock();
        state.list_calls += 1;
        let call = state.list_calls;
        if let Some(error) = state.list_failures.remove(&call) {
            return Err(error);
        }

        let records = state
            .buckets
            .get(bucket)
            .ok_or_else(|| Error::NotFound(bucket.to_string()))?;
        let limit = options.max_keys.unwrap_or(1000).max(1) as usize;

        let after = options
            .continuation
            .map(|token| (token.key_marker, token.version_id_marker.unwrap_or_default()));
        let mut remaining = records.iter().filter(|(key, version, _)| match &after {
            Some((marker_key, marker_version)) => {
                (key.as_str(), version.as_str()) > (marker_key.as_str(), marker_version.as_str())
            }
            None => true,
        });

        let page: Vec<&Entry> = remaining.by_ref().take(limit).collect();
        let more = remaining.next().is_some();

        let next = match (more, page.last()) {
            (true, Some((key, version, _))) => {
                Some(ContinuationToken::new(key.clone(), Some(version.clone())))
            }
            _ => None,
        };
        let records = page
            .into_iter()
            .map(|(key, version, kind)| VersionRecord::new(key.clone(), version.clone(), *kind))
            .collect();

        Ok(VersionPage { records, next })
    }

    async fn delete_object_versions(
        &self,
        bucket: &str,
        targets: Vec<DeleteTarget>,
    ) -> Result<DeleteReport> {
        let mut state = self.lock();
        state.delete_calls += 1;
        let call = state.delete_calls;
        if let Some(error) = state.delete_failures.remove(&call) {
            return Err(error);
        }
        state.batch_sizes.push(targets.len());

        let rejected = state.rejected_keys.clone();
        let records = state
            .buckets
            .get_mut(bucket)
            .ok_or_else(|| Error::NotFound(bucket.to_string()))?;

        let mut report = DeleteReport::default();
        for target in targets {
            if rejected.contains(&target.key) {
                report.errors.push(DeleteFailure {
                    target,
                    code: "AccessDenied".to_string(),
                    message: "Access Denied".to_string(),
                });
                continue;
            }
            let version = target.version_id.clone().unwrap_or_default();
            records.retain(|(key, v, _)| !(key == &target.key && v == &version));
            report.deleted += 1;
        }

        if let Some((late_bucket, entry)) = state.late_writes.remove(&call) {
            state.buckets.entry(late_bucket).or_default().insert(entry);
        }

        Ok(report)
    }

    async fn head_object(&self, path: &RemotePath) -> Result<ObjectInfo> {
        let state = self.lock();
        let found = state.buckets.get(&path.bucket).is_some_and(|records| {
            records
                .iter()
                .any(|(key, _, kind)| key == &path.key && *kind == VersionKind::Version)
        });
        if found {
            Ok(ObjectInfo::file(path.key.clone(), 0))
        } else {
            Err(Error::NotFound(path.to_string()))
        }
    }

    async fn get_object(&self, _path: &RemotePath) -> Result<Vec<u8>> {
        Err(Error::UnsupportedFeature("object content".into()))
    }

    async fn put_object(
        &self,
        path: &RemotePath,
        data: Vec<u8>,
        _content_type: Option<String>,
    ) -> Result<ObjectInfo> {
        self.lock()
            .buckets
            .entry(path.bucket.clone())
            .or_default()
            .insert((path.key.clone(), "null".to_string(), VersionKind::Version));
        Ok(ObjectInfo::file(path.key.clone(), data.len() as i64))
    }

    async fn delete_object(&self, path: &RemotePath) -> Result<()> {
        let mut state = self.lock();
        if let Some(records) = state.buckets.get_mut(&path.bucket) {
            records.retain(|(key, _, _)| key != &path.key);
        }
        Ok(())
    }

    async fn presigned_get_url(&self, _path: &RemotePath, _expires: Duration) -> Result<String> {
        Err(Error::UnsupportedFeature("presigned urls".into()))
    }
}
