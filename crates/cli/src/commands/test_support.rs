//! Mock store shared by command tests

use std::time::Duration;

use async_trait::async_trait;
use pail_core::{
    DeleteReport, DeleteTarget, ListOptions, ListResult, ObjectInfo, ObjectStore, RemotePath,
    Result, VersionListOptions, VersionPage,
};

use crate::output::{Formatter, OutputConfig};

mockall::mock! {
    pub Store {}

    #[async_trait]
    impl ObjectStore for Store {
        async fn list_buckets(&self) -> Result<Vec<ObjectInfo>>;
        async fn bucket_exists(&self, bucket: &str) -> Result<bool>;
        async fn create_bucket(&self, bucket: &str, region: Option<String>) -> Result<()>;
        async fn delete_bucket(&self, bucket: &str) -> Result<()>;
        async fn list_objects(&self, path: &RemotePath, options: ListOptions) -> Result<ListResult>;
        async fn list_object_versions(
            &self,
            bucket: &str,
            options: VersionListOptions,
        ) -> Result<VersionPage>;
        async fn delete_object_versions(
            &self,
            bucket: &str,
            targets: Vec<DeleteTarget>,
        ) -> Result<DeleteReport>;
        async fn head_object(&self, path: &RemotePath) -> Result<ObjectInfo>;
        async fn get_object(&self, path: &RemotePath) -> Result<Vec<u8>>;
        async fn put_object(
            &self,
            path: &RemotePath,
            data: Vec<u8>,
            content_type: Option<String>,
        ) -> Result<ObjectInfo>;
        async fn delete_object(&self, path: &RemotePath) -> Result<()>;
        async fn presigned_get_url(&self, path: &RemotePath, expires: Duration) -> Result<String>;
    }
}

/// Formatter that prints nothing but errors
pub(crate) fn quiet_formatter() -> Formatter {
    Formatter::new(OutputConfig {
        quiet: true,
        no_color: true,
        no_progress: true,
        ..Default::default()
    })
}
