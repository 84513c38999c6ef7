//! S3 client implementation
//!
//! Wraps aws-sdk-s3 and implements the ObjectStore trait from pail-core.

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{
    BucketLocationConstraint, CreateBucketConfiguration, Delete, ObjectIdentifier,
};

use pail_core::profile::DEFAULT_REGION;
use pail_core::versions::MAX_PAGE_SIZE;
use pail_core::{
    ContinuationToken, DeleteFailure, DeleteReport, DeleteTarget, Error, ListOptions, ListResult,
    MAX_BATCH_SIZE, ObjectInfo, ObjectStore, Profile, RemotePath, Result, VersionKind,
    VersionListOptions, VersionPage, VersionRecord,
};

use crate::error::map_sdk_error;

/// S3 client wrapper
pub struct S3Client {
    inner: aws_sdk_s3::Client,
    region: String,
}

impl S3Client {
    /// Create a new S3 client from a profile
    ///
    /// Profiles without inline keys read credentials through the SDK's
    /// default chain, using the profile's shared AWS profile name. A profile
    /// without a region takes it from that chain too, then from
    /// [`DEFAULT_REGION`].
    pub async fn new(profile: Profile) -> Result<Self> {
        if let Some(endpoint) = &profile.endpoint {
            check_endpoint(endpoint)?;
        }

        let timeouts = profile.timeout_config();
        let mut timeout_config = aws_config::timeout::TimeoutConfig::builder()
            .connect_timeout(Duration::from_millis(timeouts.connect_ms))
            .read_timeout(Duration::from_millis(timeouts.read_ms));
        if let Some(ms) = timeouts.operation_ms {
            timeout_config = timeout_config.operation_timeout(Duration::from_millis(ms));
        }

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .timeout_config(timeout_config.build());
        if let Some(region) = &profile.region {
            loader = loader.region(aws_config::Region::new(region.clone()));
        }

        loader = match profile.static_keys() {
            Some((access_key, secret_key)) => {
                let credentials = aws_credential_types::Credentials::new(
                    access_key,
                    secret_key,
                    None, // session token
                    None, // expiry
                    "cloudpail-profile",
                );
                loader.credentials_provider(credentials)
            }
            None => loader.profile_name(profile.shared_profile_name()),
        };

        // Regional AWS endpoints are resolved by the SDK itself
        if let Some(endpoint) = &profile.endpoint {
            loader = loader.endpoint_url(endpoint);
        }

        let config = loader.load().await;
        let region = config
            .region()
            .map(|r| r.to_string())
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        let s3_config = aws_sdk_s3::config::Builder::from(&config)
            .region(aws_config::Region::new(region.clone()))
            .force_path_style(profile.path_style)
            .build();

        tracing::debug!(
            profile = %profile.name,
            region = %region,
            endpoint = profile.endpoint.as_deref().unwrap_or("aws"),
            "created S3 client"
        );

        Ok(Self {
            inner: aws_sdk_s3::Client::from_conf(s3_config),
            region,
        })
    }

    /// Region requests are signed for
    pub fn region(&self) -> &str {
        &self.region
    }
}

/// Reject endpoints that are not absolute http(s) URLs with a host
fn check_endpoint(endpoint: &str) -> Result<()> {
    let url = url::Url::parse(endpoint)?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(()),
        _ => Err(Error::Config(format!(
            "endpoint must be an http(s) URL with a host: {endpoint}"
        ))),
    }
}

fn to_timestamp(value: &aws_smithy_types::DateTime) -> Option<jiff::Timestamp> {
    jiff::Timestamp::new(value.secs(), value.subsec_nanos() as i32).ok()
}

fn trim_etag(etag: &str) -> String {
    etag.trim_matches('"').to_string()
}

#[async_trait]
impl ObjectStore for S3Client {
    async fn list_buckets(&self) -> Result<Vec<ObjectInfo>> {
        let response = self
            .inner
            .list_buckets()
            .send()
            .await
            .map_err(|e| map_sdk_error(e, "list buckets"))?;

        let buckets = response
            .buckets()
            .iter()
            .map(|b| {
                let mut info = ObjectInfo::bucket(b.name().unwrap_or_default());
                info.last_modified = b.creation_date().and_then(to_timestamp);
                info
            })
            .collect();

        Ok(buckets)
    }

    async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        match self.inner.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(true),
            Err(e) => match map_sdk_error(e, bucket) {
                Error::NotFound(_) => Ok(false),
                other => Err(other),
            },
        }
    }

    async fn create_bucket(&self, bucket: &str, region: Option<String>) -> Result<()> {
        let region = region.unwrap_or_else(|| self.region.clone());
        let mut request = self.inner.create_bucket().bucket(bucket);

        // us-east-1 rejects an explicit location constraint
        if region != DEFAULT_REGION {
            let configuration = CreateBucketConfiguration::builder()
                .location_constraint(BucketLocationConstraint::from(region.as_str()))
                .build();
            request = request.create_bucket_configuration(configuration);
        }

        request
            .send()
            .await
            .map_err(|e| map_sdk_error(e, bucket))?;

        tracing::debug!(bucket, region = %region, "bucket created");
        Ok(())
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<()> {
        self.inner
            .delete_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, bucket))?;

        Ok(())
    }

    async fn list_objects(&self, path: &RemotePath, options: ListOptions) -> Result<ListResult> {
        let mut request = self.inner.list_objects_v2().bucket(&path.bucket);

        if !path.key.is_empty() {
            request = request.prefix(&path.key);
        }

        // Set delimiter (for non-recursive listing)
        if !options.recursive {
            request = request.delimiter(options.delimiter.as_deref().unwrap_or("/"));
        }

        if let Some(max) = options.max_keys {
            request = request.max_keys(max);
        }

        if let Some(token) = &options.continuation_token {
            request = request.continuation_token(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| map_sdk_error(e, &path.bucket))?;

        let mut items = Vec::new();

        for prefix in response.common_prefixes() {
            if let Some(p) = prefix.prefix() {
                items.push(ObjectInfo::dir(p));
            }
        }

        for object in response.contents() {
            let mut info = ObjectInfo::file(object.key().unwrap_or_default(), object.size().unwrap_or(0));
            info.last_modified = object.last_modified().and_then(to_timestamp);
            info.etag = object.e_tag().map(trim_etag);
            info.storage_class = object.storage_class().map(|sc| sc.as_str().to_string());
            items.push(info);
        }

        Ok(ListResult {
            items,
            truncated: response.is_truncated().unwrap_or(false),
            continuation_token: response.next_continuation_token().map(str::to_string),
        })
    }

    async fn list_object_versions(
        &self,
        bucket: &str,
        options: VersionListOptions,
    ) -> Result<VersionPage> {
        let mut request = self
            .inner
            .list_object_versions()
            .bucket(bucket)
            .max_keys(options.max_keys.unwrap_or(MAX_PAGE_SIZE));

        if let Some(token) = options.continuation {
            request = request
                .key_marker(token.key_marker)
                .set_version_id_marker(token.version_id_marker);
        }

        let response = request
            .send()
            .await
            .map_err(|e| map_sdk_error(e, bucket))?;

        let mut records = Vec::with_capacity(response.versions().len() + response.delete_markers().len());

        for version in response.versions() {
            let mut record = VersionRecord::new(
                version.key().unwrap_or_default(),
                version.version_id().unwrap_or("null"),
                VersionKind::Version,
            );
            record.is_latest = version.is_latest().unwrap_or(false);
            record.size_bytes = version.size();
            record.last_modified = version.last_modified().and_then(to_timestamp);
            records.push(record);
        }

        for marker in response.delete_markers() {
            let mut record = VersionRecord::new(
                marker.key().unwrap_or_default(),
                marker.version_id().unwrap_or("null"),
                VersionKind::DeleteMarker,
            );
            record.is_latest = marker.is_latest().unwrap_or(false);
            record.last_modified = marker.last_modified().and_then(to_timestamp);
            records.push(record);
        }

        let next = if response.is_truncated().unwrap_or(false) {
            match response.next_key_marker() {
                Some(key_marker) => Some(ContinuationToken::new(
                    key_marker,
                    response.next_version_id_marker().map(str::to_string),
                )),
                None => {
                    tracing::warn!(bucket, "truncated version listing without a key marker");
                    None
                }
            }
        } else {
            None
        };

        Ok(VersionPage { records, next })
    }

    async fn delete_object_versions(
        &self,
        bucket: &str,
        targets: Vec<DeleteTarget>,
    ) -> Result<DeleteReport> {
        if targets.is_empty() {
            return Ok(DeleteReport::default());
        }
        if targets.len() > MAX_BATCH_SIZE {
            return Err(Error::General(format!(
                "batch of {} targets exceeds the limit of {MAX_BATCH_SIZE}",
                targets.len()
            )));
        }

        let objects = targets
            .iter()
            .map(|target| {
                ObjectIdentifier::builder()
                    .key(&target.key)
                    .set_version_id(target.version_id.clone())
                    .build()
                    .map_err(|e| Error::General(e.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;

        let delete = Delete::builder()
            .set_objects(Some(objects))
            .build()
            .map_err(|e| Error::General(e.to_string()))?;

        let response = self
            .inner
            .delete_objects()
            .bucket(bucket)
            .delete(delete)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, bucket))?;

        let errors: Vec<DeleteFailure> = response
            .errors()
            .iter()
            .map(|e| DeleteFailure {
                target: DeleteTarget::new(
                    e.key().unwrap_or_default(),
                    e.version_id().map(str::to_string),
                ),
                code: e.code().unwrap_or("Unknown").to_string(),
                message: e.message().unwrap_or_default().to_string(),
            })
            .collect();

        Ok(DeleteReport {
            deleted: response.deleted().len() as u64,
            errors,
        })
    }

    async fn head_object(&self, path: &RemotePath) -> Result<ObjectInfo> {
        let response = self
            .inner
            .head_object()
            .bucket(&path.bucket)
            .key(&path.key)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, &path.to_string()))?;

        let mut info = ObjectInfo::file(&path.key, response.content_length().unwrap_or(0));
        info.last_modified = response.last_modified().and_then(to_timestamp);
        info.etag = response.e_tag().map(trim_etag);
        info.content_type = response.content_type().map(str::to_string);
        info.storage_class = response.storage_class().map(|sc| sc.as_str().to_string());

        Ok(info)
    }

    async fn get_object(&self, path: &RemotePath) -> Result<Vec<u8>> {
        let response = self
            .inner
            .get_object()
            .bucket(&path.bucket)
            .key(&path.key)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, &path.to_string()))?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| Error::NetworkUnavailable(format!("{path}: {e}")))?
            .into_bytes()
            .to_vec();

        Ok(data)
    }

    async fn put_object(
        &self,
        path: &RemotePath,
        data: Vec<u8>,
        content_type: Option<String>,
    ) -> Result<ObjectInfo> {
        let size = data.len() as i64;

        let response = self
            .inner
            .put_object()
            .bucket(&path.bucket)
            .key(&path.key)
            .body(ByteStream::from(data))
            .set_content_type(content_type.clone())
            .send()
            .await
            .map_err(|e| map_sdk_error(e, &path.to_string()))?;

        let mut info = ObjectInfo::file(&path.key, size);
        info.etag = response.e_tag().map(trim_etag);
        info.content_type = content_type;
        info.last_modified = Some(jiff::Timestamp::now());

        Ok(info)
    }

    async fn delete_object(&self, path: &RemotePath) -> Result<()> {
        self.inner
            .delete_object()
            .bucket(&path.bucket)
            .key(&path.key)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, &path.to_string()))?;

        Ok(())
    }

    async fn presigned_get_url(&self, path: &RemotePath, expires: Duration) -> Result<String> {
        let config = PresigningConfig::expires_in(expires)
            .map_err(|e| Error::General(format!("invalid link lifetime: {e}")))?;

        let request = self
            .inner
            .get_object()
            .bucket(&path.bucket)
            .key(&path.key)
            .presigned(config)
            .await
            .map_err(|e| map_sdk_error(e, &path.to_string()))?;

        Ok(request.uri().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_endpoint() {
        assert!(check_endpoint("https://s3.us-east-1.amazonaws.com").is_ok());
        assert!(check_endpoint("http://localhost:9000").is_ok());
        assert!(matches!(check_endpoint("not a url"), Err(Error::InvalidUrl(_))));
        assert!(matches!(check_endpoint("ftp://example.com"), Err(Error::Config(_))));
    }

    #[test]
    fn test_to_timestamp_keeps_subseconds() {
        let value = aws_smithy_types::DateTime::from_secs_and_nanos(1_700_000_000, 250_000_000);
        let ts = to_timestamp(&value).unwrap();
        assert_eq!(ts.as_second(), 1_700_000_000);
        assert_eq!(ts.subsec_nanosecond(), 250_000_000);
    }

    #[tokio::test]
    async fn test_region_resolution() {
        let dir = tempfile::TempDir::new().unwrap();
        let config_file = dir.path().join("config");
        std::fs::write(&config_file, "[profile work]\nregion = eu-west-1\n").unwrap();

        // SAFETY: no other test in this crate reads the AWS environment
        unsafe {
            std::env::set_var("AWS_CONFIG_FILE", &config_file);
            std::env::set_var("AWS_SHARED_CREDENTIALS_FILE", dir.path().join("credentials"));
            std::env::set_var("AWS_EC2_METADATA_DISABLED", "true");
            std::env::remove_var("AWS_REGION");
            std::env::remove_var("AWS_DEFAULT_REGION");
        }

        // unset region comes from the shared profile of the same name
        let client = S3Client::new(Profile::new("work")).await.unwrap();
        assert_eq!(client.region(), "eu-west-1");

        // no region anywhere
        let client = S3Client::new(Profile::new("elsewhere")).await.unwrap();
        assert_eq!(client.region(), DEFAULT_REGION);

        // an explicit region wins over the shared profile
        let client = S3Client::new(Profile::new("work").with_region("ap-south-1"))
            .await
            .unwrap();
        assert_eq!(client.region(), "ap-south-1");
    }

    #[test]
    fn test_trim_etag() {
        assert_eq!(trim_etag("\"abc123\""), "abc123");
        assert_eq!(trim_etag("abc123"), "abc123");
    }
}
