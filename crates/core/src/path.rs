//! Path parsing and resolution
//!
//! Remote locations are written as `bucket[/key]`. The profile that owns the
//! bucket is chosen separately (global `--profile` flag), so paths never carry
//! an endpoint prefix.

use crate::error::{Error, Result};

/// A parsed remote path pointing to an S3 location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePath {
    /// Bucket name
    pub bucket: String,
    /// Object key (empty for bucket root)
    pub key: String,
    /// Whether the path ends with a slash (directory semantics)
    pub is_dir: bool,
}

impl RemotePath {
    /// Create a new RemotePath
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        let key = key.into();
        let is_dir = key.ends_with('/') || key.is_empty();
        Self {
            bucket: bucket.into(),
            key,
            is_dir,
        }
    }

    /// Path of the bucket root
    pub fn bucket_root(bucket: impl Into<String>) -> Self {
        Self::new(bucket, "")
    }

    /// Last component of the key, without trailing slash
    pub fn file_name(&self) -> Option<&str> {
        self.key
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
    }

    /// Join a child path component
    pub fn join(&self, child: &str) -> Self {
        let base = self.key.trim_end_matches('/');
        let key = if base.is_empty() {
            child.to_string()
        } else {
            format!("{base}/{child}")
        };
        let is_dir = child.ends_with('/');
        Self {
            bucket: self.bucket.clone(),
            key,
            is_dir,
        }
    }

    /// Fail unless the path names a single object
    pub fn require_key(&self) -> Result<&str> {
        if self.key.is_empty() || self.key.ends_with('/') {
            return Err(Error::InvalidPath(format!(
                "'{self}' does not name an object. Expected: bucket/key"
            )));
        }
        Ok(&self.key)
    }
}

impl std::fmt::Display for RemotePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.key.is_empty() {
            write!(f, "{}", self.bucket)
        } else {
            write!(f, "{}/{}", self.bucket, self.key)
        }
    }
}

/// Parse `bucket[/key]` into a RemotePath
///
/// An optional `s3://` scheme is accepted and stripped.
pub fn parse_remote_path(path: &str) -> Result<RemotePath> {
    let path = path.strip_prefix("s3://").unwrap_or(path);

    if path.is_empty() {
        return Err(Error::InvalidPath("Path cannot be empty".into()));
    }

    let (bucket, key) = match path.split_once('/') {
        Some((bucket, key)) => (bucket, key),
        None => (path, ""),
    };

    validate_bucket_name(bucket)?;

    Ok(RemotePath::new(bucket, key))
}

/// Check a bucket name against the S3 naming rules
///
/// 3-63 characters of lowercase letters, digits, dots and hyphens, starting and
/// ending with a letter or digit.
pub fn validate_bucket_name(bucket: &str) -> Result<()> {
    if bucket.is_empty() {
        return Err(Error::InvalidPath("Bucket name cannot be empty".into()));
    }

    if bucket.len() < 3 || bucket.len() > 63 {
        return Err(Error::InvalidPath(format!(
            "Bucket name '{bucket}' must be between 3 and 63 characters"
        )));
    }

    let valid_chars = bucket
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '-');
    let valid_edges = bucket
        .chars()
        .next()
        .zip(bucket.chars().last())
        .is_some_and(|(first, last)| first.is_ascii_alphanumeric() && last.is_ascii_alphanumeric());

    if !valid_chars || !valid_edges {
        return Err(Error::InvalidPath(format!(
            "Bucket name '{bucket}' may only contain lowercase letters, digits, '.' and '-'"
        )));
    }

    Ok(())
}
