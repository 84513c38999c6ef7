//! Error types for pail-core
//!
//! Provides a unified error type that can be converted to appropriate exit codes.
//! Transport failures are kept apart from errors the storage service reported,
//! so callers can tell "could not reach the service" from "the service said no".

use thiserror::Error;

/// Result type alias for pail-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Service error codes that indicate missing credentials or permissions
const AUTH_CODES: &[&str] = &[
    "AccessDenied",
    "InvalidAccessKeyId",
    "SignatureDoesNotMatch",
    "ExpiredToken",
    "InvalidToken",
];

/// Error types for pail-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid path format
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Profile not found
    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// URL parsing error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The transport could not reach the storage service
    #[error("Network unavailable: {0}")]
    NetworkUnavailable(String),

    /// A request did not complete before its deadline
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// The service was reached but rejected the request
    #[error("Service error {code}: {message}")]
    Service { code: String, message: String },

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// The bucket still holds versions or delete markers
    #[error("Bucket is not empty: {0}")]
    BucketNotEmpty(String),

    /// A batch delete call succeeded but some of its targets were rejected
    #[error("{failed} object(s) could not be deleted, first failure: {first}")]
    PartialDelete { failed: usize, first: String },

    /// The operation was interrupted before it finished
    #[error("Interrupted: {0}")]
    Interrupted(String),

    /// Feature not supported by backend
    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(String),

    /// General error
    #[error("{0}")]
    General(String),
}

impl Error {
    /// Build a service error from a code and message
    pub fn service(code: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Service {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Whether the failure happened before the service could answer
    pub const fn is_transport(&self) -> bool {
        matches!(self, Error::NetworkUnavailable(_) | Error::Timeout(_))
    }

    /// Whether the service refused the request for lack of permission
    pub fn is_access_denied(&self) -> bool {
        match self {
            Error::Service { code, .. } => AUTH_CODES.contains(&code.as_str()),
            _ => false,
        }
    }

    /// Get the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidPath(_) | Error::Config(_) => 2, // UsageError
            Error::NetworkUnavailable(_) | Error::Timeout(_) => 3, // NetworkError
            Error::Service { .. } if self.is_access_denied() => 4, // AuthError
            Error::NotFound(_) | Error::ProfileNotFound(_) => 5, // NotFound
            Error::BucketNotEmpty(_) => 6,                 // Conflict
            Error::UnsupportedFeature(_) => 7,             // UnsupportedFeature
            Error::Interrupted(_) => 130,                  // Interrupted
            _ => 1,                                        // GeneralError
        }
    }
}
