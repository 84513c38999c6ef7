//! Profile management
//!
//! A profile names the region, endpoint and credentials used to talk to the
//! storage service. Profiles without inline keys take their credentials from
//! the AWS shared configuration files (`~/.aws/credentials`, `~/.aws/config`).

use serde::{Deserialize, Serialize};

use crate::config::ConfigManager;
use crate::error::{Error, Result};

/// Region used when neither the profile nor the AWS shared configuration sets one
pub const DEFAULT_REGION: &str = "us-east-1";

/// Timeout configuration for a profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Connection timeout in milliseconds
    #[serde(default = "default_connect_timeout")]
    pub connect_ms: u64,

    /// Read timeout in milliseconds
    #[serde(default = "default_read_timeout")]
    pub read_ms: u64,

    /// Deadline for a whole operation, retries included.
    /// Unset leaves the SDK default (no deadline).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_ms: Option<u64>,
}

fn default_connect_timeout() -> u64 {
    5000
}

fn default_read_timeout() -> u64 {
    30000
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_ms: default_connect_timeout(),
            read_ms: default_read_timeout(),
            operation_ms: None,
        }
    }
}

/// A named set of connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Unique name for this profile
    pub name: String,

    /// AWS region; unset reads it from the shared AWS profile
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// S3 endpoint URL; the SDK resolves the regional endpoint when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Access key ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_key: Option<String>,

    /// Secret access key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,

    /// Shared AWS profile to read credentials from when no keys are set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws_profile: Option<String>,

    /// Use path-style bucket addressing
    #[serde(default)]
    pub path_style: bool,

    /// Timeout configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<TimeoutConfig>,
}

impl Profile {
    /// Create a profile that relies on the shared AWS profile of the same name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            region: None,
            endpoint: None,
            access_key: None,
            secret_key: None,
            aws_profile: None,
            path_style: false,
            timeout: None,
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_keys(mut self, access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        self.access_key = Some(access_key.into());
        self.secret_key = Some(secret_key.into());
        self
    }

    /// Endpoint URL used for requests
    ///
    /// Without an explicit endpoint this is the regional AWS endpoint, known
    /// only once a region is set.
    pub fn endpoint_url(&self) -> Option<String> {
        match (&self.endpoint, &self.region) {
            (Some(endpoint), _) => Some(endpoint.clone()),
            (None, Some(region)) => Some(format!("https://s3.{region}.amazonaws.com")),
            (None, None) => None,
        }
    }

    /// Static credentials, if both keys are configured
    pub fn static_keys(&self) -> Option<(&str, &str)> {
        match (&self.access_key, &self.secret_key) {
            (Some(access), Some(secret)) => Some((access.as_str(), secret.as_str())),
            _ => None,
        }
    }

    /// Name of the shared AWS profile holding this profile's credentials
    pub fn shared_profile_name(&self) -> &str {
        self.aws_profile.as_deref().unwrap_or(&self.name)
    }

    /// Get the effective timeout configuration
    pub fn timeout_config(&self) -> TimeoutConfig {
        self.timeout.clone().unwrap_or_default()
    }
}

/// Manager for profile operations
pub struct ProfileManager {
    config_manager: ConfigManager,
}

impl ProfileManager {
    /// Create a new ProfileManager with a specific ConfigManager
    pub fn with_config_manager(config_manager: ConfigManager) -> Self {
        Self { config_manager }
    }

    /// Create a new ProfileManager using the default config location
    pub fn new() -> Result<Self> {
        let config_manager = ConfigManager::new()?;
        Ok(Self { config_manager })
    }

    /// List all configured profiles
    pub fn list(&self) -> Result<Vec<Profile>> {
        let config = self.config_manager.load()?;
        Ok(config.profiles)
    }

    /// Get a configured profile by name
    pub fn get(&self, name: &str) -> Result<Profile> {
        let config = self.config_manager.load()?;
        config
            .profiles
            .into_iter()
            .find(|p| p.name == name)
            .ok_or_else(|| Error::ProfileNotFound(name.to_string()))
    }

    /// Resolve the profile to use for a command
    ///
    /// An explicit name wins over the configured default. A name that is not
    /// configured falls back to the shared AWS profile of that name.
    pub fn resolve(&self, name: Option<&str>) -> Result<Profile> {
        let config = self.config_manager.load()?;
        let name = name.unwrap_or(&config.defaults.profile).to_string();

        match config.profiles.into_iter().find(|p| p.name == name) {
            Some(profile) => Ok(profile),
            None => {
                tracing::debug!(profile = %name, "profile not configured, using shared AWS credentials");
                Ok(Profile::new(name))
            }
        }
    }

    /// Add or update a profile
    pub fn set(&self, profile: Profile) -> Result<()> {
        let mut config = self.config_manager.load()?;

        config.profiles.retain(|p| p.name != profile.name);
        config.profiles.push(profile);

        self.config_manager.save(&config)
    }

    /// Remove a profile
    pub fn remove(&self, name: &str) -> Result<()> {
        let mut config = self.config_manager.load()?;
        let original_len = config.profiles.len();

        config.profiles.retain(|p| p.name != name);

        if config.profiles.len() == original_len {
            return Err(Error::ProfileNotFound(name.to_string()));
        }

        self.config_manager.save(&config)
    }

    /// Check if a profile is configured
    pub fn exists(&self, name: &str) -> Result<bool> {
        let config = self.config_manager.load()?;
        Ok(config.profiles.iter().any(|p| p.name == name))
    }

    /// Presigned link lifetime configured in `[defaults]`
    pub fn presign_expiry_secs(&self) -> Result<u64> {
        Ok(self.config_manager.load()?.defaults.presign_expiry_secs)
    }
}
