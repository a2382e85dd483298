//! Process-wide configuration.
//!
//! The host platform, working directory, and bucket are read once at startup
//! and passed explicitly to everything that derives paths or URLs.

use std::path::PathBuf;

use reqwest::Url;
use thiserror::Error;

use crate::platform::Platform;

/// Public bucket holding the prebuilt mason archives.
pub const DEFAULT_BUCKET: &str = "https://s3.amazonaws.com/mason-binaries/";

/// Directory (under the root) that holds extracted packages.
pub const PACKAGES_DIR: &str = "mason_packages";

/// Directory (under [`PACKAGES_DIR`]) holding the merged symlink tree.
pub const LINK_DIR: &str = ".link";

/// Default manifest file name.
pub const MANIFEST_FILE: &str = "mason-versions.ini";

/// Errors raised while building or consulting the configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The host OS has no prebuilt binaries.
    #[error("{0} is not a platform option supported by mason")]
    UnsupportedPlatform(String),

    /// The bucket base, or a URL derived from it, could not be parsed.
    #[error("Invalid bucket URL '{url}': {reason}")]
    InvalidBucketUrl {
        /// The offending URL text.
        url: String,
        /// Parser message.
        reason: String,
    },

    /// The working directory could not be determined.
    #[error("Could not determine working directory: {0}")]
    WorkingDirectory(#[source] std::io::Error),
}

/// Immutable configuration threaded into the locator and link planner.
#[derive(Debug, Clone)]
pub struct Config {
    bucket: Url,
    root: PathBuf,
    os: String,
    platform: Option<Platform>,
}

impl Config {
    /// Build a configuration for the running host.
    ///
    /// An unsupported host is not an error here; it only surfaces once a
    /// compiled package has to be located.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBucketUrl`] if `bucket` is not a valid
    /// absolute URL.
    pub fn new(bucket: &str, root: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        Self::for_host(bucket, root, std::env::consts::OS)
    }

    /// Build a configuration as if running on the named OS
    /// (`std::env::consts::OS` spelling).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBucketUrl`] if `bucket` is not a valid
    /// absolute URL.
    pub fn for_host(
        bucket: &str,
        root: impl Into<PathBuf>,
        os: &str,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            bucket: parse_bucket(bucket)?,
            root: root.into(),
            os: os.to_string(),
            platform: Platform::from_os(os).ok(),
        })
    }

    /// Load the configuration from the environment.
    ///
    /// Uses the current working directory as root and `MASON_BUCKET` (if set)
    /// in place of [`DEFAULT_BUCKET`].
    ///
    /// # Errors
    ///
    /// Returns an error if the working directory is unavailable or the
    /// bucket URL is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let root = std::env::current_dir().map_err(ConfigError::WorkingDirectory)?;
        let bucket =
            std::env::var("MASON_BUCKET").unwrap_or_else(|_| DEFAULT_BUCKET.to_string());
        Self::new(&bucket, root)
    }

    /// Pin the platform instead of detecting it from the host.
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self.os = platform.as_str().to_string();
        self
    }

    /// Base URL of the bucket, always ending in `/`.
    pub fn bucket(&self) -> &Url {
        &self.bucket
    }

    /// Local package cache: `<root>/mason_packages`.
    pub fn packages_dir(&self) -> PathBuf {
        self.root.join(PACKAGES_DIR)
    }

    /// Shared symlink tree: `<root>/mason_packages/.link`.
    pub fn link_root(&self) -> PathBuf {
        self.packages_dir().join(LINK_DIR)
    }

    /// Default manifest location: `<root>/mason-versions.ini`.
    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    /// Host platform for compiled packages.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnsupportedPlatform`] when the host OS has no
    /// prebuilt binaries.
    pub fn platform(&self) -> Result<Platform, ConfigError> {
        self.platform
            .ok_or_else(|| ConfigError::UnsupportedPlatform(self.os.clone()))
    }
}

fn parse_bucket(bucket: &str) -> Result<Url, ConfigError> {
    // Url::join drops the last path segment unless the base ends in '/'
    let normalized = if bucket.ends_with('/') {
        bucket.to_string()
    } else {
        format!("{bucket}/")
    };
    Url::parse(&normalized).map_err(|e| ConfigError::InvalidBucketUrl {
        url: bucket.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_gets_trailing_slash() {
        let config = Config::new("http://127.0.0.1:9000/bucket", "/work").unwrap();
        assert_eq!(config.bucket().as_str(), "http://127.0.0.1:9000/bucket/");
    }

    #[test]
    fn invalid_bucket_is_rejected() {
        let err = Config::new("not a url", "/work").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBucketUrl { .. }));
    }

    #[test]
    fn derived_paths() {
        let config = Config::new(DEFAULT_BUCKET, "/work").unwrap();
        assert_eq!(config.packages_dir(), PathBuf::from("/work/mason_packages"));
        assert_eq!(config.link_root(), PathBuf::from("/work/mason_packages/.link"));
        assert_eq!(config.manifest_path(), PathBuf::from("/work/mason-versions.ini"));
    }

    #[test]
    fn pinned_platform_wins() {
        let config = Config::new(DEFAULT_BUCKET, "/work")
            .unwrap()
            .with_platform(Platform::Osx);
        assert_eq!(config.platform().unwrap(), Platform::Osx);
    }
}
