//! Maps manifest entries to bucket URLs and local install directories.

use std::path::{Path, PathBuf};

use reqwest::Url;

use crate::config::{Config, ConfigError};
use crate::manifest::PackageSpec;
use crate::platform::Platform;
use crate::types::{PackageKind, PackageName, Version};

/// Bucket prefix shared by all header-only packages.
const HEADERS_PREFIX: &str = "headers";

const ARCHIVE_SUFFIX: &str = ".tar.gz";

/// A fully located package: where it comes from and where it goes.
///
/// Two descriptors with the same kind, platform, name, and version always
/// resolve to the same `dest_dir`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDescriptor {
    name: PackageName,
    version: Version,
    kind: PackageKind,
    platform: Option<Platform>,
    remote_key: String,
    source_url: Url,
    dest_dir: PathBuf,
}

impl PackageDescriptor {
    /// Package name.
    pub fn name(&self) -> &PackageName {
        &self.name
    }

    /// Package version.
    pub fn version(&self) -> &Version {
        &self.version
    }

    /// Manifest section the package came from.
    pub fn kind(&self) -> PackageKind {
        self.kind
    }

    /// Platform of a compiled package; `None` for headers.
    pub fn platform(&self) -> Option<Platform> {
        self.platform
    }

    /// Object path inside the bucket, e.g. `headers/protozero/1.5.1.tar.gz`.
    pub fn remote_key(&self) -> &str {
        &self.remote_key
    }

    /// Absolute archive URL.
    pub fn source_url(&self) -> &Url {
        &self.source_url
    }

    /// Extraction target under `mason_packages/`.
    pub fn dest_dir(&self) -> &Path {
        &self.dest_dir
    }
}

/// Resolves [`PackageSpec`]s against a [`Config`].
#[derive(Debug, Clone, Copy)]
pub struct Locator<'a> {
    config: &'a Config,
}

impl<'a> Locator<'a> {
    /// Create a locator bound to the given configuration.
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Locate one package.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnsupportedPlatform`] for a compiled package on
    /// an unsupported host, or [`ConfigError::InvalidBucketUrl`] if the key
    /// cannot be joined onto the bucket URL.
    pub fn locate(
        &self,
        spec: &PackageSpec,
        kind: PackageKind,
    ) -> Result<PackageDescriptor, ConfigError> {
        let platform = match kind {
            PackageKind::Header => None,
            PackageKind::Compiled => Some(self.config.platform()?),
        };
        let prefix = platform.map_or(HEADERS_PREFIX, Platform::as_str);

        let remote_key = strip_whitespace(&format!(
            "{prefix}/{}/{}{ARCHIVE_SUFFIX}",
            spec.name, spec.version
        ));

        let source_url =
            self.config
                .bucket()
                .join(&remote_key)
                .map_err(|e| ConfigError::InvalidBucketUrl {
                    url: format!("{}{remote_key}", self.config.bucket()),
                    reason: e.to_string(),
                })?;

        let local_key = remote_key
            .strip_suffix(ARCHIVE_SUFFIX)
            .unwrap_or(&remote_key);
        let dest_dir = self.config.packages_dir().join(local_key);

        Ok(PackageDescriptor {
            name: spec.name.clone(),
            version: spec.version.clone(),
            kind,
            platform,
            remote_key,
            source_url,
            dest_dir,
        })
    }
}

fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}
