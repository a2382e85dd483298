//! Host platform identification.
//!
//! Compiled packages live under a platform directory in the bucket. Only two
//! host families have prebuilt binaries, so anything else is rejected as soon
//! as a compiled package needs locating.

use crate::config::ConfigError;

/// Platform directory of a compiled package.
///
/// # Example
///
/// ```
/// use mason_core::Platform;
///
/// let linux = Platform::from_os("linux").unwrap();
/// assert_eq!(linux.as_str(), "linux-x86_64");
/// assert!(Platform::from_os("windows").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    /// macOS hosts.
    Osx,
    /// Linux hosts.
    Linux,
}

impl Platform {
    /// Map an operating system name (as in `std::env::consts::OS`) to a platform.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnsupportedPlatform`] for any OS other than
    /// `macos` or `linux`.
    pub fn from_os(os: &str) -> Result<Self, ConfigError> {
        match os {
            "macos" => Ok(Self::Osx),
            "linux" => Ok(Self::Linux),
            other => Err(ConfigError::UnsupportedPlatform(other.to_string())),
        }
    }

    /// Bucket directory name for this platform.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Osx => "osx-x86_64",
            Self::Linux => "linux-x86_64",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supported_hosts() {
        assert_eq!(Platform::from_os("macos").unwrap(), Platform::Osx);
        assert_eq!(Platform::from_os("linux").unwrap(), Platform::Linux);
        assert_eq!(Platform::Osx.to_string(), "osx-x86_64");
    }

    #[test]
    fn unsupported_host_is_rejected() {
        let err = Platform::from_os("freebsd").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedPlatform(ref os) if os == "freebsd"));
    }
}
