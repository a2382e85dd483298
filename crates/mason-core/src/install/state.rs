//! On-disk install state of a single package.
//!
//! There is no install database: a package counts as installed when its
//! destination directory exists and is non-empty. An empty directory is the
//! leftover of an aborted download and is retried.

use std::fs;
use std::io;
use std::path::Path;

use tracing::info;

use crate::locator::PackageDescriptor;

/// Derived state of a package destination directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallationState {
    /// Nothing at the destination.
    Absent,
    /// Directory exists but holds no entries.
    EmptyStub,
    /// Directory exists and holds at least one entry.
    Complete,
}

impl InstallationState {
    /// Whether the package needs no fetch.
    pub fn is_complete(self) -> bool {
        self == Self::Complete
    }

    /// Lowercase label for display.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Absent => "absent",
            Self::EmptyStub => "empty",
            Self::Complete => "installed",
        }
    }
}

impl std::fmt::Display for InstallationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inspect a destination directory without modifying it.
///
/// A non-directory at the path counts as [`InstallationState::Complete`]:
/// only emptiness is checked, never content.
///
/// # Errors
///
/// Returns any IO error other than "not found".
pub fn inspect(dest_dir: &Path) -> io::Result<InstallationState> {
    let metadata = match fs::metadata(dest_dir) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(InstallationState::Absent),
        Err(e) => return Err(e),
    };

    if !metadata.is_dir() {
        return Ok(InstallationState::Complete);
    }

    if fs::read_dir(dest_dir)?.next().is_some() {
        Ok(InstallationState::Complete)
    } else {
        Ok(InstallationState::EmptyStub)
    }
}

/// Check whether a package is already installed, preparing its directory if not.
///
/// A missing destination is created (with parents) so the fetch can extract
/// into it; an empty one is reused as is.
///
/// # Errors
///
/// Returns an IO error if the directory cannot be inspected or created.
pub fn check(descriptor: &PackageDescriptor) -> io::Result<bool> {
    let dest = descriptor.dest_dir();
    match inspect(dest)? {
        InstallationState::Complete => {
            info!(
                dest = %dest.display(),
                "Success: {} already installed",
                descriptor.name()
            );
            Ok(true)
        }
        InstallationState::EmptyStub => Ok(false),
        InstallationState::Absent => {
            info!("checked for {} (not found locally)", descriptor.name());
            fs::create_dir_all(dest)?;
            Ok(false)
        }
    }
}
