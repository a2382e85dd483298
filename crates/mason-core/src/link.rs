//! Symlink tree merging.
//!
//! Every installed package is overlaid onto one shared link root
//! (`mason_packages/.link`): directories are recreated, files and symlinks
//! become symlinks back into the package. Later packages win on conflicts.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::locator::PackageDescriptor;

/// Package metadata file that is never linked.
pub const SENTINEL: &str = "mason.ini";

/// Filesystem failure while merging.
#[derive(Error, Debug)]
pub enum LinkError {
    /// An operation on `path` failed.
    #[error("Failed to link {}: {source}", path.display())]
    Io {
        /// Path being read, removed, or created.
        path: PathBuf,
        /// Underlying IO error; its kind tells not-found from permission issues.
        #[source]
        source: io::Error,
    },
}

impl LinkError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// One package directory to overlay onto the link root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkPair {
    /// Installed package directory.
    pub source: PathBuf,
    /// Link root it is merged into.
    pub dest: PathBuf,
}

/// Pair each package's `dest_dir` with the shared link root, keeping order.
pub fn plan(packages: &[PackageDescriptor], link_root: &Path) -> Vec<LinkPair> {
    packages
        .iter()
        .map(|d| LinkPair {
            source: d.dest_dir().to_path_buf(),
            dest: link_root.to_path_buf(),
        })
        .collect()
}

/// Overlay every pair's source tree onto its destination as symlinks.
///
/// Returns `true` once all pairs are merged.
///
/// # Errors
///
/// Returns the first IO error. A missing source aborts with
/// [`io::ErrorKind::NotFound`]; pairs merged before it stay in place.
pub fn merge(pairs: &[LinkPair]) -> Result<bool, LinkError> {
    for pair in pairs {
        let metadata =
            fs::symlink_metadata(&pair.source).map_err(|e| LinkError::io(&pair.source, e))?;

        if !metadata.is_dir() && !metadata.is_symlink() {
            debug!(source = %pair.source.display(), "not a directory, skipping");
            continue;
        }

        fs::create_dir_all(&pair.dest).map_err(|e| LinkError::io(&pair.dest, e))?;
        overlay(&pair.source, &pair.dest)?;
    }

    Ok(true)
}

fn overlay(source: &Path, dest: &Path) -> Result<(), LinkError> {
    let walker = WalkDir::new(source)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_sentinel(source, entry.path()));

    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(source).to_path_buf();
            LinkError::Io {
                path,
                source: io::Error::from(e),
            }
        })?;

        let Ok(relative) = entry.path().strip_prefix(source) else {
            continue;
        };
        let target = dest.join(relative);

        if entry.file_type().is_dir() {
            // A link left by an earlier package must not be written through.
            if fs::symlink_metadata(&target).is_ok_and(|m| !m.is_dir()) {
                remove_existing(&target)?;
            }
            fs::create_dir_all(&target).map_err(|e| LinkError::io(&target, e))?;
        } else {
            remove_existing(&target)?;
            symlink(entry.path(), &target).map_err(|e| LinkError::io(&target, e))?;
            info!(
                "symlinked {} to {}",
                entry.path().display(),
                target.display()
            );
        }
    }

    Ok(())
}

fn is_sentinel(root: &Path, path: &Path) -> bool {
    path.strip_prefix(root)
        .is_ok_and(|relative| relative.to_string_lossy().contains(SENTINEL))
}

/// Remove whatever sits at `path`, including dangling symlinks.
fn remove_existing(path: &Path) -> Result<(), LinkError> {
    let result = match fs::symlink_metadata(path) {
        Ok(m) if m.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => Err(e),
    };
    result.map_err(|e| LinkError::io(path, e))
}

#[cfg(unix)]
fn symlink(original: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(original, link)
}

#[cfg(not(unix))]
fn symlink(_original: &Path, link: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        format!("symlinks are not supported here: {}", link.display()),
    ))
}
