//! Crate-level error aggregating every pipeline stage.

use thiserror::Error;

use crate::config::ConfigError;
use crate::install::InstallError;
use crate::io::fetch::FetchError;
use crate::link::LinkError;
use crate::manifest::{ManifestError, ParseError};

/// Any failure surfaced by the install or link pipelines.
///
/// Errors are never retried or aggregated: the first one aborts the batch
/// and is returned as-is.
#[derive(Error, Debug)]
pub enum MasonError {
    /// Malformed manifest text.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Manifest file could not be read, edited, or written.
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// Unsupported host or invalid bucket.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A single package download failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The install batch was aborted.
    #[error(transparent)]
    Install(#[from] InstallError),

    /// The link tree could not be merged.
    #[error(transparent)]
    Link(#[from] LinkError),
}
