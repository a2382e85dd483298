//! mason - prebuilt C/C++ package installer
//!
//! Reads a `mason-versions.ini` manifest, fetches the listed packages as
//! tarballs from the mason binaries bucket, extracts them under
//! `mason_packages/`, and overlays every installed package into a single
//! symlink tree for build systems to consume.
//!
//! # Directory Layout
//!
//! ```text
//! <root>/
//! ├── mason-versions.ini
//! └── mason_packages/
//!     ├── headers/<name>/<version>/        # header-only packages
//!     ├── <platform>/<name>/<version>/     # compiled packages
//!     └── .link/                           # merged symlink tree
//! ```

pub mod config;
pub mod error;
pub mod install;
pub mod io;
pub mod link;
pub mod locator;
pub mod manifest;
pub mod platform;
pub mod reporter;
pub mod types;

pub use config::{Config, ConfigError};
pub use error::MasonError;
pub use install::{InstallError, InstallSummary, Installer};
pub use io::fetch::{FetchError, HttpFetcher, PackageFetcher};
pub use link::{LinkError, LinkPair};
pub use locator::{Locator, PackageDescriptor};
pub use manifest::{Manifest, ManifestError, PackageSpec, ParseError};
pub use platform::Platform;
pub use reporter::{NullReporter, Reporter};
pub use types::{PackageKind, PackageName, Version};

/// User Agent string for bucket requests
pub const USER_AGENT: &str = concat!("mason/", env!("CARGO_PKG_VERSION"));
