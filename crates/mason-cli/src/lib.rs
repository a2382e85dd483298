//! mason - prebuilt C/C++ package installer
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
//!
//! Installs the header-only and compiled packages listed in a
//! `mason-versions.ini` manifest into `mason_packages/`, and links them into
//! one shared tree at `mason_packages/.link`.

pub mod cmd;
pub mod ui;

use clap::{Parser, Subcommand};
use mason_core::{PackageKind, PackageSpec};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "mason")]
#[command(author, version, about = "mason - prebuilt C/C++ packages from a manifest")]
pub struct Cli {
    /// Manifest file (defaults to <root>/mason-versions.ini)
    #[arg(long, global = true, env = "MASON_MANIFEST")]
    pub manifest: Option<PathBuf>,

    /// Base URL of the package bucket
    #[arg(long, global = true, env = "MASON_BUCKET")]
    pub bucket: Option<String>,

    /// Project root holding mason_packages/ (defaults to the working directory)
    #[arg(long, global = true, env = "MASON_ROOT")]
    pub root: Option<PathBuf>,

    /// Show debug logs (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Install manifest packages, or add and install the given ones
    Install {
        /// Packages as name=version; all manifest packages when empty
        packages: Vec<PackageSpec>,
        /// Section for packages given on the command line: header or compiled
        #[arg(long = "type", default_value = "header")]
        kind: PackageKind,
    },
    /// Symlink installed packages into mason_packages/.link
    Link {
        /// Packages as name=version; all manifest packages when empty
        packages: Vec<PackageSpec>,
        /// Section for packages given on the command line: header or compiled
        #[arg(long = "type", default_value = "header")]
        kind: PackageKind,
    },
    /// Show the install state of every manifest package
    Status,
}
