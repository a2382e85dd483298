//! Command implementations and their shared context.

pub mod install;
pub mod link;
pub mod status;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use mason_core::config::DEFAULT_BUCKET;
use mason_core::{Config, Locator, Manifest, PackageDescriptor, PackageKind, PackageSpec, Reporter};

use crate::Cli;
use crate::ui::ConsoleReporter;

/// State every command needs, resolved once from flags and environment.
#[derive(Clone)]
pub struct Context {
    pub config: Config,
    pub manifest_path: PathBuf,
    pub client: reqwest::Client,
    pub reporter: Arc<dyn Reporter>,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("config", &self.config)
            .field("manifest_path", &self.manifest_path)
            .finish_non_exhaustive()
    }
}

impl Context {
    pub fn new(cli: &Cli) -> Result<Self> {
        let config = match (&cli.root, &cli.bucket) {
            (None, None) => Config::from_env()?,
            (root, bucket) => {
                let root = match root {
                    Some(root) => root.clone(),
                    None => std::env::current_dir().context("Failed to read working directory")?,
                };
                Config::new(bucket.as_deref().unwrap_or(DEFAULT_BUCKET), root)?
            }
        };

        let manifest_path = cli
            .manifest
            .clone()
            .unwrap_or_else(|| config.manifest_path());

        let client = reqwest::Client::builder()
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            config,
            manifest_path,
            client,
            reporter: Arc::new(ConsoleReporter::new()),
        })
    }

    pub fn locator(&self) -> Locator<'_> {
        Locator::new(&self.config)
    }

    pub async fn load_manifest(&self) -> Result<Manifest> {
        Manifest::load(&self.manifest_path)
            .await
            .with_context(|| format!("Failed to load manifest {}", self.manifest_path.display()))
    }

    /// Descriptors for every manifest package, in declaration order.
    pub async fn manifest_descriptors(&self) -> Result<Vec<PackageDescriptor>> {
        let manifest = self.load_manifest().await?;
        Ok(manifest.descriptors(&self.locator())?)
    }

    /// Descriptors for explicit specs, or for the whole manifest when none are given.
    pub async fn descriptors(
        &self,
        packages: &[PackageSpec],
        kind: PackageKind,
    ) -> Result<Vec<PackageDescriptor>> {
        if packages.is_empty() {
            return self.manifest_descriptors().await;
        }

        let locator = self.locator();
        let descriptors = packages
            .iter()
            .map(|spec| locator.locate(spec, kind))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(descriptors)
    }
}
