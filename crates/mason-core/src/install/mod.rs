//! Install orchestration.
//!
//! Every descriptor is checked against the filesystem first, in manifest
//! order. Only packages that are not installed yet are queued for fetching,
//! and the queue is drained through a bounded stream that stops at the first
//! failure.

pub mod state;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use futures::{StreamExt, TryStreamExt, stream};
use thiserror::Error;
use tracing::warn;

use crate::Reporter;
use crate::io::fetch::{FetchError, FetchReceipt, PackageFetcher};
use crate::locator::PackageDescriptor;

/// Fetches in flight at once unless raised with [`Installer::with_concurrency`].
pub const DEFAULT_FETCH_CONCURRENCY: usize = 1;

/// Why an install batch was aborted.
#[derive(Error, Debug)]
pub enum InstallError {
    /// The destination directory could not be inspected or created.
    #[error("Failed to prepare {}: {source}", path.display())]
    State {
        /// Package destination directory.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A package download failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// Outcome of a successful batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstallSummary {
    /// Packages downloaded and extracted during this run.
    pub fetched: usize,
    /// Packages whose destination was already populated.
    pub already_installed: usize,
}

/// Drives a batch of descriptors to an installed state.
pub struct Installer<F: PackageFetcher> {
    fetcher: F,
    reporter: Arc<dyn Reporter>,
    concurrency: usize,
}

impl<F: PackageFetcher> std::fmt::Debug for Installer<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Installer")
            .field("concurrency", &self.concurrency)
            .finish_non_exhaustive()
    }
}

impl<F: PackageFetcher> Installer<F> {
    /// Create an installer fetching one package at a time.
    pub fn new(fetcher: F, reporter: Arc<dyn Reporter>) -> Self {
        Self {
            fetcher,
            reporter,
            concurrency: DEFAULT_FETCH_CONCURRENCY,
        }
    }

    /// Allow up to `n` fetches in flight. Zero is treated as one.
    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    /// Install every descriptor that is not installed yet.
    ///
    /// # Errors
    ///
    /// Returns the first state-check or fetch error. Fetches queued after a
    /// failure are never started; packages already extracted stay on disk.
    pub async fn install_all(
        &self,
        packages: &[PackageDescriptor],
    ) -> Result<InstallSummary, InstallError> {
        let start_time = Instant::now();
        let reporter = &self.reporter;
        let fetcher = &self.fetcher;

        let mut already_installed = 0;
        let mut queue = Vec::new();
        for descriptor in packages {
            let installed = state::check(descriptor).map_err(|source| InstallError::State {
                path: descriptor.dest_dir().to_path_buf(),
                source,
            })?;

            if installed {
                reporter.done(descriptor.name(), descriptor.version(), "already installed");
                already_installed += 1;
            } else {
                queue.push(descriptor);
            }
        }

        if !queue.is_empty() {
            reporter.section("Installing");
        }

        let receipts: Vec<FetchReceipt> = stream::iter(queue)
            .map(move |descriptor| async move {
                match fetcher.fetch(descriptor).await {
                    Ok(receipt) => {
                        reporter.done(descriptor.name(), descriptor.version(), "installed");
                        Ok(receipt)
                    }
                    Err(e) => {
                        warn!(package = %descriptor.name(), error = %e, "fetch failed");
                        reporter.failed(descriptor.name(), descriptor.version(), &e.to_string());
                        Err(InstallError::from(e))
                    }
                }
            })
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        let summary = InstallSummary {
            fetched: receipts.len(),
            already_installed,
        };

        if summary.fetched > 0 {
            reporter.summary(summary.fetched, "install", start_time.elapsed().as_secs_f64());
        } else if summary.already_installed > 0 {
            reporter.summary(summary.already_installed, "already installed", 0.0);
        }

        Ok(summary)
    }
}
