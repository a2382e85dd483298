//! Package download with pipelined extraction.
//!
//! The response body is pumped chunk by chunk into a channel feeding a
//! spawned extractor task, so the archive is unpacked while it downloads and
//! never touches disk as a whole.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::io::StreamReader;
use tracing::{info, warn};

use crate::Reporter;
use crate::io::extract;
use crate::locator::PackageDescriptor;

/// Why a single package could not be fetched.
///
/// All variants are terminal for that package only; whether the batch stops
/// is up to the installer.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The request could not be sent, or the body broke off after extraction
    /// had started.
    #[error("Request to {url} failed: {source}")]
    Transport {
        /// Archive URL.
        url: String,
        /// Underlying HTTP error.
        #[source]
        source: reqwest::Error,
    },

    /// The bucket answered with something other than 200.
    #[error("{code} status code downloading tarball {url}")]
    BadStatus {
        /// Archive URL.
        url: String,
        /// HTTP status code.
        code: u16,
    },

    /// The stream ended before a single entry was extracted.
    #[error("Connection closed while downloading tarball file {url}")]
    PrematureClose {
        /// Archive URL.
        url: String,
    },

    /// The archive was read to the end but held no entries.
    #[error("There was a fatal problem while downloading/extracting the tarball {url}")]
    EmptyArchive {
        /// Archive URL.
        url: String,
    },

    /// The archive could not be decoded or written to disk.
    #[error("Failed to extract {url}: {source}")]
    Extract {
        /// Archive URL.
        url: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// What a successful fetch produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchReceipt {
    /// Archive entries written to the destination.
    pub entries: usize,
    /// Compressed bytes received.
    pub bytes: u64,
}

/// Downloads a package archive into its destination directory.
#[async_trait]
pub trait PackageFetcher: Send + Sync {
    /// Fetch and extract one package into `descriptor.dest_dir()`.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] describing the first failure; entries written
    /// before it stay on disk.
    async fn fetch(&self, descriptor: &PackageDescriptor) -> Result<FetchReceipt, FetchError>;
}

/// Per-fetch resolution state.
///
/// Body errors, extractor failures, and extractor completion can all report
/// an outcome; only the first transition out of `Pending` counts.
#[derive(Debug)]
enum FetchState {
    Pending,
    Failed(FetchError),
    Succeeded(FetchReceipt),
}

#[derive(Debug)]
struct Completion {
    state: FetchState,
}

impl Completion {
    fn new() -> Self {
        Self {
            state: FetchState::Pending,
        }
    }

    fn is_pending(&self) -> bool {
        matches!(self.state, FetchState::Pending)
    }

    /// Returns whether this failure was the one recorded.
    fn fail(&mut self, error: FetchError) -> bool {
        if self.is_pending() {
            self.state = FetchState::Failed(error);
            true
        } else {
            false
        }
    }

    /// Returns whether this success was the one recorded.
    fn succeed(&mut self, receipt: FetchReceipt) -> bool {
        if self.is_pending() {
            self.state = FetchState::Succeeded(receipt);
            true
        } else {
            false
        }
    }

    fn finish(self, url: &str) -> Result<FetchReceipt, FetchError> {
        match self.state {
            FetchState::Succeeded(receipt) => Ok(receipt),
            FetchState::Failed(error) => Err(error),
            FetchState::Pending => Err(FetchError::PrematureClose {
                url: url.to_string(),
            }),
        }
    }
}

/// [`PackageFetcher`] backed by plain HTTP GETs against the bucket.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    reporter: Arc<dyn Reporter>,
}

impl std::fmt::Debug for HttpFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpFetcher").finish_non_exhaustive()
    }
}

impl HttpFetcher {
    /// Create a fetcher using the given client and progress reporter.
    pub fn new(client: Client, reporter: Arc<dyn Reporter>) -> Self {
        Self { client, reporter }
    }
}

#[async_trait]
impl PackageFetcher for HttpFetcher {
    async fn fetch(&self, descriptor: &PackageDescriptor) -> Result<FetchReceipt, FetchError> {
        let url = descriptor.source_url().as_str().to_string();
        let name = descriptor.name();
        let version = descriptor.version();
        let mut completion = Completion::new();

        let response = match self
            .client
            .get(descriptor.source_url().clone())
            .header(reqwest::header::USER_AGENT, crate::USER_AGENT)
            .send()
            .await
        {
            Ok(response) => response,
            Err(source) => {
                completion.fail(FetchError::Transport { url: url.clone(), source });
                return completion.finish(&url);
            }
        };

        if response.status() != StatusCode::OK {
            completion.fail(FetchError::BadStatus {
                url: url.clone(),
                code: response.status().as_u16(),
            });
            return completion.finish(&url);
        }

        let total_size = response.content_length();
        self.reporter.downloading(name, version, 0, total_size);

        // Channel for pipelined extraction
        let (tx, rx) = tokio::sync::mpsc::channel::<Result<Bytes, io::Error>>(32);
        let reader = StreamReader::new(ReceiverStream::new(rx));
        let written = Arc::new(AtomicUsize::new(0));

        let dest = descriptor.dest_dir().to_path_buf();
        let extractor_written = Arc::clone(&written);
        let extractor = tokio::spawn(async move {
            extract::unpack_stripped(reader, &dest, extractor_written).await
        });

        let mut stream = response.bytes_stream();
        let mut downloaded: u64 = 0;

        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(chunk) => {
                    downloaded += chunk.len() as u64;
                    self.reporter
                        .downloading(name, version, downloaded, total_size);
                    if tx.send(Ok(chunk)).await.is_err() {
                        // Extractor stopped early; its own result decides.
                        break;
                    }
                }
                Err(source) => {
                    let error = if written.load(Ordering::SeqCst) == 0 {
                        warn!(url = %url, error = %source, "body closed before any entry");
                        FetchError::PrematureClose { url: url.clone() }
                    } else {
                        FetchError::Transport {
                            url: url.clone(),
                            source,
                        }
                    };
                    completion.fail(error);
                    let _ = tx
                        .send(Err(io::Error::new(
                            io::ErrorKind::UnexpectedEof,
                            "download interrupted",
                        )))
                        .await;
                    break;
                }
            }
        }
        drop(tx);

        match extractor.await {
            Ok(Ok(0)) => {
                completion.fail(FetchError::EmptyArchive { url: url.clone() });
            }
            Ok(Ok(entries)) => {
                if completion.succeed(FetchReceipt {
                    entries,
                    bytes: downloaded,
                }) {
                    self.reporter.extracting(name, version, entries);
                    info!("done parsing tarball for {name}");
                }
            }
            Ok(Err(source)) => {
                let error = if written.load(Ordering::SeqCst) == 0
                    && source.kind() == io::ErrorKind::UnexpectedEof
                {
                    FetchError::PrematureClose { url: url.clone() }
                } else {
                    FetchError::Extract {
                        url: url.clone(),
                        source,
                    }
                };
                completion.fail(error);
            }
            Err(join_error) => {
                completion.fail(FetchError::Extract {
                    url: url.clone(),
                    source: io::Error::other(join_error),
                });
            }
        }

        completion.finish(&url)
    }
}
