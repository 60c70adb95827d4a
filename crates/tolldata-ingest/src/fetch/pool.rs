//! Bounded-concurrency fetch sweep
//!
//! Each URL is fetched and stored independently; one URL exhausting its
//! retries never cancels or delays its siblings. Partial success is the
//! normal terminal state, so the report carries per-URL outcomes rather
//! than a pass/fail verdict.

use super::downloader::ReferenceDownloader;
use super::store::{ArtifactStore, StoredArtifact};
use super::FetchError;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tolldata_common::content_address::artifact_key;
use tracing::{info, warn};

/// Terminal state of one URL in a sweep.
#[derive(Debug)]
pub struct FetchOutcome {
    pub url: String,
    pub result: Result<StoredArtifact, FetchError>,
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Per-URL outcomes of one sweep, in completion order.
#[derive(Debug, Default)]
pub struct FetchReport {
    pub outcomes: Vec<FetchOutcome>,
}

impl FetchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn failures(&self) -> impl Iterator<Item = &FetchOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }
}

/// Runs downloads across a bounded set of concurrent workers.
pub struct FetchPool {
    downloader: Arc<ReferenceDownloader>,
    store: Arc<ArtifactStore>,
    max_workers: usize,
}

impl FetchPool {
    pub fn new(downloader: ReferenceDownloader, store: ArtifactStore, max_workers: usize) -> Self {
        Self {
            downloader: Arc::new(downloader),
            store: Arc::new(store),
            max_workers: max_workers.max(1),
        }
    }

    /// Fetch every URL, writing successful bodies into the store under the
    /// URL's content-address key. Results arrive in completion order.
    pub async fn fetch_all(&self, urls: Vec<String>, cancel: &CancellationToken) -> FetchReport {
        info!(urls = urls.len(), workers = self.max_workers, "starting reference sweep");

        let outcomes = stream::iter(urls.into_iter().map(|url| {
            let downloader = Arc::clone(&self.downloader);
            let store = Arc::clone(&self.store);
            let cancel = cancel.clone();

            async move {
                let result = fetch_one(&downloader, &store, &url, &cancel).await;

                match &result {
                    Ok(artifact) => {
                        info!(url = %url, path = %artifact.path.display(), "stored reference")
                    },
                    Err(e) => warn!(url = %url, error = %e, "reference fetch failed"),
                }

                FetchOutcome { url, result }
            }
        }))
        .buffer_unordered(self.max_workers)
        .collect::<Vec<_>>()
        .await;

        let report = FetchReport { outcomes };
        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            "reference sweep finished"
        );
        report
    }
}

async fn fetch_one(
    downloader: &ReferenceDownloader,
    store: &ArtifactStore,
    url: &str,
    cancel: &CancellationToken,
) -> Result<StoredArtifact, FetchError> {
    let body = downloader.fetch(url, cancel).await?;
    let artifact = store.put(&artifact_key(url), &body).await?;
    Ok(artifact)
}
