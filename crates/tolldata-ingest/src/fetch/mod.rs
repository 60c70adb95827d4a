//! Bulk retrieval of reference documents
//!
//! [`downloader`] fetches one URL with bounded retry/backoff, [`store`]
//! persists bodies under content-addressed keys, and [`pool`] runs many
//! downloads under a bounded worker budget.

pub mod downloader;
pub mod pool;
pub mod store;

pub use downloader::{BackoffSchedule, ReferenceDownloader};
pub use pool::{FetchOutcome, FetchPool, FetchReport};
pub use store::{ArtifactStore, StoredArtifact};

use thiserror::Error;

/// Failures of a single reference fetch.
///
/// Everything here is contained inside the sweep: the pool records the
/// error per URL and moves on.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{url} returned {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("{url} responded without a content type")]
    MissingContentType { url: String },

    #[error("giving up on {url} after {attempts} attempts: {last_error}")]
    Exhausted {
        url: String,
        attempts: u32,
        last_error: String,
    },

    #[error("fetch cancelled")]
    Cancelled,

    #[error("artifact store: {0}")]
    Store(#[from] tolldata_common::TollDataError),

    #[error("fetch configuration error: {0}")]
    Config(String),
}
