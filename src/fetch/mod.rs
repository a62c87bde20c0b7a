//! Remote page retrieval.
//!
//! - [`candidates`]: ordered fallback locations for a key
//! - [`http`]: HTTP fetcher that walks the candidates and classifies failures
//!
//! Failures are split in two. A *skippable* failure (transport error, 4xx/5xx
//! status) says nothing about the other candidates, so the next one is tried.
//! A *fatal* failure aborts the whole fetch: the response was hostile (too
//! large) or the caller's sink already holds partial content.

pub mod candidates;
pub mod http;

use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;
use tokio::io::AsyncWrite;
use url::Url;

use crate::cache::key::Key;

pub use self::candidates::{build_candidates, candidate_paths, DEFAULT_SERVER, FALLBACK_LANG};
pub use self::http::{FetchStats, HttpFetcher};

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("fetch: invalid candidate URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("fetch: failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("fetch: no candidate locations for {0}")]
    NoCandidates(Key),

    #[error("fetch: {url}: {source}")]
    Transport {
        url: Url,
        #[source]
        source: reqwest::Error,
    },

    #[error("http: {url}: {status}")]
    Status { url: Url, status: StatusCode },

    #[error("fetch: abandoned read of {url}: body too large (limit {limit} bytes)")]
    TooLarge { url: Url, limit: u64 },

    #[error("fetch: {url}: body read failed after {written} bytes: {source}")]
    Interrupted {
        url: Url,
        written: u64,
        #[source]
        source: reqwest::Error,
    },

    #[error("fetch: {url}: writing page: {source}")]
    Sink {
        url: Url,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    /// Whether the remote source explicitly reported the page as absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::Status { status, .. } if *status == StatusCode::NOT_FOUND)
    }

    /// Whether this failure must abort the fetch rather than move on to the
    /// next candidate.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            FetchError::TooLarge { .. } | FetchError::Interrupted { .. } | FetchError::Sink { .. }
        )
    }
}

/// Result of trying a single candidate.
#[derive(Debug)]
pub enum FetchOutcome {
    /// The page was copied into the sink.
    Fetched { written: u64 },

    /// This candidate failed; the sink is untouched and the next one may be tried.
    Skipped(FetchError),

    /// The whole fetch must stop.
    Fatal(FetchError),
}

/// Anything that can produce the bytes of a page for a key.
#[async_trait]
pub trait Source: Send + Sync {
    /// Copy the page for `key` into `sink`, returning the number of bytes written.
    async fn fetch(
        &self,
        key: &Key,
        sink: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<u64, FetchError>;
}
