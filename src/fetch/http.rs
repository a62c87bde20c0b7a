//! HTTP fetcher.
//!
//! Tries the candidate URLs of a key strictly in order, one bounded request
//! per candidate, and streams the first successful body into the caller's
//! sink.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};
use url::Url;

use crate::cache::key::Key;
use crate::config::FetchConfig;
use crate::fetch::candidates::build_candidates;
use crate::fetch::{FetchError, FetchOutcome, Source};

/// Counters across all fetches made by one fetcher.
#[derive(Debug, Default)]
pub struct FetchStats {
    pub attempts: AtomicU64,
    pub skipped: AtomicU64,
    pub fetched: AtomicU64,
    pub bytes_fetched: AtomicU64,
}

impl FetchStats {
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    pub fn fetched(&self) -> u64 {
        self.fetched.load(Ordering::Relaxed)
    }

    pub fn bytes_fetched(&self) -> u64 {
        self.bytes_fetched.load(Ordering::Relaxed)
    }
}

/// Fetches pages from the manpage server.
pub struct HttpFetcher {
    client: reqwest::Client,
    server: String,
    fallback_lang: String,
    body_limit: u64,
    stats: FetchStats,
}

impl HttpFetcher {
    /// Create a fetcher whose requests are each bounded by the configured timeout.
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .user_agent(concat!("dman/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self {
            client,
            server: config.server.clone(),
            fallback_lang: config.fallback_lang.clone(),
            body_limit: config.body_limit_bytes,
            stats: FetchStats::default(),
        })
    }

    /// Candidate URLs for `key`, in the order they are tried.
    pub fn candidates(&self, key: &Key) -> Result<Vec<Url>, FetchError> {
        build_candidates(&self.server, key, &self.fallback_lang)
    }

    pub fn stats(&self) -> &FetchStats {
        &self.stats
    }

    /// Try a single candidate.
    ///
    /// Nothing is written to `sink` unless the response status is a success.
    /// From the first written byte on, every failure is fatal.
    pub async fn fetch_one<W>(&self, url: &Url, sink: &mut W) -> FetchOutcome
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        self.stats.attempts.fetch_add(1, Ordering::Relaxed);

        let mut response = match self.client.get(url.clone()).send().await {
            Ok(response) => response,
            Err(source) => {
                return FetchOutcome::Skipped(FetchError::Transport {
                    url: url.clone(),
                    source,
                })
            }
        };

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            // Drain the error body so the connection can be reused.
            let mut drained = 0u64;
            while drained < self.body_limit {
                match response.chunk().await {
                    Ok(Some(chunk)) => drained += chunk.len() as u64,
                    _ => break,
                }
            }
            return FetchOutcome::Skipped(FetchError::Status {
                url: url.clone(),
                status,
            });
        }

        let mut written = 0u64;
        loop {
            let chunk = match response.chunk().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                // The sink is still untouched, so the next candidate starts clean.
                Err(source) if written == 0 => {
                    return FetchOutcome::Skipped(FetchError::Transport {
                        url: url.clone(),
                        source,
                    })
                }
                Err(source) => {
                    return FetchOutcome::Fatal(FetchError::Interrupted {
                        url: url.clone(),
                        written,
                        source,
                    })
                }
            };

            let chunk = limit_chunk(chunk, self.body_limit - written);
            if let Err(source) = sink.write_all(&chunk).await {
                return FetchOutcome::Fatal(FetchError::Sink {
                    url: url.clone(),
                    source,
                });
            }
            written += chunk.len() as u64;

            if written >= self.body_limit {
                break;
            }
        }

        // A body that fills the limit exactly cannot be told apart from a
        // truncated one.
        if written >= self.body_limit {
            return FetchOutcome::Fatal(FetchError::TooLarge {
                url: url.clone(),
                limit: self.body_limit,
            });
        }

        if let Err(source) = sink.flush().await {
            return FetchOutcome::Fatal(FetchError::Sink {
                url: url.clone(),
                source,
            });
        }

        FetchOutcome::Fetched { written }
    }

    /// Fetch the page for `key` into `sink`, trying candidates in order.
    ///
    /// Returns the last skipped failure when every candidate was skipped.
    pub async fn fetch_into<W>(&self, key: &Key, sink: &mut W) -> Result<u64, FetchError>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let candidates = self.candidates(key)?;

        let mut last_error = None;
        for url in &candidates {
            debug!(key = %key, url = %url, "Trying candidate");

            match self.fetch_one(url, sink).await {
                FetchOutcome::Fetched { written } => {
                    self.stats.fetched.fetch_add(1, Ordering::Relaxed);
                    self.stats.bytes_fetched.fetch_add(written, Ordering::Relaxed);
                    info!(key = %key, url = %url, size = written, "Fetched page");
                    return Ok(written);
                }
                FetchOutcome::Skipped(err) => {
                    self.stats.skipped.fetch_add(1, Ordering::Relaxed);
                    debug!(key = %key, error = %err, "Candidate skipped");
                    last_error = Some(err);
                }
                FetchOutcome::Fatal(err) => {
                    warn!(key = %key, error = %err, "Fetch aborted");
                    return Err(err);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| FetchError::NoCandidates(key.clone())))
    }
}

#[async_trait]
impl Source for HttpFetcher {
    async fn fetch(
        &self,
        key: &Key,
        sink: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<u64, FetchError> {
        self.fetch_into(key, sink).await
    }
}

/// Cut `chunk` down to at most `remaining` bytes.
fn limit_chunk(mut chunk: Bytes, remaining: u64) -> Bytes {
    if (chunk.len() as u64) > remaining {
        chunk.truncate(remaining as usize);
    }
    chunk
}
