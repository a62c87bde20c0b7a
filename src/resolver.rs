//! Resolver: the get-or-refresh operation over the disk cache and a page source.
//!
//! ```text
//! cache lookup ── fresh ──────────────────────────────▶ serve cached
//!      │
//!      ├─ miss / unreadable ─▶ fetch ─ ok ─▶ persist ─▶ serve fetched
//!      │                         └─ err ─────────────▶ fail
//!      └─ stale ─────────────▶ fetch ─ ok ─▶ persist ─▶ serve fetched
//!                                └─ err ─────────────▶ serve stale (warn)
//! ```
//!
//! Fetched pages are spooled to an anonymous temporary file, so the caller
//! always gets a seekable file whether the page came from cache or network.
//! A failed fetch only ever leaves partial bytes in that spool, never in the
//! cache entry or the stale handle.

use std::io::{self, SeekFrom};
use std::time::Duration;

use thiserror::Error;
use tokio::fs::File;
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tracing::{debug, warn};

use crate::cache::key::Key;
use crate::cache::store::{DiskCache, Lookup};
use crate::fetch::{FetchError, Source};

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("spool: {0}")]
    Spool(#[source] io::Error),
}

impl ResolveError {
    /// Whether the page does not exist on the remote source.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ResolveError::Fetch(err) if err.is_not_found())
    }
}

/// Where a served document came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Fresh cache entry; no network access.
    Cache,

    /// Fetched from the remote source.
    Remote,

    /// Expired cache entry served because the refresh failed.
    StaleCache,
}

/// A resolved page, positioned at its start.
#[derive(Debug)]
pub struct Document {
    pub file: File,
    pub origin: Origin,
}

/// Serves pages from the cache, refreshing them from `S` when needed.
pub struct Resolver<S> {
    cache: DiskCache,
    source: S,
    ttl: Duration,
}

impl<S: Source> Resolver<S> {
    /// Create a resolver. A zero `ttl` never treats cached pages as stale.
    pub fn new(cache: DiskCache, source: S, ttl: Duration) -> Self {
        Self { cache, source, ttl }
    }

    pub fn cache(&self) -> &DiskCache {
        &self.cache
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Get the page for `key`, preferring a fresh cache entry.
    pub async fn get(&self, key: &Key) -> Result<Document, ResolveError> {
        let stale = match self.cache.get(key, self.ttl).await {
            Ok(Lookup::Fresh(file)) => {
                return Ok(Document {
                    file,
                    origin: Origin::Cache,
                })
            }
            Ok(Lookup::Stale { file, age }) => {
                debug!(key = %key, age_secs = age.as_secs(), "Refreshing stale page");
                Some(file)
            }
            Err(err) if err.is_not_found() => None,
            Err(err) => {
                warn!(key = %key, error = %err, "Cache lookup failed");
                None
            }
        };

        match self.refresh(key).await {
            // The superseded stale handle is dropped (closed) here.
            Ok(document) => Ok(document),
            Err(err) => match stale {
                Some(file) => {
                    warn!(key = %key, error = %err, "Falling back to stale cache");
                    Ok(Document {
                        file,
                        origin: Origin::StaleCache,
                    })
                }
                None => Err(err),
            },
        }
    }

    /// Fetch the page for `key` and store it in the cache, ignoring any
    /// cached copy.
    ///
    /// A failure to write the cache is logged; the fetched page is still
    /// returned.
    pub async fn refresh(&self, key: &Key) -> Result<Document, ResolveError> {
        let spool = tempfile::tempfile().map_err(ResolveError::Spool)?;
        let mut file = File::from_std(spool);

        self.source.fetch(key, &mut file).await?;
        file.flush().await.map_err(ResolveError::Spool)?;
        file.seek(SeekFrom::Start(0))
            .await
            .map_err(ResolveError::Spool)?;

        if let Err(err) = self.cache.put(key, &mut file).await {
            warn!(key = %key, error = %err, "Failed to write page to cache");
        }

        file.seek(SeekFrom::Start(0))
            .await
            .map_err(ResolveError::Spool)?;

        Ok(Document {
            file,
            origin: Origin::Remote,
        })
    }
}
