//! On-disk page cache.
//!
//! One file per key at `<root>/<dist>/<lang>/<page>`, holding the exact bytes
//! of the last successful retrieval. The file's modification time is the
//! staleness clock.
//!
//! Writes go to a temporary file in the destination directory which is then
//! renamed over the entry: a reader never observes a partially written page,
//! and a reader that opened the old entry keeps seeing the old content.

use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use thiserror::Error;
use tokio::fs::{self, File};
use tokio::io::{AsyncRead, AsyncWriteExt};
use tracing::debug;

use crate::cache::key::Key;

/// Cache root relative to the user's home directory.
const DEFAULT_ROOT: &str = ".dman/cache";

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache: page not found: {0}")]
    NotFound(PathBuf),

    #[error("cache: {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cache: invalid key component {component:?} in {key}")]
    InvalidKey { key: Key, component: String },

    #[error("cache: root directory unknown: HOME is not set")]
    NoRoot,
}

impl CacheError {
    /// Whether the entry is simply absent (as opposed to unreadable).
    pub fn is_not_found(&self) -> bool {
        matches!(self, CacheError::NotFound(_))
    }
}

/// A successful cache lookup.
///
/// A stale entry is still a valid, readable page: callers may serve it when a
/// refresh fails, so they must look at the variant rather than just the file.
#[must_use = "a stale lookup still carries a usable file; check the variant"]
#[derive(Debug)]
pub enum Lookup {
    /// Entry younger than the TTL (or TTL disabled).
    Fresh(File),

    /// Entry older than the TTL.
    Stale { file: File, age: Duration },
}

impl Lookup {
    pub fn is_stale(&self) -> bool {
        matches!(self, Lookup::Stale { .. })
    }

    /// Take the open file regardless of freshness.
    pub fn into_file(self) -> File {
        match self {
            Lookup::Fresh(file) => file,
            Lookup::Stale { file, .. } => file,
        }
    }
}

/// Disk-backed page cache.
#[derive(Debug, Clone, Default)]
pub struct DiskCache {
    /// Configured root; `None` means the per-user default.
    root: Option<PathBuf>,
}

impl DiskCache {
    pub fn new(root: Option<PathBuf>) -> Self {
        Self { root }
    }

    /// Resolve the cache root directory.
    pub fn root(&self) -> Result<PathBuf, CacheError> {
        match &self.root {
            Some(root) => Ok(root.clone()),
            None => default_root(),
        }
    }

    /// Generate the file path for a key.
    pub fn entry_path(&self, key: &Key) -> Result<PathBuf, CacheError> {
        check_component(key, &key.dist, false)?;
        check_component(key, &key.lang, true)?;
        check_component(key, &key.page, false)?;

        Ok(self.root()?.join(&key.dist).join(&key.lang).join(&key.page))
    }

    /// Look up a key, judging staleness against the current wall clock.
    pub async fn get(&self, key: &Key, ttl: Duration) -> Result<Lookup, CacheError> {
        self.get_at(key, ttl, SystemTime::now()).await
    }

    /// Look up a key, judging staleness against `now`.
    ///
    /// A zero `ttl` disables staleness. An entry whose modification time lies
    /// in the future relative to `now` counts as age zero.
    pub async fn get_at(
        &self,
        key: &Key,
        ttl: Duration,
        now: SystemTime,
    ) -> Result<Lookup, CacheError> {
        let path = self.entry_path(key)?;

        let file = match File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(key = %key, path = %path.display(), "Cache miss");
                return Err(CacheError::NotFound(path));
            }
            Err(source) => return Err(CacheError::Io { path, source }),
        };

        if ttl.is_zero() {
            debug!(key = %key, path = %path.display(), "Cache hit (no TTL)");
            return Ok(Lookup::Fresh(file));
        }

        let modified = match file.metadata().await.and_then(|meta| meta.modified()) {
            Ok(modified) => modified,
            Err(source) => return Err(CacheError::Io { path, source }),
        };
        let age = now.duration_since(modified).unwrap_or(Duration::ZERO);

        if age > ttl {
            debug!(key = %key, age_secs = age.as_secs(), ttl_secs = ttl.as_secs(), "Cache entry stale");
            Ok(Lookup::Stale { file, age })
        } else {
            debug!(key = %key, age_secs = age.as_secs(), "Cache hit");
            Ok(Lookup::Fresh(file))
        }
    }

    /// Store the full contents of `source` as the entry for `key`.
    ///
    /// The previous entry stays in place until the new content has been
    /// completely written and synced. Returns the number of bytes stored.
    pub async fn put<R>(&self, key: &Key, source: &mut R) -> Result<u64, CacheError>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let path = self.entry_path(key)?;
        let io_err = |source: io::Error| CacheError::Io {
            path: path.clone(),
            source,
        };

        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent).await.map_err(io_err)?;

        let prefix = format!(".{}.", key.page);
        let tmp = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(".tmp")
            .tempfile_in(parent)
            .map_err(io_err)?;

        // The temp path removes the file on drop unless persisted.
        let (std_file, tmp_path) = tmp.into_parts();
        let mut file = File::from_std(std_file);

        let written = tokio::io::copy(source, &mut file).await.map_err(io_err)?;
        file.flush().await.map_err(io_err)?;
        file.sync_all().await.map_err(io_err)?;
        drop(file);

        tmp_path.persist(&path).map_err(|e| io_err(e.error))?;

        debug!(
            key = %key,
            path = %path.display(),
            size = written,
            "Wrote page to cache"
        );

        Ok(written)
    }
}

fn default_root() -> Result<PathBuf, CacheError> {
    match std::env::var_os("HOME") {
        Some(home) if !home.is_empty() => Ok(PathBuf::from(home).join(DEFAULT_ROOT)),
        _ => Err(CacheError::NoRoot),
    }
}

/// Reject key components that would escape their directory level.
fn check_component(key: &Key, component: &str, may_be_empty: bool) -> Result<(), CacheError> {
    let bad = (component.is_empty() && !may_be_empty)
        || component == "."
        || component == ".."
        || component.contains(['/', '\\', '\0']);

    if bad {
        return Err(CacheError::InvalidKey {
            key: key.clone(),
            component: component.to_string(),
        });
    }
    Ok(())
}
