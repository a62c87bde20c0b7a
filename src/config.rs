//! Runtime configuration for dman.
//!
//! Configuration is loaded from an optional JSON file; every field has a
//! default, so a missing file or a partial one is fine.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::fetch::{DEFAULT_SERVER, FALLBACK_LANG};

/// Default config file relative to the user's home directory.
const DEFAULT_CONFIG_PATH: &str = ".dman/config.json";

/// Command-line arguments.
#[derive(Parser, Debug, Clone)]
#[command(name = "dman", version, about = "Read Debian manual pages from any system")]
pub struct Cli {
    /// Manual page to display.
    pub page: String,

    /// Debian release to read the page from.
    #[arg(long, value_name = "SUITE", default_value = "stable")]
    pub release: String,

    /// Page language (defaults to the system locale).
    #[arg(long)]
    pub lang: Option<String>,

    /// Path to configuration file (JSON).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Fetch the page again even if the cached copy is fresh.
    #[arg(long)]
    pub refresh: bool,

    /// Enable verbose logging.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Local page cache.
    pub cache: CacheConfig,

    /// Remote source.
    pub fetch: FetchConfig,

    /// Typesetting and paging.
    pub render: RenderConfig,
}

/// Page cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache directory (default: `~/.dman/cache`).
    pub root: Option<PathBuf>,

    /// Age in seconds after which a cached page is refreshed (<= 0 = never).
    pub ttl_secs: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            root: None,
            ttl_secs: 14 * 24 * 60 * 60, // two weeks
        }
    }
}

impl CacheConfig {
    /// TTL as a duration; zero disables staleness.
    pub fn ttl(&self) -> Duration {
        if self.ttl_secs <= 0 {
            Duration::ZERO
        } else {
            Duration::from_secs(self.ttl_secs as u64)
        }
    }
}

/// Remote source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Base URL of the manpage server.
    pub server: String,

    /// Timeout for each candidate request, in seconds.
    pub request_timeout_secs: u64,

    /// Largest accepted page body in bytes. A body reaching this size is rejected.
    pub body_limit_bytes: u64,

    /// Language tried when the user's language has no page.
    pub fallback_lang: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER.to_string(),
            request_timeout_secs: 10,
            body_limit_bytes: 5 * 1024 * 1024, // 5 MiB
            fallback_lang: FALLBACK_LANG.to_string(),
        }
    }
}

impl FetchConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Typesetting and pager settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Line length when the terminal width is unknown.
    pub default_columns: u16,

    /// Upper bound on the line length.
    pub max_columns: u16,

    /// Pager command used when neither `MANPAGER` nor `PAGER` is set.
    pub pager: Option<String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            default_columns: 78,
            max_columns: 150,
            pager: None,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    ///
    /// With no explicit path the per-user default is tried. A missing file
    /// yields the defaults; only an explicitly named missing file is warned about.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let (path, explicit) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => match default_config_path() {
                Some(path) => (path, false),
                None => return Ok(Config::default()),
            },
        };

        if path.exists() {
            let data = std::fs::read_to_string(&path)
                .with_context(|| format!("reading config {}", path.display()))?;
            let config: Config = serde_json::from_str(&data)
                .with_context(|| format!("parsing config {}", path.display()))?;
            Ok(config)
        } else {
            if explicit {
                tracing::warn!("Config file not found at {:?}, using defaults", path);
            }
            Ok(Config::default())
        }
    }
}

fn default_config_path() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .filter(|home| !home.is_empty())
        .map(|home| PathBuf::from(home).join(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.cache.ttl(), Duration::from_secs(1_209_600));
        assert_eq!(cfg.fetch.server, "https://dyn.manpages.debian.org");
        assert_eq!(cfg.fetch.request_timeout(), Duration::from_secs(10));
        assert_eq!(cfg.fetch.body_limit_bytes, 5 * 1024 * 1024);
        assert_eq!(cfg.fetch.fallback_lang, "en");
        assert_eq!(cfg.render.max_columns, 150);
    }

    #[test]
    fn test_non_positive_ttl_disables_staleness() {
        for ttl_secs in [0, -1, -3600] {
            let cfg = CacheConfig {
                root: None,
                ttl_secs,
            };
            assert!(cfg.ttl().is_zero());
        }
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        std::fs::write(&path, r#"{"cache": {"ttl_secs": 60}, "fetch": {"fallback_lang": "de"}}"#)
            .unwrap();

        let cfg = Config::load(Some(&path)).unwrap();
        assert_eq!(cfg.cache.ttl(), Duration::from_secs(60));
        assert!(cfg.cache.root.is_none());
        assert_eq!(cfg.fetch.fallback_lang, "de");
        assert_eq!(cfg.fetch.request_timeout_secs, 10);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let cfg = Config::load(Some(&tmp.path().join("absent.json"))).unwrap();
        assert_eq!(cfg.cache.ttl_secs, CacheConfig::default().ttl_secs);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["dman", "ls"]);
        assert_eq!(cli.page, "ls");
        assert_eq!(cli.release, "stable");
        assert!(cli.lang.is_none());
        assert!(!cli.refresh);
    }
}
