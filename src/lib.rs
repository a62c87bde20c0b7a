//! dman: read Debian manual pages from any system.
//!
//! Pages are fetched from manpages.debian.org and kept in a local disk cache:
//!   fresh cache entry → served directly
//!   missing or stale  → refreshed from the server, written back to the cache
//!   refresh fails     → a stale entry is served instead, if there is one
//!
//! The page is located by walking an ordered list of candidate URLs that
//! degrades first by language, then by distribution.

pub mod cache;
pub mod config;
pub mod fetch;
pub mod locale;
pub mod render;
pub mod resolver;

pub use cache::{CacheError, DiskCache, Key, Lookup};
pub use fetch::{FetchError, FetchOutcome, HttpFetcher, Source};
pub use resolver::{Document, Origin, ResolveError, Resolver};
