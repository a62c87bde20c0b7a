//! Local page cache.
//!
//! - [`key`]: Key, the (page, dist, lang) addressing unit
//! - [`store`]: DiskCache with TTL-based staleness and atomic replace-on-write

pub mod key;
pub mod store;

pub use key::Key;
pub use store::{CacheError, DiskCache, Lookup};
