//! Page key: the addressing unit shared by the disk cache and the fetcher.

use serde::{Deserialize, Serialize};

/// Identifies one manual page: a page name within a distribution release,
/// in a given language.
///
/// Keys carry no identity beyond their field values. An empty `lang` means
/// "no language preference" and is treated like the fallback language when
/// candidate URLs are built.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Key {
    /// Page name (e.g. `ls`, `systemd.unit`).
    pub page: String,

    /// Distribution release / suite (e.g. `stable`, `bookworm`).
    pub dist: String,

    /// Language tag (e.g. `fr`), possibly empty.
    pub lang: String,
}

impl Key {
    /// Create a key from its three components.
    pub fn new(page: impl Into<String>, dist: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            page: page.into(),
            dist: dist.into(),
            lang: lang.into(),
        }
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.lang.is_empty() {
            write!(f, "{}({})", self.page, self.dist)
        } else {
            write!(f, "{}({}/{})", self.page, self.dist, self.lang)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_equality() {
        let a = Key::new("ls", "stable", "fr");
        let b = Key::new(String::from("ls"), "stable", "fr");
        assert_eq!(a, b);
        assert_ne!(a, Key::new("ls", "stable", "de"));
        assert_ne!(a, Key::new("ls", "testing", "fr"));
    }

    #[test]
    fn test_display() {
        assert_eq!(Key::new("ls", "stable", "fr").to_string(), "ls(stable/fr)");
        assert_eq!(Key::new("ls", "stable", "").to_string(), "ls(stable)");
    }
}
