//! Candidate locations for a page, most specific first.
//!
//! The search degrades by language before it degrades by distribution:
//!
//! ```text
//! <dist>/<page>.<lang>.gz
//! <dist>/<page>.<fallback>.gz
//! <dist>/<page>.gz
//! <page>.<lang>.gz
//! <page>.<fallback>.gz
//! <page>.gz
//! ```
//!
//! The `<lang>` rows are omitted when the key has no language or already asks
//! for the fallback language.

use url::Url;

use crate::cache::key::Key;
use crate::fetch::FetchError;

/// Default remote source.
pub const DEFAULT_SERVER: &str = "https://dyn.manpages.debian.org";

/// Language tried after the user's own.
pub const FALLBACK_LANG: &str = "en";

/// The server serves gzip content-encoded roff under this suffix.
const SUFFIX: &str = ".gz";

/// Server-relative candidate paths for `key`, in fallback order.
pub fn candidate_paths(key: &Key, fallback_lang: &str) -> Vec<String> {
    let langs: Vec<&str> = if key.lang.is_empty() || key.lang == fallback_lang {
        vec![fallback_lang]
    } else {
        vec![key.lang.as_str(), fallback_lang]
    };

    let mut paths = Vec::with_capacity(2 * langs.len() + 2);
    for lang in &langs {
        paths.push(format!("{}/{}.{lang}{SUFFIX}", key.dist, key.page));
    }
    paths.push(format!("{}/{}{SUFFIX}", key.dist, key.page));
    for lang in &langs {
        paths.push(format!("{}.{lang}{SUFFIX}", key.page));
    }
    paths.push(format!("{}{SUFFIX}", key.page));
    paths
}

/// Fully qualified candidate URLs for `key` on `server`.
pub fn build_candidates(server: &str, key: &Key, fallback_lang: &str) -> Result<Vec<Url>, FetchError> {
    let server = server.trim_end_matches('/');
    candidate_paths(key, fallback_lang)
        .into_iter()
        .map(|path| {
            let raw = format!("{server}/{path}");
            Url::parse(&raw).map_err(|source| FetchError::InvalidUrl { url: raw, source })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_language_order() {
        let key = Key::new("ls", "stable", "fr");
        assert_eq!(
            candidate_paths(&key, FALLBACK_LANG),
            vec![
                "stable/ls.fr.gz",
                "stable/ls.en.gz",
                "stable/ls.gz",
                "ls.fr.gz",
                "ls.en.gz",
                "ls.gz",
            ]
        );
    }

    #[test]
    fn test_fallback_language_collapses() {
        let expected = vec!["stable/ls.en.gz", "stable/ls.gz", "ls.en.gz", "ls.gz"];
        assert_eq!(candidate_paths(&Key::new("ls", "stable", "en"), FALLBACK_LANG), expected);
        assert_eq!(candidate_paths(&Key::new("ls", "stable", ""), FALLBACK_LANG), expected);
    }

    #[test]
    fn test_candidate_count_and_determinism() {
        for (lang, count) in [("de", 6), ("pt", 6), ("en", 4), ("", 4)] {
            let key = Key::new("systemd.unit", "bookworm", lang);
            let first = build_candidates(DEFAULT_SERVER, &key, FALLBACK_LANG).unwrap();
            let second = build_candidates(DEFAULT_SERVER, &key, FALLBACK_LANG).unwrap();
            assert_eq!(first.len(), count, "lang {lang:?}");
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_urls_on_server() {
        let key = Key::new("ls", "stable", "fr");
        let urls = build_candidates("http://127.0.0.1:8080/", &key, FALLBACK_LANG).unwrap();
        assert_eq!(urls[0].as_str(), "http://127.0.0.1:8080/stable/ls.fr.gz");
        assert_eq!(urls[5].as_str(), "http://127.0.0.1:8080/ls.gz");
    }

    #[test]
    fn test_invalid_server_rejected() {
        let key = Key::new("ls", "stable", "fr");
        let err = build_candidates("not a url", &key, FALLBACK_LANG).unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl { .. }));
    }
}
