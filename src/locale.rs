//! Language detection from the locale environment, falling back to the
//! platform's locale settings.

/// Language used when the locale says nothing useful.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Locale variables in precedence order.
const LOCALE_VARS: [&str; 3] = ["LC_ALL", "LC_MESSAGES", "LANG"];

/// Detect the user's language from the process environment, or from the
/// system locale when no locale variable is set.
pub fn detect_language() -> String {
    detect_language_with(|name| std::env::var(name).ok(), sys_locale::get_locale)
}

/// Detect the language using `lookup` to read environment variables and
/// `system` to query the platform locale.
///
/// The first non-empty variable decides, even if it names the C locale;
/// `system` is only consulted when all of them are unset or empty.
pub fn detect_language_with(
    lookup: impl Fn(&str) -> Option<String>,
    system: impl FnOnce() -> Option<String>,
) -> String {
    LOCALE_VARS
        .iter()
        .find_map(|name| lookup(name).filter(|value| !value.is_empty()))
        .or_else(system)
        .and_then(|value| language_from_locale(&value))
        .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string())
}

/// Extract the language part of a locale name
/// (`language[_territory][.codeset][@modifier]`).
///
/// Returns `None` for the `C`/`POSIX` locales and anything that is not a
/// plain alphabetic language code.
pub fn language_from_locale(locale: &str) -> Option<String> {
    let lang = locale.split(['_', '-', '.', '@']).next()?;

    if lang.is_empty() || lang == "C" || lang == "POSIX" {
        return None;
    }
    if !lang.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    Some(lang.to_ascii_lowercase())
}
