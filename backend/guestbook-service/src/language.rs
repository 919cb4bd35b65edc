//! Language tag normalization.
//!
//! Tags partition the public feed by locale. `global` is the default bucket
//! for untagged messages; `all` is a query-time wildcard and is never stored.

use crate::error::{AppError, Result};

pub const GLOBAL: &str = "global";
pub const ALL: &str = "all";
pub const MAX_TAG_LEN: usize = 35;

/// Canonical storage key for a free-text tag.
pub fn normalize(input: Option<&str>) -> String {
    let tag = input.map(|s| s.trim().to_lowercase()).unwrap_or_default();
    if tag.is_empty() || tag == ALL {
        GLOBAL.to_string()
    } else {
        tag
    }
}

/// Like [`normalize`], but rejects tags no locale could plausibly need.
pub fn normalize_checked(input: Option<&str>) -> Result<String> {
    let tag = normalize(input);
    if tag.chars().count() > MAX_TAG_LEN {
        return Err(AppError::validation(
            "LANGUAGE_TOO_LONG",
            format!("Language tag must be at most {} characters", MAX_TAG_LEN),
        ));
    }
    Ok(tag)
}

/// Feed filter from a `lang` query parameter. `None` means no filter.
pub fn filter_from_query(input: Option<&str>) -> Option<String> {
    let raw = input?.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case(ALL) {
        return None;
    }
    Some(normalize(Some(raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_input_is_global() {
        assert_eq!(normalize(None), "global");
        assert_eq!(normalize(Some("")), "global");
        assert_eq!(normalize(Some("  ")), "global");
    }

    #[test]
    fn test_normalize_trims_and_lowercases() {
        assert_eq!(normalize(Some(" zh-CN ")), "zh-cn");
        assert_eq!(normalize(Some("EN")), "en");
    }

    #[test]
    fn test_all_is_never_a_storage_key() {
        assert_eq!(normalize(Some("all")), "global");
        assert_eq!(normalize(Some(" ALL ")), "global");
    }

    #[test]
    fn test_all_query_is_wildcard() {
        assert_eq!(filter_from_query(Some("ALL")), None);
        assert_eq!(filter_from_query(Some("all")), None);
        assert_eq!(filter_from_query(None), None);
        assert_eq!(filter_from_query(Some(" ")), None);
        assert_eq!(filter_from_query(Some("Ja")), Some("ja".to_string()));
        assert_eq!(filter_from_query(Some("global")), Some("global".to_string()));
    }

    #[test]
    fn test_overlong_tag_rejected() {
        let tag = "x".repeat(MAX_TAG_LEN + 1);
        let err = normalize_checked(Some(&tag)).unwrap_err();
        assert_eq!(err.error_code(), "LANGUAGE_TOO_LONG");
        assert!(normalize_checked(Some("en-us")).is_ok());
    }
}
