//! Tool-call argument parsing and dispatch, plus the `resources/*`
//! surface over the three-tier scrape store.
//!
//! One module per verb, a thin dispatch table, and arguments parsed by
//! hand from a loosely-typed JSON body rather than relying on serde
//! alone, since invalid individual fields need field-specific error
//! messages.

pub mod crawl;
pub mod map;
pub mod resources;
pub mod scrape;
pub mod search;
pub mod tools;

use serde_json::Value;

/// `https://` is prepended when the argument carries no scheme, matching
/// the normalization the scrape contract requires. Idempotent: a URL
/// that already contains `://` is returned unchanged.
pub(crate) fn normalize_url(raw: &str) -> String {
    if raw.contains("://") {
        raw.to_string()
    } else {
        format!("https://{raw}")
    }
}

pub(crate) fn arg_str(args: &Value, key: &str) -> Option<String> {
    args.get(key).and_then(Value::as_str).map(str::to_string)
}

pub(crate) fn arg_bool(args: &Value, key: &str, default: bool) -> bool {
    args.get(key).and_then(Value::as_bool).unwrap_or(default)
}

pub(crate) fn arg_u64(args: &Value, key: &str, default: u64) -> u64 {
    args.get(key).and_then(Value::as_u64).unwrap_or(default)
}

pub(crate) fn arg_usize(args: &Value, key: &str, default: usize) -> usize {
    args.get(key).and_then(Value::as_u64).map(|v| v as usize).unwrap_or(default)
}

pub(crate) fn arg_str_array(args: &Value, key: &str) -> Vec<String> {
    args.get(key)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}

/// Slices `content[start_index..start_index+max_chars]` on char
/// boundaries and reports the next `startIndex` when the slice doesn't
/// reach the end.
pub(crate) fn paginate(content: &str, start_index: usize, max_chars: usize) -> (String, Option<usize>) {
    let chars: Vec<char> = content.chars().collect();
    let start = start_index.min(chars.len());
    let end = start.saturating_add(max_chars).min(chars.len());
    let slice: String = chars[start..end].iter().collect();
    let next = if end < chars.len() { Some(end) } else { None };
    (slice, next)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_url_prepends_https_when_scheme_missing() {
        assert_eq!(normalize_url("example.com/a"), "https://example.com/a");
        assert_eq!(normalize_url("https://example.com"), "https://example.com");
        assert_eq!(normalize_url("http://example.com"), "http://example.com");
    }

    #[test]
    fn normalize_url_is_idempotent() {
        let once = normalize_url("example.com");
        let twice = normalize_url(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn paginate_reports_next_index_on_truncation() {
        let (slice, next) = paginate("abcdefgh", 0, 3);
        assert_eq!(slice, "abc");
        assert_eq!(next, Some(3));
    }

    #[test]
    fn paginate_reports_none_at_end_of_content() {
        let (slice, next) = paginate("abcdefgh", 6, 10);
        assert_eq!(slice, "gh");
        assert_eq!(next, None);
    }

    #[test]
    fn paginate_clamps_start_index_past_content_length() {
        let (slice, next) = paginate("abc", 10, 5);
        assert_eq!(slice, "");
        assert_eq!(next, None);
    }
}
