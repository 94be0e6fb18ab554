//! Coercion helpers for raw environment values.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::Rng;
use url::Url;

/// Number of random bytes behind a generated secret key.
pub const SECRET_KEY_BYTES: usize = 32;

pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" | "on" | "t" => Some(true),
        "false" | "0" | "no" | "n" | "off" | "f" => Some(false),
        _ => None,
    }
}

/// Parse a comma-separated list of absolute http(s) URLs.
///
/// Blank items are skipped, so a trailing comma is harmless.
pub fn parse_url_list(value: &str) -> Result<Vec<Url>, String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(parse_http_url)
        .collect()
}

pub fn parse_http_url(value: &str) -> Result<Url, String> {
    let url = Url::parse(value).map_err(|e| format!("{value:?} is not a valid URL: {e}"))?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(format!("{value:?} has unsupported scheme {other:?}")),
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(format!("{value:?} has no host"));
    }
    Ok(url)
}

/// URL-safe, lowercase, hyphenated form of `value`.
///
/// Non-ASCII text is transliterated first (`Café` -> `cafe`). Quotes are
/// dropped, as are commas between digits (`1,000` -> `1000`); every other
/// run of non-alphanumeric characters becomes a single `-`.
pub fn slugify(value: &str) -> String {
    let chars: Vec<char> = deunicode::deunicode(value)
        .chars()
        .filter(|c| !matches!(c, '\'' | '"'))
        .collect();

    let mut slug = String::with_capacity(chars.len());
    let mut pending_dash = false;

    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else if !is_number_separator(&chars, i) {
            pending_dash = true;
        }
    }
    slug
}

/// A comma with a digit on both sides, as in `1,000`.
fn is_number_separator(chars: &[char], i: usize) -> bool {
    let digit_at = |j: Option<usize>| j.and_then(|j| chars.get(j)).is_some_and(char::is_ascii_digit);
    chars[i] == ',' && digit_at(i.checked_sub(1)) && digit_at(Some(i + 1))
}

/// Fresh URL-safe secret built from [`SECRET_KEY_BYTES`] random bytes.
pub fn generate_secret_key() -> String {
    let mut key = [0u8; SECRET_KEY_BYTES];
    rand::thread_rng().fill(&mut key[..]);
    URL_SAFE_NO_PAD.encode(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool() {
        for truthy in ["true", "True", "TRUE", "1", "yes", "on", "t", " y "] {
            assert_eq!(parse_bool(truthy), Some(true), "{truthy}");
        }
        for falsy in ["false", "0", "no", "off", "F", "n"] {
            assert_eq!(parse_bool(falsy), Some(false), "{falsy}");
        }
        assert_eq!(parse_bool("maybe"), None);
        assert_eq!(parse_bool(""), None);
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("My Project"), "my-project");
        assert_eq!(slugify("Project_Example"), "project-example");
        assert_eq!(slugify("  --Hello,   World!-- "), "hello-world");
        assert_eq!(slugify("Bob's API v2"), "bobs-api-v2");
        assert_eq!(slugify("Café Menu"), "cafe-menu");
        assert_eq!(slugify("Über Straße"), "uber-strasse");
        assert_eq!(slugify("1,000 Users"), "1000-users");
        assert_eq!(slugify("a, b"), "a-b");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_parse_url_list() {
        let urls = parse_url_list("http://localhost:3000, https://example.com/app,").unwrap();
        assert_eq!(urls.len(), 2);
        assert_eq!(urls[0].as_str(), "http://localhost:3000/");
        assert_eq!(urls[1].host_str(), Some("example.com"));

        assert!(parse_url_list("ftp://example.com").is_err());
        assert!(parse_url_list("not a url").is_err());
        assert!(parse_url_list("").unwrap().is_empty());
    }

    #[test]
    fn test_generated_secret_key() {
        let a = generate_secret_key();
        let b = generate_secret_key();
        assert_ne!(a, b);
        // 32 bytes -> 43 base64 characters without padding.
        assert_eq!(a.len(), 43);
        assert!(a
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert_eq!(URL_SAFE_NO_PAD.decode(&a).unwrap().len(), SECRET_KEY_BYTES);
    }
}
