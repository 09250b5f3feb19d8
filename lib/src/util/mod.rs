mod macros;

pub use macros::*;

use once_cell::sync::Lazy;
use regex::Regex;

/// The maximum length of a page slug, in characters.
pub const MAX_SLUG_LENGTH: usize = 50;

/// Normalizes a slash-delimited path so that it begins and ends with exactly
/// one `/` and contains no empty segments.
///
/// ```
/// use sprout::util::normalize_path;
///
/// assert_eq!(normalize_path("foo/bar"), "/foo/bar/");
/// assert_eq!(normalize_path("/foo/bar/"), "/foo/bar/");
/// assert_eq!(normalize_path("//foo///bar"), "/foo/bar/");
/// assert_eq!(normalize_path(""), "/");
/// assert_eq!(normalize_path("/"), "/");
/// ```
pub fn normalize_path(path: &str) -> String {
    let mut normalized = String::with_capacity(path.len() + 2);
    normalized.push('/');
    for segment in path_segments(path) {
        normalized.push_str(segment);
        normalized.push('/');
    }

    normalized
}

/// The non-empty `/`-separated segments of `path`.
pub fn path_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Strips a leading run of digits followed by whitespace, as used to order
/// files manually.
///
/// ```
/// use sprout::util::strip_ordering_prefix;
///
/// assert_eq!(strip_ordering_prefix("007 our-story"), "our-story");
/// assert_eq!(strip_ordering_prefix("007our-story"), "007our-story");
/// assert_eq!(strip_ordering_prefix("2024"), "2024");
/// assert_eq!(strip_ordering_prefix("intro"), "intro");
/// ```
pub fn strip_ordering_prefix(name: &str) -> &str {
    static PREFIX: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^\d+\s+").ok());

    match PREFIX.as_ref().and_then(|re| re.find(name)) {
        Some(m) => &name[m.end()..],
        None => name,
    }
}

/// Truncates `slug` to at most [`MAX_SLUG_LENGTH`] characters.
pub fn truncate_slug(slug: &str) -> &str {
    match slug.char_indices().nth(MAX_SLUG_LENGTH) {
        Some((i, _)) => &slug[..i],
        None => slug,
    }
}

/// Returns `true` if `input` is likely to contain a template.
pub fn is_template(input: &str) -> bool {
    let mut slice = input.as_bytes();
    while let Some(i) = memchr::memchr(b'{', slice) {
        match slice.get(i + 1) {
            Some(b'{') | Some(b'%') => return true,
            Some(_) => slice = &slice[(i + 1)..],
            None => return false,
        }
    }

    false
}
