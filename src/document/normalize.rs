//! Identifier and reference-name normalization

use unicode_normalization::UnicodeNormalization;

/// Derive an HTML-safe identifier from arbitrary text: lowercase,
/// Unicode compatibility decomposition, non-`[a-z0-9]` runs collapsed
/// to single hyphens, then leading digits/hyphens and trailing hyphens
/// stripped. May return an empty string.
pub fn make_id(text: &str) -> String {
    let lowered = text.to_lowercase();
    let decomposed: String = lowered.nfkd().collect();
    let collapsed = decomposed.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut id = String::with_capacity(collapsed.len());
    let mut in_run = false;
    for c in collapsed.chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            id.push(c);
            in_run = false;
        } else if !in_run {
            id.push('-');
            in_run = true;
        }
    }

    let start = id
        .find(|c: char| c.is_ascii_lowercase())
        .unwrap_or(id.len());
    let trimmed = id[start..].trim_end_matches('-');
    trimmed.to_string()
}

/// Normalize a reference name: runs of whitespace collapse to single
/// spaces and the ends are trimmed.
pub fn fully_normalize_name(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_id_basic() {
        assert_eq!(make_id("What is MongoDB?"), "what-is-mongodb");
        assert_eq!(make_id("Hello, World!"), "hello-world");
    }

    #[test]
    fn test_make_id_strips_leading_digits() {
        assert_eq!(make_id("123 steps"), "steps");
        assert_eq!(make_id("--dashes--"), "dashes");
    }

    #[test]
    fn test_make_id_unicode_decomposition() {
        assert_eq!(make_id("Café"), "cafe");
    }

    #[test]
    fn test_make_id_empty() {
        assert_eq!(make_id(""), "");
        assert_eq!(make_id("!!!"), "");
        assert_eq!(make_id("123"), "");
    }

    #[test]
    fn test_fully_normalize_name() {
        assert_eq!(fully_normalize_name("  a   b\tc  "), "a b c");
        assert_eq!(fully_normalize_name("plain"), "plain");
    }
}
