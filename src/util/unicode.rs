//! Unicode code-point notation and display width
//!
//! The `unicode` directive accepts code points in several spellings
//! (`U+27A4`, `0x2192`, plain decimal, XML character references).
//! `column_width` measures display columns for title-underline checks,
//! ignoring combining marks.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use unicode_normalization::char::canonical_combining_class;

static HEX_NOTATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?i:0x|x|\\x|U\+?|\\u|&#x)([0-9a-fA-F]+);?$").expect("hex pattern"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnicodeNotationError {
    Empty,
    Unrecognized(String),
    OutOfRange(String),
}

impl fmt::Display for UnicodeNotationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnicodeNotationError::Empty => write!(f, "empty unicode notation"),
            UnicodeNotationError::Unrecognized(text) => {
                write!(f, "invalid unicode notation: '{}'", text)
            }
            UnicodeNotationError::OutOfRange(text) => {
                write!(f, "code point out of range: '{}'", text)
            }
        }
    }
}

impl std::error::Error for UnicodeNotationError {}

/// Decode one code-point spelling into its character.
///
/// Accepted forms: decimal (`129448`), and hexadecimal with a
/// `0x`/`x`/`\x`/`U+`/`\u`/`&#x` prefix and optional trailing `;`.
pub fn decode_unicode_notation(text: &str) -> Result<char, UnicodeNotationError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(UnicodeNotationError::Empty);
    }
    if text.bytes().all(|b| b.is_ascii_digit()) {
        let value: u32 = text
            .parse()
            .map_err(|_| UnicodeNotationError::OutOfRange(text.to_string()))?;
        return char::from_u32(value).ok_or_else(|| UnicodeNotationError::OutOfRange(text.to_string()));
    }
    match HEX_NOTATION.captures(text) {
        Some(caps) => {
            let digits = &caps[1];
            let value = u32::from_str_radix(digits, 16)
                .map_err(|_| UnicodeNotationError::OutOfRange(text.to_string()))?;
            char::from_u32(value).ok_or_else(|| UnicodeNotationError::OutOfRange(text.to_string()))
        }
        None => Err(UnicodeNotationError::Unrecognized(text.to_string())),
    }
}

/// Display width of `text` in columns. Combining marks occupy no
/// column of their own.
pub fn column_width(text: &str) -> usize {
    text.chars()
        .filter(|&c| canonical_combining_class(c) == 0)
        .count()
}
