//! Punctuation context for inline markup boundaries
//!
//! A start-string only opens markup after whitespace or opening
//! punctuation, an end-string only closes it before whitespace or
//! closing punctuation, and a start-string wrapped in a matching
//! opener/closer pair ("(*)", "'*'") is quoted, not markup.

/// Opener/closer pairs. Quote characters pair with themselves and
/// with their typographic partners.
const PAIRS: &[(char, char)] = &[
    ('(', ')'),
    ('[', ']'),
    ('{', '}'),
    ('<', '>'),
    ('"', '"'),
    ('\'', '\''),
    ('\u{2018}', '\u{2019}'), // ' '
    ('\u{201C}', '\u{201D}'), // " "
    ('\u{2039}', '\u{203A}'), // ‹ ›
    ('\u{00AB}', '\u{00BB}'), // « »
    ('\u{2018}', '\u{2018}'),
    ('\u{201C}', '\u{201C}'),
    ('\u{300C}', '\u{300D}'), // 「 」
    ('\u{300E}', '\u{300F}'), // 『 』
];

pub fn is_opener(c: char) -> bool {
    PAIRS.iter().any(|&(open, _)| open == c)
}

pub fn is_closer(c: char) -> bool {
    PAIRS.iter().any(|&(_, close)| close == c)
}

/// Dashes, slashes, and colons may sit directly against markup on
/// either side.
pub fn is_delimiter(c: char) -> bool {
    matches!(
        c,
        '-' | '/' | ':' | '\u{2010}' | '\u{2011}' | '\u{2012}' | '\u{2013}' | '\u{2014}' | '\u{00A0}'
    )
}

/// Do `open` and `close` form a quoting pair around a start-string?
pub fn match_pair(open: char, close: char) -> bool {
    PAIRS.iter().any(|&(o, c)| o == open && c == close)
}

/// May inline markup start after `c`?
pub fn allowed_before_start(c: char) -> bool {
    c.is_whitespace() || is_opener(c) || is_delimiter(c)
}

/// May inline markup end before `c`?
pub fn allowed_after_end(c: char) -> bool {
    c.is_whitespace()
        || is_closer(c)
        || is_delimiter(c)
        || matches!(c, '.' | ',' | ';' | '!' | '?' | '\\' | '\0')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pairs() {
        assert!(match_pair('(', ')'));
        assert!(match_pair('"', '"'));
        assert!(!match_pair('(', ']'));
    }

    #[test]
    fn test_start_context() {
        assert!(allowed_before_start(' '));
        assert!(allowed_before_start('('));
        assert!(allowed_before_start('-'));
        assert!(!allowed_before_start('a'));
        assert!(!allowed_before_start('*'));
    }

    #[test]
    fn test_end_context() {
        assert!(allowed_after_end('.'));
        assert!(allowed_after_end(')'));
        assert!(allowed_after_end(' '));
        assert!(!allowed_after_end('a'));
    }
}
