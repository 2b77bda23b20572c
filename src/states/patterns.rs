//! Block-level transition patterns
//!
//! Every pattern is anchored at the line start. Conditions the regex
//! engine cannot express (uniform punctuation runs, character classes
//! after a marker) are checked by the transition handlers.

use once_cell::sync::Lazy;
use regex::Regex;

const SIMPLENAME: &str = r"[A-Za-z0-9]+(?:[-._+:][A-Za-z0-9]+)*";
const ENUM_TEXT: &str = r"(?:[0-9]+|[a-z]|[A-Z]|[ivxlcdm]+|[IVXLCDM]+|#)";

fn pattern(source: &str) -> Regex {
    Regex::new(source).expect("block pattern")
}

pub static BLANK: Lazy<Regex> = Lazy::new(|| pattern(r"^ *$"));

pub static INDENT: Lazy<Regex> = Lazy::new(|| pattern(r"^ "));

pub static BULLET: Lazy<Regex> =
    Lazy::new(|| pattern(r"^[-+*\u{2022}\u{2023}\u{2043}]( +|$)"));

/// Enumerator in parenthesized, right-paren, or period format. The
/// captured group includes the punctuation; the handler strips it.
pub static ENUMERATOR: Lazy<Regex> = Lazy::new(|| {
    pattern(&format!(
        r"^(?:(?P<parens>\({e}\))|(?P<rparen>{e}\))|(?P<period>{e}\.))( +|$)",
        e = ENUM_TEXT
    ))
});

/// `:name:` at line start, the closing colon followed by space or end
/// of line. Leading/trailing-space names are rejected in code.
pub static FIELD_MARKER: Lazy<Regex> =
    Lazy::new(|| pattern(r"^:((?:\\.|[^\\])+?):( +|$)"));

pub static OPTION_MARKER: Lazy<Regex> = Lazy::new(|| {
    let optarg = r"(?:[a-zA-Z][a-zA-Z0-9_-]*|<[^<>]+>)";
    let shortopt = format!(r"(?:-|\+)[a-zA-Z0-9](?: ?{optarg})?");
    let longopt = format!(r"(?:--|/)[a-zA-Z0-9][a-zA-Z0-9_-]*(?:[ =]{optarg})?");
    let option = format!(r"(?:{shortopt}|{longopt})");
    pattern(&format!(r"^{option}(?:, {option})*(  +| ?$)"))
});

pub static DOCTEST: Lazy<Regex> = Lazy::new(|| pattern(r"^>>>( +|$)"));

pub static LINE_BLOCK: Lazy<Regex> = Lazy::new(|| pattern(r"^\|( +|$)"));

pub static EXPLICIT_MARKUP: Lazy<Regex> = Lazy::new(|| pattern(r"^\.\.( +|$)"));

pub static ANONYMOUS: Lazy<Regex> = Lazy::new(|| pattern(r"^__( +|$)"));

/// A run of 7-bit punctuation. Uniformity (all the same character) is
/// verified by the handlers.
pub static LINE: Lazy<Regex> = Lazy::new(|| pattern(r"^[!-/:-@\[-`{-~]+ *$"));

/// Fallback: matches every line.
pub static TEXT: Lazy<Regex> = Lazy::new(|| pattern(r"^"));

// --- Explicit markup constructs ---

pub static FOOTNOTE: Lazy<Regex> = Lazy::new(|| {
    pattern(&format!(
        r"^\.\. +\[([0-9]+|\#(?:{SIMPLENAME})?|\*)\]( +|$)"
    ))
});

pub static CITATION: Lazy<Regex> =
    Lazy::new(|| pattern(&format!(r"^\.\. +\[({SIMPLENAME})\]( +|$)")));

/// Hyperlink target start; group 1 ends right after the underscore.
pub static HYPERLINK_TARGET: Lazy<Regex> = Lazy::new(|| pattern(r"^(\.\. +_)[^ ]"));

/// Substitution definition start; group 1 ends right after the pipe.
pub static SUBSTITUTION_DEF: Lazy<Regex> = Lazy::new(|| pattern(r"^(\.\. +\|)[^ ]"));

/// Directive start: `.. name::`.
pub static DIRECTIVE: Lazy<Regex> =
    Lazy::new(|| pattern(&format!(r"^\.\. +({SIMPLENAME}) ?::( +|$)")));

/// Embedded directive inside a substitution definition.
pub static EMBEDDED_DIRECTIVE: Lazy<Regex> =
    Lazy::new(|| pattern(&format!(r"^({SIMPLENAME})::( +|$)")));

/// Simple reference name, whole-string.
pub static SIMPLENAME_FULL: Lazy<Regex> =
    Lazy::new(|| pattern(&format!(r"^{SIMPLENAME}$")));

/// Is a line's punctuation run uniform (all the same character)?
pub fn uniform_line(text: &str) -> bool {
    let trimmed = text.trim_end();
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => chars.all(|c| c == first),
        None => false,
    }
}
