//! Inline recognition patterns
//!
//! One master pattern finds candidate start points; the surrounding
//! context (whitespace, punctuation pairs, escapes) is checked in code
//! because those rules are positional, not textual.

use once_cell::sync::Lazy;
use regex::Regex;

/// Candidate inline constructs. Group order encodes precedence at a
/// shared start position: explicit start-strings, then full simple
/// references, then footnote/citation ends, then a bare backquote.
pub static MASTER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)
          (?P<start>\*\*|\*|``|_`|\|)
        | (?P<refend>[A-Za-z0-9](?:[-_.:+]?[A-Za-z0-9])*__?)
        | (?P<fnend>\[[^\[\]\x00]+\]_)
        | (?P<backquote>`)
        ",
    )
    .expect("master inline pattern")
});

/// A role marker, `:name:`, anchored at the end via manual slicing.
pub static ROLE_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r":([A-Za-z0-9]+(?:[-._+:][A-Za-z0-9]+)*):$").expect("role suffix pattern")
});

/// A role marker at the start of a remainder: `:name:`.
pub static ROLE_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^:([A-Za-z0-9]+(?:[-._+:][A-Za-z0-9]+)*):").expect("role prefix pattern")
});

/// Reference names: alphanumeric runs joined by single internal
/// punctuation characters.
pub static SIMPLENAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9]+(?:[-._+:][A-Za-z0-9]+)*$").expect("simplename pattern")
});

/// Embedded link at the end of phrase-reference text: `text <target>`.
pub static EMBEDDED_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+<([^<>\x00]+)>$").expect("embedded link pattern"));

/// Candidate standalone URI: scheme checked against [`URI_SCHEMES`].
pub static URI: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?P<scheme>[A-Za-z][A-Za-z0-9.+-]*):(?P<body>[^\s<>\x00]+)")
        .expect("uri pattern")
});

/// Standalone email address.
pub static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[-_.+a-zA-Z0-9]+@[-.a-zA-Z0-9]+\.[a-zA-Z]{2,}\b").expect("email pattern")
});

/// Schemes recognized for standalone URIs. Anything else abandons the
/// match.
pub const URI_SCHEMES: &[&str] = &[
    "acap", "cid", "data", "dav", "fax", "file", "ftp", "ftps", "geo", "gopher", "h323", "http",
    "https", "im", "imap", "info", "ipp", "irc", "ldap", "mailto", "mid", "mms", "news", "nfs",
    "nntp", "pop", "pres", "rtsp", "sftp", "shttp", "sip", "sips", "snmp", "ssh", "tel", "telnet",
    "urn", "vemmi", "wais", "webcal", "ws", "wss", "xmpp",
];

/// Trailing characters stripped from a recognized URI.
pub const URI_TRAILER: &[char] = &['.', ',', ';', ':', '!', '?', ')', ']', '}', '>', '"', '\''];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_master_prefers_strong_over_emphasis() {
        let m = MASTER.captures("**x").unwrap();
        assert_eq!(m.name("start").unwrap().as_str(), "**");
    }

    #[test]
    fn test_master_matches_simple_reference() {
        let m = MASTER.captures("see name_ here").unwrap();
        assert_eq!(m.name("refend").unwrap().as_str(), "name_");
    }

    #[test]
    fn test_master_matches_footnote_end() {
        let m = MASTER.captures("x [1]_ y").unwrap();
        assert_eq!(m.name("fnend").unwrap().as_str(), "[1]_");
    }

    #[test]
    fn test_role_suffix_anchored() {
        let caps = ROLE_SUFFIX.captures("text :strong:").unwrap();
        assert_eq!(&caps[1], "strong");
        assert!(ROLE_SUFFIX.captures("text :strong: more").is_none());
    }

    #[test]
    fn test_uri_scheme_captured() {
        let caps = URI.captures("see https://example.com/x.").unwrap();
        assert_eq!(caps.name("scheme").unwrap().as_str(), "https");
    }
}
