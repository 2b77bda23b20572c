//! A normalized source line with provenance

use std::rc::Rc;

/// One line of input after normalization, tagged with the identifier
/// of the source it came from and its zero-based offset there.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub text: String,
    pub source: Rc<str>,
    pub offset: usize,
}

impl Line {
    pub fn new(text: impl Into<String>, source: Rc<str>, offset: usize) -> Self {
        Self {
            text: text.into(),
            source,
            offset,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Leading-space count, in characters.
    pub fn indent(&self) -> usize {
        self.text.chars().take_while(|&c| c == ' ').count()
    }
}

/// Split `text` into normalized line texts: tabs become `tab_width`
/// spaces, trailing whitespace is removed, and (optionally) vertical
/// tabs and form feeds collapse to ordinary spaces.
pub fn normalize_text(text: &str, tab_width: usize, convert_whitespace: bool) -> Vec<String> {
    text.split('\n')
        .map(|raw| {
            let mut line = String::with_capacity(raw.len());
            for c in raw.chars() {
                match c {
                    '\t' => line.extend(std::iter::repeat(' ').take(tab_width)),
                    '\u{000B}' | '\u{000C}' if convert_whitespace => line.push(' '),
                    _ => line.push(c),
                }
            }
            line.truncate(line.trim_end().len());
            line
        })
        .collect()
}
