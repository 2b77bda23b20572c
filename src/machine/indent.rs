//! Text-block and indented-block extraction
//!
//! Pure functions over a [`LineStore`]: carve out the maximal
//! contiguous text block at a position, or the maximal indented block,
//! computing the common indentation and whether the block ended on a
//! blank line.

use crate::source::LineStore;
use std::rc::Rc;

/// A text block ran into an indented line while `flush_left` was
/// required. Carries the partial block and the offender's provenance.
#[derive(Debug)]
pub struct UnexpectedIndentation {
    pub block: LineStore,
    pub source: Option<Rc<str>>,
    pub line: Option<usize>,
}

/// Result of [`get_indented`].
pub struct IndentedBlock {
    pub block: LineStore,
    pub indent: usize,
    pub blank_finish: bool,
}

/// Maximal run of contiguous non-blank lines starting at `start`.
///
/// With `flush_left`, a line starting with a space aborts the run.
pub fn get_text_block(
    store: &LineStore,
    start: usize,
    flush_left: bool,
) -> Result<LineStore, UnexpectedIndentation> {
    let len = store.len();
    let mut end = start;
    while end < len {
        let line = store.line(end).expect("line within bounds");
        if line.is_blank() {
            break;
        }
        if flush_left && line.text.starts_with(' ') {
            let (source, offset) = store
                .info(end)
                .map(|(s, o)| (Some(s), o))
                .unwrap_or((None, None));
            return Err(UnexpectedIndentation {
                block: store.slice(start, end),
                source,
                line: offset.map(|o| o + 1),
            });
        }
        end += 1;
    }
    Ok(store.slice(start, end))
}

/// Extract an indented block starting at `start`.
///
/// A non-blank line ends the block when it has no leading space, or,
/// given `block_indent`, when its first `block_indent` columns contain
/// non-space. With `until_blank`, a blank line also ends it. The
/// returned indent is `block_indent` if given, else the minimum
/// leading-space count over indented lines. With `strip_indent` the
/// common indent is removed (and `first_indent` characters from the
/// first line, when known).
pub fn get_indented(
    store: &LineStore,
    start: usize,
    until_blank: bool,
    strip_indent: bool,
    block_indent: Option<usize>,
    first_indent: Option<usize>,
) -> IndentedBlock {
    let mut indent = block_indent;
    let first_indent = match (block_indent, first_indent) {
        (Some(bi), None) => Some(bi),
        (_, fi) => fi,
    };
    let len = store.len();
    let mut end = start;
    if first_indent.is_some() && end < len {
        end += 1;
    }
    let mut blank_finish = true;
    while end < len {
        let line = store.line(end).expect("line within bounds");
        let over_boundary = match block_indent {
            Some(bi) => {
                let head: String = line.text.chars().take(bi).collect();
                !head.trim().is_empty()
            }
            None => !line.text.starts_with(' '),
        };
        if !line.text.is_empty() && over_boundary {
            blank_finish = end > start
                && store
                    .line(end - 1)
                    .map(|prev| prev.is_blank())
                    .unwrap_or(false);
            break;
        }
        if line.is_blank() {
            if until_blank {
                blank_finish = true;
                break;
            }
        } else if block_indent.is_none() {
            let line_indent = line.indent();
            indent = Some(match indent {
                Some(current) => current.min(line_indent),
                None => line_indent,
            });
        }
        end += 1;
    }

    let mut block = store.slice(start, end);
    if let Some(fi) = first_indent {
        if !block.is_empty() {
            let first = block.line(0).expect("non-empty block");
            let cut = first
                .text
                .char_indices()
                .nth(fi)
                .map(|(i, _)| i)
                .unwrap_or(first.text.len());
            let stripped = first.text[cut..].to_string();
            block.set_text(0, stripped).expect("non-empty block");
        }
    }
    let indent = indent.unwrap_or(0);
    if indent > 0 && strip_indent {
        let from = usize::from(first_indent.is_some());
        block.strip_left(indent, from);
    }
    IndentedBlock {
        block,
        indent,
        blank_finish,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Line;

    fn store(texts: &[&str]) -> LineStore {
        let source: Rc<str> = Rc::from("test");
        LineStore::new(
            texts
                .iter()
                .enumerate()
                .map(|(i, t)| Line::new(*t, Rc::clone(&source), i))
                .collect(),
        )
    }

    #[test]
    fn test_text_block_stops_at_blank() {
        let ls = store(&["one", "two", "", "three"]);
        let block = get_text_block(&ls, 0, false).unwrap();
        assert_eq!(block.texts(), vec!["one", "two"]);
    }

    #[test]
    fn test_text_block_flush_left_rejects_indent() {
        let ls = store(&["one", "  two"]);
        let err = get_text_block(&ls, 0, true).unwrap_err();
        assert_eq!(err.block.texts(), vec!["one"]);
        assert_eq!(err.line, Some(2));
    }

    #[test]
    fn test_indented_minimum_indent() {
        let ls = store(&["    a", "  b", "      c", "next"]);
        let result = get_indented(&ls, 0, false, true, None, None);
        assert_eq!(result.indent, 2);
        assert_eq!(result.block.texts(), vec!["  a", "b", "    c"]);
        assert!(!result.blank_finish);
    }

    #[test]
    fn test_indented_blank_finish_at_eof() {
        let ls = store(&["  a", "  b"]);
        let result = get_indented(&ls, 0, false, true, None, None);
        assert!(result.blank_finish);
        assert_eq!(result.block.texts(), vec!["a", "b"]);
    }

    #[test]
    fn test_indented_blank_finish_before_unindented() {
        let ls = store(&["  a", "", "next"]);
        let result = get_indented(&ls, 0, false, true, None, None);
        assert!(result.blank_finish);
        assert_eq!(result.block.texts(), vec!["a", ""]);
    }

    #[test]
    fn test_indented_until_blank() {
        let ls = store(&["  a", "", "  b"]);
        let result = get_indented(&ls, 0, true, true, None, None);
        assert_eq!(result.block.texts(), vec!["a"]);
        assert!(result.blank_finish);
    }

    #[test]
    fn test_known_block_indent_boundary() {
        // With block_indent=3, a line with text inside the first three
        // columns terminates the block.
        let ls = store(&["   a", "   b", "  c"]);
        let result = get_indented(&ls, 0, false, true, Some(3), None);
        assert_eq!(result.block.texts(), vec!["a", "b"]);
        assert_eq!(result.indent, 3);
    }

    #[test]
    fn test_first_known_indent() {
        // ".. foo" style: the first line's indent is known (3), the
        // rest find their own common indent.
        let ls = store(&[".. comment text", "   more", "   lines"]);
        let result = get_indented(&ls, 0, false, true, None, Some(3));
        assert_eq!(result.block.texts(), vec!["comment text", "more", "lines"]);
        assert_eq!(result.indent, 3);
    }

    #[test]
    fn test_strip_indent_property() {
        let ls = store(&["   x", "    y"]);
        let result = get_indented(&ls, 0, false, true, None, None);
        let min_indent = result
            .block
            .texts()
            .iter()
            .filter(|t| !t.trim().is_empty())
            .map(|t| t.chars().take_while(|&c| c == ' ').count())
            .min()
            .unwrap();
        assert_eq!(min_indent, 0);
        assert_eq!(result.indent, 3);
    }
}
