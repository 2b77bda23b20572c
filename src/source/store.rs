//! Sliceable line buffer with parent write-back
//!
//! A [`LineStore`] owns a run of [`Line`]s. Slicing produces a child
//! view with its own copy of the lines plus a link chain back to every
//! ancestor buffer. Removal operations (`pop`, `remove_range`)
//! replicate themselves up the chain at the mapped indices;
//! `trim_start`/`trim_end` only shrink the view itself and re-map the
//! chain. `disconnect` severs the chain.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::line::{normalize_text, Line};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineStoreError {
    OutOfRange { index: usize, len: usize },
    BadTrim { n: usize, len: usize },
}

impl fmt::Display for LineStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineStoreError::OutOfRange { index, len } => {
                write!(f, "line index {} out of range (len {})", index, len)
            }
            LineStoreError::BadTrim { n, len } => {
                write!(f, "cannot trim {} lines from a store of {}", n, len)
            }
        }
    }
}

impl std::error::Error for LineStoreError {}

/// Link to one ancestor buffer: removals at child index `i` map to
/// ancestor index `offset + i`.
#[derive(Clone)]
struct ParentLink {
    buf: Rc<RefCell<Vec<Line>>>,
    offset: usize,
}

pub struct LineStore {
    buf: Rc<RefCell<Vec<Line>>>,
    parents: Vec<ParentLink>,
}

impl fmt::Debug for LineStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LineStore")
            .field("lines", &self.buf.borrow().len())
            .field("parents", &self.parents.len())
            .finish()
    }
}

impl LineStore {
    pub fn new(lines: Vec<Line>) -> Self {
        Self {
            buf: Rc::new(RefCell::new(lines)),
            parents: Vec::new(),
        }
    }

    /// Build a store from raw source text. Lines are normalized per
    /// [`normalize_text`] and numbered from zero.
    pub fn from_source(
        text: &str,
        tab_width: usize,
        convert_whitespace: bool,
        source_id: &str,
    ) -> Self {
        let source: Rc<str> = Rc::from(source_id);
        let lines = normalize_text(text, tab_width, convert_whitespace)
            .into_iter()
            .enumerate()
            .map(|(offset, text)| Line::new(text, Rc::clone(&source), offset))
            .collect();
        Self::new(lines)
    }

    pub fn len(&self) -> usize {
        self.buf.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.borrow().is_empty()
    }

    pub fn line(&self, index: usize) -> Result<Line, LineStoreError> {
        self.buf.borrow().get(index).cloned().ok_or(LineStoreError::OutOfRange {
            index,
            len: self.len(),
        })
    }

    pub fn text(&self, index: usize) -> Result<String, LineStoreError> {
        Ok(self.line(index)?.text)
    }

    /// All line texts, in order.
    pub fn texts(&self) -> Vec<String> {
        self.buf.borrow().iter().map(|l| l.text.clone()).collect()
    }

    /// Provenance of line `index`. One past the end is allowed and
    /// yields the last line's source with no offset.
    pub fn info(&self, index: usize) -> Result<(Rc<str>, Option<usize>), LineStoreError> {
        let buf = self.buf.borrow();
        if let Some(line) = buf.get(index) {
            return Ok((Rc::clone(&line.source), Some(line.offset)));
        }
        if index == buf.len() {
            if let Some(last) = buf.last() {
                return Ok((Rc::clone(&last.source), None));
            }
        }
        Err(LineStoreError::OutOfRange {
            index,
            len: buf.len(),
        })
    }

    /// Child view over `start..end`. The child owns a copy of the
    /// lines; its parent chain points back through this view's own
    /// ancestors so that removals replicate everywhere.
    pub fn slice(&self, start: usize, end: usize) -> Self {
        let buf = self.buf.borrow();
        let end = end.min(buf.len());
        let start = start.min(end);
        let lines: Vec<Line> = buf[start..end].to_vec();
        let mut parents = Vec::with_capacity(self.parents.len() + 1);
        parents.push(ParentLink {
            buf: Rc::clone(&self.buf),
            offset: start,
        });
        for link in &self.parents {
            parents.push(ParentLink {
                buf: Rc::clone(&link.buf),
                offset: link.offset + start,
            });
        }
        Self {
            buf: Rc::new(RefCell::new(lines)),
            parents,
        }
    }

    /// Remove the first `n` lines from this view only. Ancestor links
    /// are re-based so later propagating edits still land correctly.
    pub fn trim_start(&mut self, n: usize) -> Result<(), LineStoreError> {
        let len = self.len();
        if n > len {
            return Err(LineStoreError::BadTrim { n, len });
        }
        self.buf.borrow_mut().drain(..n);
        for link in &mut self.parents {
            link.offset += n;
        }
        Ok(())
    }

    /// Remove the last `n` lines from this view only.
    pub fn trim_end(&mut self, n: usize) -> Result<(), LineStoreError> {
        let len = self.len();
        if n > len {
            return Err(LineStoreError::BadTrim { n, len });
        }
        self.buf.borrow_mut().truncate(len - n);
        Ok(())
    }

    /// Remove and return line `index`, replicating the removal into
    /// every linked ancestor.
    pub fn pop(&mut self, index: usize) -> Result<Line, LineStoreError> {
        let len = self.len();
        if index >= len {
            return Err(LineStoreError::OutOfRange { index, len });
        }
        let line = self.buf.borrow_mut().remove(index);
        for link in &self.parents {
            let mut parent = link.buf.borrow_mut();
            let mapped = link.offset + index;
            if mapped < parent.len() {
                parent.remove(mapped);
            }
        }
        Ok(line)
    }

    /// Remove `n` lines starting at `index`, with ancestor write-back.
    pub fn remove_range(&mut self, index: usize, n: usize) -> Result<(), LineStoreError> {
        let len = self.len();
        if index + n > len {
            return Err(LineStoreError::OutOfRange { index: index + n, len });
        }
        self.buf.borrow_mut().drain(index..index + n);
        for link in &self.parents {
            let mut parent = link.buf.borrow_mut();
            let start = (link.offset + index).min(parent.len());
            let end = (link.offset + index + n).min(parent.len());
            parent.drain(start..end);
        }
        Ok(())
    }

    /// Drop the parent chain; later edits stay local to this view.
    pub fn disconnect(&mut self) {
        self.parents.clear();
    }

    /// Strip `chars` leading characters from each line text starting at
    /// line `from`. Used to remove common indentation from a carved
    /// block; does not propagate.
    pub fn strip_left(&mut self, chars: usize, from: usize) {
        let mut buf = self.buf.borrow_mut();
        for line in buf.iter_mut().skip(from) {
            let cut = line
                .text
                .char_indices()
                .nth(chars)
                .map(|(i, _)| i)
                .unwrap_or(line.text.len());
            line.text.drain(..cut);
        }
    }

    /// Replace the text of line `index`, keeping its provenance.
    pub fn set_text(&mut self, index: usize, text: String) -> Result<(), LineStoreError> {
        let len = self.len();
        match self.buf.borrow_mut().get_mut(index) {
            Some(line) => {
                line.text = text;
                Ok(())
            }
            None => Err(LineStoreError::OutOfRange { index, len }),
        }
    }

    /// Append clones of another store's lines. No parent semantics.
    pub fn append_store(&mut self, other: &LineStore) {
        let mut buf = self.buf.borrow_mut();
        buf.extend(other.buf.borrow().iter().cloned());
    }

    pub fn push(&mut self, line: Line) {
        self.buf.borrow_mut().push(line);
    }

    /// Deep copy without parent links.
    pub fn detached_copy(&self) -> Self {
        Self::new(self.buf.borrow().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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
    fn test_from_source_join_round_trip() {
        let text = "alpha\n  beta\n\ngamma";
        let ls = LineStore::from_source(text, 8, false, "doc");
        assert_eq!(ls.texts().join("\n"), text);
    }

    #[test]
    fn test_info_one_past_end() {
        let ls = store(&["a", "b"]);
        let (source, offset) = ls.info(2).unwrap();
        assert_eq!(&*source, "test");
        assert_eq!(offset, None);
        assert!(ls.info(3).is_err());
    }

    #[test]
    fn test_slice_preserves_provenance() {
        let ls = store(&["a", "b", "c", "d"]);
        let child = ls.slice(1, 3);
        assert_eq!(child.len(), 2);
        assert_eq!(child.text(0).unwrap(), "b");
        assert_eq!(child.info(0).unwrap().1, Some(1));
    }

    #[test]
    fn test_pop_propagates_to_parent() {
        let ls = store(&["a", "b", "c", "d"]);
        let mut child = ls.slice(1, 4);
        let popped = child.pop(1).unwrap();
        assert_eq!(popped.text, "c");
        assert_eq!(ls.texts(), vec!["a", "b", "d"]);
    }

    #[test]
    fn test_pop_propagates_two_levels() {
        let ls = store(&["a", "b", "c", "d", "e"]);
        let child = ls.slice(1, 5);
        let mut grandchild = child.slice(1, 4);
        grandchild.pop(0).unwrap();
        assert_eq!(child.texts(), vec!["b", "d", "e"]);
        assert_eq!(ls.texts(), vec!["a", "b", "d", "e"]);
    }

    #[test]
    fn test_trim_start_does_not_propagate_but_remaps() {
        let ls = store(&["a", "b", "c", "d"]);
        let mut child = ls.slice(0, 4);
        child.trim_start(2).unwrap();
        assert_eq!(ls.len(), 4);
        // After the trim, child index 0 is parent index 2.
        child.pop(0).unwrap();
        assert_eq!(ls.texts(), vec!["a", "b", "d"]);
    }

    #[test]
    fn test_trim_errors() {
        let mut ls = store(&["a"]);
        assert!(matches!(
            ls.trim_start(2),
            Err(LineStoreError::BadTrim { .. })
        ));
        assert!(matches!(ls.trim_end(5), Err(LineStoreError::BadTrim { .. })));
    }

    #[test]
    fn test_disconnect_stops_propagation() {
        let ls = store(&["a", "b", "c"]);
        let mut child = ls.slice(0, 3);
        child.disconnect();
        child.pop(0).unwrap();
        assert_eq!(ls.len(), 3);
    }

    #[test]
    fn test_strip_left_skips_first() {
        let mut ls = store(&["first", "  second", "  third"]);
        ls.strip_left(2, 1);
        assert_eq!(ls.texts(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_out_of_range_access() {
        let ls = store(&["a"]);
        assert!(matches!(
            ls.line(7),
            Err(LineStoreError::OutOfRange { .. })
        ));
    }
}
