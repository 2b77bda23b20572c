//! Line-driven state machine
//!
//! The [`StateMachine`] walks a [`LineStore`] one line at a time,
//! matching each line against the current state's ordered transition
//! patterns and dispatching to the matching handler. Handlers steer
//! the machine through [`RunControl`]: end-of-block, transition
//! retries, and state corrections are ordinary control flow here, not
//! errors. Nested machines parse carved-out sub-blocks and return to a
//! one-slot reuse pool.

pub mod indent;

pub use indent::{get_indented, get_text_block, IndentedBlock, UnexpectedIndentation};

use crate::parser::ParseContext;
use crate::source::{LineStore, LineStoreError};
use crate::states::{self, StateKind};
use std::fmt;

/// A defect in the parser itself (no transition matched, an impossible
/// enumerator, an index off the rails). Not produced by malformed
/// input.
#[derive(Debug, Clone, PartialEq)]
pub struct ParserBug(pub String);

impl fmt::Display for ParserBug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "internal parser error: {}", self.0)
    }
}

impl std::error::Error for ParserBug {}

impl From<LineStoreError> for ParserBug {
    fn from(err: LineStoreError) -> Self {
        ParserBug(err.to_string())
    }
}

/// Control flow raised by transition handlers.
#[derive(Debug)]
pub enum RunControl {
    /// The current block is finished; the state's end-of-file hook
    /// still runs, then the machine stops.
    Eof,
    /// Re-examine the current line against a single named transition.
    TransitionCorrection(&'static str),
    /// Switch states and re-examine the current line, optionally
    /// restricted to one named transition.
    StateCorrection(StateKind, Option<&'static str>),
    /// Programming error; aborts the parse.
    Bug(String),
}

impl From<ParserBug> for RunControl {
    fn from(bug: ParserBug) -> Self {
        RunControl::Bug(bug.0)
    }
}

/// Signal that the cursor moved past the last line.
#[derive(Debug)]
pub struct AtEof;

pub struct StateMachine {
    pub store: LineStore,
    /// Index of the current line; -1 before the first `next_line`.
    pub line_offset: isize,
    /// Absolute offset of `store[0]` in the original input.
    pub input_offset: usize,
    /// Node new content is attached to.
    pub node: crate::document::NodeId,
    /// Whether section titles are recognized in this block.
    pub match_titles: bool,
    pub initial_state: StateKind,
    /// Per-machine working data for the specialized list states.
    pub scratch: states::Scratch,
    observers: Vec<Box<dyn FnMut(Option<&str>, Option<usize>)>>,
    pool: Option<Box<StateMachine>>,
}

impl fmt::Debug for StateMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateMachine")
            .field("line_offset", &self.line_offset)
            .field("input_offset", &self.input_offset)
            .field("initial_state", &self.initial_state)
            .field("lines", &self.store.len())
            .finish()
    }
}

impl StateMachine {
    pub fn new(
        store: LineStore,
        input_offset: usize,
        node: crate::document::NodeId,
        initial_state: StateKind,
        match_titles: bool,
    ) -> Self {
        Self {
            store,
            line_offset: -1,
            input_offset,
            node,
            match_titles,
            initial_state,
            scratch: states::Scratch::default(),
            observers: Vec::new(),
            pool: None,
        }
    }

    /// Run the machine to completion over its line store.
    pub fn run(&mut self, ctx: &mut ParseContext) -> Result<(), ParserBug> {
        self.line_offset = -1;
        let mut state = self.initial_state;
        let mut context: Vec<String> = Vec::new();
        let mut restrict: Option<&'static str> = None;
        loop {
            if ctx.halted() {
                // Flush whatever the current state holds, then stop;
                // corrections are not honored past the halt level.
                match states::state_eof(self, ctx, state, &mut context) {
                    Err(RunControl::Bug(message)) => return Err(ParserBug(message)),
                    _ => break,
                }
            }
            let step = if self.next_line(1).is_err() {
                Err(RunControl::Eof)
            } else {
                states::check_line(self, ctx, state, &mut context, restrict)
            };
            match step {
                Ok(next) => {
                    state = next;
                    restrict = None;
                }
                Err(RunControl::Eof) => {
                    // The end-of-file hook may itself ask for the line
                    // to be reassessed in another state.
                    match states::state_eof(self, ctx, state, &mut context) {
                        Ok(()) => break,
                        Err(RunControl::Eof) => break,
                        Err(RunControl::TransitionCorrection(name)) => {
                            self.previous_line(1);
                            restrict = Some(name);
                        }
                        Err(RunControl::StateCorrection(new_state, name)) => {
                            self.previous_line(1);
                            state = new_state;
                            restrict = name;
                        }
                        Err(RunControl::Bug(message)) => return Err(ParserBug(message)),
                    }
                }
                Err(RunControl::TransitionCorrection(name)) => {
                    self.previous_line(1);
                    restrict = Some(name);
                }
                Err(RunControl::StateCorrection(new_state, name)) => {
                    self.previous_line(1);
                    state = new_state;
                    restrict = name;
                }
                Err(RunControl::Bug(message)) => return Err(ParserBug(message)),
            }
        }
        Ok(())
    }

    // --- Cursor ---

    fn index(&self) -> Option<usize> {
        if self.line_offset < 0 {
            None
        } else {
            Some(self.line_offset as usize)
        }
    }

    /// Text of the current line; empty when the cursor is off the ends.
    pub fn current_text(&self) -> String {
        self.index()
            .and_then(|i| self.store.text(i).ok())
            .unwrap_or_default()
    }

    pub fn next_line(&mut self, n: usize) -> Result<(), AtEof> {
        self.line_offset += n as isize;
        let result = if self.line_offset >= self.store.len() as isize {
            Err(AtEof)
        } else {
            Ok(())
        };
        self.notify_observers();
        result
    }

    pub fn previous_line(&mut self, n: usize) {
        self.line_offset -= n as isize;
        self.notify_observers();
    }

    /// Jump to an absolute line offset (relative to the original
    /// input, not this machine's slice).
    pub fn goto_line(&mut self, abs_offset: usize) {
        self.line_offset = abs_offset as isize - self.input_offset as isize;
        self.notify_observers();
    }

    pub fn at_eof(&self) -> bool {
        self.line_offset >= self.store.len() as isize - 1
    }

    pub fn is_next_line_blank(&self) -> bool {
        match self.index() {
            Some(i) => self
                .store
                .line(i + 1)
                .map(|l| l.is_blank())
                .unwrap_or(false),
            None => false,
        }
    }

    pub fn abs_line_offset(&self) -> usize {
        (self.line_offset + self.input_offset as isize).max(0) as usize
    }

    pub fn abs_line_number(&self) -> usize {
        self.abs_line_offset() + 1
    }

    /// Provenance for `lineno` (1-based, absolute) or the current line.
    pub fn get_source_and_line(&self, lineno: Option<usize>) -> (Option<String>, Option<usize>) {
        let index = match lineno {
            Some(l) => l as isize - 1 - self.input_offset as isize,
            None => self.line_offset,
        };
        if index < 0 {
            return (None, None);
        }
        match self.store.info(index as usize) {
            Ok((source, offset)) => (Some(source.to_string()), offset.map(|o| o + 1)),
            Err(_) => (None, None),
        }
    }

    // --- Observers ---

    pub fn attach_observer(&mut self, observer: Box<dyn FnMut(Option<&str>, Option<usize>)>) {
        self.observers.push(observer);
    }

    fn notify_observers(&mut self) {
        if self.observers.is_empty() {
            return;
        }
        let info = self
            .index()
            .and_then(|i| self.store.info(i).ok())
            .map(|(source, offset)| (source.to_string(), offset.map(|o| o + 1)));
        for observer in &mut self.observers {
            match &info {
                Some((source, line)) => observer(Some(source), *line),
                None => observer(None, None),
            }
        }
    }

    // --- Block extraction ---

    /// Contiguous text block starting at the current line. Advances
    /// the cursor to the block's last line, also on failure.
    pub fn get_text_block(&mut self, flush_left: bool) -> Result<LineStore, UnexpectedIndentation> {
        let start = self.index().unwrap_or(0);
        match get_text_block(&self.store, start, flush_left) {
            Ok(block) => {
                if !block.is_empty() {
                    let _ = self.next_line(block.len() - 1);
                }
                Ok(block)
            }
            Err(err) => {
                if !err.block.is_empty() {
                    let _ = self.next_line(err.block.len() - 1);
                }
                Err(err)
            }
        }
    }

    /// Indented block at the current line, indent discovered from
    /// content. Returns `(block, indent, abs_offset, blank_finish)`.
    pub fn get_indented(
        &mut self,
        until_blank: bool,
        strip_indent: bool,
    ) -> (LineStore, usize, usize, bool) {
        let mut offset = self.abs_line_offset();
        let start = self.index().unwrap_or(0);
        let result = get_indented(&self.store, start, until_blank, strip_indent, None, None);
        let IndentedBlock {
            mut block,
            indent,
            blank_finish,
        } = result;
        if !block.is_empty() {
            let _ = self.next_line(block.len() - 1);
        }
        while !block.is_empty() && block.line(0).map(|l| l.is_blank()).unwrap_or(false) {
            block.trim_start(1).expect("non-empty block");
            offset += 1;
        }
        (block, indent, offset, blank_finish)
    }

    /// Indented block whose indent is known for every line.
    pub fn get_known_indented(
        &mut self,
        indent: usize,
        until_blank: bool,
        strip_indent: bool,
    ) -> (LineStore, usize, bool) {
        let mut offset = self.abs_line_offset();
        let start = self.index().unwrap_or(0);
        let result = get_indented(
            &self.store,
            start,
            until_blank,
            strip_indent,
            Some(indent),
            None,
        );
        let IndentedBlock {
            mut block,
            blank_finish,
            ..
        } = result;
        if !block.is_empty() {
            let _ = self.next_line(block.len() - 1);
        }
        while !block.is_empty() && block.line(0).map(|l| l.is_blank()).unwrap_or(false) {
            block.trim_start(1).expect("non-empty block");
            offset += 1;
        }
        (block, offset, blank_finish)
    }

    /// Indented block where only the first line's indent is known.
    /// Returns `(block, indent, abs_offset, blank_finish)`.
    pub fn get_first_known_indented(
        &mut self,
        indent: usize,
        until_blank: bool,
        strip_indent: bool,
        strip_top: bool,
    ) -> (LineStore, usize, usize, bool) {
        let mut offset = self.abs_line_offset();
        let start = self.index().unwrap_or(0);
        let result = get_indented(
            &self.store,
            start,
            until_blank,
            strip_indent,
            None,
            Some(indent),
        );
        let IndentedBlock {
            mut block,
            indent,
            blank_finish,
        } = result;
        if !block.is_empty() {
            let _ = self.next_line(block.len() - 1);
        }
        if strip_top {
            while !block.is_empty() && block.line(0).map(|l| l.is_blank()).unwrap_or(false) {
                block.trim_start(1).expect("non-empty block");
                offset += 1;
            }
        }
        (block, indent, offset, blank_finish)
    }

    // --- Nested machine pool ---

    /// Take a machine for a nested parse, reusing the pooled one when
    /// the requested configuration is the default.
    pub fn take_nested(
        &mut self,
        store: LineStore,
        input_offset: usize,
        node: crate::document::NodeId,
        initial_state: StateKind,
        match_titles: bool,
    ) -> Box<StateMachine> {
        if initial_state == StateKind::Body {
            if let Some(mut machine) = self.pool.take() {
                machine.store = store;
                machine.line_offset = -1;
                machine.input_offset = input_offset;
                machine.node = node;
                machine.match_titles = match_titles;
                machine.initial_state = initial_state;
                machine.scratch = states::Scratch::default();
                return machine;
            }
        }
        Box::new(StateMachine::new(
            store,
            input_offset,
            node,
            initial_state,
            match_titles,
        ))
    }

    /// Return a nested machine to the pool. Only default-configured
    /// machines are retained.
    pub fn put_nested(&mut self, machine: Box<StateMachine>) {
        if machine.initial_state == StateKind::Body && self.pool.is_none() {
            self.pool = Some(machine);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::NodeId;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn machine(text: &str) -> StateMachine {
        let store = LineStore::from_source(text, 8, false, "test");
        StateMachine::new(store, 0, NodeId(0), StateKind::Body, true)
    }

    #[test]
    fn test_cursor_movement() {
        let mut sm = machine("a\nb\nc");
        assert!(sm.next_line(1).is_ok());
        assert_eq!(sm.current_text(), "a");
        assert_eq!(sm.abs_line_number(), 1);
        assert!(sm.next_line(2).is_ok());
        assert_eq!(sm.current_text(), "c");
        assert!(sm.at_eof());
        assert!(sm.next_line(1).is_err());
    }

    #[test]
    fn test_previous_and_goto() {
        let mut sm = machine("a\nb\nc");
        sm.next_line(2).unwrap();
        sm.previous_line(1);
        assert_eq!(sm.current_text(), "a");
        sm.goto_line(2);
        assert_eq!(sm.current_text(), "c");
    }

    #[test]
    fn test_is_next_line_blank() {
        let mut sm = machine("a\n\nb");
        sm.next_line(1).unwrap();
        assert!(sm.is_next_line_blank());
    }

    #[test]
    fn test_get_source_and_line() {
        let mut sm = machine("a\nb");
        sm.next_line(2).unwrap();
        let (source, line) = sm.get_source_and_line(None);
        assert_eq!(source.as_deref(), Some("test"));
        assert_eq!(line, Some(2));
    }

    #[test]
    fn test_observer_sees_moves() {
        let mut sm = machine("a\nb");
        let seen: Rc<RefCell<Vec<Option<usize>>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        sm.attach_observer(Box::new(move |_, line| sink.borrow_mut().push(line)));
        sm.next_line(1).unwrap();
        sm.next_line(1).unwrap();
        assert_eq!(&*seen.borrow(), &[Some(1), Some(2)]);
    }

    #[test]
    fn test_get_indented_advances_cursor() {
        let mut sm = machine("  a\n  b\nnext");
        sm.next_line(1).unwrap();
        let (block, indent, offset, blank_finish) = sm.get_indented(false, true);
        assert_eq!(block.texts(), vec!["a", "b"]);
        assert_eq!(indent, 2);
        assert_eq!(offset, 0);
        assert!(!blank_finish);
        assert_eq!(sm.current_text(), "  b");
    }

    #[test]
    fn test_nested_pool_reuse() {
        let mut sm = machine("a");
        let store = LineStore::from_source("x", 8, false, "test");
        let nested = sm.take_nested(store, 0, NodeId(0), StateKind::Body, false);
        sm.put_nested(nested);
        let store = LineStore::from_source("y", 8, false, "test");
        let reused = sm.take_nested(store, 5, NodeId(0), StateKind::Body, false);
        assert_eq!(reused.input_offset, 5);
        assert_eq!(reused.store.texts(), vec!["y"]);
    }
}
