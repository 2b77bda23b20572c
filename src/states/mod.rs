//! Block-level parser states
//!
//! One [`StateKind`] per parsing situation, each with an ordered
//! transition table. The Body state classifies the first line of any
//! block; the specialized list states accept only "more of the same"
//! and hand anything else back to their parent machine; the Text and
//! Line states classify the second line of a text block (paragraph,
//! definition list item, or section title).

pub mod body;
pub mod explicit;
pub mod lists;
pub mod patterns;
pub mod text;

use crate::diagnostics::Severity;
use crate::document::{NodeId, NodeKind};
use crate::machine::{ParserBug, RunControl, StateMachine};
use crate::parser::{ParseContext, MAX_NESTING_DEPTH};
use crate::source::LineStore;
use once_cell::sync::Lazy;
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateKind {
    Body,
    BulletList,
    DefinitionList,
    EnumeratedList,
    FieldList,
    OptionList,
    LineBlock,
    ExtensionOptions,
    Explicit,
    Text,
    Definition,
    Line,
    SubstitutionDef,
}

/// Per-machine working data for the specialized states.
#[derive(Debug, Clone, Default)]
pub struct Scratch {
    /// Did the construct this machine is parsing end with a blank
    /// line (or end-of-input)?
    pub blank_finish: bool,
    /// Enumerated-list continuation data.
    pub enumerator: Option<lists::EnumScratch>,
    /// Set while a section is being parsed, so the Line state's
    /// end-of-file hook does not emit a trailing transition.
    pub suppress_eof_transition: bool,
}

pub struct TransitionMatch<'t> {
    pub name: &'static str,
    pub captures: regex::Captures<'t>,
    pub text: &'t str,
    /// Default next state from the transition table; handlers may
    /// override it in their return value.
    pub next: StateKind,
}

impl<'t> TransitionMatch<'t> {
    /// End of the whole match, in bytes.
    pub fn end(&self) -> usize {
        self.captures.get(0).map(|m| m.end()).unwrap_or(0)
    }

    /// Width of the matched marker in characters. Block patterns are
    /// line-anchored, so this is also the indent column of whatever
    /// follows the marker.
    pub fn char_end(&self) -> usize {
        self.captures
            .get(0)
            .map(|m| m.as_str().chars().count())
            .unwrap_or(0)
    }
}

pub type TransitionFn = fn(
    &mut StateMachine,
    &mut ParseContext,
    &TransitionMatch<'_>,
    &mut Vec<String>,
) -> Result<StateKind, RunControl>;

pub struct Transition {
    pub name: &'static str,
    pub pattern: &'static Lazy<Regex>,
    pub handler: TransitionFn,
    pub next: StateKind,
}

macro_rules! transitions {
    ($(($name:literal, $pattern:path, $handler:path, $next:expr)),* $(,)?) => {
        &[$(Transition {
            name: $name,
            pattern: &$pattern,
            handler: $handler,
            next: $next,
        }),*]
    };
}

static BODY: &[Transition] = transitions![
    ("blank", patterns::BLANK, body::blank, StateKind::Body),
    ("indent", patterns::INDENT, body::indent, StateKind::Body),
    ("bullet", patterns::BULLET, body::bullet, StateKind::Body),
    ("enumerator", patterns::ENUMERATOR, body::enumerator, StateKind::Body),
    ("field_marker", patterns::FIELD_MARKER, body::field_marker, StateKind::Body),
    ("option_marker", patterns::OPTION_MARKER, body::option_marker, StateKind::Body),
    ("doctest", patterns::DOCTEST, body::doctest, StateKind::Body),
    ("line_block", patterns::LINE_BLOCK, body::line_block, StateKind::Body),
    ("explicit_markup", patterns::EXPLICIT_MARKUP, body::explicit_markup, StateKind::Body),
    ("anonymous", patterns::ANONYMOUS, body::anonymous, StateKind::Body),
    ("line", patterns::LINE, body::line, StateKind::Body),
    ("text", patterns::TEXT, body::text, StateKind::Body),
];

static BULLET_LIST: &[Transition] = transitions![
    ("blank", patterns::BLANK, body::blank, StateKind::BulletList),
    ("bullet", patterns::BULLET, lists::bullet_item, StateKind::BulletList),
    ("text", patterns::TEXT, invalid_list_input, StateKind::BulletList),
];

static DEFINITION_LIST: &[Transition] = transitions![
    ("blank", patterns::BLANK, body::blank, StateKind::DefinitionList),
    ("text", patterns::TEXT, lists::definition_text, StateKind::DefinitionList),
];

static ENUMERATED_LIST: &[Transition] = transitions![
    ("blank", patterns::BLANK, body::blank, StateKind::EnumeratedList),
    ("enumerator", patterns::ENUMERATOR, lists::enumerator_item, StateKind::EnumeratedList),
    ("text", patterns::TEXT, invalid_list_input, StateKind::EnumeratedList),
];

static FIELD_LIST: &[Transition] = transitions![
    ("blank", patterns::BLANK, body::blank, StateKind::FieldList),
    ("field_marker", patterns::FIELD_MARKER, lists::field_item, StateKind::FieldList),
    ("text", patterns::TEXT, invalid_list_input, StateKind::FieldList),
];

static OPTION_LIST: &[Transition] = transitions![
    ("blank", patterns::BLANK, body::blank, StateKind::OptionList),
    ("option_marker", patterns::OPTION_MARKER, lists::option_item, StateKind::OptionList),
    ("text", patterns::TEXT, invalid_list_input, StateKind::OptionList),
];

static LINE_BLOCK: &[Transition] = transitions![
    ("line_block", patterns::LINE_BLOCK, lists::line_block_item, StateKind::LineBlock),
    ("text", patterns::TEXT, invalid_list_input, StateKind::LineBlock),
];

static EXTENSION_OPTIONS: &[Transition] = transitions![
    ("blank", patterns::BLANK, body::blank, StateKind::ExtensionOptions),
    ("field_marker", patterns::FIELD_MARKER, lists::extension_option_field, StateKind::ExtensionOptions),
    ("text", patterns::TEXT, invalid_list_input, StateKind::ExtensionOptions),
];

static EXPLICIT: &[Transition] = transitions![
    ("explicit_markup", patterns::EXPLICIT_MARKUP, explicit::explicit_item, StateKind::Explicit),
    ("anonymous", patterns::ANONYMOUS, explicit::anonymous_item, StateKind::Explicit),
    ("text", patterns::TEXT, invalid_list_input, StateKind::Explicit),
];

static TEXT_STATE: &[Transition] = transitions![
    ("blank", patterns::BLANK, text::blank, StateKind::Body),
    ("indent", patterns::INDENT, text::indent, StateKind::Body),
    ("underline", patterns::LINE, text::underline, StateKind::Body),
    ("text", patterns::TEXT, text::text, StateKind::Body),
];

static DEFINITION: &[Transition] = transitions![
    ("blank", patterns::BLANK, invalid_text_input, StateKind::Definition),
    ("indent", patterns::INDENT, text::definition_indent, StateKind::DefinitionList),
    ("underline", patterns::LINE, invalid_text_input, StateKind::Definition),
    ("text", patterns::TEXT, invalid_text_input, StateKind::Definition),
];

static LINE_STATE: &[Transition] = transitions![
    ("blank", patterns::BLANK, text::line_blank, StateKind::Body),
    ("indent", patterns::INDENT, text::line_text, StateKind::Body),
    ("underline", patterns::LINE, text::line_underline, StateKind::Body),
    ("text", patterns::TEXT, text::line_text, StateKind::Body),
];

static SUBSTITUTION_DEF: &[Transition] = transitions![
    ("blank", patterns::BLANK, body::blank, StateKind::SubstitutionDef),
    ("indent", patterns::INDENT, body::indent, StateKind::SubstitutionDef),
    ("embedded_directive", patterns::EMBEDDED_DIRECTIVE, explicit::embedded_directive, StateKind::SubstitutionDef),
    ("text", patterns::TEXT, explicit::substitution_text, StateKind::SubstitutionDef),
];

pub fn transitions_for(state: StateKind) -> &'static [Transition] {
    match state {
        StateKind::Body => BODY,
        StateKind::BulletList => BULLET_LIST,
        StateKind::DefinitionList => DEFINITION_LIST,
        StateKind::EnumeratedList => ENUMERATED_LIST,
        StateKind::FieldList => FIELD_LIST,
        StateKind::OptionList => OPTION_LIST,
        StateKind::LineBlock => LINE_BLOCK,
        StateKind::ExtensionOptions => EXTENSION_OPTIONS,
        StateKind::Explicit => EXPLICIT,
        StateKind::Text => TEXT_STATE,
        StateKind::Definition => DEFINITION,
        StateKind::Line => LINE_STATE,
        StateKind::SubstitutionDef => SUBSTITUTION_DEF,
    }
}

/// Not a member of the current compound element: back up one line and
/// end this machine so the parent can reassess.
fn invalid_list_input(
    sm: &mut StateMachine,
    _ctx: &mut ParseContext,
    _mtch: &TransitionMatch<'_>,
    _context: &mut Vec<String>,
) -> Result<StateKind, RunControl> {
    sm.previous_line(1);
    Err(RunControl::Eof)
}

/// Text-variant abort: the machine ends without backing up; the
/// state's end-of-file hook decides how far to rewind.
fn invalid_text_input(
    _sm: &mut StateMachine,
    _ctx: &mut ParseContext,
    _mtch: &TransitionMatch<'_>,
    _context: &mut Vec<String>,
) -> Result<StateKind, RunControl> {
    Err(RunControl::Eof)
}

/// Match the current line against the state's ordered transitions and
/// dispatch. A missing match is a parser defect: the fallback `text`
/// transitions match any line.
pub fn check_line(
    sm: &mut StateMachine,
    ctx: &mut ParseContext,
    state: StateKind,
    context: &mut Vec<String>,
    restrict: Option<&'static str>,
) -> Result<StateKind, RunControl> {
    let line = sm.current_text();
    for transition in transitions_for(state) {
        if let Some(name) = restrict {
            if transition.name != name {
                continue;
            }
        }
        if let Some(captures) = transition.pattern.captures(&line) {
            let mtch = TransitionMatch {
                name: transition.name,
                captures,
                text: &line,
                next: transition.next,
            };
            return (transition.handler)(sm, ctx, &mtch, context);
        }
    }
    Err(RunControl::Bug(format!(
        "no transition pattern match in state {:?} for line {:?}",
        state, line
    )))
}

/// End-of-input (or construct abort) hook per state. May return a
/// correction, which the run loop honors like one raised mid-stream.
pub fn state_eof(
    sm: &mut StateMachine,
    ctx: &mut ParseContext,
    state: StateKind,
    context: &mut Vec<String>,
) -> Result<(), RunControl> {
    match state {
        StateKind::Text => text::text_eof(sm, ctx, context),
        StateKind::Definition => {
            // Not a definition after all: let the parent reassess the
            // would-be term line.
            sm.previous_line(2);
            Ok(())
        }
        StateKind::Line => text::line_eof(sm, ctx, context),
        _ => Ok(()),
    }
}

/// Run a nested machine over `store`, attaching into `node`. Returns
/// the absolute line offset where the nested machine stopped.
pub fn nested_parse(
    sm: &mut StateMachine,
    ctx: &mut ParseContext,
    store: LineStore,
    input_offset: usize,
    node: NodeId,
    match_titles: bool,
) -> Result<usize, ParserBug> {
    if ctx.nested_depth >= MAX_NESTING_DEPTH {
        let lineno = sm.abs_line_number();
        let msg = ctx.system_message(
            Severity::Severe,
            "Nesting depth exceeded; content not parsed.",
            Some(lineno),
        );
        ctx.document.append(node, msg);
        return Ok(input_offset + store.len());
    }
    ctx.nested_depth += 1;
    let mut nested = sm.take_nested(store, input_offset, node, StateKind::Body, match_titles);
    let result = nested.run(ctx);
    let new_offset = nested.abs_line_offset();
    sm.put_nested(nested);
    ctx.nested_depth -= 1;
    result?;
    Ok(new_offset)
}

/// Run a nested machine in a specialized list state, tracking the
/// blank-finish flag. Returns `(abs_offset, blank_finish)`.
pub fn nested_list_parse(
    sm: &mut StateMachine,
    ctx: &mut ParseContext,
    store: LineStore,
    input_offset: usize,
    node: NodeId,
    initial_state: StateKind,
    blank_finish: bool,
    enumerator: Option<lists::EnumScratch>,
    match_titles: bool,
) -> Result<(usize, bool), ParserBug> {
    if ctx.nested_depth >= MAX_NESTING_DEPTH {
        return Ok((input_offset + store.len(), blank_finish));
    }
    ctx.nested_depth += 1;
    let mut nested = sm.take_nested(store, input_offset, node, initial_state, match_titles);
    nested.scratch.blank_finish = blank_finish;
    nested.scratch.enumerator = enumerator;
    let result = nested.run(ctx);
    let new_offset = nested.abs_line_offset();
    let blank_finish = nested.scratch.blank_finish;
    sm.put_nested(nested);
    ctx.nested_depth -= 1;
    result?;
    Ok((new_offset, blank_finish))
}

/// "X ends without a blank line; unexpected unindent." one line below.
pub fn unindent_warning(
    sm: &mut StateMachine,
    ctx: &mut ParseContext,
    construct: &str,
) -> NodeId {
    let lineno = sm.abs_line_number() + 1;
    ctx.system_message(
        Severity::Warning,
        &format!("{} ends without a blank line; unexpected unindent.", construct),
        Some(lineno),
    )
}

/// A system message with a literal-block copy of the offending text.
pub fn message_with_literal(
    ctx: &mut ParseContext,
    severity: Severity,
    message: &str,
    block_text: &str,
    line: Option<usize>,
) -> NodeId {
    let msg = ctx.system_message(severity, message, line);
    let literal = ctx
        .document
        .new_node(NodeKind::LiteralBlock, block_text.to_string());
    ctx.document.node_mut(literal).value = Some(block_text.to_string());
    ctx.document.append(msg, literal);
    msg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_state_has_fallback() {
        // The last transition of every state must match any line, so
        // "no transition pattern match" stays unreachable.
        for state in [
            StateKind::Body,
            StateKind::BulletList,
            StateKind::DefinitionList,
            StateKind::EnumeratedList,
            StateKind::FieldList,
            StateKind::OptionList,
            StateKind::LineBlock,
            StateKind::ExtensionOptions,
            StateKind::Explicit,
            StateKind::Text,
            StateKind::Definition,
            StateKind::Line,
            StateKind::SubstitutionDef,
        ] {
            let table = transitions_for(state);
            let last = table.last().expect("non-empty table");
            assert!(
                last.pattern.is_match("anything at all"),
                "state {:?} lacks a catch-all transition",
                state
            );
        }
    }

    #[test]
    fn test_transition_order_blank_first() {
        assert_eq!(transitions_for(StateKind::Body)[0].name, "blank");
        assert_eq!(transitions_for(StateKind::Text)[0].name, "blank");
    }
}
