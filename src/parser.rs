//! Parser entry point and shared parse state
//!
//! [`parse`] wires a [`LineStore`] to a [`StateMachine`] rooted at a
//! fresh [`Document`]. The [`ParseContext`] is the "memo" every state,
//! directive handler, and the inline tokenizer share: the document,
//! the reporter, the settings, the directive registry, and the
//! section-title bookkeeping.

use crate::diagnostics::{Reporter, Severity};
use crate::directives::DirectiveRegistry;
use crate::document::{Document, NameMessage, NodeId, NodeKind};
use crate::machine::{ParserBug, StateMachine};
use crate::settings::Settings;
use crate::source::LineStore;
use crate::states::StateKind;

/// Nested parses deeper than this are refused with a diagnostic so a
/// pathological input cannot exhaust the stack.
pub const MAX_NESTING_DEPTH: usize = 100;

pub struct ParseContext<'a> {
    pub document: Document,
    pub reporter: Reporter,
    pub settings: &'a Settings,
    pub registry: &'a DirectiveRegistry,
    /// Underline (or overline+underline) style signature per section
    /// level, outermost first.
    pub title_styles: Vec<String>,
    pub section_level: usize,
    /// Set while an overlined title bubbles up through nested
    /// machines; consumed by the next Line-state end-of-file hook.
    pub section_bubble_up_kludge: bool,
    pub nested_depth: usize,
}

impl<'a> ParseContext<'a> {
    pub fn new(
        source_id: &str,
        settings: &'a Settings,
        registry: &'a DirectiveRegistry,
    ) -> Self {
        Self {
            document: Document::new(source_id, &settings.id_prefix, &settings.auto_id_prefix),
            reporter: Reporter::new(settings.report_level, settings.halt_level),
            settings,
            registry,
            title_styles: Vec::new(),
            section_level: 0,
            section_bubble_up_kludge: false,
            nested_depth: 0,
        }
    }

    pub fn halted(&self) -> bool {
        self.reporter.is_halted()
    }

    /// Create a detached `SystemMessage` node and record the matching
    /// diagnostic.
    pub fn system_message(
        &mut self,
        severity: Severity,
        message: &str,
        line: Option<usize>,
    ) -> NodeId {
        let source = self.document.current_source.clone();
        self.reporter
            .report(severity, message, source.clone(), line);
        let node = self.document.new_node(NodeKind::SystemMessage, "");
        {
            let data = self.document.node_mut(node);
            data.set_attr("level", severity.level() as i64);
            data.set_attr("type", severity.label());
            if let Some(line) = line {
                data.set_attr("line", line as i64);
            }
            if let Some(source) = source {
                data.set_attr("source", source);
            }
        }
        let para = self.document.new_node(NodeKind::Paragraph, message);
        let text = self.document.new_text(message);
        self.document.append(para, text);
        self.document.append(node, para);
        node
    }

    /// Convert bookkeeping messages into `SystemMessage` nodes
    /// attached under `parent` (when given).
    pub fn attach_name_messages(
        &mut self,
        messages: Vec<NameMessage>,
        parent: Option<NodeId>,
        line: Option<usize>,
    ) {
        for (severity, message) in messages {
            let node = self.system_message(severity, &message, line);
            if let Some(parent) = parent {
                self.document.append(parent, node);
            }
        }
    }
}

/// Parse `text` into a [`Document`].
///
/// Syntax problems become `SystemMessage` nodes and diagnostics; only
/// an internal parser defect produces an `Err`.
pub fn parse(
    source_id: &str,
    text: &str,
    settings: &Settings,
    registry: &DirectiveRegistry,
) -> Result<Document, ParserBug> {
    let mut ctx = ParseContext::new(source_id, settings, registry);
    let store = LineStore::from_source(text, settings.tab_width.max(1), true, source_id);
    let root = ctx.document.root();
    let mut machine = StateMachine::new(store, 0, root, StateKind::Body, true);
    machine.run(&mut ctx)?;
    let ParseContext {
        mut document,
        reporter,
        ..
    } = ctx;
    document.diagnostics = reporter.into_diagnostics();
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directives::DirectiveRegistry;

    #[test]
    fn test_empty_input_yields_document() {
        let settings = Settings::default();
        let registry = DirectiveRegistry::builder().build();
        let document = parse("test", "", &settings, &registry).unwrap();
        assert_eq!(document.node(document.root()).kind, NodeKind::Document);
    }

    #[test]
    fn test_system_message_shape() {
        let settings = Settings::default();
        let registry = DirectiveRegistry::builder().build();
        let mut ctx = ParseContext::new("test", &settings, &registry);
        let node = ctx.system_message(Severity::Warning, "something odd", Some(3));
        let data = ctx.document.node(node);
        assert_eq!(data.kind, NodeKind::SystemMessage);
        assert_eq!(data.attr("level").and_then(|v| v.as_int()), Some(2));
        assert_eq!(data.attr("line").and_then(|v| v.as_int()), Some(3));
        assert_eq!(ctx.document.astext(node), "something odd");
        assert_eq!(ctx.reporter.diagnostics().len(), 1);
    }
}
