//! Directive runtime
//!
//! Parses a matched directive header into arguments, validated
//! options, and a content block, then hands those to the registered
//! handler. Handler failures and malformed headers become system
//! messages carrying a literal copy of the directive source.

use super::DirectiveSpec;
use crate::diagnostics::Severity;
use crate::document::{AttrValue, NodeId, NodeKind};
use crate::machine::{ParserBug, RunControl, StateMachine};
use crate::parser::ParseContext;
use crate::source::LineStore;
use crate::states::{self, StateKind};
use std::collections::BTreeMap;

/// Recoverable failure signalled by a directive handler.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectiveError {
    pub level: Severity,
    pub message: String,
}

impl DirectiveError {
    pub fn error(message: impl Into<String>) -> DirectiveAbort {
        DirectiveAbort::Error(DirectiveError {
            level: Severity::Error,
            message: message.into(),
        })
    }

    pub fn warning(message: impl Into<String>) -> DirectiveAbort {
        DirectiveAbort::Error(DirectiveError {
            level: Severity::Warning,
            message: message.into(),
        })
    }
}

/// Either a reportable handler error or an internal defect.
#[derive(Debug)]
pub enum DirectiveAbort {
    Error(DirectiveError),
    Bug(String),
}

impl From<ParserBug> for DirectiveAbort {
    fn from(bug: ParserBug) -> Self {
        DirectiveAbort::Bug(bug.0)
    }
}

/// Everything a handler receives, including a way back into the
/// parser for nested content.
pub struct DirectiveInvocation<'i, 'a> {
    pub name: &'i str,
    pub arguments: &'i [String],
    pub options: &'i BTreeMap<String, AttrValue>,
    pub content: &'i LineStore,
    pub lineno: usize,
    pub content_offset: usize,
    pub block_text: &'i str,
    pub ctx: &'i mut ParseContext<'a>,
    pub sm: &'i mut StateMachine,
}

impl<'i, 'a> DirectiveInvocation<'i, 'a> {
    /// Parse the content block into `node` as nested body elements.
    pub fn nested_parse(&mut self, node: NodeId, match_titles: bool) -> Result<(), DirectiveAbort> {
        states::nested_parse(
            self.sm,
            self.ctx,
            self.content.detached_copy(),
            self.content_offset,
            node,
            match_titles,
        )
        .map(|_| ())
        .map_err(DirectiveAbort::from)
    }

    pub fn content_text(&self) -> String {
        self.content.texts().join("\n")
    }

    /// Fail unless the directive was given content.
    pub fn require_content(&self) -> Result<(), DirectiveAbort> {
        if self.content.is_empty() {
            Err(DirectiveError::error(format!(
                "Content block expected for the \"{}\" directive; none found.",
                self.name
            )))
        } else {
            Ok(())
        }
    }
}

pub type DirectiveFn =
    fn(&mut DirectiveInvocation<'_, '_>) -> Result<Vec<NodeId>, DirectiveAbort>;

enum MarkupFailure {
    Markup(String),
    Bug(String),
}

impl From<ParserBug> for MarkupFailure {
    fn from(bug: ParserBug) -> Self {
        MarkupFailure::Bug(bug.0)
    }
}

/// Entry point from the explicit-markup state: dispatch `.. name::`.
/// Returns the produced nodes and the trailing blank-finish flag.
pub fn directive(
    sm: &mut StateMachine,
    ctx: &mut ParseContext,
    type_name: &str,
    match_end: usize,
) -> Result<(Vec<NodeId>, bool), RunControl> {
    match ctx.registry.lookup_directive(type_name) {
        Some(spec) => run_directive(sm, ctx, spec, type_name, match_end),
        None => unknown_directive(sm, ctx, type_name),
    }
}

fn literal_block(ctx: &mut ParseContext, text: &str) -> NodeId {
    let node = ctx.document.new_node(NodeKind::LiteralBlock, text.to_string());
    ctx.document.node_mut(node).value = Some(text.to_string());
    node
}

fn run_directive(
    sm: &mut StateMachine,
    ctx: &mut ParseContext,
    spec: &DirectiveSpec,
    type_name: &str,
    match_end: usize,
) -> Result<(Vec<NodeId>, bool), RunControl> {
    let lineno = sm.abs_line_number();
    let initial_line_offset = sm.line_offset.max(0) as usize;
    let (indented, _indent, line_offset, blank_finish) =
        sm.get_first_known_indented(match_end, false, true, false);
    let block_end = (sm.line_offset.max(0) as usize).min(sm.store.len().saturating_sub(1));
    let block_text = (initial_line_offset..=block_end)
        .filter_map(|i| sm.store.text(i).ok())
        .collect::<Vec<_>>()
        .join("\n");

    let parsed = parse_directive_block(sm, ctx, indented, line_offset, spec);
    let (arguments, options, content, content_offset) = match parsed {
        Ok(parts) => parts,
        Err(MarkupFailure::Markup(detail)) => {
            let message = format!("Error in \"{}\" directive: {}.", type_name, detail);
            let error = ctx.system_message(Severity::Error, &message, Some(lineno));
            let literal = literal_block(ctx, &block_text);
            ctx.document.append(error, literal);
            return Ok((vec![error], blank_finish));
        }
        Err(MarkupFailure::Bug(message)) => return Err(RunControl::Bug(message)),
    };

    let mut invocation = DirectiveInvocation {
        name: type_name,
        arguments: &arguments,
        options: &options,
        content: &content,
        lineno,
        content_offset,
        block_text: &block_text,
        ctx: &mut *ctx,
        sm: &mut *sm,
    };
    match (spec.run)(&mut invocation) {
        Ok(nodes) => {
            let blank_finish = blank_finish || sm.is_next_line_blank();
            Ok((nodes, blank_finish))
        }
        Err(DirectiveAbort::Error(error)) => {
            let msg = ctx.system_message(error.level, &error.message, Some(lineno));
            let literal = literal_block(ctx, &block_text);
            ctx.document.append(msg, literal);
            Ok((vec![msg], blank_finish))
        }
        Err(DirectiveAbort::Bug(message)) => Err(RunControl::Bug(message)),
    }
}

fn unknown_directive(
    sm: &mut StateMachine,
    ctx: &mut ParseContext,
    type_name: &str,
) -> Result<(Vec<NodeId>, bool), RunControl> {
    let lineno = sm.abs_line_number();
    let (indented, _indent, _offset, blank_finish) =
        sm.get_first_known_indented(0, false, false, true);
    let text = indented.texts().join("\n");
    let message = format!("Unknown directive type \"{}\".", type_name);
    let error = ctx.system_message(Severity::Error, &message, Some(lineno));
    let literal = literal_block(ctx, &text);
    ctx.document.append(error, literal);
    Ok((vec![error], blank_finish))
}

/// Split the indented directive body into arguments, options, and
/// content, mirroring the header layout rules.
#[allow(clippy::type_complexity)]
fn parse_directive_block(
    sm: &mut StateMachine,
    ctx: &mut ParseContext,
    mut indented: LineStore,
    mut line_offset: usize,
    spec: &DirectiveSpec,
) -> Result<(Vec<String>, BTreeMap<String, AttrValue>, LineStore, usize), MarkupFailure> {
    if !indented.is_empty() && indented.line(0).map(|l| l.is_blank()).unwrap_or(false) {
        indented
            .trim_start(1)
            .map_err(|e| MarkupFailure::Bug(e.to_string()))?;
        line_offset += 1;
    }
    while !indented.is_empty()
        && indented
            .line(indented.len() - 1)
            .map(|l| l.is_blank())
            .unwrap_or(false)
    {
        indented
            .trim_end(1)
            .map_err(|e| MarkupFailure::Bug(e.to_string()))?;
    }

    let takes_arguments = spec.required_args > 0 || spec.optional_args > 0;
    let (mut arg_block, mut content, mut content_offset, split_index) =
        if !indented.is_empty() && (takes_arguments || !spec.option_spec.is_empty()) {
            let mut split = indented.len();
            for i in 0..indented.len() {
                if indented.line(i).map(|l| l.is_blank()).unwrap_or(false) {
                    split = i;
                    break;
                }
            }
            let arg_block = indented.slice(0, split);
            let content = indented.slice((split + 1).min(indented.len()), indented.len());
            (arg_block, content, line_offset + split + 1, split)
        } else {
            let content = indented.slice(0, indented.len());
            (LineStore::new(Vec::new()), content, line_offset, 0)
        };

    let options = if !spec.option_spec.is_empty() {
        let (options, trimmed_arg_block) = parse_directive_options(sm, ctx, spec, &arg_block)?;
        arg_block = trimmed_arg_block;
        options
    } else {
        BTreeMap::new()
    };

    if !arg_block.is_empty() && !takes_arguments {
        // No arguments are expected, so the whole block is content.
        let mut rebuilt = arg_block.detached_copy();
        rebuilt.append_store(&indented.slice(split_index, indented.len()));
        content = rebuilt;
        content_offset = line_offset;
        arg_block = LineStore::new(Vec::new());
    }

    while !content.is_empty() && content.line(0).map(|l| l.is_blank()).unwrap_or(false) {
        content
            .trim_start(1)
            .map_err(|e| MarkupFailure::Bug(e.to_string()))?;
        content_offset += 1;
    }

    let arguments = if takes_arguments {
        parse_directive_arguments(spec, &arg_block).map_err(MarkupFailure::Markup)?
    } else {
        Vec::new()
    };

    if !content.is_empty() && !spec.has_content {
        return Err(MarkupFailure::Markup("no content permitted".to_string()));
    }
    Ok((arguments, options, content, content_offset))
}

/// Peel trailing `:name: value` fields off the argument block and
/// validate them against the option spec.
fn parse_directive_options(
    sm: &mut StateMachine,
    ctx: &mut ParseContext,
    spec: &DirectiveSpec,
    arg_block: &LineStore,
) -> Result<(BTreeMap<String, AttrValue>, LineStore), MarkupFailure> {
    let mut marker = arg_block.len();
    for i in 0..arg_block.len() {
        let text = arg_block.text(i).map_err(|e| MarkupFailure::Bug(e.to_string()))?;
        if states::patterns::FIELD_MARKER.is_match(&text) {
            marker = i;
            break;
        }
    }
    let options = if marker < arg_block.len() {
        let opt_block = arg_block.slice(marker, arg_block.len());
        parse_extension_options(sm, ctx, spec, opt_block)?
    } else {
        BTreeMap::new()
    };
    Ok((options, arg_block.slice(0, marker)))
}

/// Parse an option block as a restricted field list and validate each
/// field against the option spec.
pub fn parse_extension_options(
    sm: &mut StateMachine,
    ctx: &mut ParseContext,
    spec: &DirectiveSpec,
    opt_block: LineStore,
) -> Result<BTreeMap<String, AttrValue>, MarkupFailure> {
    let total = opt_block.len();
    let field_list = ctx.document.new_node(NodeKind::FieldList, "");
    let mut nested = sm.take_nested(
        opt_block.detached_copy(),
        0,
        field_list,
        StateKind::ExtensionOptions,
        false,
    );
    nested.scratch.blank_finish = true;
    let run_result = nested.run(ctx);
    let complete = nested.abs_line_offset() >= total;
    let blank_finish = nested.scratch.blank_finish;
    sm.put_nested(nested);
    run_result?;
    if !complete {
        return Err(MarkupFailure::Markup("invalid option block".to_string()));
    }
    let options =
        extract_extension_options(ctx, field_list, spec).map_err(MarkupFailure::Markup)?;
    if !blank_finish {
        return Err(MarkupFailure::Markup(
            "option data incompletely parsed".to_string(),
        ));
    }
    Ok(options)
}

fn extract_extension_options(
    ctx: &ParseContext,
    field_list: NodeId,
    spec: &DirectiveSpec,
) -> Result<BTreeMap<String, AttrValue>, String> {
    let mut options = BTreeMap::new();
    for &field in ctx.document.children(field_list) {
        let data = ctx.document.node(field);
        if data.kind == NodeKind::SystemMessage {
            return Err("invalid option block".to_string());
        }
        let children = ctx.document.children(field);
        let name_node = children.first().copied();
        let body_node = children.get(1).copied();
        let name = name_node
            .map(|n| ctx.document.astext(n))
            .unwrap_or_default()
            .to_lowercase();
        if name.split_whitespace().count() != 1 {
            return Err(format!(
                "extension option field name may not contain multiple words: \"{}\"",
                name
            ));
        }
        let value: Option<String> = match body_node {
            None => None,
            Some(body) => {
                let body_children = ctx.document.children(body);
                if body_children.is_empty() {
                    None
                } else if body_children.len() > 1
                    || ctx.document.node(body_children[0]).kind != NodeKind::Paragraph
                {
                    return Err(format!(
                        "extension option field body may contain a single paragraph only (option \"{}\")",
                        name
                    ));
                } else {
                    Some(ctx.document.astext(body_children[0]))
                }
            }
        };
        if options.contains_key(&name) {
            return Err(format!("duplicate option \"{}\"", name));
        }
        let validator = spec
            .validator_for(&name)
            .ok_or_else(|| format!("unknown option: \"{}\"", name))?;
        match validator(value.as_deref()) {
            Ok(converted) => {
                options.insert(name, converted);
            }
            Err(detail) => {
                return Err(format!(
                    "invalid option value: (option: \"{}\"; value: \"{}\") {}",
                    name,
                    value.unwrap_or_default(),
                    detail
                ));
            }
        }
    }
    Ok(options)
}

fn parse_directive_arguments(
    spec: &DirectiveSpec,
    arg_block: &LineStore,
) -> Result<Vec<String>, String> {
    let arg_text = arg_block.texts().join("\n");
    let mut arguments: Vec<String> = arg_text.split_whitespace().map(str::to_string).collect();
    let required = spec.required_args;
    let maximum = spec.required_args + spec.optional_args;
    if arguments.len() < required {
        return Err(format!(
            "{} argument(s) required, {} supplied",
            required,
            arguments.len()
        ));
    }
    if arguments.len() > maximum {
        if spec.final_arg_whitespace {
            let head: Vec<String> = arg_text
                .split_whitespace()
                .take(maximum - 1)
                .map(str::to_string)
                .collect();
            // Everything after the first `maximum - 1` tokens is one
            // final whitespace-preserving argument.
            let mut rest = arg_text.trim_start();
            for _ in 0..maximum - 1 {
                let cut = rest
                    .find(char::is_whitespace)
                    .unwrap_or(rest.len());
                rest = rest[cut..].trim_start();
            }
            arguments = head;
            arguments.push(rest.to_string());
        } else {
            return Err(format!(
                "maximum {} argument(s) allowed, {} supplied",
                maximum,
                arguments.len()
            ));
        }
    }
    Ok(arguments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directives::{options, OptionValidator};

    fn noop(_inv: &mut DirectiveInvocation<'_, '_>) -> Result<Vec<NodeId>, DirectiveAbort> {
        Ok(Vec::new())
    }

    fn spec(required: usize, optional: usize, final_ws: bool) -> DirectiveSpec {
        DirectiveSpec {
            required_args: required,
            optional_args: optional,
            final_arg_whitespace: final_ws,
            has_content: true,
            option_spec: vec![("flag".to_string(), options::flag as OptionValidator)],
            run: noop,
        }
    }

    fn arg_store(lines: &[&str]) -> LineStore {
        LineStore::from_source(&lines.join("\n"), 8, false, "test")
    }

    #[test]
    fn test_arguments_required_count() {
        let err = parse_directive_arguments(&spec(2, 0, false), &arg_store(&["one"])).unwrap_err();
        assert_eq!(err, "2 argument(s) required, 1 supplied");
    }

    #[test]
    fn test_arguments_maximum() {
        let err =
            parse_directive_arguments(&spec(1, 0, false), &arg_store(&["a b c"])).unwrap_err();
        assert_eq!(err, "maximum 1 argument(s) allowed, 3 supplied");
    }

    #[test]
    fn test_final_argument_whitespace() {
        let args =
            parse_directive_arguments(&spec(1, 1, true), &arg_store(&["one two three four"]))
                .unwrap();
        assert_eq!(args, vec!["one", "two three four"]);
    }

    #[test]
    fn test_exact_arguments() {
        let args = parse_directive_arguments(&spec(1, 1, false), &arg_store(&["one two"])).unwrap();
        assert_eq!(args, vec!["one", "two"]);
    }
}
