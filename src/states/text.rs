//! Text, Definition, and Line states
//!
//! A text block has three meanings, decided by its second line: blank
//! means paragraph, indent means definition list item, a punctuation
//! run means section title. The Line state handles overline/underline
//! titles and transition markers, including the backtracking needed
//! when a known title style closes the current section.

use super::{
    message_with_literal, nested_list_parse, nested_parse, patterns, unindent_warning, StateKind,
    TransitionMatch,
};
use crate::diagnostics::Severity;
use crate::document::{fully_normalize_name, NodeId, NodeKind};
use crate::inline::parse_inline;
use crate::machine::{RunControl, StateMachine};
use crate::parser::ParseContext;
use crate::util::column_width;
use once_cell::sync::Lazy;
use regex::Regex;

static CLASSIFIER_DELIMITER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r" +: +").expect("classifier delimiter"));

/// Build a paragraph from accumulated lines. Returns the produced
/// nodes (paragraph plus inline messages) and whether a literal block
/// follows (the paragraph ended with `::`).
pub fn paragraph(
    sm: &mut StateMachine,
    ctx: &mut ParseContext,
    lines: &[String],
    lineno: usize,
) -> (Vec<NodeId>, bool) {
    let joined = lines.join("\n");
    let data = joined.trim_end();
    let (text, literal_next) = match literal_marker_split(data) {
        Some(text) => {
            if data == "::" {
                return (Vec::new(), true);
            }
            (text, true)
        }
        None => (data.to_string(), false),
    };
    let (text_nodes, messages) = parse_inline(ctx, &text, lineno);
    let node = ctx.document.new_node(NodeKind::Paragraph, data.to_string());
    let (source, line) = sm.get_source_and_line(Some(lineno));
    {
        let para = ctx.document.node_mut(node);
        para.source = source;
        para.line = line;
    }
    ctx.document.append_all(node, &text_nodes);
    let mut nodes = vec![node];
    nodes.extend(messages);
    (nodes, literal_next)
}

/// If `data` ends with an unescaped `::`, the text with the marker
/// stripped; None otherwise.
fn literal_marker_split(data: &str) -> Option<String> {
    if !data.ends_with("::") {
        return None;
    }
    let body = &data[..data.len() - 2];
    let backslashes = body.chars().rev().take_while(|&c| c == '\\').count();
    if backslashes % 2 != 0 {
        return None;
    }
    if body.ends_with(' ') || body.ends_with('\n') {
        Some(body.trim_end().to_string())
    } else if body.is_empty() {
        Some(String::new())
    } else {
        Some(format!("{}:", body))
    }
}

/// The indented block following a `::` paragraph.
pub fn literal_block(
    sm: &mut StateMachine,
    ctx: &mut ParseContext,
) -> Result<Vec<NodeId>, RunControl> {
    let (mut indented, _indent, offset, blank_finish) = sm.get_indented(false, true);
    while !indented.is_empty()
        && indented
            .line(indented.len() - 1)
            .map(|l| l.is_blank())
            .unwrap_or(false)
    {
        indented.trim_end(1).map_err(RunControl::from_store)?;
    }
    if indented.is_empty() {
        let lineno = sm.abs_line_number();
        let warning = ctx.system_message(
            Severity::Warning,
            "Literal block expected; none found.",
            Some(lineno),
        );
        return Ok(vec![warning]);
    }
    let data = indented.texts().join("\n");
    let literal = ctx.document.new_node(NodeKind::LiteralBlock, data.clone());
    let (source, line) = sm.get_source_and_line(Some(offset + 1));
    {
        let node = ctx.document.node_mut(literal);
        node.value = Some(data);
        node.source = source;
        node.line = line;
    }
    let mut nodes = vec![literal];
    if !blank_finish {
        nodes.push(unindent_warning(sm, ctx, "Literal block"));
    }
    Ok(nodes)
}

impl RunControl {
    fn from_store(err: crate::source::LineStoreError) -> Self {
        RunControl::Bug(err.to_string())
    }
}

// --- Text state ---

/// Blank line: the collected text is a paragraph.
pub fn blank(
    sm: &mut StateMachine,
    ctx: &mut ParseContext,
    _mtch: &TransitionMatch<'_>,
    context: &mut Vec<String>,
) -> Result<StateKind, RunControl> {
    flush_paragraph(sm, ctx, context)?;
    Ok(StateKind::Body)
}

fn flush_paragraph(
    sm: &mut StateMachine,
    ctx: &mut ParseContext,
    context: &mut Vec<String>,
) -> Result<(), RunControl> {
    let lines = std::mem::take(context);
    let lineno = sm.abs_line_number().saturating_sub(1);
    let (nodes, literal_next) = paragraph(sm, ctx, &lines, lineno);
    let parent = sm.node;
    ctx.document.append_all(parent, &nodes);
    if literal_next {
        let nodes = literal_block(sm, ctx)?;
        ctx.document.append_all(parent, &nodes);
    }
    Ok(())
}

pub fn text_eof(
    sm: &mut StateMachine,
    ctx: &mut ParseContext,
    context: &mut Vec<String>,
) -> Result<(), RunControl> {
    if !context.is_empty() {
        flush_paragraph(sm, ctx, context)?;
    }
    Ok(())
}

/// Indented second line: a definition list item.
pub fn indent(
    sm: &mut StateMachine,
    ctx: &mut ParseContext,
    _mtch: &TransitionMatch<'_>,
    context: &mut Vec<String>,
) -> Result<StateKind, RunControl> {
    let term_lines = std::mem::take(context);
    let definition_list = ctx.document.new_node(NodeKind::DefinitionList, "");
    let parent = sm.node;
    ctx.document.append(parent, definition_list);
    let (item, blank_finish) = definition_list_item(sm, ctx, &term_lines)?;
    ctx.document.append(definition_list, item);

    let offset = (sm.line_offset + 1).max(0) as usize;
    let rest = sm.store.slice(offset, sm.store.len());
    let input_offset = sm.abs_line_offset() + 1;
    let (new_offset, blank_finish) = nested_list_parse(
        sm,
        ctx,
        rest,
        input_offset,
        definition_list,
        StateKind::DefinitionList,
        blank_finish,
        None,
        false,
    )?;
    sm.goto_line(new_offset);
    if !blank_finish {
        let warning = unindent_warning(sm, ctx, "Definition list");
        ctx.document.append(parent, warning);
    }
    Ok(StateKind::Body)
}

pub fn definition_list_item(
    sm: &mut StateMachine,
    ctx: &mut ParseContext,
    term_lines: &[String],
) -> Result<(NodeId, bool), RunControl> {
    let (indented, _indent, line_offset, blank_finish) = sm.get_indented(false, true);
    let mut rawsource: Vec<String> = term_lines.to_vec();
    rawsource.extend(indented.texts());
    let item = ctx
        .document
        .new_node(NodeKind::DefinitionListItem, rawsource.join("\n"));
    let lineno = sm.abs_line_number().saturating_sub(1);
    let (source, line) = sm.get_source_and_line(Some(lineno));
    {
        let data = ctx.document.node_mut(item);
        data.source = source;
        data.line = line;
    }
    let (terms, messages) = term(ctx, &term_lines[0], lineno);
    ctx.document.append_all(item, &terms);
    let definition = ctx.document.new_node(NodeKind::Definition, "");
    ctx.document.append_all(definition, &messages);
    ctx.document.append(item, definition);
    if term_lines[0].ends_with("::") {
        let info = ctx.system_message(
            Severity::Info,
            "Blank line missing before literal block (after the \"::\")? Interpreted as a definition list item.",
            Some(lineno + 1),
        );
        ctx.document.append(definition, info);
    }
    nested_parse(sm, ctx, indented, line_offset, definition, false)?;
    Ok((item, blank_finish))
}

/// Split a term line into the term and ` : `-separated classifiers.
/// Splitting happens on the parsed text nodes so markup survives.
fn term(ctx: &mut ParseContext, line: &str, lineno: usize) -> (Vec<NodeId>, Vec<NodeId>) {
    let (text_nodes, messages) = parse_inline(ctx, line, lineno);
    let term_node = ctx.document.new_node(NodeKind::Term, line.to_string());
    let mut node_list = vec![term_node];
    for node in text_nodes {
        if ctx.document.node(node).kind == NodeKind::Text {
            let value = ctx
                .document
                .node(node)
                .value
                .clone()
                .unwrap_or_default();
            let parts: Vec<&str> = CLASSIFIER_DELIMITER.split(&value).collect();
            if parts.len() == 1 {
                let target = *node_list.last().expect("non-empty node list");
                ctx.document.append(target, node);
            } else {
                let first = parts[0].trim_end().to_string();
                let text = ctx.document.new_text(first);
                let target = *node_list.last().expect("non-empty node list");
                ctx.document.append(target, text);
                for part in &parts[1..] {
                    let classifier = ctx
                        .document
                        .new_node(NodeKind::Classifier, part.to_string());
                    let text = ctx.document.new_text(part.to_string());
                    ctx.document.append(classifier, text);
                    node_list.push(classifier);
                }
            }
        } else {
            let target = *node_list.last().expect("non-empty node list");
            ctx.document.append(target, node);
        }
    }
    (node_list, messages)
}

/// Definition state: the indented line confirms a definition item.
pub fn definition_indent(
    sm: &mut StateMachine,
    ctx: &mut ParseContext,
    mtch: &TransitionMatch<'_>,
    context: &mut Vec<String>,
) -> Result<StateKind, RunControl> {
    let term_lines = std::mem::take(context);
    let (item, blank_finish) = definition_list_item(sm, ctx, &term_lines)?;
    let parent = sm.node;
    ctx.document.append(parent, item);
    sm.scratch.blank_finish = blank_finish;
    Ok(mtch.next)
}

/// Punctuation run under a text line: a section title underline.
pub fn underline(
    sm: &mut StateMachine,
    ctx: &mut ParseContext,
    mtch: &TransitionMatch<'_>,
    context: &mut Vec<String>,
) -> Result<StateKind, RunControl> {
    if !patterns::uniform_line(mtch.text) {
        return Err(RunControl::TransitionCorrection("text"));
    }
    let lineno = sm.abs_line_number();
    let title = context
        .first()
        .map(|t| t.trim_end().to_string())
        .unwrap_or_default();
    let underline_text = mtch.text.trim_end().to_string();
    let source = format!("{}\n{}", title, underline_text);
    let mut messages = Vec::new();
    if column_width(&title) > underline_text.len() {
        if underline_text.len() < 4 {
            if sm.match_titles {
                let msg = ctx.system_message(
                    Severity::Info,
                    "Possible title underline, too short for the title.\nTreating it as ordinary text because it's so short.",
                    Some(lineno),
                );
                let parent = sm.node;
                ctx.document.append(parent, msg);
            }
            return Err(RunControl::TransitionCorrection("text"));
        }
        let block_text = format!("{}\n{}", context[0], sm.current_text());
        messages.push(message_with_literal(
            ctx,
            Severity::Warning,
            "Title underline too short.",
            &block_text,
            Some(lineno),
        ));
    }
    if !sm.match_titles {
        let block_text = format!("{}\n{}", context[0], sm.current_text());
        let (_, srcline) = sm.get_source_and_line(None);
        let msg = message_with_literal(
            ctx,
            Severity::Severe,
            "Unexpected section title.",
            &block_text,
            srcline,
        );
        let parent = sm.node;
        ctx.document.append_all(parent, &messages);
        ctx.document.append(parent, msg);
        context.clear();
        return Ok(StateKind::Body);
    }
    let style = underline_text[..1].to_string();
    context.clear();
    section(sm, ctx, &title, &source, &style, lineno - 1, messages)?;
    Ok(StateKind::Body)
}

/// Continuation line: extend the paragraph with the rest of the text
/// block.
pub fn text(
    sm: &mut StateMachine,
    ctx: &mut ParseContext,
    _mtch: &TransitionMatch<'_>,
    context: &mut Vec<String>,
) -> Result<StateKind, RunControl> {
    let startline = sm.abs_line_number().saturating_sub(1);
    let mut message = None;
    let block = match sm.get_text_block(true) {
        Ok(block) => block,
        Err(err) => {
            message = Some(ctx.system_message(
                Severity::Error,
                "Unexpected indentation.",
                err.line,
            ));
            err.block
        }
    };
    let mut lines = std::mem::take(context);
    lines.extend(block.texts());
    let (nodes, literal_next) = paragraph(sm, ctx, &lines, startline);
    let parent = sm.node;
    ctx.document.append_all(parent, &nodes);
    if let Some(message) = message {
        ctx.document.append(parent, message);
    }
    if literal_next {
        let _ = sm.next_line(1);
        let nodes = literal_block(sm, ctx)?;
        ctx.document.append_all(parent, &nodes);
    }
    Ok(StateKind::Body)
}

// --- Sections ---

/// Check the title style against the known hierarchy and create the
/// section if it belongs here; bubble up otherwise.
pub fn section(
    sm: &mut StateMachine,
    ctx: &mut ParseContext,
    title: &str,
    source: &str,
    style: &str,
    lineno: usize,
    messages: Vec<NodeId>,
) -> Result<(), RunControl> {
    if check_subsection(sm, ctx, source, style, lineno)? {
        new_subsection(sm, ctx, title, lineno, messages)?;
    }
    Ok(())
}

fn title_inconsistent(
    ctx: &mut ParseContext,
    source: &str,
    lineno: usize,
) -> NodeId {
    message_with_literal(
        ctx,
        Severity::Severe,
        "Title level inconsistent:",
        source,
        Some(lineno),
    )
}

fn check_subsection(
    sm: &mut StateMachine,
    ctx: &mut ParseContext,
    source: &str,
    style: &str,
    lineno: usize,
) -> Result<bool, RunControl> {
    let current_level = ctx.section_level;
    let known = ctx.title_styles.iter().position(|s| s == style);
    let level = match known {
        Some(index) => index + 1,
        None => {
            if ctx.title_styles.len() == current_level {
                ctx.title_styles.push(style.to_string());
                return Ok(true);
            }
            let msg = title_inconsistent(ctx, source, lineno);
            let parent = sm.node;
            ctx.document.append(parent, msg);
            return Ok(false);
        }
    };
    if level <= current_level {
        // Sibling or supersection: back out to the parent machine and
        // let it re-evaluate the title. Two lines for an underlined
        // title, three when there is an overline.
        ctx.section_level = level;
        if style.len() == 2 {
            ctx.section_bubble_up_kludge = true;
        }
        sm.previous_line(style.chars().count() + 1);
        return Err(RunControl::Eof);
    }
    if level == current_level + 1 {
        Ok(true)
    } else {
        let msg = title_inconsistent(ctx, source, lineno);
        let parent = sm.node;
        ctx.document.append(parent, msg);
        Ok(false)
    }
}

fn new_subsection(
    sm: &mut StateMachine,
    ctx: &mut ParseContext,
    title: &str,
    lineno: usize,
    messages: Vec<NodeId>,
) -> Result<(), RunControl> {
    let saved_level = ctx.section_level;
    ctx.section_level += 1;
    let section_node = ctx.document.new_node(NodeKind::Section, "");
    let parent = sm.node;
    ctx.document.append(parent, section_node);
    let (text_nodes, title_messages) = parse_inline(ctx, title, lineno);
    let title_node = ctx.document.new_node(NodeKind::Title, title.to_string());
    ctx.document.append_all(title_node, &text_nodes);
    let name = fully_normalize_name(&ctx.document.astext(title_node));
    ctx.document.node_mut(section_node).names.push(name);
    ctx.document.append(section_node, title_node);
    ctx.document.append_all(section_node, &messages);
    ctx.document.append_all(section_node, &title_messages);
    let name_messages = ctx.document.note_implicit_target(section_node);
    ctx.attach_name_messages(name_messages, Some(section_node), Some(lineno));

    let offset = (sm.line_offset + 1).max(0) as usize;
    let rest = sm.store.slice(offset, sm.store.len());
    let input_offset = sm.abs_line_offset() + 1;
    let new_offset = nested_parse(sm, ctx, rest, input_offset, section_node, true)?;
    sm.goto_line(new_offset);
    if ctx.section_level <= saved_level {
        // The nested parse hit a sibling or supersection of OUR
        // parent; keep bubbling.
        return Err(RunControl::Eof);
    }
    ctx.section_level = saved_level;
    Ok(())
}

// --- Line state (overlines and transitions) ---

fn state_correction(
    sm: &mut StateMachine,
    context: &mut Vec<String>,
    lines: usize,
) -> RunControl {
    sm.previous_line(lines);
    context.clear();
    RunControl::StateCorrection(StateKind::Body, Some("text"))
}

/// Blank after a punctuation run: a transition marker.
pub fn line_blank(
    sm: &mut StateMachine,
    ctx: &mut ParseContext,
    _mtch: &TransitionMatch<'_>,
    context: &mut Vec<String>,
) -> Result<StateKind, RunControl> {
    let marker = context.first().map(|c| c.trim().to_string()).unwrap_or_default();
    if marker.len() < 4 {
        return Err(state_correction(sm, context, 1));
    }
    let (source, srcline) = sm.get_source_and_line(None);
    let transition = ctx.document.new_node(NodeKind::Transition, marker);
    {
        let node = ctx.document.node_mut(transition);
        node.source = source;
        node.line = srcline.map(|l| l.saturating_sub(1));
    }
    let parent = sm.node;
    ctx.document.append(parent, transition);
    context.clear();
    Ok(StateKind::Body)
}

pub fn line_eof(
    sm: &mut StateMachine,
    ctx: &mut ParseContext,
    context: &mut Vec<String>,
) -> Result<(), RunControl> {
    let marker = context.first().map(|c| c.trim().to_string()).unwrap_or_default();
    if ctx.section_bubble_up_kludge {
        ctx.section_bubble_up_kludge = false;
    } else if marker.len() < 4 {
        return Err(state_correction(sm, context, 1));
    }
    if !sm.scratch.suppress_eof_transition {
        let (source, srcline) = sm.get_source_and_line(None);
        let transition = ctx.document.new_node(NodeKind::Transition, marker);
        {
            let node = ctx.document.node_mut(transition);
            node.source = source;
            node.line = srcline.map(|l| l.saturating_sub(1));
        }
        let parent = sm.node;
        ctx.document.append(parent, transition);
    }
    sm.scratch.suppress_eof_transition = false;
    context.clear();
    Ok(())
}

fn short_overline(
    sm: &mut StateMachine,
    ctx: &mut ParseContext,
    context: &mut Vec<String>,
    lines: usize,
) -> RunControl {
    let lineno = sm.abs_line_number().saturating_sub(1);
    let msg = ctx.system_message(
        Severity::Info,
        "Possible incomplete section title.\nTreating the overline as ordinary text because it's so short.",
        Some(lineno),
    );
    let parent = sm.node;
    ctx.document.append(parent, msg);
    state_correction(sm, context, lines)
}

/// Title text between overline and (expected) underline.
pub fn line_text(
    sm: &mut StateMachine,
    ctx: &mut ParseContext,
    mtch: &TransitionMatch<'_>,
    context: &mut Vec<String>,
) -> Result<StateKind, RunControl> {
    let lineno = sm.abs_line_number().saturating_sub(1);
    let overline = context.first().cloned().unwrap_or_default();
    let title = mtch.text.to_string();
    let parent = sm.node;

    if sm.next_line(1).is_err() {
        let block_text = format!("{}\n{}", overline, title);
        if overline.trim_end().len() < 4 {
            return Err(short_overline(sm, ctx, context, 2));
        }
        let msg = message_with_literal(
            ctx,
            Severity::Severe,
            "Incomplete section title.",
            &block_text,
            Some(lineno),
        );
        ctx.document.append(parent, msg);
        context.clear();
        return Ok(StateKind::Body);
    }
    let underline = sm.current_text();
    let source = format!("{}\n{}\n{}", overline, title, underline);
    let overline_t = overline.trim_end().to_string();
    let underline_t = underline.trim_end().to_string();

    if !patterns::LINE.is_match(&underline_t) || !patterns::uniform_line(&underline_t) {
        if overline_t.len() < 4 {
            return Err(short_overline(sm, ctx, context, 2));
        }
        let msg = message_with_literal(
            ctx,
            Severity::Severe,
            "Missing matching underline for section title overline.",
            &source,
            Some(lineno),
        );
        ctx.document.append(parent, msg);
        context.clear();
        return Ok(StateKind::Body);
    }
    if overline_t != underline_t {
        if overline_t.len() < 4 {
            return Err(short_overline(sm, ctx, context, 2));
        }
        let msg = message_with_literal(
            ctx,
            Severity::Severe,
            "Title overline & underline mismatch.",
            &source,
            Some(lineno),
        );
        ctx.document.append(parent, msg);
        context.clear();
        return Ok(StateKind::Body);
    }
    let title_t = title.trim_end().to_string();
    let mut messages = Vec::new();
    if column_width(&title_t) > overline_t.len() {
        if overline_t.len() < 4 {
            return Err(short_overline(sm, ctx, context, 2));
        }
        messages.push(message_with_literal(
            ctx,
            Severity::Warning,
            "Title overline too short.",
            &source,
            Some(lineno),
        ));
    }
    let mut style = String::new();
    style.push(overline_t.chars().next().unwrap_or('='));
    style.push(underline_t.chars().next().unwrap_or('='));
    sm.scratch.suppress_eof_transition = true;
    section(
        sm,
        ctx,
        title_t.trim_start(),
        &source,
        &style,
        lineno + 1,
        messages,
    )?;
    sm.scratch.suppress_eof_transition = false;
    context.clear();
    Ok(StateKind::Body)
}

/// A second punctuation run directly under the first: an error unless
/// the overline was too short to be meant as one.
pub fn line_underline(
    sm: &mut StateMachine,
    ctx: &mut ParseContext,
    mtch: &TransitionMatch<'_>,
    context: &mut Vec<String>,
) -> Result<StateKind, RunControl> {
    if !patterns::uniform_line(mtch.text) {
        return line_text(sm, ctx, mtch, context);
    }
    let overline = context.first().cloned().unwrap_or_default();
    let block_text = format!("{}\n{}", overline, sm.current_text());
    let lineno = sm.abs_line_number().saturating_sub(1);
    if overline.trim_end().len() < 4 {
        return Err(short_overline(sm, ctx, context, 1));
    }
    let msg = message_with_literal(
        ctx,
        Severity::Error,
        "Invalid section title or transition marker.",
        &block_text,
        Some(lineno),
    );
    let parent = sm.node;
    ctx.document.append(parent, msg);
    context.clear();
    Ok(StateKind::Body)
}

#[cfg(test)]
mod tests {
    use crate::directives::builtin::default_registry;
    use crate::document::NodeKind;
    use crate::parser::parse;
    use crate::settings::Settings;

    fn parse_ok(text: &str) -> crate::document::Document {
        let settings = Settings::default();
        let registry = default_registry();
        parse("test", text, &settings, &registry).unwrap()
    }

    fn child_kinds(
        document: &crate::document::Document,
        id: crate::document::NodeId,
    ) -> Vec<NodeKind> {
        document
            .children(id)
            .iter()
            .map(|&c| document.node(c).kind)
            .collect()
    }

    #[test]
    fn test_section_title() {
        let document = parse_ok("Title\n=====\n\nBody text.");
        let root = document.root();
        assert_eq!(child_kinds(&document, root), vec![NodeKind::Section]);
        let section = document.children(root)[0];
        assert_eq!(
            child_kinds(&document, section),
            vec![NodeKind::Title, NodeKind::Paragraph]
        );
        assert_eq!(document.node(section).names, vec!["Title"]);
        assert!(!document.node(section).ids.is_empty());
    }

    #[test]
    fn test_overlined_title() {
        let document = parse_ok("=====\nTitle\n=====\n\nBody.");
        let root = document.root();
        assert_eq!(child_kinds(&document, root), vec![NodeKind::Section]);
    }

    #[test]
    fn test_sibling_sections() {
        let document = parse_ok("One\n===\n\ntext one\n\nTwo\n===\n\ntext two");
        let root = document.root();
        assert_eq!(
            child_kinds(&document, root),
            vec![NodeKind::Section, NodeKind::Section]
        );
    }

    #[test]
    fn test_nested_sections() {
        let document = parse_ok("Top\n===\n\nSub\n---\n\ndeep text\n\nTop2\n====\n\nmore");
        let root = document.root();
        let kinds = child_kinds(&document, root);
        assert_eq!(kinds, vec![NodeKind::Section, NodeKind::Section]);
        let first = document.children(root)[0];
        assert!(child_kinds(&document, first).contains(&NodeKind::Section));
    }

    #[test]
    fn test_short_underline_warning() {
        let document = parse_ok("Long Title Here\n==\n\ntext");
        // Underline length 2 (< 4): info only, treated as text.
        assert!(document
            .diagnostics
            .iter()
            .any(|d| d.message.contains("Possible title underline")));
    }

    #[test]
    fn test_underline_slightly_short() {
        let document = parse_ok("Long Title\n======\n\ntext");
        assert!(document
            .diagnostics
            .iter()
            .any(|d| d.message.contains("Title underline too short")));
        let root = document.root();
        assert_eq!(document.node(document.children(root)[0]).kind, NodeKind::Section);
    }

    #[test]
    fn test_definition_list() {
        let document = parse_ok("term\n    definition body\n\nterm2 : classifier\n    body2");
        let root = document.root();
        let kinds = child_kinds(&document, root);
        assert_eq!(kinds, vec![NodeKind::DefinitionList]);
        let list = document.children(root)[0];
        assert_eq!(document.children(list).len(), 2);
        let second = document.children(list)[1];
        assert_eq!(
            child_kinds(&document, second),
            vec![NodeKind::Term, NodeKind::Classifier, NodeKind::Definition]
        );
    }

    #[test]
    fn test_literal_block_after_paragraph() {
        let document = parse_ok("Code follows::\n\n    x = 1\n    y = 2\n\nafter");
        let root = document.root();
        let kinds = child_kinds(&document, root);
        assert_eq!(
            kinds,
            vec![NodeKind::Paragraph, NodeKind::LiteralBlock, NodeKind::Paragraph]
        );
        let para = document.children(root)[0];
        assert_eq!(document.astext(para), "Code follows:");
        let literal = document.children(root)[1];
        assert_eq!(document.node(literal).value.as_deref(), Some("x = 1\ny = 2"));
    }

    #[test]
    fn test_bare_literal_marker() {
        let document = parse_ok("::\n\n    literal here\n\nafter");
        let root = document.root();
        let kinds = child_kinds(&document, root);
        assert_eq!(kinds, vec![NodeKind::LiteralBlock, NodeKind::Paragraph]);
    }

    #[test]
    fn test_unexpected_indentation() {
        let document = parse_ok("top line\nsecond line\n  suddenly indented");
        assert!(document
            .diagnostics
            .iter()
            .any(|d| d.message.contains("Unexpected indentation")));
    }

    #[test]
    fn test_short_marker_at_eof_is_text() {
        let document = parse_ok("!!");
        let root = document.root();
        assert_eq!(child_kinds(&document, root), vec![NodeKind::Paragraph]);
    }

    #[test]
    fn test_transition_at_eof_reports_error() {
        let document = parse_ok("text\n\n----\n");
        let root = document.root();
        let kinds = child_kinds(&document, root);
        assert!(kinds.contains(&NodeKind::Transition));
    }
}
