//! Explicit markup: `..`-prefixed constructs
//!
//! Tries, in order: footnote, citation, hyperlink target, substitution
//! definition, directive. Anything else is a comment. A matched
//! construct that turns out malformed degrades to a comment plus a
//! warning.

use super::{nested_list_parse, nested_parse, patterns, unindent_warning, StateKind, TransitionMatch};
use crate::diagnostics::Severity;
use crate::directives::runtime;
use crate::document::{fully_normalize_name, NodeId, NodeKind};
use crate::inline::{escape2null, patterns::EMAIL, unescape};
use crate::machine::{RunControl, StateMachine};
use crate::parser::ParseContext;
use crate::source::{Line, LineStore};
use crate::states::message_with_literal;
use std::rc::Rc;

enum ConstructError {
    Markup(String),
    Control(RunControl),
}

impl From<RunControl> for ConstructError {
    fn from(control: RunControl) -> Self {
        ConstructError::Control(control)
    }
}

impl From<crate::machine::ParserBug> for ConstructError {
    fn from(bug: crate::machine::ParserBug) -> Self {
        ConstructError::Control(RunControl::Bug(bug.0))
    }
}

/// Decide which explicit construct this line opens and parse it.
pub fn explicit_construct(
    sm: &mut StateMachine,
    ctx: &mut ParseContext,
    mtch: &TransitionMatch<'_>,
) -> Result<(Vec<NodeId>, bool), RunControl> {
    type Construct = fn(
        &mut StateMachine,
        &mut ParseContext,
        &regex::Captures<'_>,
    ) -> Result<(Vec<NodeId>, bool), ConstructError>;
    let constructs: [(&'static once_cell::sync::Lazy<regex::Regex>, Construct); 5] = [
        (&patterns::FOOTNOTE, footnote),
        (&patterns::CITATION, citation),
        (&patterns::HYPERLINK_TARGET, hyperlink_target),
        (&patterns::SUBSTITUTION_DEF, substitution_def),
        (&patterns::DIRECTIVE, directive),
    ];
    for (pattern, construct) in constructs {
        if let Some(captures) = pattern.captures(mtch.text) {
            return match construct(sm, ctx, &captures) {
                Ok(result) => Ok(result),
                Err(ConstructError::Markup(message)) => {
                    let lineno = sm.abs_line_number();
                    let warning =
                        ctx.system_message(Severity::Warning, &message, Some(lineno));
                    let (mut nodes, blank_finish) = comment(sm, ctx, mtch)?;
                    nodes.push(warning);
                    Ok((nodes, blank_finish))
                }
                Err(ConstructError::Control(control)) => Err(control),
            };
        }
    }
    comment(sm, ctx, mtch)
}

/// Parse the series of adjacent explicit constructs that may follow.
pub fn explicit_list(
    sm: &mut StateMachine,
    ctx: &mut ParseContext,
    blank_finish: bool,
) -> Result<(), RunControl> {
    let offset = (sm.line_offset + 1).max(0) as usize;
    let rest = sm.store.slice(offset, sm.store.len());
    let input_offset = sm.abs_line_offset() + 1;
    let node = sm.node;
    let match_titles = sm.match_titles;
    let (new_offset, blank_finish) = nested_list_parse(
        sm,
        ctx,
        rest,
        input_offset,
        node,
        StateKind::Explicit,
        blank_finish,
        None,
        match_titles,
    )?;
    sm.goto_line(new_offset);
    if !blank_finish {
        let warning = unindent_warning(sm, ctx, "Explicit markup");
        ctx.document.append(node, warning);
    }
    Ok(())
}

pub fn comment(
    sm: &mut StateMachine,
    ctx: &mut ParseContext,
    mtch: &TransitionMatch<'_>,
) -> Result<(Vec<NodeId>, bool), RunControl> {
    if sm.is_next_line_blank() {
        let first_line = &mtch.text[mtch.end()..];
        if first_line.trim().is_empty() {
            let node = ctx.document.new_node(NodeKind::Comment, "");
            return Ok((vec![node], true));
        }
    }
    let (mut indented, _indent, _offset, blank_finish) =
        sm.get_first_known_indented(mtch.char_end(), false, true, true);
    while !indented.is_empty()
        && indented
            .line(indented.len() - 1)
            .map(|l| l.is_blank())
            .unwrap_or(false)
    {
        indented
            .trim_end(1)
            .map_err(|e| RunControl::Bug(e.to_string()))?;
    }
    let text = indented.texts().join("\n");
    let node = ctx.document.new_node(NodeKind::Comment, text.clone());
    ctx.document.node_mut(node).value = Some(text);
    Ok((vec![node], blank_finish))
}

fn footnote(
    sm: &mut StateMachine,
    ctx: &mut ParseContext,
    captures: &regex::Captures<'_>,
) -> Result<(Vec<NodeId>, bool), ConstructError> {
    let (source, line) = sm.get_source_and_line(None);
    let match_end = captures.get(0).map(|m| m.as_str().chars().count()).unwrap_or(0);
    let (indented, _indent, offset, blank_finish) =
        sm.get_first_known_indented(match_end, false, true, true);
    let label = captures[1].to_string();
    let name = fully_normalize_name(&label);

    let footnote = ctx
        .document
        .new_node(NodeKind::Footnote, indented.texts().join("\n"));
    {
        let data = ctx.document.node_mut(footnote);
        data.source = source;
        data.line = line;
    }
    if let Some(auto_name) = name.strip_prefix('#') {
        ctx.document.node_mut(footnote).set_attr("auto", 1i64);
        if !auto_name.is_empty() {
            let auto_name = auto_name.to_string();
            ctx.document.node_mut(footnote).names.push(auto_name);
        }
        ctx.document.note_autofootnote(footnote);
    } else if name == "*" {
        ctx.document.node_mut(footnote).set_attr("auto", "*");
        ctx.document.note_symbol_footnote(footnote);
    } else {
        let label_node = ctx.document.new_node(NodeKind::Label, "");
        let text = ctx.document.new_text(label);
        ctx.document.append(label_node, text);
        ctx.document.append(footnote, label_node);
        ctx.document.node_mut(footnote).names.push(name);
        ctx.document.note_footnote(footnote);
    }
    if ctx.document.node(footnote).names.is_empty() {
        let (_, messages) = ctx.document.set_id(footnote);
        let line = ctx.document.node(footnote).line;
        ctx.attach_name_messages(messages, Some(footnote), line);
    } else {
        let messages = ctx.document.note_explicit_target(footnote);
        let line = ctx.document.node(footnote).line;
        ctx.attach_name_messages(messages, Some(footnote), line);
    }
    if !indented.is_empty() {
        nested_parse(sm, ctx, indented, offset, footnote, false)?;
    }
    Ok((vec![footnote], blank_finish))
}

fn citation(
    sm: &mut StateMachine,
    ctx: &mut ParseContext,
    captures: &regex::Captures<'_>,
) -> Result<(Vec<NodeId>, bool), ConstructError> {
    let (source, line) = sm.get_source_and_line(None);
    let match_end = captures.get(0).map(|m| m.as_str().chars().count()).unwrap_or(0);
    let (indented, _indent, offset, blank_finish) =
        sm.get_first_known_indented(match_end, false, true, true);
    let label = captures[1].to_string();
    let name = fully_normalize_name(&label);

    let citation = ctx
        .document
        .new_node(NodeKind::Citation, indented.texts().join("\n"));
    {
        let data = ctx.document.node_mut(citation);
        data.source = source;
        data.line = line;
    }
    let label_node = ctx.document.new_node(NodeKind::Label, "");
    let text = ctx.document.new_text(label);
    ctx.document.append(label_node, text);
    ctx.document.append(citation, label_node);
    ctx.document.node_mut(citation).names.push(name);
    ctx.document.note_citation(citation);
    let messages = ctx.document.note_explicit_target(citation);
    let line = ctx.document.node(citation).line;
    ctx.attach_name_messages(messages, Some(citation), line);
    if !indented.is_empty() {
        nested_parse(sm, ctx, indented, offset, citation, false)?;
    }
    Ok((vec![citation], blank_finish))
}

// --- Hyperlink targets ---

fn hyperlink_target(
    sm: &mut StateMachine,
    ctx: &mut ParseContext,
    captures: &regex::Captures<'_>,
) -> Result<(Vec<NodeId>, bool), ConstructError> {
    let lineno = sm.abs_line_number();
    let match_end = captures.get(1).map(|m| m.end()).unwrap_or(0);
    let first_line = sm.current_text();
    let (block, _indent, _offset, blank_finish) =
        sm.get_first_known_indented(match_end, true, false, true);
    let block_text = format!(
        "{}{}",
        &first_line[..match_end.min(first_line.len())],
        block.texts().join("\n")
    );
    let lines: Vec<String> = block.texts().iter().map(|l| escape2null(l)).collect();
    if lines.is_empty() {
        return Err(ConstructError::Markup("malformed hyperlink target.".to_string()));
    }
    let mut escaped = lines[0].clone();
    let mut block_index = 0;
    let (name, rest_start) = loop {
        if let Some(found) = match_target_name(&escaped) {
            break found;
        }
        block_index += 1;
        match lines.get(block_index) {
            Some(next) => escaped.push_str(next),
            None => {
                return Err(ConstructError::Markup(
                    "malformed hyperlink target.".to_string(),
                ))
            }
        }
    };
    let mut rest: Vec<String> = vec![escaped[rest_start..].trim().to_string()];
    rest.extend(lines[block_index + 1..].iter().cloned());
    let target = make_target(sm, ctx, &rest, &block_text, lineno, &name)?;
    Ok((vec![target], blank_finish))
}

pub fn anonymous_target(
    sm: &mut StateMachine,
    ctx: &mut ParseContext,
    mtch: &TransitionMatch<'_>,
) -> Result<(Vec<NodeId>, bool), RunControl> {
    let lineno = sm.abs_line_number();
    let first_line = sm.current_text();
    let (block, _indent, _offset, blank_finish) =
        sm.get_first_known_indented(mtch.end(), true, true, true);
    let block_text = format!(
        "{}{}",
        &first_line[..mtch.end().min(first_line.len())],
        block.texts().join("\n")
    );
    let lines: Vec<String> = block.texts().iter().map(|l| escape2null(l)).collect();
    match make_target(sm, ctx, &lines, &block_text, lineno, "") {
        Ok(target) => Ok((vec![target], blank_finish)),
        Err(ConstructError::Markup(message)) => {
            let msg = ctx.system_message(Severity::Warning, &message, Some(lineno));
            Ok((vec![msg], blank_finish))
        }
        Err(ConstructError::Control(control)) => Err(control),
    }
}

/// Match the `name:` head of a target block. Returns the raw
/// (escaped) name, empty for anonymous, and the byte index just past
/// the colon.
fn match_target_name(escaped: &str) -> Option<(String, usize)> {
    // Anonymous: "_" [space] ":" (space | end)
    if let Some(rest) = escaped.strip_prefix('_') {
        let skip = usize::from(rest.starts_with(' '));
        let after = &rest[skip..];
        if let Some(tail) = after.strip_prefix(':') {
            if tail.is_empty() || tail.starts_with(' ') {
                return Some((String::new(), 1 + skip + 1));
            }
        }
    }
    // Quoted: "`name`" [space] ":" (space | end)
    if let Some(rest) = escaped.strip_prefix('`') {
        if rest.starts_with(' ') || rest.starts_with('`') {
            return None;
        }
        let mut prev = '\0';
        for (i, c) in rest.char_indices() {
            if c == '`' && prev != '\0' && prev != ' ' && i > 0 {
                let after = &rest[i + 1..];
                let skip = usize::from(after.starts_with(' '));
                if let Some(tail) = after[skip..].strip_prefix(':') {
                    if tail.is_empty() || tail.starts_with(' ') {
                        return Some((rest[..i].to_string(), 1 + i + 1 + skip + 1));
                    }
                }
                return None;
            }
            prev = c;
        }
        return None;
    }
    // Plain: name ":" (space | end); escaped colons are inert.
    let mut prev = ' ';
    for (i, c) in escaped.char_indices() {
        if c == ':' && prev != '\0' {
            let tail = &escaped[i + 1..];
            if tail.is_empty() || tail.starts_with(' ') {
                let mut name = escaped[..i].to_string();
                if name.ends_with(' ') {
                    name.pop();
                }
                if name.is_empty() || name.starts_with('_') || name.ends_with(':') {
                    return None;
                }
                return Some((name, i + 1));
            }
        }
        prev = c;
    }
    None
}

enum TargetData {
    Refname(String),
    Refuri(String),
}

fn parse_target(lines: &[String]) -> TargetData {
    let last_nonblank = lines.iter().rev().find(|l| !l.trim().is_empty());
    if let Some(last) = last_nonblank {
        if last.trim_end().ends_with('_') {
            let reference = lines
                .iter()
                .map(|l| l.trim())
                .filter(|l| !l.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            if let Some(refname) = is_reference(&reference) {
                return TargetData::Refname(refname);
            }
        }
    }
    // A URI: join the lines and drop all unescaped whitespace.
    let joined = lines.join(" ");
    let mut compact = String::with_capacity(joined.len());
    let mut prev = ' ';
    for c in joined.chars() {
        if !(c.is_whitespace() && prev != '\0') {
            compact.push(c);
        }
        prev = c;
    }
    TargetData::Refuri(unescape(&compact, false))
}

fn is_reference(reference: &str) -> Option<String> {
    let normalized = fully_normalize_name(reference);
    if let Some(simple) = normalized.strip_suffix('_') {
        if patterns::SIMPLENAME_FULL.is_match(simple) {
            return Some(unescape(simple, false));
        }
    }
    if normalized.starts_with('`') && normalized.ends_with("`_") && normalized.len() > 3 {
        let inner = &normalized[1..normalized.len() - 2];
        if !inner.trim().is_empty() {
            return Some(unescape(inner, false));
        }
    }
    None
}

fn adjust_uri(uri: &str) -> String {
    match EMAIL.find(uri) {
        Some(m) if m.start() == 0 && m.end() == uri.len() => format!("mailto:{}", uri),
        _ => uri.to_string(),
    }
}

fn make_target(
    sm: &mut StateMachine,
    ctx: &mut ParseContext,
    lines: &[String],
    block_text: &str,
    lineno: usize,
    target_name: &str,
) -> Result<NodeId, ConstructError> {
    match parse_target(lines) {
        TargetData::Refname(data) => {
            let target = ctx
                .document
                .new_node(NodeKind::Target, block_text.to_string());
            ctx.document
                .node_mut(target)
                .set_attr("refname", fully_normalize_name(&data));
            add_target(sm, ctx, target_name, "", target, lineno);
            ctx.document.note_indirect_target(target);
            Ok(target)
        }
        TargetData::Refuri(data) => {
            let target = ctx
                .document
                .new_node(NodeKind::Target, block_text.to_string());
            add_target(sm, ctx, target_name, &data, target, lineno);
            Ok(target)
        }
    }
}

fn add_target(
    sm: &mut StateMachine,
    ctx: &mut ParseContext,
    target_name: &str,
    refuri: &str,
    target: NodeId,
    lineno: usize,
) {
    ctx.document.node_mut(target).line = Some(lineno);
    if !target_name.is_empty() {
        let name = fully_normalize_name(&unescape(target_name, false));
        ctx.document.node_mut(target).names.push(name);
        if !refuri.is_empty() {
            let uri = adjust_uri(refuri);
            ctx.document.node_mut(target).set_attr("refuri", uri);
        }
        let messages = ctx.document.note_explicit_target(target);
        let parent = sm.node;
        ctx.attach_name_messages(messages, Some(parent), Some(lineno));
    } else {
        if !refuri.is_empty() {
            ctx.document.node_mut(target).set_attr("refuri", refuri);
        }
        ctx.document.node_mut(target).set_attr("anonymous", true);
        ctx.document.note_anonymous_target(target);
    }
}

// --- Substitution definitions ---

fn substitution_def(
    sm: &mut StateMachine,
    ctx: &mut ParseContext,
    captures: &regex::Captures<'_>,
) -> Result<(Vec<NodeId>, bool), ConstructError> {
    let (source, srcline) = sm.get_source_and_line(None);
    let match_end = captures.get(1).map(|m| m.end()).unwrap_or(0);
    let first_line = sm.current_text();
    let (mut block, _indent, mut offset, blank_finish) =
        sm.get_first_known_indented(match_end, false, false, true);
    let block_text = format!(
        "{}{}",
        &first_line[..match_end.min(first_line.len())],
        block.texts().join("\n")
    );
    block.disconnect();
    let lines = block.texts();
    if lines.is_empty() {
        return Err(ConstructError::Markup(
            "malformed substitution definition.".to_string(),
        ));
    }
    let mut escaped = escape2null(lines[0].trim_end());
    let mut block_index = 0;
    let (subname, rest_start) = loop {
        if let Some(found) = match_substitution_name(&escaped) {
            break found;
        }
        block_index += 1;
        match lines.get(block_index) {
            Some(next) => {
                escaped.push(' ');
                escaped.push_str(&escape2null(next.trim()));
            }
            None => {
                return Err(ConstructError::Markup(
                    "malformed substitution definition.".to_string(),
                ))
            }
        }
    };
    let mut content: Vec<String> = vec![unescape(&escaped[rest_start..], true).trim().to_string()];
    content.extend(lines[block_index + 1..].iter().cloned());
    if content.first().map(|c| c.is_empty()).unwrap_or(false) {
        content.remove(0);
        offset += 1;
    }
    while content.last().map(|c| c.trim().is_empty()).unwrap_or(false) {
        content.pop();
    }

    let node = ctx
        .document
        .new_node(NodeKind::SubstitutionDefinition, block_text.clone());
    {
        let data = ctx.document.node_mut(node);
        data.source = source.clone();
        data.line = srcline;
    }
    if content.is_empty() {
        let msg = message_with_literal(
            ctx,
            Severity::Warning,
            &format!("Substitution definition \"{}\" missing contents.", subname),
            &block_text,
            srcline,
        );
        return Ok((vec![msg], blank_finish));
    }
    let normalized = fully_normalize_name(&subname);
    ctx.document.node_mut(node).names.push(normalized.clone());

    let source_id: Rc<str> = Rc::from(source.as_deref().unwrap_or("<substitution>"));
    let store = LineStore::new(
        content
            .iter()
            .enumerate()
            .map(|(i, text)| Line::new(text.clone(), Rc::clone(&source_id), offset + i))
            .collect(),
    );
    let (_, blank_finish) = nested_list_parse(
        sm,
        ctx,
        store,
        offset,
        node,
        StateKind::SubstitutionDef,
        blank_finish,
        None,
        false,
    )?;

    // Block-level children do not belong inside a substitution: a
    // single paragraph is unwrapped, everything else moves out.
    let children: Vec<NodeId> = ctx.document.children(node).to_vec();
    if children.len() == 1 && ctx.document.node(children[0]).kind == NodeKind::Paragraph {
        let paragraph = children[0];
        let grandchildren: Vec<NodeId> = ctx.document.children(paragraph).to_vec();
        ctx.document.node_mut(node).children.clear();
        for child in grandchildren {
            ctx.document.append(node, child);
        }
    } else {
        let mut kept = Vec::new();
        let parent = sm.node;
        for child in children {
            let kind = ctx.document.node(child).kind;
            if kind.is_inline() {
                kept.push(child);
            } else {
                ctx.document.append(parent, child);
            }
        }
        ctx.document.node_mut(node).children = kept.clone();
        for &child in &kept {
            ctx.document.node_mut(child).parent = Some(node);
        }
    }

    if let Some(illegal) = find_disallowed(ctx, node) {
        let tag = ctx.document.node(illegal).kind.tag().to_string();
        let msg = message_with_literal(
            ctx,
            Severity::Error,
            &format!(
                "Substitution definition contains illegal element <{}>:",
                tag
            ),
            &block_text,
            srcline,
        );
        return Ok((vec![msg], blank_finish));
    }
    if ctx.document.children(node).is_empty() {
        let msg = message_with_literal(
            ctx,
            Severity::Warning,
            &format!("Substitution definition \"{}\" empty or invalid.", subname),
            &block_text,
            srcline,
        );
        return Ok((vec![msg], blank_finish));
    }
    ctx.document.note_substitution_def(&normalized, node);
    Ok((vec![node], blank_finish))
}

/// `name|` head of a substitution definition; the pipe must be
/// followed by whitespace or end of line.
fn match_substitution_name(escaped: &str) -> Option<(String, usize)> {
    if escaped.starts_with(' ') {
        return None;
    }
    let mut prev = ' ';
    for (i, c) in escaped.char_indices() {
        if c == '|' && i > 0 && prev != ' ' && prev != '\0' {
            let tail = &escaped[i + 1..];
            if tail.is_empty() || tail.starts_with(' ') {
                let name = unescape(&escaped[..i], false);
                let skip = tail.len() - tail.trim_start().len();
                return Some((name, i + 1 + skip));
            }
        }
        prev = c;
    }
    None
}

/// Elements that may not appear inside a substitution definition:
/// anything with ids, anonymous references, auto footnote references.
fn find_disallowed(ctx: &ParseContext, node: NodeId) -> Option<NodeId> {
    for &child in ctx.document.children(node) {
        let data = ctx.document.node(child);
        let illegal = !data.ids.is_empty()
            || (data.kind == NodeKind::Reference
                && data.attr("anonymous").and_then(|v| v.as_bool()) == Some(true))
            || (data.kind == NodeKind::FootnoteReference && data.attr("auto").is_some());
        if illegal {
            return Some(child);
        }
        if let Some(found) = find_disallowed(ctx, child) {
            return Some(found);
        }
    }
    None
}

// --- Directives ---

fn directive(
    sm: &mut StateMachine,
    ctx: &mut ParseContext,
    captures: &regex::Captures<'_>,
) -> Result<(Vec<NodeId>, bool), ConstructError> {
    let type_name = captures[1].to_string();
    let match_end = captures.get(0).map(|m| m.end()).unwrap_or(0);
    runtime::directive(sm, ctx, &type_name, match_end).map_err(ConstructError::Control)
}

// --- Specialized state handlers ---

pub fn explicit_item(
    sm: &mut StateMachine,
    ctx: &mut ParseContext,
    mtch: &TransitionMatch<'_>,
    _context: &mut Vec<String>,
) -> Result<StateKind, RunControl> {
    let (nodes, blank_finish) = explicit_construct(sm, ctx, mtch)?;
    let parent = sm.node;
    ctx.document.append_all(parent, &nodes);
    sm.scratch.blank_finish = blank_finish;
    Ok(mtch.next)
}

pub fn anonymous_item(
    sm: &mut StateMachine,
    ctx: &mut ParseContext,
    mtch: &TransitionMatch<'_>,
    _context: &mut Vec<String>,
) -> Result<StateKind, RunControl> {
    let (nodes, blank_finish) = anonymous_target(sm, ctx, mtch)?;
    let parent = sm.node;
    ctx.document.append_all(parent, &nodes);
    sm.scratch.blank_finish = blank_finish;
    Ok(mtch.next)
}

/// The content of a substitution definition must be an embedded
/// directive; its output becomes the substitution's children.
pub fn embedded_directive(
    sm: &mut StateMachine,
    ctx: &mut ParseContext,
    mtch: &TransitionMatch<'_>,
    _context: &mut Vec<String>,
) -> Result<StateKind, RunControl> {
    let type_name = mtch.captures[1].to_string();
    let (nodes, blank_finish) = runtime::directive(sm, ctx, &type_name, mtch.end())?;
    let parent = sm.node;
    ctx.document.append_all(parent, &nodes);
    if !sm.at_eof() {
        sm.scratch.blank_finish = blank_finish;
    }
    Err(RunControl::Eof)
}

pub fn substitution_text(
    sm: &mut StateMachine,
    _ctx: &mut ParseContext,
    _mtch: &TransitionMatch<'_>,
    _context: &mut Vec<String>,
) -> Result<StateKind, RunControl> {
    if !sm.at_eof() {
        sm.scratch.blank_finish = sm.is_next_line_blank();
    }
    Err(RunControl::Eof)
}

#[cfg(test)]
mod tests {
    use super::match_substitution_name;
    use super::match_target_name;
    use crate::directives::builtin::default_registry;
    use crate::document::{AttrValue, NodeKind};
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
    fn test_match_target_name_forms() {
        assert_eq!(match_target_name("name: uri"), Some(("name".to_string(), 5)));
        assert_eq!(match_target_name("_: uri"), Some((String::new(), 2)));
        assert_eq!(
            match_target_name("`a name with: colon`: uri"),
            Some(("a name with: colon".to_string(), 21))
        );
        assert_eq!(match_target_name("no colon here"), None);
    }

    #[test]
    fn test_match_substitution_name() {
        let (name, rest) = match_substitution_name("arrow| unicode:: U+27A4").unwrap();
        assert_eq!(name, "arrow");
        assert_eq!(&"arrow| unicode:: U+27A4"[rest..], "unicode:: U+27A4");
        assert!(match_substitution_name("no pipe").is_none());
    }

    #[test]
    fn test_comment() {
        let document = parse_ok(".. just a comment\n   with continuation");
        let root = document.root();
        assert_eq!(child_kinds(&document, root), vec![NodeKind::Comment]);
        let comment = document.children(root)[0];
        assert_eq!(
            document.node(comment).value.as_deref(),
            Some("just a comment\nwith continuation")
        );
    }

    #[test]
    fn test_empty_comment() {
        let document = parse_ok("..\n\ntext");
        let root = document.root();
        assert_eq!(
            child_kinds(&document, root),
            vec![NodeKind::Comment, NodeKind::Paragraph]
        );
    }

    #[test]
    fn test_hyperlink_target_with_uri() {
        let document = parse_ok(".. _example: https://example.com/page");
        let root = document.root();
        assert_eq!(child_kinds(&document, root), vec![NodeKind::Target]);
        let target = document.children(root)[0];
        assert_eq!(document.node(target).names, vec!["example"]);
        assert_eq!(
            document.node(target).attr("refuri").and_then(|v| v.as_str()),
            Some("https://example.com/page")
        );
        assert_eq!(
            document.name_id("example"),
            Some(&Some("example".to_string()))
        );
    }

    #[test]
    fn test_indirect_target() {
        let document = parse_ok(".. _alias: original_");
        let root = document.root();
        let target = document.children(root)[0];
        assert_eq!(
            document.node(target).attr("refname").and_then(|v| v.as_str()),
            Some("original")
        );
        assert_eq!(document.indirect_targets.len(), 1);
    }

    #[test]
    fn test_anonymous_target() {
        let document = parse_ok("__ https://example.com");
        let root = document.root();
        let target = document.children(root)[0];
        assert_eq!(document.node(target).kind, NodeKind::Target);
        assert_eq!(
            document.node(target).attr("anonymous"),
            Some(&AttrValue::Bool(true))
        );
        assert_eq!(document.anonymous_targets.len(), 1);
    }

    #[test]
    fn test_email_target_gets_mailto() {
        let document = parse_ok(".. _contact: someone@example.org");
        let root = document.root();
        let target = document.children(root)[0];
        assert_eq!(
            document.node(target).attr("refuri").and_then(|v| v.as_str()),
            Some("mailto:someone@example.org")
        );
    }

    #[test]
    fn test_footnote() {
        let document = parse_ok(".. [1] A footnote body.");
        let root = document.root();
        assert_eq!(child_kinds(&document, root), vec![NodeKind::Footnote]);
        let footnote = document.children(root)[0];
        assert_eq!(
            child_kinds(&document, footnote),
            vec![NodeKind::Label, NodeKind::Paragraph]
        );
        assert_eq!(document.footnotes.len(), 1);
    }

    #[test]
    fn test_auto_footnote() {
        let document = parse_ok(".. [#note] Auto-numbered.");
        let root = document.root();
        let footnote = document.children(root)[0];
        assert_eq!(
            document.node(footnote).attr("auto").and_then(|v| v.as_int()),
            Some(1)
        );
        assert_eq!(document.node(footnote).names, vec!["note"]);
        assert_eq!(document.autofootnotes.len(), 1);
    }

    #[test]
    fn test_citation() {
        let document = parse_ok(".. [CIT2002] A citation.");
        let root = document.root();
        assert_eq!(child_kinds(&document, root), vec![NodeKind::Citation]);
        assert_eq!(document.citations.len(), 1);
    }

    #[test]
    fn test_substitution_definition() {
        let document = parse_ok(".. |arrow| unicode:: U+27A4");
        let root = document.root();
        assert_eq!(
            child_kinds(&document, root),
            vec![NodeKind::SubstitutionDefinition]
        );
        let def = document.children(root)[0];
        assert_eq!(document.node(def).names, vec!["arrow"]);
        assert_eq!(document.astext(def), "\u{27A4}");
        assert!(document.substitution_def("arrow").is_some());
    }

    #[test]
    fn test_substitution_definition_empty_is_warning() {
        let document = parse_ok(".. |empty|");
        assert!(document
            .diagnostics
            .iter()
            .any(|d| d.message.contains("missing contents")));
    }

    #[test]
    fn test_unknown_directive() {
        let document = parse_ok(".. nosuchthing:: arg");
        assert!(document
            .diagnostics
            .iter()
            .any(|d| d.message.contains("Unknown directive type \"nosuchthing\"")));
    }

    #[test]
    fn test_explicit_series() {
        let document = parse_ok(".. _one: https://example.com/1\n.. _two: https://example.com/2");
        let root = document.root();
        assert_eq!(
            child_kinds(&document, root),
            vec![NodeKind::Target, NodeKind::Target]
        );
    }
}
