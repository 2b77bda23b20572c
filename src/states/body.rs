//! Body state: classifier of the first line of a block
//!
//! Each handler consumes its construct (possibly via a nested machine
//! in a specialized state) and leaves the cursor on the construct's
//! last line.

use super::{
    explicit, lists, message_with_literal, nested_list_parse, nested_parse, patterns,
    unindent_warning, StateKind, TransitionMatch,
};
use crate::diagnostics::Severity;
use crate::document::{NodeId, NodeKind};
use crate::machine::{RunControl, StateMachine};
use crate::parser::ParseContext;
use crate::source::LineStore;

pub fn blank(
    _sm: &mut StateMachine,
    _ctx: &mut ParseContext,
    mtch: &TransitionMatch<'_>,
    _context: &mut Vec<String>,
) -> Result<StateKind, RunControl> {
    Ok(mtch.next)
}

/// An indented block with no marker: a block quote.
pub fn indent(
    sm: &mut StateMachine,
    ctx: &mut ParseContext,
    mtch: &TransitionMatch<'_>,
    _context: &mut Vec<String>,
) -> Result<StateKind, RunControl> {
    let (indented, _indent, line_offset, blank_finish) = sm.get_indented(false, true);
    let quote = block_quote(sm, ctx, indented, line_offset)?;
    let parent = sm.node;
    ctx.document.append(parent, quote);
    if !blank_finish {
        let warning = unindent_warning(sm, ctx, "Block quote");
        ctx.document.append(parent, warning);
    }
    Ok(mtch.next)
}

pub fn block_quote(
    sm: &mut StateMachine,
    ctx: &mut ParseContext,
    indented: LineStore,
    line_offset: usize,
) -> Result<NodeId, RunControl> {
    let rawsource = indented.texts().join("\n");
    let quote = ctx.document.new_node(NodeKind::BlockQuote, rawsource);
    let (source, line) = sm.get_source_and_line(Some(line_offset + 1));
    {
        let data = ctx.document.node_mut(quote);
        data.source = source;
        data.line = line;
    }
    nested_parse(sm, ctx, indented, line_offset, quote, false)?;
    Ok(quote)
}

pub fn bullet(
    sm: &mut StateMachine,
    ctx: &mut ParseContext,
    mtch: &TransitionMatch<'_>,
    _context: &mut Vec<String>,
) -> Result<StateKind, RunControl> {
    let bullet_list = ctx.document.new_node(NodeKind::BulletList, "");
    let (source, line) = sm.get_source_and_line(None);
    {
        let data = ctx.document.node_mut(bullet_list);
        data.source = source;
        data.line = line;
        let bullet: String = mtch.text.chars().take(1).collect();
        data.set_attr("bullet", bullet);
    }
    let parent = sm.node;
    ctx.document.append(parent, bullet_list);
    let (item, blank_finish) = lists::list_item(sm, ctx, mtch.char_end())?;
    ctx.document.append(bullet_list, item);

    let offset = (sm.line_offset + 1).max(0) as usize;
    let rest = sm.store.slice(offset, sm.store.len());
    let input_offset = sm.abs_line_offset() + 1;
    let (new_offset, blank_finish) = nested_list_parse(
        sm,
        ctx,
        rest,
        input_offset,
        bullet_list,
        StateKind::BulletList,
        blank_finish,
        None,
        false,
    )?;
    sm.goto_line(new_offset);
    if !blank_finish {
        let warning = unindent_warning(sm, ctx, "Bullet list");
        ctx.document.append(parent, warning);
    }
    Ok(mtch.next)
}

pub fn enumerator(
    sm: &mut StateMachine,
    ctx: &mut ParseContext,
    mtch: &TransitionMatch<'_>,
    _context: &mut Vec<String>,
) -> Result<StateKind, RunControl> {
    let parsed = lists::parse_enumerator(&mtch.captures, None)?;
    let is_item =
        lists::is_enumerated_list_item(sm, parsed.ordinal, parsed.sequence, parsed.format)?;
    let ordinal = match (parsed.ordinal, is_item) {
        (Some(ordinal), true) => ordinal,
        _ => return Err(RunControl::TransitionCorrection("text")),
    };

    let enum_list = ctx.document.new_node(NodeKind::EnumeratedList, "");
    {
        let data = ctx.document.node_mut(enum_list);
        data.set_attr("enumtype", parsed.sequence.effective_name());
        data.set_attr("prefix", parsed.format.prefix());
        data.set_attr("suffix", parsed.format.suffix());
    }
    let parent = sm.node;
    ctx.document.append(parent, enum_list);
    if ordinal != 1 {
        ctx.document
            .node_mut(enum_list)
            .set_attr("start", ordinal as i64);
        let lineno = sm.abs_line_number();
        let msg = ctx.system_message(
            Severity::Info,
            &format!(
                "Enumerated list start value not ordinal-1: \"{}\" (ordinal {})",
                parsed.text, ordinal
            ),
            Some(lineno),
        );
        ctx.document.append(parent, msg);
    }

    let (item, blank_finish) = lists::list_item(sm, ctx, mtch.char_end())?;
    ctx.document.append(enum_list, item);

    let offset = (sm.line_offset + 1).max(0) as usize;
    let rest = sm.store.slice(offset, sm.store.len());
    let input_offset = sm.abs_line_offset() + 1;
    let (new_offset, blank_finish) = nested_list_parse(
        sm,
        ctx,
        rest,
        input_offset,
        enum_list,
        StateKind::EnumeratedList,
        blank_finish,
        Some(lists::EnumScratch {
            format: parsed.format,
            auto: parsed.sequence == lists::EnumSequence::Auto,
            last_ordinal: ordinal,
        }),
        false,
    )?;
    sm.goto_line(new_offset);
    if !blank_finish {
        let warning = unindent_warning(sm, ctx, "Enumerated list");
        ctx.document.append(parent, warning);
    }
    Ok(mtch.next)
}

pub fn field_marker(
    sm: &mut StateMachine,
    ctx: &mut ParseContext,
    mtch: &TransitionMatch<'_>,
    _context: &mut Vec<String>,
) -> Result<StateKind, RunControl> {
    if !lists::valid_field_name(&mtch.captures[1]) {
        return Err(RunControl::TransitionCorrection("text"));
    }
    let field_list = ctx.document.new_node(NodeKind::FieldList, "");
    let parent = sm.node;
    ctx.document.append(parent, field_list);
    let (field, blank_finish) = lists::field(sm, ctx, mtch, false)?;
    ctx.document.append(field_list, field);

    let offset = (sm.line_offset + 1).max(0) as usize;
    let rest = sm.store.slice(offset, sm.store.len());
    let input_offset = sm.abs_line_offset() + 1;
    let (new_offset, blank_finish) = nested_list_parse(
        sm,
        ctx,
        rest,
        input_offset,
        field_list,
        StateKind::FieldList,
        blank_finish,
        None,
        false,
    )?;
    sm.goto_line(new_offset);
    if !blank_finish {
        let warning = unindent_warning(sm, ctx, "Field list");
        ctx.document.append(parent, warning);
    }
    Ok(mtch.next)
}

pub fn option_marker(
    sm: &mut StateMachine,
    ctx: &mut ParseContext,
    mtch: &TransitionMatch<'_>,
    _context: &mut Vec<String>,
) -> Result<StateKind, RunControl> {
    let parent = sm.node;
    let item = match lists::option_list_item(sm, ctx, mtch) {
        Ok(parts) => parts,
        Err(lists::OptionItemError::Markup(detail)) => {
            // Not a valid option marker after all: degrade to a block
            // quote of the indented text.
            let lineno = sm.abs_line_number();
            let msg = ctx.system_message(
                Severity::Error,
                &format!("Invalid option list marker: {}", detail),
                Some(lineno),
            );
            ctx.document.append(parent, msg);
            let (indented, _indent, line_offset, blank_finish) =
                sm.get_first_known_indented(mtch.char_end(), false, true, true);
            let quote = block_quote(sm, ctx, indented, line_offset)?;
            ctx.document.append(parent, quote);
            if !blank_finish {
                let warning = unindent_warning(sm, ctx, "Option list");
                ctx.document.append(parent, warning);
            }
            return Ok(mtch.next);
        }
        Err(lists::OptionItemError::Control(control)) => return Err(control),
    };
    let (list_item, blank_finish) = item;

    let option_list = ctx.document.new_node(NodeKind::OptionList, "");
    ctx.document.append(parent, option_list);
    ctx.document.append(option_list, list_item);

    let offset = (sm.line_offset + 1).max(0) as usize;
    let rest = sm.store.slice(offset, sm.store.len());
    let input_offset = sm.abs_line_offset() + 1;
    let (new_offset, blank_finish) = nested_list_parse(
        sm,
        ctx,
        rest,
        input_offset,
        option_list,
        StateKind::OptionList,
        blank_finish,
        None,
        false,
    )?;
    sm.goto_line(new_offset);
    if !blank_finish {
        let warning = unindent_warning(sm, ctx, "Option list");
        ctx.document.append(parent, warning);
    }
    Ok(mtch.next)
}

pub fn doctest(
    sm: &mut StateMachine,
    ctx: &mut ParseContext,
    mtch: &TransitionMatch<'_>,
    _context: &mut Vec<String>,
) -> Result<StateKind, RunControl> {
    let block = sm
        .get_text_block(false)
        .map_err(|_| RunControl::Bug("doctest text block cannot be indented".to_string()))?;
    let data = block.texts().join("\n");
    let node = ctx.document.new_node(NodeKind::DoctestBlock, data.clone());
    ctx.document.node_mut(node).value = Some(data);
    let parent = sm.node;
    ctx.document.append(parent, node);
    Ok(mtch.next)
}

pub fn line_block(
    sm: &mut StateMachine,
    ctx: &mut ParseContext,
    mtch: &TransitionMatch<'_>,
    _context: &mut Vec<String>,
) -> Result<StateKind, RunControl> {
    let block = ctx.document.new_node(NodeKind::LineBlock, "");
    let parent = sm.node;
    ctx.document.append(parent, block);
    let lineno = sm.abs_line_number();
    let (line_node, messages, mut blank_finish) = lists::line_block_line(sm, ctx, mtch, lineno)?;
    ctx.document.append(block, line_node);
    ctx.document.append_all(parent, &messages);

    if !blank_finish {
        let offset = (sm.line_offset + 1).max(0) as usize;
        let rest = sm.store.slice(offset, sm.store.len());
        let input_offset = sm.abs_line_offset() + 1;
        let (new_offset, finished) = nested_list_parse(
            sm,
            ctx,
            rest,
            input_offset,
            block,
            StateKind::LineBlock,
            blank_finish,
            None,
            false,
        )?;
        sm.goto_line(new_offset);
        blank_finish = finished;
    }
    if !blank_finish {
        let lineno = sm.abs_line_number() + 1;
        let warning = ctx.system_message(
            Severity::Warning,
            "Line block ends without a blank line.",
            Some(lineno),
        );
        ctx.document.append(parent, warning);
    }
    if !ctx.document.children(block).is_empty() {
        let first = ctx.document.children(block)[0];
        if ctx.document.node(first).attr("indent").is_none() {
            ctx.document.node_mut(first).set_attr("indent", 0i64);
        }
        nest_line_block_lines(ctx, block);
    }
    Ok(mtch.next)
}

/// Group sibling `Line` nodes into nested line blocks by indent.
fn nest_line_block_lines(ctx: &mut ParseContext, block: NodeId) {
    let children: Vec<NodeId> = ctx.document.children(block).to_vec();
    // Inherit missing indents from the previous line.
    let mut previous: Option<i64> = None;
    for &child in &children {
        let indent = ctx.document.node(child).attr("indent").and_then(|v| v.as_int());
        match indent {
            Some(value) => previous = Some(value),
            None => {
                if let Some(value) = previous {
                    ctx.document.node_mut(child).set_attr("indent", value);
                }
            }
        }
    }
    nest_line_block_segment(ctx, block);
    strip_indent_attrs(ctx, block);
}

fn nest_line_block_segment(ctx: &mut ParseContext, block: NodeId) {
    let children: Vec<NodeId> = ctx.document.children(block).to_vec();
    let indents: Vec<i64> = children
        .iter()
        .map(|&c| ctx.document.node(c).attr("indent").and_then(|v| v.as_int()).unwrap_or(0))
        .collect();
    let least = indents.iter().copied().min().unwrap_or(0);

    let mut new_children: Vec<NodeId> = Vec::new();
    let mut pending: Vec<NodeId> = Vec::new();
    for (child, indent) in children.iter().copied().zip(indents) {
        if indent > least {
            pending.push(child);
        } else {
            if !pending.is_empty() {
                let nested = ctx.document.new_node(NodeKind::LineBlock, "");
                for &p in &pending {
                    ctx.document.append(nested, p);
                }
                nest_line_block_segment(ctx, nested);
                new_children.push(nested);
                pending.clear();
            }
            new_children.push(child);
        }
    }
    if !pending.is_empty() {
        let nested = ctx.document.new_node(NodeKind::LineBlock, "");
        for &p in &pending {
            ctx.document.append(nested, p);
        }
        nest_line_block_segment(ctx, nested);
        new_children.push(nested);
    }
    for &child in &new_children {
        ctx.document.node_mut(child).parent = Some(block);
    }
    ctx.document.node_mut(block).children = new_children;
}

fn strip_indent_attrs(ctx: &mut ParseContext, block: NodeId) {
    let children: Vec<NodeId> = ctx.document.children(block).to_vec();
    for child in children {
        ctx.document.node_mut(child).attributes.remove("indent");
        if ctx.document.node(child).kind == NodeKind::LineBlock {
            strip_indent_attrs(ctx, child);
        }
    }
}

pub fn explicit_markup(
    sm: &mut StateMachine,
    ctx: &mut ParseContext,
    mtch: &TransitionMatch<'_>,
    _context: &mut Vec<String>,
) -> Result<StateKind, RunControl> {
    let (nodes, blank_finish) = explicit::explicit_construct(sm, ctx, mtch)?;
    let parent = sm.node;
    ctx.document.append_all(parent, &nodes);
    explicit::explicit_list(sm, ctx, blank_finish)?;
    Ok(mtch.next)
}

pub fn anonymous(
    sm: &mut StateMachine,
    ctx: &mut ParseContext,
    mtch: &TransitionMatch<'_>,
    _context: &mut Vec<String>,
) -> Result<StateKind, RunControl> {
    let (nodes, blank_finish) = explicit::anonymous_target(sm, ctx, mtch)?;
    let parent = sm.node;
    ctx.document.append_all(parent, &nodes);
    explicit::explicit_list(sm, ctx, blank_finish)?;
    Ok(mtch.next)
}

/// Section title overline or transition marker.
pub fn line(
    sm: &mut StateMachine,
    ctx: &mut ParseContext,
    mtch: &TransitionMatch<'_>,
    context: &mut Vec<String>,
) -> Result<StateKind, RunControl> {
    if !patterns::uniform_line(mtch.text) {
        return Err(RunControl::TransitionCorrection("text"));
    }
    if sm.match_titles {
        *context = vec![mtch.text.to_string()];
        return Ok(StateKind::Line);
    }
    let trimmed = mtch.text.trim();
    if trimmed == "::" {
        return Err(RunControl::TransitionCorrection("text"));
    }
    if trimmed.len() < 4 {
        let lineno = sm.abs_line_number();
        let msg = ctx.system_message(
            Severity::Info,
            "Unexpected possible title overline or transition.\nTreating it as ordinary text because it's so short.",
            Some(lineno),
        );
        let parent = sm.node;
        ctx.document.append(parent, msg);
        return Err(RunControl::TransitionCorrection("text"));
    }
    let lineno = sm.abs_line_number();
    let block_text = sm.current_text();
    let msg = message_with_literal(
        ctx,
        Severity::Severe,
        "Unexpected section title or transition.",
        &block_text,
        Some(lineno),
    );
    let parent = sm.node;
    ctx.document.append(parent, msg);
    Ok(mtch.next)
}

/// Fallback: hand the line to the Text state for classification.
pub fn text(
    _sm: &mut StateMachine,
    _ctx: &mut ParseContext,
    mtch: &TransitionMatch<'_>,
    context: &mut Vec<String>,
) -> Result<StateKind, RunControl> {
    *context = vec![mtch.text.to_string()];
    Ok(StateKind::Text)
}

#[cfg(test)]
mod tests {
    use crate::directives::builtin::default_registry;
    use crate::document::NodeKind;
    use crate::parser::parse;
    use crate::settings::Settings;

    fn kinds_of_children(
        document: &crate::document::Document,
        id: crate::document::NodeId,
    ) -> Vec<NodeKind> {
        document
            .children(id)
            .iter()
            .map(|&c| document.node(c).kind)
            .collect()
    }

    fn parse_ok(text: &str) -> crate::document::Document {
        let settings = Settings::default();
        let registry = default_registry();
        parse("test", text, &settings, &registry).unwrap()
    }

    #[test]
    fn test_paragraph() {
        let document = parse_ok("A simple paragraph.");
        let root = document.root();
        assert_eq!(kinds_of_children(&document, root), vec![NodeKind::Paragraph]);
    }

    #[test]
    fn test_block_quote() {
        let document = parse_ok("paragraph\n\n   quoted text\n\nafter");
        let root = document.root();
        assert_eq!(
            kinds_of_children(&document, root),
            vec![NodeKind::Paragraph, NodeKind::BlockQuote, NodeKind::Paragraph]
        );
    }

    #[test]
    fn test_bullet_list_items() {
        let document = parse_ok("* one\n* two\n* three");
        let root = document.root();
        assert_eq!(kinds_of_children(&document, root), vec![NodeKind::BulletList]);
        let list = document.children(root)[0];
        assert_eq!(document.children(list).len(), 3);
        assert_eq!(
            document.node(list).attr("bullet").and_then(|v| v.as_str()),
            Some("*")
        );
    }

    #[test]
    fn test_nested_bullet_list() {
        let document = parse_ok("* outer\n\n  - inner one\n  - inner two");
        let root = document.root();
        let list = document.children(root)[0];
        let item = document.children(list)[0];
        let item_kinds = kinds_of_children(&document, item);
        assert_eq!(item_kinds, vec![NodeKind::Paragraph, NodeKind::BulletList]);
    }

    #[test]
    fn test_different_bullet_starts_new_list() {
        let document = parse_ok("* one\n- two");
        let root = document.root();
        let kinds = kinds_of_children(&document, root);
        // Second bullet opens a new list; a warning intervenes.
        assert_eq!(kinds[0], NodeKind::BulletList);
        assert!(kinds.contains(&NodeKind::SystemMessage));
    }

    #[test]
    fn test_doctest_block() {
        let document = parse_ok(">>> 1 + 1\n2");
        let root = document.root();
        assert_eq!(kinds_of_children(&document, root), vec![NodeKind::DoctestBlock]);
        let block = document.children(root)[0];
        assert_eq!(document.node(block).value.as_deref(), Some(">>> 1 + 1\n2"));
    }

    #[test]
    fn test_line_block_nesting() {
        let document = parse_ok("| one\n|    indented\n| two");
        let root = document.root();
        assert_eq!(kinds_of_children(&document, root), vec![NodeKind::LineBlock]);
        let block = document.children(root)[0];
        let kinds = kinds_of_children(&document, block);
        assert_eq!(
            kinds,
            vec![NodeKind::Line, NodeKind::LineBlock, NodeKind::Line]
        );
    }

    #[test]
    fn test_transition_like_line_without_titles() {
        // At document level titles are allowed, so a lone punctuation
        // run becomes a transition via the Line state.
        let document = parse_ok("paragraph\n\n----------\n\nafter");
        let root = document.root();
        assert_eq!(
            kinds_of_children(&document, root),
            vec![NodeKind::Paragraph, NodeKind::Transition, NodeKind::Paragraph]
        );
    }

    #[test]
    fn test_field_list() {
        let document = parse_ok(":author: someone\n:date: today");
        let root = document.root();
        assert_eq!(kinds_of_children(&document, root), vec![NodeKind::FieldList]);
        let list = document.children(root)[0];
        assert_eq!(document.children(list).len(), 2);
        let field = document.children(list)[0];
        assert_eq!(
            kinds_of_children(&document, field),
            vec![NodeKind::FieldName, NodeKind::FieldBody]
        );
    }

    #[test]
    fn test_option_list() {
        let document = parse_ok("-a  option a\n--long=VALUE  long option");
        let root = document.root();
        assert_eq!(kinds_of_children(&document, root), vec![NodeKind::OptionList]);
        let list = document.children(root)[0];
        assert_eq!(document.children(list).len(), 2);
    }

    #[test]
    fn test_enumerated_list() {
        let document = parse_ok("1. first\n2. second");
        let root = document.root();
        assert_eq!(
            kinds_of_children(&document, root),
            vec![NodeKind::EnumeratedList]
        );
        let list = document.children(root)[0];
        assert_eq!(document.children(list).len(), 2);
        assert_eq!(
            document.node(list).attr("enumtype").and_then(|v| v.as_str()),
            Some("arabic")
        );
    }

    #[test]
    fn test_enumerated_list_start_not_one() {
        let document = parse_ok("3. first\n4. second");
        let root = document.root();
        let kinds = kinds_of_children(&document, root);
        assert!(kinds.contains(&NodeKind::EnumeratedList));
        assert!(kinds.contains(&NodeKind::SystemMessage));
        let list = document
            .children(root)
            .iter()
            .copied()
            .find(|&c| document.node(c).kind == NodeKind::EnumeratedList)
            .unwrap();
        assert_eq!(document.node(list).attr("start").and_then(|v| v.as_int()), Some(3));
        assert_eq!(
            document.node(list).attr("suffix").and_then(|v| v.as_str()),
            Some(".")
        );
        assert_eq!(
            document.node(list).attr("prefix").and_then(|v| v.as_str()),
            Some("")
        );
        assert_eq!(document.children(list).len(), 2);
    }

    #[test]
    fn test_enumerator_without_list_is_text() {
        // "A. Einstein was a genius." should not open a list: the next
        // line is neither blank, indented, nor a successor enumerator.
        let document = parse_ok("A. Einstein was smart.\nNo list here.");
        let root = document.root();
        assert_eq!(kinds_of_children(&document, root), vec![NodeKind::Paragraph]);
    }
}
