//! List machinery: items, enumerators, fields, options, line blocks
//!
//! The specialized states here accept only continuations of the list
//! they were started for; anything else hands control back to the
//! parent machine. Enumerated lists additionally verify that each item
//! extends the ordinal sequence.

use super::{nested_parse, patterns, StateKind, TransitionMatch};
use crate::document::{NodeId, NodeKind};
use crate::inline::parse_inline;
use crate::machine::{RunControl, StateMachine};
use crate::parser::ParseContext;
use crate::util::{from_roman, to_roman};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumFormat {
    Parens,
    Rparen,
    Period,
}

impl EnumFormat {
    pub fn prefix(self) -> &'static str {
        match self {
            EnumFormat::Parens => "(",
            EnumFormat::Rparen | EnumFormat::Period => "",
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            EnumFormat::Parens | EnumFormat::Rparen => ")",
            EnumFormat::Period => ".",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumSequence {
    Auto,
    Arabic,
    LowerAlpha,
    UpperAlpha,
    LowerRoman,
    UpperRoman,
}

impl EnumSequence {
    /// Attribute value; auto-enumerated lists render as arabic.
    pub fn effective_name(self) -> &'static str {
        match self {
            EnumSequence::Auto | EnumSequence::Arabic => "arabic",
            EnumSequence::LowerAlpha => "loweralpha",
            EnumSequence::UpperAlpha => "upperalpha",
            EnumSequence::LowerRoman => "lowerroman",
            EnumSequence::UpperRoman => "upperroman",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "arabic" => Some(EnumSequence::Arabic),
            "loweralpha" => Some(EnumSequence::LowerAlpha),
            "upperalpha" => Some(EnumSequence::UpperAlpha),
            "lowerroman" => Some(EnumSequence::LowerRoman),
            "upperroman" => Some(EnumSequence::UpperRoman),
            _ => None,
        }
    }

    fn matches(self, text: &str) -> bool {
        match self {
            EnumSequence::Auto => text == "#",
            EnumSequence::Arabic => text.bytes().all(|b| b.is_ascii_digit()),
            EnumSequence::LowerAlpha => {
                text.len() == 1 && text.bytes().all(|b| b.is_ascii_lowercase())
            }
            EnumSequence::UpperAlpha => {
                text.len() == 1 && text.bytes().all(|b| b.is_ascii_uppercase())
            }
            EnumSequence::LowerRoman => text.bytes().all(|b| b"ivxlcdm".contains(&b)),
            EnumSequence::UpperRoman => text.bytes().all(|b| b"IVXLCDM".contains(&b)),
        }
    }

    fn convert(self, text: &str) -> Option<u32> {
        match self {
            EnumSequence::Auto => Some(1),
            EnumSequence::Arabic => text.parse().ok(),
            EnumSequence::LowerAlpha => Some((text.as_bytes()[0] - b'a' + 1) as u32),
            EnumSequence::UpperAlpha => Some((text.as_bytes()[0] - b'A' + 1) as u32),
            EnumSequence::LowerRoman | EnumSequence::UpperRoman => from_roman(text).ok(),
        }
    }
}

/// Continuation data carried by an enumerated-list machine.
#[derive(Debug, Clone, Copy)]
pub struct EnumScratch {
    pub format: EnumFormat,
    pub auto: bool,
    pub last_ordinal: u32,
}

pub struct ParsedEnumerator {
    pub format: EnumFormat,
    pub sequence: EnumSequence,
    pub text: String,
    pub ordinal: Option<u32>,
}

/// Interpret an enumerator match: its format, sequence kind, bare
/// text, and ordinal (None when the spelling has no value, such as a
/// non-canonical Roman numeral).
pub fn parse_enumerator(
    captures: &regex::Captures<'_>,
    expected: Option<EnumSequence>,
) -> Result<ParsedEnumerator, RunControl> {
    let (format, raw) = if let Some(m) = captures.name("parens") {
        (EnumFormat::Parens, m.as_str())
    } else if let Some(m) = captures.name("rparen") {
        (EnumFormat::Rparen, m.as_str())
    } else if let Some(m) = captures.name("period") {
        (EnumFormat::Period, m.as_str())
    } else {
        return Err(RunControl::Bug("enumerator format not matched".to_string()));
    };
    let text = raw
        .strip_prefix(format.prefix())
        .and_then(|t| t.strip_suffix(format.suffix()))
        .unwrap_or(raw)
        .to_string();

    let sequence = if text == "#" {
        EnumSequence::Auto
    } else if let Some(expected) = expected.filter(|e| e.matches(&text)) {
        expected
    } else if text == "i" {
        EnumSequence::LowerRoman
    } else if text == "I" {
        EnumSequence::UpperRoman
    } else {
        [
            EnumSequence::Arabic,
            EnumSequence::LowerAlpha,
            EnumSequence::UpperAlpha,
            EnumSequence::LowerRoman,
            EnumSequence::UpperRoman,
        ]
        .into_iter()
        .find(|s| s.matches(&text))
        .ok_or_else(|| RunControl::Bug("enumerator sequence not matched".to_string()))?
    };
    let ordinal = sequence.convert(&text);
    Ok(ParsedEnumerator {
        format,
        sequence,
        text,
        ordinal,
    })
}

/// The next enumerator spellings (explicit and auto) for a list, or
/// None when the ordinal cannot be spelled in the sequence.
pub fn make_enumerator(
    ordinal: u32,
    sequence: EnumSequence,
    format: EnumFormat,
) -> Option<(String, String)> {
    let text = match sequence {
        EnumSequence::Auto => "#".to_string(),
        EnumSequence::Arabic => ordinal.to_string(),
        EnumSequence::LowerAlpha => {
            if ordinal == 0 || ordinal > 26 {
                return None;
            }
            ((b'a' + ordinal as u8 - 1) as char).to_string()
        }
        EnumSequence::UpperAlpha => {
            if ordinal == 0 || ordinal > 26 {
                return None;
            }
            ((b'A' + ordinal as u8 - 1) as char).to_string()
        }
        EnumSequence::LowerRoman => to_roman(ordinal).ok()?.to_lowercase(),
        EnumSequence::UpperRoman => to_roman(ordinal).ok()?,
    };
    let next = format!("{}{}{} ", format.prefix(), text, format.suffix());
    let auto = format!("{}#{} ", format.prefix(), format.suffix());
    Some((next, auto))
}

/// Is this enumerator really a list item? The following line must be
/// blank, indented, or the successor enumerator (or its auto form).
pub fn is_enumerated_list_item(
    sm: &StateMachine,
    ordinal: Option<u32>,
    sequence: EnumSequence,
    format: EnumFormat,
) -> Result<bool, RunControl> {
    let Some(ordinal) = ordinal else {
        return Ok(false);
    };
    if sm.at_eof() {
        return Ok(true);
    }
    let next_index = (sm.line_offset + 1).max(0) as usize;
    let next_line = match sm.store.text(next_index) {
        Ok(text) => text,
        Err(_) => return Ok(true),
    };
    if next_line.trim().is_empty() || next_line.starts_with(' ') {
        return Ok(true);
    }
    match make_enumerator(ordinal + 1, sequence, format) {
        Some((next, auto)) => Ok(next_line.starts_with(&next)
            || next_line.starts_with(&auto)
            || next_line.trim_end() == next.trim_end()
            || next_line.trim_end() == auto.trim_end()),
        None => Ok(false),
    }
}

/// Parse one list item: the text after the marker plus its indented
/// continuation, nested-parsed into a `ListItem` node.
pub fn list_item(
    sm: &mut StateMachine,
    ctx: &mut ParseContext,
    marker_end: usize,
) -> Result<(NodeId, bool), RunControl> {
    let line = sm.current_text();
    let (indented, line_offset, blank_finish) = if line.chars().count() > marker_end {
        let (indented, offset, blank_finish) = sm.get_known_indented(marker_end, false, true);
        (indented, offset, blank_finish)
    } else {
        let (indented, _indent, offset, blank_finish) =
            sm.get_first_known_indented(marker_end, false, true, true);
        (indented, offset, blank_finish)
    };
    let rawsource = indented.texts().join("\n");
    let item = ctx.document.new_node(NodeKind::ListItem, rawsource);
    if !indented.is_empty() {
        nested_parse(sm, ctx, indented, line_offset, item, false)?;
    }
    Ok((item, blank_finish))
}

// --- Specialized list-state handlers ---

pub fn bullet_item(
    sm: &mut StateMachine,
    ctx: &mut ParseContext,
    mtch: &TransitionMatch<'_>,
    _context: &mut Vec<String>,
) -> Result<StateKind, RunControl> {
    let list_bullet = ctx
        .document
        .node(sm.node)
        .attr("bullet")
        .and_then(|v| v.as_str())
        .map(str::to_string);
    let this_bullet: String = mtch.text.chars().take(1).collect();
    if list_bullet != Some(this_bullet) {
        // Different bullet: a new list starts.
        sm.previous_line(1);
        return Err(RunControl::Eof);
    }
    let (item, blank_finish) = list_item(sm, ctx, mtch.end())?;
    let parent = sm.node;
    ctx.document.append(parent, item);
    sm.scratch.blank_finish = blank_finish;
    Ok(mtch.next)
}

pub fn enumerator_item(
    sm: &mut StateMachine,
    ctx: &mut ParseContext,
    mtch: &TransitionMatch<'_>,
    _context: &mut Vec<String>,
) -> Result<StateKind, RunControl> {
    let expected = ctx
        .document
        .node(sm.node)
        .attr("enumtype")
        .and_then(|v| v.as_str())
        .and_then(EnumSequence::from_name);
    let parsed = parse_enumerator(&mtch.captures, expected)?;
    let Some(scratch) = sm.scratch.enumerator else {
        return Err(RunControl::Bug(
            "enumerated list state without enumerator context".to_string(),
        ));
    };
    let sequence_continues = parsed.sequence == EnumSequence::Auto
        || (Some(parsed.sequence) == expected
            && !scratch.auto
            && parsed.ordinal == Some(scratch.last_ordinal + 1));
    if parsed.format != scratch.format
        || !sequence_continues
        || !is_enumerated_list_item(sm, parsed.ordinal, parsed.sequence, parsed.format)?
    {
        // Different enumeration: a new list starts.
        sm.previous_line(1);
        return Err(RunControl::Eof);
    }
    if parsed.sequence == EnumSequence::Auto {
        if let Some(scratch) = sm.scratch.enumerator.as_mut() {
            scratch.auto = true;
        }
    }
    let (item, blank_finish) = list_item(sm, ctx, mtch.end())?;
    let parent = sm.node;
    ctx.document.append(parent, item);
    sm.scratch.blank_finish = blank_finish;
    if let (Some(scratch), Some(ordinal)) = (sm.scratch.enumerator.as_mut(), parsed.ordinal) {
        scratch.last_ordinal = ordinal;
    }
    Ok(mtch.next)
}

/// DefinitionList: a text line is a potential term; the Definition
/// state decides based on the following line.
pub fn definition_text(
    _sm: &mut StateMachine,
    _ctx: &mut ParseContext,
    mtch: &TransitionMatch<'_>,
    context: &mut Vec<String>,
) -> Result<StateKind, RunControl> {
    *context = vec![mtch.text.to_string()];
    Ok(StateKind::Definition)
}

// --- Fields ---

/// A usable field name: non-empty, no surrounding whitespace, no
/// backquote (which would be inline markup, not a field).
pub fn valid_field_name(name: &str) -> bool {
    !name.is_empty()
        && name.trim() == name
        && !name.contains('`')
}

/// Parse one field: name (inline-parsed unless `raw_body`), then the
/// indented body.
pub fn field(
    sm: &mut StateMachine,
    ctx: &mut ParseContext,
    mtch: &TransitionMatch<'_>,
    raw_body: bool,
) -> Result<(NodeId, bool), RunControl> {
    let name = mtch.captures[1].to_string();
    let lineno = sm.abs_line_number();
    let (source, line) = sm.get_source_and_line(None);
    let (indented, _indent, line_offset, blank_finish) =
        sm.get_first_known_indented(mtch.char_end(), false, true, true);

    let field = ctx.document.new_node(NodeKind::Field, "");
    {
        let data = ctx.document.node_mut(field);
        data.source = source;
        data.line = line;
    }
    let field_name = ctx.document.new_node(NodeKind::FieldName, name.clone());
    let mut name_messages = Vec::new();
    if raw_body {
        let text = ctx.document.new_text(name);
        ctx.document.append(field_name, text);
    } else {
        let (name_nodes, messages) = parse_inline(ctx, &name, lineno);
        ctx.document.append_all(field_name, &name_nodes);
        name_messages = messages;
    }
    ctx.document.append(field, field_name);

    let body = ctx
        .document
        .new_node(NodeKind::FieldBody, indented.texts().join("\n"));
    ctx.document.append_all(body, &name_messages);
    ctx.document.append(field, body);
    if !indented.is_empty() {
        if raw_body {
            raw_field_body(ctx, &indented, body);
        } else {
            nested_parse(sm, ctx, indented, line_offset, body, false)?;
        }
    }
    Ok((field, blank_finish))
}

/// Extension-option bodies are not nested-parsed: blank-separated
/// runs become plain-text paragraphs.
fn raw_field_body(ctx: &mut ParseContext, indented: &crate::source::LineStore, body: NodeId) {
    let mut run: Vec<String> = Vec::new();
    let mut texts = indented.texts();
    texts.push(String::new());
    for line in texts {
        if !line.trim().is_empty() {
            run.push(line);
        } else if !run.is_empty() {
            let text = run.join("\n");
            let paragraph = ctx.document.new_node(NodeKind::Paragraph, text.clone());
            let child = ctx.document.new_text(text);
            ctx.document.append(paragraph, child);
            ctx.document.append(body, paragraph);
            run.clear();
        }
    }
}

pub fn field_item(
    sm: &mut StateMachine,
    ctx: &mut ParseContext,
    mtch: &TransitionMatch<'_>,
    _context: &mut Vec<String>,
) -> Result<StateKind, RunControl> {
    if !valid_field_name(&mtch.captures[1]) {
        sm.previous_line(1);
        return Err(RunControl::Eof);
    }
    let (field, blank_finish) = field(sm, ctx, mtch, false)?;
    let parent = sm.node;
    ctx.document.append(parent, field);
    sm.scratch.blank_finish = blank_finish;
    Ok(mtch.next)
}

pub fn extension_option_field(
    sm: &mut StateMachine,
    ctx: &mut ParseContext,
    mtch: &TransitionMatch<'_>,
    _context: &mut Vec<String>,
) -> Result<StateKind, RunControl> {
    if !valid_field_name(&mtch.captures[1]) {
        sm.previous_line(1);
        return Err(RunControl::Eof);
    }
    let (field, blank_finish) = field(sm, ctx, mtch, true)?;
    let parent = sm.node;
    ctx.document.append(parent, field);
    sm.scratch.blank_finish = blank_finish;
    Ok(mtch.next)
}

// --- Option lists ---

pub enum OptionItemError {
    Markup(String),
    Control(RunControl),
}

/// Parse `-o FILE, --output FILE  description` into an
/// `OptionListItem`.
pub fn option_list_item(
    sm: &mut StateMachine,
    ctx: &mut ParseContext,
    mtch: &TransitionMatch<'_>,
) -> Result<(NodeId, bool), OptionItemError> {
    let offset = sm.abs_line_offset();
    let options = parse_option_marker(ctx, mtch).map_err(OptionItemError::Markup)?;
    let (indented, _indent, line_offset, blank_finish) =
        sm.get_first_known_indented(mtch.char_end(), false, true, true);
    if indented.is_empty() {
        // Not an option list item: no description.
        sm.goto_line(offset);
        return Err(OptionItemError::Control(RunControl::TransitionCorrection(
            "text",
        )));
    }
    let group = ctx.document.new_node(NodeKind::OptionGroup, "");
    ctx.document.append_all(group, &options);
    let description = ctx
        .document
        .new_node(NodeKind::Description, indented.texts().join("\n"));
    let item = ctx.document.new_node(NodeKind::OptionListItem, "");
    ctx.document.append(item, group);
    ctx.document.append(item, description);
    nested_parse(sm, ctx, indented, line_offset, description, false)
        .map_err(|bug| OptionItemError::Control(RunControl::Bug(bug.0)))?;
    Ok((item, blank_finish))
}

/// Split the matched marker into `Option` nodes: one or two tokens
/// each, the argument joined by space, `=`, or nothing.
fn parse_option_marker(
    ctx: &mut ParseContext,
    mtch: &TransitionMatch<'_>,
) -> Result<Vec<NodeId>, String> {
    let marker = mtch.text[..mtch.end()].trim_end();
    let mut result = Vec::new();
    for option_string in marker.split(", ") {
        let mut tokens: Vec<String> = option_string.split_whitespace().map(str::to_string).collect();
        let mut delimiter = " ";
        if tokens.is_empty() {
            return Err(format!(
                "wrong number of option tokens (=0), should be 1 or 2: \"{}\"",
                option_string
            ));
        }
        if let Some((head, tail)) = tokens[0].clone().split_once('=') {
            tokens.splice(0..1, [head.to_string(), tail.to_string()]);
            delimiter = "=";
        } else if tokens[0].len() > 2
            && ((tokens[0].starts_with('-') && !tokens[0].starts_with("--"))
                || tokens[0].starts_with('+'))
        {
            let (head, tail) = (tokens[0][..2].to_string(), tokens[0][2..].to_string());
            tokens.splice(0..1, [head, tail]);
            delimiter = "";
        }
        if tokens.len() > 2 {
            return Err(format!(
                "wrong number of option tokens (={}), should be 1 or 2: \"{}\"",
                tokens.len(),
                option_string
            ));
        }
        let option = ctx
            .document
            .new_node(NodeKind::Option, option_string.to_string());
        let option_string_node = ctx
            .document
            .new_node(NodeKind::OptionString, tokens[0].clone());
        let text = ctx.document.new_text(tokens[0].clone());
        ctx.document.append(option_string_node, text);
        ctx.document.append(option, option_string_node);
        if tokens.len() > 1 {
            let argument = ctx
                .document
                .new_node(NodeKind::OptionArgument, tokens[1].clone());
            ctx.document
                .node_mut(argument)
                .set_attr("delimiter", delimiter);
            let text = ctx.document.new_text(tokens[1].clone());
            ctx.document.append(argument, text);
            ctx.document.append(option, argument);
        }
        result.push(option);
    }
    Ok(result)
}

pub fn option_item(
    sm: &mut StateMachine,
    ctx: &mut ParseContext,
    mtch: &TransitionMatch<'_>,
    _context: &mut Vec<String>,
) -> Result<StateKind, RunControl> {
    match option_list_item(sm, ctx, mtch) {
        Ok((item, blank_finish)) => {
            let parent = sm.node;
            ctx.document.append(parent, item);
            sm.scratch.blank_finish = blank_finish;
            Ok(mtch.next)
        }
        Err(OptionItemError::Markup(_)) => {
            sm.previous_line(1);
            Err(RunControl::Eof)
        }
        Err(OptionItemError::Control(control)) => Err(control),
    }
}

// --- Line blocks ---

/// One `| ...` line, inline-parsed, remembering its extra indent for
/// later nesting.
pub fn line_block_line(
    sm: &mut StateMachine,
    ctx: &mut ParseContext,
    mtch: &TransitionMatch<'_>,
    lineno: usize,
) -> Result<(NodeId, Vec<NodeId>, bool), RunControl> {
    let (indented, _indent, _line_offset, blank_finish) =
        sm.get_first_known_indented(mtch.char_end(), true, true, true);
    let text = indented.texts().join("\n");
    let (text_nodes, messages) = parse_inline(ctx, &text, lineno);
    let line = ctx.document.new_node(NodeKind::Line, text);
    ctx.document.append_all(line, &text_nodes);
    if mtch.text.trim_end() != "|" {
        let spaces = mtch.captures.get(1).map(|m| m.as_str().len()).unwrap_or(1);
        ctx.document
            .node_mut(line)
            .set_attr("indent", spaces as i64 - 1);
    }
    Ok((line, messages, blank_finish))
}

pub fn line_block_item(
    sm: &mut StateMachine,
    ctx: &mut ParseContext,
    mtch: &TransitionMatch<'_>,
    _context: &mut Vec<String>,
) -> Result<StateKind, RunControl> {
    let lineno = sm.abs_line_number();
    let (line, messages, blank_finish) = line_block_line(sm, ctx, mtch, lineno)?;
    let parent = sm.node;
    ctx.document.append(parent, line);
    let grandparent = ctx.document.node(parent).parent.unwrap_or(parent);
    ctx.document.append_all(grandparent, &messages);
    sm.scratch.blank_finish = blank_finish;
    Ok(mtch.next)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(text: &str) -> regex::Captures<'_> {
        patterns::ENUMERATOR.captures(text).unwrap()
    }

    #[test]
    fn test_parse_enumerator_formats() {
        let parsed = parse_enumerator(&caps("3. x"), None).unwrap();
        assert_eq!(parsed.format, EnumFormat::Period);
        assert_eq!(parsed.sequence, EnumSequence::Arabic);
        assert_eq!(parsed.ordinal, Some(3));

        let parsed = parse_enumerator(&caps("(b) x"), None).unwrap();
        assert_eq!(parsed.format, EnumFormat::Parens);
        assert_eq!(parsed.sequence, EnumSequence::LowerAlpha);
        assert_eq!(parsed.ordinal, Some(2));

        let parsed = parse_enumerator(&caps("iv) x"), None).unwrap();
        assert_eq!(parsed.format, EnumFormat::Rparen);
        assert_eq!(parsed.sequence, EnumSequence::LowerRoman);
        assert_eq!(parsed.ordinal, Some(4));
    }

    #[test]
    fn test_single_i_disambiguates_to_roman() {
        let parsed = parse_enumerator(&caps("i. x"), None).unwrap();
        assert_eq!(parsed.sequence, EnumSequence::LowerRoman);
        assert_eq!(parsed.ordinal, Some(1));
        let parsed = parse_enumerator(&caps("I. x"), None).unwrap();
        assert_eq!(parsed.sequence, EnumSequence::UpperRoman);
    }

    #[test]
    fn test_expected_sequence_wins() {
        // "i" in a loweralpha list is the letter i, not Roman 1.
        let parsed = parse_enumerator(&caps("i. x"), Some(EnumSequence::LowerAlpha)).unwrap();
        assert_eq!(parsed.sequence, EnumSequence::LowerAlpha);
        assert_eq!(parsed.ordinal, Some(9));
    }

    #[test]
    fn test_auto_enumerator() {
        let parsed = parse_enumerator(&caps("#. x"), None).unwrap();
        assert_eq!(parsed.sequence, EnumSequence::Auto);
        assert_eq!(parsed.ordinal, Some(1));
    }

    #[test]
    fn test_invalid_roman_has_no_ordinal() {
        let parsed = parse_enumerator(&caps("vv. x"), None).unwrap();
        assert_eq!(parsed.sequence, EnumSequence::LowerRoman);
        assert_eq!(parsed.ordinal, None);
    }

    #[test]
    fn test_make_enumerator() {
        let (next, auto) = make_enumerator(3, EnumSequence::Arabic, EnumFormat::Period).unwrap();
        assert_eq!(next, "3. ");
        assert_eq!(auto, "#. ");
        let (next, _) = make_enumerator(2, EnumSequence::UpperRoman, EnumFormat::Parens).unwrap();
        assert_eq!(next, "(II) ");
        assert!(make_enumerator(27, EnumSequence::LowerAlpha, EnumFormat::Period).is_none());
    }

    #[test]
    fn test_valid_field_name() {
        assert!(valid_field_name("template"));
        assert!(valid_field_name("multi word name"));
        assert!(!valid_field_name(""));
        assert!(!valid_field_name(" padded "));
        assert!(!valid_field_name("emphasis:`x"));
    }
}
