//! Inline markup tokenizer
//!
//! Operates on null-escaped text: candidate start points come from one
//! master pattern, the surrounding context decides whether they really
//! open markup, and each construct searches for its own end string in
//! the remainder. Unmatched stretches are scanned for standalone URIs
//! and email addresses before becoming plain text.

pub mod escape;
pub mod patterns;
pub mod punctuation;

pub use escape::{escape2null, unescape};

use crate::diagnostics::Severity;
use crate::directives::roles::RoleInput;
use crate::document::{fully_normalize_name, NodeId, NodeKind};
use crate::parser::ParseContext;
use patterns::{EMAIL, EMBEDDED_LINK, MASTER, ROLE_PREFIX, ROLE_SUFFIX, SIMPLENAME, URI};
use punctuation::{allowed_after_end, allowed_before_start, match_pair};

/// Which explicit start-string opened a construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StartToken {
    Strong,
    Emphasis,
    Literal,
    Target,
    Substitution,
}

impl StartToken {
    fn end_token(self) -> &'static str {
        match self {
            StartToken::Strong => "**",
            StartToken::Emphasis => "*",
            StartToken::Literal => "``",
            StartToken::Target => "`",
            StartToken::Substitution => "|",
        }
    }

    fn construct_name(self) -> &'static str {
        match self {
            StartToken::Strong => "strong",
            StartToken::Emphasis => "emphasis",
            StartToken::Literal => "literal",
            StartToken::Target => "internal target",
            StartToken::Substitution => "substitution reference",
        }
    }
}

#[derive(Debug)]
enum Candidate {
    Start {
        token: StartToken,
        start: usize,
        end: usize,
    },
    SimpleRef {
        start: usize,
        end: usize,
    },
    FootnoteRef {
        start: usize,
        end: usize,
    },
    Backquote {
        /// Start of the whole construct (role prefix included).
        start: usize,
        /// End of the backquote itself.
        end: usize,
        role_prefix: Option<String>,
    },
}

struct Outcome {
    before: String,
    nodes: Vec<NodeId>,
    rest: String,
    messages: Vec<NodeId>,
}

/// Tokenize `text` into inline nodes plus detached system messages.
pub fn parse_inline(
    ctx: &mut ParseContext,
    text: &str,
    lineno: usize,
) -> (Vec<NodeId>, Vec<NodeId>) {
    let mut remaining = escape2null(text);
    let mut nodes = Vec::new();
    let mut messages = Vec::new();
    loop {
        match find_candidate(ctx, &remaining) {
            Some(candidate) => {
                let outcome = dispatch(ctx, &remaining, candidate, lineno);
                if !outcome.before.is_empty() {
                    implicit_inline(ctx, &outcome.before, &mut nodes);
                }
                nodes.extend(outcome.nodes);
                messages.extend(outcome.messages);
                remaining = outcome.rest;
                if remaining.is_empty() {
                    break;
                }
            }
            None => {
                if !remaining.is_empty() {
                    implicit_inline(ctx, &remaining, &mut nodes);
                }
                break;
            }
        }
    }
    (nodes, messages)
}

fn prev_char(text: &str, at: usize) -> Option<char> {
    text[..at].chars().next_back()
}

fn next_char(text: &str, at: usize) -> Option<char> {
    text[at..].chars().next()
}

/// Start-context check shared by every construct: either at the very
/// beginning or after whitespace/opening punctuation (any character in
/// character-level mode, except an escape marker).
fn start_context_ok(ctx: &ParseContext, text: &str, start: usize) -> bool {
    match prev_char(text, start) {
        None => true,
        Some('\0') => false,
        Some(c) => ctx.settings.character_level_inline_markup || allowed_before_start(c),
    }
}

fn end_context_ok(ctx: &ParseContext, c: Option<char>) -> bool {
    match c {
        None => true,
        Some(c) => ctx.settings.character_level_inline_markup || allowed_after_end(c),
    }
}

/// Find the next position that genuinely opens an inline construct.
fn find_candidate(ctx: &ParseContext, text: &str) -> Option<Candidate> {
    let mut from = 0;
    while from <= text.len() {
        let caps = MASTER.captures_at(text, from)?;
        if let Some(m) = caps.name("start") {
            let (start, end) = (m.start(), m.end());
            if !start_context_ok(ctx, text, start) {
                from = start + 1;
                continue;
            }
            let following = next_char(text, end);
            match following {
                // A start-string at end of text opens nothing.
                None => {
                    from = end;
                    continue;
                }
                Some(c) if c.is_whitespace() => {
                    from = end;
                    continue;
                }
                Some(c) => {
                    // Quoted by a matching punctuation pair.
                    if let Some(prev) = prev_char(text, start) {
                        if match_pair(prev, c) {
                            from = end;
                            continue;
                        }
                    }
                }
            }
            let token = match m.as_str() {
                "**" => StartToken::Strong,
                "*" => StartToken::Emphasis,
                "``" => StartToken::Literal,
                "_`" => StartToken::Target,
                _ => StartToken::Substitution,
            };
            return Some(Candidate::Start { token, start, end });
        }
        if let Some(m) = caps.name("refend") {
            let (start, end) = (m.start(), m.end());
            let following_ok = match next_char(text, end) {
                None => true,
                Some(c) => !(c.is_alphanumeric() || c == '_'),
            };
            if start_context_ok(ctx, text, start) && following_ok {
                return Some(Candidate::SimpleRef { start, end });
            }
            from = start + 1;
            continue;
        }
        if let Some(m) = caps.name("fnend") {
            let (start, end) = (m.start(), m.end());
            let label = &text[start + 1..end - 2];
            let following_ok = match next_char(text, end) {
                None => true,
                Some(c) => !(c.is_alphanumeric() || c == '_'),
            };
            if start_context_ok(ctx, text, start) && following_ok && valid_footnote_label(label) {
                return Some(Candidate::FootnoteRef { start, end });
            }
            from = start + 1;
            continue;
        }
        if let Some(m) = caps.name("backquote") {
            let (bq_start, end) = (m.start(), m.end());
            let role_prefix = ROLE_SUFFIX
                .captures(&text[..bq_start])
                .map(|c| c.get(1).expect("role group").as_str().to_string());
            let start = match &role_prefix {
                Some(name) => bq_start - name.len() - 2,
                None => bq_start,
            };
            let following = next_char(text, end);
            let following_ok = matches!(following, Some(c) if !c.is_whitespace());
            if start_context_ok(ctx, text, start) && following_ok {
                let quoted = match (prev_char(text, start), following) {
                    (Some(prev), Some(next)) => match_pair(prev, next),
                    _ => false,
                };
                if !quoted {
                    return Some(Candidate::Backquote {
                        start,
                        end,
                        role_prefix,
                    });
                }
            }
            from = bq_start + 1;
            continue;
        }
        // Unreachable: every master alternative is handled above.
        return None;
    }
    None
}

fn valid_footnote_label(label: &str) -> bool {
    if label.is_empty() {
        return false;
    }
    label.bytes().all(|b| b.is_ascii_digit())
        || label == "#"
        || label == "*"
        || label
            .strip_prefix('#')
            .map(|rest| SIMPLENAME.is_match(rest))
            .unwrap_or(false)
        || SIMPLENAME.is_match(label)
}

/// First acceptable end-string occurrence in `after`: non-empty
/// content, unescaped, preceded by non-whitespace, followed by an
/// end context.
fn find_end(ctx: &ParseContext, after: &str, token: &str) -> Option<usize> {
    let mut from = 0;
    while let Some(rel) = after[from..].find(token) {
        let idx = from + rel;
        from = idx + 1;
        if idx == 0 {
            continue;
        }
        let prev = prev_char(after, idx)?;
        if prev.is_whitespace() || prev == '\0' {
            continue;
        }
        if end_context_ok(ctx, next_char(after, idx + token.len())) {
            return Some(idx);
        }
    }
    None
}

fn dispatch(ctx: &mut ParseContext, text: &str, candidate: Candidate, lineno: usize) -> Outcome {
    match candidate {
        Candidate::Start { token, start, end } => match token {
            StartToken::Strong | StartToken::Emphasis | StartToken::Literal => {
                basic_span(ctx, text, token, start, end, lineno)
            }
            StartToken::Target => inline_target(ctx, text, start, end, lineno),
            StartToken::Substitution => substitution_reference(ctx, text, start, end, lineno),
        },
        Candidate::SimpleRef { start, end } => simple_reference(ctx, text, start, end),
        Candidate::FootnoteRef { start, end } => footnote_reference(ctx, text, start, end),
        Candidate::Backquote {
            start,
            end,
            role_prefix,
        } => interpreted_or_phrase_ref(ctx, text, start, end, role_prefix, lineno),
    }
}

/// Shared failure path: the start-string stays literal text and a
/// warning is recorded.
fn unterminated(
    ctx: &mut ParseContext,
    text: &str,
    construct: &str,
    end: usize,
    lineno: usize,
) -> Outcome {
    let message = format!(
        "Inline {} start-string without end-string.",
        construct
    );
    let msg = ctx.system_message(Severity::Warning, &message, Some(lineno));
    Outcome {
        before: text[..end].to_string(),
        nodes: Vec::new(),
        rest: text[end..].to_string(),
        messages: vec![msg],
    }
}

fn basic_span(
    ctx: &mut ParseContext,
    text: &str,
    token: StartToken,
    start: usize,
    end: usize,
    lineno: usize,
) -> Outcome {
    let after = &text[end..];
    let end_token = token.end_token();
    let Some(idx) = find_end(ctx, after, end_token) else {
        return unterminated(ctx, text, token.construct_name(), end, lineno);
    };
    let content = &after[..idx];
    let rawsource = unescape(&text[start..end + idx + end_token.len()], true);
    let kind = match token {
        StartToken::Strong => NodeKind::Strong,
        StartToken::Emphasis => NodeKind::Emphasis,
        StartToken::Literal => NodeKind::Literal,
        _ => unreachable!("basic_span token"),
    };
    let value = unescape(content, token == StartToken::Literal);
    let node = ctx.document.new_node(kind, rawsource);
    ctx.document.node_mut(node).line = Some(lineno);
    let child = ctx.document.new_text(value);
    ctx.document.append(node, child);
    Outcome {
        before: text[..start].to_string(),
        nodes: vec![node],
        rest: after[idx + end_token.len()..].to_string(),
        messages: Vec::new(),
    }
}

fn inline_target(
    ctx: &mut ParseContext,
    text: &str,
    start: usize,
    end: usize,
    lineno: usize,
) -> Outcome {
    let after = &text[end..];
    let Some(idx) = find_end(ctx, after, "`") else {
        return unterminated(ctx, text, "internal target", end, lineno);
    };
    let content = unescape(&after[..idx], false);
    let rawsource = unescape(&text[start..end + idx + 1], true);
    let name = fully_normalize_name(&content);
    let node = ctx.document.new_node(NodeKind::Target, rawsource);
    ctx.document.node_mut(node).line = Some(lineno);
    ctx.document.node_mut(node).names.push(name);
    let child = ctx.document.new_text(content);
    ctx.document.append(node, child);
    let name_messages = ctx.document.note_explicit_target(node);
    let mut messages = Vec::new();
    for (severity, message) in name_messages {
        messages.push(ctx.system_message(severity, &message, Some(lineno)));
    }
    Outcome {
        before: text[..start].to_string(),
        nodes: vec![node],
        rest: after[idx + 1..].to_string(),
        messages,
    }
}

fn substitution_reference(
    ctx: &mut ParseContext,
    text: &str,
    start: usize,
    end: usize,
    lineno: usize,
) -> Outcome {
    let after = &text[end..];
    let Some(idx) = find_end_substitution(ctx, after) else {
        return unterminated(ctx, text, "substitution reference", end, lineno);
    };
    let content = unescape(&after[..idx], false);
    let refname = fully_normalize_name(&content);
    // Trailing underscores turn the substitution into a reference too.
    let mut consumed = idx + 1;
    let tail = &after[idx + 1..];
    let underscores = if tail.starts_with("__") {
        consumed += 2;
        2
    } else if tail.starts_with('_') {
        consumed += 1;
        1
    } else {
        0
    };
    let rawsource = unescape(&text[start..end + consumed], true);
    let subref = ctx
        .document
        .new_node(NodeKind::SubstitutionReference, rawsource.clone());
    ctx.document.node_mut(subref).line = Some(lineno);
    ctx.document
        .node_mut(subref)
        .set_attr("refname", refname.clone());
    let child = ctx.document.new_text(content);
    ctx.document.append(subref, child);
    ctx.document.note_substitution_ref(&refname, subref);

    let top = if underscores > 0 {
        let reference = ctx.document.new_node(NodeKind::Reference, rawsource);
        ctx.document.node_mut(reference).line = Some(lineno);
        if underscores == 2 {
            ctx.document.node_mut(reference).set_attr("anonymous", true);
            ctx.document.note_anonymous_ref(reference);
        } else {
            ctx.document
                .node_mut(reference)
                .set_attr("refname", refname.clone());
            ctx.document.note_refname(&refname, reference);
        }
        ctx.document.append(reference, subref);
        reference
    } else {
        subref
    };
    Outcome {
        before: text[..start].to_string(),
        nodes: vec![top],
        rest: after[consumed..].to_string(),
        messages: Vec::new(),
    }
}

/// Substitution end: a `|` that may be followed by reference
/// underscores before the end context.
fn find_end_substitution(ctx: &ParseContext, after: &str) -> Option<usize> {
    let mut from = 0;
    while let Some(rel) = after[from..].find('|') {
        let idx = from + rel;
        from = idx + 1;
        if idx == 0 {
            continue;
        }
        let prev = prev_char(after, idx)?;
        if prev.is_whitespace() || prev == '\0' {
            continue;
        }
        let tail = &after[idx + 1..];
        let suffix_len = if tail.starts_with("__") {
            2
        } else if tail.starts_with('_') {
            1
        } else {
            0
        };
        if end_context_ok(ctx, next_char(after, idx + 1 + suffix_len)) {
            return Some(idx);
        }
    }
    None
}

fn simple_reference(ctx: &mut ParseContext, text: &str, start: usize, end: usize) -> Outcome {
    let whole = &text[start..end];
    let anonymous = whole.ends_with("__");
    let name_part = &whole[..whole.len() - if anonymous { 2 } else { 1 }];
    let display = unescape(name_part, false);
    let refname = fully_normalize_name(&display);
    let node = ctx
        .document
        .new_node(NodeKind::Reference, unescape(whole, true));
    ctx.document.node_mut(node).set_attr("name", display.clone());
    let child = ctx.document.new_text(display);
    ctx.document.append(node, child);
    if anonymous {
        ctx.document.node_mut(node).set_attr("anonymous", true);
        ctx.document.note_anonymous_ref(node);
    } else {
        ctx.document.node_mut(node).set_attr("refname", refname.clone());
        ctx.document.note_refname(&refname, node);
    }
    Outcome {
        before: text[..start].to_string(),
        nodes: vec![node],
        rest: text[end..].to_string(),
        messages: Vec::new(),
    }
}

fn footnote_reference(ctx: &mut ParseContext, text: &str, start: usize, end: usize) -> Outcome {
    let label = &text[start + 1..end - 2];
    let mut before = text[..start].to_string();
    if ctx.settings.trim_footnote_reference_space {
        before.truncate(before.trim_end().len());
    }
    let rawsource = format!("[{}]_", label);
    let is_citation = !label.bytes().all(|b| b.is_ascii_digit())
        && label != "#"
        && label != "*"
        && !label.starts_with('#');
    let node = if is_citation {
        let refname = fully_normalize_name(label);
        let node = ctx.document.new_node(NodeKind::CitationReference, rawsource);
        ctx.document.node_mut(node).set_attr("refname", refname.clone());
        let child = ctx.document.new_text(label);
        ctx.document.append(node, child);
        ctx.document.note_citation_ref(&refname, node);
        node
    } else {
        let node = ctx.document.new_node(NodeKind::FootnoteReference, rawsource);
        if let Some(auto_label) = label.strip_prefix('#') {
            ctx.document.node_mut(node).set_attr("auto", 1i64);
            ctx.document.note_autofootnote_ref(node);
            if !auto_label.is_empty() {
                let refname = fully_normalize_name(auto_label);
                ctx.document.node_mut(node).set_attr("refname", refname.clone());
                ctx.document.note_footnote_ref(&refname, node);
            }
        } else if label == "*" {
            ctx.document.node_mut(node).set_attr("auto", "*");
            ctx.document.note_symbol_footnote_ref(node);
        } else {
            let child = ctx.document.new_text(label);
            ctx.document.append(node, child);
            let refname = fully_normalize_name(label);
            ctx.document.node_mut(node).set_attr("refname", refname.clone());
            ctx.document.note_footnote_ref(&refname, node);
        }
        node
    };
    Outcome {
        before,
        nodes: vec![node],
        rest: text[end..].to_string(),
        messages: Vec::new(),
    }
}

fn interpreted_or_phrase_ref(
    ctx: &mut ParseContext,
    text: &str,
    start: usize,
    end: usize,
    role_prefix: Option<String>,
    lineno: usize,
) -> Outcome {
    let after = &text[end..];
    let Some((idx, suffix)) = find_end_interpreted(ctx, after) else {
        return unterminated(
            ctx,
            text,
            "interpreted text or phrase reference",
            end,
            lineno,
        );
    };
    let content = &after[..idx];
    let consumed = idx + 1 + suffix.len();
    let rawsource = unescape(&text[start..end + consumed], true);
    let rest = after[consumed..].to_string();
    let before = text[..start].to_string();

    if suffix == "_" || suffix == "__" {
        if role_prefix.is_some() {
            let msg = ctx.system_message(
                Severity::Error,
                "Mismatch: both interpreted text role prefix and reference suffix.",
                Some(lineno),
            );
            let literal = ctx.document.new_text(unescape(&rawsource, false));
            return Outcome {
                before,
                nodes: vec![literal],
                rest,
                messages: vec![msg],
            };
        }
        let nodes = phrase_reference(ctx, content, &rawsource, suffix == "__", lineno);
        return Outcome {
            before,
            nodes,
            rest,
            messages: Vec::new(),
        };
    }

    let suffix_role = ROLE_PREFIX
        .captures(suffix)
        .map(|c| c.get(1).expect("role group").as_str().to_string());
    let role = match (role_prefix, suffix_role) {
        (Some(_), Some(_)) => {
            let msg = ctx.system_message(
                Severity::Warning,
                "Multiple roles in interpreted text (both prefix and suffix present; only one allowed).",
                Some(lineno),
            );
            let literal = ctx.document.new_text(unescape(&rawsource, false));
            return Outcome {
                before,
                nodes: vec![literal],
                rest,
                messages: vec![msg],
            };
        }
        (Some(role), None) | (None, Some(role)) => role,
        (None, None) => String::new(),
    };
    let (nodes, messages) = interpreted(ctx, &role, &rawsource, content, lineno);
    Outcome {
        before,
        nodes,
        rest,
        messages,
    }
}

/// End of interpreted text: a backquote plus an optional reference or
/// role suffix, all followed by an end context. Returns the backquote
/// index and the suffix text.
fn find_end_interpreted<'t>(ctx: &ParseContext, after: &'t str) -> Option<(usize, &'t str)> {
    let mut from = 0;
    while let Some(rel) = after[from..].find('`') {
        let idx = from + rel;
        from = idx + 1;
        if idx == 0 {
            continue;
        }
        let prev = prev_char(after, idx)?;
        if prev.is_whitespace() || prev == '\0' {
            continue;
        }
        let tail = &after[idx + 1..];
        let mut suffixes: Vec<&str> = Vec::new();
        if tail.starts_with("__") {
            suffixes.push(&tail[..2]);
        }
        if tail.starts_with('_') {
            suffixes.push(&tail[..1]);
        }
        if let Some(m) = ROLE_PREFIX.find(tail) {
            suffixes.push(&tail[..m.end()]);
        }
        suffixes.push("");
        for suffix in suffixes {
            if end_context_ok(ctx, next_char(after, idx + 1 + suffix.len())) {
                return Some((idx, suffix));
            }
        }
    }
    None
}

fn phrase_reference(
    ctx: &mut ParseContext,
    content: &str,
    rawsource: &str,
    anonymous: bool,
    lineno: usize,
) -> Vec<NodeId> {
    // Embedded `<target>` at the end of the phrase?
    let embedded = EMBEDDED_LINK
        .captures(content)
        .and_then(|caps| caps.get(0).zip(caps.get(1)));
    let (display_escaped, target_spec) = match embedded {
        Some((whole, inner)) if !inner.as_str().is_empty() => {
            (&content[..whole.start()], Some(inner.as_str().to_string()))
        }
        _ => (content, None),
    };
    let display = unescape(display_escaped, false);
    let refname = fully_normalize_name(&display);

    let reference = ctx
        .document
        .new_node(NodeKind::Reference, rawsource.to_string());
    ctx.document.node_mut(reference).line = Some(lineno);
    ctx.document
        .node_mut(reference)
        .set_attr("name", display.clone());
    let child = ctx.document.new_text(display);
    ctx.document.append(reference, child);
    let mut nodes = vec![reference];

    enum Alias {
        Name(String),
        Uri(String),
    }
    let alias = target_spec.map(|spec| {
        let escaped_underscore = spec.ends_with("\0_");
        if spec.ends_with('_') && !escaped_underscore && !URI.is_match(&spec) {
            Alias::Name(fully_normalize_name(&unescape(
                &spec[..spec.len() - 1],
                false,
            )))
        } else {
            // URIs may be wrapped across lines; internal whitespace
            // is removed.
            let joined: String = unescape(&spec, false).split_whitespace().collect();
            Alias::Uri(joined)
        }
    });

    match (alias, anonymous) {
        (Some(Alias::Name(alias)), true) => {
            ctx.document
                .node_mut(reference)
                .set_attr("refname", alias.clone());
            ctx.document.note_refname(&alias, reference);
        }
        (Some(Alias::Uri(uri)), true) => {
            ctx.document.node_mut(reference).set_attr("refuri", uri);
        }
        (None, true) => {
            ctx.document.node_mut(reference).set_attr("anonymous", true);
            ctx.document.note_anonymous_ref(reference);
        }
        (Some(Alias::Name(alias)), false) => {
            let target = ctx.document.new_node(NodeKind::Target, rawsource.to_string());
            ctx.document.node_mut(target).line = Some(lineno);
            ctx.document.node_mut(target).names.push(refname);
            ctx.document
                .node_mut(target)
                .set_attr("refname", alias.clone());
            ctx.document.note_indirect_target(target);
            ctx.document
                .node_mut(reference)
                .set_attr("refname", alias.clone());
            ctx.document.note_refname(&alias, reference);
            nodes.push(target);
        }
        (Some(Alias::Uri(uri)), false) => {
            let target = ctx.document.new_node(NodeKind::Target, rawsource.to_string());
            ctx.document.node_mut(target).line = Some(lineno);
            ctx.document.node_mut(target).names.push(refname);
            ctx.document.node_mut(target).set_attr("refuri", uri.clone());
            let messages = ctx.document.note_explicit_target(target);
            ctx.attach_name_messages(messages, None, Some(lineno));
            ctx.document.node_mut(reference).set_attr("refuri", uri);
            nodes.push(target);
        }
        (None, false) => {
            ctx.document
                .node_mut(reference)
                .set_attr("refname", refname.clone());
            ctx.document.note_refname(&refname, reference);
        }
    }
    nodes
}

/// Interpreted text resolves in three tiers: a registered handler, a
/// generic `Role` node for any other well-formed role name (the empty
/// default role included), or an error when the name is qualified with
/// a domain nobody registered.
fn interpreted(
    ctx: &mut ParseContext,
    role: &str,
    rawsource: &str,
    content: &str,
    lineno: usize,
) -> (Vec<NodeId>, Vec<NodeId>) {
    let text = unescape(content, false);
    if !role.is_empty() {
        if let Some(handler) = ctx.registry.lookup_role(role) {
            let input = RoleInput {
                role_name: role.to_string(),
                rawsource: rawsource.to_string(),
                text,
                lineno,
            };
            return handler(ctx, &input);
        }
        if let Some((domain, _)) = role.split_once(':') {
            if !ctx.registry.has_domain(domain) {
                let msg = ctx.system_message(
                    Severity::Error,
                    &format!("Unknown interpreted text role \"{}\".", role),
                    Some(lineno),
                );
                let literal = ctx.document.new_text(unescape(rawsource, false));
                return (vec![literal], vec![msg]);
            }
        }
    }
    let node = ctx.document.new_node(NodeKind::Role, rawsource.to_string());
    {
        let data = ctx.document.node_mut(node);
        data.line = Some(lineno);
        data.set_attr("name", role);
    }
    let child = ctx.document.new_text(text);
    ctx.document.append(node, child);
    (vec![node], Vec::new())
}

// --- Implicit inline: standalone URIs and email addresses ---

struct ImplicitMatch {
    start: usize,
    end: usize,
    refuri: String,
    display: String,
}

fn find_implicit(text: &str) -> Option<ImplicitMatch> {
    let uri = find_uri(text);
    let email = EMAIL.find(text).map(|m| {
        let addr = unescape(m.as_str(), false);
        ImplicitMatch {
            start: m.start(),
            end: m.end(),
            refuri: format!("mailto:{}", addr),
            display: addr,
        }
    });
    match (uri, email) {
        (Some(u), Some(e)) => Some(if u.start <= e.start { u } else { e }),
        (Some(u), None) => Some(u),
        (None, Some(e)) => Some(e),
        (None, None) => None,
    }
}

fn find_uri(text: &str) -> Option<ImplicitMatch> {
    for caps in URI.captures_iter(text) {
        let scheme = caps.name("scheme").expect("scheme group");
        if !patterns::URI_SCHEMES.contains(&scheme.as_str().to_lowercase().as_str()) {
            continue;
        }
        let body = caps.name("body").expect("body group");
        let trimmed = body.as_str().trim_end_matches(patterns::URI_TRAILER);
        if trimmed.is_empty() {
            continue;
        }
        let end = body.start() + trimmed.len();
        let raw = &text[scheme.start()..end];
        let uri = unescape(raw, false);
        return Some(ImplicitMatch {
            start: scheme.start(),
            end,
            refuri: uri.clone(),
            display: uri,
        });
    }
    None
}

/// Turn plain text into Text nodes, promoting standalone URIs and
/// email addresses to references.
fn implicit_inline(ctx: &mut ParseContext, text: &str, out: &mut Vec<NodeId>) {
    if text.is_empty() {
        return;
    }
    match find_implicit(text) {
        Some(found) => {
            implicit_inline(ctx, &text[..found.start], out);
            let node = ctx.document.new_node(
                NodeKind::Reference,
                unescape(&text[found.start..found.end], true),
            );
            ctx.document.node_mut(node).set_attr("refuri", found.refuri);
            let child = ctx.document.new_text(found.display);
            ctx.document.append(node, child);
            out.push(node);
            implicit_inline(ctx, &text[found.end..], out);
        }
        None => {
            let value = unescape(text, false);
            if !value.is_empty() {
                let node = ctx.document.new_text(value);
                out.push(node);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directives::DirectiveRegistry;
    use crate::settings::Settings;

    fn with_ctx<R>(f: impl FnOnce(&mut ParseContext) -> R) -> R {
        let settings = Settings::default();
        let registry = crate::directives::builtin::default_registry();
        let mut ctx = ParseContext::new("test", &settings, &registry);
        f(&mut ctx)
    }

    fn kinds(ctx: &ParseContext, nodes: &[NodeId]) -> Vec<NodeKind> {
        nodes.iter().map(|&n| ctx.document.node(n).kind).collect()
    }

    #[test]
    fn test_plain_text() {
        with_ctx(|ctx| {
            let (nodes, messages) = parse_inline(ctx, "just words", 1);
            assert_eq!(kinds(ctx, &nodes), vec![NodeKind::Text]);
            assert!(messages.is_empty());
            assert_eq!(ctx.document.astext(nodes[0]), "just words");
        });
    }

    #[test]
    fn test_emphasis_and_strong() {
        with_ctx(|ctx| {
            let (nodes, _) = parse_inline(ctx, "a *b* and **c**", 1);
            assert_eq!(
                kinds(ctx, &nodes),
                vec![
                    NodeKind::Text,
                    NodeKind::Emphasis,
                    NodeKind::Text,
                    NodeKind::Strong
                ]
            );
            assert_eq!(ctx.document.astext(nodes[1]), "b");
            assert_eq!(ctx.document.astext(nodes[3]), "c");
        });
    }

    #[test]
    fn test_literal_keeps_backslashes() {
        with_ctx(|ctx| {
            let (nodes, _) = parse_inline(ctx, r"``a\*b``", 1);
            assert_eq!(kinds(ctx, &nodes), vec![NodeKind::Literal]);
            assert_eq!(ctx.document.astext(nodes[0]), r"a\*b");
        });
    }

    #[test]
    fn test_unterminated_emphasis() {
        with_ctx(|ctx| {
            let (nodes, messages) = parse_inline(ctx, "this is *unfinished", 1);
            // The start-string stays literal; the text is split around
            // the failed construct.
            assert_eq!(kinds(ctx, &nodes), vec![NodeKind::Text, NodeKind::Text]);
            let joined: String = nodes.iter().map(|&n| ctx.document.astext(n)).collect();
            assert_eq!(joined, "this is *unfinished");
            assert_eq!(messages.len(), 1);
            assert!(ctx
                .document
                .astext(messages[0])
                .contains("start-string without end-string"));
        });
    }

    #[test]
    fn test_escaped_start_is_literal() {
        with_ctx(|ctx| {
            let (nodes, messages) = parse_inline(ctx, r"not \*markup\*", 1);
            assert_eq!(kinds(ctx, &nodes), vec![NodeKind::Text]);
            assert_eq!(ctx.document.astext(nodes[0]), "not *markup*");
            assert!(messages.is_empty());
        });
    }

    #[test]
    fn test_quoted_start_not_markup() {
        with_ctx(|ctx| {
            let (nodes, messages) = parse_inline(ctx, "quoted (*) star", 1);
            assert_eq!(kinds(ctx, &nodes), vec![NodeKind::Text]);
            assert!(messages.is_empty());
        });
    }

    #[test]
    fn test_substitution_reference() {
        with_ctx(|ctx| {
            let (nodes, _) = parse_inline(ctx, "see |arrow| here", 1);
            assert_eq!(
                kinds(ctx, &nodes),
                vec![NodeKind::Text, NodeKind::SubstitutionReference, NodeKind::Text]
            );
            let attr = ctx.document.node(nodes[1]).attr("refname").cloned();
            assert_eq!(attr, Some(crate::document::AttrValue::Str("arrow".into())));
        });
    }

    #[test]
    fn test_simple_reference() {
        with_ctx(|ctx| {
            let (nodes, _) = parse_inline(ctx, "see target_ now", 1);
            assert_eq!(
                kinds(ctx, &nodes),
                vec![NodeKind::Text, NodeKind::Reference, NodeKind::Text]
            );
        });
    }

    #[test]
    fn test_anonymous_reference() {
        with_ctx(|ctx| {
            let (nodes, _) = parse_inline(ctx, "see target__ now", 1);
            let reference = nodes[1];
            assert_eq!(
                ctx.document.node(reference).attr("anonymous"),
                Some(&crate::document::AttrValue::Bool(true))
            );
            assert_eq!(ctx.document.anonymous_refs.len(), 1);
        });
    }

    #[test]
    fn test_phrase_reference_with_embedded_uri() {
        with_ctx(|ctx| {
            let (nodes, _) = parse_inline(ctx, "`docs <https://example.com>`_", 1);
            assert_eq!(kinds(ctx, &nodes), vec![NodeKind::Reference, NodeKind::Target]);
            assert_eq!(ctx.document.astext(nodes[0]), "docs");
            assert_eq!(
                ctx.document.node(nodes[0]).attr("refuri").and_then(|v| v.as_str()),
                Some("https://example.com")
            );
        });
    }

    #[test]
    fn test_inline_internal_target() {
        with_ctx(|ctx| {
            let (nodes, _) = parse_inline(ctx, "point _`Here There` end", 1);
            assert_eq!(
                kinds(ctx, &nodes),
                vec![NodeKind::Text, NodeKind::Target, NodeKind::Text]
            );
            assert_eq!(ctx.document.node(nodes[1]).names, vec!["Here There"]);
        });
    }

    #[test]
    fn test_footnote_and_citation_references() {
        with_ctx(|ctx| {
            let (nodes, _) = parse_inline(ctx, "a [1]_ b [#note]_ c [*]_ d [CIT2002]_", 1);
            let kinds = kinds(ctx, &nodes);
            assert!(kinds.contains(&NodeKind::FootnoteReference));
            assert!(kinds.contains(&NodeKind::CitationReference));
            assert_eq!(ctx.document.autofootnote_refs.len(), 1);
            assert_eq!(ctx.document.symbol_footnote_refs.len(), 1);
        });
    }

    #[test]
    fn test_standalone_uri() {
        with_ctx(|ctx| {
            let (nodes, _) = parse_inline(ctx, "see https://example.com/page. end", 1);
            assert_eq!(
                kinds(ctx, &nodes),
                vec![NodeKind::Text, NodeKind::Reference, NodeKind::Text]
            );
            assert_eq!(
                ctx.document.node(nodes[1]).attr("refuri").and_then(|v| v.as_str()),
                Some("https://example.com/page")
            );
        });
    }

    #[test]
    fn test_unknown_scheme_not_linked() {
        with_ctx(|ctx| {
            let (nodes, _) = parse_inline(ctx, "see madeup://example end", 1);
            assert_eq!(kinds(ctx, &nodes), vec![NodeKind::Text]);
        });
    }

    #[test]
    fn test_email_address() {
        with_ctx(|ctx| {
            let (nodes, _) = parse_inline(ctx, "mail me@example.org now", 1);
            assert_eq!(
                kinds(ctx, &nodes),
                vec![NodeKind::Text, NodeKind::Reference, NodeKind::Text]
            );
            assert_eq!(
                ctx.document.node(nodes[1]).attr("refuri").and_then(|v| v.as_str()),
                Some("mailto:me@example.org")
            );
        });
    }

    #[test]
    fn test_role_suffix() {
        with_ctx(|ctx| {
            let (nodes, _) = parse_inline(ctx, "`text`:strong:", 1);
            assert_eq!(kinds(ctx, &nodes), vec![NodeKind::Strong]);
        });
    }

    #[test]
    fn test_role_prefix() {
        with_ctx(|ctx| {
            let (nodes, _) = parse_inline(ctx, ":emphasis:`text`", 1);
            assert_eq!(kinds(ctx, &nodes), vec![NodeKind::Emphasis]);
        });
    }

    #[test]
    fn test_generic_named_role() {
        with_ctx(|ctx| {
            // No specific handler registered: a generic Role node.
            let (nodes, messages) = parse_inline(ctx, ":guilabel:`Save`", 1);
            assert!(messages.is_empty());
            assert_eq!(kinds(ctx, &nodes), vec![NodeKind::Role]);
            assert_eq!(
                ctx.document.node(nodes[0]).attr("name").and_then(|v| v.as_str()),
                Some("guilabel")
            );
            assert_eq!(ctx.document.astext(nodes[0]), "Save");
        });
    }

    #[test]
    fn test_unknown_domain_role() {
        with_ctx(|ctx| {
            let (nodes, messages) = parse_inline(ctx, ":nosuchdomain:thing:`text`", 1);
            assert_eq!(messages.len(), 1);
            assert!(ctx
                .document
                .astext(messages[0])
                .contains("Unknown interpreted text role"));
            assert_eq!(kinds(ctx, &nodes), vec![NodeKind::Text]);
        });
    }

    #[test]
    fn test_default_role() {
        with_ctx(|ctx| {
            let (nodes, _) = parse_inline(ctx, "`plain interpreted`", 1);
            assert_eq!(kinds(ctx, &nodes), vec![NodeKind::Role]);
            assert_eq!(ctx.document.astext(nodes[0]), "plain interpreted");
        });
    }

    #[test]
    fn test_trim_footnote_reference_space() {
        let settings = Settings {
            trim_footnote_reference_space: true,
            ..Settings::default()
        };
        let registry = crate::directives::builtin::default_registry();
        let mut ctx = ParseContext::new("test", &settings, &registry);
        let (nodes, _) = parse_inline(&mut ctx, "word [1]_", 1);
        assert_eq!(ctx.document.astext(nodes[0]), "word");
    }
}
