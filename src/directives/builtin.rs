//! Built-in directives and the default registry
//!
//! Admonitions, code blocks, and the substitution-definition helpers
//! (`unicode`, `replace`), plus the standard role set.

use super::options::{self, OptionValidator};
use super::roles;
use super::runtime::{DirectiveAbort, DirectiveError, DirectiveInvocation};
use super::{DirectiveRegistry, DirectiveSpec};
use crate::document::{NodeId, NodeKind};
use crate::util::decode_unicode_notation;

fn admonition_spec() -> DirectiveSpec {
    DirectiveSpec {
        required_args: 0,
        optional_args: 0,
        final_arg_whitespace: false,
        has_content: true,
        option_spec: vec![("class".to_string(), options::class_option as OptionValidator)],
        run: admonition,
    }
}

fn admonition(inv: &mut DirectiveInvocation<'_, '_>) -> Result<Vec<NodeId>, DirectiveAbort> {
    inv.require_content()?;
    let node = inv
        .ctx
        .document
        .new_node(NodeKind::Directive, inv.block_text.to_string());
    {
        let data = inv.ctx.document.node_mut(node);
        data.line = Some(inv.lineno);
        data.set_attr("name", inv.name);
        data.set_attr("domain", "");
    }
    if let Some(classes) = inv.options.get("class") {
        inv.ctx.document.node_mut(node).set_attr("classes", classes.clone());
    }
    inv.nested_parse(node, false)?;
    Ok(vec![node])
}

fn code_block_spec() -> DirectiveSpec {
    DirectiveSpec {
        required_args: 0,
        optional_args: 1,
        final_arg_whitespace: false,
        has_content: true,
        option_spec: vec![
            ("linenos".to_string(), options::flag as OptionValidator),
            ("emphasize-lines".to_string(), options::line_ranges as OptionValidator),
            ("caption".to_string(), options::unchanged as OptionValidator),
            ("class".to_string(), options::class_option as OptionValidator),
        ],
        run: code_block,
    }
}

fn code_block(inv: &mut DirectiveInvocation<'_, '_>) -> Result<Vec<NodeId>, DirectiveAbort> {
    inv.require_content()?;
    let value = inv.content_text();
    let node = inv
        .ctx
        .document
        .new_node(NodeKind::Code, inv.block_text.to_string());
    {
        let data = inv.ctx.document.node_mut(node);
        data.line = Some(inv.lineno);
        data.value = Some(value);
    }
    if let Some(lang) = inv.arguments.first() {
        inv.ctx.document.node_mut(node).set_attr("lang", lang.clone());
    }
    if let Some(linenos) = inv.options.get("linenos") {
        inv.ctx
            .document
            .node_mut(node)
            .set_attr("linenos", linenos.clone());
    }
    if let Some(ranges) = inv.options.get("emphasize-lines") {
        inv.ctx
            .document
            .node_mut(node)
            .set_attr("emphasize_lines", ranges.clone());
    }
    if let Some(caption) = inv.options.get("caption") {
        inv.ctx
            .document
            .node_mut(node)
            .set_attr("caption", caption.clone());
    }
    if let Some(classes) = inv.options.get("class") {
        inv.ctx
            .document
            .node_mut(node)
            .set_attr("classes", classes.clone());
    }
    Ok(vec![node])
}

fn in_substitution_definition(inv: &DirectiveInvocation<'_, '_>) -> bool {
    inv.ctx.document.node(inv.sm.node).kind == NodeKind::SubstitutionDefinition
}

fn unicode_spec() -> DirectiveSpec {
    DirectiveSpec {
        required_args: 1,
        optional_args: 0,
        final_arg_whitespace: true,
        has_content: false,
        option_spec: Vec::new(),
        run: unicode_directive,
    }
}

fn unicode_directive(inv: &mut DirectiveInvocation<'_, '_>) -> Result<Vec<NodeId>, DirectiveAbort> {
    if !in_substitution_definition(inv) {
        return Err(DirectiveError::error(format!(
            "Invalid context: the \"{}\" directive can only be used within a substitution definition.",
            inv.name
        )));
    }
    let argument = inv.arguments.first().cloned().unwrap_or_default();
    // Everything from " .. " on is a comment.
    let codes_text = match argument.find(".. ") {
        Some(0) => "",
        Some(pos) if argument[..pos].ends_with(' ') => &argument[..pos],
        _ => &argument[..],
    };
    let mut nodes = Vec::new();
    for code in codes_text.split_whitespace() {
        match decode_unicode_notation(code) {
            Ok(decoded) => {
                let text = inv.ctx.document.new_text(decoded.to_string());
                nodes.push(text);
            }
            Err(error) => {
                return Err(DirectiveError::error(format!(
                    "Invalid character code: {}\n{}",
                    code, error
                )));
            }
        }
    }
    Ok(nodes)
}

fn replace_spec() -> DirectiveSpec {
    DirectiveSpec {
        required_args: 0,
        optional_args: 0,
        final_arg_whitespace: false,
        has_content: true,
        option_spec: Vec::new(),
        run: replace_directive,
    }
}

fn replace_directive(inv: &mut DirectiveInvocation<'_, '_>) -> Result<Vec<NodeId>, DirectiveAbort> {
    if !in_substitution_definition(inv) {
        return Err(DirectiveError::error(format!(
            "Invalid context: the \"{}\" directive can only be used within a substitution definition.",
            inv.name
        )));
    }
    inv.require_content()?;
    if inv.content.texts().iter().any(|line| line.trim().is_empty()) {
        return Err(DirectiveError::error(format!(
            "Error in \"{}\" directive: may contain a single paragraph only.",
            inv.name
        )));
    }
    let text = inv.content_text();
    let (mut nodes, messages) = crate::inline::parse_inline(inv.ctx, &text, inv.lineno);
    nodes.extend(messages);
    Ok(nodes)
}

/// Registry with the standard directive and role set under the `std`
/// domain.
pub fn default_registry() -> DirectiveRegistry {
    let mut builder = DirectiveRegistry::builder();
    for name in ["note", "warning", "tip", "important"] {
        builder = builder.directive("std", name, admonition_spec());
    }
    builder
        .directive("std", "code-block", code_block_spec())
        .directive("std", "code", code_block_spec())
        .directive("std", "unicode", unicode_spec())
        .directive("std", "replace", replace_spec())
        .role("std", "emphasis", roles::emphasis_role)
        .role("std", "strong", roles::strong_role)
        .role("std", "literal", roles::literal_role)
        .role("std", "code", roles::code_role)
        .role("std", "ref", roles::ref_role)
        .role("std", "doc", roles::ref_role)
        .build()
}

#[cfg(test)]
mod tests {
    use super::default_registry;
    use crate::document::{AttrValue, NodeKind};
    use crate::parser::parse;
    use crate::settings::Settings;

    fn parse_ok(text: &str) -> crate::document::Document {
        let settings = Settings::default();
        let registry = default_registry();
        parse("test", text, &settings, &registry).unwrap()
    }

    #[test]
    fn test_code_block_with_options() {
        let document = parse_ok(
            ".. code-block:: python\n   :linenos:\n   :emphasize-lines: 1-2\n\n   print(1)\n   print(2)",
        );
        let root = document.root();
        let code = document.children(root)[0];
        let node = document.node(code);
        assert_eq!(node.kind, NodeKind::Code);
        assert_eq!(node.attr("lang").and_then(|v| v.as_str()), Some("python"));
        assert_eq!(node.attr("linenos"), Some(&AttrValue::Bool(true)));
        assert_eq!(
            node.attr("emphasize_lines"),
            Some(&AttrValue::IntPairs(vec![(1, 2)]))
        );
        assert_eq!(node.value.as_deref(), Some("print(1)\nprint(2)"));
    }

    #[test]
    fn test_code_block_unknown_option() {
        let document = parse_ok(".. code-block:: python\n   :nosuch: x\n\n   print(1)");
        assert!(document
            .diagnostics
            .iter()
            .any(|d| d.message.contains("unknown option: \"nosuch\"")));
    }

    #[test]
    fn test_code_block_without_content() {
        let document = parse_ok(".. code-block:: python");
        assert!(document
            .diagnostics
            .iter()
            .any(|d| d.message.contains("Content block expected")));
    }

    #[test]
    fn test_admonition_nested_parse() {
        let document = parse_ok(".. note::\n\n   Body of the note.\n\n   * item");
        let root = document.root();
        let note = document.children(root)[0];
        assert_eq!(document.node(note).kind, NodeKind::Directive);
        assert_eq!(
            document.node(note).attr("name").and_then(|v| v.as_str()),
            Some("note")
        );
        let kinds: Vec<NodeKind> = document
            .children(note)
            .iter()
            .map(|&c| document.node(c).kind)
            .collect();
        assert_eq!(kinds, vec![NodeKind::Paragraph, NodeKind::BulletList]);
    }

    #[test]
    fn test_unicode_outside_substitution_fails() {
        let document = parse_ok(".. unicode:: U+27A4");
        assert!(document
            .diagnostics
            .iter()
            .any(|d| d.message.contains("substitution definition")));
    }

    #[test]
    fn test_replace_substitution() {
        let document = parse_ok(".. |name| replace:: the *product*");
        let root = document.root();
        let def = document.children(root)[0];
        assert_eq!(document.node(def).kind, NodeKind::SubstitutionDefinition);
        let kinds: Vec<NodeKind> = document
            .children(def)
            .iter()
            .map(|&c| document.node(c).kind)
            .collect();
        assert_eq!(kinds, vec![NodeKind::Text, NodeKind::Emphasis]);
    }

    #[test]
    fn test_unicode_with_comment() {
        let document = parse_ok(".. |mark| unicode:: 0x2122 .. trademark sign");
        let root = document.root();
        let def = document.children(root)[0];
        assert_eq!(document.astext(def), "\u{2122}");
    }

    #[test]
    fn test_directive_argument_errors() {
        let document = parse_ok(".. unicode:: oops");
        // Outside a substitution definition AND bad code; context
        // error wins, but either way a diagnostic must appear.
        assert!(!document.diagnostics.is_empty());
    }
}
