//! Role handlers for interpreted text
//!
//! A role turns `` :name:`text` `` into inline nodes. Handlers receive
//! the parse context so they can create nodes and register
//! cross-references.

use crate::document::{fully_normalize_name, NodeId, NodeKind};
use crate::parser::ParseContext;

pub struct RoleInput {
    pub role_name: String,
    pub rawsource: String,
    pub text: String,
    pub lineno: usize,
}

/// Returns `(nodes, system_messages)`, both detached.
pub type RoleFn = fn(&mut ParseContext, &RoleInput) -> (Vec<NodeId>, Vec<NodeId>);

fn simple_span(ctx: &mut ParseContext, input: &RoleInput, kind: NodeKind) -> (Vec<NodeId>, Vec<NodeId>) {
    let node = ctx.document.new_node(kind, input.rawsource.clone());
    ctx.document.node_mut(node).line = Some(input.lineno);
    let child = ctx.document.new_text(input.text.clone());
    ctx.document.append(node, child);
    (vec![node], Vec::new())
}

pub fn emphasis_role(ctx: &mut ParseContext, input: &RoleInput) -> (Vec<NodeId>, Vec<NodeId>) {
    simple_span(ctx, input, NodeKind::Emphasis)
}

pub fn strong_role(ctx: &mut ParseContext, input: &RoleInput) -> (Vec<NodeId>, Vec<NodeId>) {
    simple_span(ctx, input, NodeKind::Strong)
}

pub fn literal_role(ctx: &mut ParseContext, input: &RoleInput) -> (Vec<NodeId>, Vec<NodeId>) {
    simple_span(ctx, input, NodeKind::Literal)
}

pub fn code_role(ctx: &mut ParseContext, input: &RoleInput) -> (Vec<NodeId>, Vec<NodeId>) {
    let node = ctx.document.new_node(NodeKind::Code, input.rawsource.clone());
    ctx.document.node_mut(node).line = Some(input.lineno);
    ctx.document.node_mut(node).value = Some(input.text.clone());
    (vec![node], Vec::new())
}

/// Cross-reference roles (`doc`, `ref`, and friends): a `RefRole` node
/// carrying the role name and the normalized target.
pub fn ref_role(ctx: &mut ParseContext, input: &RoleInput) -> (Vec<NodeId>, Vec<NodeId>) {
    let node = ctx
        .document
        .new_node(NodeKind::RefRole, input.rawsource.clone());
    ctx.document.node_mut(node).line = Some(input.lineno);
    // `text <target>` picks the link text explicitly.
    let (display, target) = match input.text.rfind(" <") {
        Some(pos) if input.text.ends_with('>') => (
            input.text[..pos].to_string(),
            input.text[pos + 2..input.text.len() - 1].to_string(),
        ),
        _ => (input.text.clone(), input.text.clone()),
    };
    {
        let data = ctx.document.node_mut(node);
        data.set_attr("name", input.role_name.clone());
        data.set_attr("target", fully_normalize_name(&target));
    }
    let child = ctx.document.new_text(display);
    ctx.document.append(node, child);
    (vec![node], Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directives::DirectiveRegistry;
    use crate::settings::Settings;

    fn with_ctx<R>(f: impl FnOnce(&mut ParseContext) -> R) -> R {
        let settings = Settings::default();
        let registry = DirectiveRegistry::builder().build();
        let mut ctx = ParseContext::new("test", &settings, &registry);
        f(&mut ctx)
    }

    fn input(text: &str) -> RoleInput {
        RoleInput {
            role_name: "test".to_string(),
            rawsource: format!("`{}`", text),
            text: text.to_string(),
            lineno: 1,
        }
    }

    #[test]
    fn test_simple_roles() {
        with_ctx(|ctx| {
            let (nodes, messages) = strong_role(ctx, &input("bold"));
            assert!(messages.is_empty());
            assert_eq!(ctx.document.node(nodes[0]).kind, NodeKind::Strong);
            assert_eq!(ctx.document.astext(nodes[0]), "bold");
        });
    }

    #[test]
    fn test_code_role_value() {
        with_ctx(|ctx| {
            let (nodes, _) = code_role(ctx, &input("x + y"));
            let node = ctx.document.node(nodes[0]);
            assert_eq!(node.kind, NodeKind::Code);
            assert_eq!(node.value.as_deref(), Some("x + y"));
        });
    }

    #[test]
    fn test_ref_role_with_explicit_title() {
        with_ctx(|ctx| {
            let (nodes, _) = ref_role(ctx, &input("Guide <install-guide>"));
            let node = ctx.document.node(nodes[0]);
            assert_eq!(node.kind, NodeKind::RefRole);
            assert_eq!(
                node.attr("target").and_then(|v| v.as_str()),
                Some("install-guide")
            );
            assert_eq!(ctx.document.astext(nodes[0]), "Guide");
        });
    }

    #[test]
    fn test_ref_role_bare_target() {
        with_ctx(|ctx| {
            let (nodes, _) = ref_role(ctx, &input("install-guide"));
            let node = ctx.document.node(nodes[0]);
            assert_eq!(
                node.attr("target").and_then(|v| v.as_str()),
                Some("install-guide")
            );
        });
    }
}
