//! Document tree visualization
//!
//! Renders a parsed document as an indented tree, one node per line:
//! the node tag, notable attributes, and a truncated text preview.
//! Semantic-agnostic: any node renders from its tag, attributes, and
//! children.

use crate::document::{Document, NodeId, NodeKind};

/// Box-drawing characters for the tree lines.
#[derive(Debug, Clone)]
pub struct TreeChars {
    pub branch: &'static str,
    pub last_branch: &'static str,
    pub vertical: &'static str,
    pub space: &'static str,
}

impl TreeChars {
    pub fn unicode() -> Self {
        Self {
            branch: "├─ ",
            last_branch: "└─ ",
            vertical: "│  ",
            space: "   ",
        }
    }

    pub fn ascii() -> Self {
        Self {
            branch: "|- ",
            last_branch: "`- ",
            vertical: "|  ",
            space: "   ",
        }
    }
}

impl Default for TreeChars {
    fn default() -> Self {
        Self::unicode()
    }
}

#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub tree_chars: TreeChars,
    /// Maximum characters of text preview per node.
    pub max_text: usize,
    /// Include the attribute map in each line.
    pub include_attributes: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            tree_chars: TreeChars::default(),
            max_text: 40,
            include_attributes: true,
        }
    }
}

/// Render the whole document tree.
pub fn render_document(document: &Document, options: &RenderOptions) -> String {
    let mut out = String::new();
    let root = document.root();
    out.push_str(&node_label(document, root, options));
    out.push('\n');
    let children = document.children(root);
    for (i, &child) in children.iter().enumerate() {
        render_node(
            document,
            child,
            options,
            "",
            i + 1 == children.len(),
            &mut out,
        );
    }
    out
}

fn render_node(
    document: &Document,
    id: NodeId,
    options: &RenderOptions,
    prefix: &str,
    last: bool,
    out: &mut String,
) {
    let chars = &options.tree_chars;
    out.push_str(prefix);
    out.push_str(if last { chars.last_branch } else { chars.branch });
    out.push_str(&node_label(document, id, options));
    out.push('\n');
    let child_prefix = format!(
        "{}{}",
        prefix,
        if last { chars.space } else { chars.vertical }
    );
    let children = document.children(id);
    for (i, &child) in children.iter().enumerate() {
        render_node(
            document,
            child,
            options,
            &child_prefix,
            i + 1 == children.len(),
            out,
        );
    }
}

fn node_label(document: &Document, id: NodeId, options: &RenderOptions) -> String {
    let node = document.node(id);
    let mut label = node.kind.tag().to_string();
    if !node.names.is_empty() {
        label.push_str(&format!(" names={:?}", node.names));
    }
    if !node.ids.is_empty() {
        label.push_str(&format!(" ids={:?}", node.ids));
    }
    if options.include_attributes && !node.attributes.is_empty() {
        let attrs: Vec<String> = node
            .attributes
            .iter()
            .map(|(k, v)| format!("{}={}", k, serde_json::to_string(v).unwrap_or_default()))
            .collect();
        label.push_str(&format!(" [{}]", attrs.join(" ")));
    }
    if node.kind == NodeKind::Text {
        let text = node.value.as_deref().unwrap_or("");
        label.push_str(&format!(" {:?}", truncate(text, options.max_text)));
    }
    label
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let head: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{}\u{2026}", head)
}
