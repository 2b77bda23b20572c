//! Node kinds and per-node data
//!
//! The tree is a tagged-variant hierarchy: one [`NodeKind`] enum with
//! category predicates instead of an inheritance lattice. Node payloads
//! live in [`NodeData`] inside the document arena; parent and child
//! links are [`NodeId`] indices into it.

use serde::Serialize;
use std::collections::BTreeMap;

/// Index of a node in the document arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub usize);

/// Every node variant the parser can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    // Structural
    Document,
    Section,
    Title,
    Transition,
    // Body
    Paragraph,
    BulletList,
    EnumeratedList,
    ListItem,
    DefinitionList,
    DefinitionListItem,
    Term,
    Classifier,
    Definition,
    // Metadata blocks
    FieldList,
    Field,
    FieldName,
    FieldBody,
    // Command-line option lists
    OptionList,
    OptionListItem,
    OptionGroup,
    Option,
    OptionString,
    OptionArgument,
    Description,
    // Other block elements
    LiteralBlock,
    DoctestBlock,
    LineBlock,
    Line,
    BlockQuote,
    Comment,
    SubstitutionDefinition,
    Target,
    Footnote,
    Citation,
    Label,
    Table,
    Caption,
    Entry,
    // Inline
    Text,
    Emphasis,
    Strong,
    Literal,
    Reference,
    FootnoteReference,
    CitationReference,
    SubstitutionReference,
    // Extended elements emitted by directive and role handlers
    Directive,
    DirectiveArgument,
    Role,
    RefRole,
    Code,
    TargetIdentifier,
    // Diagnostics anchored in the tree
    SystemMessage,
}

impl NodeKind {
    /// Serialized tag, matching the serde naming.
    pub fn tag(self) -> &'static str {
        match self {
            NodeKind::Document => "document",
            NodeKind::Section => "section",
            NodeKind::Title => "title",
            NodeKind::Transition => "transition",
            NodeKind::Paragraph => "paragraph",
            NodeKind::BulletList => "bullet_list",
            NodeKind::EnumeratedList => "enumerated_list",
            NodeKind::ListItem => "list_item",
            NodeKind::DefinitionList => "definition_list",
            NodeKind::DefinitionListItem => "definition_list_item",
            NodeKind::Term => "term",
            NodeKind::Classifier => "classifier",
            NodeKind::Definition => "definition",
            NodeKind::FieldList => "field_list",
            NodeKind::Field => "field",
            NodeKind::FieldName => "field_name",
            NodeKind::FieldBody => "field_body",
            NodeKind::OptionList => "option_list",
            NodeKind::OptionListItem => "option_list_item",
            NodeKind::OptionGroup => "option_group",
            NodeKind::Option => "option",
            NodeKind::OptionString => "option_string",
            NodeKind::OptionArgument => "option_argument",
            NodeKind::Description => "description",
            NodeKind::LiteralBlock => "literal_block",
            NodeKind::DoctestBlock => "doctest_block",
            NodeKind::LineBlock => "line_block",
            NodeKind::Line => "line",
            NodeKind::BlockQuote => "block_quote",
            NodeKind::Comment => "comment",
            NodeKind::SubstitutionDefinition => "substitution_definition",
            NodeKind::Target => "target",
            NodeKind::Footnote => "footnote",
            NodeKind::Citation => "citation",
            NodeKind::Label => "label",
            NodeKind::Table => "table",
            NodeKind::Caption => "caption",
            NodeKind::Entry => "entry",
            NodeKind::Text => "text",
            NodeKind::Emphasis => "emphasis",
            NodeKind::Strong => "strong",
            NodeKind::Literal => "literal",
            NodeKind::Reference => "reference",
            NodeKind::FootnoteReference => "footnote_reference",
            NodeKind::CitationReference => "citation_reference",
            NodeKind::SubstitutionReference => "substitution_reference",
            NodeKind::Directive => "directive",
            NodeKind::DirectiveArgument => "directive_argument",
            NodeKind::Role => "role",
            NodeKind::RefRole => "ref_role",
            NodeKind::Code => "code",
            NodeKind::TargetIdentifier => "target_identifier",
            NodeKind::SystemMessage => "system_message",
        }
    }

    pub fn is_inline(self) -> bool {
        matches!(
            self,
            NodeKind::Text
                | NodeKind::Emphasis
                | NodeKind::Strong
                | NodeKind::Literal
                | NodeKind::Reference
                | NodeKind::FootnoteReference
                | NodeKind::CitationReference
                | NodeKind::SubstitutionReference
                | NodeKind::Role
                | NodeKind::RefRole
                | NodeKind::TargetIdentifier
        )
    }

    pub fn is_structural(self) -> bool {
        matches!(
            self,
            NodeKind::Document | NodeKind::Section | NodeKind::Title | NodeKind::Transition
        )
    }

    pub fn is_body(self) -> bool {
        !self.is_inline() && !self.is_structural()
    }
}

/// Attribute values form a small closed set. `IntPairs` carries line
/// ranges such as `emphasize-lines: 1-2,4`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttrValue {
    Str(String),
    Bool(bool),
    Int(i64),
    StrList(Vec<String>),
    IntPairs(Vec<(i64, i64)>),
}

impl AttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttrValue::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Str(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::Str(s)
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        AttrValue::Bool(b)
    }
}

impl From<i64> for AttrValue {
    fn from(i: i64) -> Self {
        AttrValue::Int(i)
    }
}

/// Payload of one arena node.
#[derive(Debug, Clone)]
pub struct NodeData {
    pub kind: NodeKind,
    /// Text content for `Text` nodes and raw payloads (`Code`,
    /// `Comment`, literal blocks).
    pub value: Option<String>,
    pub rawsource: String,
    pub source: Option<String>,
    pub line: Option<usize>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub attributes: BTreeMap<String, AttrValue>,
    pub names: Vec<String>,
    pub dupnames: Vec<String>,
    pub ids: Vec<String>,
}

impl NodeData {
    pub fn new(kind: NodeKind, rawsource: impl Into<String>) -> Self {
        Self {
            kind,
            value: None,
            rawsource: rawsource.into(),
            source: None,
            line: None,
            parent: None,
            children: Vec::new(),
            attributes: BTreeMap::new(),
            names: Vec::new(),
            dupnames: Vec::new(),
            ids: Vec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.attributes.get(name)
    }

    pub fn set_attr(&mut self, name: &str, value: impl Into<AttrValue>) {
        self.attributes.insert(name.to_string(), value.into());
    }

    /// Move `name` from `names` to `dupnames`.
    pub fn dupname(&mut self, name: &str) {
        if let Some(pos) = self.names.iter().position(|n| n == name) {
            let moved = self.names.remove(pos);
            if !self.dupnames.contains(&moved) {
                self.dupnames.push(moved);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_categories() {
        assert!(NodeKind::Emphasis.is_inline());
        assert!(NodeKind::Section.is_structural());
        assert!(NodeKind::Paragraph.is_body());
        assert!(!NodeKind::Paragraph.is_inline());
    }

    #[test]
    fn test_dupname_moves_entry() {
        let mut node = NodeData::new(NodeKind::Target, "");
        node.names.push("alpha".to_string());
        node.dupname("alpha");
        assert!(node.names.is_empty());
        assert_eq!(node.dupnames, vec!["alpha"]);
    }

    #[test]
    fn test_attr_round_trip() {
        let mut node = NodeData::new(NodeKind::Code, "");
        node.set_attr("lang", "python");
        node.set_attr("linenos", true);
        assert_eq!(node.attr("lang").and_then(|v| v.as_str()), Some("python"));
        assert_eq!(node.attr("linenos").and_then(|v| v.as_bool()), Some(true));
    }
}
