//! Document tree and cross-reference bookkeeping
//!
//! The [`Document`] owns every node in an arena and carries the
//! name/id/reference maps that later passes resolve against. Nodes are
//! created detached and attached with [`Document::append`]; the
//! duplicate-name rules live in [`Document::set_name_id_map`].

pub mod nodes;
pub mod normalize;

pub use nodes::{AttrValue, NodeData, NodeId, NodeKind};
pub use normalize::{fully_normalize_name, make_id};

use crate::diagnostics::{Diagnostic, Severity};
use serde_json::{json, Value};
use std::collections::HashMap;

/// Bookkeeping message produced by a registration; the caller decides
/// where the matching `SystemMessage` node is anchored.
pub type NameMessage = (Severity, String);

pub struct Document {
    arena: Vec<NodeData>,
    root: NodeId,
    /// Unique id -> element.
    id_to_element: HashMap<String, NodeId>,
    /// Normalized name -> chosen id (None once duplicates invalidate it).
    name_ids: HashMap<String, Option<String>>,
    /// Normalized name -> explicitness (true = explicit target).
    name_types: HashMap<String, bool>,
    /// Refname -> referring nodes.
    ref_names: HashMap<String, Vec<NodeId>>,
    citation_refs: HashMap<String, Vec<NodeId>>,
    footnote_refs: HashMap<String, Vec<NodeId>>,
    substitution_defs: HashMap<String, NodeId>,
    substitution_refs: HashMap<String, Vec<NodeId>>,
    pub autofootnotes: Vec<NodeId>,
    pub autofootnote_refs: Vec<NodeId>,
    pub symbol_footnotes: Vec<NodeId>,
    pub symbol_footnote_refs: Vec<NodeId>,
    pub footnotes: Vec<NodeId>,
    pub citations: Vec<NodeId>,
    pub anonymous_targets: Vec<NodeId>,
    pub anonymous_refs: Vec<NodeId>,
    pub indirect_targets: Vec<NodeId>,
    pub current_source: Option<String>,
    pub current_line: Option<usize>,
    /// Diagnostics surfaced during the parse, parallel to the
    /// `SystemMessage` nodes in the tree.
    pub diagnostics: Vec<Diagnostic>,
    id_prefix: String,
    auto_id_prefix: String,
    id_counter: usize,
}

impl Document {
    pub fn new(source_id: &str, id_prefix: &str, auto_id_prefix: &str) -> Self {
        let mut root_data = NodeData::new(NodeKind::Document, "");
        root_data.source = Some(source_id.to_string());
        Self {
            arena: vec![root_data],
            root: NodeId(0),
            id_to_element: HashMap::new(),
            name_ids: HashMap::new(),
            name_types: HashMap::new(),
            ref_names: HashMap::new(),
            citation_refs: HashMap::new(),
            footnote_refs: HashMap::new(),
            substitution_defs: HashMap::new(),
            substitution_refs: HashMap::new(),
            autofootnotes: Vec::new(),
            autofootnote_refs: Vec::new(),
            symbol_footnotes: Vec::new(),
            symbol_footnote_refs: Vec::new(),
            footnotes: Vec::new(),
            citations: Vec::new(),
            anonymous_targets: Vec::new(),
            anonymous_refs: Vec::new(),
            indirect_targets: Vec::new(),
            current_source: Some(source_id.to_string()),
            current_line: None,
            diagnostics: Vec::new(),
            id_prefix: id_prefix.to_string(),
            auto_id_prefix: auto_id_prefix.to_string(),
            id_counter: 1,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &NodeData {
        &self.arena[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.arena[id.0]
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Create a detached node.
    pub fn new_node(&mut self, kind: NodeKind, rawsource: impl Into<String>) -> NodeId {
        let mut data = NodeData::new(kind, rawsource);
        data.source = self.current_source.clone();
        data.line = self.current_line;
        self.arena.push(data);
        NodeId(self.arena.len() - 1)
    }

    /// Create a detached text node.
    pub fn new_text(&mut self, text: impl Into<String>) -> NodeId {
        let text = text.into();
        let id = self.new_node(NodeKind::Text, text.clone());
        self.node_mut(id).value = Some(text);
        id
    }

    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        self.node_mut(child).parent = Some(parent);
        self.node_mut(parent).children.push(child);
    }

    pub fn append_all(&mut self, parent: NodeId, children: &[NodeId]) {
        for &child in children {
            self.append(parent, child);
        }
    }

    pub fn insert(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.node_mut(child).parent = Some(parent);
        let children = &mut self.node_mut(parent).children;
        let index = index.min(children.len());
        children.insert(index, child);
    }

    /// Remove `child` from its parent's child list, leaving it
    /// detached in the arena.
    pub fn detach(&mut self, child: NodeId) {
        if let Some(parent) = self.node(child).parent {
            self.node_mut(parent).children.retain(|&c| c != child);
            self.node_mut(child).parent = None;
        }
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    /// Concatenated text content of a subtree.
    pub fn astext(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        let node = self.node(id);
        if let Some(value) = &node.value {
            out.push_str(value);
        }
        for &child in &node.children {
            self.collect_text(child, out);
        }
    }

    pub fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.id_to_element.get(id).copied()
    }

    pub fn name_id(&self, name: &str) -> Option<&Option<String>> {
        self.name_ids.get(name)
    }

    pub fn name_is_explicit(&self, name: &str) -> Option<bool> {
        self.name_types.get(name).copied()
    }

    pub fn has_name(&self, name: &str) -> bool {
        self.name_ids.contains_key(name)
    }

    pub fn ids(&self) -> impl Iterator<Item = &String> {
        self.id_to_element.keys()
    }

    /// Ensure `node` carries at least one registered id and return it.
    ///
    /// Pre-set ids are validated for global uniqueness; otherwise each
    /// of the node's names is tried through `make_id`, falling back to
    /// a synthetic `<id_prefix><auto_id_prefix><n>` id.
    pub fn set_id(&mut self, node: NodeId) -> (String, Vec<NameMessage>) {
        let mut messages = Vec::new();
        let preset: Vec<String> = self.node(node).ids.clone();
        for id in &preset {
            if let Some(&owner) = self.id_to_element.get(id) {
                if owner != node {
                    messages.push((
                        Severity::Severe,
                        format!("Duplicate ID: \"{}\".", id),
                    ));
                }
            }
        }
        let id = if let Some(first) = preset.first() {
            first.clone()
        } else {
            let names: Vec<String> = self.node(node).names.clone();
            let mut chosen = None;
            for name in &names {
                let candidate = format!("{}{}", self.id_prefix, make_id(name));
                if candidate.len() > self.id_prefix.len()
                    && !self.id_to_element.contains_key(&candidate)
                {
                    chosen = Some(candidate);
                    break;
                }
            }
            let id = chosen.unwrap_or_else(|| loop {
                let candidate =
                    format!("{}{}{}", self.id_prefix, self.auto_id_prefix, self.id_counter);
                self.id_counter += 1;
                if !self.id_to_element.contains_key(&candidate) {
                    break candidate;
                }
            });
            self.node_mut(node).ids.push(id.clone());
            id
        };
        self.id_to_element.insert(id.clone(), node);
        (id, messages)
    }

    /// Apply the duplicate-name state table for every name on `node`,
    /// given its chosen `id` and whether the registration is explicit.
    pub fn set_name_id_map(
        &mut self,
        node: NodeId,
        id: &str,
        explicit: bool,
    ) -> Vec<NameMessage> {
        let mut messages = Vec::new();
        let names: Vec<String> = self.node(node).names.clone();
        for name in names {
            if self.name_ids.contains_key(&name) {
                self.set_duplicate_name_id(node, id, &name, explicit, &mut messages);
            } else {
                self.name_ids.insert(name.clone(), Some(id.to_string()));
                self.name_types.insert(name, explicit);
            }
        }
        messages
    }

    fn set_duplicate_name_id(
        &mut self,
        node: NodeId,
        id: &str,
        name: &str,
        explicit: bool,
        messages: &mut Vec<NameMessage>,
    ) {
        let old_id = self.name_ids.get(name).cloned().flatten();
        let old_explicit = self.name_types.get(name).copied().unwrap_or(false);
        self.name_types.insert(name.to_string(), old_explicit || explicit);

        if explicit {
            if old_explicit {
                // Explicit vs. explicit: an error, unless both targets
                // point at the identical refuri.
                let mut severity = Severity::Error;
                if let Some(old_id) = &old_id {
                    let old_node = self.id_to_element.get(old_id).copied();
                    let new_refuri = self
                        .node(node)
                        .attr("refuri")
                        .and_then(|v| v.as_str())
                        .map(str::to_string);
                    let same_uri = match (old_node, &new_refuri) {
                        (Some(old_node), Some(uri)) => {
                            !self.node(old_node).names.is_empty()
                                && self.node(old_node).attr("refuri").and_then(|v| v.as_str())
                                    == Some(uri.as_str())
                        }
                        _ => false,
                    };
                    if same_uri {
                        severity = Severity::Info;
                    } else {
                        if let Some(old_node) = old_node {
                            self.node_mut(old_node).dupname(name);
                        }
                        self.name_ids.insert(name.to_string(), None);
                    }
                } else {
                    self.name_ids.insert(name.to_string(), None);
                }
                messages.push((
                    severity,
                    format!("Duplicate explicit target name: \"{}\".", name),
                ));
                self.node_mut(node).dupname(name);
            } else {
                // Explicit beats implicit: demote the prior owner.
                self.name_ids
                    .insert(name.to_string(), Some(id.to_string()));
                if let Some(old_id) = &old_id {
                    if let Some(old_node) = self.id_to_element.get(old_id).copied() {
                        self.node_mut(old_node).dupname(name);
                    }
                    messages.push((
                        Severity::Info,
                        format!("Duplicate implicit target name: \"{}\".", name),
                    ));
                } else {
                    messages.push((
                        Severity::Warning,
                        format!("Duplicate implicit target name: \"{}\".", name),
                    ));
                }
            }
        } else {
            if !old_explicit {
                if old_id.is_some() {
                    if let Some(old_node) =
                        old_id.as_ref().and_then(|i| self.id_to_element.get(i)).copied()
                    {
                        self.node_mut(old_node).dupname(name);
                    }
                }
                self.name_ids.insert(name.to_string(), None);
            }
            self.node_mut(node).dupname(name);
            messages.push((
                Severity::Info,
                format!("Duplicate implicit target name: \"{}\".", name),
            ));
        }
    }

    /// Register an explicit target: assign an id and run the name map.
    pub fn note_explicit_target(&mut self, node: NodeId) -> Vec<NameMessage> {
        let (id, mut messages) = self.set_id(node);
        messages.extend(self.set_name_id_map(node, &id, true));
        messages
    }

    /// Register an implicit target (section titles and the like).
    pub fn note_implicit_target(&mut self, node: NodeId) -> Vec<NameMessage> {
        let (id, mut messages) = self.set_id(node);
        messages.extend(self.set_name_id_map(node, &id, false));
        messages
    }

    pub fn note_refname(&mut self, refname: &str, node: NodeId) {
        self.ref_names
            .entry(refname.to_string())
            .or_default()
            .push(node);
    }

    pub fn note_anonymous_target(&mut self, node: NodeId) {
        self.anonymous_targets.push(node);
    }

    pub fn note_anonymous_ref(&mut self, node: NodeId) {
        self.anonymous_refs.push(node);
    }

    pub fn note_indirect_target(&mut self, node: NodeId) {
        self.indirect_targets.push(node);
    }

    pub fn note_footnote(&mut self, node: NodeId) {
        self.footnotes.push(node);
    }

    pub fn note_autofootnote(&mut self, node: NodeId) {
        self.autofootnotes.push(node);
    }

    pub fn note_symbol_footnote(&mut self, node: NodeId) {
        self.symbol_footnotes.push(node);
    }

    pub fn note_footnote_ref(&mut self, refname: &str, node: NodeId) {
        self.footnote_refs
            .entry(refname.to_string())
            .or_default()
            .push(node);
        self.note_refname(refname, node);
    }

    pub fn note_autofootnote_ref(&mut self, node: NodeId) {
        self.autofootnote_refs.push(node);
    }

    pub fn note_symbol_footnote_ref(&mut self, node: NodeId) {
        self.symbol_footnote_refs.push(node);
    }

    pub fn note_citation(&mut self, node: NodeId) {
        self.citations.push(node);
    }

    pub fn note_citation_ref(&mut self, refname: &str, node: NodeId) {
        self.citation_refs
            .entry(refname.to_string())
            .or_default()
            .push(node);
        self.note_refname(refname, node);
    }

    pub fn note_substitution_def(&mut self, name: &str, node: NodeId) {
        self.substitution_defs.insert(name.to_string(), node);
    }

    pub fn note_substitution_ref(&mut self, refname: &str, node: NodeId) {
        self.substitution_refs
            .entry(refname.to_string())
            .or_default()
            .push(node);
    }

    pub fn substitution_def(&self, name: &str) -> Option<NodeId> {
        self.substitution_defs.get(name).copied()
    }

    /// Nested JSON rendering of a subtree.
    pub fn node_to_json(&self, id: NodeId) -> Value {
        let node = self.node(id);
        let mut map = serde_json::Map::new();
        map.insert("type".to_string(), json!(node.kind.tag()));
        if let Some(value) = &node.value {
            map.insert("value".to_string(), json!(value));
        }
        if let Some(line) = node.line {
            map.insert("line".to_string(), json!(line));
        }
        if !node.names.is_empty() {
            map.insert("names".to_string(), json!(node.names));
        }
        if !node.dupnames.is_empty() {
            map.insert("dupnames".to_string(), json!(node.dupnames));
        }
        if !node.ids.is_empty() {
            map.insert("ids".to_string(), json!(node.ids));
        }
        if !node.attributes.is_empty() {
            let attrs: serde_json::Map<String, Value> = node
                .attributes
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::to_value(v).unwrap_or(Value::Null)))
                .collect();
            map.insert("attributes".to_string(), Value::Object(attrs));
        }
        if !node.children.is_empty() {
            let children: Vec<Value> =
                node.children.iter().map(|&c| self.node_to_json(c)).collect();
            map.insert("children".to_string(), json!(children));
        }
        Value::Object(map)
    }

    /// Nested JSON of the whole document plus the diagnostics list.
    pub fn to_json(&self) -> Value {
        json!({
            "document": self.node_to_json(self.root),
            "diagnostics": self.diagnostics,
        })
    }
}
