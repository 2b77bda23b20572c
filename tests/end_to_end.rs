//! End-to-end scenarios over the public parser API

use rstest::rstest;
use rstx::util::{column_width, decode_unicode_notation};
use rstx::{default_registry, parse, AttrValue, Document, NodeId, NodeKind, Settings, Severity};

fn parse_ok(text: &str) -> Document {
    let settings = Settings::default();
    let registry = default_registry();
    parse("test", text, &settings, &registry).unwrap()
}

fn child_kinds(document: &Document, id: NodeId) -> Vec<NodeKind> {
    document
        .children(id)
        .iter()
        .map(|&c| document.node(c).kind)
        .collect()
}

fn find_child(document: &Document, id: NodeId, kind: NodeKind) -> Option<NodeId> {
    document
        .children(id)
        .iter()
        .copied()
        .find(|&c| document.node(c).kind == kind)
}

const LANDING_PAGE: &str = "\
:template: product-landing
:hidefeedback: header
:noprevnext:

================
What is MongoDB?
================

.. |arrow| unicode:: U+27A4

This is a test. |arrow| Use the **Select your language** drop-down menu in the list.

* - Introduction

    An introduction to things.
  - Developers
  - Administrators
  - Reference
";

#[test]
fn test_landing_page_structure() {
    let document = parse_ok(LANDING_PAGE);
    let root = document.root();
    assert_eq!(
        child_kinds(&document, root),
        vec![NodeKind::FieldList, NodeKind::Section]
    );

    let field_list = document.children(root)[0];
    assert_eq!(document.children(field_list).len(), 3);
    let first_field = document.children(field_list)[0];
    let name = document.children(first_field)[0];
    assert_eq!(document.astext(name), "template");
    let body = document.children(first_field)[1];
    assert_eq!(document.astext(body), "product-landing");

    let section = document.children(root)[1];
    assert_eq!(document.node(section).names, vec!["What is MongoDB?"]);
    let title = document.children(section)[0];
    assert_eq!(document.node(title).kind, NodeKind::Title);
    assert_eq!(document.astext(title), "What is MongoDB?");

    let substitution = find_child(&document, section, NodeKind::SubstitutionDefinition).unwrap();
    assert_eq!(document.node(substitution).names, vec!["arrow"]);
    assert_eq!(document.astext(substitution), "\u{27A4}");

    let paragraph = find_child(&document, section, NodeKind::Paragraph).unwrap();
    assert_eq!(
        child_kinds(&document, paragraph),
        vec![
            NodeKind::Text,
            NodeKind::SubstitutionReference,
            NodeKind::Text,
            NodeKind::Strong,
            NodeKind::Text,
        ]
    );
    assert_eq!(
        document.astext(document.children(paragraph)[3]),
        "Select your language"
    );

    let outer_list = find_child(&document, section, NodeKind::BulletList).unwrap();
    assert_eq!(document.children(outer_list).len(), 1);
    let outer_item = document.children(outer_list)[0];
    let inner_list = find_child(&document, outer_item, NodeKind::BulletList).unwrap();
    assert_eq!(document.children(inner_list).len(), 4);

    let intro_item = document.children(inner_list)[0];
    let intro_kinds = child_kinds(&document, intro_item);
    assert_eq!(intro_kinds, vec![NodeKind::Paragraph, NodeKind::Paragraph]);
    assert_eq!(
        document.astext(document.children(intro_item)[0]),
        "Introduction"
    );
    assert_eq!(
        document.astext(document.children(intro_item)[1]),
        "An introduction to things."
    );
    for (index, expected) in ["Developers", "Administrators", "Reference"].iter().enumerate() {
        let item = document.children(inner_list)[index + 1];
        assert_eq!(&document.astext(item), expected);
    }
}

#[test]
fn test_column_width_combining_marks() {
    assert_eq!(column_width("A t\u{306}ab\u{306}l\u{115}"), 7);
}

#[rstest]
#[case("U+27A4", '\u{27A4}')]
#[case("0x2192", '\u{2192}')]
#[case("129448", '\u{1F9A8}')]
#[case("&#x262E;", '\u{262E}')]
fn test_unicode_notation(#[case] notation: &str, #[case] expected: char) {
    assert_eq!(decode_unicode_notation(notation).unwrap(), expected);
}

#[rstest]
#[case("U+FFFFFFFFFFFFFFF")]
#[case("99z")]
#[case("")]
fn test_unicode_notation_errors(#[case] notation: &str) {
    assert!(decode_unicode_notation(notation).is_err());
}

#[test]
fn test_enumerated_list_start_value() {
    let document = parse_ok("3. first\n4. second\n");
    let root = document.root();
    let list = find_child(&document, root, NodeKind::EnumeratedList).unwrap();
    let node = document.node(list);
    assert_eq!(node.attr("enumtype").and_then(|v| v.as_str()), Some("arabic"));
    assert_eq!(node.attr("prefix").and_then(|v| v.as_str()), Some(""));
    assert_eq!(node.attr("suffix").and_then(|v| v.as_str()), Some("."));
    assert_eq!(node.attr("start").and_then(|v| v.as_int()), Some(3));
    assert_eq!(document.children(list).len(), 2);
    assert!(document
        .diagnostics
        .iter()
        .any(|d| d.severity == Severity::Info
            && d.message.contains("Enumerated list start value not ordinal-1")));
}

#[test]
fn test_code_block_scenario() {
    let document = parse_ok(
        ".. code-block:: python\n   :linenos:\n   :emphasize-lines: 1-2\n\n   print(1)\n   print(2)\n",
    );
    let root = document.root();
    let code = find_child(&document, root, NodeKind::Code).unwrap();
    let node = document.node(code);
    assert_eq!(node.attr("lang").and_then(|v| v.as_str()), Some("python"));
    assert_eq!(node.attr("linenos"), Some(&AttrValue::Bool(true)));
    assert_eq!(
        node.attr("emphasize_lines"),
        Some(&AttrValue::IntPairs(vec![(1, 2)]))
    );
    assert_eq!(node.value.as_deref(), Some("print(1)\nprint(2)"));
}

#[test]
fn test_unterminated_emphasis() {
    let document = parse_ok("this is *unfinished\n");
    let root = document.root();
    let kinds = child_kinds(&document, root);
    assert_eq!(kinds, vec![NodeKind::Paragraph, NodeKind::SystemMessage]);
    let paragraph = document.children(root)[0];
    assert_eq!(document.astext(paragraph), "this is *unfinished");
    assert!(document
        .diagnostics
        .iter()
        .any(|d| d.severity == Severity::Warning
            && d.message.contains("start-string without end-string")));
}

#[test]
fn test_duplicate_section_names() {
    let document = parse_ok("Same\n====\n\none\n\nSame\n====\n\ntwo\n");
    let root = document.root();
    let sections: Vec<NodeId> = document
        .children(root)
        .iter()
        .copied()
        .filter(|&c| document.node(c).kind == NodeKind::Section)
        .collect();
    assert_eq!(sections.len(), 2);
    // Both implicit: the name is invalidated and the second section
    // keeps it only as a dupname.
    assert_eq!(document.name_id("Same"), Some(&None));
    assert_eq!(document.node(sections[1]).dupnames, vec!["Same"]);
    assert!(document
        .diagnostics
        .iter()
        .any(|d| d.message.contains("Duplicate implicit target name")));
}

#[test]
fn test_footnote_reference_wiring() {
    let document = parse_ok("See [1]_ and [#auto]_.\n\n.. [1] Manual footnote.\n.. [#auto] Auto footnote.\n");
    assert_eq!(document.footnotes.len(), 1);
    assert_eq!(document.autofootnotes.len(), 1);
    assert_eq!(document.autofootnote_refs.len(), 1);
}

#[test]
fn test_target_database() {
    let document = parse_ok(
        ".. _guide: https://example.com/guide\n\nRead the `guide`_ or guide_.\n",
    );
    assert_eq!(
        document.name_id("guide"),
        Some(&Some("guide".to_string()))
    );
    let root = document.root();
    let target = find_child(&document, root, NodeKind::Target).unwrap();
    assert_eq!(
        document.node(target).attr("refuri").and_then(|v| v.as_str()),
        Some("https://example.com/guide")
    );
}

#[test]
fn test_json_round_trip() {
    let document = parse_ok(LANDING_PAGE);
    let json = document.to_json();
    let text = serde_json::to_string(&json).unwrap();
    let back: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(json, back);
}

#[test]
fn test_report_level_suppresses_info() {
    let settings = Settings {
        report_level: 3,
        ..Settings::default()
    };
    let registry = default_registry();
    let document = parse("test", "3. first\n4. second\n", &settings, &registry).unwrap();
    // The info diagnostic is filtered from the list; the node stays.
    assert!(document.diagnostics.is_empty());
}

#[test]
fn test_halt_level_stops_parse() {
    let settings = Settings {
        halt_level: 3,
        ..Settings::default()
    };
    let registry = default_registry();
    let document = parse(
        "test",
        ".. nosuchdirective::\n\nafter error\n",
        &settings,
        &registry,
    )
    .unwrap();
    // The error hits the halt level; the trailing paragraph is never
    // parsed.
    let root = document.root();
    let has_after = document
        .children(root)
        .iter()
        .any(|&c| document.astext(c).contains("after error"));
    assert!(!has_after);
}
