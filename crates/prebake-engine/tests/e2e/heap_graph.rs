//! Heap graph export through the pipeline.

use super::harness::*;
use prebake_engine::{HeapGraphFormat, SerializerOptions};

fn graph(format: HeapGraphFormat, source: &str) -> String {
    let options = SerializerOptions {
        heap_graph_format: Some(format),
        ..Default::default()
    };
    serialize_with(options, source).heap_graph.unwrap()
}

#[test]
fn test_no_graph_unless_requested() {
    let result = serialize_with(SerializerOptions::default(), "var a = {};");
    assert!(result.heap_graph.is_none());
}

#[test]
fn test_dot_graph_has_globals_and_objects() {
    let dot = graph(HeapGraphFormat::DotLanguage, "var a = { b: [1] }; a.self = a;");
    assert!(dot.starts_with("digraph heap {"));
    assert!(dot.contains("\"g_a\""));
    assert!(dot.contains("[label=\"self\"]"));
    assert!(dot.contains("[label=\"b\"]"));
}

#[test]
fn test_vis_js_graph_has_scopes() {
    let json = graph(
        HeapGraphFormat::VisJs,
        "var pair = (function () {
           var n = 0;
           return [function () { return n; }, function () { n++; }];
         })();",
    );
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    let scopes = value["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|node| node["group"] == "scope")
        .count();
    let captures = value["edges"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|edge| edge["label"] == "captures")
        .count();
    assert_eq!(scopes, 1);
    assert_eq!(captures, 2);
}

#[test]
fn test_graph_does_not_change_output() {
    let source = "var a = { b: [1, 2] };";
    let plain = serialize(source);
    let options = SerializerOptions {
        heap_graph_format: Some(HeapGraphFormat::DotLanguage),
        ..Default::default()
    };
    assert_eq!(serialize_with(options, source).code, plain);
}
