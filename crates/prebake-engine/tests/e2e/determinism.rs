//! Determinism and termination over arbitrary object graphs.

use super::harness::*;
use proptest::prelude::*;
use std::fmt::Write;

// ============================================================================
// Graph Generators
// ============================================================================

/// One node of a generated heap graph
#[derive(Debug, Clone, Copy)]
enum NodeKind {
    Object,
    Array,
    /// Function returning the next node
    Closure,
}

fn arb_kind() -> impl Strategy<Value = NodeKind> {
    prop_oneof![
        3 => Just(NodeKind::Object),
        2 => Just(NodeKind::Array),
        1 => Just(NodeKind::Closure),
    ]
}

/// Node kinds plus `(from, to)` property edges; node 0 is the root
fn arb_graph() -> impl Strategy<Value = (Vec<NodeKind>, Vec<(usize, usize)>)> {
    prop::collection::vec(arb_kind(), 1..7).prop_flat_map(|kinds| {
        let n = kinds.len();
        let edges = prop::collection::vec((0..n, 0..n), 0..12);
        (Just(kinds), edges)
    })
}

/// A program whose global `root` holds the generated graph
fn graph_program(kinds: &[NodeKind], edges: &[(usize, usize)]) -> String {
    let mut source = String::from("var root = (function () {\n");
    let n = kinds.len();
    for (i, kind) in kinds.iter().enumerate() {
        let init = match kind {
            NodeKind::Object => format!("{{ id: {} }}", i),
            NodeKind::Array => format!("[{}]", i),
            NodeKind::Closure => format!("function () {{ return o{}; }}", (i + 1) % n),
        };
        let _ = writeln!(source, "  var o{} = {};", i, init);
    }
    for (k, (from, to)) in edges.iter().enumerate() {
        let _ = writeln!(source, "  o{}.e{} = o{};", from, k, to);
    }
    source.push_str("  return o0;\n})();\n");
    source
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_output_is_deterministic((kinds, edges) in arb_graph()) {
        let source = graph_program(&kinds, &edges);
        let first = serialize_inline(&source);
        let second = serialize_inline(&source);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_output_rebuilds_the_graph((kinds, edges) in arb_graph()) {
        let source = graph_program(&kinds, &edges);
        assert_equivalent(&source, &serialize_inline(&source), "");
        assert_equivalent(&source, &serialize(&source), "");
    }
}

// ============================================================================
// Fixed cases
// ============================================================================

#[test]
fn test_repeated_runs_on_one_serializer_match() {
    use prebake_engine::{Serializer, SourceUnit};

    let units = [SourceUnit::new(
        "main.js",
        "var a = { b: [1, 2] }; a.b.push(a); var c = function () { return a; };",
    )];
    let mut serializer = Serializer::new(inline_options());
    let first = serializer.init(&units).unwrap().unwrap().code;
    let second = serializer.init(&units).unwrap().unwrap().code;
    assert_eq!(first, second);
}

#[test]
fn test_fully_connected_graph_terminates() {
    let kinds = [NodeKind::Object; 5];
    let edges: Vec<(usize, usize)> = (0..5)
        .flat_map(|from| (0..5).map(move |to| (from, to)))
        .collect();
    let source = graph_program(&kinds, &edges);
    let code = serialize_inline(&source);
    assert_equivalent(&source, &code, "");
}

#[test]
fn test_generated_names_avoid_source_identifiers() {
    let source = "var _0 = { taken: true }; var __scope_0 = 1;
                  var shared = {}; var pair = [shared, shared];
                  var f = (function () { var n = 1; return function () { return n; }; })();";
    let code = serialize_inline(source);
    assert_eq!(code.matches("var _0 =").count(), 1, "{}", code);
    assert_eq!(code.matches("var __scope_0 =").count(), 1, "{}", code);
    assert_equivalent(source, &code, "var __probe = [f(), _0.taken, __scope_0];");
}
