//! Heaps far deeper than the emitter's nesting limit.
//!
//! The generic `shape` walk recurses, so these tests follow the chains
//! iteratively instead.

use super::harness::*;
use prebake_engine::interpreter::value::Value;
use prebake_engine::{Realm, SerializerOptions};

const LENGTH: usize = 50_000;

fn linked_list(length: usize) -> String {
    format!(
        "var head = null;
         var i = 0;
         while (i < {}) {{ head = {{ n: i, next: head }}; i++; }}",
        length
    )
}

/// `n` of every node reachable from global `name` through `next`
fn chain(realm: &Realm, name: &str) -> Vec<f64> {
    let mut values = Vec::new();
    let mut current = realm.global_binding(name).cloned().unwrap_or(Value::Undefined);
    while let Some(id) = current.as_object() {
        let object = realm.heap.get(id).expect("dangling object");
        let keys: Vec<&str> = object.properties.keys().map(String::as_str).collect();
        assert_eq!(keys, ["n", "next"], "node {} lost its key order", values.len());
        match object.properties.get("n") {
            Some(Value::Number(n)) => values.push(*n),
            other => panic!("node {} has n = {:?}", values.len(), other),
        }
        current = object.properties.get("next").cloned().unwrap_or(Value::Undefined);
    }
    values
}

/// Elements nested through index 0: `[[[...]]]`
fn nesting_depth(realm: &Realm, name: &str) -> usize {
    let mut depth = 0;
    let mut current = realm.global_binding(name).cloned().unwrap_or(Value::Undefined);
    while let Some(id) = current.as_object() {
        depth += 1;
        current = realm
            .heap
            .get(id)
            .and_then(|object| object.elements())
            .and_then(|elements| elements.first())
            .cloned()
            .unwrap_or(Value::Undefined);
    }
    depth
}

// ============================================================================
// Linked lists
// ============================================================================

#[test]
fn test_long_list_without_inlining() {
    let source = linked_list(LENGTH);
    let code = serialize(&source);
    assert_eq!(value_declarations(&code), LENGTH);
    assert_eq!(chain(&evaluate(&code), "head"), chain(&evaluate(&source), "head"));
}

#[test]
fn test_long_list_with_inlining() {
    let source = linked_list(LENGTH);
    let result = serialize_with(inline_options(), &source);
    // Only the nodes where nesting is cut get a name
    assert!(value_declarations(&result.code) < LENGTH / 8, "too many declarations");
    assert!(result.statistics.deferred_assignments > 0);
    assert_eq!(chain(&evaluate(&result.code), "head"), chain(&evaluate(&source), "head"));
}

#[test]
fn test_long_list_through_lazy_objects() {
    let source = linked_list(10_000);
    let options = SerializerOptions {
        lazy_objects_runtime: Some("__rt".to_string()),
        ..inline_options()
    };
    let code = serialize_with(options, &source).code;
    let rebuilt = evaluate(&format!("{}{}\n__rt.flush();\n", LAZY_RUNTIME, code));
    assert_eq!(chain(&rebuilt, "head"), chain(&evaluate(&source), "head"));
}

#[test]
fn test_long_list_ending_in_a_cycle() {
    let source = format!("{}\nvar tail = head; while (tail.next) {{ tail = tail.next; }}\ntail.next = head;", linked_list(5_000));
    let code = serialize_inline(&source);
    let rebuilt = evaluate(&format!("{}\nvar __probe = tail.next === head && tail.n === 0;", code));
    assert_eq!(rebuilt.global_binding(PROBE), Some(&Value::Bool(true)));
}

// ============================================================================
// Arrays
// ============================================================================

#[test]
fn test_deeply_nested_arrays() {
    let source = "var nest = []; var i = 0; while (i < 20000) { nest = [nest]; i++; }";
    for code in [serialize(source), serialize_inline(source)] {
        assert_eq!(nesting_depth(&evaluate(&code), "nest"), 20_001);
    }
}
