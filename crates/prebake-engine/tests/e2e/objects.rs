//! Plain data: objects, arrays, primitives and cycles between them.

use super::harness::*;
use prebake_engine::{ErrorCode, Serializer, SerializerError, SerializerOptions, SourceUnit};

// ============================================================================
// Cycles
// ============================================================================

#[test]
fn test_self_reference() {
    let source = "var x = {}; x.self = x;";
    let code = serialize(source);
    assert_eq!(code, "var _0 = { self: undefined };\n_0.self = _0;\nvar x = _0;\n");
    assert_equivalent(source, &code, "var __probe = x.self === x;");
}

#[test]
fn test_mutual_references() {
    let source = "var a = { name: 'a' }; var b = { name: 'b', a: a }; a.b = b;";
    let code = serialize_inline(source);
    assert_equivalent(source, &code, "var __probe = a.b.a === a;");
}

#[test]
fn test_array_containing_itself() {
    let source = "var arr = [1]; arr.push(arr); arr.push(2);";
    let code = serialize_inline(source);
    assert!(code.contains("[1, undefined, 2]"), "{}", code);
    assert_equivalent(source, &code, "var __probe = arr[1] === arr;");
}

#[test]
fn test_long_cycle() {
    let source = "var first = { n: 0 };
                  var last = first;
                  var i = 1;
                  while (i < 6) { last = { n: i, prev: last }; i++; }
                  first.prev = last;";
    let code = serialize_inline(source);
    assert_equivalent(source, &code, "var __probe = first.prev.prev.prev.prev.prev.prev === first;");
}

#[test]
fn test_two_holders_waiting_on_ancestors() {
    let source = "var root = (function () {
                    var o0 = {}; var o1 = {}; var o2 = {};
                    o0.c = o1; o1.c = o2; o2.a = o0; o2.b = o1;
                    return o0;
                  })();";
    for code in [serialize(source), serialize_inline(source)] {
        assert_equivalent(source, &code, "var __probe = root.c.c.a === root;");
    }
}

#[test]
fn test_function_properties_keep_order_around_placeholders() {
    let source = "var x = { f: function () {} }; x.f.a = x; x.f.b = 2;";
    let code = serialize_inline(source);
    assert_eq!(
        code,
        "var _0 = function () {};\n_0.a = undefined;\n_0.b = 2;\nvar _1 = { f: _0 };\n_0.a = _1;\nvar x = _1;\n"
    );
    assert_equivalent(source, &code, "var __probe = x.f.a === x;");
}

// ============================================================================
// Data shapes
// ============================================================================

#[test]
fn test_primitives() {
    let source = "var s = 'text'; var n = 1.5; var u; var t = true; var z = null; var neg = -3;";
    let code = serialize(source);
    assert!(code.contains("var u;\n"));
    assert_equivalent(source, &code, "");
}

#[test]
fn test_nested_structures_round_trip() {
    let source = "var config = {
                    name: 'app',
                    ports: [80, 443],
                    limits: { cpu: 2, memory: { soft: 1, hard: 4 } },
                    tags: []
                  };";
    let code = serialize_inline(source);
    assert_eq!(value_declarations(&code), 0);
    assert_equivalent(source, &code, "");
}

#[test]
fn test_property_order_survives_placeholders() {
    let source = "var p = { before: 1 }; p.me = p; p.after = 2;";
    let code = serialize(source);
    assert_equivalent(source, &code, "var __probe = [];");
    let rebuilt = evaluate(&code);
    let keys: Vec<String> = rebuilt
        .global_binding("p")
        .and_then(|value| value.as_object())
        .and_then(|id| rebuilt.heap.get(id))
        .map(|object| object.properties.keys().cloned().collect())
        .unwrap_or_default();
    assert_eq!(keys, ["before", "me", "after"]);
}

#[test]
fn test_array_properties_follow_declaration() {
    let source = "var list = [1, 2]; list.label = 'pair';";
    let code = serialize_inline(source);
    assert!(code.contains(".label = \"pair\";"), "{}", code);
    assert_equivalent(source, &code, "");
}

// ============================================================================
// Source units
// ============================================================================

#[test]
fn test_units_share_the_global_scope() {
    let units = [
        SourceUnit::new("a.js", "var base = { n: 1 };"),
        SourceUnit::new("b.js", "var derived = { base: base };"),
    ];
    let mut serializer = Serializer::new(SerializerOptions::default());
    let code = serializer.init(&units).unwrap().unwrap().code;
    assert_equivalent(
        "var base = { n: 1 }; var derived = { base: base };",
        &code,
        "var __probe = derived.base === base;",
    );
}

#[test]
fn test_abrupt_completion_is_fatal() {
    let (result, codes) =
        serialize_diagnostics(SerializerOptions::default(), "var a = {}; a.missing.field = 1;");
    assert!(matches!(result, Err(SerializerError::Fatal { code: "PB1001", .. })));
    assert_eq!(codes, [ErrorCode::ABRUPT_COMPLETION]);
}

#[test]
fn test_far_array_index_is_an_abrupt_completion() {
    let (result, codes) =
        serialize_diagnostics(SerializerOptions::default(), "var a = []; a[50000000] = 1;");
    assert!(matches!(result, Err(SerializerError::Fatal { code: "PB1001", .. })));
    assert_eq!(codes, [ErrorCode::ABRUPT_COMPLETION]);
}

#[test]
fn test_parse_error_names_the_unit() {
    let mut serializer = Serializer::new(SerializerOptions::default());
    let units = [
        SourceUnit::new("good.js", "var ok = 1;"),
        SourceUnit::new("bad.js", "var = ;"),
    ];
    match serializer.init(&units) {
        Err(SerializerError::Fatal { code, message }) => {
            assert_eq!(code, "PB1000");
            assert!(message.starts_with("bad.js"));
        }
        other => panic!("expected a parse error, got {:?}", other.map(|r| r.map(|r| r.code))),
    }
    let location = serializer.diagnostics().iter().next().unwrap().location.unwrap();
    assert_eq!(location.unit, 1);
}
