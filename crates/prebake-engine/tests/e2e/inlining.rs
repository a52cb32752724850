//! Two-pass naming: what gets a declaration and what is inlined.

use super::harness::*;
use prebake_engine::SerializerOptions;

fn ten_objects() -> String {
    (0..10).map(|i| format!("var a{} = {{ n: {} }};\n", i, i)).collect()
}

#[test]
fn test_conservative_mode_names_every_value() {
    let source = ten_objects();
    let result = serialize_with(SerializerOptions::default(), &source);
    assert_eq!(value_declarations(&result.code), 10);
    assert_eq!(result.statistics.declarations, 10);
    assert_eq!(result.statistics.inlined_values, 0);
    assert_equivalent(&source, &result.code, "");
}

#[test]
fn test_inline_mode_names_nothing_used_once() {
    let source = ten_objects();
    let result = serialize_with(inline_options(), &source);
    assert_eq!(value_declarations(&result.code), 0);
    assert_eq!(result.statistics.inlined_values, 10);
    assert!(result.code.contains("var a3 = { n: 3 };\n"));
    assert_equivalent(&source, &result.code, "");
}

#[test]
fn test_shared_value_is_declared_once() {
    let source = "var shared = { n: 1 }; var a = [shared, shared, shared];";
    let code = serialize_inline(source);
    assert_eq!(value_declarations(&code), 1);
    // One declaration plus four references
    assert_eq!(code.matches("_0").count(), 5);
    assert_equivalent(source, &code, "var __probe = a[0] === a[2];");
}

#[test]
fn test_inlining_does_not_change_values() {
    let source = "var tree = { left: { leaf: 1 }, right: { leaf: 2, list: [[1], [2]] } };
                  var alias = tree.right;";
    let inline = serialize_inline(source);
    let conservative = serialize(source);
    assert_ne!(inline, conservative);
    assert_equivalent(source, &inline, "var __probe = alias === tree.right;");
    assert_equivalent(source, &conservative, "var __probe = alias === tree.right;");
}

#[test]
fn test_statistics_count_structure() {
    let result = serialize_with(
        inline_options(),
        "var data = { list: [1, 2], fn: function () { return 1; } };",
    );
    assert_eq!(result.statistics.objects, 1);
    assert_eq!(result.statistics.arrays, 1);
    assert_eq!(result.statistics.functions, 1);
    assert_eq!(result.statistics.declarations, 0);
}
