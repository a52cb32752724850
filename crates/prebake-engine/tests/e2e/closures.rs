//! Closures: captured bindings are rebuilt as shared scope storage.

use super::harness::*;

#[test]
fn test_sibling_closures_share_one_scope() {
    let source = "var counter = (function () {
                    var n = 0;
                    return {
                      inc: function () { n++; return n; },
                      get: function () { return n; }
                    };
                  })();
                  counter.inc();";
    let code = serialize_inline(source);
    assert!(code.starts_with("var __scope_0 = [1];\n"), "{}", code);
    assert!(!code.contains("__scope_1"));
    assert_equivalent(
        source,
        &code,
        "var __probe = [counter.inc(), counter.inc(), counter.get()];",
    );
}

#[test]
fn test_separate_invocations_get_separate_scopes() {
    let source = "function make() { var n = 0; return function () { n++; return n; }; }
                  var a = make();
                  var b = make();
                  a();";
    let code = serialize_inline(source);
    assert!(code.contains("__scope_0"));
    assert!(code.contains("__scope_1"));
    assert_equivalent(source, &code, "var __probe = [a(), b(), a()];");
}

#[test]
fn test_global_captures_stay_global() {
    let source = "var g = 1; function get() { return g; }";
    let code = serialize_inline(source);
    assert!(!code.contains("__scope_"), "{}", code);
    assert_equivalent(source, &code, "g = 5; var __probe = get();");
}

#[test]
fn test_only_captured_bindings_are_stored() {
    let source = "var f = (function () {
                    var used = 3;
                    var unused = { big: [1, 2, 3] };
                    return function (m) { var k = m + used; return k; };
                  })();";
    let code = serialize_inline(source);
    assert!(code.starts_with("var __scope_0 = [3];\n"), "{}", code);
    assert!(!code.contains("big"));
    assert_equivalent(source, &code, "var __probe = f(4);");
}

#[test]
fn test_function_capturing_itself() {
    let source = "var f = (function () {
                    var self = function () { return self; };
                    return self;
                  })();";
    let code = serialize_inline(source);
    assert_equivalent(source, &code, "var __probe = f() === f;");
}

#[test]
fn test_nested_scopes() {
    let source = "var outer = (function () {
                    var a = 1;
                    return (function () {
                      var b = 2;
                      return function () { a = a + b; return a; };
                    })();
                  })();";
    let code = serialize_inline(source);
    assert!(code.contains("__scope_0"));
    assert!(code.contains("__scope_1"));
    assert_equivalent(source, &code, "var __probe = [outer(), outer()];");
}

#[test]
fn test_captured_object_is_shared_with_globals() {
    let source = "var state = { hits: 0 };
                  var track = (function () {
                    var s = state;
                    return function () { s.hits++; return s.hits; };
                  })();";
    let code = serialize_inline(source);
    assert_equivalent(source, &code, "track(); var __probe = state.hits;");
}

#[test]
fn test_function_properties() {
    let source = "function tagged() { return 1; } tagged.meta = { kind: 'tag' };";
    let code = serialize_inline(source);
    assert!(code.contains(".meta = { kind: \"tag\" };"), "{}", code);
    assert_equivalent(source, &code, "var __probe = tagged.meta.kind;");
}
