//! Additional functions: effects captured and emitted as their own units.

use super::harness::*;
use prebake_engine::{ErrorCode, Serializer, SerializerError, SerializerOptions, Severity, SourceUnit};

#[test]
fn test_effects_are_replayed_inside_the_function() {
    let source = "var store = { count: 0 };
                  function App() { store.count = store.count + 1; return { ok: true }; }
                  __optimize(App);";
    let result = serialize_with(inline_options(), source);
    let code = &result.code;
    // Global state is the state before the function ran
    assert!(code.contains("{ count: 0 }"), "{}", code);
    assert!(code.contains(".count = 1;"), "{}", code);
    assert_eq!(result.statistics.additional_functions, 1);
    assert_equivalent(source, code, "var __probe = App();");
}

#[test]
fn test_global_binding_modification() {
    let source = "var renders = 0;
                  var App = function () { renders = renders + 1; return renders; };
                  __optimize(App);";
    let code = serialize_inline(source);
    assert!(code.contains("var renders = 0;"), "{}", code);
    assert!(code.contains("renders = 1;"), "{}", code);
    assert_equivalent(source, &code, "var __probe = App();");
}

#[test]
fn test_captured_binding_modification() {
    let source = "var App = (function () {
                    var calls = 0;
                    return function () { calls = calls + 1; return calls; };
                  })();
                  __optimize(App);";
    let code = serialize_inline(source);
    assert!(code.contains("__scope_0[0] = 1;"), "{}", code);
    assert_equivalent(source, &code, "var __probe = App();");
}

#[test]
fn test_react_statistics() {
    let source = "function Root() {
                    var label = 'root';
                    return { render: function () { return label; } };
                  }
                  function Leaf() { return [1, 2]; }
                  __optimize(Root);
                  __optimize(Leaf);";
    let result = serialize_with(SerializerOptions::default(), source);
    let react = result.react_statistics.unwrap();
    assert_eq!(react.optimized_trees, 2);
    assert_eq!(react.nested_closures, 1);
    assert_equivalent(source, &result.code, "var __probe = [Root().render(), Leaf()];");
}

#[test]
fn test_no_additional_functions_means_no_react_statistics() {
    let result = serialize_with(SerializerOptions::default(), "var a = 1;");
    assert!(result.react_statistics.is_none());
}

// ============================================================================
// Independence
// ============================================================================

#[test]
fn test_write_read_conflict_is_fatal() {
    let source = "var shared = { n: 0 };
                  function A() { shared.n = 1; }
                  function B() { return shared.n; }
                  __optimize(A);
                  __optimize(B);";
    let (result, codes) = serialize_diagnostics(SerializerOptions::default(), source);
    match result {
        Err(SerializerError::IndependenceViolation { function, other, .. }) => {
            assert_eq!(function, "A");
            assert_eq!(other, "B");
        }
        other => panic!("expected an independence violation, got {:?}", other),
    }
    assert_eq!(codes, [ErrorCode::INDEPENDENCE_VIOLATION]);
}

#[test]
fn test_disjoint_functions_are_independent() {
    let source = "var left = { n: 0 };
                  var right = { n: 0 };
                  function A() { left.n = 1; }
                  function B() { right.n = 2; }
                  __optimize(A);
                  __optimize(B);";
    let code = serialize_inline(source);
    assert_equivalent(source, &code, "A(); B(); var __probe = [left.n, right.n];");
}

#[test]
fn test_reading_shared_state_is_allowed() {
    let source = "var theme = { color: 'red' };
                  function A() { return theme.color; }
                  function B() { return { c: theme.color }; }
                  __optimize(A);
                  __optimize(B);";
    let code = serialize_inline(source);
    assert_equivalent(source, &code, "var __probe = [A(), B().c];");
}

// ============================================================================
// Reporting
// ============================================================================

#[test]
fn test_throwing_function_is_reported() {
    let source = "function Broken() { throw 'nope'; } __optimize(Broken);";
    let (result, codes) = serialize_diagnostics(SerializerOptions::default(), source);
    assert!(result.is_ok());
    assert_eq!(codes, [ErrorCode::ADDITIONAL_FUNCTION_THREW]);
}

#[test]
fn test_non_function_is_reported() {
    let (result, codes) =
        serialize_diagnostics(SerializerOptions::default(), "var x = {}; __optimize(x);");
    assert!(result.is_ok());
    assert_eq!(codes, [ErrorCode::NOT_A_FUNCTION]);
}

#[test]
fn test_unreachable_function_is_a_warning() {
    let source = "var visible = 1;
                  (function () { function Hidden() { return 2; } __optimize(Hidden); })();";
    let mut serializer = Serializer::new(SerializerOptions::default());
    let result = serializer.init(&[SourceUnit::new("main.js", source)]).unwrap();
    assert!(result.is_some());
    let warnings: Vec<_> = serializer
        .diagnostics()
        .with_code(ErrorCode::UNREACHABLE_ADDITIONAL_FUNCTION)
        .collect();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].severity, Severity::Warning);
}
