//! Lazy object serializer.

use super::harness::*;
use prebake_engine::SerializerOptions;

fn lazy_options() -> SerializerOptions {
    SerializerOptions {
        lazy_objects_runtime: Some("__rt".to_string()),
        ..inline_options()
    }
}

#[test]
fn test_objects_are_created_through_the_runtime() {
    let source = "var settings = { mode: 'fast', depth: 3 };";
    let result = serialize_with(lazy_options(), source);
    assert!(result.code.starts_with("var settings = __rt.createLazyObject(function (__lazy0) {"));
    assert_eq!(result.statistics.lazy_objects, 1);
    assert_equivalent_lazy(source, &result.code, "");
}

#[test]
fn test_nested_and_cyclic_objects() {
    let source = "var app = { inner: { v: 1 }, list: [1, 2] };
                  app.inner.back = app;
                  app.list.push(app.inner);";
    let result = serialize_with(lazy_options(), source);
    assert_eq!(result.statistics.lazy_objects, 2);
    assert_equivalent_lazy(
        source,
        &result.code,
        "var __probe = [app.inner.back === app, app.list[2] === app.inner];",
    );
}

#[test]
fn test_thunk_parameters_avoid_source_names() {
    let source = "var __lazy0 = 1; var o = { a: 1 };";
    let code = serialize_with(lazy_options(), source).code;
    assert!(code.contains("function (__lazy1)"), "{}", code);
    assert_equivalent_lazy(source, &code, "");
}

#[test]
fn test_empty_objects_and_arrays_stay_eager() {
    let source = "var e = {}; var list = [{}];";
    let result = serialize_with(lazy_options(), source);
    assert_eq!(result.statistics.lazy_objects, 0);
    assert!(!result.code.contains("createLazyObject"));
    assert_equivalent_lazy(source, &result.code, "");
}
