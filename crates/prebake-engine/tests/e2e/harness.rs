//! Shared helpers for the end-to-end tests.

#![allow(dead_code)]

use prebake_engine::interpreter::heap::ObjectKind;
use prebake_engine::interpreter::value::Value;
use prebake_engine::parser::parse_source;
use prebake_engine::{
    ErrorCode, Realm, SerializedResult, Serializer, SerializerError, SerializerOptions,
    SourceUnit,
};
use rustc_hash::FxHashMap;

/// Global the probes below store their observation in
pub const PROBE: &str = "__probe";

/// A lazy-object runtime that runs thunks when `__rt.flush()` is called
pub const LAZY_RUNTIME: &str = "var __rt = {
  queue: [],
  createLazyObject: function (init) {
    var target = {};
    __rt.queue.push(function () { init(target); });
    return target;
  },
  flush: function () {
    var i = 0;
    while (i < __rt.queue.length) { __rt.queue[i](); i++; }
  }
};
";

/// Options with the counting pass on
pub fn inline_options() -> SerializerOptions {
    SerializerOptions {
        inline_expressions: true,
        ..Default::default()
    }
}

/// Serialize one unit, expecting success.
pub fn serialize_with(options: SerializerOptions, source: &str) -> SerializedResult {
    let mut serializer = Serializer::new(options);
    match serializer.init(&[SourceUnit::new("main.js", source)]) {
        Ok(Some(result)) => result,
        Ok(None) => panic!(
            "serialization reported errors: {:?}",
            serializer.diagnostics().iter().collect::<Vec<_>>()
        ),
        Err(error) => panic!("serialization failed: {}", error),
    }
}

/// Generated code for `source` with default options
pub fn serialize(source: &str) -> String {
    serialize_with(SerializerOptions::default(), source).code
}

/// Generated code for `source` with inlining enabled
pub fn serialize_inline(source: &str) -> String {
    serialize_with(inline_options(), source).code
}

/// Run a failing serialization and return the error codes it logged.
pub fn serialize_diagnostics(
    options: SerializerOptions,
    source: &str,
) -> (Result<(), SerializerError>, Vec<ErrorCode>) {
    let mut serializer = Serializer::new(options);
    let result = serializer
        .init(&[SourceUnit::new("main.js", source)])
        .map(|result| assert!(result.is_none(), "expected errors, got output"));
    let codes = serializer.diagnostics().iter().map(|d| d.code).collect();
    (result, codes)
}

/// Evaluate `source` in a fresh realm.
pub fn evaluate(source: &str) -> Realm {
    let unit = match parse_source(source, 0) {
        Ok(unit) => unit,
        Err(error) => panic!("generated code does not parse: {}\n{}", error.message, source),
    };
    let mut realm = Realm::default();
    if let Err(thrown) = realm.run_program(&unit.program) {
        panic!("evaluation threw {}\n{}", thrown, source);
    }
    realm
}

/// Canonical description of the value bound to global `name`.
///
/// Objects are numbered in the order the walk first meets them, so two
/// heaps with the same shape describe identically regardless of ids.
pub fn shape(realm: &Realm, name: &str) -> String {
    let value = realm.global_binding(name).cloned().unwrap_or(Value::Undefined);
    let mut seen = FxHashMap::default();
    describe(realm, &value, &mut seen)
}

fn describe(realm: &Realm, value: &Value, seen: &mut FxHashMap<u32, usize>) -> String {
    let id = match value {
        Value::Object(id) => *id,
        Value::String(s) => return format!("{:?}", s.as_ref()),
        Value::Number(n) => return format!("{}", n),
        other => return format!("{:?}", other),
    };
    if let Some(index) = seen.get(&id.0) {
        return format!("@{}", index);
    }
    let index = seen.len();
    seen.insert(id.0, index);
    let Some(object) = realm.heap.get(id) else {
        return "<dangling>".to_string();
    };
    let head = match &object.kind {
        ObjectKind::Ordinary => String::from("object"),
        ObjectKind::Array(elements) => {
            let items: Vec<String> = elements.iter().map(|e| describe(realm, e, seen)).collect();
            format!("[{}]", items.join(", "))
        }
        ObjectKind::Function(closure) => format!("function/{}", closure.node.params.len()),
    };
    let props: Vec<String> = object
        .properties
        .iter()
        .map(|(key, value)| format!("{}: {}", key, describe(realm, value, seen)))
        .collect();
    format!("{}{{{}}}", head, props.join(", "))
}

/// Every global the input program declares.
pub fn global_names(realm: &Realm) -> Vec<String> {
    realm.envs.global().bindings.keys().cloned().collect()
}

/// Assert that the generated `code` rebuilds the same globals as `source`
/// and that `probe` observes the same result after both.
pub fn assert_equivalent(source: &str, code: &str, probe: &str) {
    let rebuilt = evaluate(&format!("{}\n{}", code, probe));
    compare_globals(source, &rebuilt, code, probe);
}

/// Like [`assert_equivalent`] for output of the lazy serializer: the
/// runtime is defined first and every thunk runs before `probe`.
pub fn assert_equivalent_lazy(source: &str, code: &str, probe: &str) {
    let rebuilt = evaluate(&format!("{}{}\n__rt.flush();\n{}", LAZY_RUNTIME, code, probe));
    compare_globals(source, &rebuilt, code, probe);
}

fn compare_globals(source: &str, rebuilt: &Realm, code: &str, probe: &str) {
    let original = evaluate(&format!("{}\n{}", source, probe));
    for name in global_names(&original) {
        assert_eq!(
            shape(&original, &name),
            shape(rebuilt, &name),
            "global `{}` differs\n--- generated ---\n{}",
            name,
            code
        );
    }
}

/// Number of generated value declarations in `code`
pub fn value_declarations(code: &str) -> usize {
    code.lines()
        .filter_map(|line| line.strip_prefix("var _"))
        .filter(|rest| rest.starts_with(|c: char| c.is_ascii_digit()))
        .count()
}
