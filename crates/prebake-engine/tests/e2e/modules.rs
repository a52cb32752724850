//! Module registries: resolution, forced initialization and failures.

use super::harness::*;
use prebake_engine::{ErrorCode, SerializerOptions, MODULE_PRELUDE};

const PROGRAM: &str = "__d(function (module, exports) { exports.a = 1; }, 0);
__d(function (module, exports, require) { exports.b = require(0).a + 1; }, 1);
__d(function (module, exports) { exports.c = 3; }, 2);
var main = require(1);
";

fn with_prelude(body: &str) -> String {
    format!("{}{}", MODULE_PRELUDE, body)
}

#[test]
fn test_modules_keep_their_initialized_state() {
    let source = with_prelude(PROGRAM);
    let code = serialize_inline(&source);
    assert_equivalent(
        &source,
        &code,
        "var __probe = [__modules[0].initialized, __modules[1].initialized, __modules[2].initialized, main.b];",
    );
    let rebuilt = evaluate(&format!("{}\nvar __probe = __modules[2].initialized;", code));
    assert_eq!(shape(&rebuilt, PROBE), "Bool(false)");
}

#[test]
fn test_initialize_more_modules_forces_the_rest() {
    let source = with_prelude(PROGRAM);
    let options = SerializerOptions {
        initialize_more_modules: true,
        ..inline_options()
    };
    let code = serialize_with(options, &source).code;
    let expected = format!("{}require(2);", source);
    assert_equivalent(&expected, &code, "var __probe = __modules[2].exports.c;");
}

#[test]
fn test_failing_module_is_an_error() {
    let source = with_prelude(
        "__d(function (module, exports) { throw 'unsupported'; }, 'native');
         var ready = true;",
    );
    let options = SerializerOptions {
        initialize_more_modules: true,
        ..Default::default()
    };
    let (result, codes) = serialize_diagnostics(options, &source);
    assert!(result.is_ok());
    assert_eq!(codes, [ErrorCode::MODULE_INIT_FAILED]);
}

#[test]
fn test_delayed_module_stays_uninitialized() {
    let source = with_prelude(
        "__d(function (module, exports) { throw 'unsupported'; }, 'native');
         __d(function (module, exports) { exports.ok = true; }, 'plain');",
    );
    let options = SerializerOptions {
        initialize_more_modules: true,
        delay_unsupported_requires: true,
        ..Default::default()
    };
    let code = serialize_with(options, &source).code;
    let rebuilt = evaluate(&format!(
        "{}\nvar __probe = [__modules.native.initialized, __modules.plain.initialized];",
        code
    ));
    assert_eq!(shape(&rebuilt, PROBE), "[Bool(false), Bool(true)]{}");
}

#[test]
fn test_accelerate_retries_after_progress() {
    let source = with_prelude(
        "var ready = false;
         __d(function (module, exports) {
           if (!ready) { throw 'not yet'; }
           exports.late = true;
         }, 'first');
         __d(function (module, exports) { ready = true; }, 'second');",
    );
    let options = SerializerOptions {
        initialize_more_modules: true,
        accelerate_unsupported_requires: true,
        ..inline_options()
    };
    let code = serialize_with(options, &source).code;
    let rebuilt = evaluate(&format!("{}\nvar __probe = __modules.first.exports.late;", code));
    assert_eq!(shape(&rebuilt, PROBE), "Bool(true)");
}

#[test]
fn test_malformed_registry_is_reported() {
    let (result, codes) =
        serialize_diagnostics(SerializerOptions::default(), "var __modules = { x: 5 };");
    assert!(result.is_ok());
    assert_eq!(codes, [ErrorCode::MALFORMED_REGISTRY]);
}
