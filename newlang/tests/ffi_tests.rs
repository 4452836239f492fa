//! FFI bridge tests: prototype-driven marshaling, lazy resolution,
//! defaults and narrowing, pointer-backed globals, and a real
//! variadic call into libc.

use std::ffi::c_void;

use pretty_assertions::assert_eq;

use newlang::error::NlError;
use newlang::ffi::loader::StaticResolver;
use newlang::interp::Interpreter;
use newlang::{dsl, Object};

extern "C" fn add_export(arg1: i64, arg2: i8) -> i64 {
    arg1 + i64::from(arg2)
}

fn interpreter_with(resolver: StaticResolver) -> Interpreter {
    let mut interp = Interpreter::new();
    dsl::install(&mut interp).unwrap();
    interp.set_resolver(Box::new(resolver));
    interp
}

fn eval(interp: &mut Interpreter, source: &str) -> Object {
    interp
        .eval_str(source)
        .unwrap_or_else(|e| panic!("eval failed for {source:?}: {e}"))
}

#[test]
fn native_call_with_defaults_and_narrowing() {
    let mut resolver = StaticResolver::new();
    resolver.register("add_export", add_export as usize as *mut c_void);
    let mut interp = interpreter_with(resolver);

    eval(
        &mut interp,
        "add_export := :Pointer('add_export(arg1:Int64, arg2:Int8=100):Int64')",
    );

    assert_eq!(eval(&mut interp, "add_export(200, 10)").as_i64(), Some(210));
    assert_eq!(eval(&mut interp, "add_export(10, 10)").as_i64(), Some(20));
    // the default fills arg2
    assert_eq!(eval(&mut interp, "add_export(10)").as_i64(), Some(110));
    // named binding
    assert_eq!(
        eval(&mut interp, "add_export(arg2=1, arg1=2)").as_i64(),
        Some(3)
    );

    // 1000 does not fit the declared Int8 formal
    let err = interp.eval_str("add_export(1000, 1000)").unwrap_err();
    assert!(matches!(err, NlError::Value(_) | NlError::Type(_)), "{err:?}");
}

#[test]
fn unresolved_symbol_reports_at_call_time() {
    let mut interp = interpreter_with(StaticResolver::new());
    // building the prototype succeeds; resolution is lazy
    eval(&mut interp, "ghost := :Pointer('ghost():Int32')");
    let err = interp.eval_str("ghost()").unwrap_err();
    assert!(matches!(err, NlError::Runtime(_)), "{err:?}");
}

#[test]
fn native_function_prints_its_prototype() {
    let mut resolver = StaticResolver::new();
    resolver.register("add_export", add_export as usize as *mut c_void);
    let mut interp = interpreter_with(resolver);

    let func = eval(
        &mut interp,
        "add_export := :Pointer('add_export(arg1:Int64, arg2:Int8=100):Int64')",
    );
    assert_eq!(
        func.to_string(),
        "add_export(arg1:Int64, arg2:Int8=100):Int64{}"
    );
}

#[test]
fn pointer_backed_global_reads_and_writes_through() {
    let mut var_long: i64 = 987_654_321;
    let mut resolver = StaticResolver::new();
    resolver.register("var_long", &mut var_long as *mut i64 as *mut c_void);
    let mut interp = interpreter_with(resolver);

    eval(&mut interp, "var_export := :Pointer('var_long:Int64')");
    assert_eq!(eval(&mut interp, "var_export").as_i64(), Some(987_654_321));

    // reads follow the foreign memory
    var_long = 123_132_132;
    assert_eq!(eval(&mut interp, "var_export").as_i64(), Some(123_132_132));

    // writes go through the pointer
    eval(&mut interp, "var_export = 59875");
    assert_eq!(var_long, 59875);
}

#[test]
fn pure_functions_reject_native_calls() {
    let mut resolver = StaticResolver::new();
    resolver.register("add_export", add_export as usize as *mut c_void);
    let mut interp = interpreter_with(resolver);

    eval(
        &mut interp,
        "add_export := :Pointer('add_export(arg1:Int64, arg2:Int8=100):Int64')",
    );
    eval(&mut interp, "wrapped(x) :- { add_export(x) }");
    let err = interp.eval_str("wrapped(1)").unwrap_err();
    assert!(matches!(err, NlError::Type(_)), "{err:?}");
}

#[cfg(unix)]
#[test]
fn variadic_printf_through_libc() {
    let mut interp = Interpreter::new();
    dsl::install(&mut interp).unwrap();

    eval(
        &mut interp,
        "printf := :Pointer('printf(format:FmtChar, ...):Int32')",
    );
    let written = eval(&mut interp, r"printf('%s%d\n', 'hi', 2)");
    let count = written.as_i64().expect("printf returns a count");
    assert!(count >= 4, "printf reported {count}");
}

#[cfg(unix)]
#[test]
fn abs_through_libc() {
    let mut interp = Interpreter::new();
    dsl::install(&mut interp).unwrap();

    eval(&mut interp, "abs := :Pointer('abs(v:Int32):Int32')");
    assert_eq!(eval(&mut interp, "abs(-42)").as_i64(), Some(42));
}
