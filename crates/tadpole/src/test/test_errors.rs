// Runtime errors, tracebacks and recovery
use crate::vm::{RuntimeError, TraceFrame, Vm, VmError, VmOption};
use crate::Value;

fn runtime_error(vm: &mut Vm, source: &str) -> RuntimeError {
    match vm.interpret(source) {
        Err(VmError::Runtime { error, .. }) => error,
        other => panic!("expected a runtime error, got {other:?}"),
    }
}

#[test]
fn test_undefined_global_leaves_vm_usable() {
    let mut vm = Vm::new(VmOption::default());
    assert_eq!(
        runtime_error(&mut vm, "undefined_name + 1"),
        RuntimeError::UndefinedVariable("undefined_name".to_string())
    );
    assert_eq!(vm.stack_depth(), 0);
    assert_eq!(vm.frame_depth(), 0);

    assert_eq!(vm.interpret("1 + 1").unwrap(), Value::Numeric(2.0));
}

#[test]
fn test_undefined_message() {
    let err = Vm::default().interpret("nope").unwrap_err();
    assert_eq!(err.to_string(), "name `nope` is not defined");
}

#[test]
fn test_assigning_undefined_global_fails() {
    let mut vm = Vm::default();
    assert_eq!(
        runtime_error(&mut vm, "nope = 1;"),
        RuntimeError::UndefinedVariable("nope".to_string())
    );
    assert_eq!(vm.get_global("nope"), None);
}

#[test]
fn test_globals_survive_runtime_error() {
    let mut vm = Vm::default();
    vm.interpret("var kept = 5;").unwrap();
    runtime_error(&mut vm, "kept = 6; boom();");
    assert_eq!(vm.interpret("kept").unwrap(), Value::Numeric(6.0));
}

#[test]
fn test_arity_mismatch() {
    let mut vm = Vm::default();
    let error = runtime_error(&mut vm, "fn f(a) { return a; } f(1, 2)");
    assert_eq!(
        error,
        RuntimeError::Arity {
            name: "f".to_string(),
            expected: 1,
            got: 2
        }
    );
    assert_eq!(error.to_string(), "f() takes exactly 1 arguments (2 given)");
}

#[test]
fn test_type_mismatch() {
    let mut vm = Vm::default();
    match runtime_error(&mut vm, "1 + nil") {
        RuntimeError::TypeMismatch(message) => {
            assert_eq!(message, "operands of `+` must be numerics, got `numeric` and `nil`")
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(matches!(
        runtime_error(&mut vm, r#"-"text""#),
        RuntimeError::TypeMismatch(_)
    ));
    // no implicit string concatenation
    assert!(matches!(
        runtime_error(&mut vm, r#""a" + "b""#),
        RuntimeError::TypeMismatch(_)
    ));
}

#[test]
fn test_not_callable() {
    let mut vm = Vm::default();
    assert_eq!(
        runtime_error(&mut vm, "var x = 1; x()"),
        RuntimeError::NotCallable("numeric")
    );
    assert_eq!(
        runtime_error(&mut vm, r#""str"()"#),
        RuntimeError::NotCallable("string")
    );
    assert_eq!(runtime_error(&mut vm, "nil()"), RuntimeError::NotCallable("nil"));
}

#[test]
fn test_stack_overflow() {
    let mut vm = Vm::new(VmOption {
        max_call_depth: 64,
        ..VmOption::default()
    });
    assert_eq!(
        runtime_error(&mut vm, "fn f() { return f(); } f()"),
        RuntimeError::StackOverflow { depth: 64 }
    );
    assert_eq!(vm.frame_depth(), 0);
    assert_eq!(vm.interpret("2 * 21").unwrap(), Value::Numeric(42.0));
}

#[test]
fn test_traceback_innermost_first() {
    let mut vm = Vm::default();
    let err = vm
        .interpret("fn inner() { return nope; }\nfn outer() { return inner(); }\nouter()")
        .unwrap_err();
    let VmError::Runtime { traceback, .. } = &err else {
        panic!("expected a runtime error, got {err:?}");
    };
    assert_eq!(
        traceback,
        &vec![
            TraceFrame {
                function: "inner".to_string(),
                line: 1
            },
            TraceFrame {
                function: "outer".to_string(),
                line: 2
            },
            TraceFrame {
                function: "script".to_string(),
                line: 3
            },
        ]
    );
    assert_eq!(
        err.report(),
        "name `nope` is not defined\n[line 1] in inner\n[line 2] in outer\n[line 3] in script"
    );
}

#[test]
fn test_native_error_propagates() {
    let mut vm = Vm::default();
    vm.define_native("fail", |_, _| Err(RuntimeError::Native("boom".to_string())));
    assert_eq!(
        runtime_error(&mut vm, "fn wrap() { return fail(); } wrap()"),
        RuntimeError::Native("boom".to_string())
    );
    assert_eq!(vm.stack_depth(), 0);
}

#[test]
fn test_compile_error_then_recovery() {
    let mut vm = Vm::default();
    let err = vm.interpret("var = ;").unwrap_err();
    assert!(err.is_compile_error());
    assert!(err.runtime_error().is_none());
    assert_eq!(vm.interpret("3").unwrap(), Value::Numeric(3.0));
}

#[test]
fn test_native_cannot_reenter_interpret() {
    let mut vm = Vm::default();
    vm.define_native("nested", |vm, _| match vm.interpret("1") {
        Ok(value) => Ok(value),
        Err(e) => Err(RuntimeError::Native(e.to_string())),
    });
    assert!(matches!(
        runtime_error(&mut vm, "nested()"),
        RuntimeError::Native(_)
    ));
}

const ESCAPING_ACCESSORS: &str = r#"
    var get;
    var set;
    fn outer() {
        var x = 41;
        fn getter() { return x; }
        fn setter(v) { x = v; return x; }
        get = getter;
        set = setter;
        boom();
    }
    outer();
"#;

fn first_upvalue_is_open(vm: &Vm, global: &str) -> bool {
    let closure = vm.get_global(global).and_then(|v| v.as_object()).unwrap();
    let upvalue = vm.heap().closure(closure).upvalues[0];
    vm.heap().upvalue(upvalue).is_open()
}

#[test]
fn test_error_closes_escaped_upvalues() {
    let mut vm = Vm::default();
    assert_eq!(
        runtime_error(&mut vm, ESCAPING_ACCESSORS),
        RuntimeError::UndefinedVariable("boom".to_string())
    );
    assert!(!first_upvalue_is_open(&vm, "get"));
    assert!(!first_upvalue_is_open(&vm, "set"));

    assert_eq!(vm.interpret("get()").unwrap(), Value::Numeric(41.0));
    // reused stack slots must not alias the closed variable
    assert_eq!(
        vm.interpret("fn h(a, b) { return get(); } h(7, 8)").unwrap(),
        Value::Numeric(41.0)
    );
}

#[test]
fn test_escaped_setter_after_error_is_shared() {
    let mut vm = Vm::new(VmOption::stress());
    runtime_error(&mut vm, ESCAPING_ACCESSORS);

    assert_eq!(vm.interpret("set(10)").unwrap(), Value::Numeric(10.0));
    assert_eq!(vm.interpret("get()").unwrap(), Value::Numeric(10.0));
    assert_eq!(
        vm.interpret("fn h(a, b) { set(a + b); return get(); } h(7, 8)").unwrap(),
        Value::Numeric(15.0)
    );
}

#[test]
fn test_escaped_closure_arithmetic_after_error() {
    let mut vm = Vm::default();
    runtime_error(
        &mut vm,
        "var g; fn outer() { var x = 41; fn inner() { return x + 1; } g = inner; boom(); } outer();",
    );
    assert_eq!(vm.interpret("g()").unwrap(), Value::Numeric(42.0));
}
