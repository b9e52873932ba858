// Host natives and the builtin library
use std::cell::RefCell;
use std::rc::Rc;

use crate::vm::{RuntimeError, Vm, VmError, VmOption};
use crate::Value;

fn capture(vm: &mut Vm) -> Rc<RefCell<Vec<String>>> {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    vm.define_native("emit", move |vm, args| {
        for arg in args {
            sink.borrow_mut().push(vm.stringify(*arg));
        }
        Ok(Value::Nil)
    });
    log
}

#[test]
fn test_native_closure_receives_arguments() {
    let mut vm = Vm::default();
    let log = capture(&mut vm);
    vm.interpret(r#"emit(1); emit("two", nil); emit(true);"#).unwrap();
    assert_eq!(*log.borrow(), vec!["1", "two", "nil", "true"]);
}

#[test]
fn test_counter_emits_sequence() {
    let mut vm = Vm::default();
    let log = capture(&mut vm);
    vm.interpret(
        r#"
        fn make_counter() {
            var count = 0;
            fn counter() {
                count = count + 1;
                return count;
            }
            return counter;
        }
        var c = make_counter();
        emit(c());
        emit(c());
        emit(c());
        "#,
    )
    .unwrap();
    assert_eq!(*log.borrow(), vec!["1", "2", "3"]);
}

#[test]
fn test_native_arguments_stay_rooted() {
    let mut vm = Vm::new(VmOption::stress());
    vm.open_libs();
    vm.define_native("dup", |vm, args| {
        let first = vm.create_string("first");
        vm.set_global("scratch", first);
        Ok(vm.create_pair(args[0], args[0]))
    });
    let result = vm.interpret(r#"var p = dup(concat("a", "b")); first(p)"#).unwrap();
    assert_eq!(vm.stringify(result), "ab");
    assert_eq!(vm.stack_depth(), 0);
}

#[test]
fn test_globals_from_host() {
    let mut vm = Vm::default();
    vm.set_global("answer", Value::Numeric(41.0));
    assert_eq!(vm.interpret("answer + 1").unwrap(), Value::Numeric(42.0));
    assert_eq!(vm.get_global("missing"), None);

    vm.interpret("var from_script = answer * 2;").unwrap();
    assert_eq!(vm.get_global("from_script"), Some(Value::Numeric(82.0)));
}

#[test]
fn test_builtin_type_and_concat() {
    let mut vm = Vm::default();
    vm.open_libs();
    let cases = [
        ("type(1)", "numeric"),
        ("type(nil)", "nil"),
        ("type(true)", "boolean"),
        (r#"type("s")"#, "string"),
        ("type(pair(1, 2))", "pair"),
        ("type(print)", "native"),
        ("fn f() {} type(f)", "function"),
        (r#"concat("n=", 1)"#, "n=1"),
        ("concat(pair(1, 2), nil)", "(1, 2)nil"),
    ];
    for (source, expected) in cases {
        let value = vm.interpret(source).unwrap();
        assert_eq!(vm.stringify(value), expected, "{source}");
    }
}

#[test]
fn test_pair_accessors() {
    let mut vm = Vm::default();
    vm.open_libs();
    let result = vm
        .interpret(
            r#"
            var p = pair(1, 2);
            set_first(p, 10);
            set_second(p, first(p) + second(p));
            second(p)
            "#,
        )
        .unwrap();
    assert_eq!(result, Value::Numeric(12.0));

    let cyclic = vm.interpret("var q = pair(1, nil); set_second(q, q); q").unwrap();
    let text = vm.stringify(cyclic);
    assert!(text.starts_with("(1, (1, (1, "));
    assert!(text.ends_with(&format!("(...){}", ")".repeat(8))));
}

#[test]
fn test_builtin_argument_errors() {
    let mut vm = Vm::default();
    vm.open_libs();
    let error = |vm: &mut Vm, source: &str| match vm.interpret(source) {
        Err(VmError::Runtime { error, .. }) => error,
        other => panic!("expected a runtime error, got {other:?}"),
    };

    assert_eq!(
        error(&mut vm, "pair(1)"),
        RuntimeError::Arity {
            name: "pair".to_string(),
            expected: 2,
            got: 1
        }
    );
    assert_eq!(
        error(&mut vm, "first(1)"),
        RuntimeError::TypeMismatch("bad argument #1 to `first` (pair expected, got numeric)".to_string())
    );
    assert!(matches!(error(&mut vm, "gc_threshold(0)"), RuntimeError::Native(_)));
    assert!(matches!(
        error(&mut vm, r#"gc_threshold("x")"#),
        RuntimeError::TypeMismatch(_)
    ));
}

#[test]
fn test_clocks() {
    let mut vm = Vm::default();
    vm.open_libs();
    assert!(vm.interpret("time()").unwrap().as_numeric().unwrap() > 1.0e9);
    assert!(vm.interpret("clock()").unwrap().as_numeric().unwrap() >= 0.0);
}

#[test]
fn test_exit_requests_stop_without_interrupting() {
    let mut vm = Vm::default();
    vm.open_libs();
    assert!(!vm.exit_requested());
    assert_eq!(vm.interpret("exit(); 1").unwrap(), Value::Numeric(1.0));
    assert!(vm.exit_requested());
}

#[test]
fn test_help_lists_every_builtin() {
    let registry = crate::lib_registry::create_standard_registry();
    let text = crate::stdlib::system::help_text();
    for library in ["basic", "gc", "pair", "system"] {
        let module = registry.get_module(library).unwrap();
        for (name, _) in &module.entries {
            assert!(text.contains(&format!("\n{name}(")), "help() misses {name}");
        }
    }

    let mut vm = Vm::default();
    vm.open_libs();
    assert_eq!(vm.interpret("help()").unwrap(), Value::Nil);
}

#[test]
fn test_open_single_library() {
    let mut vm = Vm::default();
    assert!(vm.open_lib("pair"));
    assert!(!vm.open_lib("missing"));
    assert!(vm.get_global("pair").is_some());
    assert!(vm.get_global("print").is_none());
    assert_eq!(vm.interpret("first(pair(3, 4))").unwrap(), Value::Numeric(3.0));
}
