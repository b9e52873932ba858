// Expressions, variables and calls
use crate::vm::{OpCode, Vm, VmOption};
use crate::Value;

fn eval(source: &str) -> Value {
    let mut vm = Vm::new(VmOption::default());
    vm.open_libs();
    vm.interpret(source).unwrap()
}

#[test]
fn test_arithmetic_precedence() {
    let mut vm = Vm::new(VmOption::default());
    let function = vm.compile("1 + 2 * 3").unwrap();
    let chunk = &vm.heap().function(function).chunk;
    assert_eq!(
        chunk.opcodes(vm.heap()),
        vec![
            OpCode::Constant,
            OpCode::Constant,
            OpCode::Constant,
            OpCode::Mul,
            OpCode::Add,
            OpCode::Return
        ]
    );
    assert_eq!(&chunk.code[..6], &[0u8, 0, 0, 1, 0, 2]);

    let result = vm.interpret("1 + 2 * 3").unwrap();
    assert_eq!(result, Value::Numeric(7.0));
    assert_eq!(vm.stack_depth(), 0);
    assert_eq!(vm.frame_depth(), 0);
}

#[test]
fn test_grouping_and_negation() {
    assert_eq!(eval("-(1 + 2) * 4"), Value::Numeric(-12.0));
    assert_eq!(eval("10 - 4 - 3"), Value::Numeric(3.0));
    assert_eq!(eval("12 / 3 / 2"), Value::Numeric(2.0));
    assert_eq!(eval("--5"), Value::Numeric(5.0));
}

#[test]
fn test_division_by_zero_is_ieee() {
    assert_eq!(eval("1 / 0"), Value::Numeric(f64::INFINITY));
    assert!(eval("0 / 0").as_numeric().unwrap().is_nan());
}

#[test]
fn test_literals() {
    assert_eq!(eval("nil"), Value::Nil);
    assert_eq!(eval("true"), Value::Boolean(true));
    assert_eq!(eval("false"), Value::Boolean(false));
    assert_eq!(eval("2.5"), Value::Numeric(2.5));
}

#[test]
fn test_unit_result() {
    // statements only: the unit returns nil
    assert_eq!(eval("var x = 1;"), Value::Nil);
    assert_eq!(eval("1;"), Value::Nil);
    assert_eq!(eval("return 5;"), Value::Numeric(5.0));
    assert_eq!(eval(""), Value::Nil);
}

#[test]
fn test_globals_and_block_locals() {
    let result = eval(
        r#"
        var a = 10;
        var b = 4;
        {
            var c = a - b;
            a = c / 2;
        }
        a
        "#,
    );
    assert_eq!(result, Value::Numeric(3.0));
}

#[test]
fn test_global_redefinition_overwrites() {
    assert_eq!(eval("var a = 1; var a = 2; a"), Value::Numeric(2.0));
}

#[test]
fn test_assignment_is_an_expression() {
    assert_eq!(eval("var a; var b; a = b = 3; a + b"), Value::Numeric(6.0));
}

#[test]
fn test_shadowing_in_nested_blocks() {
    let result = eval(
        r#"
        var r = 0;
        {
            var x = 1;
            {
                var x = 2;
                r = r + x;
            }
            r = r + x;
        }
        r
        "#,
    );
    assert_eq!(result, Value::Numeric(3.0));
}

#[test]
fn test_function_calls() {
    assert_eq!(
        eval("fn add(a, b) { return a + b; } add(2, 3)"),
        Value::Numeric(5.0)
    );
    assert_eq!(
        eval(
            "fn f(a, b, c, d, e, g, h, i) { return a + b + c + d + e + g + h + i; } \
             f(1, 2, 3, 4, 5, 6, 7, 8)"
        ),
        Value::Numeric(36.0)
    );
    assert_eq!(eval("fn f() {} f()"), Value::Nil);
    assert_eq!(eval("fn f() { return; } f()"), Value::Nil);
}

#[test]
fn test_call_in_expression() {
    let result = eval(
        r#"
        fn square(x) { return x * x; }
        fn hyp(a, b) { return square(a) + square(b); }
        hyp(3, 4) - 1
        "#,
    );
    assert_eq!(result, Value::Numeric(24.0));
}

#[test]
fn test_strings_and_stringify() {
    let mut vm = Vm::new(VmOption::default());
    vm.open_libs();

    let s = vm.interpret(r#""hello\tworld""#).unwrap();
    assert_eq!(vm.stringify(s), "hello\tworld");
    assert_eq!(vm.type_name(s), "string");

    let f = vm.interpret("fn named() {} named").unwrap();
    assert_eq!(vm.stringify(f), "<fn named>");
    assert_eq!(vm.type_name(f), "function");

    let n = vm.interpret("print").unwrap();
    assert_eq!(vm.stringify(n), "<native fn print>");

    let p = vm.interpret("pair(1, pair(true, nil))").unwrap();
    assert_eq!(vm.stringify(p), "(1, (true, nil))");
}

#[test]
fn test_print_returns_nil() {
    assert_eq!(eval(r#"print("a", 1, nil, true)"#), Value::Nil);
}

#[test]
fn test_truthiness_from_host() {
    let mut vm = Vm::new(VmOption::default());
    let empty = vm.interpret(r#""""#).unwrap();
    assert!(!vm.is_truthy(empty));
    let word = vm.interpret(r#""x""#).unwrap();
    assert!(vm.is_truthy(word));
    assert!(!vm.is_truthy(Value::Numeric(0.0)));
    assert!(vm.is_truthy(Value::Numeric(-1.0)));
}
