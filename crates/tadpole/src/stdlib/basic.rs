// Basic library
// Implements: print, time, clock, concat, type

use chrono::Utc;

use crate::lib_registry::LibraryModule;
use crate::stdlib::check_arity;
use crate::value::{NativeResult, Value};
use crate::vm::Vm;

pub fn create_basic_lib() -> LibraryModule {
    crate::lib_module!("basic", {
        "print" => tadpole_print,
        "time" => tadpole_time,
        "clock" => tadpole_clock,
        "concat" => tadpole_concat,
        "type" => tadpole_type,
    })
}

/// print(...) - stringified arguments separated by spaces
fn tadpole_print(vm: &mut Vm, args: &[Value]) -> NativeResult {
    let line = args
        .iter()
        .map(|v| vm.stringify(*v))
        .collect::<Vec<_>>()
        .join(" ");
    println!("{line}");
    Ok(Value::Nil)
}

/// time() - seconds since the Unix epoch
fn tadpole_time(_vm: &mut Vm, args: &[Value]) -> NativeResult {
    check_arity("time", args, 0)?;
    let millis = Utc::now().timestamp_millis();
    Ok(Value::Numeric(millis as f64 / 1000.0))
}

/// clock() - seconds since the VM started
fn tadpole_clock(vm: &mut Vm, args: &[Value]) -> NativeResult {
    check_arity("clock", args, 0)?;
    Ok(Value::Numeric(vm.uptime().as_secs_f64()))
}

fn tadpole_concat(vm: &mut Vm, args: &[Value]) -> NativeResult {
    check_arity("concat", args, 2)?;
    let mut text = vm.stringify(args[0]);
    text.push_str(&vm.stringify(args[1]));
    Ok(vm.create_string(&text))
}

fn tadpole_type(vm: &mut Vm, args: &[Value]) -> NativeResult {
    check_arity("type", args, 1)?;
    let name = vm.type_name(args[0]);
    Ok(vm.create_string(name))
}
