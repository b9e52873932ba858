// Collector control
// Implements: gc_count, gc_collect, gc_threshold, gc_enable, gc_disable,
// gc_isenabled

use crate::lib_registry::LibraryModule;
use crate::stdlib::{check_arity, check_numeric};
use crate::value::{NativeResult, Value};
use crate::vm::{RuntimeError, Vm};

pub fn create_gc_lib() -> LibraryModule {
    crate::lib_module!("gc", {
        "gc_count" => gc_count,
        "gc_collect" => gc_collect,
        "gc_threshold" => gc_threshold,
        "gc_enable" => gc_enable,
        "gc_disable" => gc_disable,
        "gc_isenabled" => gc_isenabled,
    })
}

/// gc_count() - number of live heap objects
fn gc_count(vm: &mut Vm, args: &[Value]) -> NativeResult {
    check_arity("gc_count", args, 0)?;
    Ok(Value::Numeric(vm.heap().object_count() as f64))
}

/// gc_collect() - full collection, returns the number of objects freed
fn gc_collect(vm: &mut Vm, args: &[Value]) -> NativeResult {
    check_arity("gc_collect", args, 0)?;
    Ok(Value::Numeric(vm.collect_garbage() as f64))
}

/// gc_threshold([n]) - current threshold, after optionally setting it
fn gc_threshold(vm: &mut Vm, args: &[Value]) -> NativeResult {
    if args.len() > 1 {
        return Err(RuntimeError::Arity {
            name: "gc_threshold".to_string(),
            expected: 1,
            got: args.len(),
        });
    }
    if !args.is_empty() {
        let n = check_numeric(vm, "gc_threshold", args, 0)?;
        if n.is_nan() || n < 1.0 {
            return Err(RuntimeError::Native(format!(
                "gc_threshold: threshold must be at least 1, got {n}"
            )));
        }
        vm.heap_mut().set_threshold(n as usize);
    }
    Ok(Value::Numeric(vm.heap().threshold() as f64))
}

fn gc_enable(vm: &mut Vm, args: &[Value]) -> NativeResult {
    check_arity("gc_enable", args, 0)?;
    vm.heap_mut().set_enabled(true);
    Ok(Value::Nil)
}

fn gc_disable(vm: &mut Vm, args: &[Value]) -> NativeResult {
    check_arity("gc_disable", args, 0)?;
    vm.heap_mut().set_enabled(false);
    Ok(Value::Nil)
}

fn gc_isenabled(vm: &mut Vm, args: &[Value]) -> NativeResult {
    check_arity("gc_isenabled", args, 0)?;
    Ok(Value::Boolean(vm.heap().is_enabled()))
}
