// Pair library
// Implements: pair, first, second, set_first, set_second

use crate::lib_registry::LibraryModule;
use crate::stdlib::{check_arity, check_pair};
use crate::value::{NativeResult, Value};
use crate::vm::Vm;

pub fn create_pair_lib() -> LibraryModule {
    crate::lib_module!("pair", {
        "pair" => pair_new,
        "first" => pair_first,
        "second" => pair_second,
        "set_first" => pair_set_first,
        "set_second" => pair_set_second,
    })
}

fn pair_new(vm: &mut Vm, args: &[Value]) -> NativeResult {
    check_arity("pair", args, 2)?;
    Ok(vm.create_pair(args[0], args[1]))
}

fn pair_first(vm: &mut Vm, args: &[Value]) -> NativeResult {
    check_arity("first", args, 1)?;
    let r = check_pair(vm, "first", args, 0)?;
    Ok(vm.heap().pair(r).map(|p| p.first).unwrap_or_default())
}

fn pair_second(vm: &mut Vm, args: &[Value]) -> NativeResult {
    check_arity("second", args, 1)?;
    let r = check_pair(vm, "second", args, 0)?;
    Ok(vm.heap().pair(r).map(|p| p.second).unwrap_or_default())
}

/// set_first(p, v) - returns v
fn pair_set_first(vm: &mut Vm, args: &[Value]) -> NativeResult {
    check_arity("set_first", args, 2)?;
    let r = check_pair(vm, "set_first", args, 0)?;
    if let Some(pair) = vm.heap_mut().pair_mut(r) {
        pair.first = args[1];
    }
    Ok(args[1])
}

fn pair_set_second(vm: &mut Vm, args: &[Value]) -> NativeResult {
    check_arity("set_second", args, 2)?;
    let r = check_pair(vm, "set_second", args, 0)?;
    if let Some(pair) = vm.heap_mut().pair_mut(r) {
        pair.second = args[1];
    }
    Ok(args[1])
}
