// Tadpole builtin libraries

pub mod basic;
pub mod gc;
pub mod pair;
pub mod system;

use crate::gc::GcRef;
use crate::value::Value;
use crate::vm::{RuntimeError, Vm};

/// Fail unless exactly `expected` arguments were passed
pub(crate) fn check_arity(name: &str, args: &[Value], expected: u8) -> Result<(), RuntimeError> {
    if args.len() != expected as usize {
        return Err(RuntimeError::Arity {
            name: name.to_string(),
            expected,
            got: args.len(),
        });
    }
    Ok(())
}

pub(crate) fn check_numeric(
    vm: &Vm,
    name: &str,
    args: &[Value],
    index: usize,
) -> Result<f64, RuntimeError> {
    match args.get(index) {
        Some(Value::Numeric(n)) => Ok(*n),
        Some(other) => Err(RuntimeError::TypeMismatch(format!(
            "bad argument #{} to `{}` (numeric expected, got {})",
            index + 1,
            name,
            vm.type_name(*other)
        ))),
        None => Err(RuntimeError::TypeMismatch(format!(
            "bad argument #{} to `{}` (numeric expected, got no value)",
            index + 1,
            name
        ))),
    }
}

pub(crate) fn check_pair(
    vm: &Vm,
    name: &str,
    args: &[Value],
    index: usize,
) -> Result<GcRef, RuntimeError> {
    let value = args.get(index).copied().unwrap_or_default();
    if let Value::Object(r) = value {
        if vm.heap().pair(r).is_some() {
            return Ok(r);
        }
    }
    Err(RuntimeError::TypeMismatch(format!(
        "bad argument #{} to `{}` (pair expected, got {})",
        index + 1,
        name,
        vm.type_name(value)
    )))
}
