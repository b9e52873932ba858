// System library
// Implements: help, exit

use crate::lib_registry::LibraryModule;
use crate::stdlib::check_arity;
use crate::value::{NativeResult, Value};
use crate::vm::Vm;

/// One line per builtin, in `help()` order
pub const HELP_ENTRIES: &[(&str, &str)] = &[
    ("help()", "Print this list"),
    ("print(...)", "Print the values separated by spaces"),
    ("exit()", "Exit the Tadpole terminal"),
    ("time()", "Current time in seconds since the Epoch"),
    ("clock()", "Seconds since the VM started"),
    ("concat(a, b)", "String made of both values"),
    ("type(v)", "Type name of a value"),
    ("gc_count()", "Number of objects tracked by the collector"),
    ("gc_collect()", "Run a full collection, return the number freed"),
    ("gc_threshold()", "Current collection threshold"),
    ("gc_threshold(n)", "Set the collection threshold"),
    ("gc_isenabled()", "True if automatic collection is enabled"),
    ("gc_enable()", "Enable automatic collection"),
    ("gc_disable()", "Disable automatic collection"),
    ("pair(a, b)", "New pair"),
    ("first(p)", "First field of a pair"),
    ("second(p)", "Second field of a pair"),
    ("set_first(p, v)", "Replace the first field, return v"),
    ("set_second(p, v)", "Replace the second field, return v"),
];

pub fn create_system_lib() -> LibraryModule {
    LibraryModule::new("system")
        .with_function("help", tadpole_help)
        .with_function("exit", tadpole_exit)
}

pub fn help_text() -> String {
    let mut text = String::from("Welcome To Tadpole! This is the help utility.\n\n");
    for (call, description) in HELP_ENTRIES {
        text.push_str(&format!("{call:<18}{description}\n"));
    }
    text
}

fn tadpole_help(_vm: &mut Vm, args: &[Value]) -> NativeResult {
    check_arity("help", args, 0)?;
    print!("{}", help_text());
    Ok(Value::Nil)
}

/// exit() - flag the VM; the host stops after the current unit
fn tadpole_exit(vm: &mut Vm, args: &[Value]) -> NativeResult {
    check_arity("exit", args, 0)?;
    vm.request_exit();
    Ok(Value::Nil)
}
