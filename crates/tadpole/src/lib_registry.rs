// Library registration system for Tadpole builtins
// Every entry becomes a global native function; module names only group
// entries for selective loading

use log::debug;

use crate::stdlib;
use crate::value::{NativeResult, Value};
use crate::vm::Vm;

/// Signature of a builtin native
pub type NativeFunction = fn(&mut Vm, &[Value]) -> NativeResult;

/// A named group of builtins
pub struct LibraryModule {
    pub name: &'static str,
    pub entries: Vec<(&'static str, NativeFunction)>,
}

impl LibraryModule {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: Vec::new(),
        }
    }

    pub fn with_function(mut self, name: &'static str, func: NativeFunction) -> Self {
        self.entries.push((name, func));
        self
    }
}

/// Builder for creating library modules
#[macro_export]
macro_rules! lib_module {
    ($name:expr, {
        $($item_name:expr => $item:expr),* $(,)?
    }) => {{
        let mut module = $crate::lib_registry::LibraryModule::new($name);
        $(
            module.entries.push(($item_name, $item as $crate::lib_registry::NativeFunction));
        )*
        module
    }};
}

/// Registry for the builtin libraries
pub struct LibraryRegistry {
    modules: Vec<LibraryModule>, // Vec keeps registration order
}

impl LibraryRegistry {
    pub fn new() -> Self {
        Self {
            modules: Vec::new(),
        }
    }

    pub fn register(&mut self, module: LibraryModule) {
        self.modules.push(module);
    }

    /// Load all registered libraries into a VM
    pub fn load_all(&self, vm: &mut Vm) {
        for module in &self.modules {
            self.load_module(vm, module);
        }
    }

    pub fn load_module(&self, vm: &mut Vm, module: &LibraryModule) {
        for &(name, func) in &module.entries {
            vm.define_native(name, func);
        }
        debug!("loaded library `{}` ({} natives)", module.name, module.entries.len());
    }

    pub fn get_module(&self, name: &str) -> Option<&LibraryModule> {
        self.modules.iter().find(|m| m.name == name)
    }
}

impl Default for LibraryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry holding every builtin library
pub fn create_standard_registry() -> LibraryRegistry {
    let mut registry = LibraryRegistry::new();
    registry.register(stdlib::basic::create_basic_lib());
    registry.register(stdlib::gc::create_gc_lib());
    registry.register(stdlib::pair::create_pair_lib());
    registry.register(stdlib::system::create_system_lib());
    registry
}
