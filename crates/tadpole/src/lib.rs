// Tadpole Runtime
// A small bytecode VM with closures and an integrated mark & sweep GC

#[cfg(test)]
mod test;

pub mod compiler;
pub mod gc;
pub mod lib_registry;
pub mod stdlib;
pub mod value;
pub mod vm;

pub use compiler::{CompileError, Diagnostic};
pub use gc::{GcConfig, GcObject, GcRef, GcRoots, GcStats, Heap, NoRoots, ObjType};
pub use lib_registry::LibraryRegistry;
pub use value::{Chunk, NativeResult, Value};
pub use vm::{OpCode, RuntimeError, TraceFrame, Vm, VmError, VmOption, VmResult};
