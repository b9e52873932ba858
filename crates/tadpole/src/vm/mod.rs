// Tadpole Virtual Machine
// Stack-based bytecode interpreter with an integrated mark & sweep heap

mod call_frame;
mod execute;
mod opcode;
mod vm_error;
pub mod vm_limits;
mod vm_option;

pub use call_frame::CallFrame;
pub use opcode::OpCode;
pub use vm_error::{RuntimeError, TraceFrame, VmError, VmResult};
pub use vm_option::VmOption;

use ahash::RandomState;
use log::debug;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::compiler::{self, CompileError};
use crate::gc::{GcObject, GcRef, GcRoots, GcStats, Heap};
use crate::lib_registry;
use crate::value::{Closure, Native, NativeResult, Pair, Value};
use vm_limits::BASIC_STACK_SIZE;

/// Global variable table, keyed by interned name
pub type Globals = HashMap<GcRef, Value, RandomState>;

pub struct Vm {
    pub(crate) heap: Heap,
    pub(crate) stack: Vec<Value>,
    pub(crate) frames: Vec<CallFrame>,
    pub(crate) globals: Globals,
    /// Open upvalues ordered by stack slot, highest first
    pub(crate) open_upvalues: Vec<GcRef>,
    /// Objects created by an in-progress compilation
    pub(crate) compiler_roots: Vec<Value>,
    option: VmOption,
    started_at: Instant,
    exit_requested: bool,
}

/// Borrowed view of everything the VM keeps alive.
struct VmRoots<'a> {
    stack: &'a [Value],
    frames: &'a [CallFrame],
    globals: &'a Globals,
    open_upvalues: &'a [GcRef],
    compiler_roots: &'a [Value],
}

impl GcRoots for VmRoots<'_> {
    fn mark_roots(&self, heap: &mut Heap) {
        for value in self.stack {
            heap.mark_value(*value);
        }
        for frame in self.frames {
            heap.mark_object(frame.closure);
        }
        for (name, value) in self.globals {
            heap.mark_object(*name);
            heap.mark_value(*value);
        }
        for upvalue in self.open_upvalues {
            heap.mark_object(*upvalue);
        }
        for value in self.compiler_roots {
            heap.mark_value(*value);
        }
    }
}

macro_rules! vm_roots {
    ($vm:expr) => {
        VmRoots {
            stack: &$vm.stack,
            frames: &$vm.frames,
            globals: &$vm.globals,
            open_upvalues: &$vm.open_upvalues,
            compiler_roots: &$vm.compiler_roots,
        }
    };
}

impl Vm {
    pub fn new(option: VmOption) -> Self {
        Vm {
            heap: Heap::new(option.gc.clone()),
            stack: Vec::with_capacity(BASIC_STACK_SIZE),
            frames: Vec::with_capacity(option.max_call_depth.min(BASIC_STACK_SIZE)),
            globals: Globals::default(),
            open_upvalues: Vec::new(),
            compiler_roots: Vec::new(),
            option,
            started_at: Instant::now(),
            exit_requested: false,
        }
    }

    /// Register every standard library native as a global
    pub fn open_libs(&mut self) {
        lib_registry::create_standard_registry().load_all(self);
    }

    /// Register one standard library by name. Returns false if there is no
    /// such library.
    pub fn open_lib(&mut self, name: &str) -> bool {
        let registry = lib_registry::create_standard_registry();
        match registry.get_module(name) {
            Some(module) => {
                registry.load_module(self, module);
                true
            }
            None => false,
        }
    }

    pub fn option(&self) -> &VmOption {
        &self.option
    }

    // ============ Execution ============

    /// Compile and run `source` as a top-level script.
    ///
    /// The script's value is whatever its final `return` (or trailing
    /// expression) produced. After an error the stack and frames are reset;
    /// globals persist, so the VM can be used again. Natives may not call
    /// back into `interpret`.
    pub fn interpret(&mut self, source: &str) -> VmResult<Value> {
        if !self.frames.is_empty() {
            return Err(VmError::Runtime {
                error: RuntimeError::Native("cannot interpret while a script is running".to_string()),
                traceback: Vec::new(),
            });
        }

        let function = self.compile(source)?;

        self.stack.push(Value::Object(function));
        let closure = self.alloc(GcObject::Closure(Closure::new(function, Vec::new())));
        self.stack.pop();
        self.stack.push(Value::Object(closure));

        let result = self.call_closure(closure, 0).and_then(|()| self.run());
        result.map_err(|error| {
            let traceback = self.traceback();
            debug!("runtime error: {error}");
            self.reset();
            VmError::Runtime { error, traceback }
        })
    }

    /// Compile `source` to its top-level function without running it
    pub fn compile(&mut self, source: &str) -> Result<GcRef, CompileError> {
        let result = compiler::compile(self, source);
        self.compiler_roots.clear();
        if let Err(e) = &result {
            debug!("compile failed with {} diagnostics", e.diagnostics.len());
        }
        result
    }

    /// Drop all execution state. Open upvalues are closed over their
    /// current values first, so closures that escaped keep working.
    pub fn reset(&mut self) {
        self.close_upvalues(0);
        self.stack.clear();
        self.frames.clear();
        self.open_upvalues.clear();
    }

    fn traceback(&self) -> Vec<TraceFrame> {
        self.frames
            .iter()
            .rev()
            .map(|frame| TraceFrame {
                function: self.function_name(self.heap.closure(frame.closure).function),
                line: frame.current_line(),
            })
            .collect()
    }

    pub(crate) fn function_name(&self, function: GcRef) -> String {
        match self.heap.function(function).name {
            Some(name) => self.heap.as_str(name).to_string(),
            None => "script".to_string(),
        }
    }

    // ============ Allocation ============

    /// Allocate an object, collecting first if the threshold was reached.
    ///
    /// Anything the new object refers to must already be reachable from
    /// a VM root.
    pub(crate) fn alloc(&mut self, object: GcObject) -> GcRef {
        self.heap.alloc(object, &vm_roots!(self))
    }

    pub(crate) fn intern(&mut self, s: &str) -> GcRef {
        self.heap.intern(s, &vm_roots!(self))
    }

    /// Intern `s` and keep it alive until compilation ends
    pub(crate) fn compiler_string(&mut self, s: &str) -> GcRef {
        let r = self.intern(s);
        self.compiler_roots.push(Value::Object(r));
        r
    }

    pub(crate) fn compiler_object(&mut self, object: GcObject) -> GcRef {
        let r = self.alloc(object);
        self.compiler_roots.push(Value::Object(r));
        r
    }

    /// Full collection now. Returns the number of objects freed.
    pub fn collect_garbage(&mut self) -> usize {
        self.heap.collect(&vm_roots!(self))
    }

    // ============ Host API ============

    /// New interned string. Not rooted: store it somewhere reachable
    /// before the next allocation.
    pub fn create_string(&mut self, s: &str) -> Value {
        Value::Object(self.intern(s))
    }

    /// New pair. Same rooting caveat as `create_string`.
    pub fn create_pair(&mut self, first: Value, second: Value) -> Value {
        let mark = self.stack.len();
        self.stack.push(first);
        self.stack.push(second);
        let r = self.alloc(GcObject::Pair(Pair::new(first, second)));
        self.stack.truncate(mark);
        Value::Object(r)
    }

    /// Expose a host function as a global.
    ///
    /// A native that allocates more than once must keep its intermediate
    /// objects reachable (for example through a global) between the
    /// allocations.
    pub fn define_native<F>(&mut self, name: &str, function: F)
    where
        F: Fn(&mut Vm, &[Value]) -> NativeResult + 'static,
    {
        let name_ref = self.intern(name);
        self.stack.push(Value::Object(name_ref));
        let native = self.alloc(GcObject::Native(Native {
            name: name.into(),
            function: Rc::new(function),
        }));
        self.stack.pop();
        self.globals.insert(name_ref, Value::Object(native));
    }

    pub fn get_global(&self, name: &str) -> Option<Value> {
        let name_ref = self.heap.find_interned(name)?;
        self.globals.get(&name_ref).copied()
    }

    pub fn set_global(&mut self, name: &str, value: Value) {
        self.stack.push(value);
        let name_ref = self.intern(name);
        self.stack.pop();
        self.globals.insert(name_ref, value);
    }

    pub fn stringify(&self, value: Value) -> String {
        value.stringify(&self.heap)
    }

    pub fn values_equal(&self, a: Value, b: Value) -> bool {
        a.equals(&b, &self.heap)
    }

    pub fn is_truthy(&self, value: Value) -> bool {
        value.is_truthy(&self.heap)
    }

    pub fn type_name(&self, value: Value) -> &'static str {
        value.type_name(&self.heap)
    }

    /// String contents, if `value` is a string
    pub fn as_str(&self, value: Value) -> Option<&str> {
        match value {
            Value::Object(r) => match self.heap.get(r) {
                GcObject::String(s) => Some(s.as_str()),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }

    pub fn gc_stats(&self) -> GcStats {
        self.heap.stats()
    }

    /// Ask the host to stop feeding source to this VM (`exit()`). The
    /// running script is not interrupted.
    pub fn request_exit(&mut self) {
        self.exit_requested = true;
    }

    pub fn exit_requested(&self) -> bool {
        self.exit_requested
    }

    /// Time since the VM was created
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    pub fn frame_depth(&self) -> usize {
        self.frames.len()
    }

    /// Disassembly of `function` followed by every function nested in it
    pub fn disassemble(&self, function: GcRef) -> String {
        let mut out = String::new();
        let mut pending = vec![function];
        while let Some(f) = pending.pop() {
            let proto = self.heap.function(f);
            out.push_str(&proto.chunk.disassemble(&self.function_name(f), &self.heap));
            for constant in proto.chunk.constants.iter().rev() {
                if let Value::Object(r) = constant {
                    if matches!(self.heap.get(*r), GcObject::Function(_)) {
                        pending.push(*r);
                    }
                }
            }
        }
        out
    }
}

impl Default for Vm {
    fn default() -> Self {
        Vm::new(VmOption::default())
    }
}
