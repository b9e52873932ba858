use std::rc::Rc;

use crate::gc::{GcObject, GcRef};
use crate::value::{NativeFn, Value};
use crate::vm::{CallFrame, RuntimeError, Vm};

impl Vm {
    /// Dispatch a call to whatever sits `argc` slots below the stack top
    pub(crate) fn call_value(&mut self, callee: Value, argc: usize) -> Result<(), RuntimeError> {
        let Value::Object(r) = callee else {
            return Err(RuntimeError::NotCallable(self.type_name(callee)));
        };

        match self.heap.get(r) {
            GcObject::Closure(_) => self.call_closure(r, argc),
            GcObject::Native(native) => {
                let function = Rc::clone(&native.function);
                self.call_native(function, argc)
            }
            GcObject::String(_)
            | GcObject::Function(_)
            | GcObject::Upvalue(_)
            | GcObject::Pair(_) => Err(RuntimeError::NotCallable(self.heap.kind(r).name())),
        }
    }

    /// Push a frame for `closure`; its `argc` arguments are already on the
    /// stack and become local slots `0..argc`
    pub(crate) fn call_closure(&mut self, closure: GcRef, argc: usize) -> Result<(), RuntimeError> {
        let function = self.heap.closure(closure).function;
        let proto = self.heap.function(function);
        if argc != proto.arity as usize {
            return Err(RuntimeError::Arity {
                name: self.function_name(function),
                expected: proto.arity,
                got: argc,
            });
        }
        if self.frames.len() >= self.option.max_call_depth {
            return Err(RuntimeError::StackOverflow {
                depth: self.frames.len(),
            });
        }

        let chunk = Rc::clone(&proto.chunk);
        let base = self.stack.len() - argc;
        self.frames.push(CallFrame::new(closure, chunk, base));
        Ok(())
    }

    fn call_native(&mut self, function: NativeFn, argc: usize) -> Result<(), RuntimeError> {
        let args_start = self.stack.len() - argc;
        let args = self.stack[args_start..].to_vec();

        let result = function(self, &args)?;

        self.stack.truncate(args_start - 1);
        self.push(result);
        Ok(())
    }
}
