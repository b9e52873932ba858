// Dispatch loop
//
// Every instruction is one byte followed by its operands. The loop runs
// until the outermost frame returns; errors propagate out with the frame
// stack left intact so the caller can build a traceback.

mod call;
mod upvalue;

use log::{log_enabled, trace, Level};

use crate::gc::{GcObject, GcRef};
use crate::value::{Closure, Value};
use crate::vm::{CallFrame, OpCode, RuntimeError, Vm};

impl Vm {
    pub(crate) fn run(&mut self) -> Result<Value, RuntimeError> {
        loop {
            if log_enabled!(Level::Trace) {
                self.trace_execution();
            }

            let byte = self.read_byte();
            let op = OpCode::from_byte(byte).ok_or(RuntimeError::InvalidOpcode(byte))?;
            match op {
                OpCode::Constant => {
                    let value = self.read_constant();
                    self.push(value);
                }
                OpCode::Nil => self.push(Value::Nil),
                OpCode::True => self.push(Value::Boolean(true)),
                OpCode::False => self.push(Value::Boolean(false)),
                OpCode::Pop => {
                    self.pop();
                }
                OpCode::DefGlobal => {
                    let name = self.read_name();
                    let value = self.peek(0);
                    self.globals.insert(name, value);
                    self.pop();
                }
                OpCode::GetGlobal => {
                    let name = self.read_name();
                    match self.globals.get(&name) {
                        Some(&value) => self.push(value),
                        None => return Err(self.undefined_variable(name)),
                    }
                }
                OpCode::SetGlobal => {
                    let name = self.read_name();
                    let value = self.peek(0);
                    match self.globals.get_mut(&name) {
                        Some(slot) => *slot = value,
                        None => return Err(self.undefined_variable(name)),
                    }
                }
                OpCode::GetLocal => {
                    let slot = self.read_byte() as usize + self.frame().base;
                    let value = self.stack[slot];
                    self.push(value);
                }
                OpCode::SetLocal => {
                    let slot = self.read_byte() as usize + self.frame().base;
                    let value = self.peek(0);
                    self.stack[slot] = value;
                }
                OpCode::GetUpvalue => {
                    let index = self.read_byte() as usize;
                    let upvalue = self.frame_upvalue(index);
                    let value = self.read_upvalue(upvalue);
                    self.push(value);
                }
                OpCode::SetUpvalue => {
                    let index = self.read_byte() as usize;
                    let upvalue = self.frame_upvalue(index);
                    let value = self.peek(0);
                    self.write_upvalue(upvalue, value);
                }
                OpCode::Add | OpCode::Sub | OpCode::Mul | OpCode::Div => {
                    self.binary_arithmetic(op)?;
                }
                OpCode::Negate => match self.peek(0) {
                    Value::Numeric(n) => self.set_top(Value::Numeric(-n)),
                    other => {
                        return Err(RuntimeError::TypeMismatch(format!(
                            "operand of `-` must be numeric, got `{}`",
                            self.type_name(other)
                        )));
                    }
                },
                OpCode::Call0
                | OpCode::Call1
                | OpCode::Call2
                | OpCode::Call3
                | OpCode::Call4
                | OpCode::Call5
                | OpCode::Call6
                | OpCode::Call7
                | OpCode::Call8 => {
                    let argc = (op as u8 - OpCode::Call0 as u8) as usize;
                    let callee = self.peek(argc);
                    self.call_value(callee, argc)?;
                }
                OpCode::Closure => self.make_closure(),
                OpCode::CloseUpvalue => {
                    let top = self.stack.len() - 1;
                    self.close_upvalues(top);
                    self.pop();
                }
                OpCode::Return => {
                    let result = self.pop();
                    if let Some(value) = self.return_from_frame(result) {
                        return Ok(value);
                    }
                }
            }
        }
    }

    fn binary_arithmetic(&mut self, op: OpCode) -> Result<(), RuntimeError> {
        let (Value::Numeric(a), Value::Numeric(b)) = (self.peek(1), self.peek(0)) else {
            return Err(RuntimeError::TypeMismatch(format!(
                "operands of `{}` must be numerics, got `{}` and `{}`",
                arithmetic_symbol(op),
                self.type_name(self.peek(1)),
                self.type_name(self.peek(0)),
            )));
        };

        let result = match op {
            OpCode::Add => a + b,
            OpCode::Sub => a - b,
            OpCode::Mul => a * b,
            OpCode::Div => a / b,
            _ => unreachable!("{op} is not arithmetic"),
        };
        self.pop();
        self.set_top(Value::Numeric(result));
        Ok(())
    }

    fn make_closure(&mut self) {
        let function = match self.read_constant() {
            Value::Object(r) => r,
            other => unreachable!("CLOSURE operand is {other:?}"),
        };

        let count = self.heap.function(function).upvalue_count;
        let mut upvalues = Vec::with_capacity(count);
        for _ in 0..count {
            let is_local = self.read_byte() != 0;
            let index = self.read_byte() as usize;
            let upvalue = if is_local {
                let slot = self.frame().base + index;
                self.capture_upvalue(slot)
            } else {
                self.frame_upvalue(index)
            };
            upvalues.push(upvalue);
        }

        let closure = self.alloc(GcObject::Closure(Closure::new(function, upvalues)));
        self.push(Value::Object(closure));
    }

    /// Pop the current frame, leaving `result` in place of the callee.
    /// Returns the result if that was the outermost frame.
    fn return_from_frame(&mut self, result: Value) -> Option<Value> {
        let base = self.frame().base;
        self.close_upvalues(base);
        self.frames.pop();
        self.stack.truncate(base.saturating_sub(1));

        if self.frames.is_empty() {
            return Some(result);
        }
        self.push(result);
        None
    }

    fn undefined_variable(&self, name: GcRef) -> RuntimeError {
        RuntimeError::UndefinedVariable(self.heap.as_str(name).to_string())
    }

    // ============ Frame & Stack Access ============

    #[inline(always)]
    fn frame(&self) -> &CallFrame {
        match self.frames.last() {
            Some(frame) => frame,
            None => unreachable!("no active call frame"),
        }
    }

    #[inline(always)]
    fn read_byte(&mut self) -> u8 {
        let Some(frame) = self.frames.last_mut() else {
            unreachable!("no active call frame");
        };
        let byte = frame.chunk.code[frame.ip];
        frame.ip += 1;
        byte
    }

    #[inline(always)]
    fn read_constant(&mut self) -> Value {
        let index = self.read_byte() as usize;
        self.frame().chunk.constants[index]
    }

    #[inline(always)]
    fn read_name(&mut self) -> GcRef {
        match self.read_constant() {
            Value::Object(r) => r,
            other => unreachable!("global name operand is {other:?}"),
        }
    }

    #[inline(always)]
    pub(crate) fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    #[inline(always)]
    pub(crate) fn pop(&mut self) -> Value {
        match self.stack.pop() {
            Some(value) => value,
            None => unreachable!("value stack underflow"),
        }
    }

    #[inline(always)]
    pub(crate) fn peek(&self, distance: usize) -> Value {
        self.stack[self.stack.len() - 1 - distance]
    }

    #[inline(always)]
    fn set_top(&mut self, value: Value) {
        if let Some(top) = self.stack.last_mut() {
            *top = value;
        }
    }

    fn trace_execution(&self) {
        let frame = self.frame();
        let mut stack = String::new();
        for value in &self.stack {
            stack.push_str("[ ");
            stack.push_str(&self.stringify(*value));
            stack.push_str(" ]");
        }
        trace!("          {stack}");
        let (text, _) = frame.chunk.disassemble_instruction(frame.ip, &self.heap);
        trace!("{text}");
    }
}

fn arithmetic_symbol(op: OpCode) -> &'static str {
    match op {
        OpCode::Add => "+",
        OpCode::Sub => "-",
        OpCode::Mul => "*",
        OpCode::Div => "/",
        _ => "?",
    }
}
