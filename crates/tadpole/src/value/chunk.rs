use std::fmt::Write;

use crate::gc::{GcObject, Heap};
use crate::value::Value;
use crate::vm::OpCode;

/// Bytecode for one function: instructions, the source line of every
/// byte, and the constant pool.
#[derive(Debug, Clone, Default)]
pub struct Chunk {
    pub code: Vec<u8>,
    pub lines: Vec<u32>,
    pub constants: Vec<Value>,
}

impl Chunk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write(&mut self, byte: u8, line: u32) {
        self.code.push(byte);
        self.lines.push(line);
    }

    pub fn write_op(&mut self, op: OpCode, line: u32) {
        self.write(op as u8, line);
    }

    /// Index of `value` in the pool, appending it if it is not there yet
    pub fn add_constant(&mut self, value: Value) -> usize {
        if let Some(index) = self.constants.iter().position(|c| c.same_constant(&value)) {
            return index;
        }
        self.constants.push(value);
        self.constants.len() - 1
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.code.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    #[inline]
    pub fn line(&self, offset: usize) -> u32 {
        self.lines.get(offset).copied().unwrap_or(0)
    }

    /// Opcodes of the chunk in order, skipping operands
    pub fn opcodes(&self, heap: &Heap) -> Vec<OpCode> {
        let mut ops = Vec::new();
        let mut offset = 0;
        while offset < self.code.len() {
            let Some(op) = OpCode::from_byte(self.code[offset]) else {
                break;
            };
            ops.push(op);
            offset = self.next_offset(offset, op, heap);
        }
        ops
    }

    fn next_offset(&self, offset: usize, op: OpCode, heap: &Heap) -> usize {
        let mut next = offset + 1 + op.operand_count();
        if op == OpCode::Closure {
            next += 2 * self.closure_upvalue_count(offset, heap);
        }
        next
    }

    fn closure_upvalue_count(&self, offset: usize, heap: &Heap) -> usize {
        let constant = self.code.get(offset + 1).map(|&i| self.constants.get(i as usize));
        match constant {
            Some(Some(Value::Object(r))) => match heap.get(*r) {
                GcObject::Function(f) => f.upvalue_count,
                _ => 0,
            },
            _ => 0,
        }
    }

    // ============ Disassembler ============

    pub fn disassemble(&self, name: &str, heap: &Heap) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "== {name} ==");
        let mut offset = 0;
        while offset < self.code.len() {
            let (text, next) = self.disassemble_instruction(offset, heap);
            out.push_str(&text);
            out.push('\n');
            offset = next;
        }
        out
    }

    /// One instruction as text, plus the offset of the next instruction
    pub fn disassemble_instruction(&self, offset: usize, heap: &Heap) -> (String, usize) {
        let mut out = String::new();
        let _ = write!(out, "{offset:04} ");
        if offset > 0 && self.line(offset) == self.line(offset - 1) {
            out.push_str("   | ");
        } else {
            let _ = write!(out, "{:4} ", self.line(offset));
        }

        let byte = self.code[offset];
        let Some(op) = OpCode::from_byte(byte) else {
            let _ = write!(out, "<invalid opcode {byte}>");
            return (out, offset + 1);
        };

        match op {
            OpCode::Constant | OpCode::DefGlobal | OpCode::GetGlobal | OpCode::SetGlobal => {
                let index = self.operand(offset);
                let _ = write!(out, "{:<16} {:4} '{}'", op.name(), index, self.constant_text(index, heap));
            }
            OpCode::GetLocal | OpCode::SetLocal | OpCode::GetUpvalue | OpCode::SetUpvalue => {
                let _ = write!(out, "{:<16} {:4}", op.name(), self.operand(offset));
            }
            OpCode::Closure => {
                let index = self.operand(offset);
                let _ = write!(out, "{:<16} {:4} {}", op.name(), index, self.constant_text(index, heap));
                let mut cursor = offset + 2;
                for _ in 0..self.closure_upvalue_count(offset, heap) {
                    let is_local = self.code.get(cursor).copied().unwrap_or(0) != 0;
                    let slot = self.code.get(cursor + 1).copied().unwrap_or(0);
                    let kind = if is_local { "local" } else { "upvalue" };
                    let _ = write!(out, "\n{cursor:04}    |                     {kind} {slot}");
                    cursor += 2;
                }
            }
            _ => out.push_str(op.name()),
        }
        (out, self.next_offset(offset, op, heap))
    }

    fn operand(&self, offset: usize) -> usize {
        self.code.get(offset + 1).copied().unwrap_or(0) as usize
    }

    fn constant_text(&self, index: usize, heap: &Heap) -> String {
        match self.constants.get(index) {
            Some(value) => value.stringify(heap),
            None => "<out of range>".to_string(),
        }
    }
}
