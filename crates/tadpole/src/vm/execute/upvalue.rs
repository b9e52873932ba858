use crate::gc::{GcObject, GcRef};
use crate::value::{Upvalue, Value};
use crate::vm::Vm;

impl Vm {
    /// The open upvalue for stack `slot`, created on first capture. Two
    /// closures capturing the same variable share one upvalue.
    pub(crate) fn capture_upvalue(&mut self, slot: usize) -> GcRef {
        let position = self
            .open_upvalues
            .iter()
            .position(|&r| self.open_slot(r) <= slot);

        if let Some(i) = position {
            let existing = self.open_upvalues[i];
            if self.open_slot(existing) == slot {
                return existing;
            }
        }

        let upvalue = self.alloc(GcObject::Upvalue(Upvalue::Open(slot)));
        let at = position.unwrap_or(self.open_upvalues.len());
        self.open_upvalues.insert(at, upvalue);
        upvalue
    }

    /// Close every open upvalue at or above stack index `level`
    pub(crate) fn close_upvalues(&mut self, level: usize) {
        let count = self
            .open_upvalues
            .iter()
            .take_while(|&&r| self.open_slot(r) >= level)
            .count();

        for r in self.open_upvalues.drain(..count) {
            if let Some(slot) = self.heap.upvalue(r).stack_slot() {
                let value = self.stack[slot];
                self.heap.upvalue_mut(r).close(value);
            }
        }
    }

    fn open_slot(&self, r: GcRef) -> usize {
        match self.heap.upvalue(r) {
            Upvalue::Open(slot) => *slot,
            Upvalue::Closed(_) => unreachable!("closed upvalue {r} in the open list"),
        }
    }

    /// Upvalue `index` of the running closure
    pub(crate) fn frame_upvalue(&self, index: usize) -> GcRef {
        let closure = self.frame().closure;
        self.heap.closure(closure).upvalues[index]
    }

    pub(crate) fn read_upvalue(&self, r: GcRef) -> Value {
        match self.heap.upvalue(r) {
            Upvalue::Open(slot) => self.stack[*slot],
            Upvalue::Closed(value) => *value,
        }
    }

    pub(crate) fn write_upvalue(&mut self, r: GcRef, value: Value) {
        match self.heap.upvalue_mut(r) {
            Upvalue::Open(slot) => self.stack[*slot] = value,
            Upvalue::Closed(closed) => *closed = value,
        }
    }
}
