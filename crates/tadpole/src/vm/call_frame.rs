use std::rc::Rc;

use crate::gc::GcRef;
use crate::value::Chunk;

/// Activation record of a Tadpole function.
///
/// `base` is the stack index of local slot 0; the callee itself sits just
/// below it at `base - 1`.
#[derive(Debug, Clone)]
pub struct CallFrame {
    pub closure: GcRef,
    pub chunk: Rc<Chunk>,
    pub ip: usize,
    pub base: usize,
}

impl CallFrame {
    pub fn new(closure: GcRef, chunk: Rc<Chunk>, base: usize) -> Self {
        CallFrame {
            closure,
            chunk,
            ip: 0,
            base,
        }
    }

    /// Source line of the instruction last fetched
    pub fn current_line(&self) -> u32 {
        self.chunk.line(self.ip.saturating_sub(1))
    }
}
