use std::fmt;
use std::rc::Rc;

use crate::gc::GcRef;
use crate::value::{Chunk, Value};
use crate::vm::{RuntimeError, Vm};

/// Immutable string. Only ever created through the intern table.
#[derive(Debug)]
pub struct TString {
    chars: Box<str>,
    hash: u64,
}

impl TString {
    pub(crate) fn new(chars: &str, hash: u64) -> Self {
        TString {
            chars: chars.into(),
            hash,
        }
    }

    #[inline(always)]
    pub fn as_str(&self) -> &str {
        &self.chars
    }

    #[inline(always)]
    pub fn hash(&self) -> u64 {
        self.hash
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }
}

/// Compiled function prototype. `name` is `None` for the top-level script.
#[derive(Debug)]
pub struct Function {
    pub name: Option<GcRef>,
    pub arity: u8,
    pub upvalue_count: usize,
    pub chunk: Rc<Chunk>,
}

pub type NativeResult = Result<Value, RuntimeError>;

/// Host callback. Receives a copy of the arguments; the originals stay on
/// the VM stack (and so stay rooted) for the duration of the call.
pub type NativeFn = Rc<dyn Fn(&mut Vm, &[Value]) -> NativeResult>;

pub struct Native {
    pub name: Box<str>,
    pub function: NativeFn,
}

impl fmt::Debug for Native {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Native").field("name", &self.name).finish()
    }
}

/// Captured variable.
///
/// Open while the variable's stack slot is live; closed once the frame
/// that owns the slot returns or its scope ends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Upvalue {
    Open(usize),
    Closed(Value),
}

impl Upvalue {
    #[inline(always)]
    pub fn is_open(&self) -> bool {
        matches!(self, Upvalue::Open(_))
    }

    #[inline(always)]
    pub fn stack_slot(&self) -> Option<usize> {
        match self {
            Upvalue::Open(slot) => Some(*slot),
            Upvalue::Closed(_) => None,
        }
    }

    #[inline(always)]
    pub fn close(&mut self, value: Value) {
        *self = Upvalue::Closed(value);
    }
}

#[derive(Debug)]
pub struct Closure {
    pub function: GcRef,
    pub upvalues: Box<[GcRef]>,
}

impl Closure {
    pub fn new(function: GcRef, upvalues: Vec<GcRef>) -> Self {
        Closure {
            function,
            upvalues: upvalues.into_boxed_slice(),
        }
    }
}

/// Mutable two-field cell.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Pair {
    pub first: Value,
    pub second: Value,
}

impl Pair {
    pub fn new(first: Value, second: Value) -> Self {
        Pair { first, second }
    }
}
