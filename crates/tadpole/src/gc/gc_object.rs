// ============ GC Header ============

use crate::gc::{GcRef, ObjType};
use crate::value::{Closure, Function, Native, Pair, TString, Upvalue, Value};

/// Header embedded in every heap object.
///
/// `next` is the intrusive "next allocated object" link threading every
/// live object into the heap-wide sweep list. It is never exposed outside
/// the collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GcHeader {
    pub kind: ObjType,
    pub marked: bool,
    pub(crate) next: Option<GcRef>,
}

impl GcHeader {
    #[inline(always)]
    pub fn new(kind: ObjType, next: Option<GcRef>) -> Self {
        GcHeader {
            kind,
            marked: false,
            next,
        }
    }
}

// ============ GC-managed Objects ============

/// The closed set of heap object variants.
#[derive(Debug)]
pub enum GcObject {
    String(TString),
    Function(Function),
    Native(Native),
    Upvalue(Upvalue),
    Closure(Closure),
    Pair(Pair),
}

impl GcObject {
    #[inline(always)]
    pub fn kind(&self) -> ObjType {
        match self {
            GcObject::String(_) => ObjType::String,
            GcObject::Function(_) => ObjType::Function,
            GcObject::Native(_) => ObjType::Native,
            GcObject::Upvalue(_) => ObjType::Upvalue,
            GcObject::Closure(_) => ObjType::Closure,
            GcObject::Pair(_) => ObjType::Pair,
        }
    }

    /// Empty strings are falsy; every other object is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            GcObject::String(s) => !s.is_empty(),
            GcObject::Function(_)
            | GcObject::Native(_)
            | GcObject::Upvalue(_)
            | GcObject::Closure(_)
            | GcObject::Pair(_) => true,
        }
    }

    /// Visit every object this one owns or shares.
    ///
    /// Open upvalues report nothing: the stack slot they alias is a root
    /// in its own right.
    pub fn for_each_reference(&self, mut visit: impl FnMut(GcRef)) {
        match self {
            GcObject::String(_) | GcObject::Native(_) => {}
            GcObject::Function(function) => {
                if let Some(name) = function.name {
                    visit(name);
                }
                for constant in &function.chunk.constants {
                    visit_value(constant, &mut visit);
                }
            }
            GcObject::Upvalue(upvalue) => match upvalue {
                Upvalue::Open(_) => {}
                Upvalue::Closed(value) => visit_value(value, &mut visit),
            },
            GcObject::Closure(closure) => {
                visit(closure.function);
                for upvalue in closure.upvalues.iter() {
                    visit(*upvalue);
                }
            }
            GcObject::Pair(pair) => {
                visit_value(&pair.first, &mut visit);
                visit_value(&pair.second, &mut visit);
            }
        }
    }
}

#[inline(always)]
fn visit_value(value: &Value, visit: &mut impl FnMut(GcRef)) {
    if let Value::Object(r) = value {
        visit(*r);
    }
}

/// One occupied slot of the heap arena.
#[derive(Debug)]
pub(crate) struct GcBox {
    pub(crate) header: GcHeader,
    pub(crate) object: GcObject,
}
