mod chunk;
mod object;

pub use chunk::Chunk;
pub use object::{Closure, Function, Native, NativeFn, NativeResult, Pair, TString, Upvalue};

use crate::gc::{GcObject, GcRef, Heap};

/// A Tadpole value.
///
/// Primitives are stored inline; everything else is a reference into the
/// heap. Equality is identity for objects, except for strings, which are
/// interned and so compare by identity too.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Value {
    #[default]
    Nil,
    Boolean(bool),
    Numeric(f64),
    Object(GcRef),
}

impl Value {
    #[inline(always)]
    pub fn nil() -> Self {
        Value::Nil
    }

    #[inline(always)]
    pub fn boolean(b: bool) -> Self {
        Value::Boolean(b)
    }

    #[inline(always)]
    pub fn numeric(n: f64) -> Self {
        Value::Numeric(n)
    }

    #[inline(always)]
    pub fn object(r: GcRef) -> Self {
        Value::Object(r)
    }

    #[inline(always)]
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    #[inline(always)]
    pub fn is_boolean(&self) -> bool {
        matches!(self, Value::Boolean(_))
    }

    #[inline(always)]
    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Numeric(_))
    }

    #[inline(always)]
    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    #[inline(always)]
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    #[inline(always)]
    pub fn as_numeric(&self) -> Option<f64> {
        match self {
            Value::Numeric(n) => Some(*n),
            _ => None,
        }
    }

    #[inline(always)]
    pub fn as_object(&self) -> Option<GcRef> {
        match self {
            Value::Object(r) => Some(*r),
            _ => None,
        }
    }

    /// nil, false, 0 and the empty string are falsy
    pub fn is_truthy(&self, heap: &Heap) -> bool {
        match self {
            Value::Nil => false,
            Value::Boolean(b) => *b,
            Value::Numeric(n) => *n != 0.0,
            Value::Object(r) => heap.get(*r).is_truthy(),
        }
    }

    pub fn type_name(&self, heap: &Heap) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Boolean(_) => "boolean",
            Value::Numeric(_) => "numeric",
            Value::Object(r) => heap.kind(*r).name(),
        }
    }

    /// Printable form of the value
    pub fn stringify(&self, heap: &Heap) -> String {
        let mut out = String::new();
        heap.write_value(&mut out, *self, 0);
        out
    }

    /// Numeric equality follows IEEE (`nan != nan`); objects compare by
    /// identity, strings by content.
    pub fn equals(&self, other: &Value, heap: &Heap) -> bool {
        match (self, other) {
            (Value::Object(a), Value::Object(b)) if a != b => {
                match (heap.get(*a), heap.get(*b)) {
                    (GcObject::String(x), GcObject::String(y)) => x.as_str() == y.as_str(),
                    _ => false,
                }
            }
            _ => self == other,
        }
    }

    /// Same constant-pool entry: like `==` but numerics compare bitwise,
    /// keeping `0` and `-0` apart and letting `nan` dedupe
    pub(crate) fn same_constant(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Numeric(a), Value::Numeric(b)) => a.to_bits() == b.to_bits(),
            _ => self == other,
        }
    }

    pub(crate) fn write_primitive(&self, out: &mut String) {
        match self {
            Value::Nil => out.push_str("nil"),
            Value::Boolean(true) => out.push_str("true"),
            Value::Boolean(false) => out.push_str("false"),
            Value::Numeric(n) => format_numeric(out, *n),
            Value::Object(r) => out.push_str(&r.to_string()),
        }
    }
}

/// Integral values print without a fractional part
pub fn format_numeric(out: &mut String, n: f64) {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        let mut buffer = itoa::Buffer::new();
        if n == 0.0 && n.is_sign_negative() {
            out.push('-');
        }
        out.push_str(buffer.format(n as i64));
    } else {
        out.push_str(&n.to_string());
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Numeric(n)
    }
}

impl From<GcRef> for Value {
    fn from(r: GcRef) -> Self {
        Value::Object(r)
    }
}
