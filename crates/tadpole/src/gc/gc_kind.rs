/// Type tag stored in every object header.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjType {
    String = 0,
    Function = 1,
    Native = 2,
    Upvalue = 3,
    Closure = 4,
    Pair = 5,
}

impl ObjType {
    /// Name reported by `type()` and in runtime error messages
    pub fn name(self) -> &'static str {
        match self {
            ObjType::String => "string",
            ObjType::Function | ObjType::Closure => "function",
            ObjType::Native => "native",
            ObjType::Upvalue => "upvalue",
            ObjType::Pair => "pair",
        }
    }
}
