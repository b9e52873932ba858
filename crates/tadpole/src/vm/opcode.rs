/// Tadpole bytecode. Operands are single bytes following the opcode.
///
/// `Closure` additionally carries one `(is_local, index)` byte pair per
/// upvalue of the function it instantiates.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    Constant = 0,
    Nil,
    True,
    False,
    Pop,
    DefGlobal,
    GetGlobal,
    SetGlobal,
    GetLocal,
    SetLocal,
    GetUpvalue,
    SetUpvalue,
    Add,
    Sub,
    Mul,
    Div,
    Negate,
    Call0,
    Call1,
    Call2,
    Call3,
    Call4,
    Call5,
    Call6,
    Call7,
    Call8,
    Closure,
    CloseUpvalue,
    Return,
}

impl OpCode {
    const ALL: [OpCode; 29] = [
        OpCode::Constant,
        OpCode::Nil,
        OpCode::True,
        OpCode::False,
        OpCode::Pop,
        OpCode::DefGlobal,
        OpCode::GetGlobal,
        OpCode::SetGlobal,
        OpCode::GetLocal,
        OpCode::SetLocal,
        OpCode::GetUpvalue,
        OpCode::SetUpvalue,
        OpCode::Add,
        OpCode::Sub,
        OpCode::Mul,
        OpCode::Div,
        OpCode::Negate,
        OpCode::Call0,
        OpCode::Call1,
        OpCode::Call2,
        OpCode::Call3,
        OpCode::Call4,
        OpCode::Call5,
        OpCode::Call6,
        OpCode::Call7,
        OpCode::Call8,
        OpCode::Closure,
        OpCode::CloseUpvalue,
        OpCode::Return,
    ];

    #[inline(always)]
    pub fn from_byte(byte: u8) -> Option<OpCode> {
        Self::ALL.get(byte as usize).copied()
    }

    /// `CALL_<argc>`, if `argc` is encodable
    pub fn call(argc: usize) -> Option<OpCode> {
        if argc > 8 {
            return None;
        }
        Self::from_byte(OpCode::Call0 as u8 + argc as u8)
    }

    /// Argument count of a `CALL_N` opcode
    #[inline(always)]
    pub fn call_argc(self) -> Option<usize> {
        let byte = self as u8;
        (OpCode::Call0 as u8..=OpCode::Call8 as u8)
            .contains(&byte)
            .then(|| (byte - OpCode::Call0 as u8) as usize)
    }

    /// Fixed operand bytes (not counting the upvalue pairs of `Closure`)
    pub fn operand_count(self) -> usize {
        match self {
            OpCode::Constant
            | OpCode::DefGlobal
            | OpCode::GetGlobal
            | OpCode::SetGlobal
            | OpCode::GetLocal
            | OpCode::SetLocal
            | OpCode::GetUpvalue
            | OpCode::SetUpvalue
            | OpCode::Closure => 1,
            _ => 0,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            OpCode::Constant => "CONSTANT",
            OpCode::Nil => "NIL",
            OpCode::True => "TRUE",
            OpCode::False => "FALSE",
            OpCode::Pop => "POP",
            OpCode::DefGlobal => "DEF_GLOBAL",
            OpCode::GetGlobal => "GET_GLOBAL",
            OpCode::SetGlobal => "SET_GLOBAL",
            OpCode::GetLocal => "GET_LOCAL",
            OpCode::SetLocal => "SET_LOCAL",
            OpCode::GetUpvalue => "GET_UPVALUE",
            OpCode::SetUpvalue => "SET_UPVALUE",
            OpCode::Add => "ADD",
            OpCode::Sub => "SUB",
            OpCode::Mul => "MUL",
            OpCode::Div => "DIV",
            OpCode::Negate => "NEGATE",
            OpCode::Call0 => "CALL_0",
            OpCode::Call1 => "CALL_1",
            OpCode::Call2 => "CALL_2",
            OpCode::Call3 => "CALL_3",
            OpCode::Call4 => "CALL_4",
            OpCode::Call5 => "CALL_5",
            OpCode::Call6 => "CALL_6",
            OpCode::Call7 => "CALL_7",
            OpCode::Call8 => "CALL_8",
            OpCode::Closure => "CLOSURE",
            OpCode::CloseUpvalue => "CLOSE_UPVALUE",
            OpCode::Return => "RETURN",
        }
    }
}

impl std::fmt::Display for OpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
