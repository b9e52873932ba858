use std::fmt;

use crate::compiler::CompileError;

/// Errors raised while executing bytecode.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuntimeError {
    #[error("{name}() takes exactly {expected} arguments ({got} given)")]
    Arity {
        name: String,
        expected: u8,
        got: usize,
    },
    #[error("stack overflow (call depth {depth})")]
    StackOverflow { depth: usize },
    #[error("name `{0}` is not defined")]
    UndefinedVariable(String),
    #[error("{0}")]
    TypeMismatch(String),
    #[error("can only call functions, got `{0}`")]
    NotCallable(&'static str),
    #[error("{0}")]
    Native(String),
    #[error("invalid opcode {0}")]
    InvalidOpcode(u8),
}

/// One line of a runtime traceback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceFrame {
    pub function: String,
    pub line: u32,
}

impl fmt::Display for TraceFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[line {}] in {}", self.line, self.function)
    }
}

/// Top-level result of `Vm::interpret`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum VmError {
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error("{error}")]
    Runtime {
        error: RuntimeError,
        /// Innermost frame first
        traceback: Vec<TraceFrame>,
    },
}

impl VmError {
    pub fn is_compile_error(&self) -> bool {
        matches!(self, VmError::Compile(_))
    }

    pub fn runtime_error(&self) -> Option<&RuntimeError> {
        match self {
            VmError::Runtime { error, .. } => Some(error),
            VmError::Compile(_) => None,
        }
    }

    /// Error message followed by the traceback, one frame per line
    pub fn report(&self) -> String {
        match self {
            VmError::Compile(e) => e.to_string(),
            VmError::Runtime { error, traceback } => {
                let mut out = error.to_string();
                for frame in traceback {
                    out.push('\n');
                    out.push_str(&frame.to_string());
                }
                out
            }
        }
    }
}

pub type VmResult<T> = Result<T, VmError>;
