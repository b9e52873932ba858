use crate::gc::GcRef;
use crate::value::Chunk;
use crate::vm::vm_limits::{MAX_LOCALS, MAX_UPVALUES};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FunctionKind {
    Script,
    Function,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Local<'a> {
    pub name: &'a str,
    /// `None` until the initializer has been compiled
    pub depth: Option<u32>,
    pub captured: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct UpvalueDesc {
    pub index: u8,
    pub is_local: bool,
}

/// Per-function compilation state
pub(crate) struct FuncState<'a> {
    pub kind: FunctionKind,
    pub name: Option<GcRef>,
    pub arity: u8,
    pub chunk: Chunk,
    pub locals: Vec<Local<'a>>,
    pub upvalues: Vec<UpvalueDesc>,
    pub scope_depth: u32,
}

impl<'a> FuncState<'a> {
    pub fn new(kind: FunctionKind, name: Option<GcRef>) -> Self {
        FuncState {
            kind,
            name,
            arity: 0,
            chunk: Chunk::new(),
            locals: Vec::new(),
            upvalues: Vec::new(),
            scope_depth: 0,
        }
    }

    /// Slot of the innermost local named `name`
    pub fn resolve_local(&self, name: &str) -> Result<Option<u8>, &'static str> {
        for (slot, local) in self.locals.iter().enumerate().rev() {
            if local.name == name {
                return match local.depth {
                    Some(_) => Ok(Some(slot as u8)),
                    None => Err("cannot read local variable in its own initializer"),
                };
            }
        }
        Ok(None)
    }

    /// Index of the upvalue descriptor, adding it if new
    pub fn add_upvalue(&mut self, index: u8, is_local: bool) -> Result<u8, &'static str> {
        let desc = UpvalueDesc { index, is_local };
        if let Some(existing) = self.upvalues.iter().position(|u| *u == desc) {
            return Ok(existing as u8);
        }
        if self.upvalues.len() >= MAX_UPVALUES {
            return Err("too many closure variables in function");
        }
        self.upvalues.push(desc);
        Ok((self.upvalues.len() - 1) as u8)
    }

    pub fn add_local(&mut self, name: &'a str) -> Result<(), &'static str> {
        if self.locals.len() >= MAX_LOCALS {
            return Err("too many local variables in function");
        }
        self.locals.push(Local {
            name,
            depth: None,
            captured: false,
        });
        Ok(())
    }

    /// True if `name` is already declared in the innermost scope
    pub fn declared_in_scope(&self, name: &str) -> bool {
        self.locals
            .iter()
            .rev()
            .take_while(|local| local.depth.is_none_or(|d| d >= self.scope_depth))
            .any(|local| local.name == name)
    }

    pub fn mark_initialized(&mut self) {
        if self.scope_depth == 0 {
            return;
        }
        let depth = self.scope_depth;
        if let Some(local) = self.locals.last_mut() {
            local.depth = Some(depth);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locals_and_upvalues() {
        let mut state = FuncState::new(FunctionKind::Function, None);
        state.scope_depth = 1;
        state.add_local("a").unwrap();
        assert!(state.resolve_local("a").is_err());
        state.mark_initialized();
        assert_eq!(state.resolve_local("a"), Ok(Some(0)));
        assert_eq!(state.resolve_local("b"), Ok(None));
        assert!(state.declared_in_scope("a"));

        state.scope_depth = 2;
        assert!(!state.declared_in_scope("a"));

        assert_eq!(state.add_upvalue(3, true), Ok(0));
        assert_eq!(state.add_upvalue(1, false), Ok(1));
        assert_eq!(state.add_upvalue(3, true), Ok(0));
    }
}
