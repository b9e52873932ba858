// Single-pass compiler: Pratt parser emitting bytecode directly
//
// Objects the compiler allocates (identifier and string constants, nested
// function prototypes) are registered in the VM's compiler roots so a
// collection triggered mid-compilation cannot free them.

mod compile_error;
mod func_state;
mod lexer;
mod token;

pub use compile_error::{CompileError, Diagnostic};
pub use lexer::Lexer;
pub use token::{Token, TokenKind};

use log::{debug, log_enabled, trace, Level};
use std::rc::Rc;

use crate::gc::{GcObject, GcRef};
use crate::value::{Function, Value};
use crate::vm::vm_limits::{MAX_ARGS, MAX_CONSTANTS};
use crate::vm::{OpCode, Vm};
use func_state::{FuncState, FunctionKind, UpvalueDesc};
use lexer::unescape;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    None,
    Assign, // =
    Term,   // + -
    Factor, // * /
    Unary,  // -
    Call,   // ()
    Primary,
}

impl Precedence {
    fn next(self) -> Precedence {
        match self {
            Precedence::None => Precedence::Assign,
            Precedence::Assign => Precedence::Term,
            Precedence::Term => Precedence::Factor,
            Precedence::Factor => Precedence::Unary,
            Precedence::Unary => Precedence::Call,
            Precedence::Call | Precedence::Primary => Precedence::Primary,
        }
    }

    fn of_infix(kind: TokenKind) -> Precedence {
        match kind {
            TokenKind::LeftParen => Precedence::Call,
            TokenKind::Plus | TokenKind::Minus => Precedence::Term,
            TokenKind::Star | TokenKind::Slash => Precedence::Factor,
            _ => Precedence::None,
        }
    }
}

/// Compile `source` into its top-level function.
///
/// All diagnostics of the unit are collected; parsing resumes at the next
/// statement boundary after each error.
pub fn compile(vm: &mut Vm, source: &str) -> Result<GcRef, CompileError> {
    let mut parser = Parser::new(vm, source);
    parser.advance();
    while !parser.matches(TokenKind::Eof) {
        parser.declaration();
    }
    let (function, _) = parser.end_function();

    if parser.diagnostics.is_empty() {
        debug!("compiled unit of {} bytes", source.len());
        Ok(function)
    } else {
        Err(CompileError {
            diagnostics: parser.diagnostics,
        })
    }
}

struct Parser<'src, 'vm> {
    vm: &'vm mut Vm,
    lexer: Lexer<'src>,
    current: Token<'src>,
    previous: Token<'src>,
    states: Vec<FuncState<'src>>,
    diagnostics: Vec<Diagnostic>,
    panic_mode: bool,
    /// The script ended in an expression without `;`, already returned
    tail_return: bool,
}

impl<'src, 'vm> Parser<'src, 'vm> {
    fn new(vm: &'vm mut Vm, source: &'src str) -> Self {
        Parser {
            vm,
            lexer: Lexer::new(source),
            current: Token::synthetic(""),
            previous: Token::synthetic(""),
            states: vec![FuncState::new(FunctionKind::Script, None)],
            diagnostics: Vec::new(),
            panic_mode: false,
            tail_return: false,
        }
    }

    // ============ Token Stream ============

    fn advance(&mut self) {
        self.previous = self.current;
        loop {
            self.current = self.lexer.next_token();
            if self.current.kind != TokenKind::Error {
                break;
            }
            self.error_at_current(self.current.lexeme);
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if !self.check(kind) {
            return false;
        }
        self.advance();
        true
    }

    fn consume(&mut self, kind: TokenKind, message: &str) {
        if self.check(kind) {
            self.advance();
        } else {
            self.error_at_current(message);
        }
    }

    // ============ Diagnostics ============

    fn error_at(&mut self, token: Token<'src>, message: &str) {
        if self.panic_mode {
            return;
        }
        self.panic_mode = true;

        let location = match token.kind {
            TokenKind::Eof => " at end".to_string(),
            TokenKind::Error => String::new(),
            _ => format!(" at `{}`", token.lexeme),
        };
        self.diagnostics.push(Diagnostic {
            line: token.line,
            location,
            message: message.to_string(),
        });
    }

    fn error(&mut self, message: &str) {
        self.error_at(self.previous, message);
    }

    fn error_at_current(&mut self, message: &str) {
        self.error_at(self.current, message);
    }

    fn synchronize(&mut self) {
        self.panic_mode = false;
        while !self.check(TokenKind::Eof) {
            if self.previous.kind == TokenKind::Semicolon {
                return;
            }
            if matches!(
                self.current.kind,
                TokenKind::Fn | TokenKind::Var | TokenKind::Return
            ) {
                return;
            }
            self.advance();
        }
    }

    // ============ Emitters ============

    fn state(&self) -> &FuncState<'src> {
        match self.states.last() {
            Some(state) => state,
            None => unreachable!("no function being compiled"),
        }
    }

    fn state_mut(&mut self) -> &mut FuncState<'src> {
        match self.states.last_mut() {
            Some(state) => state,
            None => unreachable!("no function being compiled"),
        }
    }

    fn emit_byte(&mut self, byte: u8) {
        let line = self.previous.line;
        self.state_mut().chunk.write(byte, line);
    }

    fn emit_op(&mut self, op: OpCode) {
        self.emit_byte(op as u8);
    }

    fn emit_op_arg(&mut self, op: OpCode, arg: u8) {
        self.emit_op(op);
        self.emit_byte(arg);
    }

    fn make_constant(&mut self, value: Value) -> u8 {
        let index = self.state_mut().chunk.add_constant(value);
        if index >= MAX_CONSTANTS {
            self.error("too many constants in one chunk");
            return 0;
        }
        index as u8
    }

    fn emit_constant(&mut self, value: Value) {
        let index = self.make_constant(value);
        self.emit_op_arg(OpCode::Constant, index);
    }

    fn identifier_constant(&mut self, name: &str) -> u8 {
        let r = self.vm.compiler_string(name);
        self.make_constant(Value::Object(r))
    }

    /// Finish the innermost function and allocate its prototype
    fn end_function(&mut self) -> (GcRef, Vec<UpvalueDesc>) {
        if !(self.state().kind == FunctionKind::Script && self.tail_return) {
            self.emit_op(OpCode::Nil);
            self.emit_op(OpCode::Return);
        }

        let Some(state) = self.states.pop() else {
            unreachable!("no function being compiled");
        };

        if log_enabled!(Level::Trace) && self.diagnostics.is_empty() {
            let name = match state.name {
                Some(name) => self.vm.heap().as_str(name).to_string(),
                None => "script".to_string(),
            };
            trace!("\n{}", state.chunk.disassemble(&name, self.vm.heap()));
        }

        let function = Function {
            name: state.name,
            arity: state.arity,
            upvalue_count: state.upvalues.len(),
            chunk: Rc::new(state.chunk),
        };
        let r = self.vm.compiler_object(GcObject::Function(function));
        (r, state.upvalues)
    }

    // ============ Scopes & Variables ============

    fn begin_scope(&mut self) {
        self.state_mut().scope_depth += 1;
    }

    fn end_scope(&mut self) {
        let state = self.state_mut();
        state.scope_depth -= 1;
        let depth = state.scope_depth;

        while let Some(local) = self.state().locals.last().copied() {
            if local.depth.is_some_and(|d| d <= depth) {
                break;
            }
            if local.captured {
                self.emit_op(OpCode::CloseUpvalue);
            } else {
                self.emit_op(OpCode::Pop);
            }
            self.state_mut().locals.pop();
        }
    }

    fn declare_variable(&mut self) {
        if self.state().scope_depth == 0 {
            return;
        }
        let name = self.previous.lexeme;
        if self.state().declared_in_scope(name) {
            self.error("variable already declared in this scope");
        }
        if let Err(message) = self.state_mut().add_local(name) {
            self.error(message);
        }
    }

    /// Consume an identifier and declare it. Returns the name constant for
    /// globals, 0 for locals.
    fn parse_variable(&mut self, message: &str) -> u8 {
        self.consume(TokenKind::Identifier, message);
        self.declare_variable();
        if self.state().scope_depth > 0 {
            return 0;
        }
        self.identifier_constant(self.previous.lexeme)
    }

    fn define_variable(&mut self, global: u8) {
        if self.state().scope_depth > 0 {
            self.state_mut().mark_initialized();
            return;
        }
        self.emit_op_arg(OpCode::DefGlobal, global);
    }

    fn resolve_local_at(&mut self, level: usize, name: &str) -> Option<u8> {
        match self.states[level].resolve_local(name) {
            Ok(slot) => slot,
            Err(message) => {
                self.error(message);
                None
            }
        }
    }

    fn add_upvalue_at(&mut self, level: usize, index: u8, is_local: bool) -> u8 {
        match self.states[level].add_upvalue(index, is_local) {
            Ok(i) => i,
            Err(message) => {
                self.error(message);
                0
            }
        }
    }

    /// Resolve `name` as an upvalue of the function at `level`, threading
    /// it through every enclosing function in between
    fn resolve_upvalue(&mut self, level: usize, name: &str) -> Option<u8> {
        if level == 0 {
            return None;
        }
        if let Some(slot) = self.resolve_local_at(level - 1, name) {
            self.states[level - 1].locals[slot as usize].captured = true;
            return Some(self.add_upvalue_at(level, slot, true));
        }
        let index = self.resolve_upvalue(level - 1, name)?;
        Some(self.add_upvalue_at(level, index, false))
    }

    fn named_variable(&mut self, name: &'src str, can_assign: bool) {
        let level = self.states.len() - 1;
        let (get, set, arg) = if let Some(slot) = self.resolve_local_at(level, name) {
            (OpCode::GetLocal, OpCode::SetLocal, slot)
        } else if let Some(index) = self.resolve_upvalue(level, name) {
            (OpCode::GetUpvalue, OpCode::SetUpvalue, index)
        } else {
            let constant = self.identifier_constant(name);
            (OpCode::GetGlobal, OpCode::SetGlobal, constant)
        };

        if can_assign && self.matches(TokenKind::Equal) {
            self.expression();
            self.emit_op_arg(set, arg);
        } else {
            self.emit_op_arg(get, arg);
        }
    }

    // ============ Declarations & Statements ============

    fn declaration(&mut self) {
        if self.matches(TokenKind::Fn) {
            self.fn_declaration();
        } else if self.matches(TokenKind::Var) {
            self.var_declaration();
        } else {
            self.statement();
        }

        if self.panic_mode {
            self.synchronize();
        }
    }

    fn fn_declaration(&mut self) {
        let global = self.parse_variable("expect function name");
        self.state_mut().mark_initialized();
        self.function(FunctionKind::Function);
        self.define_variable(global);
    }

    fn var_declaration(&mut self) {
        let global = self.parse_variable("expect variable name");
        if self.matches(TokenKind::Equal) {
            self.expression();
        } else {
            self.emit_op(OpCode::Nil);
        }
        self.consume(TokenKind::Semicolon, "expect `;` after variable declaration");
        self.define_variable(global);
    }

    fn function(&mut self, kind: FunctionKind) {
        let name = self.vm.compiler_string(self.previous.lexeme);
        self.states.push(FuncState::new(kind, Some(name)));
        self.begin_scope();

        self.consume(TokenKind::LeftParen, "expect `(` after function name");
        if !self.check(TokenKind::RightParen) {
            loop {
                if self.state().arity as usize == MAX_ARGS {
                    self.error_at_current("can't have more than 8 parameters");
                } else {
                    self.state_mut().arity += 1;
                }
                let constant = self.parse_variable("expect parameter name");
                self.define_variable(constant);
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "expect `)` after parameters");
        self.consume(TokenKind::LeftBrace, "expect `{` before function body");
        self.block();

        let (function, upvalues) = self.end_function();
        let constant = self.make_constant(Value::Object(function));
        self.emit_op_arg(OpCode::Closure, constant);
        for upvalue in upvalues {
            self.emit_byte(upvalue.is_local as u8);
            self.emit_byte(upvalue.index);
        }
    }

    fn statement(&mut self) {
        if self.matches(TokenKind::LeftBrace) {
            self.begin_scope();
            self.block();
            self.end_scope();
        } else if self.matches(TokenKind::Return) {
            self.return_statement();
        } else {
            self.expression_statement();
        }
    }

    fn block(&mut self) {
        while !self.check(TokenKind::RightBrace) && !self.check(TokenKind::Eof) {
            self.declaration();
        }
        self.consume(TokenKind::RightBrace, "expect `}` after block");
    }

    fn return_statement(&mut self) {
        if self.matches(TokenKind::Semicolon) {
            self.emit_op(OpCode::Nil);
        } else {
            self.expression();
            self.consume(TokenKind::Semicolon, "expect `;` after return value");
        }
        self.emit_op(OpCode::Return);
    }

    fn expression_statement(&mut self) {
        self.expression();
        if self.check(TokenKind::Eof) && self.states.len() == 1 && self.state().scope_depth == 0 {
            self.emit_op(OpCode::Return);
            self.tail_return = true;
            return;
        }
        self.consume(TokenKind::Semicolon, "expect `;` after expression");
        self.emit_op(OpCode::Pop);
    }

    // ============ Expressions ============

    fn expression(&mut self) {
        self.parse_precedence(Precedence::Assign);
    }

    fn parse_precedence(&mut self, precedence: Precedence) {
        self.advance();
        let can_assign = precedence <= Precedence::Assign;
        if !self.prefix(self.previous.kind, can_assign) {
            self.error("expect expression");
            return;
        }

        while precedence <= Precedence::of_infix(self.current.kind) {
            self.advance();
            self.infix(self.previous.kind);
        }

        if can_assign && self.matches(TokenKind::Equal) {
            self.error("invalid assignment target");
        }
    }

    /// Returns false if `kind` cannot start an expression
    fn prefix(&mut self, kind: TokenKind, can_assign: bool) -> bool {
        match kind {
            TokenKind::LeftParen => self.grouping(),
            TokenKind::Minus => self.unary(),
            TokenKind::Numeric => self.numeric(),
            TokenKind::String => self.string(),
            TokenKind::Nil => self.emit_op(OpCode::Nil),
            TokenKind::True => self.emit_op(OpCode::True),
            TokenKind::False => self.emit_op(OpCode::False),
            TokenKind::Identifier => self.named_variable(self.previous.lexeme, can_assign),
            _ => return false,
        }
        true
    }

    fn infix(&mut self, kind: TokenKind) {
        match kind {
            TokenKind::LeftParen => self.call(),
            TokenKind::Plus | TokenKind::Minus | TokenKind::Star | TokenKind::Slash => {
                self.binary(kind)
            }
            _ => unreachable!("{kind:?} has no infix rule"),
        }
    }

    fn grouping(&mut self) {
        self.expression();
        self.consume(TokenKind::RightParen, "expect `)` after expression");
    }

    fn unary(&mut self) {
        self.parse_precedence(Precedence::Unary);
        self.emit_op(OpCode::Negate);
    }

    fn binary(&mut self, operator: TokenKind) {
        self.parse_precedence(Precedence::of_infix(operator).next());
        let op = match operator {
            TokenKind::Plus => OpCode::Add,
            TokenKind::Minus => OpCode::Sub,
            TokenKind::Star => OpCode::Mul,
            TokenKind::Slash => OpCode::Div,
            _ => unreachable!("{operator:?} is not a binary operator"),
        };
        self.emit_op(op);
    }

    fn call(&mut self) {
        let argc = self.argument_list();
        match OpCode::call(argc) {
            Some(op) => self.emit_op(op),
            None => self.error("can't have more than 8 arguments"),
        }
    }

    fn argument_list(&mut self) -> usize {
        let mut argc = 0;
        if !self.check(TokenKind::RightParen) {
            loop {
                self.expression();
                if argc == MAX_ARGS {
                    self.error("can't have more than 8 arguments");
                } else {
                    argc += 1;
                }
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "expect `)` after arguments");
        argc
    }

    fn numeric(&mut self) {
        match self.previous.lexeme.parse::<f64>() {
            Ok(n) => self.emit_constant(Value::Numeric(n)),
            Err(_) => self.error("invalid numeric literal"),
        }
    }

    fn string(&mut self) {
        let lexeme = self.previous.lexeme;
        let text = unescape(&lexeme[1..lexeme.len() - 1]);
        let r = self.vm.compiler_string(&text);
        self.emit_constant(Value::Object(r));
    }
}
