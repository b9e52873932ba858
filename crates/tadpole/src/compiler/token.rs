#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // single-character
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    Comma,
    Minus,
    Plus,
    Semicolon,
    Slash,
    Star,
    Equal,

    // literals
    Identifier,
    Numeric,
    String,

    // keywords
    False,
    Fn,
    Nil,
    Return,
    True,
    Var,

    Error,
    Eof,
}

impl TokenKind {
    pub fn keyword(text: &str) -> Option<TokenKind> {
        match text {
            "false" => Some(TokenKind::False),
            "fn" => Some(TokenKind::Fn),
            "nil" => Some(TokenKind::Nil),
            "return" => Some(TokenKind::Return),
            "true" => Some(TokenKind::True),
            "var" => Some(TokenKind::Var),
            _ => None,
        }
    }
}

/// A lexeme borrowed from the source. For `Error` tokens the lexeme is the
/// error message.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub lexeme: &'a str,
    pub line: u32,
}

impl<'a> Token<'a> {
    pub fn new(kind: TokenKind, lexeme: &'a str, line: u32) -> Self {
        Token { kind, lexeme, line }
    }

    /// Placeholder used before the first token is read
    pub fn synthetic(lexeme: &'a str) -> Self {
        Token::new(TokenKind::Error, lexeme, 0)
    }
}
