use crate::compiler::token::{Token, TokenKind};

/// On-demand tokenizer over a source string.
pub struct Lexer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    start: usize,
    current: usize,
    line: u32,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Lexer {
            source,
            bytes: source.as_bytes(),
            start: 0,
            current: 0,
            line: 1,
        }
    }

    pub fn next_token(&mut self) -> Token<'a> {
        self.skip_whitespace();
        self.start = self.current;

        let Some(c) = self.advance() else {
            return self.make_token(TokenKind::Eof);
        };

        match c {
            b'(' => self.make_token(TokenKind::LeftParen),
            b')' => self.make_token(TokenKind::RightParen),
            b'{' => self.make_token(TokenKind::LeftBrace),
            b'}' => self.make_token(TokenKind::RightBrace),
            b',' => self.make_token(TokenKind::Comma),
            b'-' => self.make_token(TokenKind::Minus),
            b'+' => self.make_token(TokenKind::Plus),
            b';' => self.make_token(TokenKind::Semicolon),
            b'/' => self.make_token(TokenKind::Slash),
            b'*' => self.make_token(TokenKind::Star),
            b'=' => self.make_token(TokenKind::Equal),
            b'"' => self.string(),
            c if c.is_ascii_digit() => self.numeric(),
            c if is_alpha(c) => self.identifier(),
            _ => {
                // consume the whole UTF-8 sequence so the lexer stays on a
                // char boundary
                while self.peek().is_some_and(|b| b & 0xC0 == 0x80) {
                    self.current += 1;
                }
                self.error_token("unexpected character")
            }
        }
    }

    fn advance(&mut self) -> Option<u8> {
        let c = self.bytes.get(self.current).copied()?;
        self.current += 1;
        Some(c)
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.current).copied()
    }

    fn peek_next(&self) -> Option<u8> {
        self.bytes.get(self.current + 1).copied()
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            match c {
                b' ' | b'\r' | b'\t' => self.current += 1,
                b'\n' => {
                    self.line += 1;
                    self.current += 1;
                }
                b'/' if self.peek_next() == Some(b'/') => {
                    while self.peek().is_some_and(|c| c != b'\n') {
                        self.current += 1;
                    }
                }
                _ => return,
            }
        }
    }

    fn numeric(&mut self) -> Token<'a> {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.current += 1;
        }
        if self.peek() == Some(b'.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            self.current += 1;
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.current += 1;
            }
        }
        self.make_token(TokenKind::Numeric)
    }

    fn identifier(&mut self) -> Token<'a> {
        while self.peek().is_some_and(|c| is_alpha(c) || c.is_ascii_digit()) {
            self.current += 1;
        }
        let text = &self.source[self.start..self.current];
        self.make_token(TokenKind::keyword(text).unwrap_or(TokenKind::Identifier))
    }

    /// The token keeps its quotes; escapes are validated here and decoded
    /// by `unescape`
    fn string(&mut self) -> Token<'a> {
        let start_line = self.line;
        loop {
            match self.advance() {
                None => {
                    let mut token = self.error_token("unterminated string");
                    token.line = start_line;
                    return token;
                }
                Some(b'"') => break,
                Some(b'\n') => self.line += 1,
                Some(b'\\') => match self.advance() {
                    Some(b'n' | b't' | b'r' | b'\\' | b'"' | b'0') => {}
                    Some(b'\n') => self.line += 1,
                    _ => return self.error_token("invalid escape sequence"),
                },
                Some(_) => {}
            }
        }
        let mut token = self.make_token(TokenKind::String);
        token.line = start_line;
        token
    }

    fn make_token(&self, kind: TokenKind) -> Token<'a> {
        Token::new(kind, &self.source[self.start..self.current], self.line)
    }

    fn error_token(&self, message: &'static str) -> Token<'a> {
        Token::new(TokenKind::Error, message, self.line)
    }
}

#[inline]
fn is_alpha(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

/// Decode the body of a string literal (quotes already stripped)
pub fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('\n') => {}
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(source);
        let mut kinds = Vec::new();
        loop {
            let token = lexer.next_token();
            kinds.push(token.kind);
            if token.kind == TokenKind::Eof {
                return kinds;
            }
        }
    }

    #[test]
    fn test_tokens() {
        use TokenKind::*;
        assert_eq!(
            kinds("var x = fn_1(2.5, \"s\") * -3; // comment\nreturn nil / 2"),
            vec![
                Var, Identifier, Equal, Identifier, LeftParen, Numeric, Comma, String, RightParen,
                Star, Minus, Numeric, Semicolon, Return, Nil, Slash, Numeric, Eof
            ]
        );
        assert_eq!(kinds("fn true false"), vec![Fn, True, False, Eof]);
    }

    #[test]
    fn test_lines_and_lexemes() {
        let mut lexer = Lexer::new("a\n\n  12.75\n3.");
        let a = lexer.next_token();
        assert_eq!((a.lexeme, a.line), ("a", 1));
        let n = lexer.next_token();
        assert_eq!((n.kind, n.lexeme, n.line), (TokenKind::Numeric, "12.75", 3));
        // a trailing dot is not part of the number
        let n = lexer.next_token();
        assert_eq!((n.lexeme, n.line), ("3", 4));
        assert_eq!(lexer.next_token().kind, TokenKind::Error);
    }

    #[test]
    fn test_string_errors() {
        let mut lexer = Lexer::new("\"abc");
        let token = lexer.next_token();
        assert_eq!((token.kind, token.lexeme), (TokenKind::Error, "unterminated string"));

        let mut lexer = Lexer::new(r#""a\qb""#);
        assert_eq!(lexer.next_token().lexeme, "invalid escape sequence");
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape(r#"a\nb\t\"c\\"#), "a\nb\t\"c\\");
        assert_eq!(unescape("plain"), "plain");
    }

    #[test]
    fn test_non_ascii_outside_string() {
        let mut lexer = Lexer::new("é x");
        assert_eq!(lexer.next_token().kind, TokenKind::Error);
        assert_eq!(lexer.next_token().lexeme, "x");
    }
}
