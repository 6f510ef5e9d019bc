//! Hand-written tokenizer for the base scripting language.
//!
//! Stands in for the external lexer contract of `spec.md` §6: there is no
//! published crate for this dialect's grammar, so Loom owns the full
//! lex/parse pipeline the way `cribo` leans on `ruff_python_parser` for
//! Python.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub line: u32,
    pub col: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    Number(f64),
    Str(String),
    Keyword(&'static str),
    Symbol(&'static str),
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

pub const KEYWORDS: &[&str] = &[
    "and", "break", "do", "else", "elseif", "end", "false", "for", "function", "if", "in",
    "local", "nil", "not", "or", "repeat", "return", "then", "true", "until", "while", "export",
    "import", "from", "as",
];

#[derive(Debug)]
pub struct LexError {
    pub message: String,
    pub span: Span,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "line {}, col {}: {}",
            self.span.line, self.span.col, self.message
        )
    }
}

impl std::error::Error for LexError {}

pub struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
    line: u32,
    col: u32,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src: src.as_bytes(),
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_trivia();
            let span = self.here();
            let Some(c) = self.peek() else {
                tokens.push(Token {
                    kind: TokenKind::Eof,
                    span,
                });
                break;
            };
            let kind = if c.is_ascii_alphabetic() || c == b'_' {
                self.lex_ident()
            } else if c.is_ascii_digit() {
                self.lex_number()?
            } else if c == b'"' || c == b'\'' {
                self.lex_string()?
            } else if c == b'[' && self.peek_at(1) == Some(b'[') {
                self.lex_long_string()?
            } else {
                self.lex_symbol()?
            };
            tokens.push(Token { kind, span });
        }
        Ok(tokens)
    }

    fn here(&self) -> Span {
        Span {
            line: self.line,
            col: self.col,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.pos += 1;
        if c == b'\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(b' ' | b'\t' | b'\r' | b'\n') => {
                    self.advance();
                }
                Some(b'-') if self.peek_at(1) == Some(b'-') => {
                    self.advance();
                    self.advance();
                    if self.peek() == Some(b'[') && self.peek_at(1) == Some(b'[') {
                        self.advance();
                        self.advance();
                        while self.peek().is_some()
                            && !(self.peek() == Some(b']') && self.peek_at(1) == Some(b']'))
                        {
                            self.advance();
                        }
                        self.advance();
                        self.advance();
                    } else {
                        while let Some(c) = self.peek() {
                            if c == b'\n' {
                                break;
                            }
                            self.advance();
                        }
                    }
                }
                _ => break,
            }
        }
    }

    fn lex_ident(&mut self) -> TokenKind {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == b'_' {
                self.advance();
            } else {
                break;
            }
        }
        let text = std::str::from_utf8(&self.src[start..self.pos]).unwrap_or_default();
        if let Some(&kw) = KEYWORDS.iter().find(|k| **k == text) {
            TokenKind::Keyword(kw)
        } else {
            TokenKind::Ident(text.to_string())
        }
    }

    fn lex_number(&mut self) -> Result<TokenKind, LexError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || c == b'.' || c == b'x' || c == b'X' || c.is_ascii_hexdigit() {
                self.advance();
            } else {
                break;
            }
        }
        let text = std::str::from_utf8(&self.src[start..self.pos]).unwrap_or_default();
        let value = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X"))
        {
            i64::from_str_radix(hex, 16)
                .map(|v| v as f64)
                .map_err(|_| self.error(format!("invalid hex literal `{text}`")))?
        } else {
            text.parse::<f64>()
                .map_err(|_| self.error(format!("invalid numeric literal `{text}`")))?
        };
        Ok(TokenKind::Number(value))
    }

    fn lex_string(&mut self) -> Result<TokenKind, LexError> {
        let quote = self.advance().expect("checked by caller");
        let mut out = String::new();
        loop {
            match self.advance() {
                None => return Err(self.error("unterminated string literal")),
                Some(c) if c == quote => break,
                Some(b'\\') => match self.advance() {
                    Some(b'n') => out.push('\n'),
                    Some(b't') => out.push('\t'),
                    Some(b'\\') => out.push('\\'),
                    Some(c) => out.push(c as char),
                    None => return Err(self.error("unterminated escape sequence")),
                },
                Some(c) => out.push(c as char),
            }
        }
        Ok(TokenKind::Str(out))
    }

    fn lex_long_string(&mut self) -> Result<TokenKind, LexError> {
        self.advance();
        self.advance();
        let start = self.pos;
        while self.peek().is_some() && !(self.peek() == Some(b']') && self.peek_at(1) == Some(b']'))
        {
            self.advance();
        }
        let text = std::str::from_utf8(&self.src[start..self.pos])
            .unwrap_or_default()
            .to_string();
        if self.advance().is_none() || self.advance().is_none() {
            return Err(self.error("unterminated long string literal"));
        }
        Ok(TokenKind::Str(text))
    }

    fn lex_symbol(&mut self) -> Result<TokenKind, LexError> {
        const THREE: &[&str] = &["..."];
        const TWO: &[&str] = &["==", "~=", "<=", ">=", "..", "::"];
        for sym in THREE {
            if self.matches(sym) {
                return Ok(TokenKind::Symbol(sym));
            }
        }
        for sym in TWO {
            if self.matches(sym) {
                return Ok(TokenKind::Symbol(sym));
            }
        }
        const ONE: &[(u8, &str)] = &[
            (b'+', "+"),
            (b'-', "-"),
            (b'*', "*"),
            (b'/', "/"),
            (b'%', "%"),
            (b'^', "^"),
            (b'#', "#"),
            (b'<', "<"),
            (b'>', ">"),
            (b'=', "="),
            (b'(', "("),
            (b')', ")"),
            (b'{', "{"),
            (b'}', "}"),
            (b'[', "["),
            (b']', "]"),
            (b';', ";"),
            (b':', ":"),
            (b',', ","),
            (b'.', "."),
        ];
        let c = self.peek().expect("checked by caller");
        for (byte, sym) in ONE {
            if c == *byte {
                self.advance();
                return Ok(TokenKind::Symbol(sym));
            }
        }
        Err(self.error(format!("unexpected character `{}`", c as char)))
    }

    fn matches(&mut self, sym: &str) -> bool {
        let bytes = sym.as_bytes();
        if self.src[self.pos..].starts_with(bytes) {
            for _ in 0..bytes.len() {
                self.advance();
            }
            true
        } else {
            false
        }
    }

    fn error(&self, message: impl Into<String>) -> LexError {
        LexError {
            message: message.into(),
            span: self.here(),
        }
    }
}
