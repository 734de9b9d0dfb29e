//! Expression lexer.
//!
//! Turns scenario text into a stream of [`Token`]s.  All position state
//! (cursor, line, file name, the scratch buffer used to decode string
//! escapes) lives in an explicit [`LexerState`] owned by one lexer, so two
//! scenarios can be lexed side by side without interfering.
//!
//! Lexing never fails: anything unrecognised becomes a [`TokenKind::Error`]
//! token and the parser turns it into a syntax error.

use std::fmt;
use std::sync::Arc;

use crate::token_text::TokenText;

// ── Token ─────────────────────────────────────────────────────────────────────

/// Why the lexer produced an error token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexError {
    BadChar,
    BadNumber,
    UnterminatedString,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LexError::BadChar => "unrecognised character",
            LexError::BadNumber => "malformed number",
            LexError::UnterminatedString => "unterminated string",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Number(f64),
    Str,
    Ident,

    // Arithmetic
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,

    // Comparison
    Eq, // ==
    Ne, // !=
    Lt,
    Le,
    Gt,
    Ge,
    GlobMatch,     // =~
    RegexMatch,    // =/
    NotGlobMatch,  // !~
    NotRegexMatch, // !/

    // Logical
    And, // &&
    Or,  // ||

    // Punctuation
    Question,
    Colon,
    Comma,
    Semi,
    LParen,
    RParen,

    Error(LexError),
    Eof,
}

/// One lexical unit, tagged with where it came from.
///
/// For strings `text` holds the decoded contents; for every other kind it
/// holds the raw lexeme.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: TokenText,
    pub line: u32,
    pub file: Arc<str>,
}

impl Token {
    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }

    /// How the token reads in an error message.
    pub fn describe(&self) -> String {
        match self.kind {
            TokenKind::Eof => "end of input".to_owned(),
            TokenKind::Str => format!("\"{}\"", self.text),
            _ => self.text.to_string(),
        }
    }
}

// ── Lexer ─────────────────────────────────────────────────────────────────────

/// Mutable scanning state threaded through every lexer call.
#[derive(Debug, Clone)]
pub struct LexerState {
    /// Byte offset of the next unread character.
    pub pos: usize,
    /// 1-based line of the next unread character.
    pub line: u32,
    pub file: Arc<str>,
    /// Pending text of a string literal while escapes are decoded.
    scratch: String,
}

impl LexerState {
    pub fn new(file: impl Into<Arc<str>>) -> Self {
        Self {
            pos: 0,
            line: 1,
            file: file.into(),
            scratch: String::new(),
        }
    }
}

pub struct Lexer<'a> {
    src: &'a str,
    state: LexerState,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str, file: impl Into<Arc<str>>) -> Self {
        Self::with_state(src, LexerState::new(file))
    }

    /// Resume lexing `src` from a saved state.
    pub fn with_state(src: &'a str, state: LexerState) -> Self {
        Lexer { src, state }
    }

    pub fn state(&self) -> &LexerState {
        &self.state
    }

    pub fn line(&self) -> u32 {
        self.state.line
    }

    pub fn file(&self) -> &Arc<str> {
        &self.state.file
    }

    fn peek(&self) -> Option<char> {
        self.src[self.state.pos..].chars().next()
    }

    fn peek2(&self) -> Option<char> {
        self.src[self.state.pos..].chars().nth(1)
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.state.pos += ch.len_utf8();
        if ch == '\n' {
            self.state.line += 1;
        }
        Some(ch)
    }

    fn eat(&mut self, ch: char) -> bool {
        if self.peek() == Some(ch) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn skip_ws_and_comments(&mut self) {
        while let Some(ch) = self.peek() {
            match ch {
                c if c.is_whitespace() => {
                    self.advance();
                }
                '#' => {
                    while !matches!(self.peek(), None | Some('\n')) {
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn token(&self, kind: TokenKind, text: &str, line: u32) -> Token {
        Token {
            kind,
            text: TokenText::new(text),
            line,
            file: Arc::clone(&self.state.file),
        }
    }

    fn read_number(&mut self, start: usize, first: char) -> TokenKind {
        // Hex literal
        if first == '0' && matches!(self.peek(), Some('x' | 'X')) {
            self.advance();
            while matches!(self.peek(), Some(c) if c.is_ascii_hexdigit()) {
                self.advance();
            }
            let hex = &self.src[start + 2..self.state.pos];
            return match u64::from_str_radix(hex, 16) {
                Ok(n) => TokenKind::Number(n as f64),
                Err(_) => TokenKind::Error(LexError::BadNumber),
            };
        }

        while matches!(self.peek(), Some('0'..='9')) {
            self.advance();
        }
        if self.peek() == Some('.') && matches!(self.peek2(), Some('0'..='9')) {
            self.advance();
            while matches!(self.peek(), Some('0'..='9')) {
                self.advance();
            }
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            self.advance();
            if matches!(self.peek(), Some('+' | '-')) {
                self.advance();
            }
            while matches!(self.peek(), Some('0'..='9')) {
                self.advance();
            }
        }
        match self.src[start..self.state.pos].parse::<f64>() {
            Ok(x) if x.is_finite() => TokenKind::Number(x),
            _ => TokenKind::Error(LexError::BadNumber),
        }
    }

    /// Decode a quoted string into `state.scratch`.
    fn read_string(&mut self, quote: char) -> TokenKind {
        self.state.scratch.clear();
        loop {
            match self.peek() {
                None | Some('\n') => return TokenKind::Error(LexError::UnterminatedString),
                Some(c) if c == quote => {
                    self.advance();
                    return TokenKind::Str;
                }
                Some('\\') => {
                    self.advance();
                    match self.advance() {
                        Some('n') => self.state.scratch.push('\n'),
                        Some('t') => self.state.scratch.push('\t'),
                        Some(c) => self.state.scratch.push(c),
                        None => return TokenKind::Error(LexError::UnterminatedString),
                    }
                }
                Some(c) => {
                    self.advance();
                    self.state.scratch.push(c);
                }
            }
        }
    }

    fn read_ident(&mut self) {
        while matches!(
            self.peek(),
            Some('a'..='z' | 'A'..='Z' | '0'..='9' | '_' | '.')
        ) {
            self.advance();
        }
    }

    pub fn next_token(&mut self) -> Token {
        self.skip_ws_and_comments();
        let start = self.state.pos;
        let line = self.state.line;
        let ch = match self.advance() {
            None => return self.token(TokenKind::Eof, "", line),
            Some(c) => c,
        };

        let kind = match ch {
            '0'..='9' => self.read_number(start, ch),
            '"' | '\'' => {
                let kind = self.read_string(ch);
                if kind == TokenKind::Str {
                    let text = TokenText::new(&self.state.scratch);
                    return Token {
                        kind,
                        text,
                        line,
                        file: Arc::clone(&self.state.file),
                    };
                }
                kind
            }
            'a'..='z' | 'A'..='Z' | '_' => {
                self.read_ident();
                TokenKind::Ident
            }
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '!' => {
                if self.eat('=') {
                    TokenKind::Ne
                } else if self.eat('~') {
                    TokenKind::NotGlobMatch
                } else if self.eat('/') {
                    TokenKind::NotRegexMatch
                } else {
                    TokenKind::Bang
                }
            }
            '=' => {
                if self.eat('=') {
                    TokenKind::Eq
                } else if self.eat('~') {
                    TokenKind::GlobMatch
                } else if self.eat('/') {
                    TokenKind::RegexMatch
                } else {
                    TokenKind::Error(LexError::BadChar)
                }
            }
            '<' => {
                if self.eat('=') {
                    TokenKind::Le
                } else {
                    TokenKind::Lt
                }
            }
            '>' => {
                if self.eat('=') {
                    TokenKind::Ge
                } else {
                    TokenKind::Gt
                }
            }
            '&' => {
                if self.eat('&') {
                    TokenKind::And
                } else {
                    TokenKind::Error(LexError::BadChar)
                }
            }
            '|' => {
                if self.eat('|') {
                    TokenKind::Or
                } else {
                    TokenKind::Error(LexError::BadChar)
                }
            }
            '?' => TokenKind::Question,
            ':' => TokenKind::Colon,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semi,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            _ => TokenKind::Error(LexError::BadChar),
        };
        self.token(kind, &self.src[start..self.state.pos], line)
    }

    /// Lex the whole input.  The last token is always [`TokenKind::Eof`].
    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let t = self.next_token();
            let done = t.is_eof();
            tokens.push(t);
            if done {
                break;
            }
        }
        tokens
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
