//! GraphQL lexer.
//!
//! Produces a lazy sequence of [`Token`]s from source text. Whitespace and
//! commas are insignificant and skipped; comments are real tokens so that
//! the parser can attach them to the node that follows. Invalid input is
//! never silently skipped: lexing stops at the first [`LexError`].

use crate::error::{LexError, LexErrorKind};
use crate::token::{Token, TokenKind};

/// A lazy tokenizer over GraphQL source text.
///
/// `Lexer` implements [`Iterator`], yielding `Result<Token, LexError>` until
/// the end-of-input token has been produced once.
///
/// # Example
///
/// ```
/// use graphwire_parser::{Lexer, TokenKind};
///
/// let kinds: Vec<_> = Lexer::new("query { hero }")
///     .map(|t| t.unwrap().kind)
///     .collect();
/// assert_eq!(
///     kinds,
///     [
///         TokenKind::Name,
///         TokenKind::BraceOpen,
///         TokenKind::Name,
///         TokenKind::BraceClose,
///         TokenKind::Eof,
///     ]
/// );
/// ```
pub struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    line: u32,
    column: u32,
    finished: bool,
}

impl<'a> Lexer<'a> {
    /// Create a lexer over the given source text.
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            line: 1,
            column: 1,
            finished: false,
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        let mut chars = self.src[self.pos..].chars();
        chars.next();
        chars.next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn skip_ignored(&mut self) {
        while let Some(c) = self.peek_char() {
            // Commas are insignificant in GraphQL, same as whitespace.
            if c.is_whitespace() || c == ',' || c == '\u{feff}' {
                self.bump();
            } else {
                break;
            }
        }
    }

    fn error(&self, kind: LexErrorKind, offset: usize, line: u32, column: u32) -> LexError {
        LexError::new(kind, offset, line, column)
    }

    fn token(
        &self,
        kind: TokenKind,
        value: impl Into<String>,
        start: usize,
        line: u32,
        column: u32,
    ) -> Token {
        Token {
            kind,
            value: value.into(),
            line,
            column,
            start,
            end: self.pos,
        }
    }

    /// Lex the next token, skipping insignificant characters first.
    pub fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_ignored();

        let start = self.pos;
        let line = self.line;
        let column = self.column;

        let Some(c) = self.peek_char() else {
            return Ok(self.token(TokenKind::Eof, "", start, line, column));
        };

        let punct = |kind: TokenKind| -> Option<TokenKind> { Some(kind) };
        let simple = match c {
            '{' => punct(TokenKind::BraceOpen),
            '}' => punct(TokenKind::BraceClose),
            '(' => punct(TokenKind::ParenOpen),
            ')' => punct(TokenKind::ParenClose),
            '[' => punct(TokenKind::BracketOpen),
            ']' => punct(TokenKind::BracketClose),
            ':' => punct(TokenKind::Colon),
            '$' => punct(TokenKind::Dollar),
            '@' => punct(TokenKind::At),
            '=' => punct(TokenKind::Equals),
            '|' => punct(TokenKind::Pipe),
            '!' => punct(TokenKind::Bang),
            _ => None,
        };
        if let Some(kind) = simple {
            self.bump();
            return Ok(self.token(kind, c, start, line, column));
        }

        match c {
            '.' => {
                if self.peek_second() == Some('.') {
                    self.bump();
                    self.bump();
                    if self.peek_char() == Some('.') {
                        self.bump();
                        return Ok(self.token(TokenKind::Spread, "...", start, line, column));
                    }
                }
                Err(self.error(LexErrorKind::UnexpectedCharacter('.'), start, line, column))
            }
            '#' => {
                self.bump();
                let text_start = self.pos;
                while let Some(c) = self.peek_char() {
                    if c == '\n' {
                        break;
                    }
                    self.bump();
                }
                let text = self.src[text_start..self.pos].trim().to_string();
                Ok(self.token(TokenKind::Comment, text, start, line, column))
            }
            '"' => self.lex_string(start, line, column),
            '-' | '0'..='9' => self.lex_number(start, line, column),
            '_' | 'a'..='z' | 'A'..='Z' => {
                while let Some(c) = self.peek_char() {
                    if c == '_' || c.is_ascii_alphanumeric() {
                        self.bump();
                    } else {
                        break;
                    }
                }
                let value = &self.src[start..self.pos];
                Ok(self.token(TokenKind::Name, value, start, line, column))
            }
            other => Err(self.error(
                LexErrorKind::UnexpectedCharacter(other),
                start,
                line,
                column,
            )),
        }
    }

    fn lex_number(&mut self, start: usize, line: u32, column: u32) -> Result<Token, LexError> {
        if self.peek_char() == Some('-') {
            self.bump();
        }
        self.eat_digits();

        let mut is_float = false;
        if self.peek_char() == Some('.') && self.peek_second().is_some_and(|c| c.is_ascii_digit())
        {
            is_float = true;
            self.bump();
            self.eat_digits();
        }
        if matches!(self.peek_char(), Some('e' | 'E')) {
            is_float = true;
            self.bump();
            if matches!(self.peek_char(), Some('+' | '-')) {
                self.bump();
            }
            self.eat_digits();
        }

        let kind = if is_float {
            TokenKind::Float
        } else {
            TokenKind::Int
        };
        let value = &self.src[start..self.pos];
        Ok(self.token(kind, value, start, line, column))
    }

    fn eat_digits(&mut self) {
        while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
    }

    fn lex_string(&mut self, start: usize, line: u32, column: u32) -> Result<Token, LexError> {
        self.bump(); // opening quote

        if self.peek_char() == Some('"') && self.peek_second() == Some('"') {
            self.bump();
            self.bump();
            return self.lex_block_string(start, line, column);
        }
        let mut value = String::new();
        loop {
            match self.peek_char() {
                None | Some('\n') => {
                    return Err(self.error(LexErrorKind::UnterminatedString, start, line, column));
                }
                Some('"') => {
                    self.bump();
                    return Ok(self.token(TokenKind::String, value, start, line, column));
                }
                Some('\\') => {
                    self.bump();
                    let Some(esc) = self.bump() else {
                        return Err(self.error(
                            LexErrorKind::UnterminatedString,
                            start,
                            line,
                            column,
                        ));
                    };
                    match esc {
                        '"' => value.push('"'),
                        '\\' => value.push('\\'),
                        '/' => value.push('/'),
                        'b' => value.push('\u{0008}'),
                        'f' => value.push('\u{000c}'),
                        'n' => value.push('\n'),
                        'r' => value.push('\r'),
                        't' => value.push('\t'),
                        'u' => {
                            let mut code = 0u32;
                            for _ in 0..4 {
                                let Some(d) = self.bump().and_then(|c| c.to_digit(16)) else {
                                    return Err(self.error(
                                        LexErrorKind::UnterminatedString,
                                        start,
                                        line,
                                        column,
                                    ));
                                };
                                code = code * 16 + d;
                            }
                            value.push(char::from_u32(code).unwrap_or('\u{fffd}'));
                        }
                        other => value.push(other),
                    }
                }
                Some(c) => {
                    self.bump();
                    value.push(c);
                }
            }
        }
    }

    fn lex_block_string(&mut self, start: usize, line: u32, column: u32) -> Result<Token, LexError> {
        let text_start = self.pos;
        loop {
            match self.peek_char() {
                None => {
                    return Err(self.error(LexErrorKind::UnterminatedString, start, line, column));
                }
                Some('"') => {
                    if self.peek_second() == Some('"') {
                        let text_end = self.pos;
                        self.bump();
                        self.bump();
                        if self.peek_char() == Some('"') {
                            self.bump();
                            let value = self.src[text_start..text_end].to_string();
                            return Ok(self.token(
                                TokenKind::BlockString,
                                value,
                                start,
                                line,
                                column,
                            ));
                        }
                    } else {
                        self.bump();
                    }
                }
                Some('\\') => {
                    // The only escape inside a block string is `\"""`.
                    self.bump();
                    if self.peek_char() == Some('"') {
                        self.bump();
                    }
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let result = self.next_token();
        match &result {
            Ok(token) if token.kind == TokenKind::Eof => self.finished = true,
            Err(_) => self.finished = true,
            _ => {}
        }
        Some(result)
    }
}
