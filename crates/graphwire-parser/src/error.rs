//! Lexing and parsing errors.

/// What went wrong while lexing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexErrorKind {
    /// A character that cannot start any token.
    UnexpectedCharacter(char),
    /// A string literal that reached end of input (or a raw newline in a
    /// single-quoted string) before its closing quote.
    UnterminatedString,
}

impl std::fmt::Display for LexErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnexpectedCharacter(c) => write!(f, "unexpected character `{c}`"),
            Self::UnterminatedString => write!(f, "unterminated string"),
        }
    }
}

/// A lexing error with byte offset and 1-based source position.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at {line}:{column}")]
pub struct LexError {
    /// The category of lexing failure.
    pub kind: LexErrorKind,
    /// Byte offset into the source where the error starts.
    pub offset: usize,
    /// Line number (1-indexed).
    pub line: u32,
    /// Column number (1-indexed).
    pub column: u32,
}

impl LexError {
    /// Create a new lex error at the given position.
    pub fn new(kind: LexErrorKind, offset: usize, line: u32, column: u32) -> Self {
        Self {
            kind,
            offset,
            line,
            column,
        }
    }
}

/// A parse error naming what was expected and what was found.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("expected {expected}, found {found} at {line}:{column}")]
pub struct SyntaxError {
    /// Description of the expected token kind(s), e.g. "`{`" or "a name".
    pub expected: String,
    /// Description of the token actually found.
    pub found: String,
    /// Line number (1-indexed).
    pub line: u32,
    /// Column number (1-indexed).
    pub column: u32,
}

impl SyntaxError {
    /// Create a new syntax error at the given position.
    pub fn new(
        expected: impl Into<String>,
        found: impl Into<String>,
        line: u32,
        column: u32,
    ) -> Self {
        Self {
            expected: expected.into(),
            found: found.into(),
            line,
            column,
        }
    }
}

/// Any failure while turning source text into a document.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// The lexer rejected the input.
    #[error(transparent)]
    Lex(#[from] LexError),
    /// The token stream did not match the grammar.
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
}

impl ParseError {
    /// The 1-based line where the error occurred.
    pub fn line(&self) -> u32 {
        match self {
            Self::Lex(e) => e.line,
            Self::Syntax(e) => e.line,
        }
    }

    /// The 1-based column where the error occurred.
    pub fn column(&self) -> u32 {
        match self {
            Self::Lex(e) => e.column,
            Self::Syntax(e) => e.column,
        }
    }
}
