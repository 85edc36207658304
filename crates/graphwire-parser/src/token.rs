//! Tokens produced by the lexer.

/// The kind of a lexed token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// `{`
    BraceOpen,
    /// `}`
    BraceClose,
    /// `(`
    ParenOpen,
    /// `)`
    ParenClose,
    /// `[`
    BracketOpen,
    /// `]`
    BracketClose,
    /// `:`
    Colon,
    /// `$`
    Dollar,
    /// `@`
    At,
    /// `...`
    Spread,
    /// `=`
    Equals,
    /// `|`
    Pipe,
    /// `!`
    Bang,
    /// An identifier matching `[_A-Za-z][_0-9A-Za-z]*`.
    Name,
    /// An integer literal.
    Int,
    /// A floating-point literal.
    Float,
    /// A quoted string literal (value is the decoded contents).
    String,
    /// A triple-quoted block string (value is the raw inner text).
    BlockString,
    /// A `#` comment running to end of line (value excludes the `#`).
    Comment,
    /// End of input.
    Eof,
}

impl TokenKind {
    /// Human-readable description, used in syntax error messages.
    pub fn describe(self) -> &'static str {
        match self {
            Self::BraceOpen => "`{`",
            Self::BraceClose => "`}`",
            Self::ParenOpen => "`(`",
            Self::ParenClose => "`)`",
            Self::BracketOpen => "`[`",
            Self::BracketClose => "`]`",
            Self::Colon => "`:`",
            Self::Dollar => "`$`",
            Self::At => "`@`",
            Self::Spread => "`...`",
            Self::Equals => "`=`",
            Self::Pipe => "`|`",
            Self::Bang => "`!`",
            Self::Name => "a name",
            Self::Int => "an integer",
            Self::Float => "a float",
            Self::String => "a string",
            Self::BlockString => "a block string",
            Self::Comment => "a comment",
            Self::Eof => "end of input",
        }
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.describe())
    }
}

/// A single lexed token with its source position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// What kind of token this is.
    pub kind: TokenKind,
    /// The token's value: the identifier text for names, the literal text
    /// for numbers, the decoded contents for strings, the comment text for
    /// comments, and the lexeme for punctuation.
    pub value: String,
    /// Line number where the token starts (1-indexed).
    pub line: u32,
    /// Column number where the token starts (1-indexed).
    pub column: u32,
    /// Byte offset of the token's first byte.
    pub start: usize,
    /// Byte offset one past the token's last byte.
    pub end: usize,
}

impl Token {
    /// Description of this token for error messages, e.g. ``name `hero```.
    pub fn describe(&self) -> String {
        match self.kind {
            TokenKind::Name => format!("name `{}`", self.value),
            TokenKind::Int | TokenKind::Float => format!("`{}`", self.value),
            _ => self.kind.describe().to_string(),
        }
    }
}
