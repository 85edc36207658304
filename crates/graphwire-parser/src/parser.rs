//! Recursive-descent parser for executable GraphQL documents.
//!
//! Parses the subset of the language needed to pull operation and fragment
//! definitions out of source text:
//!
//! ```text
//! Document            := Definition*
//! Definition          := OperationDefinition | FragmentDefinition
//! OperationDefinition := (OperationType Name?)? VariableDefinitions? Directives? SelectionSet
//! FragmentDefinition  := "fragment" Name "on" Name Directives? SelectionSet
//! SelectionSet        := "{" Selection+ "}"
//! Selection           := Field | FragmentSpread | InlineFragment
//! Field               := Alias? Name Arguments? Directives? SelectionSet?
//! ```
//!
//! Variable definitions, directives, and argument values are validated and
//! consumed but never represented in the AST; a variable default value is
//! rejected outright.

use crate::ast::{
    Definition, Document, Field, FragmentDefinition, FragmentSpread, InlineFragment, Location,
    OperationDefinition, OperationKind, Selection, SelectionSet,
};
use crate::error::{ParseError, SyntaxError};
use crate::lexer::Lexer;
use crate::token::{Token, TokenKind};

/// Parse GraphQL source text into a [`Document`].
///
/// A document with zero definitions is syntactically valid; callers that
/// require at least one operation or fragment reject it themselves.
///
/// # Example
///
/// ```
/// use graphwire_parser::{parse_document, Definition};
///
/// let doc = parse_document("query Hero { hero { name } }").unwrap();
/// assert_eq!(doc.definitions.len(), 1);
/// assert!(matches!(doc.definitions[0], Definition::Operation(_)));
/// ```
pub fn parse_document(source: &str) -> Result<Document, ParseError> {
    Parser::new(source).document()
}

/// A significant token plus the comment attached to it, if any.
type Attached = (Token, Option<String>);

struct Parser<'a> {
    lexer: Lexer<'a>,
    peeked: Option<Attached>,
    /// Comment text waiting to be attached, with the line it ended on.
    pending_comment: Option<(String, u32)>,
    /// End byte offset of the last consumed token.
    prev_end: usize,
    src_len: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            lexer: Lexer::new(source),
            peeked: None,
            pending_comment: None,
            prev_end: 0,
            src_len: source.len(),
        }
    }

    /// Pull the next significant token, folding comment tokens into an
    /// attachment: the most recent comment sticks to the next significant
    /// token when no blank line separates them.
    fn pull(&mut self) -> Result<Attached, ParseError> {
        loop {
            let token = self.lexer.next_token()?;
            if token.kind == TokenKind::Comment {
                self.pending_comment = Some((token.value, token.line));
                continue;
            }
            let comment = match self.pending_comment.take() {
                Some((text, comment_line)) if token.line <= comment_line + 1 => Some(text),
                _ => None,
            };
            return Ok((token, comment));
        }
    }

    fn peek(&mut self) -> Result<&Token, ParseError> {
        if self.peeked.is_none() {
            self.peeked = Some(self.pull()?);
        }
        Ok(&self.peeked.as_ref().expect("just filled").0)
    }

    fn advance(&mut self) -> Result<Attached, ParseError> {
        let attached = match self.peeked.take() {
            Some(attached) => attached,
            None => self.pull()?,
        };
        self.prev_end = attached.0.end;
        Ok(attached)
    }

    fn expected(expected: impl Into<String>, found: &Token) -> ParseError {
        SyntaxError::new(expected, found.describe(), found.line, found.column).into()
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Attached, ParseError> {
        let token = self.peek()?;
        if token.kind == kind {
            self.advance()
        } else {
            Err(Self::expected(kind.describe(), token))
        }
    }

    fn expect_name(&mut self, what: &str) -> Result<Attached, ParseError> {
        let token = self.peek()?;
        if token.kind == TokenKind::Name {
            self.advance()
        } else {
            Err(Self::expected(what, token))
        }
    }

    fn loc_from(&self, token: &Token) -> Location {
        Location {
            line: token.line,
            column: token.column,
            start: token.start,
            end: self.prev_end,
        }
    }

    fn document(&mut self) -> Result<Document, ParseError> {
        let mut definitions = Vec::new();
        loop {
            let token = self.peek()?;
            match token.kind {
                TokenKind::Eof => break,
                TokenKind::Name | TokenKind::BraceOpen => {
                    definitions.push(self.definition()?);
                }
                _ => {
                    return Err(
                        Self::expected("an operation or fragment definition", token)
                    );
                }
            }
        }
        Ok(Document {
            definitions,
            loc: Location {
                line: 1,
                column: 1,
                start: 0,
                end: self.src_len,
            },
        })
    }

    fn definition(&mut self) -> Result<Definition, ParseError> {
        if self.peek()?.kind == TokenKind::BraceOpen {
            // Anonymous shorthand query: bare selection set.
            let (open, comment) = {
                let peeked = self.peeked.as_ref().expect("just peeked");
                (peeked.0.clone(), peeked.1.clone())
            };
            let selection_set = self.selection_set()?;
            return Ok(Definition::Operation(OperationDefinition {
                operation: OperationKind::Query,
                name: None,
                selection_set,
                loc: self.loc_from(&open),
                comment,
            }));
        }

        let keyword = self.peek()?.value.clone();
        match keyword.as_str() {
            "query" | "mutation" | "subscription" => self.operation_definition(),
            "fragment" => self.fragment_definition(),
            _ => {
                let token = self.peek()?.clone();
                Err(Self::expected(
                    "`query`, `mutation`, `subscription`, `fragment`, or `{`",
                    &token,
                ))
            }
        }
    }

    fn operation_definition(&mut self) -> Result<Definition, ParseError> {
        let (keyword, comment) = self.advance()?;
        let operation = match keyword.value.as_str() {
            "query" => OperationKind::Query,
            "mutation" => OperationKind::Mutation,
            _ => OperationKind::Subscription,
        };

        let name = if self.peek()?.kind == TokenKind::Name {
            Some(self.advance()?.0.value)
        } else {
            None
        };

        if self.peek()?.kind == TokenKind::ParenOpen {
            self.variable_definitions()?;
        }
        self.directives()?;
        let selection_set = self.selection_set()?;

        Ok(Definition::Operation(OperationDefinition {
            operation,
            name,
            selection_set,
            loc: self.loc_from(&keyword),
            comment,
        }))
    }

    fn fragment_definition(&mut self) -> Result<Definition, ParseError> {
        let (keyword, comment) = self.advance()?;

        let (name_token, _) = self.expect_name("a fragment name")?;
        if name_token.value == "on" {
            return Err(Self::expected("a fragment name other than `on`", &name_token));
        }

        let (on, _) = self.expect_name("`on`")?;
        if on.value != "on" {
            return Err(Self::expected("`on`", &on));
        }
        let (type_token, _) = self.expect_name("a type condition")?;

        self.directives()?;
        let selection_set = self.selection_set()?;

        Ok(Definition::Fragment(FragmentDefinition {
            name: name_token.value,
            type_condition: type_token.value,
            selection_set,
            loc: self.loc_from(&keyword),
            comment,
        }))
    }

    fn selection_set(&mut self) -> Result<SelectionSet, ParseError> {
        let (open, _) = self.expect(TokenKind::BraceOpen)?;

        let mut selections = Vec::new();
        loop {
            let token = self.peek()?;
            match token.kind {
                TokenKind::BraceClose if selections.is_empty() => {
                    return Err(Self::expected("at least one selection", token));
                }
                TokenKind::BraceClose => {
                    self.advance()?;
                    break;
                }
                _ => selections.push(self.selection()?),
            }
        }

        Ok(SelectionSet {
            selections,
            loc: self.loc_from(&open),
        })
    }

    fn selection(&mut self) -> Result<Selection, ParseError> {
        let token = self.peek()?;
        match token.kind {
            TokenKind::Spread => self.fragment_selection(),
            TokenKind::Name => self.field(),
            _ => Err(Self::expected("a field, fragment spread, or inline fragment", token)),
        }
    }

    /// Parse the selection forms starting with `...`: a fragment spread
    /// (`...Name`) or an inline fragment (`... on T { }` / `... { }`).
    fn fragment_selection(&mut self) -> Result<Selection, ParseError> {
        let (spread, comment) = self.advance()?;

        let next = self.peek()?;
        let next_is_name = next.kind == TokenKind::Name;
        if next_is_name && next.value != "on" {
            let name = self.advance()?.0.value;
            self.directives()?;
            return Ok(Selection::FragmentSpread(FragmentSpread {
                name,
                loc: self.loc_from(&spread),
                comment,
            }));
        }

        let type_condition = if next_is_name {
            self.advance()?; // `on`
            Some(self.expect_name("a type condition")?.0.value)
        } else {
            None
        };
        self.directives()?;
        let selection_set = self.selection_set()?;

        Ok(Selection::InlineFragment(InlineFragment {
            type_condition,
            selection_set,
            loc: self.loc_from(&spread),
            comment,
        }))
    }

    fn field(&mut self) -> Result<Selection, ParseError> {
        let (first, comment) = self.advance()?;

        let (alias, name) = if self.peek()?.kind == TokenKind::Colon {
            self.advance()?;
            let (name_token, _) = self.expect_name("a field name")?;
            (Some(first.value.clone()), name_token.value)
        } else {
            (None, first.value.clone())
        };

        if self.peek()?.kind == TokenKind::ParenOpen {
            self.arguments()?;
        }
        self.directives()?;

        let selection_set = if self.peek()?.kind == TokenKind::BraceOpen {
            Some(self.selection_set()?)
        } else {
            None
        };

        Ok(Selection::Field(Field {
            alias,
            name,
            selection_set,
            loc: self.loc_from(&first),
            comment,
        }))
    }

    /// `( $name : Type ... )` — consumed and checked, not kept. Default
    /// values are an explicit non-goal and rejected.
    fn variable_definitions(&mut self) -> Result<(), ParseError> {
        self.expect(TokenKind::ParenOpen)?;
        loop {
            let token = self.peek()?;
            match token.kind {
                TokenKind::ParenClose => {
                    self.advance()?;
                    return Ok(());
                }
                TokenKind::Dollar => {
                    self.advance()?;
                    self.expect_name("a variable name")?;
                    self.expect(TokenKind::Colon)?;
                    self.type_reference()?;
                    if self.peek()?.kind == TokenKind::Equals {
                        let equals = self.peek()?.clone();
                        return Err(Self::expected(
                            "`)` or another variable definition \
                             (variable default values are not supported)",
                            &equals,
                        ));
                    }
                }
                _ => return Err(Self::expected("`$` or `)`", token)),
            }
        }
    }

    /// `Name`, `[Type]`, or either suffixed with `!`.
    fn type_reference(&mut self) -> Result<(), ParseError> {
        let token = self.peek()?;
        match token.kind {
            TokenKind::Name => {
                self.advance()?;
            }
            TokenKind::BracketOpen => {
                self.advance()?;
                self.type_reference()?;
                self.expect(TokenKind::BracketClose)?;
            }
            _ => return Err(Self::expected("a type", token)),
        }
        if self.peek()?.kind == TokenKind::Bang {
            self.advance()?;
        }
        Ok(())
    }

    /// Zero or more `@name(args)` — consumed, not kept.
    fn directives(&mut self) -> Result<(), ParseError> {
        while self.peek()?.kind == TokenKind::At {
            self.advance()?;
            self.expect_name("a directive name")?;
            if self.peek()?.kind == TokenKind::ParenOpen {
                self.arguments()?;
            }
        }
        Ok(())
    }

    /// `( name : value ... )` — consumed, not kept.
    fn arguments(&mut self) -> Result<(), ParseError> {
        self.expect(TokenKind::ParenOpen)?;
        let mut seen_any = false;
        loop {
            let token = self.peek()?;
            match token.kind {
                TokenKind::ParenClose if seen_any => {
                    self.advance()?;
                    return Ok(());
                }
                TokenKind::Name => {
                    self.advance()?;
                    self.expect(TokenKind::Colon)?;
                    self.value()?;
                    seen_any = true;
                }
                _ => return Err(Self::expected("an argument name", token)),
            }
        }
    }

    /// Any input value: scalar, enum, variable, list, or input object.
    fn value(&mut self) -> Result<(), ParseError> {
        let token = self.peek()?;
        match token.kind {
            TokenKind::Int
            | TokenKind::Float
            | TokenKind::String
            | TokenKind::BlockString
            | TokenKind::Name => {
                self.advance()?;
                Ok(())
            }
            TokenKind::Dollar => {
                self.advance()?;
                self.expect_name("a variable name")?;
                Ok(())
            }
            TokenKind::BracketOpen => {
                self.advance()?;
                while self.peek()?.kind != TokenKind::BracketClose {
                    self.value()?;
                }
                self.advance()?;
                Ok(())
            }
            TokenKind::BraceOpen => {
                self.advance()?;
                while self.peek()?.kind != TokenKind::BraceClose {
                    self.expect_name("an input object field name")?;
                    self.expect(TokenKind::Colon)?;
                    self.value()?;
                }
                self.advance()?;
                Ok(())
            }
            _ => Err(Self::expected("a value", token)),
        }
    }
}
