//! A small parser for executable GraphQL documents.
//!
//! This crate turns GraphQL source text into a lightweight AST carrying
//! operation and fragment definitions, their selection sets, source spans,
//! and attached comments. It parses exactly what a client needs to split a
//! document into transmittable operations; schema definitions, type system
//! extensions, and semantic validation are out of scope.
//!
//! The two entry points are [`parse_document`] for a full parse and
//! [`Lexer`] for raw token streams.
//!
//! ```
//! use graphwire_parser::{parse_document, Definition, OperationKind};
//!
//! let doc = parse_document("query Hero { hero { name } }")?;
//! let Definition::Operation(op) = &doc.definitions[0] else { unreachable!() };
//! assert_eq!(op.operation, OperationKind::Query);
//! assert_eq!(op.name.as_deref(), Some("Hero"));
//! # Ok::<(), graphwire_parser::ParseError>(())
//! ```

mod ast;
mod error;
mod lexer;
mod parser;
mod token;

pub use ast::{
    Definition, Descendants, Document, Field, FragmentDefinition, FragmentSpread, InlineFragment,
    Location, NodeKind, NodeRef, OperationDefinition, OperationKind, Selection, SelectionSet,
};
pub use error::{LexError, LexErrorKind, ParseError, SyntaxError};
pub use lexer::Lexer;
pub use parser::parse_document;
pub use token::{Token, TokenKind};
