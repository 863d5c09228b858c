//! Lexer and recursive-descent parser for the XForm language.

pub mod error;
pub mod lexer;
pub mod parser;

pub use error::{LexError, ParseError};
pub use lexer::{Lexer, Token, TokenKind};
pub use parser::Parser;

/// Parses a complete XForm module from source text.
pub fn parse_module(source: &str) -> Result<xform_ast::Module, ParseError> {
    Parser::new(source).parse_module()
}
