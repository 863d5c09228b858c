//! Lexer and parser error types.
//!
//! Modeled on `petty_xslt::error::XsltError`: a `thiserror` enum distinguishing
//! the fixed diagnostic codes the language defines from a catch-all positional
//! syntax error. Every variant carries a [`Location`] rather than a raw char
//! offset, following `petty_xslt::error::Location` (`line`/`col`, a
//! `From<(usize, usize)>` impl and a `Display` of `"line L, column C"`) so a
//! caller can report a position without re-deriving it from the source text.

use thiserror::Error;

/// A 1-based line/column position, computed from a char offset by
/// [`crate::lexer::Lexer::line_col`] at the point a lex/parse error is
/// raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub line: usize,
    pub col: usize,
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}, column {}", self.line, self.col)
    }
}

impl From<(usize, usize)> for Location {
    fn from((line, col): (usize, usize)) -> Self {
        Location { line, col }
    }
}

#[derive(Debug, Error)]
pub enum LexError {
    #[error("unterminated string at {location}")]
    UnterminatedString { location: Location },
    #[error("unexpected character {ch:?} at {location}")]
    UnexpectedChar { ch: char, location: Location },
}

#[derive(Debug, Error)]
pub enum ParseError {
    /// `XFST0005`: the `xform version "..."` prologue named an unsupported version.
    #[error("XFST0005: unsupported xform version at {location}")]
    UnsupportedVersion { location: Location },
    #[error("syntax error at {location}: {message}")]
    Syntax { location: Location, message: String },
    #[error(transparent)]
    Lex(#[from] LexError),
}

impl ParseError {
    pub fn syntax(location: Location, message: impl Into<String>) -> Self {
        ParseError::Syntax { location, message: message.into() }
    }
}
