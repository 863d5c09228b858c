//! Hand-rolled lexer with a one-token lookahead buffer.
//!
//! The parser's element-constructor sub-grammar needs to flush this buffer
//! and read raw characters directly from the source, then cleanly re-enter
//! token mode for `{expr}` holes — a bidirectional mode switch `nom`'s
//! immutable-slice combinators have no natural hook for, which is why this
//! crate hand-rolls the lexer/parser the way `petty_xpath1`'s own
//! `nom`-based `petty_xpath1::parser` approach (see DESIGN.md).

use crate::error::{LexError, Location};

pub const KEYWORDS: &[&str] = &[
    "xform", "version", "import", "as", "ns", "def", "var", "let", "in", "for", "where",
    "return", "if", "then", "else", "match", "case", "default", "and", "or", "not", "div",
    "mod", "rule",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Kw,
    Ident,
    Number,
    Str,
    Op,
    Punct,
    Dot,
    Slash,
    At,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
    pub pos: usize,
}

impl Token {
    fn new(kind: TokenKind, value: impl Into<String>, pos: usize) -> Self {
        Token { kind, value: value.into(), pos }
    }

    pub fn is(&self, kind: TokenKind, value: &str) -> bool {
        self.kind == kind && self.value == value
    }
}

/// A lexer checkpoint: enough state to undo a lookahead that turned out to
/// be wrong (used by the parser to disambiguate `text{...}` from a bare
/// `text` identifier/function name).
#[derive(Debug, Clone)]
pub struct Checkpoint {
    pos: usize,
    buffer: Option<Token>,
}

pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    buffer: Option<Token>,
}

impl Lexer {
    pub fn new(text: &str) -> Self {
        Lexer { chars: text.chars().collect(), pos: 0, buffer: None }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Converts a char offset into a 1-based `(line, col)` pair by scanning
    /// every char before it. Used only when constructing an error, so the
    /// O(n) scan never runs on the hot parsing path.
    pub fn line_col(&self, pos: usize) -> (usize, usize) {
        let mut line = 1;
        let mut col = 1;
        for &ch in self.chars.iter().take(pos.min(self.chars.len())) {
            if ch == '\n' {
                line += 1;
                col = 1;
            } else {
                col += 1;
            }
        }
        (line, col)
    }

    pub fn location(&self, pos: usize) -> Location {
        self.line_col(pos).into()
    }

    /// Discards the buffered token and repositions the cursor, used to
    /// enter or resume raw character-data mode.
    pub fn set_pos(&mut self, pos: usize) {
        self.pos = pos;
        self.buffer = None;
    }

    /// Discards the buffered token without moving the cursor. Valid to call
    /// only when the cursor already sits exactly after the last scanned
    /// token's text (true immediately after a `next()`/`expect()` call).
    pub fn flush(&mut self) {
        self.buffer = None;
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint { pos: self.pos, buffer: self.buffer.clone() }
    }

    pub fn restore(&mut self, checkpoint: Checkpoint) {
        self.pos = checkpoint.pos;
        self.buffer = checkpoint.buffer;
    }

    pub fn peek(&mut self) -> Result<Token, LexError> {
        if self.buffer.is_none() {
            self.buffer = Some(self.scan_token()?);
        }
        Ok(self.buffer.clone().unwrap())
    }

    pub fn next(&mut self) -> Result<Token, LexError> {
        if let Some(tok) = self.buffer.take() {
            return Ok(tok);
        }
        self.scan_token()
    }

    pub fn expect(&mut self, kind: TokenKind, value: Option<&str>) -> Result<Token, LexError> {
        let tok = self.next()?;
        if tok.kind != kind || value.is_some_and(|v| tok.value != v) {
            return Err(LexError::UnexpectedChar {
                ch: self.chars.get(tok.pos).copied().unwrap_or('\0'),
                location: self.location(tok.pos),
            });
        }
        Ok(tok)
    }

    // --- raw character-data mode, used only by the parser's constructor
    // and end-tag sub-grammars ---

    pub fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    pub fn peek_raw_char(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    pub fn advance_raw(&mut self) {
        self.pos += 1;
    }

    pub fn raw_starts_with(&self, needle: &str) -> bool {
        let needle_chars: Vec<char> = needle.chars().collect();
        if self.pos + needle_chars.len() > self.chars.len() {
            return false;
        }
        self.chars[self.pos..self.pos + needle_chars.len()] == needle_chars[..]
    }

    // --- token scanning ---

    fn skip_ws_comments(&mut self) {
        loop {
            match self.chars.get(self.pos) {
                Some(c) if c.is_whitespace() => self.pos += 1,
                Some('#') => {
                    while let Some(c) = self.chars.get(self.pos) {
                        if *c == '\n' {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                _ => break,
            }
        }
    }

    fn scan_token(&mut self) -> Result<Token, LexError> {
        self.skip_ws_comments();
        let start = self.pos;
        let Some(ch) = self.chars.get(self.pos).copied() else {
            return Ok(Token::new(TokenKind::Eof, "", start));
        };

        if ch == ':' && self.chars.get(self.pos + 1) == Some(&'=') {
            self.pos += 2;
            return Ok(Token::new(TokenKind::Op, ":=", start));
        }
        if "(){}[],:;".contains(ch) {
            self.pos += 1;
            return Ok(Token::new(TokenKind::Punct, ch.to_string(), start));
        }
        if ch == '.' {
            if self.raw_starts_with("..") {
                self.pos += 2;
                return Ok(Token::new(TokenKind::Dot, "..", start));
            }
            if self.raw_starts_with(".//") {
                self.pos += 3;
                return Ok(Token::new(TokenKind::Dot, ".//", start));
            }
            self.pos += 1;
            return Ok(Token::new(TokenKind::Dot, ".", start));
        }
        if ch == '/' {
            if self.raw_starts_with("//") {
                self.pos += 2;
                return Ok(Token::new(TokenKind::Slash, "//", start));
            }
            self.pos += 1;
            return Ok(Token::new(TokenKind::Slash, "/", start));
        }
        if "<>=!+-*".contains(ch) {
            self.pos += 1;
            // `=` never doubles: equality is the single-char `=` token, and
            // `match`'s `=>` arrow is parsed as two adjacent `=`/`>` tokens,
            // so a run of `==` must stay two separate `=` tokens.
            if ch != '=' && self.chars.get(self.pos) == Some(&'=') {
                self.pos += 1;
                return Ok(Token::new(TokenKind::Op, format!("{ch}="), start));
            }
            return Ok(Token::new(TokenKind::Op, ch.to_string(), start));
        }
        if ch == '\'' || ch == '"' {
            return self.scan_string(ch, start);
        }
        if ch.is_ascii_digit() {
            while matches!(self.chars.get(self.pos), Some(c) if c.is_ascii_digit() || *c == '.') {
                self.pos += 1;
            }
            let value: String = self.chars[start..self.pos].iter().collect();
            return Ok(Token::new(TokenKind::Number, value, start));
        }
        if ch.is_alphabetic() || ch == '_' {
            while let Some(&c) = self.chars.get(self.pos) {
                if c == ':' {
                    if matches!(self.chars.get(self.pos + 1), Some(n) if n.is_alphanumeric() || *n == '_' || *n == '-')
                    {
                        self.pos += 1;
                        continue;
                    }
                    break;
                }
                if !(c.is_alphanumeric() || c == '_' || c == '-') {
                    break;
                }
                self.pos += 1;
            }
            let value: String = self.chars[start..self.pos].iter().collect();
            if KEYWORDS.contains(&value.as_str()) {
                return Ok(Token::new(TokenKind::Kw, value, start));
            }
            return Ok(Token::new(TokenKind::Ident, value, start));
        }
        if ch == '@' {
            self.pos += 1;
            return Ok(Token::new(TokenKind::At, "@", start));
        }

        Err(LexError::UnexpectedChar { ch, location: self.location(start) })
    }

    fn scan_string(&mut self, quote: char, start: usize) -> Result<Token, LexError> {
        self.pos += 1;
        let mut out = String::new();
        loop {
            let Some(ch) = self.chars.get(self.pos).copied() else {
                return Err(LexError::UnterminatedString { location: self.location(start) });
            };
            if ch == '\\' {
                self.pos += 1;
                let Some(esc) = self.chars.get(self.pos).copied() else {
                    return Err(LexError::UnterminatedString { location: self.location(start) });
                };
                match esc {
                    'n' => out.push('\n'),
                    't' => out.push('\t'),
                    'r' => out.push('\r'),
                    'u' => {
                        let hex: String =
                            self.chars[self.pos + 1..(self.pos + 5).min(self.chars.len())].iter().collect();
                        let code = u32::from_str_radix(&hex, 16)
                            .ok()
                            .and_then(char::from_u32)
                            .unwrap_or('\u{FFFD}');
                        out.push(code);
                        self.pos += 4;
                    }
                    other => out.push(other),
                }
                self.pos += 1;
                continue;
            }
            if ch == quote {
                self.pos += 1;
                return Ok(Token::new(TokenKind::Str, out, start));
            }
            out.push(ch);
            self.pos += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(text: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(text);
        let mut out = Vec::new();
        loop {
            let tok = lexer.next().unwrap();
            let done = tok.kind == TokenKind::Eof;
            out.push(tok);
            if done {
                break;
            }
        }
        out
    }

    #[test]
    fn recognizes_keywords_vs_identifiers() {
        let toks = tokens("let x");
        assert_eq!(toks[0].kind, TokenKind::Kw);
        assert_eq!(toks[1].kind, TokenKind::Ident);
    }

    #[test]
    fn recognizes_qualified_names() {
        let toks = tokens("xsl:template");
        assert_eq!(toks[0].kind, TokenKind::Ident);
        assert_eq!(toks[0].value, "xsl:template");
    }

    #[test]
    fn recognizes_dot_variants() {
        assert_eq!(tokens(".")[0].value, ".");
        assert_eq!(tokens("..")[0].value, "..");
        assert_eq!(tokens(".//")[0].value, ".//");
    }

    #[test]
    fn recognizes_walrus_and_two_char_operators() {
        let toks = tokens(":= <= >= != ==");
        let values: Vec<&str> = toks.iter().map(|t| t.value.as_str()).collect();
        assert_eq!(values, vec![":=", "<=", ">=", "!=", "=", "=", ""]);
    }

    #[test]
    fn string_literal_handles_escapes() {
        let toks = tokens(r#""a\nbAc""#);
        assert_eq!(toks[0].kind, TokenKind::Str);
        assert_eq!(toks[0].value, "a\nbAc");
    }

    #[test]
    fn comments_are_skipped() {
        let toks = tokens("1 # a comment\n2");
        assert_eq!(toks[0].value, "1");
        assert_eq!(toks[1].value, "2");
    }

    #[test]
    fn checkpoint_restores_buffered_lookahead() {
        let mut lexer = Lexer::new("text {");
        let _ = lexer.peek().unwrap();
        let cp = lexer.checkpoint();
        let first = lexer.next().unwrap();
        assert_eq!(first.value, "text");
        lexer.restore(cp);
        let replay = lexer.next().unwrap();
        assert_eq!(replay.value, "text");
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let mut lexer = Lexer::new("\"abc");
        assert!(lexer.next().is_err());
    }
}
