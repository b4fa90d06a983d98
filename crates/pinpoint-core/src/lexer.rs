//! Lexical scanner for construction-site text.
//!
//! A single byte-level state machine that knows just enough about source
//! text to find identifiers, brackets and punctuation while stepping over
//! string literals (single, triple-quoted and `r`-prefixed) and comments
//! (`//` line, `/* */` block). Bracket matching and call-site detection are
//! both driven from the same token stream.
//!
//! The scanner never fails. Unterminated strings and comments run to end of
//! text, mismatched closers are ignored, and every scan is linear in the
//! length of the input.

use std::ops::Range;

// ============================================================================
// Tokens
// ============================================================================

/// Nesting delimiter kinds. All three share one nesting stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delim {
    Paren,
    Brace,
    Bracket,
}

impl Delim {
    fn from_open(byte: u8) -> Option<Self> {
        match byte {
            b'(' => Some(Delim::Paren),
            b'{' => Some(Delim::Brace),
            b'[' => Some(Delim::Bracket),
            _ => None,
        }
    }

    fn from_close(byte: u8) -> Option<Self> {
        match byte {
            b')' => Some(Delim::Paren),
            b'}' => Some(Delim::Brace),
            b']' => Some(Delim::Bracket),
            _ => None,
        }
    }
}

/// One lexical token. Whitespace and comments produce no tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Identifier (`[A-Za-z_$][A-Za-z0-9_$]*`).
    Ident(Range<usize>),
    /// Opening delimiter at the given offset.
    Open(Delim, usize),
    /// Closing delimiter at the given offset.
    Close(Delim, usize),
    /// String literal, including quotes and any `r` prefix.
    Str(Range<usize>),
    /// Any other single punctuation byte.
    Punct(u8, usize),
    /// Number literals and non-ASCII runs.
    Other(Range<usize>),
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'$'
}

fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

fn is_quote(b: u8) -> bool {
    b == b'"' || b == b'\''
}

// ============================================================================
// Lexer
// ============================================================================

/// Token iterator over a source text, starting at an arbitrary offset.
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(text: &'a str) -> Self {
        Lexer::at(text, 0)
    }

    /// Start lexing at `offset` (clamped to the end of text).
    pub fn at(text: &'a str, offset: usize) -> Self {
        Lexer {
            bytes: text.as_bytes(),
            pos: offset.min(text.len()),
        }
    }

    /// Current byte offset.
    pub fn offset(&self) -> usize {
        self.pos
    }

    fn peek(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.pos + ahead).copied()
    }

    /// Skip whitespace and comments. Returns when positioned on a token byte
    /// or at end of text.
    fn skip_trivia(&mut self) {
        while let Some(b) = self.peek(0) {
            if b.is_ascii_whitespace() {
                self.pos += 1;
            } else if b == b'/' && self.peek(1) == Some(b'/') {
                self.pos = skip_line_comment(self.bytes, self.pos);
            } else if b == b'/' && self.peek(1) == Some(b'*') {
                self.pos = skip_block_comment(self.bytes, self.pos);
            } else {
                return;
            }
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        self.skip_trivia();
        let start = self.pos;
        let b = self.peek(0)?;

        if is_quote(b) {
            self.pos = skip_string(self.bytes, start);
            return Some(Token::Str(start..self.pos));
        }

        if is_ident_start(b) {
            let mut end = start + 1;
            while end < self.bytes.len() && is_ident_continue(self.bytes[end]) {
                end += 1;
            }
            // Raw string prefix: lone `r` directly followed by a quote.
            // The body is scanned with ordinary string rules.
            if end - start == 1 && b == b'r' && self.bytes.get(end).copied().is_some_and(is_quote)
            {
                self.pos = skip_string(self.bytes, end);
                return Some(Token::Str(start..self.pos));
            }
            self.pos = end;
            return Some(Token::Ident(start..end));
        }

        if let Some(delim) = Delim::from_open(b) {
            self.pos += 1;
            return Some(Token::Open(delim, start));
        }
        if let Some(delim) = Delim::from_close(b) {
            self.pos += 1;
            return Some(Token::Close(delim, start));
        }

        if b.is_ascii_digit() || !b.is_ascii() {
            let mut end = start + 1;
            while end < self.bytes.len()
                && (is_ident_continue(self.bytes[end])
                    || self.bytes[end] == b'.'
                    || !self.bytes[end].is_ascii())
            {
                end += 1;
            }
            self.pos = end;
            return Some(Token::Other(start..end));
        }

        self.pos += 1;
        Some(Token::Punct(b, start))
    }
}

// ============================================================================
// Skipping Helpers
// ============================================================================

/// Skip past a string literal whose opening quote is at `pos`.
///
/// A tripled quote opens a triple-quoted string that closes only on the next
/// unescaped triple of the same quote. Otherwise the string closes on the
/// next unescaped matching quote, or stops at a bare newline (the newline is
/// not consumed). A backslash always consumes itself and the next byte.
/// Returns the offset after the string, or end of text if unterminated.
pub fn skip_string(bytes: &[u8], pos: usize) -> usize {
    let quote = bytes[pos];
    let len = bytes.len();
    let triple = bytes.get(pos + 1) == Some(&quote) && bytes.get(pos + 2) == Some(&quote);

    if triple {
        let mut i = pos + 3;
        while i < len {
            if bytes[i] == b'\\' {
                i += 2;
            } else if bytes[i] == quote
                && bytes.get(i + 1) == Some(&quote)
                && bytes.get(i + 2) == Some(&quote)
            {
                return i + 3;
            } else {
                i += 1;
            }
        }
        return len;
    }

    let mut i = pos + 1;
    while i < len {
        match bytes[i] {
            b'\\' => i += 2,
            b'\n' => return i,
            b if b == quote => return i + 1,
            _ => i += 1,
        }
    }
    len
}

/// Skip past a line comment (`//…`) starting at `pos`. Returns the offset
/// after the terminating newline (or end of text).
pub fn skip_line_comment(bytes: &[u8], pos: usize) -> usize {
    match bytes[pos..].iter().position(|&b| b == b'\n') {
        Some(nl) => pos + nl + 1,
        None => bytes.len(),
    }
}

/// Skip past a block comment (`/* … */`) starting at `pos`. Returns the
/// offset after the closing `*/` (or end of text if unterminated).
pub fn skip_block_comment(bytes: &[u8], pos: usize) -> usize {
    let mut i = pos + 2;
    while i + 1 < bytes.len() {
        if bytes[i] == b'*' && bytes[i + 1] == b'/' {
            return i + 2;
        }
        i += 1;
    }
    bytes.len()
}

// ============================================================================
// Bracket Matching
// ============================================================================

/// End of a bracket group scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupEnd {
    /// Offset one past the matching closer, or end of text.
    pub end: usize,
    /// False when end of text was reached before the stack emptied.
    pub complete: bool,
}

/// Find the end of the bracket group opened at `open`.
///
/// `(`, `{` and `[` share one stack. A closer pops only when it matches the
/// opener on top of the stack; a mismatched closer is ignored. Returns `None`
/// when `open` does not sit on an opening delimiter.
pub fn match_group(text: &str, open: usize) -> Option<GroupEnd> {
    Delim::from_open(*text.as_bytes().get(open)?)?;

    let mut stack: Vec<Delim> = Vec::new();
    for token in Lexer::at(text, open) {
        match token {
            Token::Open(delim, _) => stack.push(delim),
            Token::Close(delim, at) => {
                if stack.last() == Some(&delim) {
                    stack.pop();
                    if stack.is_empty() {
                        return Some(GroupEnd {
                            end: at + 1,
                            complete: true,
                        });
                    }
                }
            }
            _ => {}
        }
    }

    Some(GroupEnd {
        end: text.len(),
        complete: false,
    })
}

// ============================================================================
// Call Sites
// ============================================================================

/// An identifier directly followed (modulo whitespace/comments) by `(`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    /// Byte range of the identifier.
    pub name: Range<usize>,
    /// Offset of the opening parenthesis.
    pub open: usize,
}

/// Iterator over every call site in a text, in text order.
pub struct CallSites<'a> {
    lexer: Lexer<'a>,
    previous_ident: Option<Range<usize>>,
}

impl Iterator for CallSites<'_> {
    type Item = CallSite;

    fn next(&mut self) -> Option<CallSite> {
        for token in self.lexer.by_ref() {
            match token {
                Token::Open(Delim::Paren, at) => {
                    if let Some(name) = self.previous_ident.take() {
                        return Some(CallSite { name, open: at });
                    }
                }
                Token::Ident(range) => self.previous_ident = Some(range),
                _ => self.previous_ident = None,
            }
        }
        None
    }
}

/// Enumerate call sites (`Identifier(`) outside strings and comments.
pub fn call_sites(text: &str) -> CallSites<'_> {
    CallSites {
        lexer: Lexer::new(text),
        previous_ident: None,
    }
}

// ============================================================================
// Tests
// ============================================================================
