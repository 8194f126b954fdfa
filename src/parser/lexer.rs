//! Go tokenizer.
//!
//! Produces just enough of the Go token stream to find type declarations:
//! identifiers, literals, operators and semicolons (explicit or inserted at
//! line ends per the Go semicolon rule). Comments and whitespace are dropped;
//! every token keeps its byte span so edits can be spliced into the original.

use crate::model::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Number,
    Rune,
    /// Interpreted string literal, `"..."`.
    String,
    /// Raw string literal, `` `...` ``.
    RawString,
    Op,
    /// Explicit `;` or one inserted at a newline / end of file.
    Semi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn text<'a>(&self, src: &'a str) -> &'a str {
        &src[self.span.start..self.span.end]
    }

    pub fn is_op(&self, src: &str, op: &str) -> bool {
        self.kind == TokenKind::Op && self.text(src) == op
    }

    pub fn is_string(&self) -> bool {
        matches!(self.kind, TokenKind::String | TokenKind::RawString)
    }
}

/// A lexing failure at a byte offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub offset: usize,
    pub message: &'static str,
}

pub const KEYWORDS: &[&str] = &[
    "break", "case", "chan", "const", "continue", "default", "defer", "else",
    "fallthrough", "for", "func", "go", "goto", "if", "import", "interface",
    "map", "package", "range", "return", "select", "struct", "switch", "type",
    "var",
];

/// Operators and punctuation, longest first so greedy matching works.
const OPERATORS: &[&str] = &[
    "<<=", ">>=", "&^=", "...", "&&", "||", "<-", "++", "--", "==", "!=", "<=",
    ">=", ":=", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "<<", ">>", "&^",
    "+", "-", "*", "/", "%", "&", "|", "^", "<", ">", "=", "!", "~", "(", ")",
    "[", "]", "{", "}", ",", ".", ":",
];

pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(&word)
}

/// Byte order mark, ignored at the start of a file.
const BOM: char = '\u{feff}';

/// Tokenize Go source.
pub fn tokenize(src: &str) -> Result<Vec<Token>, LexError> {
    let mut lexer = Lexer {
        src,
        pos: 0,
        tokens: Vec::new(),
    };
    lexer.run()?;
    Ok(lexer.tokens)
}

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    tokens: Vec<Token>,
}

impl Lexer<'_> {
    fn run(&mut self) -> Result<(), LexError> {
        let bytes = self.src.as_bytes();
        if self.src.starts_with(BOM) {
            self.pos = BOM.len_utf8();
        }

        while self.pos < bytes.len() {
            let b = bytes[self.pos];
            match b {
                b' ' | b'\t' | b'\r' => self.pos += 1,
                b'\n' => {
                    self.insert_semi(self.pos);
                    self.pos += 1;
                }
                b'/' if bytes.get(self.pos + 1) == Some(&b'/') => {
                    // Line comment; the newline is handled on the next pass.
                    self.pos = self.src[self.pos..]
                        .find('\n')
                        .map(|n| self.pos + n)
                        .unwrap_or(bytes.len());
                }
                b'/' if bytes.get(self.pos + 1) == Some(&b'*') => {
                    let start = self.pos;
                    let end = self.src[start + 2..]
                        .find("*/")
                        .map(|n| start + 2 + n + 2)
                        .ok_or(LexError {
                            offset: start,
                            message: "comment not terminated",
                        })?;
                    if self.src[start..end].contains('\n') {
                        self.insert_semi(start);
                    }
                    self.pos = end;
                }
                b'"' => self.quoted(b'"', TokenKind::String, "string literal not terminated")?,
                b'\'' => self.quoted(b'\'', TokenKind::Rune, "rune literal not terminated")?,
                b'`' => {
                    let start = self.pos;
                    let end = self.src[start + 1..]
                        .find('`')
                        .map(|n| start + 1 + n + 1)
                        .ok_or(LexError {
                            offset: start,
                            message: "raw string literal not terminated",
                        })?;
                    self.push(TokenKind::RawString, start, end);
                }
                b'0'..=b'9' => self.number(),
                b'.' if bytes.get(self.pos + 1).is_some_and(u8::is_ascii_digit) => self.number(),
                _ => {
                    let ch = self.src[self.pos..].chars().next().unwrap_or_default();
                    if ch == '_' || ch.is_alphabetic() {
                        self.ident();
                    } else if let Some(op) = OPERATORS
                        .iter()
                        .find(|op| self.src[self.pos..].starts_with(**op))
                    {
                        let start = self.pos;
                        self.push(TokenKind::Op, start, start + op.len());
                    } else if ch == ';' {
                        let start = self.pos;
                        self.push(TokenKind::Semi, start, start + 1);
                    } else {
                        return Err(LexError {
                            offset: self.pos,
                            message: "invalid character",
                        });
                    }
                }
            }
        }

        self.insert_semi(self.src.len());
        Ok(())
    }

    fn push(&mut self, kind: TokenKind, start: usize, end: usize) {
        self.tokens.push(Token {
            kind,
            span: Span::new(start, end),
        });
        self.pos = end;
    }

    /// Insert an automatic semicolon if the previous token ends a statement.
    fn insert_semi(&mut self, at: usize) {
        let Some(last) = self.tokens.last() else {
            return;
        };
        let ends_statement = match last.kind {
            TokenKind::Ident => {
                let word = last.text(self.src);
                !is_keyword(word)
                    || matches!(word, "break" | "continue" | "fallthrough" | "return")
            }
            TokenKind::Number | TokenKind::Rune | TokenKind::String | TokenKind::RawString => true,
            TokenKind::Op => matches!(last.text(self.src), ")" | "]" | "}" | "++" | "--"),
            TokenKind::Semi => false,
        };
        if ends_statement {
            self.tokens.push(Token {
                kind: TokenKind::Semi,
                span: Span::new(at, at),
            });
        }
    }

    fn quoted(&mut self, quote: u8, kind: TokenKind, message: &'static str) -> Result<(), LexError> {
        let bytes = self.src.as_bytes();
        let start = self.pos;
        let mut i = start + 1;
        loop {
            match bytes.get(i) {
                None | Some(b'\n') => return Err(LexError { offset: start, message }),
                Some(b'\\') => i += 2,
                Some(&b) if b == quote => break,
                Some(_) => i += 1,
            }
        }
        self.push(kind, start, i + 1);
        Ok(())
    }

    fn number(&mut self) {
        let bytes = self.src.as_bytes();
        let start = self.pos;
        let hex = bytes[start..].starts_with(b"0x") || bytes[start..].starts_with(b"0X");
        let mut i = start;
        while let Some(&b) = bytes.get(i) {
            let exponent_sign = (b == b'+' || b == b'-')
                && i > start
                && match bytes[i - 1] {
                    b'e' | b'E' => !hex,
                    b'p' | b'P' => hex,
                    _ => false,
                };
            if b.is_ascii_alphanumeric() || b == b'_' || b == b'.' || exponent_sign {
                i += 1;
            } else {
                break;
            }
        }
        self.push(TokenKind::Number, start, i);
    }

    fn ident(&mut self) {
        let start = self.pos;
        let len = self.src[start..]
            .char_indices()
            .find(|(_, c)| !(*c == '_' || c.is_alphanumeric()))
            .map(|(n, _)| n)
            .unwrap_or(self.src.len() - start);
        self.push(TokenKind::Ident, start, start + len);
    }
}
