//! Go struct declaration scanner.
//!
//! Walks the token stream and visits every `type` declaration: top level,
//! grouped `type ( ... )` blocks, and local declarations inside function
//! bodies. Struct-typed specs become [`Declaration`]s with their fields;
//! everything else is skipped over.

use super::lexer::{self, Token, TokenKind};
use crate::model::{Declaration, Field, Span, TagAnchor};

/// A scanning failure at a byte offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub offset: usize,
    pub message: String,
}

impl SyntaxError {
    fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }
}

impl From<lexer::LexError> for SyntaxError {
    fn from(err: lexer::LexError) -> Self {
        Self::new(err.offset, err.message)
    }
}

/// Scan Go source and return every struct declaration in visit order.
pub fn parse(src: &str) -> Result<Vec<Declaration>, SyntaxError> {
    let tokens = lexer::tokenize(src)?;
    let mut parser = Parser {
        src,
        tokens,
        pos: 0,
        decls: Vec::new(),
    };
    parser.run()?;
    Ok(parser.decls)
}

struct Parser<'a> {
    src: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    decls: Vec<Declaration>,
}

impl Parser<'_> {
    fn run(&mut self) -> Result<(), SyntaxError> {
        while let Some(tok) = self.peek(0) {
            if tok.kind == TokenKind::Ident && tok.text(self.src) == "type" {
                self.type_decl()?;
            } else {
                self.pos += 1;
            }
        }
        Ok(())
    }

    fn peek(&self, ahead: usize) -> Option<Token> {
        self.tokens.get(self.pos + ahead).copied()
    }

    fn is_op(&self, ahead: usize, op: &str) -> bool {
        self.peek(ahead).is_some_and(|t| t.is_op(self.src, op))
    }

    fn eof_offset(&self) -> usize {
        self.src.len()
    }

    fn expect_token(&self) -> Result<Token, SyntaxError> {
        self.peek(0)
            .ok_or_else(|| SyntaxError::new(self.eof_offset(), "unexpected end of file"))
    }

    /// `type` keyword at `pos`.
    fn type_decl(&mut self) -> Result<(), SyntaxError> {
        self.pos += 1;

        // `x.(type)` in a type switch.
        if self.is_op(0, ")") {
            return Ok(());
        }

        if !self.is_op(0, "(") {
            return self.type_spec();
        }

        self.pos += 1;
        loop {
            let tok = self.expect_token()?;
            match tok.kind {
                TokenKind::Semi => self.pos += 1,
                TokenKind::Op if tok.text(self.src) == ")" => {
                    self.pos += 1;
                    return Ok(());
                }
                _ => self.type_spec()?,
            }
        }
    }

    /// `Name [TypeParams] [=] Type`
    fn type_spec(&mut self) -> Result<(), SyntaxError> {
        let name_tok = self.expect_token()?;
        let name = name_tok.text(self.src);
        if name_tok.kind != TokenKind::Ident || lexer::is_keyword(name) {
            return Err(SyntaxError::new(name_tok.span.start, "expected type name"));
        }
        self.pos += 1;

        if self.is_op(0, "[") && self.starts_type_params() {
            self.pos = self.matching_close(self.pos)? + 1;
        }
        if self.is_op(0, "=") {
            self.pos += 1;
        }

        let is_struct = self
            .peek(0)
            .is_some_and(|t| t.kind == TokenKind::Ident && t.text(self.src) == "struct")
            && self.is_op(1, "{");
        if is_struct {
            let (fields, end) = self.struct_body()?;
            self.decls.push(Declaration {
                name: name.to_string(),
                span: Span::new(name_tok.span.start, end),
                fields,
            });
            Ok(())
        } else {
            self.skip_type()
        }
    }

    /// At `[` after a type name: a type parameter list rather than an array
    /// length? `[T any]`, `[K comparable, V any]`, `[T ~int]` are parameters;
    /// `[N]`, `[4]`, `[N+1]` are array lengths.
    fn starts_type_params(&self) -> bool {
        let (Some(first), Some(second)) = (self.peek(1), self.peek(2)) else {
            return false;
        };
        first.kind == TokenKind::Ident
            && (second.kind == TokenKind::Ident
                || second.is_op(self.src, ",")
                || second.is_op(self.src, "~")
                || second.is_op(self.src, "["))
    }

    /// Index of the bracket closing the one at `open`.
    fn matching_close(&self, open: usize) -> Result<usize, SyntaxError> {
        let mut depth = 0usize;
        for (i, tok) in self.tokens.iter().enumerate().skip(open) {
            if tok.kind != TokenKind::Op {
                continue;
            }
            match tok.text(self.src) {
                "(" | "[" | "{" => depth += 1,
                ")" | "]" | "}" => {
                    depth = depth
                        .checked_sub(1)
                        .ok_or_else(|| SyntaxError::new(tok.span.start, "unbalanced brackets"))?;
                    if depth == 0 {
                        return Ok(i);
                    }
                }
                _ => {}
            }
        }
        let start = self.tokens[open].span.start;
        Err(SyntaxError::new(start, "unclosed bracket"))
    }

    /// Skip a non-struct type expression up to the `;` or `)` ending its spec.
    fn skip_type(&mut self) -> Result<(), SyntaxError> {
        while let Some(tok) = self.peek(0) {
            match tok.kind {
                TokenKind::Semi => return Ok(()),
                TokenKind::Op => match tok.text(self.src) {
                    "(" | "[" | "{" => self.pos = self.matching_close(self.pos)? + 1,
                    ")" => return Ok(()),
                    "]" | "}" => {
                        return Err(SyntaxError::new(tok.span.start, "unbalanced brackets"))
                    }
                    _ => self.pos += 1,
                },
                _ => self.pos += 1,
            }
        }
        Ok(())
    }

    /// `struct { FieldDecl ; ... }` with `pos` at `struct`. Returns the fields
    /// and the end offset of the closing brace.
    fn struct_body(&mut self) -> Result<(Vec<Field>, usize), SyntaxError> {
        let open = self.tokens[self.pos + 1].span.start;
        self.pos += 2;
        let mut fields = Vec::new();

        loop {
            let tok = self
                .peek(0)
                .ok_or_else(|| SyntaxError::new(open, "struct type not closed"))?;
            if tok.kind == TokenKind::Semi {
                self.pos += 1;
                continue;
            }
            if tok.is_op(self.src, "}") {
                self.pos += 1;
                return Ok((fields, tok.span.end));
            }

            let start = self.pos;
            let end = self.field_end(open)?;
            fields.push(self.field(&self.tokens[start..end])?);
            self.pos = end;
        }
    }

    /// Index one past the last token of the field starting at `pos`.
    fn field_end(&self, open: usize) -> Result<usize, SyntaxError> {
        let mut depth = 0usize;
        let mut i = self.pos;
        while let Some(tok) = self.tokens.get(i) {
            match tok.kind {
                TokenKind::Semi if depth == 0 => return Ok(i),
                TokenKind::Op => match tok.text(self.src) {
                    "(" | "[" | "{" => depth += 1,
                    "}" if depth == 0 => return Ok(i),
                    ")" | "]" | "}" => {
                        depth = depth
                            .checked_sub(1)
                            .ok_or_else(|| SyntaxError::new(tok.span.start, "unbalanced brackets"))?;
                    }
                    _ => {}
                },
                _ => {}
            }
            i += 1;
        }
        Err(SyntaxError::new(open, "struct type not closed"))
    }

    /// Build a field from its tokens: `Names Type [Tag]` or `Embedded [Tag]`.
    fn field(&self, toks: &[Token]) -> Result<Field, SyntaxError> {
        let (type_toks, tag) = match toks.split_last() {
            Some((last, rest)) if last.is_string() && !rest.is_empty() => (rest, Some(*last)),
            _ => (toks, None),
        };
        let first = type_toks[0];
        let bad_field = || SyntaxError::new(first.span.start, "invalid struct field");

        let (names, embedded) = if first.is_op(self.src, "*") {
            (vec![self.embedded_name(&type_toks[1..]).ok_or_else(bad_field)?], true)
        } else if first.kind == TokenKind::Ident && !lexer::is_keyword(first.text(self.src)) {
            let name = first.text(self.src).to_string();
            match type_toks.get(1) {
                None => (vec![name], true),
                Some(t) if t.is_op(self.src, ".") => {
                    (vec![self.embedded_name(type_toks).ok_or_else(bad_field)?], true)
                }
                Some(t) if t.is_op(self.src, ",") => (self.name_list(type_toks).ok_or_else(bad_field)?, false),
                Some(t) if t.is_op(self.src, "[") => {
                    // `Name [N]T` is a named array field; `Base[T]` alone is an
                    // embedded generic instance.
                    let close = self.matching_close_in(type_toks, 1).ok_or_else(bad_field)?;
                    (vec![name], close + 1 == type_toks.len())
                }
                Some(_) => (vec![name], false),
            }
        } else {
            return Err(bad_field());
        };

        let anchor = match tag {
            Some(t) => TagAnchor::Replace(t.span),
            None => TagAnchor::Insert(type_toks[type_toks.len() - 1].span.end),
        };
        Ok(Field::new(
            names,
            embedded,
            tag.map(|t| t.text(self.src).to_string()),
            anchor,
        ))
    }

    /// `Name`, `pkg.Name`, optionally followed by type arguments.
    fn embedded_name(&self, toks: &[Token]) -> Option<String> {
        let base = match toks.iter().position(|t| t.is_op(self.src, "[")) {
            Some(i) => &toks[..i],
            None => toks,
        };
        let is_ident = |t: &Token| t.kind == TokenKind::Ident && !lexer::is_keyword(t.text(self.src));
        match base {
            [name] if is_ident(name) => Some(name.text(self.src).to_string()),
            [pkg, dot, name] if is_ident(pkg) && dot.is_op(self.src, ".") && is_ident(name) => {
                Some(name.text(self.src).to_string())
            }
            _ => None,
        }
    }

    /// Identifier list of `A, B, C Type`. A type must follow it.
    fn name_list(&self, toks: &[Token]) -> Option<Vec<String>> {
        let mut names = Vec::new();
        let mut i = 0;
        loop {
            let tok = toks.get(i)?;
            if tok.kind != TokenKind::Ident {
                return None;
            }
            names.push(tok.text(self.src).to_string());
            if toks.get(i + 1)?.is_op(self.src, ",") {
                i += 2;
            } else {
                return Some(names);
            }
        }
    }

    fn matching_close_in(&self, toks: &[Token], open: usize) -> Option<usize> {
        let mut depth = 0usize;
        for (i, tok) in toks.iter().enumerate().skip(open) {
            if tok.kind != TokenKind::Op {
                continue;
            }
            match tok.text(self.src) {
                "(" | "[" | "{" => depth += 1,
                ")" | "]" | "}" => {
                    depth = depth.checked_sub(1)?;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_names(decl: &Declaration) -> Vec<&str> {
        decl.fields.iter().map(|f| f.name()).collect()
    }

    #[test]
    fn simple_struct() {
        let src = "package p\n\ntype Widget struct {\n\tName string `json:\"id\"`\n\tSize int\n}\n";
        let decls = parse(src).unwrap();
        assert_eq!(decls.len(), 1);
        assert_eq!(decls[0].name, "Widget");
        assert_eq!(field_names(&decls[0]), vec!["Name", "Size"]);
        assert_eq!(decls[0].fields[0].tag.as_deref(), Some("`json:\"id\"`"));
        assert_eq!(decls[0].fields[1].tag, None);
        let insert_at = src.find("Size int").unwrap() + "Size int".len();
        assert_eq!(decls[0].fields[1].anchor, TagAnchor::Insert(insert_at));
    }

    #[test]
    fn grouped_and_local_declarations() {
        let src = r#"package p

type (
	ID int
	A struct{ X int }
	B = struct {
		Y string "json:\"y\""
	}
)

func f(v interface{}) {
	type Local struct{ Z bool }
	switch v.(type) {
	}
}
"#;
        let decls = parse(src).unwrap();
        let names: Vec<&str> = decls.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "Local"]);
        assert_eq!(decls[1].fields[0].tag.as_deref(), Some(r#""json:\"y\"""#));
    }

    #[test]
    fn non_struct_types_skipped() {
        let src = "package p\ntype M map[string]struct{ A int }\ntype F func() struct{}\ntype Arr [4]struct{ B int }\ntype I interface{ M() }\n";
        assert!(parse(src).unwrap().is_empty());
    }

    #[test]
    fn generic_struct() {
        let src = "package p\ntype Box[T any, K comparable] struct {\n\tValue T `json:\"v\"`\n}\n";
        let decls = parse(src).unwrap();
        assert_eq!(decls[0].name, "Box");
        assert_eq!(field_names(&decls[0]), vec!["Value"]);
    }

    #[test]
    fn field_shapes() {
        let src = r#"package p
type S struct {
	A, B int `json:"a"`
	*Base
	io.Reader `json:"-"`
	*pkg.Thing
	List[int]
	Arr [4]int
	Inner struct {
		Deep string `json:"deep"`
	} `json:"inner"`
	Fn func(a, b int) (int, error)
	Ch <-chan map[string][]byte
}
"#;
        let decls = parse(src).unwrap();
        let s = &decls[0];
        assert_eq!(
            field_names(s),
            vec!["A", "Base", "Reader", "Thing", "List", "Arr", "Inner", "Fn", "Ch"]
        );
        assert_eq!(s.fields[0].names, vec!["A", "B"]);
        let embedded: Vec<bool> = s.fields.iter().map(|f| f.embedded).collect();
        assert_eq!(
            embedded,
            vec![false, true, true, true, true, false, false, false, false]
        );
        assert_eq!(s.fields[2].tag.as_deref(), Some("`json:\"-\"`"));
        assert_eq!(s.fields[6].tag.as_deref(), Some("`json:\"inner\"`"));
    }

    #[test]
    fn single_line_struct() {
        let decls = parse("package p; type P struct { X, Y float64; Label string `json:\"l\"` }").unwrap();
        assert_eq!(field_names(&decls[0]), vec!["X", "Label"]);
    }

    #[test]
    fn empty_struct() {
        let decls = parse("package p\ntype E struct{}\n").unwrap();
        assert_eq!(decls[0].name, "E");
        assert!(decls[0].fields.is_empty());
    }

    #[test]
    fn unclosed_struct_fails() {
        let err = parse("package p\ntype S struct {\n\tA int\n").unwrap_err();
        assert_eq!(err.message, "struct type not closed");
    }

    #[test]
    fn missing_type_name_fails() {
        let err = parse("package p\ntype struct{}\n").unwrap_err();
        assert_eq!(err.message, "expected type name");
    }

    #[test]
    fn tag_without_type_fails() {
        let err = parse("package p\ntype S struct {\n\t`json:\"x\"`\n}\n").unwrap_err();
        assert_eq!(err.message, "invalid struct field");
    }
}
