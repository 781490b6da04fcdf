// ==============================================================================
// Schema Parser: Lexer With Automatic Commas, Recursive-Descent Parser
// ==============================================================================
//
// Elements are separated by commas, and a newline after a token that can end
// an element counts as one, the same rule Go uses for semicolons. `//` comment
// blocks directly above a field become its documentation.

use super::ast::{Attribute, Decl, Expr, Field, File, ImportSpec, Kind, Label};
use crate::error::ParseDiagnostic;

type Result<T> = std::result::Result<T, ParseDiagnostic>;

/// Parse a schema document.
pub fn parse_file(source: &str, source_name: &str) -> Result<File> {
    let tokens = Lexer::new(source, source_name).tokenize()?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        source,
        source_name,
    };
    parser.file()
}

// ==========================================================================
// Lexer
// ==========================================================================

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),
    Attr(Attribute),
    Sym(&'static str),
    /// A comma, written or implied by a newline.
    Comma,
    Eof,
}

impl Tok {
    /// Whether a newline after this token ends the current element.
    fn ends_element(&self) -> bool {
        matches!(
            self,
            Tok::Ident(_)
                | Tok::Int(_)
                | Tok::Float(_)
                | Tok::Str(_)
                | Tok::Attr(_)
                | Tok::Sym("}" | "]" | ")" | "...")
        )
    }
}

#[derive(Debug, Clone)]
struct Token {
    tok: Tok,
    offset: usize,
    len: usize,
    doc: Vec<String>,
}

struct Lexer<'a> {
    source: &'a str,
    source_name: &'a str,
    bytes: &'a [u8],
    pos: usize,
    tokens: Vec<Token>,
    pending_doc: Vec<String>,
    newlines_since_comment: u32,
    line_has_token: bool,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str, source_name: &'a str) -> Self {
        Lexer {
            source,
            source_name,
            bytes: source.as_bytes(),
            pos: 0,
            tokens: Vec::new(),
            pending_doc: Vec::new(),
            newlines_since_comment: 0,
            line_has_token: false,
        }
    }

    fn error(&self, offset: usize, len: usize, message: impl Into<String>) -> ParseDiagnostic {
        ParseDiagnostic::new(self.source_name, self.source, offset, len, message)
    }

    fn peek_byte(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.pos + ahead).copied()
    }

    fn push(&mut self, tok: Tok, offset: usize) {
        let doc = std::mem::take(&mut self.pending_doc);
        self.tokens.push(Token {
            tok,
            offset,
            len: self.pos - offset,
            doc,
        });
        self.line_has_token = true;
    }

    fn newline(&mut self) {
        if self.tokens.last().is_some_and(|t| t.tok.ends_element()) {
            self.tokens.push(Token {
                tok: Tok::Comma,
                offset: self.pos,
                len: 0,
                doc: Vec::new(),
            });
        }
        self.line_has_token = false;
        self.newlines_since_comment += 1;
        if self.newlines_since_comment >= 2 {
            self.pending_doc.clear();
        }
    }

    fn tokenize(mut self) -> Result<Vec<Token>> {
        while let Some(c) = self.peek_byte(0) {
            let start = self.pos;
            match c {
                b'\n' => {
                    self.pos += 1;
                    self.newline();
                }
                b' ' | b'\t' | b'\r' => self.pos += 1,
                b'/' if self.peek_byte(1) == Some(b'/') => {
                    let end = self.source[start..]
                        .find('\n')
                        .map_or(self.source.len(), |i| start + i);
                    let text = self.source[start + 2..end].trim_end();
                    let text = text.strip_prefix(' ').unwrap_or(text).to_string();
                    self.pos = end;
                    if !self.line_has_token {
                        self.pending_doc.push(text);
                        self.newlines_since_comment = 0;
                    }
                }
                b'"' => {
                    let s = self.string()?;
                    self.push(Tok::Str(s), start);
                }
                b'\'' => {
                    return Err(self.error(start, 1, "byte literals are not supported"));
                }
                b'@' => {
                    let attr = self.attribute()?;
                    self.push(Tok::Attr(attr), start);
                }
                b'.' if self.source[start..].starts_with("...") => {
                    self.pos += 3;
                    self.push(Tok::Sym("..."), start);
                }
                b'0'..=b'9' => {
                    let tok = self.number()?;
                    self.push(tok, start);
                }
                c if c.is_ascii_alphabetic() || c == b'_' || c == b'#' || c == b'$' => {
                    self.pos += 1;
                    if c == b'_' && self.peek_byte(0) == Some(b'#') {
                        self.pos += 1;
                    }
                    while self
                        .peek_byte(0)
                        .is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'$')
                    {
                        self.pos += 1;
                    }
                    let ident = &self.source[start..self.pos];
                    if ident == "#" {
                        return Err(self.error(start, 1, "expected identifier after `#`"));
                    }
                    let ident = ident.to_string();
                    self.push(Tok::Ident(ident), start);
                }
                b',' => {
                    self.pos += 1;
                    self.push(Tok::Comma, start);
                }
                _ => {
                    let sym = match c {
                        b'{' => "{",
                        b'}' => "}",
                        b'[' => "[",
                        b']' => "]",
                        b'(' => "(",
                        b')' => ")",
                        b':' => ":",
                        b'.' => ".",
                        b'&' => "&",
                        b'|' => "|",
                        b'*' => "*",
                        b'?' => "?",
                        b'-' => "-",
                        _ => {
                            let ch = self.source[start..].chars().next().unwrap_or('\u{fffd}');
                            return Err(self.error(
                                start,
                                ch.len_utf8(),
                                format!("unexpected character `{ch}`"),
                            ));
                        }
                    };
                    self.pos += 1;
                    self.push(Tok::Sym(sym), start);
                }
            }
        }
        self.newline();
        self.tokens.push(Token {
            tok: Tok::Eof,
            offset: self.source.len(),
            len: 0,
            doc: Vec::new(),
        });
        Ok(self.tokens)
    }

    fn number(&mut self) -> Result<Tok> {
        let start = self.pos;
        if self.source[start..].starts_with("0x") || self.source[start..].starts_with("0X") {
            self.pos += 2;
            while self
                .peek_byte(0)
                .is_some_and(|b| b.is_ascii_hexdigit() || b == b'_')
            {
                self.pos += 1;
            }
            let digits = self.source[start + 2..self.pos].replace('_', "");
            return i64::from_str_radix(&digits, 16)
                .map(Tok::Int)
                .map_err(|_| self.error(start, self.pos - start, "invalid hexadecimal literal"));
        }
        let mut is_float = false;
        while self
            .peek_byte(0)
            .is_some_and(|b| b.is_ascii_digit() || b == b'_')
        {
            self.pos += 1;
        }
        // `1...` cannot occur, but `[1, ...]` can: only a digit after the dot
        // makes it a fraction.
        if self.peek_byte(0) == Some(b'.') && self.peek_byte(1).is_some_and(|b| b.is_ascii_digit())
        {
            is_float = true;
            self.pos += 1;
            while self.peek_byte(0).is_some_and(|b| b.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        if matches!(self.peek_byte(0), Some(b'e' | b'E')) {
            is_float = true;
            self.pos += 1;
            if matches!(self.peek_byte(0), Some(b'+' | b'-')) {
                self.pos += 1;
            }
            while self.peek_byte(0).is_some_and(|b| b.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        let text = self.source[start..self.pos].replace('_', "");
        let tok = if is_float {
            text.parse::<f64>().ok().map(Tok::Float)
        } else {
            text.parse::<i64>().ok().map(Tok::Int)
        };
        tok.ok_or_else(|| self.error(start, self.pos - start, format!("invalid number `{text}`")))
    }

    fn string(&mut self) -> Result<String> {
        let start = self.pos;
        if self.source[start..].starts_with("\"\"\"") {
            return Err(self.error(start, 3, "multi-line strings are not supported"));
        }
        self.pos += 1;
        let mut out = String::new();
        loop {
            let Some(rest) = self.source.get(self.pos..) else {
                return Err(self.error(start, self.pos - start, "unterminated string literal"));
            };
            let Some(ch) = rest.chars().next() else {
                return Err(self.error(start, self.pos - start, "unterminated string literal"));
            };
            self.pos += ch.len_utf8();
            match ch {
                '"' => return Ok(out),
                '\n' => {
                    return Err(self.error(start, self.pos - start, "unterminated string literal"));
                }
                '\\' => {
                    let Some(esc) = self.peek_byte(0) else {
                        return Err(self.error(start, self.pos - start, "unterminated string literal"));
                    };
                    self.pos += 1;
                    match esc {
                        b'n' => out.push('\n'),
                        b't' => out.push('\t'),
                        b'r' => out.push('\r'),
                        b'a' => out.push('\u{07}'),
                        b'b' => out.push('\u{08}'),
                        b'f' => out.push('\u{0c}'),
                        b'v' => out.push('\u{0b}'),
                        b'\\' => out.push('\\'),
                        b'"' => out.push('"'),
                        b'/' => out.push('/'),
                        b'u' | b'U' => {
                            let width = if esc == b'u' { 4 } else { 8 };
                            let digits = self.source.get(self.pos..self.pos + width).unwrap_or("");
                            let ch = u32::from_str_radix(digits, 16)
                                .ok()
                                .and_then(char::from_u32)
                                .ok_or_else(|| {
                                    self.error(self.pos - 2, 2 + digits.len(), "invalid unicode escape")
                                })?;
                            self.pos += width;
                            out.push(ch);
                        }
                        b'(' => {
                            return Err(self.error(
                                self.pos - 2,
                                2,
                                "string interpolation is not supported",
                            ));
                        }
                        other => {
                            return Err(self.error(
                                self.pos - 2,
                                2,
                                format!("unknown escape sequence `\\{}`", other as char),
                            ));
                        }
                    }
                }
                c => out.push(c),
            }
        }
    }

    fn attribute(&mut self) -> Result<Attribute> {
        let start = self.pos;
        self.pos += 1;
        let key_start = self.pos;
        while self
            .peek_byte(0)
            .is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_')
        {
            self.pos += 1;
        }
        let key = self.source[key_start..self.pos].to_string();
        if key.is_empty() || self.peek_byte(0) != Some(b'(') {
            return Err(self.error(start, self.pos - start, "malformed attribute"));
        }
        self.pos += 1;
        let body_start = self.pos;
        let mut depth = 1usize;
        while let Some(b) = self.peek_byte(0) {
            self.pos += 1;
            match b {
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        let body = self.source[body_start..self.pos - 1].to_string();
                        return Ok(Attribute { key, body });
                    }
                }
                b'\n' => break,
                _ => {}
            }
        }
        Err(self.error(start, self.pos - start, "unterminated attribute"))
    }
}

// ==========================================================================
// Parser
// ==========================================================================

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    source: &'a str,
    source_name: &'a str,
}

impl Parser<'_> {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_tok(&self, ahead: usize) -> &Tok {
        &self.tokens[(self.pos + ahead).min(self.tokens.len() - 1)].tok
    }

    fn next(&mut self) -> Token {
        let token = self.peek().clone();
        if token.tok != Tok::Eof {
            self.pos += 1;
        }
        token
    }

    fn error_at(&self, token: &Token, message: impl Into<String>) -> ParseDiagnostic {
        ParseDiagnostic::new(self.source_name, self.source, token.offset, token.len, message)
    }

    fn unexpected(&self, token: &Token, expected: &str) -> ParseDiagnostic {
        let found = match &token.tok {
            Tok::Ident(s) => format!("`{s}`"),
            Tok::Int(i) => format!("`{i}`"),
            Tok::Float(f) => format!("`{f}`"),
            Tok::Str(s) => format!("\"{s}\""),
            Tok::Attr(a) => format!("`@{}`", a.key),
            Tok::Sym(s) => format!("`{s}`"),
            Tok::Comma if token.len == 0 => "newline".to_string(),
            Tok::Comma => "`,`".to_string(),
            Tok::Eof => "end of file".to_string(),
        };
        self.error_at(token, format!("expected {expected}, found {found}"))
    }

    fn is_sym(&self, sym: &str) -> bool {
        matches!(self.peek_tok(0), Tok::Sym(s) if *s == sym)
    }

    fn eat_sym(&mut self, sym: &str) -> bool {
        if self.is_sym(sym) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_sym(&mut self, sym: &str) -> Result<()> {
        let token = self.next();
        if matches!(&token.tok, Tok::Sym(s) if *s == sym) {
            Ok(())
        } else {
            Err(self.unexpected(&token, &format!("`{sym}`")))
        }
    }

    fn skip_commas(&mut self) {
        while *self.peek_tok(0) == Tok::Comma {
            self.pos += 1;
        }
    }

    /// After an element: a comma, or the closing token (left in place).
    fn end_element(&mut self, close: &str) -> Result<()> {
        if *self.peek_tok(0) == Tok::Comma || self.is_sym(close) {
            return Ok(());
        }
        if close.is_empty() && *self.peek_tok(0) == Tok::Eof {
            return Ok(());
        }
        let token = self.peek().clone();
        let expected = if close.is_empty() {
            "`,` or newline".to_string()
        } else {
            format!("`,` or `{close}`")
        };
        Err(self.unexpected(&token, &expected))
    }

    fn is_keyword(&self, word: &str) -> bool {
        matches!(self.peek_tok(0), Tok::Ident(w) if w == word)
    }

    // ----------------------------------------------------------------------
    // File
    // ----------------------------------------------------------------------

    fn file(&mut self) -> Result<File> {
        let mut file = File::default();
        self.skip_commas();

        if self.is_keyword("package") && matches!(self.peek_tok(1), Tok::Ident(_)) {
            let keyword = self.next();
            file.doc = keyword.doc;
            let name = self.next();
            let Tok::Ident(name) = name.tok else {
                return Err(self.unexpected(&name, "package name"));
            };
            file.package = Some(name);
            self.end_element("")?;
            self.skip_commas();
        }

        while self.is_keyword("import") && !matches!(self.peek_tok(1), Tok::Sym(":" | "?")) {
            self.pos += 1;
            if self.eat_sym("(") {
                loop {
                    self.skip_commas();
                    if self.eat_sym(")") {
                        break;
                    }
                    file.imports.push(self.import_spec()?);
                    self.end_element(")")?;
                }
            } else {
                file.imports.push(self.import_spec()?);
            }
            self.end_element("")?;
            self.skip_commas();
        }

        loop {
            self.skip_commas();
            if *self.peek_tok(0) == Tok::Eof {
                return Ok(file);
            }
            file.decls.push(self.decl()?);
            self.end_element("")?;
        }
    }

    fn import_spec(&mut self) -> Result<ImportSpec> {
        let mut alias = None;
        if let Tok::Ident(name) = self.peek_tok(0) {
            alias = Some(name.clone());
            self.pos += 1;
        }
        let token = self.next();
        match token.tok {
            Tok::Str(path) => Ok(ImportSpec { alias, path }),
            _ => Err(self.unexpected(&token, "import path")),
        }
    }

    // ----------------------------------------------------------------------
    // Declarations
    // ----------------------------------------------------------------------

    fn starts_field(&self) -> bool {
        let label = matches!(self.peek_tok(0), Tok::Ident(_) | Tok::Str(_));
        label
            && (matches!(self.peek_tok(1), Tok::Sym(":"))
                || (matches!(self.peek_tok(1), Tok::Sym("?"))
                    && matches!(self.peek_tok(2), Tok::Sym(":"))))
    }

    fn decl(&mut self) -> Result<Decl> {
        if self.eat_sym("...") {
            return Ok(Decl::Ellipsis);
        }
        if self.is_sym("[") {
            self.pos += 1;
            let pattern = self.expr()?;
            self.expect_sym("]")?;
            self.expect_sym(":")?;
            let value = self.expr()?;
            return Ok(Decl::Pattern { pattern, value });
        }
        if self.starts_field() {
            return Ok(Decl::Field(self.field()?));
        }
        Ok(Decl::Embed(self.expr()?))
    }

    fn field(&mut self) -> Result<Field> {
        let token = self.next();
        let label = match token.tok {
            Tok::Ident(name) => Label::Ident(name),
            Tok::Str(name) => Label::Quoted(name),
            _ => return Err(self.unexpected(&token, "label")),
        };
        let optional = self.eat_sym("?");
        self.expect_sym(":")?;

        // `a: b: c` is shorthand for `a: {b: c}`.
        let value = if self.starts_field() {
            Expr::Struct(vec![Decl::Field(self.field()?)])
        } else {
            self.expr()?
        };

        let mut attrs = Vec::new();
        while let Tok::Attr(attr) = self.peek_tok(0) {
            attrs.push(attr.clone());
            self.pos += 1;
        }

        Ok(Field {
            label,
            optional,
            value,
            attrs,
            doc: token.doc,
        })
    }

    // ----------------------------------------------------------------------
    // Expressions
    // ----------------------------------------------------------------------

    fn expr(&mut self) -> Result<Expr> {
        let first = self.unify()?;
        if !self.is_sym("|") {
            return Ok(first);
        }
        let mut alternatives = vec![first];
        while self.eat_sym("|") {
            alternatives.push(self.unify()?);
        }
        Ok(Expr::Disjoin(alternatives))
    }

    fn unify(&mut self) -> Result<Expr> {
        let mut left = self.unary()?;
        while self.eat_sym("&") {
            let right = self.unary()?;
            left = Expr::Unify(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr> {
        if self.eat_sym("*") {
            return Ok(Expr::Default(Box::new(self.unary()?)));
        }
        if self.is_sym("-") {
            let minus = self.next();
            let token = self.next();
            return match token.tok {
                Tok::Int(i) => Ok(Expr::Int(-i)),
                Tok::Float(f) => Ok(Expr::Float(-f)),
                _ => Err(self.error_at(&minus, "`-` must be followed by a number")),
            };
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr> {
        let mut expr = self.operand()?;
        while self.is_sym(".") {
            self.pos += 1;
            let token = self.next();
            match token.tok {
                Tok::Ident(name) => expr = expr.select(name),
                _ => return Err(self.unexpected(&token, "selector")),
            }
        }
        Ok(expr)
    }

    fn operand(&mut self) -> Result<Expr> {
        let token = self.next();
        match token.tok {
            Tok::Int(i) => Ok(Expr::Int(i)),
            Tok::Float(f) => Ok(Expr::Float(f)),
            Tok::Str(s) => Ok(Expr::Str(s)),
            Tok::Ident(name) => Ok(match name.as_str() {
                "_" => Expr::Top,
                "null" => Expr::Null,
                "true" => Expr::Bool(true),
                "false" => Expr::Bool(false),
                other => match Kind::from_ident(other) {
                    Some(kind) => Expr::Kind(kind),
                    None => Expr::Ident(name),
                },
            }),
            Tok::Sym("(") => {
                let inner = self.expr()?;
                self.expect_sym(")")?;
                Ok(inner)
            }
            Tok::Sym("{") => self.struct_body(),
            Tok::Sym("[") => self.list_body(),
            _ => Err(self.unexpected(&token, "expression")),
        }
    }

    fn struct_body(&mut self) -> Result<Expr> {
        let mut decls = Vec::new();
        loop {
            self.skip_commas();
            if self.eat_sym("}") {
                return Ok(Expr::Struct(decls));
            }
            if *self.peek_tok(0) == Tok::Eof {
                let token = self.peek().clone();
                return Err(self.unexpected(&token, "`}`"));
            }
            decls.push(self.decl()?);
            self.end_element("}")?;
        }
    }

    fn list_body(&mut self) -> Result<Expr> {
        let mut elems = Vec::new();
        let mut rest = None;
        loop {
            self.skip_commas();
            if self.eat_sym("]") {
                return Ok(Expr::List { elems, rest });
            }
            if rest.is_some() {
                let token = self.peek().clone();
                return Err(self.unexpected(&token, "`]` after `...`"));
            }
            if self.eat_sym("...") {
                let tail = if self.is_sym("]") || *self.peek_tok(0) == Tok::Comma {
                    Expr::Top
                } else {
                    self.expr()?
                };
                rest = Some(Box::new(tail));
            } else {
                elems.push(self.expr()?);
            }
            self.end_element("]")?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> File {
        parse_file(source, "test.cue").unwrap_or_else(|e| panic!("parse failed: {e}"))
    }

    #[test]
    fn package_imports_and_fields() {
        let file = parse(
            r#"
// Header.
package pkgv1

import (
	"time"
	dep "example.com/dep/v1"
)

#Msg: {
	// When it happened.
	at?: time.Time @protobuf(1,google.protobuf.Timestamp)
	tags?: [...string] @protobuf(2,string)
}
"#,
        );
        assert_eq!(file.doc, vec!["Header."]);
        assert_eq!(file.package.as_deref(), Some("pkgv1"));
        assert_eq!(file.imports.len(), 2);
        assert_eq!(file.imports[1].name(), "dep");
        let Decl::Field(msg) = &file.decls[0] else {
            panic!("expected a field");
        };
        assert!(msg.label.is_definition());
        let Expr::Struct(decls) = &msg.value else {
            panic!("expected a struct");
        };
        let Decl::Field(at) = &decls[0] else {
            panic!("expected a field");
        };
        assert!(at.optional);
        assert_eq!(at.doc, vec!["When it happened."]);
        assert_eq!(at.value, Expr::ident("time").select("Time"));
        assert_eq!(at.attrs[0].body, "1,google.protobuf.Timestamp");
    }

    #[test]
    fn precedence_of_unify_and_disjoin() {
        let file = parse("a: int & 1 | string\n");
        let Decl::Field(a) = &file.decls[0] else {
            panic!("expected a field");
        };
        assert_eq!(
            a.value,
            Expr::Disjoin(vec![
                Expr::Unify(Box::new(Expr::Kind(Kind::Int)), Box::new(Expr::Int(1))),
                Expr::Kind(Kind::String),
            ])
        );
    }

    #[test]
    fn lists_patterns_and_embeddings() {
        let file = parse(
            r#"
cases: [...#Test] & [
	{
		method: ""
	},
]
m: {[string]: int}
#O: {
	{} | {a: string}
	...
}
"#,
        );
        assert_eq!(file.decls.len(), 3);
        let Decl::Field(m) = &file.decls[1] else {
            panic!("expected a field");
        };
        assert!(matches!(&m.value, Expr::Struct(d) if matches!(d[0], Decl::Pattern { .. })));
        let Decl::Field(o) = &file.decls[2] else {
            panic!("expected a field");
        };
        let Expr::Struct(decls) = &o.value else {
            panic!("expected a struct");
        };
        assert!(matches!(decls[0], Decl::Embed(Expr::Disjoin(_))));
        assert_eq!(decls[1], Decl::Ellipsis);
    }

    #[test]
    fn shorthand_nested_fields() {
        let file = parse("a: b: 1\n");
        let Decl::Field(a) = &file.decls[0] else {
            panic!("expected a field");
        };
        let Expr::Struct(decls) = &a.value else {
            panic!("expected a struct");
        };
        assert!(matches!(&decls[0], Decl::Field(f) if f.value == Expr::Int(1)));
    }

    #[test]
    fn quoted_labels_and_negative_numbers() {
        let file = parse("\"@type\": string\n#E_value: {A: -1, B: 2.5}\n");
        let Decl::Field(t) = &file.decls[0] else {
            panic!("expected a field");
        };
        assert_eq!(t.label, Label::Quoted("@type".into()));
    }

    #[test]
    fn missing_separator_is_reported() {
        let err = parse_file("a: 1 b: 2\n", "bad.cue").expect_err("two fields on one line");
        assert_eq!(err.message, "expected `,` or newline, found `b`");
    }

    #[test]
    fn interpolation_is_rejected() {
        let err = parse_file("a: \"\\(b)\"\n", "bad.cue").expect_err("interpolation");
        assert_eq!(err.message, "string interpolation is not supported");
    }
}
