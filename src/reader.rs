// ==============================================================================
// IDL Reader: Protobuf Lexer and Recursive-Descent Parser
// ==============================================================================
//
// Turns the text of a `.proto` file into an `IdlFile`: the `go_package`
// string the output layout is keyed on, the imports in declaration order, and
// the message/enum model the translator needs.
//
// Services and `extend` blocks are consumed but not modelled; nothing
// downstream translates them. Proto2 groups are rejected outright.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, ParseDiagnostic, ParseFailure};
use crate::model::proto::{
    Enum, EnumValue, Field, FieldLabel, FieldType, IdlFile, Import, ImportKind, Message, Oneof,
    Scalar, Syntax,
};

type Result<T> = std::result::Result<T, ParseDiagnostic>;

// ==========================================================================
// Public API
// ==========================================================================

/// Read and parse the protobuf file at `path`.
///
/// Fails with [`Error::Parse`] if the file cannot be read or is not valid
/// protobuf. Imports are listed but not resolved.
pub fn read_idl(path: &Path) -> std::result::Result<IdlFile, Error> {
    let source = fs::read_to_string(path).map_err(|e| Error::Parse {
        path: path.to_path_buf(),
        cause: ParseFailure::Io(e),
    })?;
    parse_proto(&source, &path.display().to_string(), path.to_path_buf()).map_err(|d| {
        Error::Parse {
            path: path.to_path_buf(),
            cause: ParseFailure::Syntax(Box::new(d)),
        }
    })
}

/// Parse protobuf source text. `source_name` is used in diagnostics and
/// `path` is recorded on the returned file.
pub fn parse_proto(source: &str, source_name: &str, path: PathBuf) -> Result<IdlFile> {
    let tokens = Lexer::new(source, source_name).tokenize()?;
    let parser = Parser {
        tokens,
        pos: 0,
        source,
        source_name,
    };
    parser.file(path)
}

// ==========================================================================
// Lexer
// ==========================================================================

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Ident(String),
    Int(i64),
    Float(String),
    Str(String),
    Sym(char),
    Eof,
}

#[derive(Debug, Clone)]
struct Token {
    tok: Tok,
    offset: usize,
    len: usize,
    /// Comment block directly above the token, if any.
    doc: Option<String>,
}

struct Lexer<'a> {
    source: &'a str,
    source_name: &'a str,
    bytes: &'a [u8],
    pos: usize,
    /// A token has already been emitted on the current line, so a comment
    /// here trails that token rather than documenting the next one.
    line_has_token: bool,
    pending_doc: Vec<String>,
    newlines_since_comment: u32,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str, source_name: &'a str) -> Self {
        Lexer {
            source,
            source_name,
            bytes: source.as_bytes(),
            pos: 0,
            line_has_token: false,
            pending_doc: Vec::new(),
            newlines_since_comment: 0,
        }
    }

    fn error(&self, offset: usize, len: usize, message: impl Into<String>) -> ParseDiagnostic {
        ParseDiagnostic::new(self.source_name, self.source, offset, len, message)
    }

    fn peek_byte(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.pos + ahead).copied()
    }

    fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            self.skip_trivia()?;
            let doc = if self.pending_doc.is_empty() {
                None
            } else {
                Some(std::mem::take(&mut self.pending_doc).join("\n"))
            };
            let start = self.pos;
            let Some(c) = self.peek_byte(0) else {
                tokens.push(Token {
                    tok: Tok::Eof,
                    offset: self.source.len(),
                    len: 0,
                    doc: None,
                });
                return Ok(tokens);
            };

            let tok = if c.is_ascii_alphabetic() || c == b'_' {
                while self
                    .peek_byte(0)
                    .is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_')
                {
                    self.pos += 1;
                }
                Tok::Ident(self.source[start..self.pos].to_string())
            } else if c.is_ascii_digit()
                || (c == b'.' && self.peek_byte(1).is_some_and(|b| b.is_ascii_digit()))
            {
                self.number()?
            } else if c == b'"' || c == b'\'' {
                Tok::Str(self.string()?)
            } else if c.is_ascii() {
                self.pos += 1;
                Tok::Sym(c as char)
            } else {
                let ch = self.source[start..].chars().next().unwrap_or('\u{fffd}');
                return Err(self.error(start, ch.len_utf8(), format!("unexpected character `{ch}`")));
            };

            self.line_has_token = true;
            tokens.push(Token {
                tok,
                offset: start,
                len: self.pos - start,
                doc,
            });
        }
    }

    fn skip_trivia(&mut self) -> Result<()> {
        while let Some(c) = self.peek_byte(0) {
            match c {
                b'\n' => {
                    self.pos += 1;
                    self.line_has_token = false;
                    self.newlines_since_comment += 1;
                    // A blank line detaches the comment block above it.
                    if self.newlines_since_comment >= 2 {
                        self.pending_doc.clear();
                    }
                }
                b' ' | b'\t' | b'\r' | 0x0c => self.pos += 1,
                b'/' if self.peek_byte(1) == Some(b'/') => {
                    let start = self.pos + 2;
                    let end = self.source[start..]
                        .find('\n')
                        .map_or(self.source.len(), |i| start + i);
                    let text = self.source[start..end].trim_end();
                    let text = text.strip_prefix(' ').unwrap_or(text).to_string();
                    self.pos = end;
                    self.push_comment(vec![text]);
                }
                b'/' if self.peek_byte(1) == Some(b'*') => {
                    let start = self.pos;
                    let Some(rel_end) = self.source[start + 2..].find("*/") else {
                        return Err(self.error(start, 2, "unterminated block comment"));
                    };
                    let body = &self.source[start + 2..start + 2 + rel_end];
                    self.pos = start + 2 + rel_end + 2;
                    let lines = body
                        .lines()
                        .map(|l| {
                            let l = l.trim();
                            let l = l.strip_prefix('*').unwrap_or(l);
                            l.strip_prefix(' ').unwrap_or(l).to_string()
                        })
                        .collect::<Vec<_>>();
                    // Drop the empty lines left by `/**` and ` */` framing.
                    let first = lines.iter().position(|l| !l.is_empty());
                    let last = lines.iter().rposition(|l| !l.is_empty());
                    if let (Some(first), Some(last)) = (first, last) {
                        self.push_comment(lines[first..=last].to_vec());
                    }
                }
                _ => break,
            }
        }
        Ok(())
    }

    fn push_comment(&mut self, lines: Vec<String>) {
        if self.line_has_token {
            // Trailing comment: belongs to the previous element.
            return;
        }
        self.pending_doc.extend(lines);
        self.newlines_since_comment = 0;
    }

    fn number(&mut self) -> Result<Tok> {
        let start = self.pos;
        if self.peek_byte(0) == Some(b'0') && matches!(self.peek_byte(1), Some(b'x' | b'X')) {
            self.pos += 2;
            while self.peek_byte(0).is_some_and(|b| b.is_ascii_hexdigit()) {
                self.pos += 1;
            }
            let digits = &self.source[start + 2..self.pos];
            return i64::from_str_radix(digits, 16)
                .map(Tok::Int)
                .map_err(|_| self.error(start, self.pos - start, "invalid hexadecimal literal"));
        }

        let mut is_float = false;
        while self.peek_byte(0).is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.peek_byte(0) == Some(b'.') {
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

        let text = &self.source[start..self.pos];
        if is_float {
            return Ok(Tok::Float(text.to_string()));
        }
        let parsed = if text.len() > 1 && text.starts_with('0') {
            i64::from_str_radix(&text[1..], 8)
        } else {
            text.parse::<i64>()
        };
        parsed
            .map(Tok::Int)
            .map_err(|_| self.error(start, text.len(), format!("invalid integer literal `{text}`")))
    }

    fn string(&mut self) -> Result<String> {
        let start = self.pos;
        let Some(quote) = self.peek_byte(0) else {
            return Err(self.error(start, 0, "expected string literal"));
        };
        self.pos += 1;
        let mut out: Vec<u8> = Vec::new();
        loop {
            let Some(c) = self.peek_byte(0) else {
                return Err(self.error(start, self.pos - start, "unterminated string literal"));
            };
            self.pos += 1;
            match c {
                b'\n' => {
                    return Err(self.error(start, self.pos - start, "unterminated string literal"));
                }
                c if c == quote => break,
                b'\\' => self.escape(start, &mut out)?,
                c => out.push(c),
            }
        }
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    fn escape(&mut self, start: usize, out: &mut Vec<u8>) -> Result<()> {
        let Some(c) = self.peek_byte(0) else {
            return Err(self.error(start, self.pos - start, "unterminated string literal"));
        };
        self.pos += 1;
        match c {
            b'n' => out.push(b'\n'),
            b't' => out.push(b'\t'),
            b'r' => out.push(b'\r'),
            b'a' => out.push(0x07),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0c),
            b'v' => out.push(0x0b),
            b'\\' | b'\'' | b'"' | b'?' => out.push(c),
            b'0'..=b'7' => {
                let mut value = u32::from(c - b'0');
                for _ in 0..2 {
                    match self.peek_byte(0) {
                        Some(d @ b'0'..=b'7') => {
                            value = value * 8 + u32::from(d - b'0');
                            self.pos += 1;
                        }
                        _ => break,
                    }
                }
                out.push((value & 0xff) as u8);
            }
            b'x' | b'X' => {
                let digits = self.hex_digits(2);
                let value = u8::from_str_radix(digits, 16)
                    .map_err(|_| self.error(self.pos - 2, 2, "invalid hex escape"))?;
                out.push(value);
            }
            b'u' | b'U' => {
                let width = if c == b'u' { 4 } else { 8 };
                let digits = self.hex_digits(width);
                let ch = u32::from_str_radix(digits, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| self.error(self.pos - 2, 2, "invalid unicode escape"))?;
                let mut buf = [0u8; 4];
                out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
            }
            other => {
                return Err(self.error(
                    self.pos - 2,
                    2,
                    format!("unknown escape sequence `\\{}`", other as char),
                ));
            }
        }
        Ok(())
    }

    fn hex_digits(&mut self, max: usize) -> &'a str {
        let source = self.source;
        let start = self.pos;
        while self.pos - start < max && self.peek_byte(0).is_some_and(|b| b.is_ascii_hexdigit()) {
            self.pos += 1;
        }
        &source[start..self.pos]
    }
}

// ==========================================================================
// Parser
// ==========================================================================

/// An option value. Only strings are consulted (`go_package`, `json_name`);
/// the other forms are parsed so that they can be skipped correctly.
#[derive(Debug, Clone, PartialEq)]
enum Constant {
    Str(String),
    Number,
    Ident(String),
    Aggregate,
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    source: &'a str,
    source_name: &'a str,
}

impl Parser<'_> {
    fn peek(&self) -> &Token {
        // The token list always ends with `Eof`, and `next` never moves past it.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_at(&self, ahead: usize) -> &Tok {
        &self.tokens[(self.pos + ahead).min(self.tokens.len() - 1)].tok
    }

    fn next(&mut self) -> Token {
        let tok = self.peek().clone();
        if tok.tok != Tok::Eof {
            self.pos += 1;
        }
        tok
    }

    fn error_at(&self, token: &Token, message: impl Into<String>) -> ParseDiagnostic {
        ParseDiagnostic::new(
            self.source_name,
            self.source,
            token.offset,
            token.len,
            message,
        )
    }

    fn unexpected(&self, token: &Token, expected: &str) -> ParseDiagnostic {
        let found = match &token.tok {
            Tok::Ident(s) => format!("`{s}`"),
            Tok::Int(i) => format!("`{i}`"),
            Tok::Float(f) => format!("`{f}`"),
            Tok::Str(s) => format!("\"{s}\""),
            Tok::Sym(c) => format!("`{c}`"),
            Tok::Eof => "end of file".to_string(),
        };
        self.error_at(token, format!("expected {expected}, found {found}"))
    }

    fn is_sym(&self, c: char) -> bool {
        self.peek().tok == Tok::Sym(c)
    }

    fn is_word(&self, word: &str) -> bool {
        matches!(&self.peek().tok, Tok::Ident(w) if w == word)
    }

    fn eat_sym(&mut self, c: char) -> bool {
        if self.is_sym(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_sym(&mut self, c: char) -> Result<()> {
        let token = self.next();
        if token.tok == Tok::Sym(c) {
            Ok(())
        } else {
            Err(self.unexpected(&token, &format!("`{c}`")))
        }
    }

    fn ident(&mut self) -> Result<String> {
        let token = self.next();
        match token.tok {
            Tok::Ident(s) => Ok(s),
            _ => Err(self.unexpected(&token, "identifier")),
        }
    }

    /// `ident ("." ident)*`
    fn full_ident(&mut self) -> Result<String> {
        let mut name = self.ident()?;
        while self.is_sym('.') {
            self.pos += 1;
            name.push('.');
            name.push_str(&self.ident()?);
        }
        Ok(name)
    }

    fn string_literal(&mut self) -> Result<String> {
        let token = self.next();
        let Tok::Str(mut s) = token.tok else {
            return Err(self.unexpected(&token, "string literal"));
        };
        // Adjacent literals concatenate.
        while let Tok::Str(more) = &self.peek().tok {
            s.push_str(more);
            self.pos += 1;
        }
        Ok(s)
    }

    fn int_literal(&mut self) -> Result<i64> {
        let negative = self.eat_sym('-');
        let token = self.next();
        match token.tok {
            Tok::Int(i) if negative => Ok(-i),
            Tok::Int(i) => Ok(i),
            _ => Err(self.unexpected(&token, "integer")),
        }
    }

    // ----------------------------------------------------------------------
    // File level
    // ----------------------------------------------------------------------

    fn file(mut self, path: PathBuf) -> Result<IdlFile> {
        let mut file = IdlFile {
            path,
            package: String::new(),
            imports: Vec::new(),
            proto_package: None,
            syntax: Syntax::Proto2,
            messages: Vec::new(),
            enums: Vec::new(),
        };

        loop {
            let token = self.peek().clone();
            let word = match &token.tok {
                Tok::Eof => return Ok(file),
                Tok::Sym(';') => {
                    self.pos += 1;
                    continue;
                }
                Tok::Ident(w) => w.clone(),
                _ => return Err(self.unexpected(&token, "a top-level declaration")),
            };

            match word.as_str() {
                "syntax" | "edition" => {
                    self.pos += 1;
                    self.expect_sym('=')?;
                    let value_token = self.peek().clone();
                    let value = self.string_literal()?;
                    file.syntax = match (word.as_str(), value.as_str()) {
                        ("syntax", "proto2") => Syntax::Proto2,
                        ("syntax", "proto3") => Syntax::Proto3,
                        ("edition", _) => Syntax::Editions,
                        _ => {
                            return Err(self
                                .error_at(&value_token, format!("unknown syntax \"{value}\""))
                                .with_help("use \"proto2\" or \"proto3\""));
                        }
                    };
                    self.expect_sym(';')?;
                }
                "package" => {
                    self.pos += 1;
                    let name = self.full_ident()?;
                    if file.proto_package.is_some() {
                        return Err(self.error_at(&token, "multiple package declarations"));
                    }
                    file.proto_package = Some(name);
                    self.expect_sym(';')?;
                }
                "import" => {
                    self.pos += 1;
                    let kind = if self.is_word("public") {
                        self.pos += 1;
                        ImportKind::Public
                    } else if self.is_word("weak") {
                        self.pos += 1;
                        ImportKind::Weak
                    } else {
                        ImportKind::Default
                    };
                    let path = self.string_literal()?;
                    self.expect_sym(';')?;
                    file.imports.push(Import { path, kind });
                }
                "option" => {
                    self.pos += 1;
                    let (name, value) = self.option_assignment()?;
                    self.expect_sym(';')?;
                    if name == "go_package"
                        && let Constant::Str(s) = value
                    {
                        file.package = s;
                    }
                }
                "message" => {
                    let message = self.message()?;
                    file.messages.push(message);
                }
                "enum" => {
                    let e = self.enum_def()?;
                    file.enums.push(e);
                }
                "service" | "extend" => {
                    self.pos += 1;
                    self.full_ident()?;
                    self.expect_sym('{')?;
                    self.skip_block()?;
                }
                _ => return Err(self.unexpected(&token, "a top-level declaration")),
            }
        }
    }

    /// `optionName "=" constant`, after the `option` keyword or inside `[...]`.
    fn option_assignment(&mut self) -> Result<(String, Constant)> {
        let name = self.option_name()?;
        self.expect_sym('=')?;
        let value = self.constant()?;
        Ok((name, value))
    }

    fn option_name(&mut self) -> Result<String> {
        let mut name = String::new();
        loop {
            if self.eat_sym('(') {
                name.push('(');
                if self.eat_sym('.') {
                    name.push('.');
                }
                name.push_str(&self.full_ident()?);
                self.expect_sym(')')?;
                name.push(')');
            } else {
                name.push_str(&self.ident()?);
            }
            if !self.eat_sym('.') {
                return Ok(name);
            }
            name.push('.');
        }
    }

    fn constant(&mut self) -> Result<Constant> {
        let token = self.peek().clone();
        match &token.tok {
            Tok::Str(_) => Ok(Constant::Str(self.string_literal()?)),
            Tok::Sym('-' | '+') => {
                self.pos += 1;
                let next = self.next();
                match next.tok {
                    Tok::Int(_) | Tok::Float(_) => Ok(Constant::Number),
                    Tok::Ident(w) if w == "inf" || w == "nan" => Ok(Constant::Number),
                    _ => Err(self.unexpected(&next, "number")),
                }
            }
            Tok::Int(_) | Tok::Float(_) => {
                self.pos += 1;
                Ok(Constant::Number)
            }
            Tok::Ident(_) => Ok(Constant::Ident(self.full_ident()?)),
            Tok::Sym('{') => {
                self.pos += 1;
                self.skip_block()?;
                Ok(Constant::Aggregate)
            }
            _ => Err(self.unexpected(&token, "constant")),
        }
    }

    /// Skip to the `}` closing a block whose `{` was already consumed.
    fn skip_block(&mut self) -> Result<()> {
        let mut depth = 1usize;
        loop {
            let token = self.next();
            match token.tok {
                Tok::Sym('{') => depth += 1,
                Tok::Sym('}') => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                Tok::Eof => return Err(self.unexpected(&token, "`}`")),
                _ => {}
            }
        }
    }

    /// Skip a statement such as `reserved 1 to 3;` up to its `;`.
    fn skip_statement(&mut self) -> Result<()> {
        loop {
            let token = self.next();
            match token.tok {
                Tok::Sym(';') => return Ok(()),
                Tok::Eof => return Err(self.unexpected(&token, "`;`")),
                _ => {}
            }
        }
    }

    // ----------------------------------------------------------------------
    // Messages
    // ----------------------------------------------------------------------

    fn message(&mut self) -> Result<Message> {
        let keyword = self.next();
        let name = self.ident()?;
        self.expect_sym('{')?;
        let mut message = Message {
            name,
            doc: keyword.doc,
            fields: Vec::new(),
            oneofs: Vec::new(),
            messages: Vec::new(),
            enums: Vec::new(),
        };

        loop {
            let token = self.peek().clone();
            match &token.tok {
                Tok::Sym('}') => {
                    self.pos += 1;
                    return Ok(message);
                }
                Tok::Sym(';') => self.pos += 1,
                Tok::Eof => return Err(self.unexpected(&token, "`}`")),
                Tok::Ident(w) => match w.as_str() {
                    "message" => message.messages.push(self.message()?),
                    "enum" => message.enums.push(self.enum_def()?),
                    "oneof" => message.oneofs.push(self.oneof()?),
                    "option" => {
                        self.pos += 1;
                        self.option_assignment()?;
                        self.expect_sym(';')?;
                    }
                    "reserved" | "extensions" => self.skip_statement()?,
                    "extend" => {
                        self.pos += 1;
                        self.full_ident()?;
                        self.expect_sym('{')?;
                        self.skip_block()?;
                    }
                    _ => message.fields.push(self.field(true)?),
                },
                Tok::Sym('.') => message.fields.push(self.field(true)?),
                _ => return Err(self.unexpected(&token, "a field or `}`")),
            }
        }
    }

    fn oneof(&mut self) -> Result<Oneof> {
        let keyword = self.next();
        let name = self.ident()?;
        self.expect_sym('{')?;
        let mut oneof = Oneof {
            name,
            doc: keyword.doc,
            fields: Vec::new(),
        };
        loop {
            let token = self.peek().clone();
            match &token.tok {
                Tok::Sym('}') => {
                    self.pos += 1;
                    return Ok(oneof);
                }
                Tok::Sym(';') => self.pos += 1,
                Tok::Ident(w) if w == "option" => {
                    self.pos += 1;
                    self.option_assignment()?;
                    self.expect_sym(';')?;
                }
                Tok::Ident(_) | Tok::Sym('.') => oneof.fields.push(self.field(false)?),
                _ => return Err(self.unexpected(&token, "a field or `}`")),
            }
        }
    }

    fn field(&mut self, allow_label: bool) -> Result<Field> {
        let first = self.peek().clone();
        let mut label = FieldLabel::None;
        if allow_label {
            if let Tok::Ident(w) = &first.tok {
                let parsed = match w.as_str() {
                    "optional" => Some(FieldLabel::Optional),
                    "required" => Some(FieldLabel::Required),
                    "repeated" => Some(FieldLabel::Repeated),
                    _ => None,
                };
                // `optional` etc. are only labels when a type follows them.
                if let Some(parsed) = parsed
                    && matches!(self.peek_at(1), Tok::Ident(_) | Tok::Sym('.'))
                {
                    label = parsed;
                    self.pos += 1;
                }
            }
        }

        if self.is_word("group") && matches!(self.peek_at(1), Tok::Ident(_)) {
            let token = self.peek().clone();
            return Err(self
                .error_at(&token, "groups are not supported")
                .with_help("declare a nested message and a field of that type instead"));
        }

        let ty = if self.is_word("map") && *self.peek_at(1) == Tok::Sym('<') {
            if label != FieldLabel::None {
                return Err(self.error_at(&first, "map fields cannot have a label"));
            }
            self.map_type()?
        } else {
            self.type_name()?
        };

        let name = self.ident()?;
        self.expect_sym('=')?;
        let number = self.int_literal()?;

        let mut json_name = None;
        if self.eat_sym('[') {
            loop {
                let (opt, value) = self.option_assignment()?;
                if opt == "json_name"
                    && let Constant::Str(s) = value
                {
                    json_name = Some(s);
                }
                if self.eat_sym(']') {
                    break;
                }
                self.expect_sym(',')?;
            }
        }
        self.expect_sym(';')?;

        Ok(Field {
            name,
            number,
            label,
            ty,
            json_name,
            doc: first.doc,
        })
    }

    fn type_name(&mut self) -> Result<FieldType> {
        let absolute = self.eat_sym('.');
        let name = self.full_ident()?;
        if !absolute
            && let Some(scalar) = Scalar::from_keyword(&name)
        {
            return Ok(FieldType::Scalar(scalar));
        }
        Ok(FieldType::Named(if absolute {
            format!(".{name}")
        } else {
            name
        }))
    }

    fn map_type(&mut self) -> Result<FieldType> {
        self.pos += 1; // `map`
        self.expect_sym('<')?;
        let key_token = self.peek().clone();
        let key = match self.type_name()? {
            FieldType::Scalar(s) if !matches!(s, Scalar::Double | Scalar::Float | Scalar::Bytes) => s,
            _ => {
                return Err(self.error_at(
                    &key_token,
                    "map keys must be an integer, bool or string type",
                ));
            }
        };
        self.expect_sym(',')?;
        let value = self.type_name()?;
        self.expect_sym('>')?;
        Ok(FieldType::Map {
            key,
            value: Box::new(value),
        })
    }

    // ----------------------------------------------------------------------
    // Enums
    // ----------------------------------------------------------------------

    fn enum_def(&mut self) -> Result<Enum> {
        let keyword = self.next();
        let name = self.ident()?;
        self.expect_sym('{')?;
        let mut e = Enum {
            name,
            doc: keyword.doc,
            values: Vec::new(),
        };
        loop {
            let token = self.peek().clone();
            match &token.tok {
                Tok::Sym('}') => {
                    self.pos += 1;
                    return Ok(e);
                }
                Tok::Sym(';') => self.pos += 1,
                Tok::Ident(w) if w == "option" => {
                    self.pos += 1;
                    self.option_assignment()?;
                    self.expect_sym(';')?;
                }
                Tok::Ident(w) if w == "reserved" => self.skip_statement()?,
                Tok::Ident(_) => {
                    let name = self.ident()?;
                    self.expect_sym('=')?;
                    let number = self.int_literal()?;
                    if self.eat_sym('[') {
                        loop {
                            self.option_assignment()?;
                            if self.eat_sym(']') {
                                break;
                            }
                            self.expect_sym(',')?;
                        }
                    }
                    self.expect_sym(';')?;
                    e.values.push(EnumValue {
                        name,
                        number,
                        doc: token.doc,
                    });
                }
                _ => return Err(self.unexpected(&token, "an enum value or `}`")),
            }
        }
    }
}

// ==========================================================================
// Tests
// ==========================================================================
