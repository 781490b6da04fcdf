// ==============================================================================
// Schema Formatter
// ==============================================================================
//
// Prints a syntax tree in canonical layout: tab indentation, one declaration
// per line, and a blank line around multi-line top-level declarations.

use std::fmt::Write as _;

use super::ast::{Decl, Expr, Field, File, ImportSpec, Label};

/// Render a document as source text, ending in a newline.
pub fn render(file: &File) -> String {
    let mut out = String::new();
    for line in &file.doc {
        push_comment(&mut out, "", line);
    }
    if let Some(package) = &file.package {
        let _ = writeln!(out, "package {package}");
    }

    if !file.imports.is_empty() {
        if !out.is_empty() {
            out.push('\n');
        }
        match file.imports.as_slice() {
            [single] => {
                let _ = writeln!(out, "import {}", import_spec(single));
            }
            many => {
                out.push_str("import (\n");
                for spec in many {
                    let _ = writeln!(out, "\t{}", import_spec(spec));
                }
                out.push_str(")\n");
            }
        }
    }

    let mut previous_multiline = !out.is_empty();
    for (i, decl) in file.decls.iter().enumerate() {
        let text = decl_text(decl, 0);
        let multiline = text.contains('\n');
        if (i > 0 || !out.is_empty()) && (multiline || previous_multiline) {
            out.push('\n');
        }
        out.push_str(&text);
        out.push('\n');
        previous_multiline = multiline;
    }
    out
}

fn import_spec(spec: &ImportSpec) -> String {
    match &spec.alias {
        Some(alias) => format!("{alias} {}", quote(&spec.path)),
        None => quote(&spec.path),
    }
}

fn push_comment(out: &mut String, indent: &str, line: &str) {
    if line.is_empty() {
        let _ = writeln!(out, "{indent}//");
    } else {
        let _ = writeln!(out, "{indent}// {line}");
    }
}

fn tabs(depth: usize) -> String {
    "\t".repeat(depth)
}

/// A declaration at `depth`, without its final newline. The first line
/// carries its own indentation.
fn decl_text(decl: &Decl, depth: usize) -> String {
    let indent = tabs(depth);
    match decl {
        Decl::Field(field) => field_text(field, depth),
        Decl::Pattern { pattern, value } => {
            format!("{indent}[{}]: {}", expr(pattern, depth), expr(value, depth))
        }
        Decl::Embed(e) => format!("{indent}{}", expr(e, depth)),
        Decl::Ellipsis => format!("{indent}..."),
    }
}

fn field_text(field: &Field, depth: usize) -> String {
    let indent = tabs(depth);
    let mut out = String::new();
    for line in &field.doc {
        push_comment(&mut out, &indent, line);
    }
    let _ = write!(
        out,
        "{indent}{}{}: {}",
        label(&field.label),
        if field.optional { "?" } else { "" },
        expr(&field.value, depth)
    );
    for attr in &field.attrs {
        let _ = write!(out, " @{}({})", attr.key, attr.body);
    }
    out
}

fn label(label: &Label) -> String {
    match label {
        Label::Ident(name) if is_identifier(name) => name.clone(),
        Label::Ident(name) | Label::Quoted(name) => quote(name),
    }
}

pub(crate) fn is_identifier(name: &str) -> bool {
    let body = name
        .strip_prefix("_#")
        .or_else(|| name.strip_prefix('#'))
        .unwrap_or(name);
    let mut chars = body.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_ascii_alphabetic() || first == '_' || first == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        && !matches!(
            name,
            "_" | "null" | "true" | "false" | "bool" | "int" | "float" | "number" | "string" | "bytes"
        )
}

/// Quote a string literal, escaping what the lexer unescapes.
pub(crate) fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if (c as u32) < 0x20 || c == '\u{7f}' => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Binding strength, loosest first.
fn precedence(e: &Expr) -> u8 {
    match e {
        Expr::Disjoin(_) => 0,
        Expr::Unify(..) => 1,
        Expr::Default(_) => 2,
        _ => 3,
    }
}

fn operand(e: &Expr, min: u8, depth: usize) -> String {
    if precedence(e) < min {
        format!("({})", expr(e, depth))
    } else {
        expr(e, depth)
    }
}

fn is_simple(e: &Expr) -> bool {
    match e {
        Expr::Struct(decls) => decls.is_empty() || decls == &[Decl::Ellipsis],
        Expr::List { elems, rest } => {
            elems.is_empty() && rest.as_deref().is_none_or(is_simple)
        }
        Expr::Unify(a, b) => is_simple(a) && is_simple(b),
        Expr::Disjoin(alts) => alts.iter().all(is_simple),
        Expr::Default(e) | Expr::Select(e, _) => is_simple(e),
        _ => true,
    }
}

/// An expression whose first line continues the current line and whose
/// closing bracket sits at `depth`.
fn expr(e: &Expr, depth: usize) -> String {
    match e {
        Expr::Top => "_".to_string(),
        Expr::Null => "null".to_string(),
        Expr::Bool(b) => b.to_string(),
        Expr::Int(i) => i.to_string(),
        Expr::Float(f) => format!("{f:?}"),
        Expr::Str(s) => quote(s),
        Expr::Kind(k) => k.as_str().to_string(),
        Expr::Ident(name) => name.clone(),
        Expr::Select(base, sel) => format!("{}.{sel}", operand(base, 3, depth)),
        Expr::Struct(decls) => match decls.as_slice() {
            [] => "{}".to_string(),
            [Decl::Ellipsis] => "{...}".to_string(),
            decls => {
                let mut out = String::from("{\n");
                for decl in decls {
                    out.push_str(&decl_text(decl, depth + 1));
                    out.push('\n');
                }
                out.push_str(&tabs(depth));
                out.push('}');
                out
            }
        },
        Expr::List { elems, rest } => {
            let tail = rest.as_deref().map(|r| match r {
                Expr::Top => "...".to_string(),
                r => format!("...{}", operand(r, 3, depth + 1)),
            });
            if elems.iter().all(is_simple) {
                let mut items: Vec<String> = elems.iter().map(|e| expr(e, depth)).collect();
                items.extend(tail);
                return format!("[{}]", items.join(", "));
            }
            let inner = tabs(depth + 1);
            let mut out = String::from("[\n");
            for elem in elems {
                let _ = writeln!(out, "{inner}{},", expr(elem, depth + 1));
            }
            if let Some(tail) = tail {
                let _ = writeln!(out, "{inner}{tail},");
            }
            out.push_str(&tabs(depth));
            out.push(']');
            out
        }
        Expr::Unify(a, b) => format!("{} & {}", operand(a, 1, depth), operand(b, 2, depth)),
        Expr::Disjoin(alts) => alts
            .iter()
            .map(|a| operand(a, 1, depth))
            .collect::<Vec<_>>()
            .join(" | "),
        Expr::Default(e) => format!("*{}", operand(e, 3, depth)),
    }
}
