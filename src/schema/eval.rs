// ==============================================================================
// Schema Evaluation: Unification Over a Value Lattice
// ==============================================================================
//
// Evaluation turns a syntax tree into a `Value`. Every constraint on a field
// is unified into one value; conflicts become `Value::Bottom` in place, so a
// single pass can report every problem with its path.
//
// References resolve lexically. A reference that re-enters a field already
// being evaluated (a recursive definition such as a tree node) yields `_`, and
// results computed under such a cut are not cached. Selecting a nested
// definition (`#Node.#Kind`) descends into the declaring struct literal, so
// it does not re-enter the enclosing field.

use std::collections::HashMap;
use std::fmt;

use indexmap::IndexMap;

use super::Runtime;
use super::ast::{Decl, Expr, File, ImportSpec, Kind, is_definition};
use crate::suggest::did_you_mean;

const BOOL: u8 = 1;
const INT: u8 = 2;
const FLOAT: u8 = 4;
const STRING: u8 = 8;
const BYTES: u8 = 16;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Value {
    /// `_`: any value.
    Top,
    /// An error.
    Bottom(String),
    /// A set of basic types, e.g. `int` or `number`.
    Kinds(u8),
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Struct(StructVal),
    List(ListVal),
    /// Two or more alternatives, none of them erroneous.
    Disj(Vec<Value>),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct StructVal {
    pub fields: IndexMap<String, FieldVal>,
    pub patterns: Vec<(Value, Value)>,
    pub closed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FieldVal {
    pub value: Value,
    pub optional: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ListVal {
    pub elems: Vec<Value>,
    pub rest: Option<Box<Value>>,
}

fn kind_bits(kind: Kind) -> u8 {
    match kind {
        Kind::Bool => BOOL,
        Kind::Int => INT,
        Kind::Float => FLOAT,
        Kind::Number => INT | FLOAT,
        Kind::String => STRING,
        Kind::Bytes => BYTES,
    }
}

fn scalar_bits(value: &Value) -> Option<u8> {
    match value {
        Value::Bool(_) => Some(BOOL),
        Value::Int(_) => Some(INT),
        Value::Float(_) => Some(FLOAT),
        Value::Str(_) => Some(STRING),
        _ => None,
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Top => f.write_str("_"),
            Value::Bottom(_) => f.write_str("_|_"),
            Value::Kinds(bits) => {
                let names: Vec<&str> = [
                    (BOOL, "bool"),
                    (INT, "int"),
                    (FLOAT, "float"),
                    (STRING, "string"),
                    (BYTES, "bytes"),
                ]
                .iter()
                .filter(|(bit, _)| bits & bit != 0)
                .map(|(_, name)| *name)
                .collect();
                f.write_str(&names.join(" | "))
            }
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x:?}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Struct(_) => f.write_str("struct"),
            Value::List(_) => f.write_str("list"),
            Value::Disj(alts) => {
                let parts: Vec<String> = alts.iter().map(ToString::to_string).collect();
                f.write_str(&parts.join(" | "))
            }
        }
    }
}

fn conflict(a: &Value, b: &Value) -> Value {
    Value::Bottom(format!("conflicting values {a} and {b}"))
}

// ==========================================================================
// Lattice Operations
// ==========================================================================

/// The meet of two values.
pub(crate) fn unify(a: Value, b: Value) -> Value {
    match (a, b) {
        (Value::Bottom(m), _) | (_, Value::Bottom(m)) => Value::Bottom(m),
        (Value::Top, v) | (v, Value::Top) => v,
        (Value::Disj(alts), v) | (v, Value::Disj(alts)) => {
            disjoin(alts.into_iter().map(|alt| unify(alt, v.clone())).collect())
        }
        (Value::Kinds(x), Value::Kinds(y)) => {
            if x & y == 0 {
                conflict(&Value::Kinds(x), &Value::Kinds(y))
            } else {
                Value::Kinds(x & y)
            }
        }
        (Value::Kinds(k), v) | (v, Value::Kinds(k)) => match scalar_bits(&v) {
            Some(bits) if bits & k != 0 => v,
            _ => conflict(&Value::Kinds(k), &v),
        },
        (Value::Struct(x), Value::Struct(y)) => unify_structs(x, y, false),
        (Value::List(x), Value::List(y)) => unify_lists(x, y),
        (x, y) => {
            if x == y {
                x
            } else {
                conflict(&x, &y)
            }
        }
    }
}

/// Unify `child` into `parent` as an embedding: the result keeps the
/// parent's closedness, and the embedded fields count as declared.
fn embed(parent: Value, child: Value) -> Value {
    match (parent, child) {
        (Value::Bottom(m), _) | (_, Value::Bottom(m)) => Value::Bottom(m),
        (Value::Top, v) | (v, Value::Top) => v,
        (Value::Disj(alts), v) => {
            disjoin(alts.into_iter().map(|alt| embed(alt, v.clone())).collect())
        }
        (v, Value::Disj(alts)) => {
            disjoin(alts.into_iter().map(|alt| embed(v.clone(), alt)).collect())
        }
        (Value::Struct(x), Value::Struct(y)) => unify_structs(x, y, true),
        (x, y) => unify(x, y),
    }
}

/// Build a disjunction, dropping failed and duplicate alternatives.
pub(crate) fn disjoin(alternatives: Vec<Value>) -> Value {
    let mut kept: Vec<Value> = Vec::new();
    let mut first_error: Option<Problem> = None;
    for alternative in alternatives {
        let flat = match alternative {
            Value::Disj(inner) => inner,
            other => vec![other],
        };
        for value in flat {
            if let Some(problem) = problems(&value).into_iter().next() {
                first_error.get_or_insert(problem);
                continue;
            }
            if value == Value::Top {
                return Value::Top;
            }
            if !kept.contains(&value) {
                kept.push(value);
            }
        }
    }
    match kept.len() {
        0 => Value::Bottom(match first_error {
            Some(problem) => format!("no alternative matches: {problem}"),
            None => "empty disjunction".to_string(),
        }),
        1 => kept.swap_remove(0),
        _ => Value::Disj(kept),
    }
}

fn allows(s: &StructVal, label: &str) -> bool {
    is_definition(label)
        || s.fields.contains_key(label)
        || s.patterns.iter().any(|(p, _)| pattern_matches(p, label))
}

fn pattern_matches(pattern: &Value, label: &str) -> bool {
    !matches!(
        unify(pattern.clone(), Value::Str(label.to_string())),
        Value::Bottom(_)
    )
}

fn apply_patterns(s: &mut StructVal) {
    if s.patterns.is_empty() {
        return;
    }
    for (label, field) in s.fields.iter_mut() {
        if is_definition(label) {
            continue;
        }
        for (pattern, constraint) in &s.patterns {
            if pattern_matches(pattern, label) {
                let value = std::mem::replace(&mut field.value, Value::Top);
                field.value = unify(value, constraint.clone());
            }
        }
    }
}

fn unify_structs(a: StructVal, b: StructVal, embedding: bool) -> Value {
    let check_a = a.closed && !embedding;
    let check_b = b.closed && !embedding;
    let mut rejected: Vec<String> = Vec::new();
    if check_b {
        rejected.extend(a.fields.keys().filter(|l| !allows(&b, l)).cloned());
    }
    if check_a {
        rejected.extend(b.fields.keys().filter(|l| !allows(&a, l)).cloned());
    }

    let closed = if embedding {
        a.closed
    } else {
        a.closed || b.closed
    };
    let mut result = StructVal {
        fields: a.fields,
        patterns: a.patterns,
        closed,
    };
    for (label, field) in b.fields {
        match result.fields.get_mut(&label) {
            Some(existing) => {
                let value = std::mem::replace(&mut existing.value, Value::Top);
                existing.value = unify(value, field.value);
                existing.optional &= field.optional;
            }
            None => {
                result.fields.insert(label, field);
            }
        }
    }
    for label in rejected {
        if let Some(field) = result.fields.get_mut(&label) {
            field.value = Value::Bottom(format!("field `{label}` not allowed"));
            field.optional = false;
        }
    }
    result.patterns.extend(b.patterns);
    apply_patterns(&mut result);
    Value::Struct(result)
}

fn unify_lists(a: ListVal, b: ListVal) -> Value {
    let describe = |l: &ListVal| {
        if l.rest.is_some() {
            format!("at least {}", l.elems.len())
        } else {
            l.elems.len().to_string()
        }
    };
    let (a_desc, b_desc) = (describe(&a), describe(&b));
    let n = a.elems.len().max(b.elems.len());
    let mut a_elems = a.elems.into_iter();
    let mut b_elems = b.elems.into_iter();
    let mut elems = Vec::with_capacity(n);
    for _ in 0..n {
        let x = a_elems.next().or_else(|| a.rest.as_deref().cloned());
        let y = b_elems.next().or_else(|| b.rest.as_deref().cloned());
        match (x, y) {
            (Some(x), Some(y)) => elems.push(unify(x, y)),
            _ => {
                return Value::Bottom(format!(
                    "incompatible list lengths ({a_desc} and {b_desc})"
                ));
            }
        }
    }
    let rest = match (a.rest, b.rest) {
        (Some(x), Some(y)) => Some(Box::new(unify(*x, *y))),
        _ => None,
    };
    Value::List(ListVal { elems, rest })
}

// ==========================================================================
// Error Collection
// ==========================================================================

/// An error found in an evaluated value, with the field path leading to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Problem {
    pub path: Vec<String>,
    pub message: String,
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.path.join("."), self.message)
        }
    }
}

/// Every error in `value`, in field order.
pub(crate) fn problems(value: &Value) -> Vec<Problem> {
    let mut out = Vec::new();
    collect(value, &mut Vec::new(), &mut out);
    out
}

fn collect(value: &Value, path: &mut Vec<String>, out: &mut Vec<Problem>) {
    match value {
        Value::Bottom(message) => out.push(Problem {
            path: path.clone(),
            message: message.clone(),
        }),
        Value::Struct(s) => {
            for (label, field) in &s.fields {
                path.push(label.clone());
                collect(&field.value, path, out);
                path.pop();
            }
        }
        Value::List(l) => {
            for (i, elem) in l.elems.iter().enumerate() {
                path.push(i.to_string());
                collect(elem, path, out);
                path.pop();
            }
            if let Some(rest) = &l.rest {
                path.push("...".to_string());
                collect(rest, path, out);
                path.pop();
            }
        }
        _ => {}
    }
}

// ==========================================================================
// Evaluator
// ==========================================================================

/// The lexical environment of one struct body.
struct Scope<'s> {
    decls: &'s [Decl],
    parent: Option<&'s Scope<'s>>,
    imports: &'s [ImportSpec],
    /// Whether struct literals evaluated here are closed.
    closed: bool,
}

fn declares(decls: &[Decl], name: &str) -> bool {
    decls
        .iter()
        .any(|d| matches!(d, Decl::Field(f) if f.label.name() == name))
}

type FieldKey = (usize, String);

pub(crate) struct Evaluator<'r> {
    runtime: &'r Runtime,
    cache: HashMap<FieldKey, Value>,
    in_progress: Vec<FieldKey>,
    cuts: usize,
}

impl<'r> Evaluator<'r> {
    pub(crate) fn new(runtime: &'r Runtime) -> Self {
        Evaluator {
            runtime,
            cache: HashMap::new(),
            in_progress: Vec::new(),
            cuts: 0,
        }
    }

    pub(crate) fn eval_file(&mut self, file: &File) -> Value {
        let scope = Scope {
            decls: &file.decls,
            parent: None,
            imports: &file.imports,
            closed: false,
        };
        self.eval_decls(&scope)
    }

    fn eval_decls(&mut self, scope: &Scope<'_>) -> Value {
        let open = scope.decls.iter().any(|d| matches!(d, Decl::Ellipsis));
        let mut result = StructVal {
            fields: IndexMap::new(),
            patterns: Vec::new(),
            closed: scope.closed && !open,
        };
        let mut embeds = Vec::new();
        for decl in scope.decls {
            match decl {
                Decl::Field(field) => {
                    let name = field.label.name();
                    if result.fields.contains_key(name) {
                        continue;
                    }
                    let optional = scope.decls.iter().all(|d| match d {
                        Decl::Field(g) if g.label.name() == name => g.optional,
                        _ => true,
                    });
                    let value = self.resolve_field(scope, name);
                    result
                        .fields
                        .insert(name.to_string(), FieldVal { value, optional });
                }
                Decl::Pattern { pattern, value } => {
                    let pattern = self.eval_expr(pattern, scope, false);
                    let value = self.eval_expr(value, scope, scope.closed);
                    result.patterns.push((pattern, value));
                }
                Decl::Embed(e) => embeds.push(e),
                Decl::Ellipsis => {}
            }
        }
        apply_patterns(&mut result);

        let mut value = Value::Struct(result);
        for e in embeds {
            let embedded = self.eval_expr(e, scope, scope.closed);
            value = embed(value, embedded);
        }
        value
    }

    /// The unified value of every declaration of `name` in `scope`.
    fn resolve_field(&mut self, scope: &Scope<'_>, name: &str) -> Value {
        let key = (scope.decls.as_ptr() as usize, name.to_string());
        if let Some(value) = self.cache.get(&key) {
            return value.clone();
        }
        if self.in_progress.contains(&key) {
            self.cuts += 1;
            return Value::Top;
        }

        self.in_progress.push(key.clone());
        let cuts_before = self.cuts;
        let closed = scope.closed || is_definition(name);
        // Closed struct literals declared for one label are closed over the
        // union of their fields, so they are combined as embeddings.
        let mut literals = Value::Top;
        let mut value = Value::Top;
        for decl in scope.decls {
            if let Decl::Field(field) = decl
                && field.label.name() == name
            {
                let v = self.eval_expr(&field.value, scope, closed);
                if closed && matches!(field.value, Expr::Struct(_)) {
                    literals = embed(literals, v);
                } else {
                    value = unify(value, v);
                }
            }
        }
        let value = unify(literals, value);
        self.in_progress.pop();

        if self.cuts == cuts_before {
            self.cache.insert(key, value.clone());
        }
        value
    }

    fn eval_expr(&mut self, expr: &Expr, scope: &Scope<'_>, closed: bool) -> Value {
        match expr {
            Expr::Top => Value::Top,
            Expr::Null => Value::Null,
            Expr::Bool(b) => Value::Bool(*b),
            Expr::Int(i) => Value::Int(*i),
            Expr::Float(f) => Value::Float(*f),
            Expr::Str(s) => Value::Str(s.clone()),
            Expr::Kind(k) => Value::Kinds(kind_bits(*k)),
            Expr::Ident(name) => self.eval_ident(name, scope),
            Expr::Select(base, sel) => self.eval_select(base, sel, scope, closed),
            Expr::Struct(decls) => {
                let child = Scope {
                    decls,
                    parent: Some(scope),
                    imports: scope.imports,
                    closed,
                };
                self.eval_decls(&child)
            }
            Expr::List { elems, rest } => {
                let elems: Vec<Value> = elems
                    .iter()
                    .map(|e| self.eval_expr(e, scope, closed))
                    .collect();
                let rest = match rest {
                    Some(r) => Some(Box::new(self.eval_expr(r, scope, closed))),
                    None => None,
                };
                Value::List(ListVal { elems, rest })
            }
            Expr::Unify(a, b) => {
                let a = self.eval_expr(a, scope, closed);
                let b = self.eval_expr(b, scope, closed);
                unify(a, b)
            }
            Expr::Disjoin(alternatives) => {
                let values: Vec<Value> = alternatives
                    .iter()
                    .map(|a| self.eval_expr(a, scope, closed))
                    .collect();
                disjoin(values)
            }
            Expr::Default(e) => self.eval_expr(e, scope, closed),
        }
    }

    fn eval_ident(&mut self, name: &str, scope: &Scope<'_>) -> Value {
        let mut current = Some(scope);
        while let Some(s) = current {
            if declares(s.decls, name) {
                return self.resolve_field(s, name);
            }
            current = s.parent;
        }
        if scope.imports.iter().any(|i| i.name() == name) {
            return Value::Bottom(format!("package `{name}` used as a value"));
        }

        let mut visible: Vec<&str> = Vec::new();
        let mut current = Some(scope);
        while let Some(s) = current {
            for decl in s.decls {
                if let Decl::Field(f) = decl {
                    visible.push(f.label.name());
                }
            }
            current = s.parent;
        }
        Value::Bottom(format!(
            "reference `{name}` not found{}",
            did_you_mean(name, visible)
        ))
    }

    fn eval_select(&mut self, base: &Expr, sel: &str, scope: &Scope<'_>, closed: bool) -> Value {
        if let Expr::Ident(name) = base
            && !Self::is_visible(scope, name)
            && let Some(import) = scope.imports.iter().find(|i| i.name() == name)
        {
            return self.eval_package_member(&import.path, sel);
        }
        let mut path = Vec::new();
        if static_path(base, &mut path) {
            path.push(sel);
            if let Some(declaring) = Self::declaring_scope(scope, path[0])
                && let Some(value) = self.resolve_path(declaring, &path)
            {
                return value;
            }
        }
        let base = self.eval_expr(base, scope, closed);
        select(base, sel)
    }

    fn declaring_scope<'a>(scope: &'a Scope<'a>, name: &str) -> Option<&'a Scope<'a>> {
        let mut current = Some(scope);
        while let Some(s) = current {
            if declares(s.decls, name) {
                return Some(s);
            }
            current = s.parent;
        }
        None
    }

    /// Resolve `a.b.c` by descending into the struct literals declared for
    /// `a` and then `b`, without evaluating the enclosing structs. This
    /// keeps `#Node.#Kind` precise while `#Node` itself is being evaluated.
    ///
    /// Returns `None` when some step is declared by anything other than
    /// struct literals, or has none declaring the next label.
    fn resolve_path(&mut self, scope: &Scope<'_>, path: &[&str]) -> Option<Value> {
        let (name, rest) = path.split_first()?;
        let Some(next) = rest.first() else {
            return Some(self.resolve_field(scope, name));
        };
        let closed = scope.closed || is_definition(name);
        let mut value: Option<Value> = None;
        for decl in scope.decls {
            let Decl::Field(field) = decl else { continue };
            if field.label.name() != *name {
                continue;
            }
            let Expr::Struct(body) = &field.value else {
                return None;
            };
            if declares(body, next) {
                let child = Scope {
                    decls: body,
                    parent: Some(scope),
                    imports: scope.imports,
                    closed,
                };
                let member = self.resolve_path(&child, rest)?;
                value = Some(match value {
                    Some(v) => unify(v, member),
                    None => member,
                });
            }
        }
        value
    }

    fn is_visible(scope: &Scope<'_>, name: &str) -> bool {
        let mut current = Some(scope);
        while let Some(s) = current {
            if declares(s.decls, name) {
                return true;
            }
            current = s.parent;
        }
        false
    }

    /// A member of an imported package. Packages the runtime does not know,
    /// such as the `time` builtin, accept any value.
    fn eval_package_member(&mut self, path: &str, member: &str) -> Value {
        let runtime = self.runtime;
        let Some(file) = runtime.package(path) else {
            return Value::Top;
        };
        if !declares(&file.decls, member) {
            let members = file.decls.iter().filter_map(|d| match d {
                Decl::Field(f) => Some(f.label.name()),
                _ => None,
            });
            return Value::Bottom(format!(
                "package \"{path}\" has no member `{member}`{}",
                did_you_mean(member, members)
            ));
        }
        let scope = Scope {
            decls: &file.decls,
            parent: None,
            imports: &file.imports,
            closed: false,
        };
        self.resolve_field(&scope, member)
    }
}

/// Collect the labels of a reference such as `#Outer.#Inner`.
fn static_path<'e>(expr: &'e Expr, out: &mut Vec<&'e str>) -> bool {
    match expr {
        Expr::Ident(name) => {
            out.push(name);
            true
        }
        Expr::Select(base, sel) => {
            if !static_path(base, out) {
                return false;
            }
            out.push(sel);
            true
        }
        _ => false,
    }
}

fn select(base: Value, sel: &str) -> Value {
    match base {
        Value::Struct(mut s) => match s.fields.swap_remove(sel) {
            Some(field) => field.value,
            None => {
                let known = s.fields.keys().map(String::as_str);
                Value::Bottom(format!(
                    "undefined field `{sel}`{}",
                    did_you_mean(sel, known)
                ))
            }
        },
        Value::Disj(alternatives) => disjoin(
            alternatives
                .into_iter()
                .map(|alt| select(alt, sel))
                .collect(),
        ),
        Value::Top => Value::Top,
        Value::Bottom(m) => Value::Bottom(m),
        other => Value::Bottom(format!("cannot select `{sel}` from {other}")),
    }
}
