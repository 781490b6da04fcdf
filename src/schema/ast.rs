//! Syntax tree for schema documents.
//!
//! The tree is what `compile` produces and what `render` prints; evaluation
//! works on it directly without a separate lowering step.

/// A whole schema document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct File {
    /// Comment lines above the package clause (or the first declaration).
    pub doc: Vec<String>,
    pub package: Option<String>,
    pub imports: Vec<ImportSpec>,
    pub decls: Vec<Decl>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpec {
    pub alias: Option<String>,
    pub path: String,
}

impl ImportSpec {
    /// The identifier the import is referred to by: the alias, else the
    /// explicit `:name` qualifier, else the last path element.
    pub fn name(&self) -> &str {
        if let Some(alias) = &self.alias {
            return alias;
        }
        if let Some((_, qualifier)) = self.path.rsplit_once(':') {
            return qualifier;
        }
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    Field(Field),
    /// `[pattern]: value`, constraining every regular field whose label
    /// matches `pattern`.
    Pattern { pattern: Expr, value: Expr },
    /// An expression embedded in a struct, unified into the struct itself.
    Embed(Expr),
    /// `...`: the struct admits fields beyond those it declares.
    Ellipsis,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub label: Label,
    pub optional: bool,
    pub value: Expr,
    pub attrs: Vec<Attribute>,
    pub doc: Vec<String>,
}

impl Field {
    pub fn new(label: Label, value: Expr) -> Self {
        Field {
            label,
            optional: false,
            value,
            attrs: Vec::new(),
            doc: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Label {
    /// A bare identifier; definitions are identifiers starting with `#`.
    Ident(String),
    /// A quoted label such as `"@type"`.
    Quoted(String),
}

impl Label {
    pub fn name(&self) -> &str {
        match self {
            Label::Ident(s) | Label::Quoted(s) => s,
        }
    }

    pub fn is_definition(&self) -> bool {
        matches!(self, Label::Ident(s) if is_definition(s))
    }
}

pub(crate) fn is_definition(name: &str) -> bool {
    name.starts_with('#') || name.starts_with("_#")
}

/// `@key(body)`. The body is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub key: String,
    pub body: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Bool,
    Int,
    Float,
    Number,
    String,
    Bytes,
}

impl Kind {
    pub fn from_ident(name: &str) -> Option<Kind> {
        Some(match name {
            "bool" => Kind::Bool,
            "int" => Kind::Int,
            "float" => Kind::Float,
            "number" => Kind::Number,
            "string" => Kind::String,
            "bytes" => Kind::Bytes,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Bool => "bool",
            Kind::Int => "int",
            Kind::Float => "float",
            Kind::Number => "number",
            Kind::String => "string",
            Kind::Bytes => "bytes",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `_`
    Top,
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Kind(Kind),
    Ident(String),
    Select(Box<Expr>, String),
    Struct(Vec<Decl>),
    List {
        elems: Vec<Expr>,
        /// The `...T` tail; `Some(Expr::Top)` for a bare `...`.
        rest: Option<Box<Expr>>,
    },
    Unify(Box<Expr>, Box<Expr>),
    /// A disjunction of two or more alternatives, kept flat.
    Disjoin(Vec<Expr>),
    /// `*expr`: a default marker inside a disjunction.
    Default(Box<Expr>),
}

impl Expr {
    pub fn ident(name: impl Into<String>) -> Expr {
        Expr::Ident(name.into())
    }

    #[must_use]
    pub fn select(self, name: impl Into<String>) -> Expr {
        Expr::Select(Box::new(self), name.into())
    }

    pub fn list_of(elem: Expr) -> Expr {
        Expr::List {
            elems: Vec::new(),
            rest: Some(Box::new(elem)),
        }
    }
}
