// ==============================================================================
// Protobuf to Schema Translation
// ==============================================================================
//
// Each message becomes a closed definition and each enum a disjunction of its
// value names:
//
//   message Hello {                 #Hello: {
//     string name = 1;                  name?: string @protobuf(1,string)
//     repeated Kind kinds = 2;          kinds?: [...#Kind] @protobuf(2,Kind)
//     oneof id { int64 n = 3; }         {} | {n: int @protobuf(3,int64)}
//   }                               }
//   enum Kind { A = 0; B = 1; }     #Kind: "A" | "B"
//                                   #Kind_value: {A: 0, B: 1}
//
// Type names resolve the protobuf way, innermost scope first, against a
// `TypeIndex` holding the file's own types and everything it can see through
// its imports. Types from another package are referenced through an import of
// that package's schema import path.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;

use crate::model::proto::{
    Enum, Field as ProtoField, FieldLabel, FieldType, IdlFile, Message, Scalar,
};
use crate::schema::ast::{Attribute, Decl, Expr, Field, File, ImportSpec, Kind, Label};
use crate::suggest::did_you_mean;

/// Where a type's definition will live once generated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Home {
    /// A materialized package, referenced through an import.
    Package { import_path: String, name: String },
    /// A file without a package; its definitions are merged in unqualified.
    Unpackaged,
    /// A well-known file; only the types in the built-in table are known.
    WellKnown,
}

#[derive(Debug, Clone)]
struct Symbol {
    /// Definition labels from the top of the file, e.g. `["#Outer", "#Inner"]`.
    path: Vec<String>,
    home: Home,
}

/// Fully-qualified protobuf type names and where their definitions live.
#[derive(Debug, Default)]
pub struct TypeIndex {
    symbols: HashMap<String, Symbol>,
}

impl TypeIndex {
    pub fn new() -> Self {
        TypeIndex::default()
    }

    /// Register every message and enum declared in `file`.
    pub fn add_file(&mut self, file: &IdlFile, home: &Home) {
        let scope = file.scope();
        for message in &file.messages {
            self.add_message(&scope, &[], message, home);
        }
        for e in &file.enums {
            self.add_enum(&scope, &[], e, home);
        }
    }

    fn add_message(&mut self, scope: &str, path: &[String], message: &Message, home: &Home) {
        let full = format!("{scope}.{}", message.name);
        let mut path = path.to_vec();
        path.push(definition(&message.name));
        for nested in &message.messages {
            self.add_message(&full, &path, nested, home);
        }
        for e in &message.enums {
            self.add_enum(&full, &path, e, home);
        }
        self.symbols.insert(
            full,
            Symbol {
                path,
                home: home.clone(),
            },
        );
    }

    fn add_enum(&mut self, scope: &str, path: &[String], e: &Enum, home: &Home) {
        let mut path = path.to_vec();
        path.push(definition(&e.name));
        self.symbols.insert(
            format!("{scope}.{}", e.name),
            Symbol {
                path,
                home: home.clone(),
            },
        );
    }

    fn get(&self, full_name: &str) -> Option<&Symbol> {
        self.symbols.get(full_name)
    }

    fn short_names(&self) -> impl Iterator<Item = &str> {
        self.symbols
            .keys()
            .map(|k| k.rsplit('.').next().unwrap_or(k))
    }
}

fn definition(name: &str) -> String {
    format!("#{name}")
}

/// Translate one file into a schema document.
///
/// `home` says where this file's own definitions go: references to types in
/// the same package (or, for package-less files, in other package-less
/// files) stay unqualified. `index` must contain this file's types.
pub fn translate(file: &IdlFile, index: &TypeIndex, home: &Home) -> Result<File, String> {
    let mut translator = Translator {
        index,
        home,
        imports: IndexMap::new(),
        reserved: field_labels(file),
    };

    let mut decls = Vec::new();
    for message in &file.messages {
        decls.push(Decl::Field(translator.message(message, &file.scope())?));
    }
    for e in &file.enums {
        decls.extend(enum_decls(e));
    }

    let source = file
        .path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.path.display().to_string());
    let package = match home {
        Home::Package { name, .. } => Some(name.clone()),
        Home::Unpackaged | Home::WellKnown => None,
    };
    let imports = translator
        .imports
        .into_iter()
        .map(|(path, alias)| {
            let spec = ImportSpec {
                alias: None,
                path: path.clone(),
            };
            if spec.name() == alias {
                spec
            } else {
                ImportSpec {
                    alias: Some(alias),
                    path,
                }
            }
        })
        .collect();

    Ok(File {
        doc: vec![format!(
            "Code generated by protocue from {source}. DO NOT EDIT."
        )],
        package,
        imports,
        decls,
    })
}

/// Every field label used anywhere in the file; import aliases avoid them so
/// a field never shadows a package it refers to.
fn field_labels(file: &IdlFile) -> HashSet<String> {
    fn walk(message: &Message, out: &mut HashSet<String>) {
        let fields = message
            .fields
            .iter()
            .chain(message.oneofs.iter().flat_map(|o| &o.fields));
        for field in fields {
            out.insert(label_name(field).to_string());
        }
        for nested in &message.messages {
            walk(nested, out);
        }
    }
    let mut out = HashSet::new();
    for message in &file.messages {
        walk(message, &mut out);
    }
    out
}

fn label_name(field: &ProtoField) -> &str {
    field.json_name.as_deref().unwrap_or(&field.name)
}

fn doc_lines(doc: Option<&str>) -> Vec<String> {
    match doc {
        Some(text) => text.lines().map(|l| l.trim_end().to_string()).collect(),
        None => Vec::new(),
    }
}

fn enum_decls(e: &Enum) -> [Decl; 2] {
    let names: Vec<Expr> = e.values.iter().map(|v| Expr::Str(v.name.clone())).collect();
    let value = match names.len() {
        0 => Expr::Kind(Kind::String),
        1 => names.into_iter().next().unwrap_or(Expr::Kind(Kind::String)),
        _ => Expr::Disjoin(names),
    };
    let mut def = Field::new(Label::Ident(definition(&e.name)), value);
    def.doc = doc_lines(e.doc.as_deref());

    let numbers = e
        .values
        .iter()
        .map(|v| {
            let mut f = Field::new(label_for(&v.name), Expr::Int(v.number));
            f.doc = doc_lines(v.doc.as_deref());
            Decl::Field(f)
        })
        .collect();
    let table = Field::new(
        Label::Ident(format!("#{}_value", e.name)),
        Expr::Struct(numbers),
    );
    [Decl::Field(def), Decl::Field(table)]
}

fn label_for(name: &str) -> Label {
    if crate::schema::is_identifier(name) {
        Label::Ident(name.to_string())
    } else {
        Label::Quoted(name.to_string())
    }
}

struct Translator<'a> {
    index: &'a TypeIndex,
    home: &'a Home,
    /// Import path -> alias, in first-use order.
    imports: IndexMap<String, String>,
    reserved: HashSet<String>,
}

impl Translator<'_> {
    fn message(&mut self, message: &Message, scope: &str) -> Result<Field, String> {
        let full = format!("{scope}.{}", message.name);
        let mut decls = Vec::new();

        for nested in &message.messages {
            decls.push(Decl::Field(self.message(nested, &full)?));
        }
        for e in &message.enums {
            decls.extend(enum_decls(e));
        }
        for field in &message.fields {
            let optional = self.is_optional(field);
            decls.push(Decl::Field(self.field(field, &full, optional)?));
        }
        for oneof in &message.oneofs {
            let mut alternatives = vec![Expr::Struct(Vec::new())];
            for field in &oneof.fields {
                let member = self.field(field, &full, false)?;
                alternatives.push(Expr::Struct(vec![Decl::Field(member)]));
            }
            decls.push(Decl::Embed(Expr::Disjoin(alternatives)));
        }

        let mut def = Field::new(Label::Ident(definition(&message.name)), Expr::Struct(decls));
        def.doc = doc_lines(message.doc.as_deref());
        Ok(def)
    }

    /// Only proto2 `required` fields must be present; everything else,
    /// including every proto3 field, may be omitted.
    fn is_optional(&self, field: &ProtoField) -> bool {
        field.label != FieldLabel::Required
    }

    fn field(&mut self, field: &ProtoField, scope: &str, optional: bool) -> Result<Field, String> {
        let mut value = self.field_type(&field.ty, scope)?;
        if field.label == FieldLabel::Repeated {
            value = Expr::list_of(value);
        }

        let label = label_name(field);
        let mut body = format!("{},{}", field.number, field.ty.proto_spelling());
        if label != field.name {
            body.push_str(&format!(",name={}", field.name));
        }

        let mut out = Field::new(label_for(label), value);
        out.optional = optional;
        out.attrs.push(Attribute {
            key: "protobuf".to_string(),
            body,
        });
        out.doc = doc_lines(field.doc.as_deref());
        Ok(out)
    }

    fn field_type(&mut self, ty: &FieldType, scope: &str) -> Result<Expr, String> {
        match ty {
            FieldType::Scalar(s) => Ok(scalar(*s)),
            FieldType::Named(name) => self.reference(name, scope),
            FieldType::Map { value, .. } => {
                let value = self.field_type(value, scope)?;
                Ok(Expr::Struct(vec![Decl::Pattern {
                    pattern: Expr::Kind(Kind::String),
                    value,
                }]))
            }
        }
    }

    /// Resolve a type name from `scope` outward.
    fn reference(&mut self, name: &str, scope: &str) -> Result<Expr, String> {
        for candidate in candidates(name, scope) {
            if let Some(symbol) = self.index.get(&candidate) {
                return self.symbol_expr(&candidate, symbol);
            }
            if let Some(expr) = self.well_known_type(&candidate) {
                return Ok(expr);
            }
        }
        let short = name.rsplit('.').next().unwrap_or(name);
        Err(format!(
            "unknown type `{name}`{}",
            did_you_mean(short, self.index.short_names())
        ))
    }

    fn symbol_expr(&mut self, full_name: &str, symbol: &Symbol) -> Result<Expr, String> {
        let local = || {
            let mut segments = symbol.path.iter();
            let first = segments.next().map_or_else(|| Expr::Top, |s| Expr::ident(s.clone()));
            segments.fold(first, |e, s| e.select(s.clone()))
        };
        match (&symbol.home, self.home) {
            (Home::WellKnown, _) => Ok(self.well_known_type(full_name).unwrap_or(Expr::Top)),
            (Home::Unpackaged, Home::Unpackaged) => Ok(local()),
            (Home::Unpackaged, _) => Err(format!(
                "`{}` is declared in a file without a package and cannot be referenced from a packaged file",
                full_name.trim_start_matches('.')
            )),
            (Home::Package { import_path, .. }, Home::Package { import_path: own, .. })
                if import_path == own =>
            {
                Ok(local())
            }
            (Home::Package { import_path, name }, _) => {
                let alias = self.import_alias(import_path, name);
                let mut e = Expr::ident(alias);
                for segment in &symbol.path {
                    e = e.select(segment.clone());
                }
                Ok(e)
            }
        }
    }

    /// The identifier a package is imported under, allocating one on first
    /// use. Aliases never repeat and never match a field label.
    fn import_alias(&mut self, import_path: &str, package_name: &str) -> String {
        if let Some(alias) = self.imports.get(import_path) {
            return alias.clone();
        }
        let taken: HashSet<&str> = self.imports.values().map(String::as_str).collect();
        let mut alias = package_name.to_string();
        let mut n = 1;
        while taken.contains(alias.as_str()) || self.reserved.contains(&alias) {
            n += 1;
            alias = format!("{package_name}{n}");
        }
        self.imports.insert(import_path.to_string(), alias.clone());
        alias
    }

    fn well_known_type(&mut self, full_name: &str) -> Option<Expr> {
        let name = full_name.strip_prefix(".google.protobuf.")?;
        let nullable = |kind| Expr::Disjoin(vec![Expr::Null, Expr::Kind(kind)]);
        Some(match name {
            "Timestamp" => Expr::ident(self.import_alias("time", "time")).select("Time"),
            "Duration" => Expr::ident(self.import_alias("time", "time")).select("Duration"),
            "Empty" => Expr::Struct(Vec::new()),
            "Struct" => Expr::Struct(vec![Decl::Ellipsis]),
            "Value" => Expr::Top,
            "ListValue" => Expr::list_of(Expr::Top),
            "NullValue" => Expr::Null,
            "Any" => Expr::Struct(vec![
                Decl::Field(Field::new(
                    Label::Quoted("@type".to_string()),
                    Expr::Kind(Kind::String),
                )),
                Decl::Ellipsis,
            ]),
            "DoubleValue" | "FloatValue" => nullable(Kind::Float),
            "Int64Value" | "UInt64Value" | "Int32Value" | "UInt32Value" => nullable(Kind::Int),
            "BoolValue" => nullable(Kind::Bool),
            "StringValue" => nullable(Kind::String),
            "BytesValue" => nullable(Kind::Bytes),
            "FieldMask" => Expr::Kind(Kind::String),
            _ => Expr::Top,
        })
    }
}

fn scalar(s: Scalar) -> Expr {
    Expr::Kind(match s {
        Scalar::Double | Scalar::Float => Kind::Float,
        Scalar::Bool => Kind::Bool,
        Scalar::String => Kind::String,
        Scalar::Bytes => Kind::Bytes,
        Scalar::Int32
        | Scalar::Int64
        | Scalar::Uint32
        | Scalar::Uint64
        | Scalar::Sint32
        | Scalar::Sint64
        | Scalar::Fixed32
        | Scalar::Fixed64
        | Scalar::Sfixed32
        | Scalar::Sfixed64 => Kind::Int,
    })
}

/// Fully-qualified names `name` may refer to from `scope`, innermost first.
fn candidates(name: &str, scope: &str) -> Vec<String> {
    if name.starts_with('.') {
        return vec![name.to_string()];
    }
    let mut out = Vec::new();
    let mut scope = scope;
    loop {
        out.push(format!("{scope}.{name}"));
        match scope.rfind('.') {
            Some(i) => scope = &scope[..i],
            None => break,
        }
    }
    out
}
