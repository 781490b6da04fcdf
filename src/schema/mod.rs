// ==============================================================================
// Schema Runtime: Compile, Merge, Validate, Render
// ==============================================================================
//
// A small constraint language in the style of CUE: structs, definitions
// (`#Name`), optional fields, basic types, disjunctions, unification, list
// tails, pattern constraints, embeddings, and imports. It is enough to express
// the schemas generated from protobuf and the test-case files written against
// them.
//
// All operations go through a `Runtime`. The runtime also holds a registry of
// generated packages, keyed by import path, so that documents importing them
// resolve references to real definitions.

pub mod ast;
mod eval;
mod format;
mod parser;

use std::collections::HashSet;
use std::fmt;

use indexmap::IndexMap;

use crate::error::ParseDiagnostic;
use ast::{Decl, File, ImportSpec};
use eval::{Evaluator, problems};

pub(crate) use format::{is_identifier, quote};

/// A failure reported by the schema runtime.
#[derive(Debug)]
pub enum SchemaError {
    /// The document is not syntactically valid.
    Syntax(Box<ParseDiagnostic>),
    /// Two documents cannot be combined.
    Conflict(Vec<String>),
    /// The document is well-formed but some constraints cannot be satisfied.
    Invalid(Vec<String>),
}

impl SchemaError {
    /// The individual problems, one per line of output.
    pub fn messages(&self) -> Vec<String> {
        match self {
            SchemaError::Syntax(d) => vec![d.message.clone()],
            SchemaError::Conflict(m) | SchemaError::Invalid(m) => m.clone(),
        }
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaError::Syntax(d) => write!(f, "syntax error: {d}"),
            SchemaError::Conflict(m) => write!(f, "cannot merge schemas: {}", m.join("; ")),
            SchemaError::Invalid(m) => write!(f, "invalid schema: {}", m.join("; ")),
        }
    }
}

impl std::error::Error for SchemaError {}

/// A compiled schema document.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    name: String,
    file: File,
}

impl Instance {
    /// The name the document was compiled under, used in diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn file(&self) -> &File {
        &self.file
    }

    pub fn into_file(self) -> File {
        self.file
    }
}

/// The context every schema operation runs in.
#[derive(Debug, Default)]
pub struct Runtime {
    packages: IndexMap<String, File>,
}

impl Runtime {
    pub fn new() -> Self {
        Runtime::default()
    }

    /// Parse `source` into an instance named `name`.
    pub fn compile(&self, name: &str, source: &str) -> Result<Instance, SchemaError> {
        let file = parser::parse_file(source, name)
            .map_err(|d| SchemaError::Syntax(Box::new(d)))?;
        Ok(Instance {
            name: name.to_string(),
            file,
        })
    }

    /// Wrap an already-built syntax tree.
    pub fn build(&self, name: &str, file: File) -> Instance {
        Instance {
            name: name.to_string(),
            file,
        }
    }

    /// Make `instance` available to documents importing `import_path`.
    ///
    /// Several files may share one import path; their declarations are
    /// combined into a single package.
    pub fn register(&mut self, import_path: &str, instance: &Instance) {
        let entry = self.packages.entry(import_path.to_string()).or_default();
        if entry.package.is_none() {
            entry.package.clone_from(&instance.file.package);
        }
        for spec in &instance.file.imports {
            if !entry.imports.contains(spec) {
                entry.imports.push(spec.clone());
            }
        }
        entry.decls.extend(instance.file.decls.iter().cloned());
    }

    pub(crate) fn package(&self, import_path: &str) -> Option<&File> {
        self.packages.get(import_path)
    }

    /// Whether a package has been registered under `import_path`.
    pub fn is_registered(&self, import_path: &str) -> bool {
        self.packages.contains_key(import_path)
    }

    /// Combine two documents into one whose declarations are the union of
    /// both. Declarations of `a` come first; the file comment is `a`'s.
    ///
    /// Fails when the package clauses differ, when one import name refers to
    /// two different paths, or when a label declared by both documents
    /// evaluates to conflicting values.
    pub fn merge(&self, a: &Instance, b: &Instance) -> Result<Instance, SchemaError> {
        let mut conflicts = Vec::new();

        let package = match (&a.file.package, &b.file.package) {
            (Some(x), Some(y)) if x != y => {
                conflicts.push(format!("package clauses differ: `{x}` and `{y}`"));
                None
            }
            (Some(x), _) | (None, Some(x)) => Some(x.clone()),
            (None, None) => None,
        };

        let mut imports: Vec<ImportSpec> = a.file.imports.clone();
        for spec in &b.file.imports {
            if imports.iter().any(|i| i.path == spec.path && i.alias == spec.alias) {
                continue;
            }
            if let Some(clash) = imports.iter().find(|i| i.name() == spec.name()) {
                conflicts.push(format!(
                    "import name `{}` refers to both \"{}\" and \"{}\"",
                    spec.name(),
                    clash.path,
                    spec.path
                ));
                continue;
            }
            imports.push(spec.clone());
        }

        if !conflicts.is_empty() {
            return Err(SchemaError::Conflict(conflicts));
        }

        let mut decls = a.file.decls.clone();
        decls.extend(b.file.decls.iter().cloned());
        let merged = File {
            doc: a.file.doc.clone(),
            package,
            imports,
            decls,
        };

        let shared: HashSet<&str> = labels(&a.file)
            .intersection(&labels(&b.file))
            .copied()
            .collect();
        if !shared.is_empty() {
            let value = Evaluator::new(self).eval_file(&merged);
            let conflicts: Vec<String> = problems(&value)
                .into_iter()
                .filter(|p| p.path.first().is_some_and(|l| shared.contains(l.as_str())))
                .map(|p| p.to_string())
                .collect();
            if !conflicts.is_empty() {
                return Err(SchemaError::Conflict(conflicts));
            }
        }

        Ok(Instance {
            name: a.name.clone(),
            file: merged,
        })
    }

    /// Evaluate the document and report every unsatisfiable constraint.
    pub fn validate(&self, instance: &Instance) -> Result<(), SchemaError> {
        let value = Evaluator::new(self).eval_file(&instance.file);
        let errors: Vec<String> = problems(&value).iter().map(ToString::to_string).collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(SchemaError::Invalid(errors))
        }
    }

    /// Canonical source text for the document.
    pub fn render(&self, instance: &Instance) -> String {
        format::render(&instance.file)
    }
}

fn labels(file: &File) -> HashSet<&str> {
    file.decls
        .iter()
        .filter_map(|d| match d {
            Decl::Field(f) => Some(f.label.name()),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn compile_render_round_trip() {
        let rt = Runtime::new();
        let source = "package demo\n\n#A: {\n\tname?: string\n}\n";
        let instance = rt.compile("a.cue", source).expect("compiles");
        assert_eq!(rt.render(&instance), source);
    }

    #[test]
    fn syntax_errors_carry_a_span() {
        let rt = Runtime::new();
        let err = rt.compile("bad.cue", "a: {\n").expect_err("unterminated struct");
        let SchemaError::Syntax(d) = err else {
            panic!("expected a syntax error, got {err:?}");
        };
        assert_eq!(d.message, "expected `}`, found end of file");
    }

    #[test]
    fn merge_keeps_the_first_document_first() {
        let rt = Runtime::new();
        let a = rt.compile("a", "Input: {}\n").expect("compiles");
        let b = rt.compile("b", "#Req: {a?: int}\n").expect("compiles");
        let merged = rt.merge(&a, &b).expect("merges");
        assert_eq!(rt.render(&merged), "Input: {}\n\n#Req: {\n\ta?: int\n}\n");
        rt.validate(&merged).expect("valid");
    }

    #[test]
    fn merge_rejects_conflicting_shared_labels() {
        let rt = Runtime::new();
        let a = rt.compile("a", "name: \"x\"\n").expect("compiles");
        let b = rt.compile("b", "name: \"y\"\n").expect("compiles");
        let err = rt.merge(&a, &b).expect_err("conflict");
        assert_eq!(
            err.messages(),
            vec!["name: conflicting values \"x\" and \"y\""]
        );
    }

    #[test]
    fn merge_combines_declarations_of_one_definition() {
        let rt = Runtime::new();
        let a = rt.compile("a", "#A: {x?: int}\n").expect("compiles");
        let b = rt.compile("b", "#A: {y?: int}\nv: #A & {x: 1, y: 2}\n").expect("compiles");
        let merged = rt.merge(&a, &b).expect("merges");
        rt.validate(&merged).expect("valid");
    }

    #[test]
    fn merge_rejects_different_packages() {
        let rt = Runtime::new();
        let a = rt.compile("a", "package a\n").expect("compiles");
        let b = rt.compile("b", "package b\n").expect("compiles");
        assert!(matches!(rt.merge(&a, &b), Err(SchemaError::Conflict(_))));
    }

    #[test]
    fn registered_packages_resolve_qualified_references() {
        let mut rt = Runtime::new();
        let dep = rt
            .compile("dep.cue", "package dep\n#Req: {name?: string}\n")
            .expect("compiles");
        rt.register("example.com/dep", &dep);

        let ok = rt
            .compile("ok.cue", "import \"example.com/dep\"\nx: dep.#Req & {name: \"a\"}\n")
            .expect("compiles");
        rt.validate(&ok).expect("valid");

        let bad = rt
            .compile("bad.cue", "import \"example.com/dep\"\nx: dep.#Req & {nme: \"a\"}\n")
            .expect("compiles");
        let err = rt.validate(&bad).expect_err("closed definition");
        assert_eq!(err.messages(), vec!["x.nme: field `nme` not allowed"]);
    }
}
