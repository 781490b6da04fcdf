// ==============================================================================
// Schema Generator
// ==============================================================================
//
// Turns one resolved IDL file into a schema document. A file with a package
// is written under the directory its package maps to and registered with the
// runtime, so later files (and the test scaffold) can import it. A file
// without a package stays in memory and is merged into the scaffold later.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::Error;
use crate::layout::{self, Layout, PackageSpec};
use crate::model::proto::IdlFile;
use crate::resolve::{ResolvedFile, ResolvedGraph, Visible};
use crate::schema::{Instance, Runtime};
use crate::translate::{Home, TypeIndex, translate};

/// The result of generating one file.
#[derive(Debug)]
pub enum GeneratedSchema {
    /// Written to `path` and importable as `import_path`.
    Materialized {
        source: PathBuf,
        path: PathBuf,
        import_path: String,
    },
    /// Kept in memory because the source declares no package.
    InMemory { source: PathBuf, instance: Instance },
}

impl GeneratedSchema {
    pub fn source(&self) -> &Path {
        match self {
            GeneratedSchema::Materialized { source, .. } | GeneratedSchema::InMemory { source, .. } => {
                source
            }
        }
    }

    /// The in-memory instance, if this schema was not written out.
    pub fn instance(&self) -> Option<&Instance> {
        match self {
            GeneratedSchema::InMemory { instance, .. } => Some(instance),
            GeneratedSchema::Materialized { .. } => None,
        }
    }
}

/// Where the definitions of `idl` live for this run's layout.
pub fn home_of(idl: &IdlFile, layout: &Layout) -> Home {
    match PackageSpec::parse(&idl.package) {
        Some(spec) => Home::Package {
            import_path: layout::import_path(&spec, layout.namespace()),
            name: spec.name,
        },
        None => Home::Unpackaged,
    }
}

/// Generate the schema for `file`, whose imports must already have been
/// generated.
pub fn generate_schema(
    runtime: &mut Runtime,
    layout: &mut Layout,
    graph: &ResolvedGraph,
    file: &ResolvedFile,
) -> Result<GeneratedSchema, Error> {
    let home = home_of(&file.idl, layout);

    let mut index = TypeIndex::new();
    for visible in graph.visible_from(file) {
        match visible {
            Visible::Generated(dep) => index.add_file(&dep.idl, &home_of(&dep.idl, layout)),
            Visible::WellKnown(idl) => index.add_file(idl, &Home::WellKnown),
        }
    }
    // Own definitions last, so they shadow imported ones of the same name.
    index.add_file(&file.idl, &home);

    let schema = translate(&file.idl, &index, &home)
        .map_err(|reason| Error::generation(&file.path, reason))?;
    let name = schema_file_name(&file.path);
    let instance = runtime.build(&name, schema);

    let Some(spec) = PackageSpec::parse(&file.idl.package) else {
        debug!(source = %file.path.display(), "no package, keeping schema in memory");
        return Ok(GeneratedSchema::InMemory {
            source: file.path.clone(),
            instance,
        });
    };

    let placement = layout.claim(&spec, &file.path)?;
    info!(
        source = %file.path.display(),
        target = %placement.file.display(),
        "generate schema from"
    );
    fs::create_dir_all(&placement.dir).map_err(|e| {
        Error::generation(&file.path, format!("create {}: {e}", placement.dir.display()))
    })?;
    fs::write(&placement.file, runtime.render(&instance)).map_err(|e| {
        Error::generation(&file.path, format!("write {}: {e}", placement.file.display()))
    })?;
    runtime.register(&placement.import_path, &instance);

    Ok(GeneratedSchema::Materialized {
        source: file.path.clone(),
        path: placement.file,
        import_path: placement.import_path,
    })
}

/// `dir/hello.proto` -> `hello.cue`.
fn schema_file_name(source: &Path) -> String {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "schema".to_string());
    format!("{stem}.cue")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::layout::derive_namespace;
    use crate::resolve::ImportResolver;
    use crate::wellknown::WellKnownRegistry;
    use pretty_assertions::assert_eq;

    struct Fixture {
        dir: tempfile::TempDir,
    }

    impl Fixture {
        fn new(files: &[(&str, &str)]) -> Fixture {
            let dir = tempfile::tempdir().expect("tempdir");
            for (name, source) in files {
                let path = dir.path().join("protos").join(name);
                fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
                fs::write(path, source).expect("write");
            }
            Fixture { dir }
        }

        fn out(&self) -> PathBuf {
            self.dir.path().join("out")
        }

        fn run(&self, top: &[&str]) -> (Runtime, Result<Vec<GeneratedSchema>, Error>) {
            let registry = WellKnownRegistry::empty(self.dir.path().join("cache"));
            let resolver = ImportResolver::new(self.dir.path().join("protos"), &registry);
            let top: Vec<PathBuf> = top.iter().map(PathBuf::from).collect();
            let graph = resolver.resolve(&top).expect("resolves");
            let mut layout = Layout::new(self.out(), derive_namespace(graph.packages()));
            let mut runtime = Runtime::new();
            let result = graph
                .files()
                .iter()
                .map(|f| generate_schema(&mut runtime, &mut layout, &graph, f))
                .collect();
            (runtime, result)
        }
    }

    #[test]
    fn packaged_files_are_written_and_registered() {
        let fx = Fixture::new(&[(
            "hello.proto",
            "syntax = \"proto3\";\noption go_package = \"pkg.v1;pkgv1\";\nmessage Hello { string name = 1; }\n",
        )]);
        let (runtime, result) = fx.run(&["hello.proto"]);
        let schemas = result.expect("generates");
        assert_eq!(schemas.len(), 1);
        let GeneratedSchema::Materialized { path, import_path, .. } = &schemas[0] else {
            panic!("expected a materialized schema: {schemas:?}");
        };
        assert_eq!(path, &fx.out().join("v1").join("hello.cue"));
        assert_eq!(import_path, "pkg/v1");
        assert!(runtime.is_registered("pkg/v1"));

        let text = fs::read_to_string(path).expect("written");
        assert!(text.contains("package pkgv1"), "{text}");
        assert!(text.contains("#Hello: {"), "{text}");
    }

    #[test]
    fn unpackaged_files_stay_in_memory() {
        let fx = Fixture::new(&[(
            "plain.proto",
            "syntax = \"proto3\";\nmessage Plain { int32 n = 1; }\n",
        )]);
        let (_, result) = fx.run(&["plain.proto"]);
        let schemas = result.expect("generates");
        let instance = schemas[0].instance().expect("in memory");
        assert_eq!(instance.name(), "plain.cue");
        assert_eq!(instance.file().package, None);
        assert!(!fx.out().exists());
    }

    #[test]
    fn dependencies_are_imported_by_path() {
        let fx = Fixture::new(&[
            (
                "a.proto",
                "syntax = \"proto3\";\npackage a;\noption go_package = \"example.com/api/a\";\nimport \"b.proto\";\nmessage A { b.B inner = 1; }\n",
            ),
            (
                "b.proto",
                "syntax = \"proto3\";\npackage b;\noption go_package = \"example.com/api/b\";\nmessage B { string s = 1; }\n",
            ),
        ]);
        let (runtime, result) = fx.run(&["a.proto"]);
        let schemas = result.expect("generates");
        let sources: Vec<String> = schemas
            .iter()
            .map(|s| s.source().file_name().expect("name").to_string_lossy().into_owned())
            .collect();
        assert_eq!(sources, vec!["b.proto", "a.proto"]);
        assert!(runtime.is_registered("example.com/api/b"));

        let text = fs::read_to_string(fx.out().join("a").join("a.cue")).expect("written");
        assert!(text.contains("import \"example.com/api/b\""), "{text}");
        assert!(text.contains("inner?: b.#B @protobuf(1,b.B)"), "{text}");
    }

    #[test]
    fn packages_escaping_the_output_root_are_refused() {
        let fx = Fixture::new(&[(
            "b.proto",
            "syntax = \"proto3\";\noption go_package = \"../../../../escaped\";\nmessage B {}\n",
        )]);
        let (_, result) = fx.run(&["b.proto"]);
        let err = result.expect_err("escaping package");
        assert_eq!(err.kind(), ErrorKind::Generation);
        assert!(!fx.out().join("../../../../escaped/b.cue").exists());
        assert!(!fx.out().exists());
    }

    #[test]
    fn two_packages_in_one_directory_collide() {
        // `v1` lies outside the namespace, so it keeps its whole path: `v1`.
        let fx = Fixture::new(&[
            (
                "one.proto",
                "syntax = \"proto3\";\noption go_package = \"example.com/api/v1\";\nimport \"two.proto\";\n",
            ),
            (
                "two.proto",
                "syntax = \"proto3\";\noption go_package = \"v1\";\n",
            ),
        ]);
        let (_, result) = fx.run(&["one.proto"]);
        let err = result.expect_err("collision");
        assert_eq!(err.kind(), ErrorKind::LayoutCollision);
    }
}
