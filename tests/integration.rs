// ==============================================================================
// Integration Tests: Generate Schemas and Test Cases Through the Library API
// ==============================================================================
//
// Each test lays out a small protobuf project in a temporary directory, runs
// the generation pipeline (and usually the test scaffold) against it, and
// checks the files written. The well-known cache is either pre-seeded or
// served by a counting fake, so the network is never touched.

mod common;

use std::cell::Cell;
use std::rc::Rc;

use common::{Workspace, render_diagnostic};
use pretty_assertions::assert_eq;
use protocue::{
    ErrorKind, Fetch, GeneratedSchema, Generator, Runtime, ScaffoldOutcome, WellKnownRegistry,
    add_test_case,
};

// ==============================================================================
// Test Infrastructure
// ==============================================================================

/// Serves a fixed body and counts the requests it answers.
struct CountingFetcher {
    calls: Rc<Cell<usize>>,
}

impl Fetch for CountingFetcher {
    fn fetch(&self, _url: &str) -> Result<Vec<u8>, String> {
        self.calls.set(self.calls.get() + 1);
        Ok(b"syntax = \"proto3\";\npackage google.protobuf;\nmessage Timestamp {}\n".to_vec())
    }
}

fn registry(ws: &Workspace) -> WellKnownRegistry {
    let mut registry = WellKnownRegistry::new();
    registry.set_root(ws.join("tmp/wellknowns"));
    registry
}

/// A generator over `protos/*.proto` writing into the workspace root, with a
/// seeded well-known cache.
fn generator(ws: &Workspace) -> Generator {
    let registry = registry(ws);
    ws.seed_well_knowns(&registry);
    let mut generator = Generator::new();
    generator
        .proto_root(ws.join("protos"))
        .out_dir(ws.path())
        .protofile(format!("{}/protos/*.proto", ws.path().display()))
        .registry(registry);
    generator
}

fn source_names(schemas: &[GeneratedSchema]) -> Vec<String> {
    schemas
        .iter()
        .map(|s| {
            s.source()
                .file_name()
                .expect("source has a file name")
                .to_string_lossy()
                .into_owned()
        })
        .collect()
}

fn proto(package: &str, imports: &[&str], body: &str) -> String {
    let mut out = String::from("syntax = \"proto3\";\n");
    if !package.is_empty() {
        out.push_str(&format!("option go_package = \"{package}\";\n"));
    }
    for import in imports {
        out.push_str(&format!("import \"{import}\";\n"));
    }
    out.push_str(body);
    out
}

// ==============================================================================
// End to End
// ==============================================================================

#[test]
fn test_single_packaged_file_end_to_end() {
    let ws = Workspace::new();
    ws.write(
        "protos/hello.proto",
        &proto(
            "pkg.v1;pkgv1",
            &[],
            "message HelloRequest {\n  string name = 1;\n  repeated int32 lucky = 2;\n}\n",
        ),
    );

    let mut runtime = Runtime::new();
    let outcome = add_test_case(&mut runtime, &generator(&ws), &ws.join("tests"), "my test")
        .expect("add test case");
    let ScaffoldOutcome::Created { path, generated } = outcome else {
        panic!("expected the test case to be created");
    };
    assert_eq!(path, ws.join("tests/myTest.cue"));

    let generated = generated.expect("schemas were generated");
    assert_eq!(
        generated.namespace.as_ref().map(ToString::to_string).as_deref(),
        Some("pkg")
    );
    assert_eq!(ws.read("cue.mod/module.cue"), "module: \"pkg\"\n");
    assert!(ws.join("cue.mod/pkg").is_dir());
    assert!(ws.join("cue.mod/usr").is_dir());

    let schema = ws.read("v1/hello.cue");
    assert_eq!(
        schema,
        "// Code generated by protocue from hello.proto. DO NOT EDIT.
package pkgv1

#HelloRequest: {
\tname?: string @protobuf(1,string)
\tlucky?: [...int] @protobuf(2,int32)
}
"
    );

    // The scaffold compiles again and validates.
    let test_case = ws.read("tests/myTest.cue");
    assert!(test_case.starts_with("name: \"my test\"\n"), "{test_case}");
    let compiled = runtime.compile("myTest.cue", &test_case).expect("re-compiles");
    runtime.validate(&compiled).expect("validates");
}

#[test]
fn test_add_twice_refuses_without_overwriting() {
    let ws = Workspace::new();
    let generator = generator(&ws);
    let tests_dir = ws.join("tests");

    let first = add_test_case(&mut Runtime::new(), &generator, &tests_dir, "Login").expect("first");
    assert!(matches!(first, ScaffoldOutcome::Created { generated: None, .. }));
    let written = ws.read("tests/login.cue");

    let second = add_test_case(&mut Runtime::new(), &generator, &tests_dir, "Login").expect("second");
    assert!(matches!(second, ScaffoldOutcome::AlreadyExists(_)));
    assert_eq!(ws.read("tests/login.cue"), written);
}

#[test]
fn test_no_packages_means_no_descriptor() {
    let ws = Workspace::new();
    ws.write("protos/plain.proto", &proto("", &[], "message Plain {}\n"));

    let output = generator(&ws).generate(&mut Runtime::new()).expect("generate");
    assert_eq!(output.namespace, None);
    assert_eq!(output.descriptor, None);
    assert!(!ws.join("cue.mod").exists());
    assert_eq!(source_names(&output.schemas), vec!["plain.proto"]);
}

// ==============================================================================
// Import Graphs
// ==============================================================================

#[test]
fn test_chain_generates_dependencies_first() {
    let ws = Workspace::new();
    ws.write(
        "protos/a.proto",
        &proto("example.com/api/a", &["deps/b.proto"], "message A {}\n"),
    );
    ws.write(
        "protos/deps/b.proto",
        &proto("example.com/api/b", &["deps/c.proto"], "message B {}\n"),
    );
    ws.write(
        "protos/deps/c.proto",
        &proto("example.com/api/c", &[], "message C {}\n"),
    );

    let output = generator(&ws).generate(&mut Runtime::new()).expect("generate");
    assert_eq!(source_names(&output.schemas), vec!["c.proto", "b.proto", "a.proto"]);
    assert_eq!(ws.read("cue.mod/module.cue"), "module: \"example.com/api\"\n");
    for dir in ["a", "b", "c"] {
        assert!(ws.join(&format!("{dir}/{dir}.cue")).is_file(), "missing {dir}");
    }
}

#[test]
fn test_diamond_generates_shared_dependency_once() {
    let ws = Workspace::new();
    ws.write(
        "protos/top.proto",
        &proto("", &["left/l.proto", "right/r.proto"], "message Top {}\n"),
    );
    ws.write("protos/left/l.proto", &proto("", &["shared/s.proto"], "message L {}\n"));
    ws.write("protos/right/r.proto", &proto("", &["shared/s.proto"], "message R {}\n"));
    ws.write("protos/shared/s.proto", &proto("", &[], "message S {}\n"));

    let output = generator(&ws).generate(&mut Runtime::new()).expect("generate");
    let names = source_names(&output.schemas);
    assert_eq!(names.iter().filter(|n| *n == "s.proto").count(), 1);
    assert_eq!(names.first().map(String::as_str), Some("s.proto"));
    assert_eq!(names.last().map(String::as_str), Some("top.proto"));
}

#[test]
fn test_cycle_is_an_error() {
    let ws = Workspace::new();
    ws.write("protos/a.proto", &proto("", &["b.proto"], ""));
    ws.write("protos/b.proto", &proto("", &["a.proto"], ""));

    let err = generator(&ws)
        .generate(&mut Runtime::new())
        .expect_err("cycle");
    assert_eq!(err.kind(), ErrorKind::CyclicImport);
    let rendered = render_diagnostic(&miette::Report::new(err));
    assert!(rendered.contains("protocue::cyclic_import"), "{rendered}");
    assert!(rendered.contains("a.proto"), "{rendered}");
}

#[test]
fn test_cross_package_reference_is_imported() {
    let ws = Workspace::new();
    ws.write(
        "protos/service.proto",
        "syntax = \"proto3\";\npackage svc;\noption go_package = \"example.com/api/svc\";\nimport \"types.proto\";\nmessage Call { types.Item item = 1; }\n",
    );
    ws.write(
        "protos/types.proto",
        "syntax = \"proto3\";\npackage types;\noption go_package = \"example.com/api/types\";\nmessage Item { string id = 1; }\n",
    );

    let mut runtime = Runtime::new();
    generator(&ws).generate(&mut runtime).expect("generate");
    let service = ws.read("svc/service.cue");
    assert!(service.contains("import \"example.com/api/types\""), "{service}");
    assert!(service.contains("item?: types.#Item @protobuf(1,types.Item)"), "{service}");

    // A document importing the generated package resolves its definitions.
    let doc = runtime
        .compile(
            "use.cue",
            "import \"example.com/api/types\"\n\nitem: types.#Item & {id: \"x\"}\n",
        )
        .expect("compiles");
    runtime.validate(&doc).expect("validates");
    let bad = runtime
        .compile(
            "use.cue",
            "import \"example.com/api/types\"\n\nitem: types.#Item & {name: \"x\"}\n",
        )
        .expect("compiles");
    assert!(runtime.validate(&bad).is_err());
}

#[test]
fn test_nested_types_reject_invalid_test_data() {
    let ws = Workspace::new();
    ws.write(
        "protos/tree.proto",
        &proto(
            "pkg.v1;pkgv1",
            &[],
            "message Node {\n  enum Kind { LEAF = 0; BRANCH = 1; }\n  Kind kind = 1;\n}\n",
        ),
    );

    let mut runtime = Runtime::new();
    add_test_case(&mut runtime, &generator(&ws), &ws.join("tests"), "tree")
        .expect("add test case");

    let ok = runtime
        .compile(
            "ok.cue",
            "import pkgv1 \"pkg/v1\"\n\nnode: pkgv1.#Node & {kind: \"BRANCH\"}\n",
        )
        .expect("compiles");
    runtime.validate(&ok).expect("validates");

    let bad = runtime
        .compile(
            "bad.cue",
            "import pkgv1 \"pkg/v1\"\n\nnode: pkgv1.#Node & {kind: \"NOPE\"}\n",
        )
        .expect("compiles");
    let err = runtime.validate(&bad).expect_err("unknown enum value");
    assert!(
        err.messages().iter().any(|m| m.starts_with("node.kind: ")),
        "{:?}",
        err.messages()
    );
}

// ==============================================================================
// Well-Known Files
// ==============================================================================

#[test]
fn test_well_knowns_are_fetched_once() {
    let ws = Workspace::new();
    ws.write(
        "protos/event.proto",
        &proto(
            "",
            &["google/protobuf/timestamp.proto"],
            "message Event {\n  google.protobuf.Timestamp at = 1;\n}\n",
        ),
    );

    let calls = Rc::new(Cell::new(0));
    let registry = registry(&ws);
    let entries = registry.entries().count();
    let mut generator = Generator::new();
    generator
        .proto_root(ws.join("protos"))
        .out_dir(ws.path())
        .protofile(format!("{}/protos/*.proto", ws.path().display()))
        .registry(registry)
        .fetcher(CountingFetcher {
            calls: Rc::clone(&calls),
        });

    let mut runtime = Runtime::new();
    let first = generator.generate(&mut runtime).expect("first run");
    assert_eq!(calls.get(), entries);
    assert!(ws.join("tmp/wellknowns/google/protobuf/timestamp.proto").is_file());

    let instance = first.schemas[0].instance().expect("kept in memory");
    let text = runtime.render(instance);
    assert!(text.contains("at?: time.Time"), "{text}");

    generator.generate(&mut Runtime::new()).expect("second run");
    assert_eq!(calls.get(), entries, "cached files are not fetched again");
}

// ==============================================================================
// Round Trip
// ==============================================================================

#[test]
fn test_generated_schemas_round_trip() {
    let ws = Workspace::new();
    ws.write(
        "protos/shop.proto",
        "syntax = \"proto3\";
package shop;
option go_package = \"example.com/shop/v1;shopv1\";
import \"google/protobuf/timestamp.proto\";

// An order.
message Order {
  string id = 1;
  map<string, LineItem> items = 2;
  Status status = 3;
  google.protobuf.Timestamp placed_at = 4;
  oneof payment {
    string card = 5;
    string voucher = 6;
  }
  message LineItem {
    int64 quantity = 1;
    repeated Order related = 2;
  }
}

enum Status {
  STATUS_UNSPECIFIED = 0;
  STATUS_OPEN = 1;
}
",
    );

    let mut runtime = Runtime::new();
    let output = generator(&ws).generate(&mut runtime).expect("generate");
    let GeneratedSchema::Materialized { path, .. } = &output.schemas[0] else {
        panic!("expected a materialized schema");
    };
    assert_eq!(path, &ws.join("v1/shop.cue"));

    let text = std::fs::read_to_string(path).expect("read schema");
    let compiled = runtime.compile("shop.cue", &text).expect("re-compiles");
    assert_eq!(runtime.render(&compiled), text);
    runtime.validate(&compiled).expect("validates");
}

// ==============================================================================
// Failures
// ==============================================================================

#[test]
fn test_syntax_errors_point_into_the_file() {
    let ws = Workspace::new();
    ws.write(
        "protos/broken.proto",
        "syntax = \"proto3\";\nmessage Broken {\n  string name = 1\n}\n",
    );

    let err = generator(&ws)
        .generate(&mut Runtime::new())
        .expect_err("syntax error");
    assert_eq!(err.kind(), ErrorKind::Parse);
    let rendered = render_diagnostic(&miette::Report::new(err));
    assert!(rendered.contains("protocue::parse"), "{rendered}");
    assert!(rendered.contains("expected"), "{rendered}");
    assert!(rendered.contains("broken.proto"), "{rendered}");
}

#[test]
fn test_missing_import_is_a_parse_error() {
    let ws = Workspace::new();
    ws.write("protos/a.proto", &proto("", &["nowhere.proto"], ""));
    let err = generator(&ws)
        .generate(&mut Runtime::new())
        .expect_err("missing import");
    assert_eq!(err.kind(), ErrorKind::Parse);
    assert!(err.to_string().contains("nowhere.proto"), "{err}");
}

#[test]
fn test_empty_input_is_distinguished() {
    let ws = Workspace::new();
    let err = generator(&ws)
        .generate(&mut Runtime::new())
        .expect_err("no files");
    assert!(err.is_empty_input());
    assert!(!ws.join("cue.mod").exists());
}
