// ==============================================================================
// Test-Case Scaffold
// ==============================================================================
//
// `add <name>` writes `tests/<lowerCamelName>.cue`: a skeleton describing the
// shape of a test case, merged with whatever schemas the generation pipeline
// produced, validated, and rendered. An existing file is never overwritten.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::Error;
use crate::pipeline::{Generator, ModuleOutput, compose_and_validate};
use crate::schema::{Runtime, quote};

/// Directory test cases are written to, relative to the output root.
pub const TESTS_DIR: &str = "tests";

/// What [`add_test_case`] did.
#[derive(Debug)]
pub enum ScaffoldOutcome {
    /// The file was written. `generated` is `None` when no input files
    /// matched and the file holds the skeleton alone.
    Created {
        path: PathBuf,
        generated: Option<ModuleOutput>,
    },
    /// A file for this test case already exists and was left untouched.
    AlreadyExists(PathBuf),
}

/// Convert a test name to lower camel case: `"HTTPServer"` -> `"httpServer"`,
/// `"my test"` -> `"myTest"`.
///
/// Words are separated by non-alphanumeric characters and by case changes;
/// the first word is lowercased and every later word is capitalized.
pub fn lower_camel(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for (i, word) in words(name).iter().enumerate() {
        if i == 0 {
            out.push_str(&word.to_lowercase());
            continue;
        }
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

fn words(name: &str) -> Vec<String> {
    let chars: Vec<char> = name.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();
    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        if let Some(&prev) = i.checked_sub(1).and_then(|p| chars.get(p))
            && !current.is_empty()
        {
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            let boundary = (prev.is_lowercase() && c.is_uppercase())
                || (prev.is_ascii_digit() && c.is_alphabetic())
                || (prev.is_uppercase() && c.is_uppercase() && next_lower);
            if boundary {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// The skeleton every test-case file starts from.
pub fn skeleton_source(name: &str) -> String {
    format!(
        "name: {}
Input: {{}}
Output: {{}}
#Test: {{
\tmethod: string
\tinput:  Input
\toutput: Output
}}
cases: [...#Test] & [
\t{{
\t\tmethod: \"\"
\t\tinput: {{}}
\t\toutput: {{}}
\t}},
]
",
        quote(name)
    )
}

/// Create the test-case file for `name` under `tests_dir`.
///
/// Schemas are generated first with `generator`; when its patterns match no
/// files the skeleton is written on its own. The composed document must
/// validate before anything is written.
pub fn add_test_case(
    runtime: &mut Runtime,
    generator: &Generator,
    tests_dir: &Path,
    name: &str,
) -> Result<ScaffoldOutcome, Error> {
    let file_name = format!("{}.cue", lower_camel(name));
    let path = tests_dir.join(&file_name);

    fs::create_dir_all(tests_dir).map_err(|e| Error::io(tests_dir, e))?;
    if path.exists() {
        return Ok(ScaffoldOutcome::AlreadyExists(path));
    }

    let skeleton = runtime
        .compile(&file_name, &skeleton_source(name))
        .map_err(Error::Schema)?;

    let generated = match generator.generate(runtime) {
        Ok(output) => Some(output),
        Err(e) if e.is_empty_input() => None,
        Err(e) => return Err(e),
    };
    let schemas = generated.as_ref().map_or(&[][..], |g| g.schemas.as_slice());
    let composed = compose_and_validate(runtime, &skeleton, schemas)?;

    fs::write(&path, runtime.render(&composed)).map_err(|e| Error::io(&path, e))?;
    info!(path = %path.display(), "create");
    Ok(ScaffoldOutcome::Created { path, generated })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wellknown::WellKnownRegistry;
    use pretty_assertions::assert_eq;

    #[test]
    fn lower_camel_cases() {
        assert_eq!(lower_camel("my test"), "myTest");
        assert_eq!(lower_camel("MyTest"), "myTest");
        assert_eq!(lower_camel("HTTPServer"), "httpServer");
        assert_eq!(lower_camel("get_user-by id"), "getUserById");
        assert_eq!(lower_camel("myHTTPServer"), "myHTTPServer");
        assert_eq!(lower_camel("test1case"), "test1Case");
        assert_eq!(lower_camel("ID"), "id");
        assert_eq!(lower_camel(""), "");
    }

    #[test]
    fn skeleton_renders_canonically() {
        let rt = Runtime::new();
        let skeleton = rt.compile("myTest.cue", &skeleton_source("My Test")).expect("compiles");
        rt.validate(&skeleton).expect("validates");
        insta::assert_snapshot!(rt.render(&skeleton), @r#"
        name: "My Test"
        Input: {}
        Output: {}

        #Test: {
        	method: string
        	input: Input
        	output: Output
        }

        cases: [...#Test] & [
        	{
        		method: ""
        		input: {}
        		output: {}
        	},
        ]
        "#);
    }

    fn generator(dir: &Path) -> Generator {
        let mut generator = Generator::new();
        generator
            .proto_root(dir.join("protos"))
            .out_dir(dir)
            .protofile(format!("{}/protos/*.proto", dir.display()))
            .registry(WellKnownRegistry::empty(dir.join("cache")));
        generator
    }

    #[test]
    fn skeleton_only_without_protofiles() {
        let dir = tempfile::tempdir().expect("tempdir");
        let tests_dir = dir.path().join(TESTS_DIR);
        let outcome = add_test_case(&mut Runtime::new(), &generator(dir.path()), &tests_dir, "my test")
            .expect("creates");
        let ScaffoldOutcome::Created { path, generated } = outcome else {
            panic!("expected a new file");
        };
        assert_eq!(path, tests_dir.join("myTest.cue"));
        assert!(generated.is_none());
        assert_eq!(
            fs::read_to_string(&path).expect("written"),
            Runtime::new()
                .render(&Runtime::new().compile("x", &skeleton_source("my test")).expect("compiles"))
        );
    }

    #[test]
    fn existing_files_are_never_overwritten() {
        let dir = tempfile::tempdir().expect("tempdir");
        let tests_dir = dir.path().join(TESTS_DIR);
        fs::create_dir_all(&tests_dir).expect("mkdir");
        fs::write(tests_dir.join("myTest.cue"), "keep me\n").expect("write");

        let outcome = add_test_case(&mut Runtime::new(), &generator(dir.path()), &tests_dir, "my test")
            .expect("refuses quietly");
        assert!(matches!(outcome, ScaffoldOutcome::AlreadyExists(_)));
        assert_eq!(
            fs::read_to_string(tests_dir.join("myTest.cue")).expect("read"),
            "keep me\n"
        );
    }

    #[test]
    fn unpackaged_schemas_are_merged_in() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(dir.path().join("protos")).expect("mkdir");
        fs::write(
            dir.path().join("protos").join("echo.proto"),
            "syntax = \"proto3\";\nmessage EchoRequest { string text = 1; }\n",
        )
        .expect("write");

        let tests_dir = dir.path().join(TESTS_DIR);
        let outcome = add_test_case(&mut Runtime::new(), &generator(dir.path()), &tests_dir, "echo")
            .expect("creates");
        let ScaffoldOutcome::Created { path, generated } = outcome else {
            panic!("expected a new file");
        };
        assert_eq!(generated.map(|g| g.schemas.len()), Some(1));
        let text = fs::read_to_string(path).expect("written");
        assert!(text.starts_with("name: \"echo\"\n"), "{text}");
        assert!(text.contains("#EchoRequest: {\n\ttext?: string @protobuf(1,string)\n}"), "{text}");
    }
}
