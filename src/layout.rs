// ==============================================================================
// Output Layout: Namespace, Package Directories, Module Descriptor
// ==============================================================================
//
// Where a generated schema lands is a pure function of its package string and
// the run's namespace:
//
//   package "github.com/foo/bar/baz"    namespace "github.com/foo"
//       -> <out>/bar/baz/<file>.cue     import path "github.com/foo/bar/baz"
//
//   package "pkg.v1;pkgv1"              namespace "pkg"
//       -> <out>/v1/<file>.cue          import path "pkg/v1"
//
// `Layout` applies that function for one run and refuses to let two distinct
// packages, or two distinct source files, share an output.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::Error;
use crate::schema::quote;

/// A package string split into its path and its declared name.
///
/// `"example.com/foo/bar;barpb"` has path `example.com/foo/bar` and name
/// `barpb`. Without a `;name` suffix the name is the last path segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSpec {
    pub path: String,
    pub name: String,
}

impl PackageSpec {
    /// Parse a non-empty package string. Returns `None` for an empty one.
    pub fn parse(package: &str) -> Option<PackageSpec> {
        let package = package.trim();
        let (path, name) = match package.split_once(';') {
            Some((path, name)) => (path.trim(), Some(name.trim())),
            None => (package, None),
        };
        let path = path.trim_matches('/');
        if path.is_empty() {
            return None;
        }
        let name = match name {
            Some(name) if !name.is_empty() => name,
            _ => segments(path).last().copied().unwrap_or(path),
        };
        Some(PackageSpec {
            path: path.to_string(),
            name: sanitize_identifier(name),
        })
    }

    pub fn segments(&self) -> Vec<&str> {
        segments(&self.path)
    }

    /// The first segment that names no directory of its own: `.`, `..` or
    /// an empty one.
    fn escaping_segment(&self) -> Option<&str> {
        let separator = if self.path.contains('/') { '/' } else { '.' };
        self.path
            .split(separator)
            .find(|s| matches!(*s, "" | "." | ".."))
    }
}

/// Split a package path on `/` if it has one, else on `.`.
fn segments(path: &str) -> Vec<&str> {
    let separator = if path.contains('/') { '/' } else { '.' };
    path.split(separator).filter(|s| !s.is_empty()).collect()
}

fn sanitize_identifier(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// The root identifier of the generated schema tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    segments: Vec<String>,
}

impl Namespace {
    pub fn as_string(&self) -> String {
        self.segments.join("/")
    }

    /// The segments of `spec` below this namespace, or `None` when the
    /// namespace is not a prefix of the package path.
    fn strip<'a>(&self, spec: &'a PackageSpec) -> Option<Vec<&'a str>> {
        let segments = spec.segments();
        let prefix = segments.len() >= self.segments.len()
            && self.segments.iter().zip(&segments).all(|(a, b)| a == b);
        prefix.then(|| segments[self.segments.len()..].to_vec())
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_string())
    }
}

/// Derive the namespace from the first non-empty package string.
///
/// The namespace keeps the first two segments of the package path, but
/// always leaves at least one segment for the package directory, so a
/// two-segment package contributes one segment and a single-segment package
/// is its own namespace. Returns `None` when no package string is non-empty.
pub fn derive_namespace<'a>(packages: impl IntoIterator<Item = &'a str>) -> Option<Namespace> {
    let spec = packages.into_iter().find_map(PackageSpec::parse)?;
    let segments = spec.segments();
    let keep = if segments.len() <= 1 {
        segments.len()
    } else {
        2.min(segments.len() - 1)
    };
    Some(Namespace {
        segments: segments[..keep].iter().map(|s| s.to_string()).collect(),
    })
}

/// The output directory of a package, relative to the output root.
///
/// The namespace prefix is removed when present; a package outside the
/// namespace keeps its whole path.
pub fn package_dir(spec: &PackageSpec, namespace: Option<&Namespace>) -> PathBuf {
    let rest = namespace
        .and_then(|ns| ns.strip(spec))
        .unwrap_or_else(|| spec.segments());
    rest.iter().collect()
}

/// The import path other schemas use to refer to a package.
pub fn import_path(spec: &PackageSpec, namespace: Option<&Namespace>) -> String {
    let dir = package_dir(spec, namespace);
    let dir: Vec<String> = dir
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    match namespace {
        Some(ns) if dir.is_empty() => ns.as_string(),
        Some(ns) => format!("{ns}/{}", dir.join("/")),
        None => dir.join("/"),
    }
}

/// Create `<out>/cue.mod/{pkg,usr}` and write `<out>/cue.mod/module.cue`
/// naming the namespace. Returns the descriptor path.
pub fn write_module_descriptor(out_dir: &Path, namespace: &Namespace) -> Result<PathBuf, Error> {
    let module_dir = out_dir.join("cue.mod");
    for dir in [module_dir.join("pkg"), module_dir.join("usr")] {
        fs::create_dir_all(&dir).map_err(|e| Error::io(&dir, e))?;
    }
    let descriptor = module_dir.join("module.cue");
    let text = format!("module: {}\n", quote(&namespace.as_string()));
    fs::write(&descriptor, text).map_err(|e| Error::io(&descriptor, e))?;
    info!(path = %descriptor.display(), namespace = %namespace, "write module descriptor");
    Ok(descriptor)
}

/// Where one generated schema goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    /// Absolute or output-root-relative directory.
    pub dir: PathBuf,
    pub file: PathBuf,
    pub import_path: String,
    pub package_name: String,
}

/// The output layout of one run.
#[derive(Debug)]
pub struct Layout {
    out_dir: PathBuf,
    namespace: Option<Namespace>,
    /// Output directory -> the package path that claimed it.
    dirs: HashMap<PathBuf, String>,
    /// Output file -> the source file that claimed it.
    files: HashMap<PathBuf, PathBuf>,
}

impl Layout {
    pub fn new(out_dir: impl Into<PathBuf>, namespace: Option<Namespace>) -> Self {
        Layout {
            out_dir: out_dir.into(),
            namespace,
            dirs: HashMap::new(),
            files: HashMap::new(),
        }
    }

    pub fn namespace(&self) -> Option<&Namespace> {
        self.namespace.as_ref()
    }

    /// Reserve the output of `source`, declared in `spec`.
    ///
    /// Outputs stay below the output root: package paths with `.`, `..` or
    /// empty segments are refused. Several files of one package share a directory, but a directory
    /// belongs to one package path, and a file to one source.
    pub fn claim(&mut self, spec: &PackageSpec, source: &Path) -> Result<Placement, Error> {
        if let Some(segment) = spec.escaping_segment() {
            return Err(Error::generation(
                source,
                format!("package path `{}` has an invalid segment `{segment}`", spec.path),
            ));
        }
        let dir = self
            .out_dir
            .join(package_dir(spec, self.namespace.as_ref()));

        if let Some(owner) = self.dirs.get(&dir)
            && owner != &spec.path
        {
            return Err(Error::LayoutCollision {
                output: dir,
                first: owner.clone(),
                second: spec.path.clone(),
            });
        }

        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "schema".to_string());
        let file = dir.join(format!("{stem}.cue"));
        if let Some(owner) = self.files.get(&file)
            && owner != source
        {
            return Err(Error::LayoutCollision {
                output: file,
                first: owner.display().to_string(),
                second: source.display().to_string(),
            });
        }

        self.dirs.insert(dir.clone(), spec.path.clone());
        self.files.insert(file.clone(), source.to_path_buf());
        Ok(Placement {
            dir,
            file,
            import_path: import_path(spec, self.namespace.as_ref()),
            package_name: spec.name.clone(),
        })
    }
}
