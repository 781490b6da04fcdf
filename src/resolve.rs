// ==============================================================================
// Import Resolution: Dependency Order Over the Import Graph
// ==============================================================================
//
// Starting from the top-level files, every import is located, read once, and
// ordered so that each file comes after everything it imports. The walk is an
// explicit depth-first worklist, not recursion:
//
//   - `done` (the graph's index) holds canonical paths already ordered; a file
//     reached again through a diamond is skipped.
//   - the worklist itself is the current import chain; reaching a file that is
//     still on it is a cycle, reported with the chain that closes it.
//
// Imports named in the well-known registry are not walked. Their cached
// copies are parsed, when present, so their type names can be resolved.

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::debug;

use crate::error::{Error, ParseFailure};
use crate::model::proto::{IdlFile, ImportKind};
use crate::reader::read_idl;
use crate::wellknown::WellKnownRegistry;

/// One file of the import graph, with its imports located.
#[derive(Debug, Clone)]
pub struct ResolvedFile {
    /// Canonical path.
    pub path: PathBuf,
    pub idl: Rc<IdlFile>,
    /// Canonical paths of the direct, non-well-known imports, without
    /// duplicates, in declaration order.
    pub imports: Vec<PathBuf>,
    /// The subset of `imports` declared `import public`.
    pub public_imports: Vec<PathBuf>,
    /// Direct imports satisfied by the well-known registry.
    pub well_known_imports: Vec<String>,
}

/// The files reachable from a set of top-level files, in dependency order.
#[derive(Debug, Default)]
pub struct ResolvedGraph {
    files: Vec<ResolvedFile>,
    index: HashMap<PathBuf, usize>,
    /// Canonical paths in the order they were first read.
    discovered: Vec<PathBuf>,
    /// Parsed cached copies of well-known files, by relative path.
    well_known: HashMap<String, Rc<IdlFile>>,
}

impl ResolvedGraph {
    /// Every file, each after all of its imports.
    pub fn files(&self) -> &[ResolvedFile] {
        &self.files
    }

    pub fn get(&self, path: &Path) -> Option<&ResolvedFile> {
        self.index.get(path).map(|&i| &self.files[i])
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Package strings in the order their files were discovered.
    pub fn packages(&self) -> impl Iterator<Item = &str> + '_ {
        self.discovered
            .iter()
            .filter_map(|p| self.get(p))
            .map(|f| f.idl.package.as_str())
    }

    /// The files whose types `file` may refer to: its direct imports, the
    /// files those re-export with `import public` (transitively), and the
    /// cached well-known files it imports. `file` itself is not included.
    pub fn visible_from(&self, file: &ResolvedFile) -> Vec<Visible<'_>> {
        let mut out = Vec::new();
        let mut seen: HashSet<&Path> = HashSet::new();
        let mut queue: Vec<&Path> = file.imports.iter().map(PathBuf::as_path).collect();
        queue.reverse();
        while let Some(path) = queue.pop() {
            if !seen.insert(path) {
                continue;
            }
            let Some(dep) = self.get(path) else {
                continue;
            };
            out.push(Visible::Generated(dep));
            for public in dep.public_imports.iter().rev() {
                queue.push(public);
            }
        }
        for relative in &file.well_known_imports {
            if let Some(idl) = self.well_known.get(relative) {
                out.push(Visible::WellKnown(idl));
            }
        }
        out
    }

    fn push(&mut self, file: ResolvedFile) {
        self.index.insert(file.path.clone(), self.files.len());
        self.files.push(file);
    }
}

/// A file whose declarations are in scope for another.
#[derive(Debug, Clone, Copy)]
pub enum Visible<'g> {
    Generated(&'g ResolvedFile),
    WellKnown(&'g IdlFile),
}

/// Locates and reads every file reachable from a set of top-level files.
pub struct ImportResolver<'a> {
    proto_root: PathBuf,
    registry: &'a WellKnownRegistry,
}

/// A file read but not yet ordered: one entry of the worklist.
struct Frame {
    file: ResolvedFile,
    next: usize,
}

impl<'a> ImportResolver<'a> {
    pub fn new(proto_root: impl Into<PathBuf>, registry: &'a WellKnownRegistry) -> Self {
        ImportResolver {
            proto_root: proto_root.into(),
            registry,
        }
    }

    /// Resolve every top-level file and everything it imports.
    pub fn resolve(&self, top_level: &[PathBuf]) -> Result<ResolvedGraph, Error> {
        let mut graph = ResolvedGraph::default();
        for file in top_level {
            let path = self.locate_top_level(file)?;
            self.walk(path, &mut graph)?;
        }
        Ok(graph)
    }

    /// Paths from the command line live under the proto root unless they
    /// already name it.
    fn locate_top_level(&self, file: &Path) -> Result<PathBuf, Error> {
        let path = if file.starts_with(&self.proto_root) || file.is_absolute() {
            file.to_path_buf()
        } else {
            self.proto_root.join(file)
        };
        canonical(&path)
    }

    fn walk(&self, root: PathBuf, graph: &mut ResolvedGraph) -> Result<(), Error> {
        if graph.index.contains_key(&root) {
            return Ok(());
        }
        let mut stack = vec![self.open(root, graph)?];

        while let Some(frame) = stack.last_mut() {
            if frame.next < frame.file.imports.len() {
                let dep = frame.file.imports[frame.next].clone();
                frame.next += 1;
                if graph.index.contains_key(&dep) {
                    continue;
                }
                if let Some(start) = stack.iter().position(|f| f.file.path == dep) {
                    let mut cycle: Vec<PathBuf> =
                        stack[start..].iter().map(|f| f.file.path.clone()).collect();
                    cycle.push(dep);
                    return Err(Error::CyclicImport { cycle });
                }
                let child = self.open(dep, graph)?;
                stack.push(child);
            } else if let Some(finished) = stack.pop() {
                debug!(path = %finished.file.path.display(), "resolved imports");
                graph.push(finished.file);
            }
        }
        Ok(())
    }

    /// Read `path` and locate its imports.
    fn open(&self, path: PathBuf, graph: &mut ResolvedGraph) -> Result<Frame, Error> {
        let idl = read_idl(&path)?;
        graph.discovered.push(path.clone());

        let mut imports = Vec::new();
        let mut public_imports = Vec::new();
        let mut well_known_imports = Vec::new();
        for import in &idl.imports {
            if self.registry.contains(&import.path) {
                debug!(import = %import.path, "skip well-known import");
                if !well_known_imports.contains(&import.path) {
                    self.load_well_known(&import.path, graph)?;
                    well_known_imports.push(import.path.clone());
                }
                continue;
            }
            let located = self.locate_import(&import.path, &path)?;
            if import.kind == ImportKind::Public && !public_imports.contains(&located) {
                public_imports.push(located.clone());
            }
            if !imports.contains(&located) {
                imports.push(located);
            }
        }

        Ok(Frame {
            file: ResolvedFile {
                path,
                idl: Rc::new(idl),
                imports,
                public_imports,
                well_known_imports,
            },
            next: 0,
        })
    }

    /// Imports are relative to the proto root, then to the well-known cache.
    fn locate_import(&self, import: &str, importer: &Path) -> Result<PathBuf, Error> {
        let candidate = self.proto_root.join(import);
        if candidate.exists() {
            return canonical(&candidate);
        }
        let cached = self.registry.cache_path(import);
        if cached.exists() {
            return canonical(&cached);
        }
        Err(Error::Parse {
            path: candidate,
            cause: ParseFailure::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("import not found (imported by {})", importer.display()),
            )),
        })
    }

    fn load_well_known(&self, relative: &str, graph: &mut ResolvedGraph) -> Result<(), Error> {
        if graph.well_known.contains_key(relative) {
            return Ok(());
        }
        let cached = self.registry.cache_path(relative);
        if cached.exists() {
            let idl = read_idl(&cached)?;
            graph.well_known.insert(relative.to_string(), Rc::new(idl));
        }
        Ok(())
    }
}

fn canonical(path: &Path) -> Result<PathBuf, Error> {
    path.canonicalize().map_err(|e| Error::Parse {
        path: path.to_path_buf(),
        cause: ParseFailure::Io(e),
    })
}
