// ==============================================================================
// Generation Pipeline
// ==============================================================================
//
//   globs --expand--> files --fetch well-knowns--> --resolve--> graph
//         --namespace--> module descriptor --generate (dependency order)-->
//         schemas --compose with skeleton--> validated instance
//
// Every step runs once, sequentially, against one caller-owned `Runtime`.

use std::fmt;
use std::path::PathBuf;

use tracing::debug;

use crate::error::Error;
use crate::generate::{GeneratedSchema, generate_schema};
use crate::glob;
use crate::layout::{Layout, Namespace, derive_namespace, write_module_descriptor};
use crate::resolve::ImportResolver;
use crate::schema::{Instance, Runtime, SchemaError};
use crate::wellknown::{Fetch, HttpFetcher, WellKnownRegistry, ensure_well_knowns};

/// Default directory imports are resolved under.
pub const DEFAULT_PROTO_ROOT: &str = "./";

/// Builder for one generation run.
///
/// Follows the non-consuming builder pattern: configuration methods take
/// `&mut self` and return it for chaining.
///
/// # Examples
///
/// ```no_run
/// use protocue::{Generator, Runtime};
///
/// let mut runtime = Runtime::new();
/// let output = Generator::new()
///     .proto_root("protos")
///     .protofile("protos/**/*.proto")
///     .generate(&mut runtime)?;
/// for schema in &output.schemas {
///     println!("{}", schema.source().display());
/// }
/// # Ok::<(), protocue::Error>(())
/// ```
pub struct Generator {
    proto_root: PathBuf,
    out_dir: PathBuf,
    protofiles: Vec<String>,
    registry: WellKnownRegistry,
    fetcher: Box<dyn Fetch>,
}

/// Everything one run produced.
#[derive(Debug)]
pub struct ModuleOutput {
    /// `None` when no input file declares a package.
    pub namespace: Option<Namespace>,
    /// The module descriptor, written only when there is a namespace.
    pub descriptor: Option<PathBuf>,
    /// One entry per generated file, in dependency order.
    pub schemas: Vec<GeneratedSchema>,
}

impl fmt::Debug for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Generator")
            .field("proto_root", &self.proto_root)
            .field("out_dir", &self.out_dir)
            .field("protofiles", &self.protofiles)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl Default for Generator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator {
    /// A run over no files, resolving imports under `./`, writing into the
    /// current directory, and fetching well-knowns over HTTP.
    pub fn new() -> Self {
        Generator {
            proto_root: PathBuf::from(DEFAULT_PROTO_ROOT),
            out_dir: PathBuf::from("."),
            protofiles: Vec::new(),
            registry: WellKnownRegistry::new(),
            fetcher: Box::new(HttpFetcher::default()),
        }
    }

    /// Directory imports (and relative input paths) are resolved under.
    pub fn proto_root(&mut self, dir: impl Into<PathBuf>) -> &mut Self {
        self.proto_root = dir.into();
        self
    }

    /// Root of the generated tree.
    pub fn out_dir(&mut self, dir: impl Into<PathBuf>) -> &mut Self {
        self.out_dir = dir.into();
        self
    }

    /// Add a glob pattern selecting input files.
    pub fn protofile(&mut self, pattern: impl Into<String>) -> &mut Self {
        self.protofiles.push(pattern.into());
        self
    }

    pub fn registry(&mut self, registry: WellKnownRegistry) -> &mut Self {
        self.registry = registry;
        self
    }

    /// Replace the HTTP fetcher used for well-known files.
    pub fn fetcher(&mut self, fetcher: impl Fetch + 'static) -> &mut Self {
        self.fetcher = Box::new(fetcher);
        self
    }

    /// Run the pipeline, registering every materialized package with
    /// `runtime`.
    ///
    /// Fails with [`Error::EmptyInput`] before touching the network or the
    /// output tree when the patterns match nothing.
    pub fn generate(&self, runtime: &mut Runtime) -> Result<ModuleOutput, Error> {
        let files = glob::expand_all(&self.protofiles)?;
        debug!(count = files.len(), "expanded input patterns");

        ensure_well_knowns(&self.registry, self.fetcher.as_ref())?;

        let graph = ImportResolver::new(&self.proto_root, &self.registry).resolve(&files)?;

        let namespace = derive_namespace(graph.packages());
        let descriptor = match &namespace {
            Some(ns) => Some(write_module_descriptor(&self.out_dir, ns)?),
            None => {
                debug!("no input declares a package, skipping module descriptor");
                None
            }
        };

        let mut layout = Layout::new(&self.out_dir, namespace.clone());
        let mut schemas = Vec::with_capacity(graph.files().len());
        for file in graph.files() {
            schemas.push(generate_schema(runtime, &mut layout, &graph, file)?);
        }

        Ok(ModuleOutput {
            namespace,
            descriptor,
            schemas,
        })
    }
}

/// Merge every in-memory schema into `skeleton` and validate the result.
///
/// Materialized schemas take part through the runtime's package registry,
/// so only the in-memory ones are merged here.
pub fn compose_and_validate(
    runtime: &Runtime,
    skeleton: &Instance,
    generated: &[GeneratedSchema],
) -> Result<Instance, Error> {
    let mut composed = skeleton.clone();
    for instance in generated.iter().filter_map(GeneratedSchema::instance) {
        composed = runtime.merge(&composed, instance).map_err(Error::Schema)?;
    }
    match runtime.validate(&composed) {
        Ok(()) => Ok(composed),
        Err(SchemaError::Invalid(diagnostics)) => Err(Error::Validation { diagnostics }),
        Err(other) => Err(Error::Schema(other)),
    }
}
