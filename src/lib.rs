//! protocue: turn protobuf definitions into CUE schemas, and scaffold test-case
//! files validated against them.
//!
//! The crate has two entry points, mirroring the `protocue` CLI subcommands:
//!
//! - [`Generator`] expands input globs, fetches the well-known protobuf files
//!   into a local cache, resolves the import graph, writes the module
//!   descriptor, and generates one schema per file in dependency order.
//! - [`add_test_case`] runs a [`Generator`] and merges what it produced with
//!   the test-case skeleton into `tests/<name>.cue`.
//!
//! All schema operations go through an explicit [`Runtime`], which also keeps
//! the generated packages so later documents can import them.
//!
//! # Generating schemas
//!
//! ```no_run
//! use protocue::{Generator, Runtime};
//!
//! let mut runtime = Runtime::new();
//! let output = Generator::new()
//!     .proto_root("protos")
//!     .protofile("protos/*.proto")
//!     .generate(&mut runtime)?;
//! if let Some(descriptor) = &output.descriptor {
//!     println!("module descriptor at {}", descriptor.display());
//! }
//! # Ok::<(), protocue::Error>(())
//! ```
//!
//! # Adding a test case
//!
//! ```no_run
//! use std::path::Path;
//! use protocue::{Generator, Runtime, ScaffoldOutcome, add_test_case};
//!
//! let mut generator = Generator::new();
//! generator.protofile("protos/*.proto");
//! match add_test_case(&mut Runtime::new(), &generator, Path::new("tests"), "create user")? {
//!     ScaffoldOutcome::Created { path, .. } => println!("create: {}", path.display()),
//!     ScaffoldOutcome::AlreadyExists(path) => println!("{} exists", path.display()),
//! }
//! # Ok::<(), protocue::Error>(())
//! ```
//!
//! # Error handling
//!
//! Every fallible operation returns [`Error`], which implements
//! [`miette::Diagnostic`]; syntax errors carry source spans. "No input files"
//! is [`Error::EmptyInput`], the one condition callers are expected to
//! recover from.

pub mod config;
pub mod error;
pub mod generate;
pub mod glob;
pub mod layout;
pub mod model;
pub mod pipeline;
pub mod reader;
pub mod resolve;
pub mod scaffold;
pub mod schema;
pub(crate) mod suggest;
pub mod translate;
pub mod wellknown;

// Re-export the small public API at the crate root.
pub use error::{Error, ErrorKind};
pub use generate::GeneratedSchema;
pub use pipeline::{Generator, ModuleOutput, compose_and_validate};
pub use scaffold::{ScaffoldOutcome, add_test_case};
pub use schema::{Instance, Runtime, SchemaError};
pub use wellknown::{Fetch, HttpFetcher, WellKnownRegistry};
