// ==============================================================================
// Errors: Source-Span Diagnostics and the Pipeline Error Taxonomy
// ==============================================================================
//
// Two layers live here:
//   - `ParseDiagnostic`: a syntax error with a named source and a byte span,
//     shared by the protobuf reader and the schema-language parser.
//   - `Error`: every failure the generation pipeline can report. Each variant
//     carries a stable `ErrorKind` tag so callers can branch on the kind of
//     failure without inspecting message text.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use miette::{LabeledSpan, NamedSource, SourceSpan};

/// A parse error with source location information for rich diagnostics.
#[derive(Debug)]
pub struct ParseDiagnostic {
    pub src: NamedSource<String>,
    pub span: SourceSpan,
    pub message: String,
    /// Text attached to the highlighted span. Falls back to `message`.
    pub label: Option<String>,
    pub help: Option<String>,
}

impl ParseDiagnostic {
    pub(crate) fn new(
        source_name: &str,
        source: &str,
        offset: usize,
        len: usize,
        message: impl Into<String>,
    ) -> Self {
        ParseDiagnostic {
            src: NamedSource::new(source_name, source.to_string()),
            span: (offset, len).into(),
            message: message.into(),
            label: None,
            help: None,
        }
    }

    #[must_use]
    pub(crate) fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }
}

impl fmt::Display for ParseDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ParseDiagnostic {}

impl miette::Diagnostic for ParseDiagnostic {
    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&self.src)
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.help
            .as_ref()
            .map(|h| Box::new(h) as Box<dyn fmt::Display + 'a>)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let label = self.label.clone().unwrap_or_else(|| self.message.clone());
        Some(Box::new(std::iter::once(LabeledSpan::new_with_span(
            Some(label),
            self.span,
        ))))
    }
}

// ==============================================================================
// Pipeline Errors
// ==============================================================================

/// Why an IDL file could not be read.
#[derive(Debug)]
pub enum ParseFailure {
    /// The file could not be opened or read.
    Io(io::Error),
    /// The file was read but is not valid protobuf.
    Syntax(Box<ParseDiagnostic>),
}

/// A single well-known file that could not be fetched into the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    pub relative_path: String,
    pub url: String,
    pub reason: String,
}

/// The kind of an [`Error`], for matching on the failure class alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    EmptyInput,
    Glob,
    Parse,
    CyclicImport,
    Fetch,
    Generation,
    LayoutCollision,
    Schema,
    Validation,
    Io,
}

/// Every failure the generation pipeline and the test scaffold can report.
///
/// All variants except [`Error::EmptyInput`] abort the current run. Empty input
/// is the one expected condition: callers check for it with
/// [`Error::is_empty_input`] and continue without generated schemas.
#[derive(Debug)]
pub enum Error {
    /// None of the supplied glob patterns matched a file.
    EmptyInput { patterns: Vec<String> },
    /// A glob pattern could not be compiled or walked.
    Glob { pattern: String, reason: String },
    /// An IDL file (or one of its imports) could not be read.
    Parse { path: PathBuf, cause: ParseFailure },
    /// The import graph contains a cycle. The first and last entries are the
    /// same file.
    CyclicImport { cycle: Vec<PathBuf> },
    /// One or more well-known files could not be fetched.
    Fetch { failures: Vec<FetchFailure> },
    /// Translating or writing a generated schema failed.
    Generation { path: PathBuf, reason: String },
    /// Two distinct packages or source files map onto the same output.
    LayoutCollision {
        output: PathBuf,
        first: String,
        second: String,
    },
    /// A schema document (usually the skeleton) failed to compile.
    Schema(crate::schema::SchemaError),
    /// The composed schema does not validate.
    Validation { diagnostics: Vec<String> },
    /// Any other filesystem failure, with the path involved.
    Io { path: PathBuf, source: io::Error },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::EmptyInput { .. } => ErrorKind::EmptyInput,
            Error::Glob { .. } => ErrorKind::Glob,
            Error::Parse { .. } => ErrorKind::Parse,
            Error::CyclicImport { .. } => ErrorKind::CyclicImport,
            Error::Fetch { .. } => ErrorKind::Fetch,
            Error::Generation { .. } => ErrorKind::Generation,
            Error::LayoutCollision { .. } => ErrorKind::LayoutCollision,
            Error::Schema(_) => ErrorKind::Schema,
            Error::Validation { .. } => ErrorKind::Validation,
            Error::Io { .. } => ErrorKind::Io,
        }
    }

    /// Whether this is the recoverable "no IDL files found" condition.
    pub fn is_empty_input(&self) -> bool {
        self.kind() == ErrorKind::EmptyInput
    }

    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        Error::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn generation(path: &Path, reason: impl Into<String>) -> Self {
        Error::Generation {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::EmptyInput { patterns } => {
                write!(f, "no IDL files matched {}", patterns.join(", "))
            }
            Error::Glob { pattern, reason } => write!(f, "invalid glob `{pattern}`: {reason}"),
            Error::Parse { path, cause } => match cause {
                ParseFailure::Io(e) => write!(f, "read {}: {e}", path.display()),
                ParseFailure::Syntax(d) => write!(f, "parse {}: {d}", path.display()),
            },
            Error::CyclicImport { cycle } => {
                let chain: Vec<String> = cycle.iter().map(|p| p.display().to_string()).collect();
                write!(f, "import cycle: {}", chain.join(" -> "))
            }
            Error::Fetch { failures } => {
                write!(f, "failed to fetch {} well-known file(s)", failures.len())?;
                for failure in failures {
                    write!(
                        f,
                        "\n  {} from {}: {}",
                        failure.relative_path, failure.url, failure.reason
                    )?;
                }
                Ok(())
            }
            Error::Generation { path, reason } => {
                write!(f, "generate schema for {}: {reason}", path.display())
            }
            Error::LayoutCollision {
                output,
                first,
                second,
            } => write!(
                f,
                "`{first}` and `{second}` both map to {}",
                output.display()
            ),
            Error::Schema(e) => write!(f, "{e}"),
            Error::Validation { diagnostics } => {
                write!(f, "schema validation failed")?;
                for d in diagnostics {
                    write!(f, "\n  {d}")?;
                }
                Ok(())
            }
            Error::Io { path, source } => write!(f, "{}: {source}", path.display()),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Parse {
                cause: ParseFailure::Io(e),
                ..
            } => Some(e),
            Error::Parse {
                cause: ParseFailure::Syntax(d),
                ..
            } => Some(d.as_ref()),
            Error::Schema(e) => Some(e),
            Error::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl miette::Diagnostic for Error {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let code = match self.kind() {
            ErrorKind::EmptyInput => "protocue::empty_input",
            ErrorKind::Glob => "protocue::glob",
            ErrorKind::Parse => "protocue::parse",
            ErrorKind::CyclicImport => "protocue::cyclic_import",
            ErrorKind::Fetch => "protocue::fetch",
            ErrorKind::Generation => "protocue::generation",
            ErrorKind::LayoutCollision => "protocue::layout_collision",
            ErrorKind::Schema => "protocue::schema",
            ErrorKind::Validation => "protocue::validation",
            ErrorKind::Io => "protocue::io",
        };
        Some(Box::new(code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match self {
            Error::CyclicImport { .. } => Some(Box::new(
                "break the cycle by moving the shared messages into a separate file",
            )),
            Error::LayoutCollision { .. } => Some(Box::new(
                "give the packages distinct `go_package` paths or rename one of the files",
            )),
            Error::Parse {
                cause: ParseFailure::Syntax(d),
                ..
            } => d
                .help
                .as_ref()
                .map(|h| Box::new(h) as Box<dyn fmt::Display + 'a>),
            _ => None,
        }
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        match self {
            Error::Parse {
                cause: ParseFailure::Syntax(d),
                ..
            } => Some(&d.src),
            Error::Schema(crate::schema::SchemaError::Syntax(d)) => Some(&d.src),
            _ => None,
        }
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        match self {
            Error::Parse {
                cause: ParseFailure::Syntax(d),
                ..
            } => miette::Diagnostic::labels(d.as_ref()),
            Error::Schema(crate::schema::SchemaError::Syntax(d)) => {
                miette::Diagnostic::labels(d.as_ref())
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_recognized_by_tag() {
        let err = Error::EmptyInput {
            patterns: vec!["protos/*.proto".to_string()],
        };
        assert!(err.is_empty_input());
        assert_eq!(err.kind(), ErrorKind::EmptyInput);

        // A different error whose message mentions the same words is not
        // mistaken for empty input.
        let other = Error::generation(Path::new("a.proto"), "no IDL files matched");
        assert!(!other.is_empty_input());
    }

    #[test]
    fn cycle_message_lists_the_chain() {
        let err = Error::CyclicImport {
            cycle: vec!["a.proto".into(), "b.proto".into(), "a.proto".into()],
        };
        assert_eq!(err.to_string(), "import cycle: a.proto -> b.proto -> a.proto");
    }

    #[test]
    fn fetch_message_lists_every_failure() {
        let err = Error::Fetch {
            failures: vec![FetchFailure {
                relative_path: "google/protobuf/timestamp.proto".into(),
                url: "https://example.invalid/timestamp.proto".into(),
                reason: "timed out".into(),
            }],
        };
        let msg = err.to_string();
        assert!(msg.starts_with("failed to fetch 1 well-known file(s)"));
        assert!(msg.contains("timed out"), "{msg}");
    }
}
