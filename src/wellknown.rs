// ==============================================================================
// Well-Known Registry and Fetcher
// ==============================================================================
//
// Some imports name files that are never part of the input set, such as
// `google/protobuf/timestamp.proto`. The registry maps each such relative path
// to a download URL, and `ensure_well_knowns` makes sure every entry is present
// in a local cache directory before import resolution starts.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use indexmap::IndexMap;
use tracing::{debug, info};

use crate::error::{Error, FetchFailure};

/// Default cache directory, relative to the working directory.
pub const DEFAULT_ROOT: &str = "tmp/wellknowns";

/// Default per-download timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const PROTOBUF_SOURCE: &str =
    "https://raw.githubusercontent.com/protocolbuffers/protobuf/master/src/";

const BUILTIN: &[&str] = &[
    "google/protobuf/timestamp.proto",
    "google/protobuf/duration.proto",
    "google/protobuf/empty.proto",
    "google/protobuf/struct.proto",
    "google/protobuf/wrappers.proto",
    "google/protobuf/any.proto",
    "google/protobuf/field_mask.proto",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WellKnownEntry {
    pub relative_path: String,
    pub source_url: String,
}

/// The set of well-known files and the directory they are cached in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WellKnownRegistry {
    root: PathBuf,
    entries: IndexMap<String, String>,
}

impl Default for WellKnownRegistry {
    fn default() -> Self {
        let entries = BUILTIN
            .iter()
            .map(|path| (path.to_string(), format!("{PROTOBUF_SOURCE}{path}")))
            .collect();
        WellKnownRegistry {
            root: PathBuf::from(DEFAULT_ROOT),
            entries,
        }
    }
}

impl WellKnownRegistry {
    /// The built-in table, cached under [`DEFAULT_ROOT`].
    pub fn new() -> Self {
        WellKnownRegistry::default()
    }

    /// An empty registry cached under `root`.
    pub fn empty(root: impl Into<PathBuf>) -> Self {
        WellKnownRegistry {
            root: root.into(),
            entries: IndexMap::new(),
        }
    }

    pub fn set_root(&mut self, root: impl Into<PathBuf>) -> &mut Self {
        self.root = root.into();
        self
    }

    /// Add an entry, replacing any existing entry for the same path.
    pub fn insert(&mut self, relative_path: impl Into<String>, url: impl Into<String>) -> &mut Self {
        self.entries.insert(relative_path.into(), url.into());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether an import names a well-known file.
    pub fn contains(&self, relative_path: &str) -> bool {
        self.entries.contains_key(relative_path)
    }

    /// Where the cached copy of `relative_path` lives.
    pub fn cache_path(&self, relative_path: &str) -> PathBuf {
        self.root.join(relative_path)
    }

    pub fn entries(&self) -> impl Iterator<Item = WellKnownEntry> + '_ {
        self.entries.iter().map(|(path, url)| WellKnownEntry {
            relative_path: path.clone(),
            source_url: url.clone(),
        })
    }
}

/// Downloads a URL into memory.
pub trait Fetch {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, String>;
}

/// Fetches over HTTP(S) with a bounded timeout per request.
#[derive(Debug)]
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Self {
        HttpFetcher {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        HttpFetcher::new(DEFAULT_TIMEOUT)
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, String> {
        let response = self.agent.get(url).call().map_err(|e| e.to_string())?;
        let mut body = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut body)
            .map_err(|e| e.to_string())?;
        Ok(body)
    }
}

/// Download every registry entry missing from the cache.
///
/// Entries already on disk are left alone. Each remaining entry is fetched
/// and written independently; failures are collected and reported together
/// after every entry has been attempted. The whole body is downloaded before
/// anything is written, so a failed fetch never leaves an empty file behind.
///
/// Returns the paths that were written.
pub fn ensure_well_knowns(
    registry: &WellKnownRegistry,
    fetcher: &dyn Fetch,
) -> Result<Vec<PathBuf>, Error> {
    let mut written = Vec::new();
    let mut failures = Vec::new();

    for entry in registry.entries() {
        let target = registry.cache_path(&entry.relative_path);
        if target.exists() {
            debug!(path = %target.display(), "well-known file already cached");
            continue;
        }

        info!(url = %entry.source_url, "download well-known");
        let result = fetcher.fetch(&entry.source_url).and_then(|body| {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| format!("{}: {e}", parent.display()))?;
            }
            fs::write(&target, body).map_err(|e| format!("{}: {e}", target.display()))
        });
        match result {
            Ok(()) => written.push(target),
            Err(reason) => failures.push(FetchFailure {
                relative_path: entry.relative_path,
                url: entry.source_url,
                reason,
            }),
        }
    }

    if failures.is_empty() {
        Ok(written)
    } else {
        Err(Error::Fetch { failures })
    }
}
