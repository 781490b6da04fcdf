// ==============================================================================
// Glob Expansion
// ==============================================================================
//
// Patterns support `*`, `?`, `[abc]`/`[!abc]`, `{a,b}` and `**` (any number of
// directories). The literal leading directories of a pattern are walked with
// `walkdir`; every file below them is matched against the pattern compiled
// with `globset`. Results are in file-name order per directory.

use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher};

use crate::error::Error;

fn has_meta(s: &str) -> bool {
    s.contains(['*', '?', '[', '{'])
}

/// Expand every pattern, keeping first-seen order and dropping duplicates.
///
/// Fails with [`Error::EmptyInput`] when nothing matched at all, including
/// when no patterns were given.
pub fn expand_all(patterns: &[String]) -> Result<Vec<PathBuf>, Error> {
    let mut out: Vec<PathBuf> = Vec::new();
    for pattern in patterns {
        for path in expand(pattern)? {
            if !out.contains(&path) {
                out.push(path);
            }
        }
    }
    if out.is_empty() {
        return Err(Error::EmptyInput {
            patterns: patterns.to_vec(),
        });
    }
    Ok(out)
}

/// The files matching one pattern. A pattern without wildcards matches the
/// file it names, if that file exists.
pub fn expand(pattern: &str) -> Result<Vec<PathBuf>, Error> {
    if !has_meta(pattern) {
        let path = PathBuf::from(pattern);
        return Ok(if path.is_file() { vec![path] } else { Vec::new() });
    }

    let components: Vec<&str> = pattern.split('/').collect();
    let literal = components.iter().take_while(|c| !has_meta(c)).count();
    let base = components[..literal].join("/");
    let (root, implicit_root) = match base.as_str() {
        "" if literal == 0 => (PathBuf::from("."), true),
        "" => (PathBuf::from("/"), false),
        b => (PathBuf::from(b), false),
    };
    let recursive = components[literal..].iter().any(|c| c.contains("**"));
    let matcher = compile(pattern)?;

    let mut walker = walkdir::WalkDir::new(&root).sort_by_file_name();
    if !recursive {
        walker = walker.max_depth(components.len() - literal);
    }

    let mut out = Vec::new();
    for entry in walker.into_iter().filter_map(Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let path = if implicit_root {
            path.strip_prefix(".").unwrap_or(path)
        } else {
            path
        };
        if matcher.is_match(slashed(path)) {
            out.push(path.to_path_buf());
        }
    }
    Ok(out)
}

fn slashed(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Compile a glob whose wildcards never cross a `/`, except `**`.
fn compile(pattern: &str) -> Result<GlobMatcher, Error> {
    let glob = GlobBuilder::new(pattern)
        .literal_separator(true)
        .backslash_escape(true)
        .build()
        .map_err(|e| Error::Glob {
            pattern: pattern.to_string(),
            reason: e.kind().to_string(),
        })?;
    Ok(glob.compile_matcher())
}
