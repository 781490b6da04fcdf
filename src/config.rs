// ==============================================================================
// Configuration File
// ==============================================================================
//
// An optional `protocue.json` supplies defaults for the command-line options
// and extends the well-known registry. Comments (`//` and `/* */`) are allowed,
// so configuration can be annotated:
//
//   {
//     // where imports are looked up
//     "proto_path": "protos",
//     "well_known_root": "tmp/wellknowns",
//     "well_knowns": { "google/type/date.proto": "https://..." },
//     "fetch_timeout_secs": 30
//   }

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::Value;

use crate::wellknown::WellKnownRegistry;

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_FILE: &str = "protocue.json";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub proto_path: Option<PathBuf>,
    pub well_known_root: Option<PathBuf>,
    /// Extra or overriding well-known entries, in file order.
    pub well_knowns: Vec<(String, String)>,
    pub fetch_timeout: Option<Duration>,
}

impl Config {
    /// Read a configuration file. A missing file yields the defaults only
    /// when `required` is false.
    pub fn load(path: &Path, required: bool) -> miette::Result<Config> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !required => {
                return Ok(Config::default());
            }
            Err(e) => {
                return Err(miette::miette!("read config {}: {e}", path.display()));
            }
        };
        Config::parse(&text).map_err(|e| miette::miette!("config {}: {e}", path.display()))
    }

    /// Parse configuration text.
    pub fn parse(text: &str) -> Result<Config, String> {
        let value = parse_json_with_comments(text).map_err(|e| e.to_string())?;
        let Value::Object(obj) = value else {
            return Err("expected a JSON object".to_string());
        };

        let mut config = Config::default();
        for (key, value) in obj {
            match key.as_str() {
                "proto_path" => config.proto_path = Some(PathBuf::from(string(&key, &value)?)),
                "well_known_root" => {
                    config.well_known_root = Some(PathBuf::from(string(&key, &value)?));
                }
                "well_knowns" => {
                    let Value::Object(entries) = value else {
                        return Err("`well_knowns` must be an object of path to URL".to_string());
                    };
                    for (path, url) in entries {
                        let url = string(&path, &url)?;
                        config.well_knowns.push((path, url));
                    }
                }
                "fetch_timeout_secs" => {
                    let secs = value
                        .as_u64()
                        .filter(|s| *s > 0)
                        .ok_or_else(|| "`fetch_timeout_secs` must be a positive integer".to_string())?;
                    config.fetch_timeout = Some(Duration::from_secs(secs));
                }
                other => return Err(format!("unknown key `{other}`")),
            }
        }
        Ok(config)
    }

    /// The built-in registry with this configuration applied.
    pub fn registry(&self) -> WellKnownRegistry {
        let mut registry = WellKnownRegistry::new();
        if let Some(root) = &self.well_known_root {
            registry.set_root(root);
        }
        for (path, url) in &self.well_knowns {
            registry.insert(path, url);
        }
        registry
    }
}

fn string(key: &str, value: &Value) -> Result<String, String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| format!("`{key}` must be a string"))
}

/// Parse JSON with C-style comment stripping (`//` and `/* */`).
fn parse_json_with_comments(input: &str) -> Result<Value, serde_json::Error> {
    serde_json::from_reader(
        json_comments::CommentSettings::c_style().strip_comments(input.as_bytes()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_every_key_with_comments() {
        let config = Config::parse(
            r#"{
                // imports live here
                "proto_path": "protos",
                /* cache */ "well_known_root": "cache",
                "well_knowns": {"google/type/date.proto": "https://example.invalid/date.proto"},
                "fetch_timeout_secs": 5
            }"#,
        )
        .expect("parses");
        assert_eq!(
            config,
            Config {
                proto_path: Some("protos".into()),
                well_known_root: Some("cache".into()),
                well_knowns: vec![(
                    "google/type/date.proto".into(),
                    "https://example.invalid/date.proto".into()
                )],
                fetch_timeout: Some(Duration::from_secs(5)),
            }
        );

        let registry = config.registry();
        assert_eq!(registry.root(), Path::new("cache"));
        assert!(registry.contains("google/type/date.proto"));
        assert!(registry.contains("google/protobuf/timestamp.proto"));
    }

    #[test]
    fn rejects_unknown_keys_and_bad_types() {
        assert_eq!(
            Config::parse(r#"{"proto_dir": "x"}"#).expect_err("unknown"),
            "unknown key `proto_dir`"
        );
        assert_eq!(
            Config::parse(r#"{"fetch_timeout_secs": 0}"#).expect_err("zero"),
            "`fetch_timeout_secs` must be a positive integer"
        );
        assert!(Config::parse("[]").is_err());
    }

    #[test]
    fn missing_optional_file_is_default() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = Config::load(&dir.path().join(DEFAULT_FILE), false).expect("defaults");
        assert_eq!(config, Config::default());
        assert!(Config::load(&dir.path().join(DEFAULT_FILE), true).is_err());
    }
}
