//! Server configuration loaded from a JSON file.
//!
//! The file carries the TCP port and the path to the user store:
//!
//! ```json
//! { "port": 8002, "userDatabase": "~/users.json" }
//! ```
//!
//! Each failure mode gets its own diagnostic so a misconfigured server
//! exits with a message naming the actual problem, not a generic parse
//! error.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub user_database: PathBuf,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} doesn't exist")]
    Missing(String),
    #[error("failed to read {0}: {1}")]
    Io(String, std::io::Error),
    #[error("{0} is not in a valid JSON format")]
    InvalidJson(String),
    #[error("{path} missing key(s): {keys}")]
    MissingKeys { path: String, keys: String },
    #[error("port number out of range")]
    PortOutOfRange,
}

const REQUIRED_KEYS: [&str; 2] = ["port", "userDatabase"];

impl Config {
    /// Loads and validates the configuration at `path`. The port must
    /// be an integer in 1024..=65535; missing keys are reported
    /// together, sorted.
    pub fn load(path: &str) -> Result<Config, ConfigError> {
        let expanded = expand_user(path);
        if !expanded.exists() {
            return Err(ConfigError::Missing(path.to_string()));
        }
        let text = std::fs::read_to_string(&expanded)
            .map_err(|e| ConfigError::Io(path.to_string(), e))?;
        let value: serde_json::Value = serde_json::from_str(&text)
            .map_err(|_| ConfigError::InvalidJson(path.to_string()))?;
        let object = value
            .as_object()
            .ok_or_else(|| ConfigError::InvalidJson(path.to_string()))?;

        let mut missing: Vec<&str> = REQUIRED_KEYS
            .iter()
            .copied()
            .filter(|key| !object.contains_key(*key))
            .collect();
        if !missing.is_empty() {
            missing.sort_unstable();
            return Err(ConfigError::MissingKeys {
                path: path.to_string(),
                keys: missing.join(", "),
            });
        }

        let port = object["port"]
            .as_i64()
            .filter(|p| (1024..=65535).contains(p))
            .ok_or(ConfigError::PortOutOfRange)? as u16;
        let user_database = object["userDatabase"]
            .as_str()
            .ok_or_else(|| ConfigError::InvalidJson(path.to_string()))?;

        Ok(Config {
            port,
            user_database: expand_user(user_database),
        })
    }
}

/// Expands a leading `~/` against `$HOME`, mirroring the path handling
/// users expect from the config file.
pub fn expand_user(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::atomic::{AtomicU32, Ordering};

    static COUNTER: AtomicU32 = AtomicU32::new(0);

    fn write_temp(contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "ttt-config-{}-{}.json",
            std::process::id(),
            COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_valid_config_loads() {
        let path = write_temp(r#"{"port": 8002, "userDatabase": "/tmp/users.json"}"#);
        let config = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.port, 8002);
        assert_eq!(config.user_database, Path::new("/tmp/users.json"));
    }

    #[test]
    fn test_missing_file_is_reported() {
        let err = Config::load("/nonexistent/server-config.json").unwrap_err();
        assert!(matches!(err, ConfigError::Missing(_)));
    }

    #[test]
    fn test_invalid_json_is_reported() {
        let path = write_temp("{port: oops");
        let err = Config::load(path.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidJson(_)));
    }

    #[test]
    fn test_missing_keys_are_listed_sorted() {
        let path = write_temp("{}");
        match Config::load(path.to_str().unwrap()).unwrap_err() {
            ConfigError::MissingKeys { keys, .. } => {
                assert_eq!(keys, "port, userDatabase");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_port_range_is_enforced() {
        for bad in ["1023", "65536", "-1", "\"8002\""] {
            let path = write_temp(&format!(
                r#"{{"port": {}, "userDatabase": "/tmp/u.json"}}"#,
                bad
            ));
            let err = Config::load(path.to_str().unwrap()).unwrap_err();
            assert!(matches!(err, ConfigError::PortOutOfRange), "port {}", bad);
        }
    }

    #[test]
    fn test_tilde_expansion_uses_home() {
        std::env::set_var("HOME", "/home/gamer");
        assert_eq!(expand_user("~/users.json"), Path::new("/home/gamer/users.json"));
        assert_eq!(expand_user("/abs/users.json"), Path::new("/abs/users.json"));
    }
}
