use std::fs;
use std::path::{Path, PathBuf};

use crate::model::config::ClientConfig;

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// `<config dir>/arbor/config.toml`, e.g. `~/.config/arbor/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("arbor").join("config.toml"))
}

/// Read and parse a config file. Missing keys take their defaults.
pub fn read_config(path: &Path) -> Result<ClientConfig, ConfigError> {
    let text = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Load the configuration.
///
/// An explicit path must exist. Otherwise the default location is used when
/// present, and built-in defaults when not.
pub fn load_config(explicit: Option<&Path>) -> Result<ClientConfig, ConfigError> {
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        return read_config(path);
    }
    match default_config_path() {
        Some(path) if path.exists() => read_config(&path),
        _ => Ok(ClientConfig::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::config::StaleResponses;
    use tempfile::TempDir;

    #[test]
    fn test_read_full_config() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(
            &path,
            r#"[server]
base_url = "https://todo.example.com"
api_prefix = "/v2"
timeout_secs = 5
session_cookie = "session=xyz"

[log]
debug = true

[sync]
stale_responses = "apply"
"#,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.server.base_url, "https://todo.example.com");
        assert_eq!(config.server.api_prefix, "/v2");
        assert_eq!(config.server.timeout_secs, 5);
        assert_eq!(config.server.session_cookie.as_deref(), Some("session=xyz"));
        assert!(config.log.debug);
        assert_eq!(config.sync.stale_responses, StaleResponses::Apply);
    }

    #[test]
    fn test_partial_config_takes_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "[server]\ntimeout_secs = 10\n").unwrap();

        let config = read_config(&path).unwrap();
        assert_eq!(config.server.timeout_secs, 10);
        assert_eq!(config.server.base_url, "http://localhost:5000");
        assert_eq!(config.server.api_prefix, "/api");
        assert_eq!(config.sync.stale_responses, StaleResponses::Discard);
        assert!(!config.log.debug);
    }

    #[test]
    fn test_missing_explicit_path() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nope.toml");
        assert!(matches!(
            load_config(Some(&path)),
            Err(ConfigError::NotFound(_))
        ));
    }

    #[test]
    fn test_invalid_policy_is_parse_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "[sync]\nstale_responses = \"sometimes\"\n").unwrap();

        let err = read_config(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
        assert!(err.to_string().starts_with("could not parse"));
    }
}
