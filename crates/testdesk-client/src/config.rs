//! Client configuration and factory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::http::HttpClient;
use crate::token_store::{FileTokenStore, TokenStore};

/// Top-level testdesk configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the LMS REST API, without a trailing slash.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Where the token pair is persisted.
    #[serde(default)]
    pub token_file: Option<PathBuf>,
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000/api".to_string()
}
fn default_timeout() -> u64 {
    10
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            token_file: None,
        }
    }
}

impl ClientConfig {
    /// Token file path, defaulting to `~/.config/testdesk/tokens.json`.
    pub fn token_path(&self) -> PathBuf {
        self.token_file.clone().unwrap_or_else(|| {
            dirs_path()
                .unwrap_or_else(|| PathBuf::from(".testdesk"))
                .join("tokens.json")
        })
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
///
/// Substituted values are copied verbatim and never scanned again.
fn resolve_env_vars(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(end) = rest[start..].find('}') else {
            break;
        };
        result.push_str(&rest[..start]);
        let var_name = &rest[start + 2..start + end];
        result.push_str(&std::env::var(var_name).unwrap_or_default());
        rest = &rest[start + end + 1..];
    }
    result.push_str(rest);
    result
}

/// Load config from an explicit path, or search the default locations.
///
/// Search order without a path:
/// 1. `testdesk.toml` in the current directory
/// 2. `~/.config/testdesk/config.toml`
///
/// Environment variable overrides: `TESTDESK_API_URL`, `TESTDESK_TOKEN_FILE`.
pub fn load_config_from(path: Option<&Path>) -> Result<ClientConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("testdesk.toml");
        if local.exists() {
            Some(local)
        } else if let Some(home) = dirs_path() {
            let global = home.join("config.toml");
            if global.exists() {
                Some(global)
            } else {
                None
            }
        } else {
            None
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<ClientConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => ClientConfig::default(),
    };

    if let Ok(url) = std::env::var("TESTDESK_API_URL") {
        config.base_url = url;
    }
    if let Ok(file) = std::env::var("TESTDESK_TOKEN_FILE") {
        config.token_file = Some(PathBuf::from(file));
    }

    config.base_url = resolve_env_vars(&config.base_url)
        .trim_end_matches('/')
        .to_string();
    config.token_file = config
        .token_file
        .map(|p| PathBuf::from(resolve_env_vars(&p.to_string_lossy())));

    anyhow::ensure!(config.timeout_secs > 0, "timeout_secs must be at least 1");

    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("testdesk"))
}

/// Build an HTTP client backed by the configured token file.
pub fn create_client(config: &ClientConfig) -> Result<HttpClient> {
    let store: Arc<dyn TokenStore> = Arc::new(FileTokenStore::new(config.token_path()));
    HttpClient::new(config, store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("_TESTDESK_TEST_VAR", "lms.example.org");
        assert_eq!(
            resolve_env_vars("https://${_TESTDESK_TEST_VAR}/api"),
            "https://lms.example.org/api"
        );
        assert_eq!(resolve_env_vars("no vars"), "no vars");
        assert_eq!(resolve_env_vars("${unterminated"), "${unterminated");
        std::env::remove_var("_TESTDESK_TEST_VAR");
    }

    #[test]
    fn substituted_values_are_not_expanded_again() {
        std::env::set_var("_TESTDESK_SELF_REF", "${_TESTDESK_SELF_REF}");
        assert_eq!(
            resolve_env_vars("http://${_TESTDESK_SELF_REF}/api"),
            "http://${_TESTDESK_SELF_REF}/api"
        );
        assert_eq!(
            resolve_env_vars("${_TESTDESK_SELF_REF}-${_TESTDESK_UNSET_VAR}-tail"),
            "${_TESTDESK_SELF_REF}--tail"
        );
        std::env::remove_var("_TESTDESK_SELF_REF");
    }

    #[test]
    fn default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "http://127.0.0.1:8000/api");
        assert_eq!(config.timeout_secs, 10);
        assert!(config.token_path().ends_with("tokens.json"));
    }

    #[test]
    fn parse_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("testdesk.toml");
        std::fs::write(
            &path,
            r#"
base_url = "https://lms.example.org/api/"
timeout_secs = 30
token_file = "/tmp/td-tokens.json"
"#,
        )
        .unwrap();

        let config = load_config_from(Some(&path)).unwrap();
        assert_eq!(config.timeout_secs, 30);
        if std::env::var("TESTDESK_TOKEN_FILE").is_err() {
            assert_eq!(config.token_path(), PathBuf::from("/tmp/td-tokens.json"));
        }
        if std::env::var("TESTDESK_API_URL").is_err() {
            assert_eq!(config.base_url, "https://lms.example.org/api");
        }
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let err = load_config_from(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }
}
