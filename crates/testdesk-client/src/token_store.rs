//! Persistent storage for the access/refresh token pair.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};

use testdesk_core::model::TokenPair;

/// Where the client keeps its tokens between runs.
pub trait TokenStore: Send + Sync {
    /// Current tokens, or `None` when signed out.
    fn load(&self) -> Option<TokenPair>;

    /// Replace both tokens.
    fn save(&self, tokens: &TokenPair) -> Result<()>;

    /// Replace only the access token, keeping the refresh token.
    fn set_access(&self, access: &str) -> Result<()>;

    /// Forget both tokens.
    fn clear(&self) -> Result<()>;
}

/// Tokens stored as JSON in a single file.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Option<TokenPair> {
        let content = std::fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&content) {
            Ok(tokens) => Some(tokens),
            Err(e) => {
                tracing::warn!(
                    "ignoring unreadable token file {}: {e}",
                    self.path.display()
                );
                None
            }
        }
    }

    fn save(&self, tokens: &TokenPair) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(tokens).context("failed to serialize tokens")?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("failed to write tokens to {}", self.path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))
                .with_context(|| format!("failed to restrict {}", self.path.display()))?;
        }
        Ok(())
    }

    fn set_access(&self, access: &str) -> Result<()> {
        let mut tokens = self
            .load()
            .context("no stored session to update")?;
        tokens.access_token = access.to_string();
        self.save(&tokens)
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e)
                .with_context(|| format!("failed to remove {}", self.path.display())),
        }
    }
}

/// In-process token storage.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: Mutex<Option<TokenPair>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokens(access: &str, refresh: &str) -> Self {
        Self {
            tokens: Mutex::new(Some(TokenPair {
                access_token: access.to_string(),
                refresh_token: refresh.to_string(),
            })),
        }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<TokenPair>> {
        self.tokens.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Option<TokenPair> {
        self.slot().clone()
    }

    fn save(&self, tokens: &TokenPair) -> Result<()> {
        *self.slot() = Some(tokens.clone());
        Ok(())
    }

    fn set_access(&self, access: &str) -> Result<()> {
        match self.slot().as_mut() {
            Some(tokens) => {
                tokens.access_token = access.to_string();
                Ok(())
            }
            None => anyhow::bail!("no stored session to update"),
        }
    }

    fn clear(&self) -> Result<()> {
        *self.slot() = None;
        Ok(())
    }
}
