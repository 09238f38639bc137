//! Subcommand implementations and the glue they share.

pub mod auth;
pub mod history;
pub mod init;
pub mod results;
pub mod retake;
pub mod take;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};

use testdesk_client::{create_client, load_config_from, HttpClient};
use testdesk_core::ApiError;

/// Load config and build the HTTP client.
pub(crate) fn connect(config_path: Option<PathBuf>) -> Result<Arc<HttpClient>> {
    let config = load_config_from(config_path.as_deref())?;
    tracing::debug!(base_url = %config.base_url, "using backend");
    Ok(Arc::new(create_client(&config)?))
}

pub(crate) fn require_login(client: &HttpClient) -> Result<()> {
    anyhow::ensure!(
        client.is_authenticated(),
        "not logged in. Run `testdesk login` first."
    );
    Ok(())
}

/// Turn an API failure into the message shown to the user.
pub(crate) fn api_error(err: ApiError, action: &str) -> anyhow::Error {
    let message = err.user_message(action);
    if err.requires_login() {
        return login_hint(&message);
    }
    match err {
        ApiError::Forbidden(_) | ApiError::NotFound(_) => anyhow::anyhow!(message),
        other => anyhow::Error::new(other).context(format!("failed to {action}")),
    }
}

pub(crate) fn login_hint(message: &str) -> anyhow::Error {
    anyhow::anyhow!("{message} Run `testdesk login` to sign in again.")
}

pub(crate) fn fmt_time(t: Option<DateTime<Utc>>) -> String {
    t.map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}
