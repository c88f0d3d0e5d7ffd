//! API credential retrieval
//!
//! The bearer token for the chat endpoint can come from several places.
//! Resolution order, most secure first: process environment, `.env` file,
//! the persisted key-value store (set interactively from the front-end),
//! then the config file value.

use std::env;

use super::constants::env_vars;

/// Load environment variables from a `.env` file in the working directory.
/// A missing file is fine; any other failure is reported as a warning.
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => {
            tracing::debug!("loaded environment variables from {}", path.display());
        }
        Err(dotenvy::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!("failed to load .env file: {}", e);
        }
    }
}

/// Resolve the chat API credential.
///
/// `stored` is the value read from the key-value store, `config_value` the
/// value from `sidechat.toml`. Returns `None` when no source provides a
/// non-empty key; the session maps that to its missing-credential error.
pub fn resolve_api_key(stored: Option<&str>, config_value: Option<&str>) -> Option<String> {
    for var in [env_vars::PRIMARY_API_KEY, env_vars::FALLBACK_API_KEY] {
        if let Ok(key) = env::var(var) {
            if !key.is_empty() {
                return Some(key);
            }
        }
    }

    if let Some(key) = stored {
        if !key.is_empty() {
            return Some(key.to_string());
        }
    }

    config_value
        .filter(|key| !key.is_empty())
        .map(|key| key.to_string())
}
