//! Notifier configuration
//!
//! Sources, later ones win:
//! 1. Built-in defaults
//! 2. Config file `~/.config/job-push-notifier/config.json` (or an explicit path),
//!    JSON with `app_api_token`, `user_id_token`, and optional `api_url`, `timeout_secs`
//! 3. Environment `PUSHOVER_APP_TOKEN` / `PUSHOVER_USER_KEY`
//!
//! Blank credentials are not rejected here. The notifier checks them on every
//! call and reports a configuration error then.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::notification::channel::Credentials;
use crate::notification::channels::pushover::{
    PushoverConfig, DEFAULT_TIMEOUT_SECS, PUSHOVER_API_URL,
};

pub const ENV_APP_TOKEN: &str = "PUSHOVER_APP_TOKEN";
pub const ENV_USER_KEY: &str = "PUSHOVER_USER_KEY";

/// Notifier configuration
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct NotifierConfig {
    pub app_api_token: String,
    pub user_id_token: String,
    pub api_url: String,
    pub timeout_secs: u64,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            app_api_token: String::new(),
            user_id_token: String::new(),
            api_url: PUSHOVER_API_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl std::fmt::Debug for NotifierConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifierConfig")
            .field("credentials", &self.credentials())
            .field("api_url", &self.api_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl NotifierConfig {
    /// Default config file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".config/job-push-notifier/config.json"))
    }

    /// Load file + environment.
    ///
    /// An explicit `path` must exist; the default location is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(p) => Self::from_file(p)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(p) => Self::from_file(&p)?,
                None => Self::default(),
            },
        };

        Ok(config.merge_env(|key| std::env::var(key).ok()))
    }

    /// Read a JSON config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        debug!(path = %path.display(), "Loaded notifier config");
        Ok(config)
    }

    /// Override credentials from environment lookups; empty values are ignored
    pub fn merge_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(token) = lookup(ENV_APP_TOKEN).filter(|v| !v.trim().is_empty()) {
            self.app_api_token = token;
        }
        if let Some(user) = lookup(ENV_USER_KEY).filter(|v| !v.trim().is_empty()) {
            self.user_id_token = user;
        }
        self
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.app_api_token.clone(), self.user_id_token.clone())
    }

    pub fn pushover(&self) -> PushoverConfig {
        PushoverConfig {
            api_url: self.api_url.clone(),
            timeout_secs: self.timeout_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_values() {
        let config = NotifierConfig::default();
        assert!(config.app_api_token.is_empty());
        assert!(config.user_id_token.is_empty());
        assert_eq!(config.api_url, PUSHOVER_API_URL);
        assert_eq!(config.timeout_secs, 30);
        assert!(!config.credentials().is_complete());
    }

    #[test]
    fn test_from_file_partial() {
        let file = write_config(r#"{"app_api_token": "app", "user_id_token": "user"}"#);
        let config = NotifierConfig::from_file(file.path()).unwrap();

        assert_eq!(config.app_api_token, "app");
        assert_eq!(config.user_id_token, "user");
        assert_eq!(config.api_url, PUSHOVER_API_URL);
        assert!(config.credentials().is_complete());
    }

    #[test]
    fn test_from_file_full() {
        let file = write_config(
            r#"{"app_api_token": "app", "user_id_token": "user",
                "api_url": "http://localhost:9999/1/messages.json", "timeout_secs": 5}"#,
        );
        let config = NotifierConfig::from_file(file.path()).unwrap();
        let pushover = config.pushover();

        assert_eq!(pushover.api_url, "http://localhost:9999/1/messages.json");
        assert_eq!(pushover.timeout_secs, 5);
    }

    #[test]
    fn test_from_file_invalid_json() {
        let file = write_config("not json");
        let err = NotifierConfig::from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("Invalid config file"));
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        assert!(NotifierConfig::load(Some(&missing)).is_err());
    }

    #[test]
    fn test_merge_env_overrides_file() {
        let config = NotifierConfig {
            app_api_token: "file-app".to_string(),
            user_id_token: "file-user".to_string(),
            ..Default::default()
        }
        .merge_env(|key| match key {
            ENV_APP_TOKEN => Some("env-app".to_string()),
            ENV_USER_KEY => Some("  ".to_string()),
            _ => None,
        });

        assert_eq!(config.app_api_token, "env-app");
        // blank env values do not clobber the file
        assert_eq!(config.user_id_token, "file-user");
    }

    #[test]
    fn test_debug_hides_tokens() {
        let config = NotifierConfig {
            app_api_token: "secret-app".to_string(),
            user_id_token: "secret-user".to_string(),
            ..Default::default()
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("secret-app"));
        assert!(!debug.contains("secret-user"));
    }
}
