//! Configuration and credential storage

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::models::CurrentUser;

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_push_host() -> String {
    "localhost".to_string()
}

fn default_push_port() -> u16 {
    6001
}

fn default_push_key() -> String {
    "condochat".to_string()
}

/// Echo websocket endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushConfig {
    #[serde(default = "default_push_host")]
    pub host: String,
    #[serde(default = "default_push_port")]
    pub port: u16,
    /// Application key from the broadcaster configuration.
    #[serde(default = "default_push_key")]
    pub key: String,
    #[serde(default)]
    pub tls: bool,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            host: default_push_host(),
            port: default_push_port(),
            key: default_push_key(),
            tls: false,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the CondoChat REST API
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Current user id (the backend identifies callers by id)
    #[serde(default)]
    pub user_id: u64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    /// Department (apartment unit) id of the current user
    #[serde(default)]
    pub unit_id: u64,
    /// Optional API token, sent as a bearer header when present
    #[serde(default)]
    pub api_token: Option<String>,
    /// Echo websocket endpoint
    #[serde(default)]
    pub push: PushConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_id: 0,
            first_name: String::new(),
            last_name: String::new(),
            unit_id: 0,
            api_token: None,
            push: PushConfig::default(),
        }
    }
}

impl Config {
    /// Get config directory path
    fn config_dir() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "condochat", "condochat-cli")
            .context("Could not determine config directory")?;
        Ok(proj_dirs.config_dir().to_path_buf())
    }

    /// Get config file path
    pub fn path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Cache directory for locally stored conversation history.
    pub fn cache_dir() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "condochat", "condochat-cli")
            .context("Could not determine cache directory")?;
        Ok(proj_dirs.cache_dir().to_path_buf())
    }

    /// Load configuration from disk
    pub fn load() -> Result<Self> {
        let path = Self::path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        toml::from_str(&content).context("Failed to parse config file")
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let dir = Self::config_dir()?;
        fs::create_dir_all(&dir).context("Failed to create config directory")?;

        let path = Self::path()?;
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&path, content).context("Failed to write config file")?;

        // Set restrictive permissions on config file (may contain a token)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            fs::set_permissions(&path, perms).context("Failed to set config permissions")?;
        }

        Ok(())
    }

    /// The configured user, or an error naming the missing setting.
    pub fn current_user(&self) -> Result<CurrentUser> {
        anyhow::ensure!(
            self.user_id != 0,
            "No user_id configured. Edit {} first.",
            Self::path()?.display()
        );
        Ok(CurrentUser {
            id: self.user_id,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            unit_id: self.unit_id,
        })
    }

    /// Websocket URL of the Echo endpoint, Pusher protocol 7.
    pub fn push_url(&self) -> String {
        let scheme = if self.push.tls { "wss" } else { "ws" };
        let e = |s: &str| url::form_urlencoded::byte_serialize(s.as_bytes()).collect::<String>();
        format!(
            "{}://{}:{}/app/{}?protocol=7&client=condochat-cli&version={}&flash=false",
            scheme,
            self.push.host,
            self.push.port,
            e(&self.push.key),
            env!("CARGO_PKG_VERSION"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config: Config = toml::from_str("user_id = 7\nfirst_name = \"Laura\"").unwrap();
        assert_eq!(config.base_url, "http://localhost:8000");
        assert_eq!(config.user_id, 7);
        assert_eq!(config.push.port, 6001);
        assert!(!config.push.tls);
    }

    #[test]
    fn test_push_url_scheme_follows_tls() {
        let mut config = Config::default();
        assert!(config.push_url().starts_with("ws://localhost:6001/app/condochat?protocol=7"));

        config.push.tls = true;
        config.push.host = "chat.example.com".to_string();
        config.push.port = 443;
        assert!(config
            .push_url()
            .starts_with("wss://chat.example.com:443/app/condochat"));
    }

    #[test]
    fn test_current_user_requires_id() {
        let config = Config::default();
        assert!(config.current_user().is_err());
    }
}
