use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

use super::platform;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub push: PushConfig,
}

/// User-provided credentials.  Both are optional on disk; the client refuses
/// to do anything until both are present.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ServerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Explicit mpv binary.  Falls back to a PATH lookup when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mpv_binary: Option<PathBuf>,
    #[serde(default = "default_volume")]
    pub volume: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushConfig {
    #[serde(default = "default_push_host")]
    pub host: String,
    #[serde(default = "default_push_channel")]
    pub channel: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            mpv_binary: None,
            volume: default_volume(),
        }
    }
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            host: default_push_host(),
            channel: default_push_channel(),
        }
    }
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_request_timeout() -> u64 {
    15
}

fn default_volume() -> f32 {
    0.7
}

fn default_push_host() -> String {
    "ws.pusherapp.com".to_string()
}

fn default_push_channel() -> String {
    "now_playing_updates".to_string()
}

impl HttpConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Validated `{serverUrl, authToken}` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub server_url: String,
    pub auth_token: String,
}

impl Credentials {
    /// Returns `None` unless both values are non-blank.  A trailing `/` is
    /// stripped from the URL so endpoint paths can be appended directly.
    pub fn new(server_url: &str, auth_token: &str) -> Option<Self> {
        let server_url = server_url.trim().trim_end_matches('/');
        let auth_token = auth_token.trim();
        if server_url.is_empty() || auth_token.is_empty() {
            return None;
        }
        Some(Self {
            server_url: server_url.to_string(),
            auth_token: auth_token.to_string(),
        })
    }
}

impl Config {
    /// Load from `path`, creating it with defaults when missing.  A file that
    /// fails to parse is logged and replaced in memory by the defaults; it is
    /// left untouched on disk.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(path)?;
        match toml::from_str(&content) {
            Ok(config) => Ok(config),
            Err(e) => {
                warn!("config: {} is invalid, using defaults: {}", path.display(), e);
                Ok(Self::default())
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }

    pub fn credentials(&self) -> Option<Credentials> {
        Credentials::new(
            self.server.url.as_deref().unwrap_or_default(),
            self.server.token.as_deref().unwrap_or_default(),
        )
    }

    pub fn set_credentials(&mut self, credentials: &Credentials) {
        self.server.url = Some(credentials.server_url.clone());
        self.server.token = Some(credentials.auth_token.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.credentials().is_none());
        assert_eq!(config.http.connect_timeout_secs, 5);
        assert_eq!(config.push.channel, "now_playing_updates");
        assert!(config.player.mpv_binary.is_none());
    }

    #[test]
    fn credentials_require_both_fields() {
        assert!(Credentials::new("https://play.local", "  ").is_none());
        assert!(Credentials::new("", "token").is_none());
        let creds = Credentials::new(" https://play.local/ ", " abc ").unwrap();
        assert_eq!(creds.server_url, "https://play.local");
        assert_eq!(creds.auth_token, "abc");
    }

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("play").join("config.toml");
        let config = Config::load_from(&path).unwrap();
        assert!(config.credentials().is_none());
        assert!(path.exists());
    }

    #[test]
    fn credentials_survive_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = Config::default();
        config.set_credentials(&Credentials::new("https://play.local", "tok").unwrap());
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        let creds = loaded.credentials().unwrap();
        assert_eq!(creds.server_url, "https://play.local");
        assert_eq!(creds.auth_token, "tok");
    }

    #[test]
    fn invalid_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "server = [not toml").unwrap();
        let config = Config::load_from(&path).unwrap();
        assert!(config.credentials().is_none());
        assert_eq!(config.http.request_timeout_secs, 15);
    }
}
