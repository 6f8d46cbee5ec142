use crate::protocol::StreamingInfo;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

/// What survives a restart of the UI: the streaming info of the last session
/// and the server it was fetched from.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct SessionState {
    #[serde(default)]
    pub server_url: Option<String>,
    #[serde(default)]
    pub streaming_info: Option<StreamingInfo>,
}

pub struct SessionStore {
    state_file: PathBuf,
}

impl SessionStore {
    pub fn new(state_file: PathBuf) -> Self {
        Self { state_file }
    }

    /// Cached streaming info, only if it belongs to `server_url`.
    pub fn streaming_info_for(&self, server_url: &str) -> Option<StreamingInfo> {
        let state = self.load();
        match state.server_url.as_deref() {
            Some(url) if url == server_url => state.streaming_info,
            _ => {
                debug!("session: no cached streaming info for {}", server_url);
                None
            }
        }
    }

    pub async fn store(
        &self,
        server_url: &str,
        streaming_info: Option<&StreamingInfo>,
    ) -> anyhow::Result<()> {
        let state = SessionState {
            server_url: Some(server_url.to_string()),
            streaming_info: streaming_info.cloned(),
        };
        if let Some(parent) = self.state_file.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(&state)?;
        tokio::fs::write(&self.state_file, json).await?;
        Ok(())
    }

    pub async fn clear(&self) -> anyhow::Result<()> {
        match tokio::fs::remove_file(&self.state_file).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn load(&self) -> SessionState {
        if let Ok(content) = std::fs::read_to_string(&self.state_file) {
            if let Ok(state) = serde_json::from_str::<SessionState>(&content) {
                return state;
            }
        }
        SessionState::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info() -> StreamingInfo {
        StreamingInfo {
            stream_url: "http://play.local:8000/listen".to_string(),
            pusher_key: "abc123".to_string(),
        }
    }

    #[tokio::test]
    async fn cached_info_is_scoped_to_server() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("state.json"));
        store.store("https://a.local", Some(&info())).await.unwrap();

        assert_eq!(store.streaming_info_for("https://a.local"), Some(info()));
        assert_eq!(store.streaming_info_for("https://b.local"), None);
    }

    #[tokio::test]
    async fn clear_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("state.json"));
        store.clear().await.unwrap();
        store.store("https://a.local", Some(&info())).await.unwrap();
        store.clear().await.unwrap();
        assert_eq!(store.streaming_info_for("https://a.local"), None);
    }

    #[test]
    fn corrupt_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{ nope").unwrap();
        let store = SessionStore::new(path);
        assert_eq!(store.streaming_info_for("https://a.local"), None);
    }
}
