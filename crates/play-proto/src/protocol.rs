use serde::{Deserialize, Serialize};

/// A track as reported by the Play server.  Snapshots are immutable; a
/// changed starred flag arrives as a whole new `Song` on the next refresh.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Song {
    /// Server-assigned identifier, sent back on star/unstar/dequeue.
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub album: String,
    #[serde(default)]
    pub starred: bool,
}

impl Song {
    /// "Artist – Name", or just the name when the artist is unknown.
    pub fn display(&self) -> String {
        if self.artist.is_empty() {
            self.name.clone()
        } else {
            format!("{} – {}", self.artist, self.name)
        }
    }
}

/// Full snapshot of what is playing and what is queued.  Never a delta.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct StatusUpdate {
    pub playing: Option<Song>,
    pub queued: Vec<Song>,
}

impl StatusUpdate {
    /// Build a snapshot, dropping any queued entry that is the playing song.
    pub fn new(playing: Option<Song>, queued: Vec<Song>) -> Self {
        let queued = match &playing {
            Some(now) => queued.into_iter().filter(|s| s.id != now.id).collect(),
            None => queued,
        };
        Self { playing, queued }
    }
}

/// Session-scoped connection parameters from `GET /streaming_info`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StreamingInfo {
    pub stream_url: String,
    pub pusher_key: String,
}

/// Body of `GET /queue`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct QueueResponse {
    #[serde(default)]
    pub songs: Vec<Song>,
}

/// Decoded `data` of an `update_now_playing` push event.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct NowPlayingPayload {
    #[serde(default)]
    pub now_playing: Option<Song>,
    #[serde(default)]
    pub songs: Vec<Song>,
}

impl From<NowPlayingPayload> for StatusUpdate {
    fn from(p: NowPlayingPayload) -> Self {
        StatusUpdate::new(p.now_playing, p.songs)
    }
}

/// One frame of the Pusher websocket protocol (v7).
///
/// `data` is itself a JSON-encoded string for application events, but the
/// server sends an object for some `pusher:*` events, so it stays a raw value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PusherFrame {
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl PusherFrame {
    pub fn subscribe(channel: &str) -> Self {
        Self {
            event: "pusher:subscribe".to_string(),
            channel: None,
            data: serde_json::json!({ "channel": channel }),
        }
    }

    pub fn pong() -> Self {
        Self {
            event: "pusher:pong".to_string(),
            channel: None,
            data: serde_json::json!({}),
        }
    }

    /// Decode the application payload of an `update_now_playing` event.
    pub fn now_playing(&self) -> anyhow::Result<StatusUpdate> {
        let payload: NowPlayingPayload = match &self.data {
            serde_json::Value::String(s) => serde_json::from_str(s)?,
            other => serde_json::from_value(other.clone())?,
        };
        Ok(payload.into())
    }
}
