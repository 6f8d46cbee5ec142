//! HTTP client for the Play server.
//!
//! One method per server call, one round trip each (status is two GETs that
//! succeed or fail together).  No retries: the first error is returned.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use tracing::debug;

use crate::config::{Credentials, HttpConfig};
use crate::error::{ClientError, ClientResult};
use crate::protocol::{QueueResponse, Song, StatusUpdate, StreamingInfo};

/// The server operations the UI depends on.
#[async_trait]
pub trait PlayApi: Send + Sync {
    /// Base URL this handle talks to.
    fn server_url(&self) -> &str;

    async fn streaming_info(&self) -> ClientResult<StreamingInfo>;

    async fn status(&self) -> ClientResult<StatusUpdate>;

    async fn star(&self, song: &Song) -> ClientResult<()>;

    async fn unstar(&self, song: &Song) -> ClientResult<()>;

    async fn dequeue(&self, song: &Song) -> ClientResult<()>;
}

pub struct PlayService {
    credentials: Credentials,
    http: reqwest::Client,
}

impl PlayService {
    pub fn new(credentials: Credentials, config: &HttpConfig) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("play-tui/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self { credentials, http })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.credentials.server_url, path);
        debug!("play: {} {}", method, url);
        self.http
            .request(method, url)
            .header("Authorization", self.credentials.auth_token.as_str())
            .header("Accept", "application/json")
    }

    async fn send(&self, req: RequestBuilder) -> ClientResult<Response> {
        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status { status });
        }
        Ok(response)
    }

    async fn song_action(&self, method: Method, path: &str, song: &Song) -> ClientResult<()> {
        let req = self.request(method, path).query(&[("id", song.id.as_str())]);
        self.send(req).await?;
        Ok(())
    }

    async fn now_playing(&self) -> ClientResult<Option<Song>> {
        let body = self
            .send(self.request(Method::GET, "/now_playing"))
            .await?
            .text()
            .await?;
        let body = body.trim();
        if body.is_empty() || body == "null" {
            return Ok(None);
        }
        Ok(serde_json::from_str(body)?)
    }

    async fn queue(&self) -> ClientResult<Vec<Song>> {
        let body = self
            .send(self.request(Method::GET, "/queue"))
            .await?
            .bytes()
            .await?;
        let queue: QueueResponse = serde_json::from_slice(&body)?;
        Ok(queue.songs)
    }
}

/// Album art location for `song`.
pub fn art_url(server_url: &str, song: &Song) -> String {
    format!("{}/images/art/{}.png", server_url, song.id)
}

#[async_trait]
impl PlayApi for PlayService {
    fn server_url(&self) -> &str {
        &self.credentials.server_url
    }

    async fn streaming_info(&self) -> ClientResult<StreamingInfo> {
        let body = self
            .send(self.request(Method::GET, "/streaming_info"))
            .await?
            .bytes()
            .await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn status(&self) -> ClientResult<StatusUpdate> {
        let playing = self.now_playing().await?;
        let queued = self.queue().await?;
        Ok(StatusUpdate::new(playing, queued))
    }

    async fn star(&self, song: &Song) -> ClientResult<()> {
        self.song_action(Method::POST, "/star", song).await
    }

    async fn unstar(&self, song: &Song) -> ClientResult<()> {
        self.song_action(Method::DELETE, "/star", song).await
    }

    async fn dequeue(&self, song: &Song) -> ClientResult<()> {
        self.song_action(Method::DELETE, "/queue", song).await
    }
}
