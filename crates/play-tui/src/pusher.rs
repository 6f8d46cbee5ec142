//! Push listener — Pusher websocket client feeding the StatusUpdateChannel.
//!
//! Protocol 7, public channel only:
//!
//! ```text
//!   server: pusher:connection_established
//!   client: pusher:subscribe { channel }
//!   server: update_now_playing { data: "<json string>" }   (repeats)
//!   server: pusher:ping  →  client: pusher:pong
//! ```
//!
//! No reconnect.  When the socket closes or errors the task logs, tells the
//! UI with `UiMessage::ListenerEnded`, and ends.

use futures_util::{SinkExt, StreamExt};
use play_proto::protocol::{PusherFrame, StatusUpdate};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::playback::StatusListener;
use crate::status::{PushedUpdate, StatusUpdateChannel};
use crate::ui::{UiHandle, UiMessage};

pub const UPDATE_EVENT: &str = "update_now_playing";

pub fn pusher_url(host: &str, key: &str) -> String {
    let base = if host.starts_with("ws://") || host.starts_with("wss://") {
        host.trim_end_matches('/').to_string()
    } else {
        format!("wss://{}", host.trim_end_matches('/'))
    };
    format!(
        "{}/app/{}?protocol=7&client=play-tui&version={}",
        base,
        key,
        env!("CARGO_PKG_VERSION")
    )
}

/// What to do with one incoming frame.
#[derive(Debug)]
pub enum FrameOutcome {
    Reply(PusherFrame),
    Publish(StatusUpdate),
    Ignore,
}

pub fn handle_frame(frame: &PusherFrame, channel: &str) -> FrameOutcome {
    match frame.event.as_str() {
        "pusher:connection_established" => {
            debug!("push: connection established, subscribing to {}", channel);
            FrameOutcome::Reply(PusherFrame::subscribe(channel))
        }
        "pusher:ping" => FrameOutcome::Reply(PusherFrame::pong()),
        "pusher_internal:subscription_succeeded" => {
            info!("push: subscribed to {}", channel);
            FrameOutcome::Ignore
        }
        "pusher:error" => {
            warn!("push: server error {}", frame.data);
            FrameOutcome::Ignore
        }
        UPDATE_EVENT if frame.channel.as_deref().map_or(true, |c| c == channel) => {
            match frame.now_playing() {
                Ok(update) => FrameOutcome::Publish(update),
                Err(e) => {
                    warn!("push: bad {} payload: {}", UPDATE_EVENT, e);
                    FrameOutcome::Ignore
                }
            }
        }
        other => {
            trace!("push: ignoring event {}", other);
            FrameOutcome::Ignore
        }
    }
}

pub struct PusherListener {
    host: String,
    channel_name: String,
    status: StatusUpdateChannel,
    ui: Option<UiHandle>,
    task: Option<(CancellationToken, JoinHandle<()>)>,
}

impl PusherListener {
    pub fn new(host: String, channel_name: String, status: StatusUpdateChannel) -> Self {
        Self {
            host,
            channel_name,
            status,
            ui: None,
            task: None,
        }
    }

    /// Report an unrequested disconnect to `ui`.
    pub fn with_ui(mut self, ui: UiHandle) -> Self {
        self.ui = Some(ui);
        self
    }
}

impl StatusListener for PusherListener {
    fn start(&mut self, key: &str, generation: u64) -> anyhow::Result<()> {
        self.stop();
        let runtime = tokio::runtime::Handle::try_current()?;
        let token = CancellationToken::new();
        let url = pusher_url(&self.host, key);
        info!("push: opening listener on {}", self.host);
        let task = runtime.spawn(run(
            url,
            self.channel_name.clone(),
            Publisher {
                status: self.status.clone(),
                generation,
            },
            self.ui.clone(),
            token.clone(),
        ));
        self.task = Some((token, task));
        Ok(())
    }

    fn stop(&mut self) {
        if let Some((token, _task)) = self.task.take() {
            debug!("push: closing listener");
            token.cancel();
        }
    }

    fn is_running(&self) -> bool {
        self.task
            .as_ref()
            .is_some_and(|(_, task)| !task.is_finished())
    }
}

impl Drop for PusherListener {
    fn drop(&mut self) {
        self.stop();
    }
}

struct Publisher {
    status: StatusUpdateChannel,
    generation: u64,
}

async fn run(
    url: String,
    channel: String,
    publisher: Publisher,
    ui: Option<UiHandle>,
    token: CancellationToken,
) {
    tokio::select! {
        _ = token.cancelled() => {
            debug!("push: listener cancelled");
            return;
        }
        result = listen(&url, &channel, &publisher) => match result {
            Ok(()) => info!("push: connection closed"),
            Err(e) => warn!("push: listener ended: {}", e),
        },
    }
    if let Some(ui) = ui {
        ui.post(UiMessage::ListenerEnded).await;
    }
}

async fn listen(url: &str, channel: &str, publisher: &Publisher) -> anyhow::Result<()> {
    let (ws, _) = tokio_tungstenite::connect_async(url).await?;
    info!("push: connected");
    let (mut ws_tx, mut ws_rx) = ws.split();

    while let Some(message) = ws_rx.next().await {
        match message? {
            Message::Text(text) => {
                let frame: PusherFrame = match serde_json::from_str(&text) {
                    Ok(f) => f,
                    Err(e) => {
                        warn!("push: unparseable frame: {}", e);
                        continue;
                    }
                };
                match handle_frame(&frame, channel) {
                    FrameOutcome::Reply(reply) => {
                        ws_tx.send(Message::Text(serde_json::to_string(&reply)?)).await?;
                    }
                    FrameOutcome::Publish(update) => {
                        let n = publisher.status.publish(PushedUpdate {
                            generation: publisher.generation,
                            update,
                        });
                        debug!("push: status update delivered to {} subscriber(s)", n);
                    }
                    FrameOutcome::Ignore => {}
                }
            }
            Message::Close(frame) => {
                info!("push: closed by server: {:?}", frame);
                break;
            }
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::net::TcpListener;

    fn frame(event: &str, channel: Option<&str>, data: serde_json::Value) -> PusherFrame {
        PusherFrame {
            event: event.to_string(),
            channel: channel.map(str::to_string),
            data,
        }
    }

    #[test]
    fn url_defaults_to_wss() {
        let url = pusher_url("ws.pusherapp.com", "pk_1");
        assert!(url.starts_with("wss://ws.pusherapp.com/app/pk_1?protocol=7"));
        let url = pusher_url("ws://127.0.0.1:9000/", "pk_1");
        assert!(url.starts_with("ws://127.0.0.1:9000/app/pk_1?"));
    }

    #[test]
    fn connection_established_triggers_subscribe() {
        let f = frame("pusher:connection_established", None, serde_json::json!("{}"));
        match handle_frame(&f, "now_playing_updates") {
            FrameOutcome::Reply(reply) => {
                assert_eq!(reply.event, "pusher:subscribe");
                assert_eq!(reply.data["channel"], "now_playing_updates");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn ping_gets_pong() {
        let f = frame("pusher:ping", None, serde_json::json!({}));
        assert!(matches!(
            handle_frame(&f, "c"),
            FrameOutcome::Reply(PusherFrame { ref event, .. }) if event == "pusher:pong"
        ));
    }

    #[test]
    fn update_on_other_channel_is_ignored() {
        let data = serde_json::json!(r#"{"now_playing":null,"songs":[]}"#);
        let f = frame(UPDATE_EVENT, Some("elsewhere"), data.clone());
        assert!(matches!(handle_frame(&f, "now_playing_updates"), FrameOutcome::Ignore));

        let f = frame(UPDATE_EVENT, Some("now_playing_updates"), data);
        assert!(matches!(
            handle_frame(&f, "now_playing_updates"),
            FrameOutcome::Publish(_)
        ));
    }

    #[test]
    fn malformed_update_is_ignored() {
        let f = frame(UPDATE_EVENT, None, serde_json::json!("not json"));
        assert!(matches!(handle_frame(&f, "c"), FrameOutcome::Ignore));
    }

    #[tokio::test]
    async fn listener_publishes_pushed_updates() {
        let server = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = server.local_addr().unwrap();

        tokio::spawn(async move {
            let (tcp, _) = server.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            ws.send(Message::Text(
                r#"{"event":"pusher:connection_established","data":"{\"socket_id\":\"1.2\"}"}"#
                    .to_string(),
            ))
            .await
            .unwrap();

            let subscribe = ws.next().await.unwrap().unwrap();
            let subscribe: PusherFrame =
                serde_json::from_str(subscribe.to_text().unwrap()).unwrap();
            assert_eq!(subscribe.event, "pusher:subscribe");

            let payload = serde_json::json!({
                "now_playing": { "id": "1", "name": "Hey Jude", "artist": "Beatles" },
                "songs": [{ "id": "2", "name": "Let It Be" }]
            })
            .to_string();
            let event = serde_json::json!({
                "event": UPDATE_EVENT,
                "channel": "now_playing_updates",
                "data": payload,
            });
            ws.send(Message::Text(event.to_string())).await.unwrap();
            // Hold the connection open until the client goes away
            while let Some(Ok(_)) = ws.next().await {}
        });

        let status = StatusUpdateChannel::new();
        let mut sub = status.subscribe();
        let mut listener = PusherListener::new(
            format!("ws://{}", addr),
            "now_playing_updates".to_string(),
            status.clone(),
        );
        listener.start("pk_test", 7).unwrap();
        assert!(listener.is_running());

        let pushed = tokio::time::timeout(Duration::from_secs(5), sub.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(pushed.generation, 7);
        assert_eq!(pushed.update.playing.unwrap().name, "Hey Jude");
        assert_eq!(pushed.update.queued.len(), 1);

        listener.stop();
        assert!(!listener.is_running());
    }

    fn closed_port() -> u16 {
        let socket = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        socket.local_addr().unwrap().port()
    }

    #[tokio::test]
    async fn refused_connection_is_reported_to_ui() {
        let (ui, mut rx) = UiHandle::channel(4);
        let mut listener = PusherListener::new(
            format!("ws://127.0.0.1:{}", closed_port()),
            "now_playing_updates".to_string(),
            StatusUpdateChannel::new(),
        )
        .with_ui(ui);
        listener.start("pk_test", 1).unwrap();

        let msg = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(msg, UiMessage::ListenerEnded));
        tokio::time::timeout(Duration::from_secs(1), async {
            while listener.is_running() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn refused_connection_drops_playback_to_stopped() {
        use crate::playback::testing::{Calls, FakeAudio};
        use crate::playback::{PlaybackController, PlaybackError, PlaybackState};
        use play_proto::protocol::StreamingInfo;

        let calls = Calls::default();
        let listener = PusherListener::new(
            format!("ws://127.0.0.1:{}", closed_port()),
            "now_playing_updates".to_string(),
            StatusUpdateChannel::new(),
        );
        let mut pc = PlaybackController::new(Box::new(FakeAudio::new(calls.clone())), Box::new(listener));
        let info = StreamingInfo {
            stream_url: "http://play.local:8000/listen".to_string(),
            pusher_key: "pk_test".to_string(),
        };
        // The connect happens in the background, so start itself succeeds
        pc.start(&info, 1).unwrap();

        let err = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if let Err(e) = pc.check() {
                    return e;
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .unwrap();
        assert!(matches!(err, PlaybackError::ListenerEnded));
        assert_eq!(pc.state(), PlaybackState::Stopped);
        assert_eq!(calls.lock().unwrap().last().map(String::as_str), Some("audio.stop"));
    }
}
