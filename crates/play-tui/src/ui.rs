//! Hand-off from background tasks to the UI task.
//!
//! Every network result, pushed snapshot and failure notice travels as a
//! `UiMessage` over one channel that only the App loop reads.  Once the App
//! is gone the send fails and the result is dropped.

use play_proto::protocol::{StatusUpdate, StreamingInfo};
use ratatui::crossterm::event::Event;
use tokio::sync::mpsc;
use tracing::debug;

use crate::widgets::toast::Severity;

#[derive(Debug)]
pub enum UiMessage {
    /// Terminal input.
    Input(Event),
    /// Snapshot from a push listener opened under credentials `generation`.
    Pushed {
        generation: u64,
        update: StatusUpdate,
    },
    /// The push listener stopped without being asked to.
    ListenerEnded,
    /// Snapshot from an explicit status fetch made under credentials `generation`.
    Refreshed {
        generation: u64,
        update: StatusUpdate,
    },
    /// Settings fetch for credentials `generation` succeeded.
    StreamingInfo {
        generation: u64,
        info: StreamingInfo,
    },
    Notify(Severity, String),
}

#[derive(Clone)]
pub struct UiHandle {
    tx: mpsc::Sender<UiMessage>,
}

impl UiHandle {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<UiMessage>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Queue `msg` for the UI task.  Returns `false` if the UI is gone.
    pub async fn post(&self, msg: UiMessage) -> bool {
        match self.tx.send(msg).await {
            Ok(()) => true,
            Err(mpsc::error::SendError(msg)) => {
                debug!("ui: discarding late message {:?}", msg);
                false
            }
        }
    }

    pub async fn notify(&self, severity: Severity, message: impl Into<String>) -> bool {
        self.post(UiMessage::Notify(severity, message.into())).await
    }

    /// Blocking variant for the terminal input thread.
    pub fn blocking_post(&self, msg: UiMessage) -> bool {
        self.tx.blocking_send(msg).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
