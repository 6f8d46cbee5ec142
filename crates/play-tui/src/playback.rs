//! PlaybackController — Stopped / Streaming, with the audio stream and the
//! push listener always switched together.
//!
//! ```text
//!   Stopped ──start(info)──▶ Streaming
//!      ▲                        │
//!      └─────────stop()─────────┘
//! ```
//!
//! A failed start leaves both halves stopped.  If either half dies on its
//! own while Streaming, `check` stops the other and drops back to Stopped.

use play_proto::protocol::StreamingInfo;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Something that plays an audio stream by URL.
pub trait AudioStream: Send {
    /// Start playing `url`.  Restarts if already running.
    fn start(&mut self, url: &str) -> anyhow::Result<()>;
    fn stop(&mut self);
    fn is_running(&mut self) -> bool;
}

/// Something that listens for pushed status updates, keyed by pusher key.
pub trait StatusListener: Send {
    /// Open the listener for `key`.  Reopens if already open.  Updates it
    /// publishes are tagged with `generation`.
    fn start(&mut self, key: &str, generation: u64) -> anyhow::Result<()>;
    fn stop(&mut self);
    fn is_running(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Stopped,
    Streaming,
}

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("could not start audio stream: {0}")]
    Audio(anyhow::Error),
    #[error("could not start status listener: {0}")]
    Listener(anyhow::Error),
    #[error("audio stream ended")]
    AudioEnded,
    #[error("live updates disconnected")]
    ListenerEnded,
}

pub struct PlaybackController {
    audio: Box<dyn AudioStream>,
    listener: Box<dyn StatusListener>,
    state: PlaybackState,
}

impl PlaybackController {
    pub fn new(audio: Box<dyn AudioStream>, listener: Box<dyn StatusListener>) -> Self {
        Self {
            audio,
            listener,
            state: PlaybackState::Stopped,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn start(&mut self, info: &StreamingInfo, generation: u64) -> Result<(), PlaybackError> {
        info!("playback: starting stream {}", info.stream_url);

        if let Err(e) = self.audio.start(&info.stream_url) {
            warn!("playback: audio start failed: {}", e);
            self.listener.stop();
            self.state = PlaybackState::Stopped;
            return Err(PlaybackError::Audio(e));
        }

        if let Err(e) = self.listener.start(&info.pusher_key, generation) {
            warn!("playback: listener start failed, stopping audio: {}", e);
            self.audio.stop();
            self.state = PlaybackState::Stopped;
            return Err(PlaybackError::Listener(e));
        }

        self.state = PlaybackState::Streaming;
        Ok(())
    }

    pub fn stop(&mut self) {
        if self.state == PlaybackState::Streaming {
            info!("playback: stopping stream");
        }
        self.audio.stop();
        self.listener.stop();
        self.state = PlaybackState::Stopped;
    }

    /// Menu toggle.  Without streaming info this does nothing.
    pub fn toggle(
        &mut self,
        info: Option<&StreamingInfo>,
        generation: u64,
    ) -> Result<PlaybackState, PlaybackError> {
        let Some(info) = info else {
            debug!("playback: toggle ignored, no streaming info");
            return Ok(self.state);
        };
        match self.state {
            PlaybackState::Streaming => self.stop(),
            PlaybackState::Stopped => self.start(info, generation)?,
        }
        Ok(self.state)
    }

    /// While Streaming, make sure both halves are still alive.  If one has
    /// ended, stop the other and report which one went away.
    pub fn check(&mut self) -> Result<(), PlaybackError> {
        if self.state != PlaybackState::Streaming {
            return Ok(());
        }
        let err = if !self.audio.is_running() {
            PlaybackError::AudioEnded
        } else if !self.listener.is_running() {
            PlaybackError::ListenerEnded
        } else {
            return Ok(());
        };
        warn!("playback: {}, stopping", err);
        self.stop();
        Err(err)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    /// Shared call log for the fakes below.
    pub type Calls = Arc<Mutex<Vec<String>>>;

    /// Set to make a running fake report that it has died.
    pub type Died = Arc<AtomicBool>;

    pub struct FakeAudio {
        pub calls: Calls,
        pub fail: bool,
        pub died: Died,
        running: bool,
    }

    pub struct FakeListener {
        pub calls: Calls,
        pub fail: bool,
        pub died: Died,
        running: bool,
    }

    impl FakeAudio {
        pub fn new(calls: Calls) -> Self {
            Self { calls, fail: false, died: Died::default(), running: false }
        }
    }

    impl FakeListener {
        pub fn new(calls: Calls) -> Self {
            Self { calls, fail: false, died: Died::default(), running: false }
        }
    }

    impl AudioStream for FakeAudio {
        fn start(&mut self, url: &str) -> anyhow::Result<()> {
            self.calls.lock().unwrap().push(format!("audio.start {url}"));
            if self.fail {
                anyhow::bail!("mpv binary not found");
            }
            self.running = true;
            Ok(())
        }
        fn stop(&mut self) {
            self.calls.lock().unwrap().push("audio.stop".to_string());
            self.running = false;
        }
        fn is_running(&mut self) -> bool {
            self.running && !self.died.load(Ordering::SeqCst)
        }
    }

    impl StatusListener for FakeListener {
        fn start(&mut self, key: &str, generation: u64) -> anyhow::Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("listener.start {key} #{generation}"));
            if self.fail {
                anyhow::bail!("no runtime");
            }
            self.running = true;
            Ok(())
        }
        fn stop(&mut self) {
            self.calls.lock().unwrap().push("listener.stop".to_string());
            self.running = false;
        }
        fn is_running(&self) -> bool {
            self.running && !self.died.load(Ordering::SeqCst)
        }
    }

    pub fn controller(calls: &Calls) -> PlaybackController {
        controller_with_deaths(calls).0
    }

    /// Controller over fakes, plus the audio and listener death switches.
    pub fn controller_with_deaths(calls: &Calls) -> (PlaybackController, Died, Died) {
        let audio = FakeAudio::new(calls.clone());
        let listener = FakeListener::new(calls.clone());
        let (audio_died, listener_died) = (audio.died.clone(), listener.died.clone());
        (
            PlaybackController::new(Box::new(audio), Box::new(listener)),
            audio_died,
            listener_died,
        )
    }
}
