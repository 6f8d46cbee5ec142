//! Shell — interaction policies between the user, the Play server and
//! playback.
//!
//! Lives on the UI task.  Every server call is spawned; its outcome comes
//! back as a `UiMessage` and is applied in `handle_message`.  Calls made
//! under older credentials are recognised by their generation number and
//! dropped.  Pushed snapshots carry the generation their listener was opened
//! under and are filtered the same way.
//!
//! Writes to the session file run one after another, in the order they were
//! requested.

use std::path::PathBuf;
use std::sync::Arc;

use play_proto::client::PlayApi;
use play_proto::config::{Config, Credentials, ServerConfig};
use play_proto::error::ClientError;
use play_proto::protocol::{Song, StreamingInfo};
use play_proto::state::SessionStore;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::playback::{PlaybackController, PlaybackState};
use crate::queue::{QueueViewModel, Row};
use crate::service::ServiceCell;
use crate::ui::{UiHandle, UiMessage};
use crate::widgets::toast::{Severity, ToastManager};

/// Builds a server client for a set of credentials.
pub type Connector = Box<dyn Fn(&Credentials) -> anyhow::Result<Arc<dyn PlayApi>> + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SongAction {
    Star,
    Unstar,
    Dequeue,
}

impl SongAction {
    fn verb(self) -> &'static str {
        match self {
            SongAction::Star => "Starring",
            SongAction::Unstar => "Unstarring",
            SongAction::Dequeue => "Removing",
        }
    }

    async fn call(self, service: &dyn PlayApi, song: &Song) -> Result<(), ClientError> {
        match self {
            SongAction::Star => service.star(song).await,
            SongAction::Unstar => service.unstar(song).await,
            SongAction::Dequeue => service.dequeue(song).await,
        }
    }
}

pub fn server_error_message(e: &ClientError) -> String {
    format!("Error contacting Play server: {}", e)
}

pub struct Shell {
    config: Config,
    config_path: PathBuf,
    credentials: Option<Credentials>,
    service: ServiceCell,
    connector: Connector,
    session: Arc<SessionStore>,
    session_write: Option<JoinHandle<()>>,
    streaming_info: Option<StreamingInfo>,
    playback: PlaybackController,
    generation: u64,
    pending_dequeue: Option<Song>,
    settings_requested: bool,
    ui: UiHandle,

    pub queue: QueueViewModel,
    pub toasts: ToastManager,
}

impl Shell {
    pub fn new(
        config: Config,
        config_path: PathBuf,
        session: SessionStore,
        playback: PlaybackController,
        connector: Connector,
        ui: UiHandle,
    ) -> Self {
        Self {
            config,
            config_path,
            credentials: None,
            service: ServiceCell::new(),
            connector,
            session: Arc::new(session),
            session_write: None,
            streaming_info: None,
            playback,
            generation: 0,
            pending_dequeue: None,
            settings_requested: false,
            ui,
            queue: QueueViewModel::new(),
            toasts: ToastManager::new(),
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    #[cfg(test)]
    pub fn streaming_info(&self) -> Option<&StreamingInfo> {
        self.streaming_info.as_ref()
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.playback.state()
    }

    pub fn pending_dequeue(&self) -> Option<&Song> {
        self.pending_dequeue.as_ref()
    }

    /// True once since the last call if an action needs the settings form.
    pub fn take_settings_request(&mut self) -> bool {
        std::mem::take(&mut self.settings_requested)
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────────

    /// Initial load: connect with stored credentials or ask for them.
    pub fn start(&mut self) {
        let Some(creds) = self.config.credentials() else {
            info!("shell: no credentials configured");
            self.settings_requested = true;
            return;
        };
        self.generation += 1;
        self.streaming_info = self.session.streaming_info_for(&creds.server_url);
        if self.connect(creds) {
            self.load();
        }
    }

    /// Stop playback for good (app exit) and let the last session write land.
    pub async fn shutdown(&mut self) {
        self.playback.stop();
        self.flush_session().await;
    }

    /// Queue a session write behind any still in flight.  `None` clears the
    /// file.
    fn persist_session(&mut self, entry: Option<(String, StreamingInfo)>) {
        let previous = self.session_write.take();
        let session = self.session.clone();
        self.session_write = Some(tokio::spawn(async move {
            if let Some(previous) = previous {
                let _ = previous.await;
            }
            let result = match &entry {
                Some((server_url, info)) => session.store(server_url, Some(info)).await,
                None => session.clear().await,
            };
            if let Err(e) = result {
                warn!("shell: could not write session state: {}", e);
            }
        }));
    }

    async fn flush_session(&mut self) {
        if let Some(write) = self.session_write.take() {
            if let Err(e) = write.await {
                warn!("shell: session write task failed: {}", e);
            }
        }
    }

    /// Apply the result of the settings form.  `None` clears the stored
    /// credentials.  Either way the cached streaming info is dropped and, with
    /// new credentials, everything is loaded from scratch.
    pub fn apply_settings(&mut self, credentials: Option<Credentials>) {
        match &credentials {
            Some(c) => self.config.set_credentials(c),
            None => self.config.server = ServerConfig::default(),
        }
        if let Err(e) = self.config.save_to(&self.config_path) {
            warn!("shell: could not save settings: {}", e);
            self.toasts.error(format!("Could not save settings: {}", e));
        }

        self.generation += 1;
        self.playback.stop();
        self.streaming_info = None;
        self.pending_dequeue = None;
        self.persist_session(None);

        match credentials {
            Some(creds) => {
                info!("shell: credentials changed, reloading from {}", creds.server_url);
                if self.connect(creds) {
                    self.load();
                }
            }
            None => {
                info!("shell: credentials cleared");
                self.service.replace(None);
                self.credentials = None;
            }
        }
    }

    fn connect(&mut self, creds: Credentials) -> bool {
        match (self.connector)(&creds) {
            Ok(service) => {
                self.service.replace(Some(service));
                self.credentials = Some(creds);
                true
            }
            Err(e) => {
                warn!("shell: could not build client: {}", e);
                self.toasts.error(format!("Error contacting Play server: {}", e));
                self.service.replace(None);
                self.credentials = None;
                self.settings_requested = true;
                false
            }
        }
    }

    /// Current client, or a settings request when there is none.
    fn guard(&mut self) -> Option<Arc<dyn PlayApi>> {
        let service = self
            .credentials
            .as_ref()
            .and_then(|_| self.service.get());
        if service.is_none() {
            debug!("shell: blocked, settings required");
            self.settings_requested = true;
        }
        service
    }

    /// Fetch streaming info if missing, otherwise refresh and start streaming.
    pub fn load(&mut self) {
        let Some(service) = self.guard() else {
            return;
        };
        match self.streaming_info.clone() {
            None => {
                let ui = self.ui.clone();
                let generation = self.generation;
                tokio::spawn(async move {
                    match service.streaming_info().await {
                        Ok(info) => {
                            ui.post(UiMessage::StreamingInfo { generation, info }).await;
                        }
                        Err(e) => {
                            warn!("shell: settings fetch failed: {}", e);
                            ui.notify(Severity::Error, server_error_message(&e)).await;
                        }
                    }
                });
            }
            Some(info) => {
                self.fetch_status();
                self.start_stream(&info);
            }
        }
    }

    fn start_stream(&mut self, info: &StreamingInfo) {
        if let Err(e) = self.playback.start(info, self.generation) {
            self.toasts.error(e.to_string());
        }
    }

    // ── User actions ──────────────────────────────────────────────────────────

    /// Menu refresh.  Retries the whole load while streaming info is missing.
    pub fn refresh(&mut self) {
        if self.streaming_info.is_none() {
            self.load();
        } else {
            self.fetch_status();
        }
    }

    fn fetch_status(&mut self) {
        let Some(service) = self.guard() else {
            return;
        };
        let ui = self.ui.clone();
        let generation = self.generation;
        tokio::spawn(async move {
            refresh_status(service, ui, generation).await;
        });
    }

    pub fn toggle_playback(&mut self) {
        if self.credentials.is_none() {
            debug!("shell: pause/resume ignored, no credentials");
            return;
        }
        match self.playback.toggle(self.streaming_info.as_ref(), self.generation) {
            Ok(state) => debug!("shell: playback now {:?}", state),
            Err(e) => self.toasts.error(e.to_string()),
        }
    }

    /// Star or unstar `song` depending on its current flag.
    pub fn toggle_star(&mut self, song: Song) {
        let action = if song.starred {
            SongAction::Unstar
        } else {
            SongAction::Star
        };
        self.song_action(action, song);
    }

    pub fn toggle_star_selected(&mut self) {
        if let Some(song) = self.queue.selected_song().cloned() {
            self.toggle_star(song);
        }
    }

    /// Ask for confirmation before removing `song`.  Nothing is sent yet.
    pub fn request_dequeue(&mut self, song: Song) {
        if self.guard().is_none() {
            return;
        }
        self.pending_dequeue = Some(song);
    }

    /// Dequeue is only offered for queued songs, not the one playing.
    pub fn request_dequeue_selected(&mut self) {
        if let Some(Row::Queued(i)) = self.queue.selected_row() {
            if let Some(song) = self.queue.queue().get(i).cloned() {
                self.request_dequeue(song);
            }
        }
    }

    /// Answer to the confirm modal.  Cancelling just drops the request.
    pub fn resolve_dequeue(&mut self, confirmed: bool) {
        let Some(song) = self.pending_dequeue.take() else {
            return;
        };
        if !confirmed {
            debug!("shell: dequeue of {} cancelled", song.name);
            return;
        }
        self.song_action(SongAction::Dequeue, song);
    }

    fn song_action(&mut self, action: SongAction, song: Song) {
        let Some(service) = self.guard() else {
            return;
        };
        self.toasts.info(format!("{} {}…", action.verb(), song.name));

        let ui = self.ui.clone();
        let cell = self.service.clone();
        let generation = self.generation;
        tokio::spawn(async move {
            match action.call(service.as_ref(), &song).await {
                Ok(()) => {
                    debug!("shell: {} {} ok", action.verb(), song.name);
                    if let Some(current) = cell.get() {
                        refresh_status(current, ui, generation).await;
                    }
                }
                Err(e) => {
                    warn!("shell: {} {} failed: {}", action.verb(), song.name, e);
                    ui.notify(Severity::Error, format!("{} {} failed", action.verb(), song.name))
                        .await;
                }
            }
        });
    }

    /// Drop back to Stopped if the audio stream or the push listener died.
    /// Returns whether anything changed.
    pub fn check_playback(&mut self) -> bool {
        match self.playback.check() {
            Ok(()) => false,
            Err(e) => {
                self.toasts.error(format!("Playback stopped: {}", e));
                true
            }
        }
    }

    // ── Results from background tasks ─────────────────────────────────────────

    /// Apply one message.  Returns whether the screen needs a redraw.
    pub fn handle_message(&mut self, msg: UiMessage) -> bool {
        match msg {
            UiMessage::Input(_) => false,
            UiMessage::Pushed { generation, update } => {
                if generation != self.generation {
                    debug!("shell: dropping push from stale session {}", generation);
                    return false;
                }
                self.queue.apply_update(update);
                true
            }
            UiMessage::ListenerEnded => self.check_playback(),
            UiMessage::Refreshed { generation, update } => {
                if generation != self.generation {
                    debug!("shell: dropping status from stale session {}", generation);
                    return false;
                }
                self.queue.apply_update(update);
                true
            }
            UiMessage::StreamingInfo { generation, info } => {
                if generation != self.generation {
                    debug!("shell: dropping streaming info from stale session {}", generation);
                    return false;
                }
                let Some(server_url) = self.credentials.as_ref().map(|c| c.server_url.clone())
                else {
                    return false;
                };
                info!("shell: streaming info received");
                self.streaming_info = Some(info.clone());
                self.persist_session(Some((server_url, info)));
                self.load();
                true
            }
            UiMessage::Notify(severity, message) => {
                self.toasts.notify(severity, message);
                true
            }
        }
    }
}

async fn refresh_status(service: Arc<dyn PlayApi>, ui: UiHandle, generation: u64) {
    match service.status().await {
        Ok(update) => {
            ui.post(UiMessage::Refreshed { generation, update }).await;
        }
        Err(e) => {
            warn!("shell: status fetch failed: {}", e);
            ui.notify(Severity::Error, server_error_message(&e)).await;
        }
    }
}
