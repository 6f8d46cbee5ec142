//! App — terminal event loop around the `Shell`.
//!
//! Architecture:
//! - `App` owns the `Shell` and whichever modal is open.
//! - A `tokio::mpsc` channel carries `UiMessage`s in from background tasks:
//!   terminal input, pushed snapshots, and results of server calls.
//! - The event loop draws each frame, then awaits the next message.
//! - All queue and toast state is touched only from this loop.

use std::io;
use std::time::Duration;

use ratatui::crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Layout},
    widgets::Block,
    Frame, Terminal,
};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::action::{normal_key, Action};
use crate::shell::Shell;
use crate::status::StatusUpdateChannel;
use crate::theme::C_BG;
use crate::ui::{UiHandle, UiMessage};
use crate::widgets::{
    confirm,
    settings_form::{SettingsAction, SettingsForm},
    song_list,
    status_bar::{self, InputMode},
};

const INPUT_POLL: Duration = Duration::from_millis(250);
const PLAYBACK_CHECK: Duration = Duration::from_secs(1);

pub struct App {
    shell: Shell,
    status: StatusUpdateChannel,
    ui: UiHandle,
    settings: Option<SettingsForm>,
    should_quit: bool,
}

impl App {
    pub fn new(shell: Shell, status: StatusUpdateChannel, ui: UiHandle) -> Self {
        Self {
            shell,
            status,
            ui,
            settings: None,
            should_quit: false,
        }
    }

    pub async fn run(mut self, mut rx: mpsc::Receiver<UiMessage>) -> anyhow::Result<()> {
        debug!("run(): enabling raw mode");
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        debug!("run(): terminal created, size={:?}", terminal.size());

        // ── Background task: keyboard events ──────────────────────────────────
        let input = self.ui.clone();
        tokio::task::spawn_blocking(move || loop {
            match event::poll(INPUT_POLL) {
                Ok(true) => match event::read() {
                    Ok(ev) => {
                        if !input.blocking_post(UiMessage::Input(ev)) {
                            break;
                        }
                    }
                    Err(_) => break,
                },
                Ok(false) if input.is_closed() => break,
                Ok(false) => {}
                Err(_) => break,
            }
        });

        // ── Background task: pushed snapshots (StatusUpdateChannel → UiMessage)
        let mut subscription = self.status.subscribe();
        let pushed = self.ui.clone();
        tokio::spawn(async move {
            while let Some(p) = subscription.recv().await {
                let msg = UiMessage::Pushed {
                    generation: p.generation,
                    update: p.update,
                };
                if !pushed.post(msg).await {
                    break;
                }
            }
            debug!("push forwarder finished");
        });

        // Toast expiry check
        let mut toast_tick = tokio::time::interval(Duration::from_millis(100));
        toast_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        // Notices an mpv that exited on its own
        let mut playback_check = tokio::time::interval(PLAYBACK_CHECK);
        playback_check.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        self.shell.start();
        self.sync_settings();
        info!("play started");

        // ── Main loop ─────────────────────────────────────────────────────────
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal.draw(|f| self.draw(f))?;
            }
            needs_redraw = false;

            if self.should_quit {
                break;
            }

            tokio::select! {
                msg = rx.recv() => {
                    let Some(msg) = msg else { break };
                    let mut redraw = self.handle_message(msg);
                    // Drain whatever else is already queued before redrawing
                    while let Ok(next) = rx.try_recv() {
                        redraw |= self.handle_message(next);
                    }
                    needs_redraw = redraw;
                }

                _ = toast_tick.tick() => {
                    if !self.shell.toasts.is_empty() {
                        self.shell.toasts.tick();
                        needs_redraw = true;
                    }
                }

                _ = playback_check.tick() => {
                    needs_redraw = self.shell.check_playback();
                }
            }
        }

        // ── Teardown ──────────────────────────────────────────────────────────
        info!("play shutting down");
        self.shell.shutdown().await;
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        Ok(())
    }

    fn mode(&self) -> InputMode {
        if self.settings.is_some() {
            InputMode::Settings
        } else if self.shell.pending_dequeue().is_some() {
            InputMode::Confirm
        } else {
            InputMode::Normal
        }
    }

    fn handle_message(&mut self, msg: UiMessage) -> bool {
        let redraw = match msg {
            UiMessage::Input(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                self.handle_key(key);
                true
            }
            UiMessage::Input(Event::Resize(..)) => true,
            UiMessage::Input(_) => false,
            other => self.shell.handle_message(other),
        };
        self.sync_settings();
        redraw
    }

    /// Open the settings form if the shell asked for it.
    fn sync_settings(&mut self) {
        if self.shell.take_settings_request() && self.settings.is_none() {
            debug!("opening settings form");
            self.settings = Some(SettingsForm::new(self.shell.credentials()));
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        if let Some(form) = self.settings.as_mut() {
            match form.handle_key(key) {
                SettingsAction::Saved(credentials) => {
                    self.settings = None;
                    self.shell.apply_settings(credentials);
                }
                SettingsAction::Cancelled => {
                    self.settings = None;
                }
                SettingsAction::None => {}
            }
            return;
        }

        if self.shell.pending_dequeue().is_some() {
            if let Some(confirmed) = confirm::answer(key) {
                self.shell.resolve_dequeue(confirmed);
            }
            return;
        }

        self.apply_action(normal_key(key));
    }

    fn apply_action(&mut self, action: Action) {
        if action != Action::Noop {
            debug!("apply_action: {:?}", action);
        }
        match action {
            Action::SelectUp(n) => self.shell.queue.select_up(n),
            Action::SelectDown(n) => self.shell.queue.select_down(n),
            Action::ToggleStar => self.shell.toggle_star_selected(),
            Action::Dequeue => self.shell.request_dequeue_selected(),
            Action::TogglePause => self.shell.toggle_playback(),
            Action::Refresh => self.shell.refresh(),
            Action::OpenSettings => {
                self.settings = Some(SettingsForm::new(self.shell.credentials()));
            }
            Action::Quit => self.should_quit = true,
            Action::Noop => {}
        }
    }

    fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        frame.render_widget(
            Block::default().style(ratatui::style::Style::default().bg(C_BG)),
            area,
        );

        let [header, separator, body, detail, keys] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .areas(area);
        let server_url = self.shell.credentials().map(|c| c.server_url.as_str());

        status_bar::draw_header(
            frame,
            header,
            server_url,
            self.shell.playback_state(),
            self.shell.queue.updated_at(),
        );
        status_bar::draw_separator(frame, separator);
        song_list::draw(frame, body, &self.shell.queue);
        song_list::draw_detail(frame, detail, self.shell.queue.selected_song(), server_url);
        status_bar::draw_keys_bar(frame, keys, self.mode());

        if let Some(song) = self.shell.pending_dequeue() {
            confirm::draw(
                frame,
                area,
                "Remove from queue",
                &format!("Remove {} from the queue?", song.display()),
            );
        }
        if let Some(form) = &self.settings {
            form.draw(frame, area);
        }

        // ── Toast notifications (topmost layer) ──────────────────────────────
        self.shell.toasts.draw(frame, area);
    }
}
