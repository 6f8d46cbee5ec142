//! Status bar — bottom line with connection state, mode, and keybindings.

use chrono::{DateTime, Local};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::playback::PlaybackState;
use crate::theme::{C_ACCENT, C_MUTED, C_PLAYING, C_SECONDARY, C_SEPARATOR};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputMode {
    Normal,
    Confirm,
    Settings,
}

impl InputMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Normal => "PLAY",
            Self::Confirm => "CONFIRM",
            Self::Settings => "SETTINGS",
        }
    }

    pub fn keys(self) -> &'static str {
        match self {
            Self::Normal => {
                " ↑↓/jk select  s/Enter star  d/Del remove  p/Space pause  r refresh  , settings  q quit"
            }
            Self::Confirm => " y/Enter confirm  n/Esc cancel",
            Self::Settings => " Tab switch field  Enter save  Esc cancel",
        }
    }
}

/// "HH:MM:SS" of the last snapshot, or a dash.
pub fn updated_label(updated_at: Option<DateTime<Local>>) -> String {
    match updated_at {
        Some(t) => format!("updated {}", t.format("%H:%M:%S")),
        None => "not loaded".to_string(),
    }
}

/// Draw a horizontal separator line.
pub fn draw_separator(frame: &mut Frame, area: Rect) {
    let line = Line::from(Span::styled(
        "─".repeat(area.width as usize),
        Style::default().fg(C_SEPARATOR),
    ));
    frame.render_widget(Paragraph::new(line), area);
}

/// Top line: server, streaming badge and freshness.
pub fn draw_header(
    frame: &mut Frame,
    area: Rect,
    server: Option<&str>,
    playback: PlaybackState,
    updated_at: Option<DateTime<Local>>,
) {
    let badge = match playback {
        PlaybackState::Streaming => Span::styled("● streaming", Style::default().fg(C_PLAYING)),
        PlaybackState::Stopped => Span::styled("○ paused", Style::default().fg(C_ACCENT)),
    };
    let server = Span::styled(
        server.unwrap_or("no server configured"),
        Style::default().fg(C_SECONDARY),
    );
    let line = Line::from(vec![
        Span::styled(" play ", Style::default().fg(C_ACCENT).add_modifier(Modifier::BOLD)),
        badge,
        Span::raw("  "),
        server,
        Span::raw("  "),
        Span::styled(updated_label(updated_at), Style::default().fg(C_MUTED)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

/// Draw the keybindings footer bar (one row).
pub fn draw_keys_bar(frame: &mut Frame, area: Rect, mode: InputMode) {
    let line = Line::from(vec![
        Span::styled(
            format!(" {} ", mode.label()),
            Style::default().fg(C_PLAYING).add_modifier(Modifier::BOLD),
        ),
        Span::styled(mode.keys(), Style::default().fg(C_MUTED)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}
