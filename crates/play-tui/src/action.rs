//! Action enum — user intents from the queue screen.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    // ── Navigation ───────────────────────────────────────────────────────────
    SelectUp(usize),
    SelectDown(usize),

    // ── Song actions ─────────────────────────────────────────────────────────
    ToggleStar,
    Dequeue,

    // ── Playback ─────────────────────────────────────────────────────────────
    TogglePause,
    Refresh,

    // ── System ───────────────────────────────────────────────────────────────
    OpenSettings,
    Quit,
    Noop,
}

/// Key map for the main screen (no modal open).
pub fn normal_key(key: KeyEvent) -> Action {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Action::Quit;
    }
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => Action::SelectUp(1),
        KeyCode::Down | KeyCode::Char('j') => Action::SelectDown(1),
        KeyCode::PageUp => Action::SelectUp(10),
        KeyCode::PageDown => Action::SelectDown(10),
        KeyCode::Char('s') | KeyCode::Enter => Action::ToggleStar,
        KeyCode::Char('d') | KeyCode::Delete => Action::Dequeue,
        KeyCode::Char('p') | KeyCode::Char(' ') => Action::TogglePause,
        KeyCode::Char('r') => Action::Refresh,
        KeyCode::Char(',') => Action::OpenSettings,
        KeyCode::Char('q') => Action::Quit,
        _ => Action::Noop,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn bindings() {
        assert_eq!(normal_key(key(KeyCode::Char('j'))), Action::SelectDown(1));
        assert_eq!(normal_key(key(KeyCode::Up)), Action::SelectUp(1));
        assert_eq!(normal_key(key(KeyCode::Enter)), Action::ToggleStar);
        assert_eq!(normal_key(key(KeyCode::Delete)), Action::Dequeue);
        assert_eq!(normal_key(key(KeyCode::Char(' '))), Action::TogglePause);
        assert_eq!(normal_key(key(KeyCode::Char(','))), Action::OpenSettings);
        assert_eq!(normal_key(key(KeyCode::Char('x'))), Action::Noop);
        assert_eq!(
            normal_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Action::Quit
        );
    }
}
