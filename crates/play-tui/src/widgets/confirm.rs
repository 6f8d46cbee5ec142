//! Yes/no confirmation modal.

use ratatui::crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Flex, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::theme::{style_default, style_focused_border, C_ACCENT, C_MUTED};

/// Map a key to an answer.  `None` leaves the modal open.
pub fn answer(key: KeyEvent) -> Option<bool> {
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => Some(true),
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => Some(false),
        _ => None,
    }
}

pub fn draw(frame: &mut Frame, area: Rect, title: &str, question: &str) {
    let width = (question.chars().count() as u16 + 6).clamp(30, 70).min(area.width);
    let [modal] = Layout::horizontal([Constraint::Length(width)])
        .flex(Flex::Center)
        .areas(area);
    let [modal] = Layout::vertical([Constraint::Length(5.min(area.height))])
        .flex(Flex::Center)
        .areas(modal);

    frame.render_widget(Clear, modal);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(style_focused_border())
        .title(Span::styled(
            format!(" {} ", title),
            Style::default().fg(C_ACCENT).add_modifier(Modifier::BOLD),
        ));
    let text = vec![
        Line::from(Span::styled(question, style_default())),
        Line::from(""),
        Line::from(Span::styled("y/Enter confirm  n/Esc cancel", Style::default().fg(C_MUTED))),
    ];
    frame.render_widget(
        Paragraph::new(text).block(block).wrap(Wrap { trim: true }),
        modal,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::KeyModifiers;

    #[test]
    fn keys_map_to_answers() {
        let key = |code| KeyEvent::new(code, KeyModifiers::NONE);
        assert_eq!(answer(key(KeyCode::Char('y'))), Some(true));
        assert_eq!(answer(key(KeyCode::Enter)), Some(true));
        assert_eq!(answer(key(KeyCode::Esc)), Some(false));
        assert_eq!(answer(key(KeyCode::Char('n'))), Some(false));
        assert_eq!(answer(key(KeyCode::Char('d'))), None);
    }
}
