//! SettingsForm — server URL and auth token entry, built on tui-input.

use ratatui::crossterm::event::{Event, KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Flex, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};
use tui_input::{backend::crossterm::EventHandler, Input};

use play_proto::config::Credentials;

use crate::theme::{
    style_focused_border, C_ACCENT, C_FILTER_BG, C_FILTER_FG, C_MUTED, C_SECONDARY,
};

#[derive(Debug, PartialEq)]
pub enum SettingsAction {
    /// Save these credentials.  `None` means both fields were left blank.
    Saved(Option<Credentials>),
    Cancelled,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Url,
    Token,
}

pub struct SettingsForm {
    url: Input,
    token: Input,
    focus: Field,
    error: Option<String>,
}

impl SettingsForm {
    /// Form prefilled with the current credentials, if any.
    pub fn new(current: Option<&Credentials>) -> Self {
        let (url, token) = match current {
            Some(c) => (c.server_url.clone(), c.auth_token.clone()),
            None => (String::new(), String::new()),
        };
        Self {
            url: Input::new(url),
            token: Input::new(token),
            focus: Field::Url,
            error: None,
        }
    }

    #[cfg(test)]
    pub fn url(&self) -> &str {
        self.url.value()
    }

    #[cfg(test)]
    pub fn token(&self) -> &str {
        self.token.value()
    }

    #[cfg(test)]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> SettingsAction {
        match key.code {
            KeyCode::Esc => SettingsAction::Cancelled,
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                self.focus = match self.focus {
                    Field::Url => Field::Token,
                    Field::Token => Field::Url,
                };
                SettingsAction::None
            }
            KeyCode::Enter => self.submit(),
            _ => {
                self.error = None;
                let input = match self.focus {
                    Field::Url => &mut self.url,
                    Field::Token => &mut self.token,
                };
                input.handle_event(&Event::Key(key));
                SettingsAction::None
            }
        }
    }

    fn submit(&mut self) -> SettingsAction {
        let url = self.url.value().trim();
        let token = self.token.value().trim();
        if url.is_empty() && token.is_empty() {
            return SettingsAction::Saved(None);
        }
        match Credentials::new(url, token) {
            Some(creds) => SettingsAction::Saved(Some(creds)),
            None => {
                self.error = Some("Server URL and token are both required".to_string());
                SettingsAction::None
            }
        }
    }

    /// Render as a centred modal over `area`.
    pub fn draw(&self, frame: &mut Frame, area: Rect) {
        let [modal] = Layout::horizontal([Constraint::Length(64.min(area.width))])
            .flex(Flex::Center)
            .areas(area);
        let [modal] = Layout::vertical([Constraint::Length(9.min(area.height))])
            .flex(Flex::Center)
            .areas(modal);

        frame.render_widget(Clear, modal);
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(style_focused_border())
            .title(Span::styled(
                " Play server ",
                Style::default().fg(C_ACCENT).add_modifier(Modifier::BOLD),
            ));
        let inner = block.inner(modal);
        frame.render_widget(block, modal);

        let rows = Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(inner);

        frame.render_widget(Paragraph::new(label("Server URL")), rows[0]);
        self.draw_field(frame, rows[1], Field::Url);
        frame.render_widget(Paragraph::new(label("Auth token")), rows[3]);
        self.draw_field(frame, rows[4], Field::Token);

        let footer = match &self.error {
            Some(e) => Span::styled(e.as_str(), Style::default().fg(C_ACCENT)),
            None => Span::styled(
                "Tab switch field  Enter save  Esc cancel",
                Style::default().fg(C_MUTED),
            ),
        };
        frame.render_widget(Paragraph::new(Line::from(footer)), rows[6]);
    }

    fn draw_field(&self, frame: &mut Frame, area: Rect, field: Field) {
        let input = match field {
            Field::Url => &self.url,
            Field::Token => &self.token,
        };
        let width = area.width.saturating_sub(1) as usize;
        let scroll = input.visual_scroll(width);
        let shown: String = match field {
            Field::Url => input.value().chars().skip(scroll).collect(),
            // Token is masked
            Field::Token => "•".repeat(input.value().chars().count().saturating_sub(scroll)),
        };
        let paragraph = Paragraph::new(Line::from(Span::styled(
            shown,
            Style::default().fg(C_FILTER_FG),
        )))
        .style(Style::default().bg(C_FILTER_BG));
        frame.render_widget(paragraph, area);

        if self.focus == field {
            let cursor_x = area.x + (input.visual_cursor().saturating_sub(scroll)) as u16;
            frame.set_cursor_position((cursor_x.min(area.x + area.width.saturating_sub(1)), area.y));
        }
    }
}

fn label(text: &str) -> Line<'_> {
    Line::from(Span::styled(text, Style::default().fg(C_SECONDARY)))
}
