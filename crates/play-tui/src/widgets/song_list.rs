//! Song list — now-playing row followed by the queue.

use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState},
    Frame,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use play_proto::client::art_url;
use play_proto::protocol::Song;

use crate::queue::{QueueViewModel, Row};
use crate::theme::{
    style_default, style_muted, style_playing, style_secondary, style_selected, style_star,
    style_unfocused_border,
};

const STAR: &str = "★";
const NO_STAR: &str = "☆";

/// Cut `s` to at most `max` display columns, ending in `…` when cut.
pub fn fit_width(s: &str, max: usize) -> String {
    if s.width() <= max {
        return s.to_string();
    }
    if max == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in s.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > max - 1 {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    out
}

fn song_line(song: &Song, marker: &str, width: usize, base: Style) -> Line<'static> {
    let star = if song.starred { STAR } else { NO_STAR };
    let star_style = if song.starred { style_star() } else { style_muted() };
    // marker + space + star + space
    let text_width = width.saturating_sub(marker.width() + 3);
    let name = fit_width(&song.name, text_width);
    let rest = text_width.saturating_sub(name.width());

    let mut spans = vec![
        Span::styled(format!("{} ", marker), base),
        Span::styled(star, star_style),
        Span::raw(" "),
        Span::styled(name, base),
    ];
    if !song.artist.is_empty() && rest > 3 {
        spans.push(Span::styled(
            format!("  {}", fit_width(&song.artist, rest - 2)),
            style_secondary(),
        ));
    }
    Line::from(spans)
}

pub fn draw(frame: &mut Frame, area: Rect, queue: &QueueViewModel) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(style_unfocused_border())
        .title(Span::styled(" Queue ", style_secondary()));
    let width = block.inner(area).width as usize;

    let items: Vec<ListItem> = (0..queue.row_count())
        .filter_map(|idx| {
            let row = queue.row(idx)?;
            let song = queue.song(row)?;
            let line = match row {
                Row::NowPlaying => song_line(song, "▶", width, style_playing()),
                Row::Queued(i) => song_line(song, &format!("{:>2}", i + 1), width, style_default()),
            };
            Some(ListItem::new(line))
        })
        .collect();

    if items.is_empty() {
        let empty = List::new(vec![ListItem::new(Line::from(Span::styled(
            "Nothing playing",
            style_muted(),
        )))])
        .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let list = List::new(items)
        .block(block)
        .highlight_style(style_selected());
    let mut state = ListState::default();
    state.select(Some(queue.selected_index()));
    frame.render_stateful_widget(list, area, &mut state);
}

/// "Artist · Album · art URL" for the selected song.
pub fn detail_text(song: &Song, server_url: Option<&str>) -> String {
    let mut parts: Vec<String> = [song.artist.as_str(), song.album.as_str()]
        .into_iter()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if let Some(url) = server_url {
        parts.push(art_url(url, song));
    }
    parts.join(" · ")
}

/// One-line detail of the selected song.
pub fn draw_detail(frame: &mut Frame, area: Rect, song: Option<&Song>, server_url: Option<&str>) {
    let Some(song) = song else {
        return;
    };
    let text = fit_width(&format!(" {}", detail_text(song, server_url)), area.width as usize);
    frame.render_widget(
        ratatui::widgets::Paragraph::new(Line::from(Span::styled(text, style_secondary()))),
        area,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_width_keeps_short_strings() {
        assert_eq!(fit_width("Hey Jude", 20), "Hey Jude");
        assert_eq!(fit_width("Hey Jude", 8), "Hey Jude");
    }

    #[test]
    fn fit_width_counts_columns_not_bytes() {
        assert_eq!(fit_width("Hey Jude", 5), "Hey …");
        // Each CJK char is two columns wide
        assert_eq!(fit_width("東京事変", 5), "東京…");
        assert_eq!(fit_width("abc", 0), "");
    }

    #[test]
    fn detail_skips_empty_fields() {
        let song = Song {
            id: "42".to_string(),
            name: "Hey Jude".to_string(),
            artist: "Beatles".to_string(),
            album: String::new(),
            starred: false,
        };
        assert_eq!(
            detail_text(&song, Some("https://play.local")),
            "Beatles · https://play.local/images/art/42.png"
        );
        assert_eq!(detail_text(&song, None), "Beatles");
    }
}
