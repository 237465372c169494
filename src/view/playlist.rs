//! Catalog listing

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, ListItem, Padding},
    Frame,
};

use crate::model::{Catalog, SessionSnapshot};
use super::layout::state_color;
use super::utils::{calculate_track_column_widths, render_scrollable_list, truncate_string};

pub fn render_playlist(
    frame: &mut Frame,
    area: Rect,
    catalog: &Catalog,
    snapshot: &SessionSnapshot,
    cursor: usize,
) {
    // borders + horizontal padding
    let content_width = area.width.saturating_sub(4) as usize;
    let (num_width, title_width, artist_width) =
        calculate_track_column_widths(content_width, catalog.len());

    let items: Vec<ListItem> = catalog
        .tracks()
        .iter()
        .enumerate()
        .map(|(i, track)| {
            let is_active = i == snapshot.track_index;
            let marker = if is_active { "▶" } else { " " };
            let text = format!(
                "{:>num_width$} {} {} {}",
                i + 1,
                marker,
                truncate_string(&track.title, title_width),
                truncate_string(&track.artist, artist_width),
                num_width = num_width,
            );

            let style = if i == cursor {
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Green)
                    .add_modifier(Modifier::BOLD)
            } else if is_active {
                Style::default()
                    .fg(state_color(snapshot.transport_state))
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };
            ListItem::new(text).style(style)
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" Playlist ({} tracks) ", catalog.len()))
        .padding(Padding::horizontal(1));

    render_scrollable_list(frame, area, items, cursor, block);
}
