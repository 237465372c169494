//! Now-playing header

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Padding, Paragraph},
    Frame,
};

use crate::model::{SessionSnapshot, TransportState, UiState};

pub fn state_color(state: TransportState) -> Color {
    match state {
        TransportState::Idle => Color::DarkGray,
        TransportState::Resolving => Color::Yellow,
        TransportState::Ready => Color::Cyan,
        TransportState::Playing => Color::Green,
        TransportState::Paused => Color::White,
        TransportState::Errored => Color::Red,
    }
}

pub fn render_now_playing(frame: &mut Frame, area: Rect, snapshot: &SessionSnapshot, ui_state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(0),     // Track
            Constraint::Length(16), // Transport state
        ])
        .split(area);

    let lines = match &snapshot.track {
        Some(track) => vec![
            Line::from(vec![
                Span::styled(
                    track.title.clone(),
                    Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
                ),
                Span::raw("  "),
                Span::styled(track.artist.clone(), Style::default().fg(Color::Gray)),
            ]),
            Line::from(Span::styled(
                match &ui_state.status_message {
                    Some(status) if !status.is_empty() => status.clone(),
                    _ => format!("{} · {}", track.source, track.cover),
                },
                Style::default().fg(Color::DarkGray),
            )),
        ],
        None => vec![Line::from(" No track selected")],
    };

    let now_playing = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Now Playing ")
            .padding(Padding::horizontal(1)),
    );
    frame.render_widget(now_playing, chunks[0]);

    let state = snapshot.transport_state;
    let state_widget = Paragraph::new(state.label())
        .style(Style::default().fg(state_color(state)).add_modifier(Modifier::BOLD))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" State ")
                .padding(Padding::horizontal(1)),
        );
    frame.render_widget(state_widget, chunks[1]);
}
