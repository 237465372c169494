//! Progress bar rendering

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::Line,
    widgets::{Block, Borders, Gauge},
    Frame,
};

use crate::model::{SessionSnapshot, TransportState};
use super::utils::format_duration;

pub fn render_progress_bar(frame: &mut Frame, area: Rect, snapshot: &SessionSnapshot) {
    let status_text = match (&snapshot.track, snapshot.transport_state) {
        (None, _) => " No track selected".to_string(),
        (Some(track), TransportState::Playing) => format!(" ▶ {}", track.display_name()),
        (Some(track), TransportState::Resolving) => format!(" … {}", track.display_name()),
        (Some(track), TransportState::Errored) => format!(" ✖ {}", track.display_name()),
        (Some(track), _) => format!("⏸  {}", track.display_name()),
    };

    let volume_text = format!("Vol: {}%", (snapshot.volume * 100.0).round() as u32);

    let time_str = format!(
        "{} / {}",
        format_duration(snapshot.position),
        format_duration(snapshot.duration)
    );

    let inner_chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(0)
        .constraints([Constraint::Length(3)])
        .split(area);

    let title = format!("{} ", status_text);
    let controls_info = format!(" {} | H: help ", volume_text);

    let gauge_color = if snapshot.transport_state == TransportState::Errored {
        Color::Red
    } else {
        Color::Green
    };

    let gauge = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .title_bottom(Line::from(controls_info).right_aligned()),
        )
        .gauge_style(Style::default().fg(gauge_color))
        .ratio(snapshot.progress_ratio())
        .label(time_str);

    frame.render_widget(gauge, inner_chunks[0]);
}
