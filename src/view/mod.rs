//! View module - UI rendering
//!
//! A passive subscriber: everything drawn comes from the latest
//! `SessionSnapshot` and the terminal's own `UiState`.
//!
//! - `utils`: Shared utility functions (formatting, scrollable lists)
//! - `layout`: Now-playing header
//! - `playlist`: Catalog listing with the active track marked
//! - `progress`: Progress bar rendering
//! - `overlays`: Modal overlays (error, help)

mod utils;
mod layout;
mod playlist;
mod progress;
mod overlays;

use ratatui::{
    layout::{Constraint, Direction, Layout},
    Frame,
};

use crate::model::{Catalog, SessionSnapshot, UiState};

pub struct AppView;

impl AppView {
    pub fn render(frame: &mut Frame, snapshot: &SessionSnapshot, ui_state: &UiState, catalog: &Catalog) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4), // Now playing
                Constraint::Min(0),    // Playlist
                Constraint::Length(3), // Progress bar with playback info
            ])
            .split(frame.area());

        layout::render_now_playing(frame, chunks[0], snapshot, ui_state);
        playlist::render_playlist(frame, chunks[1], catalog, snapshot, ui_state.cursor);
        progress::render_progress_bar(frame, chunks[2], snapshot);

        if ui_state.error_message.is_some() {
            overlays::render_error_notification(frame, ui_state);
        }

        if ui_state.show_help_popup {
            overlays::render_help_popup(frame);
        }
    }
}
