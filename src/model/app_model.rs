//! Terminal-side application model: cursor, overlays, quit flag

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use super::types::UiState;

const ERROR_DISPLAY_DURATION: Duration = Duration::from_secs(5);

/// State owned by the terminal surface. Playback state lives in the session.
pub struct AppModel {
    pub ui_state: Arc<Mutex<UiState>>,
    pub should_quit: Arc<Mutex<bool>>,
    track_count: usize,
}

impl AppModel {
    pub fn new(track_count: usize) -> Self {
        Self {
            ui_state: Arc::new(Mutex::new(UiState::default())),
            should_quit: Arc::new(Mutex::new(false)),
            track_count,
        }
    }

    pub async fn should_quit(&self) -> bool {
        *self.should_quit.lock().await
    }

    pub async fn set_should_quit(&self, quit: bool) {
        *self.should_quit.lock().await = quit;
    }

    pub async fn get_ui_state(&self) -> UiState {
        self.ui_state.lock().await.clone()
    }

    // ========================================================================
    // Playlist cursor
    // ========================================================================

    pub async fn cursor(&self) -> usize {
        self.ui_state.lock().await.cursor
    }

    pub async fn move_cursor_up(&self) {
        let mut state = self.ui_state.lock().await;
        state.cursor = state.cursor.saturating_sub(1);
    }

    pub async fn move_cursor_down(&self) {
        let mut state = self.ui_state.lock().await;
        if state.cursor + 1 < self.track_count {
            state.cursor += 1;
        }
    }

    pub async fn set_cursor(&self, index: usize) {
        let mut state = self.ui_state.lock().await;
        state.cursor = index.min(self.track_count.saturating_sub(1));
    }

    // ========================================================================
    // Messages & overlays
    // ========================================================================

    pub async fn set_error(&self, message: String) {
        let mut state = self.ui_state.lock().await;
        state.error_message = Some(message);
        state.error_timestamp = Some(Instant::now());
    }

    pub async fn has_error(&self) -> bool {
        self.ui_state.lock().await.error_message.is_some()
    }

    pub async fn clear_error(&self) {
        let mut state = self.ui_state.lock().await;
        state.error_message = None;
        state.error_timestamp = None;
    }

    pub async fn auto_clear_old_errors(&self) {
        let mut state = self.ui_state.lock().await;
        if let Some(timestamp) = state.error_timestamp {
            if timestamp.elapsed() >= ERROR_DISPLAY_DURATION {
                state.error_message = None;
                state.error_timestamp = None;
            }
        }
    }

    pub async fn set_status(&self, message: String) {
        self.ui_state.lock().await.status_message = Some(message);
    }

    pub async fn toggle_help_popup(&self) {
        let mut state = self.ui_state.lock().await;
        state.show_help_popup = !state.show_help_popup;
    }

    pub async fn is_help_popup_open(&self) -> bool {
        self.ui_state.lock().await.show_help_popup
    }

    pub async fn hide_help_popup(&self) {
        self.ui_state.lock().await.show_help_popup = false;
    }
}
