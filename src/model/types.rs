//! Terminal UI state

use std::time::Instant;

/// UI state for the application
#[derive(Clone, Debug)]
pub struct UiState {
    /// Highlighted playlist row (not necessarily the active track)
    pub cursor: usize,
    pub error_message: Option<String>,
    pub error_timestamp: Option<Instant>,
    pub status_message: Option<String>,
    pub show_help_popup: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            cursor: 0,
            error_message: None,
            error_timestamp: None,
            status_message: None,
            show_help_popup: false,
        }
    }
}
