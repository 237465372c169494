//! Notification payload sent to rendering surfaces

use crate::error::FailureReason;
use super::catalog::Catalog;
use super::session::{PlaybackSession, TransportState};
use super::track::Track;

/// Complete playback information for rendering the UI
#[derive(Clone, Debug, PartialEq)]
pub struct SessionSnapshot {
    pub track_index: usize,
    pub track: Option<Track>,
    pub transport_state: TransportState,
    pub position: f64,
    pub duration: f64,
    pub volume: f32,
    pub error: Option<FailureReason>,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            track_index: 0,
            track: None,
            transport_state: TransportState::Idle,
            position: 0.0,
            duration: 0.0,
            volume: 1.0,
            error: None,
        }
    }
}

impl SessionSnapshot {
    pub fn capture(session: &PlaybackSession, catalog: &Catalog) -> Self {
        Self {
            track_index: session.track_index(),
            track: catalog.get(session.track_index()).cloned(),
            transport_state: session.state(),
            position: session.position(),
            duration: session.duration(),
            volume: session.volume(),
            error: session.error().cloned(),
        }
    }

    pub fn progress_ratio(&self) -> f64 {
        if self.duration > 0.0 {
            (self.position / self.duration).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}
