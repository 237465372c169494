//! Platform media-session integration (lock screen, media keys)
//!
//! Best-effort: the controller mirrors the active track and transport state
//! into a `MediaSessionSink`, and platform transport buttons come back as
//! `MediaAction`s that are dispatched through the same intents as the UI.

use crate::model::{SessionSnapshot, Track};

pub const UNKNOWN_ALBUM: &str = "Unknown album";

/// Transport request coming from the platform
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MediaAction {
    Play,
    Pause,
    Toggle,
    Next,
    Previous,
    SeekTo(f64),
    /// Relative seek in seconds, negative goes back
    SeekBy(f64),
}

pub trait MediaSessionSink: Send {
    fn set_metadata(&mut self, track: &Track);
    fn set_playback(&mut self, snapshot: &SessionSnapshot);
}

#[cfg(feature = "media-controls")]
pub use platform::SouvlakiSink;

#[cfg(feature = "media-controls")]
mod platform {
    use std::time::Duration;

    use anyhow::{anyhow, Result};
    use souvlaki::{
        MediaControlEvent, MediaControls, MediaMetadata, MediaPlayback, MediaPosition,
        PlatformConfig, SeekDirection,
    };
    use tokio::sync::mpsc;

    use super::{MediaAction, MediaSessionSink, UNKNOWN_ALBUM};
    use crate::model::{SessionSnapshot, TransportState, Track};

    const DISPLAY_NAME: &str = "jukebox-rs";
    const DBUS_NAME: &str = "jukebox_rs";
    const SEEK_STEP: Duration = Duration::from_secs(10);

    /// MPRIS / SMTC / Now Playing via souvlaki
    pub struct SouvlakiSink {
        controls: MediaControls,
    }

    impl SouvlakiSink {
        pub fn new(actions: mpsc::UnboundedSender<MediaAction>) -> Result<Self> {
            let mut controls = MediaControls::new(PlatformConfig {
                display_name: DISPLAY_NAME,
                dbus_name: DBUS_NAME,
                hwnd: None,
            })
            .map_err(|e| anyhow!("media controls unavailable: {:?}", e))?;

            controls
                .attach(move |event| {
                    if let Some(action) = map_control_event(event) {
                        let _ = actions.send(action);
                    }
                })
                .map_err(|e| anyhow!("failed to attach media controls handler: {:?}", e))?;

            Ok(Self { controls })
        }
    }

    fn map_control_event(event: MediaControlEvent) -> Option<MediaAction> {
        match event {
            MediaControlEvent::Play => Some(MediaAction::Play),
            MediaControlEvent::Pause => Some(MediaAction::Pause),
            MediaControlEvent::Toggle => Some(MediaAction::Toggle),
            MediaControlEvent::Next => Some(MediaAction::Next),
            MediaControlEvent::Previous => Some(MediaAction::Previous),
            MediaControlEvent::SetPosition(MediaPosition(position)) => {
                Some(MediaAction::SeekTo(position.as_secs_f64()))
            }
            MediaControlEvent::SeekBy(direction, delta) => {
                Some(MediaAction::SeekBy(signed(direction, delta)))
            }
            MediaControlEvent::Seek(direction) => {
                Some(MediaAction::SeekBy(signed(direction, SEEK_STEP)))
            }
            _ => None,
        }
    }

    fn signed(direction: SeekDirection, delta: Duration) -> f64 {
        match direction {
            SeekDirection::Forward => delta.as_secs_f64(),
            SeekDirection::Backward => -delta.as_secs_f64(),
        }
    }

    impl MediaSessionSink for SouvlakiSink {
        fn set_metadata(&mut self, track: &Track) {
            let result = self.controls.set_metadata(MediaMetadata {
                title: Some(&track.title),
                artist: Some(&track.artist),
                album: Some(UNKNOWN_ALBUM),
                cover_url: Some(&track.cover),
                duration: None,
            });
            if let Err(e) = result {
                tracing::debug!(error = ?e, "Failed to publish media metadata");
            }
        }

        fn set_playback(&mut self, snapshot: &SessionSnapshot) {
            let progress = Some(MediaPosition(Duration::from_secs_f64(snapshot.position.max(0.0))));
            let playback = match snapshot.transport_state {
                TransportState::Playing => MediaPlayback::Playing { progress },
                TransportState::Paused | TransportState::Ready => MediaPlayback::Paused { progress },
                _ => MediaPlayback::Stopped,
            };
            if let Err(e) = self.controls.set_playback(playback) {
                tracing::debug!(error = ?e, "Failed to publish media playback state");
            }
        }
    }
}
