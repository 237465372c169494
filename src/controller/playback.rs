//! Public playback intents
//!
//! Every surface (keys, platform media buttons) goes through these methods.
//! Each one takes the core lock once, applies a session transition, performs
//! the transport side effect and publishes.

use crate::error::{FailureKind, FailureReason, SessionError};
use crate::media_session::MediaAction;
use crate::model::{PlayPause, TransportState};
use super::{ControllerCore, SessionController};

/// Intent addressed to the session
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Intent {
    Select(usize),
    SelectAndPlay(usize),
    PlayPause,
    Next,
    Previous,
    Seek(f64),
    SeekBy(f64),
    SetVolume(f32),
    Retry,
}

impl SessionController {
    pub async fn dispatch(&self, intent: Intent) -> Result<(), SessionError> {
        tracing::debug!(?intent, "Dispatching intent");
        match intent {
            Intent::Select(index) => self.select(index).await,
            Intent::SelectAndPlay(index) => self.select_and_play(index).await,
            Intent::PlayPause => {
                self.play_pause().await;
                Ok(())
            }
            Intent::Next => {
                self.next().await;
                Ok(())
            }
            Intent::Previous => {
                self.previous().await;
                Ok(())
            }
            Intent::Seek(position) => self.seek(position).await.map(|_| ()),
            Intent::SeekBy(delta) => self.seek_by(delta).await.map(|_| ()),
            Intent::SetVolume(volume) => {
                self.set_volume(volume).await;
                Ok(())
            }
            Intent::Retry => self.retry().await,
        }
    }

    // ========================================================================
    // Track selection
    // ========================================================================

    pub async fn select(&self, index: usize) -> Result<(), SessionError> {
        let mut core = self.core.lock().await;
        let ticket = core.session.select(index)?;
        tracing::info!(track_index = index, token = ticket.token, "Track selected");
        self.start_resolution(&mut core, ticket, true, None);
        Ok(())
    }

    pub async fn select_and_play(&self, index: usize) -> Result<(), SessionError> {
        let mut core = self.core.lock().await;
        let ticket = core.session.select_and_play(index)?;
        tracing::info!(track_index = index, token = ticket.token, "Track selected for playback");
        self.start_resolution(&mut core, ticket, true, None);
        Ok(())
    }

    pub async fn next(&self) {
        let mut core = self.core.lock().await;
        let ticket = core.session.next();
        tracing::info!(track_index = ticket.track_index, token = ticket.token, "Next track");
        self.start_resolution(&mut core, ticket, true, None);
    }

    pub async fn previous(&self) {
        let mut core = self.core.lock().await;
        let ticket = core.session.previous();
        tracing::info!(track_index = ticket.track_index, token = ticket.token, "Previous track");
        self.start_resolution(&mut core, ticket, true, None);
    }

    /// Manual retry of an errored track
    pub async fn retry(&self) -> Result<(), SessionError> {
        let mut core = self.core.lock().await;
        let ticket = core.session.retry()?;
        tracing::info!(track_index = ticket.track_index, token = ticket.token, "Retrying track");
        self.start_resolution(&mut core, ticket, true, None);
        Ok(())
    }

    // ========================================================================
    // Transport
    // ========================================================================

    pub async fn play_pause(&self) -> PlayPause {
        let mut core = self.core.lock().await;
        self.play_pause_locked(&mut core)
    }

    fn play_pause_locked(&self, core: &mut ControllerCore) -> PlayPause {
        let outcome = core.session.play_pause();
        match outcome {
            PlayPause::Started => {
                self.start_output(core);
            }
            PlayPause::Paused => {
                if let Err(e) = core.transport.pause() {
                    tracing::warn!(error = %e, "Failed to pause output");
                }
                tracing::info!("Playback paused");
                self.publish(core);
            }
            PlayPause::Resolve(ticket) => {
                tracing::info!(track_index = ticket.track_index, token = ticket.token, "Resolving before playback");
                self.start_resolution(core, ticket, true, None);
            }
            PlayPause::IntentChanged(play) => {
                tracing::debug!(play, "Play-when-ready intent changed");
                self.publish(core);
            }
        }
        outcome
    }

    /// Enter `Playing` from `Ready`/`Paused` after a resolution landed with a
    /// play intent
    pub(crate) fn start_playback(&self, core: &mut ControllerCore) {
        match core.session.play() {
            Ok(()) => self.start_output(core),
            Err(e) => tracing::warn!(error = %e, "Play intent dropped"),
        }
    }

    /// The session is already `Playing`: start the output or fail the track
    fn start_output(&self, core: &mut ControllerCore) {
        if let Err(e) = core.transport.start() {
            tracing::error!(error = %e, "Failed to start output");
            core.transport.release();
            let reason = FailureReason::new(FailureKind::Unplayable, format!("{:#}", e));
            if let Err(e) = core.session.fail(reason) {
                tracing::error!(error = %e, "Could not record output failure");
            }
        } else {
            tracing::info!(track_index = core.session.track_index(), "Playback started");
        }
        self.publish(core);
    }

    /// Returns the position actually sought to
    pub async fn seek(&self, position: f64) -> Result<f64, SessionError> {
        let mut core = self.core.lock().await;
        let target = core.session.seek(position)?;
        if let Err(e) = core.transport.seek(target) {
            tracing::warn!(error = %e, target, "Failed to seek output");
        }
        self.publish(&mut core);
        Ok(target)
    }

    pub async fn seek_by(&self, delta: f64) -> Result<f64, SessionError> {
        let position = self.core.lock().await.session.position();
        self.seek(position + delta).await
    }

    /// Returns the clamped volume
    pub async fn set_volume(&self, volume: f32) -> f32 {
        let mut core = self.core.lock().await;
        let volume = core.session.set_volume(volume);
        if let Err(e) = core.transport.set_volume(volume) {
            tracing::warn!(error = %e, volume, "Failed to set output volume");
        }
        self.publish(&mut core);
        volume
    }

    pub async fn adjust_volume(&self, delta: f32) -> f32 {
        let volume = self.core.lock().await.session.volume();
        self.set_volume(volume + delta).await
    }

    // ========================================================================
    // Platform media buttons
    // ========================================================================

    pub async fn apply_media_action(&self, action: MediaAction) {
        tracing::debug!(?action, "Media action");
        let mut core = self.core.lock().await;
        let state = core.session.state();
        match action {
            MediaAction::Play => {
                let pending_play = state == TransportState::Resolving && core.session.play_when_ready();
                if state != TransportState::Playing && !pending_play {
                    self.play_pause_locked(&mut core);
                }
            }
            MediaAction::Pause => {
                let pending_play = state == TransportState::Resolving && core.session.play_when_ready();
                if state == TransportState::Playing || pending_play {
                    self.play_pause_locked(&mut core);
                }
            }
            MediaAction::Toggle => {
                self.play_pause_locked(&mut core);
            }
            MediaAction::Next => {
                drop(core);
                self.next().await;
            }
            MediaAction::Previous => {
                drop(core);
                self.previous().await;
            }
            MediaAction::SeekTo(position) => {
                drop(core);
                if let Err(e) = self.seek(position).await {
                    tracing::debug!(error = %e, "Media seek ignored");
                }
            }
            MediaAction::SeekBy(delta) => {
                drop(core);
                if let Err(e) = self.seek_by(delta).await {
                    tracing::debug!(error = %e, "Media seek ignored");
                }
            }
        }
    }
}
