//! Playback session state machine
//!
//! Pure, synchronous transitions over the session state. Side effects
//! (resolution requests, transport commands, notifications) are driven by the
//! controller from the values these methods return.
//!
//! Resolution results are matched against the latest issued token: anything
//! tagged with an older token is a no-op, which is how a new selection
//! "cancels" an in-flight request without a cancellation primitive.

use std::fmt;

use crate::error::{FailureReason, SessionError};
use super::catalog::wrap_index;

/// Transport state of the session
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TransportState {
    #[default]
    Idle,
    Resolving,
    Ready,
    Playing,
    Paused,
    Errored,
}

impl TransportState {
    /// States in which `resolved_url` is valid and the transport is bound
    pub fn has_source(self) -> bool {
        matches!(
            self,
            TransportState::Ready | TransportState::Playing | TransportState::Paused
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            TransportState::Idle => "idle",
            TransportState::Resolving => "resolving",
            TransportState::Ready => "ready",
            TransportState::Playing => "playing",
            TransportState::Paused => "paused",
            TransportState::Errored => "errored",
        }
    }
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Handle for one resolution request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolveTicket {
    pub token: u64,
    pub track_index: usize,
}

/// Result of feeding a resolution outcome into the session
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolveApplied {
    /// Entered `Ready`; `play` is set when a play intent was pending
    Ready { play: bool },
    Errored,
    /// Superseded token or session no longer resolving; nothing changed
    Stale,
}

/// What a play/pause toggle asks the transport to do
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayPause {
    Started,
    Paused,
    Resolve(ResolveTicket),
    /// Still resolving; the play-when-ready intent is now this value
    IntentChanged(bool),
}

#[derive(Clone, Debug)]
pub struct PlaybackSession {
    track_index: usize,
    catalog_len: usize,
    state: TransportState,
    resolved_url: Option<String>,
    position: f64,
    duration: f64,
    volume: f32,
    latest_token: u64,
    play_when_ready: bool,
    error: Option<FailureReason>,
}

impl PlaybackSession {
    pub fn new(catalog_len: usize, volume: f32) -> Result<Self, SessionError> {
        if catalog_len == 0 {
            return Err(SessionError::EmptyCatalog);
        }
        Ok(Self {
            track_index: 0,
            catalog_len,
            state: TransportState::Idle,
            resolved_url: None,
            position: 0.0,
            duration: 0.0,
            volume: clamp_volume(volume),
            latest_token: 0,
            play_when_ready: false,
            error: None,
        })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn track_index(&self) -> usize {
        self.track_index
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn resolved_url(&self) -> Option<&str> {
        self.resolved_url.as_deref()
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn error(&self) -> Option<&FailureReason> {
        self.error.as_ref()
    }

    pub fn play_when_ready(&self) -> bool {
        self.play_when_ready
    }

    /// True while `token` is the live request and its result is still wanted
    pub fn is_current(&self, token: u64) -> bool {
        token == self.latest_token && self.state == TransportState::Resolving
    }

    // ========================================================================
    // Track selection
    // ========================================================================

    pub fn select(&mut self, index: usize) -> Result<ResolveTicket, SessionError> {
        self.check_index(index)?;
        Ok(self.begin_resolution(index, false))
    }

    pub fn select_and_play(&mut self, index: usize) -> Result<ResolveTicket, SessionError> {
        self.check_index(index)?;
        Ok(self.begin_resolution(index, true))
    }

    pub fn next(&mut self) -> ResolveTicket {
        let index = wrap_index(self.track_index as i64 + 1, self.catalog_len);
        let play = self.wants_playback();
        self.begin_resolution(index, play)
    }

    pub fn previous(&mut self) -> ResolveTicket {
        let index = wrap_index(self.track_index as i64 - 1, self.catalog_len);
        let play = self.wants_playback();
        self.begin_resolution(index, play)
    }

    /// `Errored -> Resolving` for the same track
    pub fn retry(&mut self) -> Result<ResolveTicket, SessionError> {
        if self.state != TransportState::Errored {
            return Err(self.invalid("retry"));
        }
        Ok(self.begin_resolution(self.track_index, false))
    }

    /// Re-resolve the current track after its URL stopped being accepted
    pub fn reload_expired(&mut self) -> Result<ResolveTicket, SessionError> {
        if !self.state.has_source() {
            return Err(self.invalid("reload"));
        }
        let play = self.wants_playback();
        Ok(self.begin_resolution(self.track_index, play))
    }

    /// Natural end of media: auto-advance (wrapping) and keep playing
    pub fn transport_ended(&mut self) -> Option<ResolveTicket> {
        if self.state != TransportState::Playing {
            return None;
        }
        let index = wrap_index(self.track_index as i64 + 1, self.catalog_len);
        Some(self.begin_resolution(index, true))
    }

    fn begin_resolution(&mut self, index: usize, play: bool) -> ResolveTicket {
        self.latest_token += 1;
        self.track_index = index;
        self.state = TransportState::Resolving;
        self.resolved_url = None;
        self.position = 0.0;
        self.duration = 0.0;
        self.error = None;
        self.play_when_ready = play;
        ResolveTicket {
            token: self.latest_token,
            track_index: index,
        }
    }

    fn wants_playback(&self) -> bool {
        match self.state {
            TransportState::Playing => true,
            TransportState::Resolving => self.play_when_ready,
            _ => false,
        }
    }

    fn check_index(&self, index: usize) -> Result<(), SessionError> {
        if index < self.catalog_len {
            Ok(())
        } else {
            Err(SessionError::IndexOutOfRange {
                index,
                len: self.catalog_len,
            })
        }
    }

    // ========================================================================
    // Resolution results
    // ========================================================================

    pub fn resolve_ok(&mut self, token: u64, url: String) -> ResolveApplied {
        if !self.is_current(token) {
            return ResolveApplied::Stale;
        }
        self.state = TransportState::Ready;
        self.resolved_url = Some(url);
        ResolveApplied::Ready {
            play: self.play_when_ready,
        }
    }

    pub fn resolve_failed(&mut self, token: u64, reason: FailureReason) -> ResolveApplied {
        if !self.is_current(token) {
            return ResolveApplied::Stale;
        }
        self.enter_errored(reason);
        ResolveApplied::Errored
    }

    /// Playback failure after a URL was bound
    pub fn fail(&mut self, reason: FailureReason) -> Result<(), SessionError> {
        if !self.state.has_source() {
            return Err(self.invalid("fail playback"));
        }
        self.enter_errored(reason);
        Ok(())
    }

    fn enter_errored(&mut self, reason: FailureReason) {
        self.state = TransportState::Errored;
        self.resolved_url = None;
        self.play_when_ready = false;
        self.error = Some(reason);
    }

    // ========================================================================
    // Transport intents
    // ========================================================================

    pub fn play(&mut self) -> Result<(), SessionError> {
        match self.state {
            TransportState::Ready | TransportState::Paused => {
                self.state = TransportState::Playing;
                self.play_when_ready = false;
                Ok(())
            }
            _ => Err(self.invalid("play")),
        }
    }

    pub fn pause(&mut self) -> Result<(), SessionError> {
        match self.state {
            TransportState::Playing => {
                self.state = TransportState::Paused;
                Ok(())
            }
            _ => Err(self.invalid("pause")),
        }
    }

    pub fn play_pause(&mut self) -> PlayPause {
        match self.state {
            TransportState::Ready | TransportState::Paused => {
                self.state = TransportState::Playing;
                self.play_when_ready = false;
                PlayPause::Started
            }
            TransportState::Playing => {
                self.state = TransportState::Paused;
                PlayPause::Paused
            }
            TransportState::Resolving => {
                self.play_when_ready = !self.play_when_ready;
                PlayPause::IntentChanged(self.play_when_ready)
            }
            TransportState::Idle | TransportState::Errored => {
                PlayPause::Resolve(self.begin_resolution(self.track_index, true))
            }
        }
    }

    /// Returns the clamped position the transport should seek to
    pub fn seek(&mut self, requested: f64) -> Result<f64, SessionError> {
        if !self.state.has_source() {
            return Err(SessionError::SeekUnavailable(self.state));
        }
        let requested = if requested.is_finite() { requested } else { 0.0 };
        let target = requested.clamp(0.0, self.duration.max(0.0));
        self.position = target;
        Ok(target)
    }

    pub fn set_volume(&mut self, volume: f32) -> f32 {
        self.volume = clamp_volume(volume);
        self.volume
    }

    /// Mirror transport-owned timing; never changes the transport state
    pub fn update_position(&mut self, position: f64, duration: Option<f64>) -> bool {
        if !self.state.has_source() {
            return false;
        }
        if let Some(duration) = duration.filter(|d| d.is_finite() && *d > 0.0) {
            self.duration = duration;
        }
        let position = if position.is_finite() { position.max(0.0) } else { 0.0 };
        self.position = if self.duration > 0.0 {
            position.min(self.duration)
        } else {
            position
        };
        true
    }

    fn invalid(&self, action: &'static str) -> SessionError {
        SessionError::InvalidTransition {
            action,
            state: self.state,
        }
    }
}

fn clamp_volume(volume: f32) -> f32 {
    if volume.is_finite() {
        volume.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn ready_session(len: usize) -> (PlaybackSession, ResolveTicket) {
        let mut session = PlaybackSession::new(len, 0.8).unwrap();
        let ticket = session.select(0).unwrap();
        assert_eq!(
            session.resolve_ok(ticket.token, "a.mp3".into()),
            ResolveApplied::Ready { play: false }
        );
        (session, ticket)
    }

    #[test]
    fn starts_idle_and_rejects_empty_catalog() {
        let session = PlaybackSession::new(3, 0.5).unwrap();
        assert_eq!(session.state(), TransportState::Idle);
        assert_eq!(session.track_index(), 0);
        assert!(session.resolved_url().is_none());
        assert_eq!(
            PlaybackSession::new(0, 0.5).unwrap_err(),
            SessionError::EmptyCatalog
        );
    }

    #[test]
    fn select_then_resolve_reaches_ready() {
        let mut session = PlaybackSession::new(3, 0.8).unwrap();
        let ticket = session.select(0).unwrap();
        assert_eq!(session.state(), TransportState::Resolving);
        assert_eq!(ticket, ResolveTicket { token: 1, track_index: 0 });

        session.resolve_ok(ticket.token, "a.mp3".into());
        assert_eq!(session.state(), TransportState::Ready);
        assert_eq!(session.resolved_url(), Some("a.mp3"));
    }

    #[test]
    fn out_of_range_select_changes_nothing() {
        let (mut session, _) = ready_session(3);
        let err = session.select(3).unwrap_err();
        assert_eq!(err, SessionError::IndexOutOfRange { index: 3, len: 3 });
        assert_eq!(session.state(), TransportState::Ready);
        assert_eq!(session.resolved_url(), Some("a.mp3"));
    }

    #[test]
    fn stale_token_never_mutates_session() {
        let mut session = PlaybackSession::new(3, 0.8).unwrap();
        let first = session.select(1).unwrap();
        let second = session.select(2).unwrap();
        assert!(second.token > first.token);

        assert_eq!(
            session.resolve_ok(first.token, "old.mp3".into()),
            ResolveApplied::Stale
        );
        assert_eq!(
            session.resolve_failed(first.token, FailureReason::new(FailureKind::NotFound, "gone")),
            ResolveApplied::Stale
        );
        assert_eq!(session.state(), TransportState::Resolving);
        assert_eq!(session.track_index(), 2);
        assert!(session.resolved_url().is_none());

        session.resolve_ok(second.token, "new.mp3".into());
        assert_eq!(session.resolved_url(), Some("new.mp3"));

        // A duplicate delivery for the live token after Ready is also ignored
        assert_eq!(
            session.resolve_ok(second.token, "dup.mp3".into()),
            ResolveApplied::Stale
        );
        assert_eq!(session.resolved_url(), Some("new.mp3"));
    }

    #[test]
    fn index_stays_in_range_for_random_navigation() {
        let mut rng = StdRng::seed_from_u64(7);
        for len in 1..6 {
            let mut session = PlaybackSession::new(len, 0.8).unwrap();
            for _ in 0..200 {
                match rng.random_range(0..3) {
                    0 => {
                        session.next();
                    }
                    1 => {
                        session.previous();
                    }
                    _ => {
                        let _ = session.select(rng.random_range(0..len + 2));
                    }
                }
                assert!(session.track_index() < len);
            }
        }
    }

    #[test]
    fn previous_at_zero_wraps_to_last() {
        let mut session = PlaybackSession::new(4, 0.8).unwrap();
        let ticket = session.previous();
        assert_eq!(ticket.track_index, 3);
        let ticket = session.next();
        assert_eq!(ticket.track_index, 0);
    }

    #[test]
    fn play_pause_twice_from_ready_freezes_position() {
        let (mut session, _) = ready_session(2);
        session.update_position(12.5, Some(200.0));

        assert_eq!(session.play_pause(), PlayPause::Started);
        assert_eq!(session.state(), TransportState::Playing);
        assert_eq!(session.play_pause(), PlayPause::Paused);
        assert_eq!(session.state(), TransportState::Paused);
        assert_eq!(session.position(), 12.5);
        assert_eq!(session.resolved_url(), Some("a.mp3"));
    }

    #[test]
    fn play_pause_from_idle_and_errored_starts_resolution_with_intent() {
        let mut session = PlaybackSession::new(2, 0.8).unwrap();
        let PlayPause::Resolve(ticket) = session.play_pause() else {
            panic!("expected resolution from idle");
        };
        assert!(session.play_when_ready());

        session.resolve_failed(ticket.token, FailureReason::new(FailureKind::Transient, "timeout"));
        assert_eq!(session.state(), TransportState::Errored);
        assert!(matches!(session.play_pause(), PlayPause::Resolve(_)));
        assert_eq!(session.state(), TransportState::Resolving);
    }

    #[test]
    fn play_pause_while_resolving_toggles_intent() {
        let mut session = PlaybackSession::new(2, 0.8).unwrap();
        let ticket = session.select(1).unwrap();
        assert_eq!(session.play_pause(), PlayPause::IntentChanged(true));
        assert_eq!(
            session.resolve_ok(ticket.token, "b.mp3".into()),
            ResolveApplied::Ready { play: true }
        );
    }

    #[test]
    fn next_while_playing_keeps_playing_intent() {
        let (mut session, _) = ready_session(3);
        session.play().unwrap();
        let ticket = session.next();
        assert!(session.play_when_ready());
        assert_eq!(
            session.resolve_ok(ticket.token, "b.mp3".into()),
            ResolveApplied::Ready { play: true }
        );

        session.pause().unwrap_err();
        session.play().unwrap();
        session.pause().unwrap();
        session.next();
        assert!(!session.play_when_ready());
    }

    #[test]
    fn transport_ended_on_last_track_wraps_to_first() {
        let mut session = PlaybackSession::new(3, 0.8).unwrap();
        let ticket = session.select(2).unwrap();
        session.resolve_ok(ticket.token, "c.mp3".into());
        session.play().unwrap();

        let next = session.transport_ended().unwrap();
        assert_eq!(next.track_index, 0);
        assert_eq!(session.state(), TransportState::Resolving);
        assert!(session.play_when_ready());
    }

    #[test]
    fn transport_ended_outside_playing_is_ignored() {
        let (mut session, _) = ready_session(3);
        assert!(session.transport_ended().is_none());
        assert_eq!(session.state(), TransportState::Ready);
    }

    #[test]
    fn retry_only_from_errored() {
        let (mut session, _) = ready_session(2);
        assert!(matches!(
            session.retry(),
            Err(SessionError::InvalidTransition { action: "retry", .. })
        ));

        session
            .fail(FailureReason::new(FailureKind::Unplayable, "decode error"))
            .unwrap();
        assert_eq!(session.state(), TransportState::Errored);
        assert!(session.resolved_url().is_none());

        let ticket = session.retry().unwrap();
        assert_eq!(ticket.track_index, 0);
        assert_eq!(session.state(), TransportState::Resolving);
        assert!(session.error().is_none());
    }

    #[test]
    fn reload_expired_keeps_track_and_issues_new_token() {
        let (mut session, first) = ready_session(2);
        session.play().unwrap();
        let ticket = session.reload_expired().unwrap();
        assert_eq!(ticket.track_index, first.track_index);
        assert!(ticket.token > first.token);
        assert!(session.play_when_ready());
        assert!(session.resolved_url().is_none());
    }

    #[test]
    fn seek_is_clamped_and_state_guarded() {
        let mut session = PlaybackSession::new(2, 0.8).unwrap();
        assert_eq!(
            session.seek(10.0).unwrap_err(),
            SessionError::SeekUnavailable(TransportState::Idle)
        );

        let ticket = session.select(0).unwrap();
        assert!(session.seek(10.0).is_err());
        session.resolve_ok(ticket.token, "a.mp3".into());
        session.update_position(0.0, Some(180.0));
        session.play().unwrap();

        assert_eq!(session.seek(500.0).unwrap(), 180.0);
        assert_eq!(session.seek(-3.0).unwrap(), 0.0);
        assert_eq!(session.seek(f64::NAN).unwrap(), 0.0);
        assert_eq!(session.seek(42.0).unwrap(), 42.0);
        assert_eq!(session.state(), TransportState::Playing);
    }

    #[test]
    fn volume_is_clamped() {
        let mut session = PlaybackSession::new(1, 2.0).unwrap();
        assert_eq!(session.volume(), 1.0);
        assert_eq!(session.set_volume(-0.5), 0.0);
        assert_eq!(session.set_volume(0.25), 0.25);
        assert_eq!(session.set_volume(f32::NAN), 0.0);
    }

    #[test]
    fn position_updates_ignored_without_source() {
        let mut session = PlaybackSession::new(1, 0.8).unwrap();
        assert!(!session.update_position(5.0, Some(10.0)));
        assert_eq!(session.position(), 0.0);

        let ticket = session.select(0).unwrap();
        session.resolve_ok(ticket.token, "a.mp3".into());
        assert!(session.update_position(15.0, Some(10.0)));
        assert_eq!(session.position(), 10.0);
        assert_eq!(session.state(), TransportState::Ready);
    }
}
