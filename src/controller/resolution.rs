//! Resolution tasks
//!
//! One task per ticket. The task never checks whether it has been superseded
//! before calling the resolver (no cancellation); the session discards its
//! result if a newer ticket was issued meanwhile. The only early exit is
//! skipping the automatic retry when the ticket died during the retry delay.

use std::time::Duration;

use crate::error::{FailureKind, FailureReason, ResolveError};
use crate::model::{ResolveApplied, ResolveTicket};
use crate::resolver::ResolveRequest;
use super::SessionController;

impl SessionController {
    pub(crate) async fn run_resolution(self, ticket: ResolveTicket, delay: Option<Duration>) {
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
            if !self.is_live(ticket).await {
                tracing::debug!(token = ticket.token, "Delayed resolution superseded before it started");
                return;
            }
        }

        let Some(track) = self.catalog.get(ticket.track_index) else {
            return;
        };
        let request = ResolveRequest::for_track(track);

        let mut result = self.pipeline.resolve(&request).await;
        if let Err(e) = &result {
            if e.is_transient() {
                let delay = self.pipeline.retry_delay();
                tracing::info!(
                    token = ticket.token,
                    track_id = %request.track_id,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Transient resolution failure, retrying once"
                );
                tokio::time::sleep(delay).await;
                if !self.is_live(ticket).await {
                    tracing::debug!(token = ticket.token, "Retry skipped, ticket superseded");
                    return;
                }
                result = self.pipeline.resolve(&request).await;
            }
        }

        self.apply_resolution(ticket, result).await;
    }

    async fn is_live(&self, ticket: ResolveTicket) -> bool {
        self.core.lock().await.session.is_current(ticket.token)
    }

    /// Feed a resolution outcome into the session. Binding happens here, and
    /// only here, so each `Resolving -> Ready` binds the transport once.
    pub(crate) async fn apply_resolution(
        &self,
        ticket: ResolveTicket,
        result: Result<String, ResolveError>,
    ) {
        let mut core = self.core.lock().await;

        match result {
            Ok(url) => {
                let applied = core.session.resolve_ok(ticket.token, url.clone());
                let ResolveApplied::Ready { play } = applied else {
                    tracing::debug!(token = ticket.token, "Discarding stale resolution result");
                    return;
                };

                let bitrate = self
                    .catalog
                    .get(ticket.track_index)
                    .map(|track| track.default_bitrate)
                    .unwrap_or_default();
                if let Err(e) = core.transport.bind(&url, bitrate) {
                    tracing::error!(token = ticket.token, error = %e, "Failed to bind resolved url");
                    let reason = FailureReason::new(FailureKind::Unplayable, format!("{:#}", e));
                    if let Err(e) = core.session.fail(reason) {
                        tracing::error!(error = %e, "Could not record bind failure");
                    }
                    self.publish(&mut core);
                    return;
                }

                tracing::info!(
                    token = ticket.token,
                    track_index = ticket.track_index,
                    play,
                    "Track ready"
                );
                self.publish(&mut core);

                if play {
                    self.start_playback(&mut core);
                }
            }
            Err(error) => {
                let reason = FailureReason::from(error);
                match core.session.resolve_failed(ticket.token, reason.clone()) {
                    ResolveApplied::Stale => {
                        tracing::debug!(token = ticket.token, "Discarding stale resolution failure");
                    }
                    _ => {
                        tracing::warn!(
                            token = ticket.token,
                            track_index = ticket.track_index,
                            reason = %reason,
                            "Resolution failed"
                        );
                        self.publish(&mut core);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::controller::test_support::{catalog, drain_states, harness, settle};
    use crate::error::{FailureKind, ResolveError};
    use crate::model::{Catalog, Track, TransportState};
    use crate::testing::OutputCall;

    #[tokio::test(start_paused = true)]
    async fn select_resolves_to_ready() {
        let mut h = harness(catalog(3));
        h.resolver.push_ok_after("0", "a.mp3", Duration::from_millis(50));

        h.controller.select(0).await.unwrap();
        settle(Duration::from_millis(100)).await;

        assert_eq!(
            drain_states(&mut h.updates),
            vec![TransportState::Resolving, TransportState::Ready]
        );
        assert_eq!(h.controller.resolved_url().await.as_deref(), Some("a.mp3"));
        assert_eq!(h.output.loads().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn superseded_result_is_ignored() {
        let h = harness(catalog(3));
        h.resolver.push_ok_after("1", "one.mp3", Duration::from_millis(500));
        h.resolver.push_ok_after("2", "two.mp3", Duration::from_millis(100));

        h.controller.select(1).await.unwrap();
        settle(Duration::from_millis(10)).await;
        h.controller.select(2).await.unwrap();

        settle(Duration::from_millis(200)).await;
        let snapshot = h.controller.snapshot().await;
        assert_eq!(snapshot.track_index, 2);
        assert_eq!(snapshot.transport_state, TransportState::Ready);

        settle(Duration::from_secs(1)).await;
        assert_eq!(h.controller.resolved_url().await.as_deref(), Some("two.mp3"));
        assert_eq!(h.output.loads(), vec![(1, "two.mp3".to_string())]);
    }

    #[tokio::test(start_paused = true)]
    async fn still_pending_result_does_not_disturb_resolving_track() {
        let h = harness(catalog(3));
        h.resolver.push_ok_after("1", "one.mp3", Duration::from_millis(100));
        h.resolver.push_ok_after("2", "two.mp3", Duration::from_millis(500));

        h.controller.select(1).await.unwrap();
        h.controller.select(2).await.unwrap();
        settle(Duration::from_millis(200)).await;

        let snapshot = h.controller.snapshot().await;
        assert_eq!(snapshot.track_index, 2);
        assert_eq!(snapshot.transport_state, TransportState::Resolving);
        assert!(h.output.loads().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failure_retries_once_then_errors() {
        let mut h = harness(catalog(3));
        h.resolver.push_err_after("0", ResolveError::Transient("timeout".into()), Duration::from_secs(30));
        h.resolver.push_err("0", ResolveError::Transient("503".into()));

        h.controller.select(0).await.unwrap();
        settle(Duration::from_secs(20)).await;

        let snapshot = h.controller.snapshot().await;
        assert_eq!(snapshot.transport_state, TransportState::Errored);
        assert_eq!(snapshot.error.map(|e| e.kind), Some(FailureKind::Transient));
        assert_eq!(h.resolver.calls_for("0"), 2);
        assert_eq!(
            drain_states(&mut h.updates),
            vec![TransportState::Resolving, TransportState::Errored]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failure_then_success_reaches_ready() {
        let h = harness(catalog(3));
        h.resolver.push_err("0", ResolveError::Transient("429".into()));
        h.resolver.push_ok("0", "a.mp3");

        h.controller.select(0).await.unwrap();
        settle(Duration::from_millis(999)).await;
        assert_eq!(h.controller.snapshot().await.transport_state, TransportState::Resolving);

        settle(Duration::from_secs(3)).await;
        assert_eq!(h.controller.snapshot().await.transport_state, TransportState::Ready);
        assert_eq!(h.resolver.calls_for("0"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn not_found_is_not_retried() {
        let h = harness(catalog(3));
        h.resolver.push_err("0", ResolveError::NotFound("no url".into()));

        h.controller.select(0).await.unwrap();
        settle(Duration::from_secs(5)).await;

        let snapshot = h.controller.snapshot().await;
        assert_eq!(snapshot.error.map(|e| e.kind), Some(FailureKind::NotFound));
        assert_eq!(h.resolver.calls_for("0"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_track_id_fails_before_any_call() {
        let catalog = Catalog::from_tracks(vec![Track::new("", "Nameless", "Nobody")]).unwrap();
        let h = harness(catalog);

        h.controller.select(0).await.unwrap();
        settle(Duration::from_millis(10)).await;

        let snapshot = h.controller.snapshot().await;
        assert_eq!(snapshot.transport_state, TransportState::Errored);
        assert_eq!(snapshot.error.map(|e| e.kind), Some(FailureKind::Invalid));
        assert_eq!(h.resolver.total_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn selecting_during_retry_delay_skips_second_attempt() {
        let h = harness(catalog(3));
        h.resolver.push_err("0", ResolveError::Transient("503".into()));
        h.resolver.push_ok("1", "one.mp3");

        h.controller.select(0).await.unwrap();
        settle(Duration::from_millis(500)).await;
        h.controller.select(1).await.unwrap();
        settle(Duration::from_secs(5)).await;

        assert_eq!(h.resolver.calls_for("0"), 1);
        assert_eq!(h.controller.resolved_url().await.as_deref(), Some("one.mp3"));
    }

    #[tokio::test(start_paused = true)]
    async fn select_and_play_starts_output_once_ready() {
        let mut h = harness(catalog(3));
        h.resolver.push_ok("1", "one.mp3");

        h.controller.select_and_play(1).await.unwrap();
        settle(Duration::from_millis(10)).await;

        assert_eq!(
            drain_states(&mut h.updates),
            vec![
                TransportState::Resolving,
                TransportState::Ready,
                TransportState::Playing
            ]
        );
        let calls = h.output.calls();
        assert_eq!(calls.iter().filter(|c| matches!(c, OutputCall::Load { .. })).count(), 1);
        assert_eq!(calls.last(), Some(&OutputCall::Play));
    }
}
