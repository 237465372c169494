//! Audio output event listener

use tokio::task::JoinHandle;

use crate::audio::{OutputEvent, OutputEventReceiver, TransportSignal};
use super::SessionController;

impl SessionController {
    pub fn start_transport_listener(&self, mut events: OutputEventReceiver) -> JoinHandle<()> {
        let controller = self.clone();
        tracing::info!("Starting audio output event listener");

        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                controller.handle_output_event(event).await;
            }
            tracing::debug!("Audio output event listener shutting down");
        })
    }

    pub(crate) async fn handle_output_event(&self, event: OutputEvent) {
        let mut core = self.core.lock().await;
        let load_id = event.load_id;

        match core.transport.interpret(event) {
            TransportSignal::Ignored => {}
            TransportSignal::Loaded { duration } => {
                tracing::debug!(load_id, ?duration, "Output loaded");
                let position = core.session.position();
                if core.session.update_position(position, duration) {
                    self.publish(&mut core);
                }
            }
            TransportSignal::Progress { position, duration } => {
                tracing::trace!(load_id, position, "Output progress");
                if core.session.update_position(position, duration) {
                    self.publish(&mut core);
                }
            }
            TransportSignal::Ended => {
                tracing::debug!(load_id, "Output reached end of media");
                match core.session.transport_ended() {
                    Some(ticket) => {
                        tracing::info!(
                            track_index = ticket.track_index,
                            token = ticket.token,
                            "Auto-advancing"
                        );
                        self.start_resolution(&mut core, ticket, true, None);
                    }
                    None => tracing::debug!(state = %core.session.state(), "End of media outside playback"),
                }
            }
            TransportSignal::RetryExpired => match core.session.reload_expired() {
                Ok(ticket) => {
                    let delay = self.pipeline.retry_delay();
                    tracing::info!(
                        track_index = ticket.track_index,
                        token = ticket.token,
                        delay_ms = delay.as_millis() as u64,
                        "Re-resolving expired url"
                    );
                    self.start_resolution(&mut core, ticket, false, Some(delay));
                }
                Err(e) => tracing::debug!(error = %e, "Expiry retry not applicable"),
            },
            TransportSignal::Fail(reason) => {
                tracing::warn!(load_id, reason = %reason, "Playback failed");
                match core.session.fail(reason) {
                    Ok(()) => self.publish(&mut core),
                    Err(e) => tracing::debug!(error = %e, "Playback failure outside playback"),
                }
            }
        }
    }
}
