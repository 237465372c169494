//! Binds the session's resolved URL to the single audio output

use anyhow::{bail, Result};

use crate::error::{FailureKind, FailureReason};
use super::{AudioOutput, MediaSource, OutputEvent, OutputEventKind, OutputFailure};

/// Output event after the adapter has filtered and classified it
#[derive(Clone, Debug, PartialEq)]
pub enum TransportSignal {
    Loaded { duration: Option<f64> },
    Progress { position: f64, duration: Option<f64> },
    Ended,
    /// First access failure of this track load: re-resolve once
    RetryExpired,
    Fail(FailureReason),
    /// Event for a released load
    Ignored,
}

pub struct TransportAdapter {
    output: Box<dyn AudioOutput>,
    current_load: Option<u64>,
    next_load_id: u64,
    expiry_retry_available: bool,
}

impl TransportAdapter {
    pub fn new(output: Box<dyn AudioOutput>) -> Self {
        Self {
            output,
            current_load: None,
            next_load_id: 0,
            expiry_retry_available: true,
        }
    }

    #[cfg(test)]
    pub fn current_load(&self) -> Option<u64> {
        self.current_load
    }

    /// A new track load (user selection, auto-advance, manual retry) re-arms
    /// the one-shot expiry retry
    pub fn begin_track_load(&mut self) {
        self.expiry_retry_available = true;
    }

    /// Bind a resolved URL, releasing whatever was bound before
    pub fn bind(&mut self, url: &str, bitrate_kbps: u32) -> Result<u64> {
        self.release();
        self.next_load_id += 1;
        let load_id = self.next_load_id;

        self.output.load(MediaSource {
            load_id,
            url: url.to_string(),
            bitrate_kbps,
        })?;
        self.current_load = Some(load_id);
        tracing::debug!(load_id, "Transport bound to resolved url");
        Ok(load_id)
    }

    pub fn release(&mut self) {
        if let Some(load_id) = self.current_load.take() {
            if let Err(e) = self.output.stop() {
                tracing::warn!(load_id, error = %e, "Failed to release output");
            }
            tracing::debug!(load_id, "Transport released");
        }
    }

    pub fn start(&mut self) -> Result<()> {
        if self.current_load.is_none() {
            bail!("no source bound");
        }
        self.output.play()
    }

    pub fn pause(&mut self) -> Result<()> {
        if self.current_load.is_none() {
            bail!("no source bound");
        }
        self.output.pause()
    }

    pub fn seek(&mut self, position: f64) -> Result<()> {
        if self.current_load.is_none() {
            bail!("no source bound");
        }
        self.output.seek(position)
    }

    pub fn set_volume(&mut self, volume: f32) -> Result<()> {
        self.output.set_volume(volume)
    }

    pub fn interpret(&mut self, event: OutputEvent) -> TransportSignal {
        if self.current_load != Some(event.load_id) {
            tracing::trace!(load_id = event.load_id, "Dropping event for released load");
            return TransportSignal::Ignored;
        }

        match event.kind {
            OutputEventKind::Loaded { duration } => TransportSignal::Loaded { duration },
            OutputEventKind::Position { position, duration } => {
                TransportSignal::Progress { position, duration }
            }
            OutputEventKind::Ended => TransportSignal::Ended,
            OutputEventKind::Failed(OutputFailure::Access { status }) => {
                self.release();
                if self.expiry_retry_available {
                    self.expiry_retry_available = false;
                    tracing::warn!(?status, "Source refused, re-resolving once");
                    TransportSignal::RetryExpired
                } else {
                    tracing::warn!(?status, "Source refused again after re-resolving");
                    TransportSignal::Fail(FailureReason::new(
                        FailureKind::PlaybackExpired,
                        match status {
                            Some(code) => format!("stream refused (HTTP {})", code),
                            None => "stream refused".to_string(),
                        },
                    ))
                }
            }
            OutputEventKind::Failed(OutputFailure::Media(message)) => {
                self.release();
                TransportSignal::Fail(FailureReason::new(FailureKind::Unplayable, message))
            }
        }
    }
}
