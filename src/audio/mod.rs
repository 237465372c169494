//! Audio transport: the output primitive and the adapter that binds it to the session
//!
//! - `transport`: `TransportAdapter`, the session's exclusive handle on the output
//! - `headless`: device-free output that checks the URL and runs a clock
//! - `rodio_output`: real playback through the default sound device (feature `rodio-output`)

mod transport;
mod headless;
#[cfg(feature = "rodio-output")]
mod rodio_output;

use anyhow::Result;
use tokio::sync::mpsc;

pub use headless::HeadlessOutput;
#[cfg(feature = "rodio-output")]
pub use rodio_output::RodioOutput;
pub use transport::{TransportAdapter, TransportSignal};

/// What an output is asked to load
#[derive(Clone, Debug, PartialEq)]
pub struct MediaSource {
    pub load_id: u64,
    pub url: String,
    pub bitrate_kbps: u32,
}

/// Why an output could not play its source
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutputFailure {
    /// The URL was refused (expired or revoked capability)
    Access { status: Option<u16> },
    /// Unreachable host, empty body, undecodable stream
    Media(String),
}

impl OutputFailure {
    /// Classify a non-success HTTP status seen while fetching media
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 | 410 => OutputFailure::Access {
                status: Some(status),
            },
            other => OutputFailure::Media(format!("HTTP {}", other)),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum OutputEventKind {
    Loaded { duration: Option<f64> },
    Position { position: f64, duration: Option<f64> },
    Ended,
    Failed(OutputFailure),
}

/// Asynchronous report from an output, tagged with the load it belongs to
#[derive(Clone, Debug, PartialEq)]
pub struct OutputEvent {
    pub load_id: u64,
    pub kind: OutputEventKind,
}

pub type OutputEventSender = mpsc::UnboundedSender<OutputEvent>;
pub type OutputEventReceiver = mpsc::UnboundedReceiver<OutputEvent>;

pub fn output_event_channel() -> (OutputEventSender, OutputEventReceiver) {
    mpsc::unbounded_channel()
}

/// A single audio output. Commands return immediately; progress, end of
/// media and failures are reported through the output's event channel.
pub trait AudioOutput: Send {
    /// Replace the current source. Output stays paused until `play`.
    fn load(&mut self, source: MediaSource) -> Result<()>;
    fn play(&mut self) -> Result<()>;
    fn pause(&mut self) -> Result<()>;
    /// Release the current source
    fn stop(&mut self) -> Result<()>;
    fn seek(&mut self, position: f64) -> Result<()>;
    fn set_volume(&mut self, volume: f32) -> Result<()>;
}
