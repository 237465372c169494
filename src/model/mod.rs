//! Model module - Application state and data types
//!
//! - `track`: Catalog entries and resolver source selection
//! - `catalog`: The fixed playlist loaded at startup
//! - `session`: Playback session state machine
//! - `playback`: Snapshot payload published to rendering surfaces
//! - `types` / `app_model`: Terminal UI state

mod track;
mod catalog;
mod session;
mod playback;
mod types;
mod app_model;

pub use track::{Source, Track};

pub use catalog::Catalog;

pub use session::{PlayPause, PlaybackSession, ResolveApplied, ResolveTicket, TransportState};

pub use playback::SessionSnapshot;

pub use types::UiState;

pub use app_model::AppModel;
