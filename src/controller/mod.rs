//! Controller module - Session logic and event handling
//!
//! `SessionController` owns the playback session, the transport adapter and
//! the optional media-session sink behind one lock, and publishes a snapshot
//! after every mutation. `AppController` is the terminal surface on top of it.
//! Organized into submodules by responsibility:
//!
//! - `playback`: Public intents (select, play/pause, next, seek, volume, ...)
//! - `resolution`: Resolution tasks and applying their results
//! - `player_events`: Audio output event listener
//! - `input`: Key event handling and the notification listener for the UI
//! - `download`: Saving the active track to disk

mod playback;
mod resolution;
mod player_events;
mod input;
mod download;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{broadcast, Mutex};

use crate::audio::{AudioOutput, TransportAdapter};
use crate::media_session::MediaSessionSink;
use crate::model::{AppModel, Catalog, PlaybackSession, ResolveTicket, SessionSnapshot};
use crate::resolver::ResolutionPipeline;

pub use playback::Intent;

const NOTIFICATION_CAPACITY: usize = 64;

/// Everything that must change atomically with a session transition
pub(crate) struct ControllerCore {
    pub(crate) session: PlaybackSession,
    pub(crate) transport: TransportAdapter,
    pub(crate) media: Option<Box<dyn MediaSessionSink>>,
}

#[derive(Clone)]
pub struct SessionController {
    pub(crate) core: Arc<Mutex<ControllerCore>>,
    pub(crate) pipeline: Arc<ResolutionPipeline>,
    pub(crate) catalog: Arc<Catalog>,
    notifier: broadcast::Sender<SessionSnapshot>,
    http: reqwest::Client,
}

impl SessionController {
    pub fn new(
        catalog: Arc<Catalog>,
        pipeline: Arc<ResolutionPipeline>,
        output: Box<dyn AudioOutput>,
        volume: f32,
    ) -> Result<Self> {
        let session = PlaybackSession::new(catalog.len(), volume)?;
        let mut transport = TransportAdapter::new(output);
        transport
            .set_volume(session.volume())
            .context("Failed to apply initial volume")?;

        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .context("Failed to build HTTP client for downloads")?;

        let (notifier, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        Ok(Self {
            core: Arc::new(Mutex::new(ControllerCore {
                session,
                transport,
                media: None,
            })),
            pipeline,
            catalog,
            notifier,
            http,
        })
    }

    pub async fn attach_media_session(&self, mut sink: Box<dyn MediaSessionSink>) {
        let mut core = self.core.lock().await;
        if let Some(track) = self.catalog.get(core.session.track_index()) {
            sink.set_metadata(track);
        }
        sink.set_playback(&SessionSnapshot::capture(&core.session, &self.catalog));
        core.media = Some(sink);
        tracing::info!("Media session attached");
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionSnapshot> {
        self.notifier.subscribe()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let core = self.core.lock().await;
        SessionSnapshot::capture(&core.session, &self.catalog)
    }

    pub async fn resolved_url(&self) -> Option<String> {
        self.core
            .lock()
            .await
            .session
            .resolved_url()
            .map(str::to_string)
    }

    /// Send the current state to subscribers and the media session
    pub(crate) fn publish(&self, core: &mut ControllerCore) {
        let snapshot = SessionSnapshot::capture(&core.session, &self.catalog);
        if let Some(media) = core.media.as_mut() {
            media.set_playback(&snapshot);
        }
        // No subscribers is fine
        let _ = self.notifier.send(snapshot);
    }

    /// Side effects of entering `Resolving`: release the bound source, mirror
    /// the new track, notify, and hand the ticket to a resolution task
    pub(crate) fn start_resolution(
        &self,
        core: &mut ControllerCore,
        ticket: ResolveTicket,
        fresh_load: bool,
        delay: Option<Duration>,
    ) {
        core.transport.release();
        if fresh_load {
            core.transport.begin_track_load();
        }

        if let (Some(media), Some(track)) = (core.media.as_mut(), self.catalog.get(ticket.track_index)) {
            media.set_metadata(track);
        }

        tracing::debug!(
            token = ticket.token,
            track_index = ticket.track_index,
            fresh_load,
            "Resolution started"
        );
        self.publish(core);

        let controller = self.clone();
        tokio::spawn(async move {
            controller.run_resolution(ticket, delay).await;
        });
    }
}

/// Terminal surface: UI state plus the session it drives
#[derive(Clone)]
pub struct AppController {
    pub(crate) session: SessionController,
    pub(crate) model: Arc<AppModel>,
    download_dir: PathBuf,
}

impl AppController {
    pub fn new(session: SessionController, model: Arc<AppModel>, download_dir: PathBuf) -> Self {
        Self {
            session,
            model,
            download_dir,
        }
    }

    pub fn session(&self) -> &SessionController {
        &self.session
    }

    pub(crate) fn format_error(error: &anyhow::Error) -> String {
        format!("Error: {:#}", error)
    }
}
