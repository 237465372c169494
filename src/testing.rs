//! Test doubles for the resolver, the audio output and the media session

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use crate::audio::{AudioOutput, MediaSource};
use crate::error::ResolveError;
use crate::media_session::MediaSessionSink;
use crate::model::{SessionSnapshot, Track, TransportState};
use crate::resolver::{ResolveRequest, Resolver};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

type Scripted = (Duration, Result<String, ResolveError>);

/// Resolver answering from per-track scripts. Unscripted calls are `NotFound`.
#[derive(Default)]
pub struct ScriptedResolver {
    scripts: Mutex<HashMap<String, VecDeque<Scripted>>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl ScriptedResolver {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, track_id: &str, delay: Duration, result: Result<String, ResolveError>) {
        lock(&self.scripts)
            .entry(track_id.to_string())
            .or_default()
            .push_back((delay, result));
    }

    pub fn push_ok(&self, track_id: &str, url: &str) {
        self.push(track_id, Duration::ZERO, Ok(url.to_string()));
    }

    pub fn push_ok_after(&self, track_id: &str, url: &str, delay: Duration) {
        self.push(track_id, delay, Ok(url.to_string()));
    }

    pub fn push_err(&self, track_id: &str, error: ResolveError) {
        self.push(track_id, Duration::ZERO, Err(error));
    }

    pub fn push_err_after(&self, track_id: &str, error: ResolveError, delay: Duration) {
        self.push(track_id, delay, Err(error));
    }

    pub fn calls_for(&self, track_id: &str) -> usize {
        lock(&self.calls).get(track_id).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        lock(&self.calls).values().sum()
    }
}

#[async_trait]
impl Resolver for ScriptedResolver {
    async fn resolve(&self, request: &ResolveRequest) -> Result<String, ResolveError> {
        *lock(&self.calls).entry(request.track_id.clone()).or_default() += 1;
        let next = lock(&self.scripts)
            .get_mut(&request.track_id)
            .and_then(VecDeque::pop_front);

        let (delay, result) = next.unwrap_or_else(|| {
            (
                Duration::ZERO,
                Err(ResolveError::NotFound(format!("no script for {}", request.track_id))),
            )
        });
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        result
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum OutputCall {
    Load { load_id: u64, url: String },
    Play,
    Pause,
    Stop,
    Seek(f64),
    Volume(f32),
}

/// Output that only records the commands it receives
#[derive(Clone, Default)]
pub struct RecordingOutput {
    calls: Arc<Mutex<Vec<OutputCall>>>,
}

impl RecordingOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<OutputCall> {
        lock(&self.calls).clone()
    }

    pub fn loads(&self) -> Vec<(u64, String)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                OutputCall::Load { load_id, url } => Some((load_id, url)),
                _ => None,
            })
            .collect()
    }

    pub fn last_load_id(&self) -> Option<u64> {
        self.loads().last().map(|(load_id, _)| *load_id)
    }

    fn record(&self, call: OutputCall) -> Result<()> {
        lock(&self.calls).push(call);
        Ok(())
    }
}

impl AudioOutput for RecordingOutput {
    fn load(&mut self, source: MediaSource) -> Result<()> {
        self.record(OutputCall::Load {
            load_id: source.load_id,
            url: source.url,
        })
    }

    fn play(&mut self) -> Result<()> {
        self.record(OutputCall::Play)
    }

    fn pause(&mut self) -> Result<()> {
        self.record(OutputCall::Pause)
    }

    fn stop(&mut self) -> Result<()> {
        self.record(OutputCall::Stop)
    }

    fn seek(&mut self, position: f64) -> Result<()> {
        self.record(OutputCall::Seek(position))
    }

    fn set_volume(&mut self, volume: f32) -> Result<()> {
        self.record(OutputCall::Volume(volume))
    }
}

/// Media session sink remembering what was published
#[derive(Clone, Default)]
pub struct RecordingMediaSink {
    titles: Arc<Mutex<Vec<String>>>,
    states: Arc<Mutex<Vec<TransportState>>>,
}

impl RecordingMediaSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn titles(&self) -> Vec<String> {
        lock(&self.titles).clone()
    }

    pub fn states(&self) -> Vec<TransportState> {
        lock(&self.states).clone()
    }
}

impl MediaSessionSink for RecordingMediaSink {
    fn set_metadata(&mut self, track: &Track) {
        lock(&self.titles).push(track.title.clone());
    }

    fn set_playback(&mut self, snapshot: &SessionSnapshot) {
        lock(&self.states).push(snapshot.transport_state);
    }
}
