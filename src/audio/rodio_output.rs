//! Playback through the default sound device with rodio
//!
//! rodio's `OutputStream` is not `Send`, so a dedicated thread owns the stream
//! and the sink and is driven through a command channel. Media bodies are
//! fetched on that thread with its own single-threaded runtime.

use std::io::Cursor;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};

use super::{AudioOutput, MediaSource, OutputEvent, OutputEventKind, OutputEventSender, OutputFailure};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

enum Command {
    Load(MediaSource),
    Play,
    Pause,
    Stop,
    Seek(f64),
    Volume(f32),
}

pub struct RodioOutput {
    commands: mpsc::Sender<Command>,
}

impl RodioOutput {
    pub fn new(events: OutputEventSender, volume: f32) -> Result<Self> {
        let (commands, command_rx) = mpsc::channel();
        let (init_tx, init_rx) = mpsc::sync_channel::<Result<()>>(1);

        thread::Builder::new()
            .name("audio-output".to_string())
            .spawn(move || {
                let (stream, handle) = match OutputStream::try_default() {
                    Ok(pair) => pair,
                    Err(e) => {
                        let _ = init_tx.send(Err(anyhow!("no audio device: {}", e)));
                        return;
                    }
                };
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(e) => {
                        let _ = init_tx.send(Err(anyhow!("fetch runtime: {}", e)));
                        return;
                    }
                };
                let _ = init_tx.send(Ok(()));

                let mut worker = Worker {
                    _stream: stream,
                    handle,
                    runtime,
                    client: reqwest::Client::new(),
                    events,
                    sink: None,
                    load_id: None,
                    playing: false,
                    duration: None,
                    volume,
                };
                worker.run(command_rx);
            })
            .context("Failed to spawn audio thread")?;

        init_rx
            .recv()
            .context("Audio thread exited during startup")??;
        tracing::info!("Audio output initialized on default device");
        Ok(Self { commands })
    }

    fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| anyhow!("audio thread is gone"))
    }
}

impl AudioOutput for RodioOutput {
    fn load(&mut self, source: MediaSource) -> Result<()> {
        self.send(Command::Load(source))
    }

    fn play(&mut self) -> Result<()> {
        self.send(Command::Play)
    }

    fn pause(&mut self) -> Result<()> {
        self.send(Command::Pause)
    }

    fn stop(&mut self) -> Result<()> {
        self.send(Command::Stop)
    }

    fn seek(&mut self, position: f64) -> Result<()> {
        self.send(Command::Seek(position))
    }

    fn set_volume(&mut self, volume: f32) -> Result<()> {
        self.send(Command::Volume(volume))
    }
}

struct Worker {
    _stream: OutputStream,
    handle: OutputStreamHandle,
    runtime: tokio::runtime::Runtime,
    client: reqwest::Client,
    events: OutputEventSender,
    sink: Option<Sink>,
    load_id: Option<u64>,
    playing: bool,
    duration: Option<f64>,
    volume: f32,
}

impl Worker {
    fn run(&mut self, commands: mpsc::Receiver<Command>) {
        loop {
            match commands.recv_timeout(POLL_INTERVAL) {
                Ok(command) => self.handle(command),
                Err(RecvTimeoutError::Timeout) => self.poll(),
                Err(RecvTimeoutError::Disconnected) => {
                    tracing::debug!("Audio thread shutting down");
                    self.clear();
                    return;
                }
            }
        }
    }

    fn emit(&self, load_id: u64, kind: OutputEventKind) {
        let _ = self.events.send(OutputEvent { load_id, kind });
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Load(source) => self.load(source),
            Command::Play => {
                if let Some(sink) = &self.sink {
                    sink.play();
                    self.playing = true;
                }
            }
            Command::Pause => {
                if let Some(sink) = &self.sink {
                    sink.pause();
                    self.playing = false;
                }
            }
            Command::Stop => self.clear(),
            Command::Seek(position) => {
                if let Some(sink) = &self.sink {
                    if let Err(e) = sink.try_seek(Duration::from_secs_f64(position.max(0.0))) {
                        tracing::warn!(error = %e, "Seek failed");
                    }
                }
            }
            Command::Volume(volume) => {
                self.volume = volume;
                if let Some(sink) = &self.sink {
                    sink.set_volume(volume);
                }
            }
        }
    }

    fn clear(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
        self.load_id = None;
        self.playing = false;
        self.duration = None;
    }

    fn load(&mut self, source: MediaSource) {
        self.clear();
        let load_id = source.load_id;

        let bytes = match self.runtime.block_on(fetch(&self.client, &source.url)) {
            Ok(bytes) => bytes,
            Err(failure) => {
                self.emit(load_id, OutputEventKind::Failed(failure));
                return;
            }
        };

        let decoder = match Decoder::new(Cursor::new(bytes)) {
            Ok(decoder) => decoder,
            Err(e) => {
                self.emit(
                    load_id,
                    OutputEventKind::Failed(OutputFailure::Media(format!("decode: {}", e))),
                );
                return;
            }
        };
        let duration = decoder.total_duration().map(|d| d.as_secs_f64());

        let sink = match Sink::try_new(&self.handle) {
            Ok(sink) => sink,
            Err(e) => {
                self.emit(
                    load_id,
                    OutputEventKind::Failed(OutputFailure::Media(format!("sink: {}", e))),
                );
                return;
            }
        };
        sink.pause();
        sink.set_volume(self.volume);
        sink.append(decoder);

        self.sink = Some(sink);
        self.load_id = Some(load_id);
        self.duration = duration;
        self.emit(load_id, OutputEventKind::Loaded { duration });
    }

    fn poll(&mut self) {
        let (Some(load_id), Some(sink)) = (self.load_id, &self.sink) else {
            return;
        };
        if !self.playing {
            return;
        }
        if sink.empty() {
            self.emit(load_id, OutputEventKind::Ended);
            self.clear();
            return;
        }
        self.emit(
            load_id,
            OutputEventKind::Position {
                position: sink.get_pos().as_secs_f64(),
                duration: self.duration,
            },
        );
    }
}

async fn fetch(client: &reqwest::Client, url: &str) -> Result<Vec<u8>, OutputFailure> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| OutputFailure::Media(format!("unreachable: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(OutputFailure::from_status(status.as_u16()));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| OutputFailure::Media(format!("download interrupted: {}", e)))?;
    if bytes.is_empty() {
        return Err(OutputFailure::Media("empty response body".to_string()));
    }
    Ok(bytes.to_vec())
}
