//! Output for machines without a sound device
//!
//! Checks the resolved URL with a one-byte ranged request (which is enough to
//! notice an expired link), estimates the duration from the content length
//! and the track bitrate, then runs a one-second clock while playing.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::{CONTENT_RANGE, RANGE};
use reqwest::Client;
use tokio::task::JoinHandle;

use super::{AudioOutput, MediaSource, OutputEvent, OutputEventKind, OutputEventSender, OutputFailure};

const TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Default)]
struct Clock {
    load_id: Option<u64>,
    playing: bool,
    position: f64,
    duration: Option<f64>,
}

pub struct HeadlessOutput {
    client: Client,
    events: OutputEventSender,
    clock: Arc<Mutex<Clock>>,
    task: Option<JoinHandle<()>>,
}

impl HeadlessOutput {
    pub fn new(events: OutputEventSender) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .context("Failed to build HTTP client for headless output")?;

        Ok(Self {
            client,
            events,
            clock: Arc::new(Mutex::new(Clock::default())),
            task: None,
        })
    }

    fn with_clock<T>(&self, f: impl FnOnce(&mut Clock) -> T) -> T {
        let mut clock = match self.clock.lock() {
            Ok(clock) => clock,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut clock)
    }

    fn abort_task(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl AudioOutput for HeadlessOutput {
    fn load(&mut self, source: MediaSource) -> Result<()> {
        self.abort_task();
        self.with_clock(|clock| {
            *clock = Clock {
                load_id: Some(source.load_id),
                ..Clock::default()
            };
        });

        let client = self.client.clone();
        let events = self.events.clone();
        let clock = self.clock.clone();
        self.task = Some(tokio::spawn(async move {
            run_source(client, source, events, clock).await;
        }));
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        self.with_clock(|clock| clock.playing = true);
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        self.with_clock(|clock| clock.playing = false);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.abort_task();
        self.with_clock(|clock| *clock = Clock::default());
        Ok(())
    }

    fn seek(&mut self, position: f64) -> Result<()> {
        self.with_clock(|clock| clock.position = position.max(0.0));
        Ok(())
    }

    fn set_volume(&mut self, volume: f32) -> Result<()> {
        tracing::debug!(volume, "Headless output ignores volume");
        Ok(())
    }
}

impl Drop for HeadlessOutput {
    fn drop(&mut self) {
        self.abort_task();
    }
}

async fn run_source(
    client: Client,
    source: MediaSource,
    events: OutputEventSender,
    clock: Arc<Mutex<Clock>>,
) {
    let load_id = source.load_id;
    let send = |kind| {
        let _ = events.send(OutputEvent { load_id, kind });
    };

    let duration = match check_source(&client, &source).await {
        Ok(duration) => duration,
        Err(failure) => {
            send(OutputEventKind::Failed(failure));
            return;
        }
    };

    if let Ok(mut clock) = clock.lock() {
        clock.duration = duration;
    }
    send(OutputEventKind::Loaded { duration });

    let mut ticker = tokio::time::interval(TICK);
    ticker.tick().await;
    loop {
        ticker.tick().await;

        let update = {
            let Ok(mut clock) = clock.lock() else {
                return;
            };
            if clock.load_id != Some(load_id) {
                return;
            }
            if !clock.playing {
                continue;
            }
            clock.position += TICK.as_secs_f64();
            (clock.position, clock.duration)
        };

        match update {
            (position, Some(duration)) if position >= duration => {
                send(OutputEventKind::Position {
                    position: duration,
                    duration: Some(duration),
                });
                send(OutputEventKind::Ended);
                return;
            }
            (position, duration) => send(OutputEventKind::Position { position, duration }),
        }
    }
}

/// Check the URL is accepted and estimate its duration in seconds
async fn check_source(client: &Client, source: &MediaSource) -> Result<Option<f64>, OutputFailure> {
    let response = client
        .get(&source.url)
        .header(RANGE, "bytes=0-0")
        .send()
        .await
        .map_err(|e| OutputFailure::Media(format!("unreachable: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(OutputFailure::from_status(status.as_u16()));
    }

    let total_bytes = response
        .headers()
        .get(CONTENT_RANGE)
        .and_then(|value| value.to_str().ok())
        .and_then(total_from_content_range)
        .or_else(|| response.content_length().filter(|len| *len > 1));

    Ok(total_bytes.and_then(|bytes| estimate_duration(bytes, source.bitrate_kbps)))
}

/// `bytes 0-0/123456` -> 123456
fn total_from_content_range(value: &str) -> Option<u64> {
    value.rsplit('/').next()?.trim().parse().ok()
}

fn estimate_duration(bytes: u64, bitrate_kbps: u32) -> Option<f64> {
    if bitrate_kbps == 0 || bytes == 0 {
        return None;
    }
    Some(bytes as f64 * 8.0 / (bitrate_kbps as f64 * 1000.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{output_event_channel, OutputEventReceiver};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// 320 kbps, so every 40_000 bytes is one second
    const BITRATE: u32 = 320;

    async fn media_server(template: ResponseTemplate) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a.mp3"))
            .and(header("range", "bytes=0-0"))
            .respond_with(template)
            .mount(&server)
            .await;
        server
    }

    fn partial(total_bytes: u64) -> ResponseTemplate {
        ResponseTemplate::new(206)
            .insert_header("content-range", format!("bytes 0-0/{}", total_bytes))
            .set_body_bytes(vec![0u8])
    }

    fn source(server: &MockServer, load_id: u64) -> MediaSource {
        MediaSource {
            load_id,
            url: format!("{}/a.mp3", server.uri()),
            bitrate_kbps: BITRATE,
        }
    }

    async fn next_event(rx: &mut OutputEventReceiver) -> OutputEvent {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap()
    }

    fn drain(rx: &mut OutputEventReceiver) -> Vec<OutputEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn position(position: f64, duration: f64) -> OutputEventKind {
        OutputEventKind::Position {
            position,
            duration: Some(duration),
        }
    }

    #[test]
    fn parses_total_length_from_content_range() {
        assert_eq!(total_from_content_range("bytes 0-0/8000000"), Some(8_000_000));
        assert_eq!(total_from_content_range("bytes 0-0/*"), None);
    }

    #[test]
    fn estimates_duration_from_bitrate() {
        // 320 kbps for 200 seconds
        assert_eq!(estimate_duration(8_000_000, 320), Some(200.0));
        assert_eq!(estimate_duration(8_000_000, 0), None);
    }

    #[tokio::test]
    async fn refused_url_is_an_access_failure() {
        for status in [401u16, 403, 410] {
            let server = media_server(ResponseTemplate::new(status)).await;
            let (events, mut rx) = output_event_channel();
            let mut output = HeadlessOutput::new(events).unwrap();

            output.load(source(&server, 7)).unwrap();
            assert_eq!(
                next_event(&mut rx).await,
                OutputEvent {
                    load_id: 7,
                    kind: OutputEventKind::Failed(OutputFailure::Access {
                        status: Some(status)
                    }),
                }
            );
        }
    }

    #[tokio::test]
    async fn other_failures_are_media_failures() {
        for status in [404u16, 500] {
            let server = media_server(ResponseTemplate::new(status)).await;
            let (events, mut rx) = output_event_channel();
            let mut output = HeadlessOutput::new(events).unwrap();

            output.load(source(&server, 1)).unwrap();
            let event = next_event(&mut rx).await;
            assert!(
                matches!(event.kind, OutputEventKind::Failed(OutputFailure::Media(_))),
                "status {} gave {:?}",
                status,
                event
            );
        }

        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let (events, mut rx) = output_event_channel();
        let mut output = HeadlessOutput::new(events).unwrap();
        output
            .load(MediaSource {
                load_id: 2,
                url: format!("http://{}/a.mp3", addr),
                bitrate_kbps: BITRATE,
            })
            .unwrap();
        assert!(matches!(
            next_event(&mut rx).await.kind,
            OutputEventKind::Failed(OutputFailure::Media(_))
        ));
    }

    #[tokio::test]
    async fn duration_falls_back_to_content_length() {
        let server = media_server(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 80_000])).await;
        let (events, mut rx) = output_event_channel();
        let mut output = HeadlessOutput::new(events).unwrap();

        output.load(source(&server, 3)).unwrap();
        assert_eq!(
            next_event(&mut rx).await.kind,
            OutputEventKind::Loaded { duration: Some(2.0) }
        );
    }

    // The range request needs real sockets; the clock is frozen only after it answers.

    #[tokio::test]
    async fn clock_runs_only_while_playing_and_ends_at_duration() {
        let server = media_server(partial(160_000)).await;
        let (events, mut rx) = output_event_channel();
        let mut output = HeadlessOutput::new(events).unwrap();

        output.load(source(&server, 4)).unwrap();
        assert_eq!(
            next_event(&mut rx).await,
            OutputEvent {
                load_id: 4,
                kind: OutputEventKind::Loaded { duration: Some(4.0) },
            }
        );

        tokio::time::pause();
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(drain(&mut rx).is_empty());

        output.play().unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
        let kinds: Vec<OutputEventKind> = drain(&mut rx)
            .into_iter()
            .inspect(|event| assert_eq!(event.load_id, 4))
            .map(|event| event.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                position(1.0, 4.0),
                position(2.0, 4.0),
                position(3.0, 4.0),
                position(4.0, 4.0),
                OutputEventKind::Ended,
            ]
        );
    }

    #[tokio::test]
    async fn pause_holds_the_position() {
        let server = media_server(partial(4_000_000)).await;
        let (events, mut rx) = output_event_channel();
        let mut output = HeadlessOutput::new(events).unwrap();

        output.load(source(&server, 5)).unwrap();
        next_event(&mut rx).await;

        tokio::time::pause();
        output.play().unwrap();
        tokio::time::sleep(Duration::from_millis(2500)).await;
        output.pause().unwrap();
        let played = drain(&mut rx);
        assert_eq!(played.last().map(|e| &e.kind), Some(&position(2.0, 100.0)));

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(drain(&mut rx).is_empty());

        output.play().unwrap();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(drain(&mut rx).first().map(|e| &e.kind), Some(&position(3.0, 100.0)));
    }

    #[tokio::test]
    async fn stop_silences_the_clock() {
        let server = media_server(partial(4_000_000)).await;
        let (events, mut rx) = output_event_channel();
        let mut output = HeadlessOutput::new(events).unwrap();

        output.load(source(&server, 6)).unwrap();
        next_event(&mut rx).await;

        tokio::time::pause();
        output.play().unwrap();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!drain(&mut rx).is_empty());

        output.stop().unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn loading_a_new_source_silences_the_previous_one() {
        let server = media_server(partial(4_000_000)).await;
        let (events, mut rx) = output_event_channel();
        let mut output = HeadlessOutput::new(events).unwrap();

        output.load(source(&server, 1)).unwrap();
        next_event(&mut rx).await;
        output.play().unwrap();

        output.load(source(&server, 2)).unwrap();
        loop {
            let event = next_event(&mut rx).await;
            if event.load_id == 2 {
                assert_eq!(event.kind, OutputEventKind::Loaded { duration: Some(100.0) });
                break;
            }
        }

        tokio::time::pause();
        tokio::time::sleep(Duration::from_secs(3)).await;
        // a fresh load starts paused
        assert!(drain(&mut rx).is_empty());

        output.play().unwrap();
        tokio::time::sleep(Duration::from_secs(3)).await;
        let events = drain(&mut rx);
        assert!(!events.is_empty());
        assert!(events.iter().all(|event| event.load_id == 2));
    }
}
