//! Key event handling and session notifications for the terminal surface

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::error::SessionError;
use crate::model::TransportState;
use super::{AppController, Intent};

const SEEK_STEP_SECS: f64 = 5.0;
const VOLUME_STEP: f32 = 0.05;

impl AppController {
    pub async fn handle_key_event(&self, key: KeyEvent) -> Result<()> {
        if key.kind != KeyEventKind::Press {
            return Ok(());
        }
        let model = &self.model;

        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            model.set_should_quit(true).await;
            return Ok(());
        }

        // Handle error message first (blocks all other interactions)
        if model.has_error().await {
            if matches!(key.code, KeyCode::Esc | KeyCode::Enter) {
                model.clear_error().await;
            }
            return Ok(());
        }

        // Handle help popup
        if model.is_help_popup_open().await {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('h') | KeyCode::Char('H')) {
                model.hide_help_popup().await;
            }
            return Ok(());
        }

        let intent = match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                model.set_should_quit(true).await;
                None
            }
            KeyCode::Char('h') | KeyCode::Char('H') => {
                model.toggle_help_popup().await;
                None
            }
            KeyCode::Up | KeyCode::Char('k') => {
                model.move_cursor_up().await;
                None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                model.move_cursor_down().await;
                None
            }
            // Jump back to the active track
            KeyCode::Char('g') | KeyCode::Char('G') => {
                let index = self.session.snapshot().await.track_index;
                model.set_cursor(index).await;
                None
            }
            KeyCode::Enter => Some(Intent::SelectAndPlay(model.cursor().await)),
            KeyCode::Char(' ') => Some(Intent::PlayPause),
            KeyCode::Char('n') | KeyCode::Char('N') => Some(Intent::Next),
            KeyCode::Char('p') | KeyCode::Char('P') => Some(Intent::Previous),
            KeyCode::Left => Some(Intent::SeekBy(-SEEK_STEP_SECS)),
            KeyCode::Right => Some(Intent::SeekBy(SEEK_STEP_SECS)),
            KeyCode::Char('+') | KeyCode::Char('=') => {
                self.session.adjust_volume(VOLUME_STEP).await;
                None
            }
            KeyCode::Char('-') => {
                self.session.adjust_volume(-VOLUME_STEP).await;
                None
            }
            KeyCode::Char('r') | KeyCode::Char('R') => Some(Intent::Retry),
            KeyCode::Char('d') | KeyCode::Char('D') => {
                self.spawn_download();
                None
            }
            _ => None,
        };

        if let Some(intent) = intent {
            if let Err(e) = self.session.dispatch(intent).await {
                tracing::debug!(error = %e, ?intent, "Intent rejected");
                model.set_status(describe_rejection(&e)).await;
            }
        }
        Ok(())
    }

    /// Surface session failures in the error overlay
    pub fn start_notification_listener(&self) -> JoinHandle<()> {
        let mut updates = self.session.subscribe();
        let model = self.model.clone();
        tracing::info!("Starting session notification listener");

        tokio::spawn(async move {
            let mut last_error = None;
            loop {
                let snapshot = match updates.recv().await {
                    Ok(snapshot) => snapshot,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "Notification listener lagged");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };
                if model.should_quit().await {
                    break;
                }

                if snapshot.transport_state != TransportState::Errored {
                    last_error = None;
                    continue;
                }
                if let Some(reason) = snapshot.error {
                    if last_error.as_ref() != Some(&reason) {
                        let title = snapshot
                            .track
                            .as_ref()
                            .map(|t| t.display_name())
                            .unwrap_or_default();
                        model.set_error(format!("{}\n{}", title, reason)).await;
                        last_error = Some(reason);
                    }
                }
            }
            tracing::debug!("Session notification listener shutting down");
        })
    }
}

fn describe_rejection(error: &SessionError) -> String {
    match error {
        SessionError::SeekUnavailable(_) => "Nothing to seek yet".to_string(),
        SessionError::InvalidTransition { action: "retry", .. } => "Nothing to retry".to_string(),
        other => other.to_string(),
    }
}
