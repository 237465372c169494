//! Saving the active track to disk

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use futures::StreamExt;
use tokio::io::AsyncWriteExt;

use crate::model::Track;
use crate::resolver::ResolveRequest;
use super::{AppController, SessionController};

/// `"<artist> - <title>.mp3"` with characters that are unsafe in file names replaced
pub fn download_file_name(track: &Track) -> String {
    let name: String = format!("{} - {}", track.artist, track.title)
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    format!("{}.mp3", name.trim().trim_matches('.'))
}

impl SessionController {
    /// Download the active track into `dir`, returning the written path.
    ///
    /// Reuses the bound URL when there is one; otherwise resolves on the side
    /// without touching the session.
    pub async fn download_current(&self, dir: &Path) -> Result<PathBuf> {
        let (track, url) = {
            let core = self.core.lock().await;
            (
                self.catalog.get(core.session.track_index()).cloned(),
                core.session.resolved_url().map(str::to_string),
            )
        };
        let track = track.context("No active track")?;

        let url = match url {
            Some(url) => url,
            None => {
                tracing::debug!(track_id = %track.id, "Resolving url for download");
                self.pipeline
                    .resolve(&ResolveRequest::for_track(&track))
                    .await
                    .map_err(|e| anyhow!("Could not resolve {}: {}", track.display_name(), e))?
            }
        };

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .context("Download request failed")?
            .error_for_status()
            .context("Download refused")?;

        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        let path = dir.join(download_file_name(&track));
        let mut file = tokio::fs::File::create(&path)
            .await
            .with_context(|| format!("Failed to create {}", path.display()))?;

        let mut bytes_written = 0u64;
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.context("Download interrupted")?;
            file.write_all(&chunk).await.context("Failed to write download")?;
            bytes_written += chunk.len() as u64;
        }
        file.flush().await.context("Failed to write download")?;

        tracing::info!(path = %path.display(), bytes_written, "Track downloaded");
        Ok(path)
    }
}

impl AppController {
    /// Runs in the background; the result lands in the status line or error overlay
    pub fn spawn_download(&self) {
        let controller = self.clone();
        tokio::spawn(async move {
            controller.model.set_status("Downloading...".to_string()).await;
            match controller.session.download_current(&controller.download_dir).await {
                Ok(path) => {
                    controller
                        .model
                        .set_status(format!("Saved {}", path.display()))
                        .await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Download failed");
                    controller.model.set_status(String::new()).await;
                    controller.model.set_error(Self::format_error(&e)).await;
                }
            }
        });
    }
}
