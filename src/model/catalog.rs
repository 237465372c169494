//! Read-only track catalog loaded from the preprocessed music data file

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::CatalogError;
use super::track::{Source, Track, DEFAULT_BITRATE_KBPS, PLACEHOLDER_COVER};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogFile {
    #[serde(default)]
    processed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    songs: Vec<SongRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SongRecord {
    #[serde(default, alias = "id")]
    track_id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    artist: String,
    #[serde(default)]
    cover: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default, alias = "br")]
    bitrate: Option<u32>,
}

impl SongRecord {
    fn into_track(self) -> Result<Track, CatalogError> {
        let source = match self.source.as_deref().map(str::trim) {
            None | Some("") => Source::default(),
            Some(name) => name.parse()?,
        };

        Ok(Track {
            id: self.track_id.trim().to_string(),
            title: non_empty_or(self.title, "Unknown title"),
            artist: non_empty_or(self.artist, "Unknown artist"),
            cover: self
                .cover
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| PLACEHOLDER_COVER.to_string()),
            source,
            default_bitrate: self.bitrate.filter(|b| *b > 0).unwrap_or(DEFAULT_BITRATE_KBPS),
        })
    }
}

fn non_empty_or(value: String, fallback: &str) -> String {
    if value.trim().is_empty() {
        fallback.to_string()
    } else {
        value
    }
}

/// Fixed playlist the session indexes into. Never empty.
#[derive(Clone, Debug)]
pub struct Catalog {
    tracks: Vec<Track>,
    processed_at: Option<DateTime<Utc>>,
}

impl Catalog {
    pub fn from_tracks(tracks: Vec<Track>) -> Result<Self, CatalogError> {
        if tracks.is_empty() {
            return Err(CatalogError::Empty);
        }
        Ok(Self {
            tracks,
            processed_at: None,
        })
    }

    pub fn from_json(content: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(content)?;
        let tracks = file
            .songs
            .into_iter()
            .map(SongRecord::into_track)
            .collect::<Result<Vec<_>, _>>()?;

        let mut catalog = Self::from_tracks(tracks)?;
        catalog.processed_at = file.processed_at;
        Ok(catalog)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::from_json(&content)?;

        let missing_ids = catalog.tracks.iter().filter(|t| t.id.is_empty()).count();
        if missing_ids > 0 {
            tracing::warn!(missing_ids, "Catalog has tracks without a trackId; they cannot be resolved");
        }
        if catalog.is_stale(Utc::now()) {
            tracing::warn!(
                processed_at = ?catalog.processed_at,
                "Catalog was not processed today, entries may be outdated"
            );
        }

        tracing::info!(path = %path.display(), tracks = catalog.len(), "Catalog loaded");
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Stale when processed on an earlier calendar day (or never stamped)
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        match self.processed_at {
            Some(at) => at.date_naive() < now.date_naive(),
            None => true,
        }
    }
}

pub(crate) fn wrap_index(index: i64, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    index.rem_euclid(len as i64) as usize
}
