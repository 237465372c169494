//! Catalog entries and resolver backend selection

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

pub const PLACEHOLDER_COVER: &str = "icons/icon-192x192.png";
pub const DEFAULT_BITRATE_KBPS: u32 = 320;

/// Upstream backend the lookup service should query for a track
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    #[default]
    Netease,
    Tencent,
    Kugou,
    Kuwo,
    Migu,
    Joox,
    Ximalaya,
    Spotify,
    Ytmusic,
    Qobuz,
    Deezer,
    Tidal,
    Apple,
}

impl Source {
    pub const ALL: [Source; 13] = [
        Source::Netease,
        Source::Tencent,
        Source::Kugou,
        Source::Kuwo,
        Source::Migu,
        Source::Joox,
        Source::Ximalaya,
        Source::Spotify,
        Source::Ytmusic,
        Source::Qobuz,
        Source::Deezer,
        Source::Tidal,
        Source::Apple,
    ];

    /// Wire name used in resolver query strings
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Netease => "netease",
            Source::Tencent => "tencent",
            Source::Kugou => "kugou",
            Source::Kuwo => "kuwo",
            Source::Migu => "migu",
            Source::Joox => "joox",
            Source::Ximalaya => "ximalaya",
            Source::Spotify => "spotify",
            Source::Ytmusic => "ytmusic",
            Source::Qobuz => "qobuz",
            Source::Deezer => "deezer",
            Source::Tidal => "tidal",
            Source::Apple => "apple",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Source::ALL
            .into_iter()
            .find(|source| source.as_str() == wanted)
            .ok_or_else(|| CatalogError::UnknownSource(s.to_string()))
    }
}

/// Immutable catalog entry
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub cover: String,
    pub source: Source,
    pub default_bitrate: u32,
}

impl Track {
    pub fn new(id: impl Into<String>, title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist: artist.into(),
            cover: PLACEHOLDER_COVER.to_string(),
            source: Source::default(),
            default_bitrate: DEFAULT_BITRATE_KBPS,
        }
    }

    pub fn with_source(mut self, source: Source) -> Self {
        self.source = source;
        self
    }

    /// "Artist - Title", used for log lines and download file names
    pub fn display_name(&self) -> String {
        format!("{} - {}", self.artist, self.title)
    }
}
