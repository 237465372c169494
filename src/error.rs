//! Error types for jukebox-rs
//!
//! Typed errors for the pieces that callers branch on (resolution, catalog,
//! session transitions). Application plumbing uses `anyhow`.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Failure classification produced by the URL resolution pipeline
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// Caller error (missing track id, malformed arguments). Never retried.
    #[error("invalid resolve request: {0}")]
    Invalid(String),

    /// The service answered but has no playable URL. Never retried.
    #[error("no playable url: {0}")]
    NotFound(String),

    /// Network error, timeout or rate limiting. Eligible for one automatic retry.
    #[error("transient resolver failure: {0}")]
    Transient(String),
}

impl ResolveError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ResolveError::Transient(_))
    }
}

/// Catalog loading errors
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("catalog contains no tracks")]
    Empty,

    #[error("unknown source: {0}")]
    UnknownSource(String),
}

/// Rejected session intents. These never change session state.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("track index {index} out of range (catalog has {len} tracks)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("catalog is empty")]
    EmptyCatalog,

    #[error("cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: crate::model::TransportState,
    },

    #[error("seeking is not available while {0}")]
    SeekUnavailable(crate::model::TransportState),
}

/// Kind of terminal failure an errored session carries
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    Invalid,
    NotFound,
    Transient,
    PlaybackExpired,
    Unplayable,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::Invalid => "invalid",
            FailureKind::NotFound => "not found",
            FailureKind::Transient => "transient",
            FailureKind::PlaybackExpired => "playback expired",
            FailureKind::Unplayable => "unplayable",
        };
        f.write_str(name)
    }
}

/// Reason an errored session reports to the rendering surface
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FailureReason {
    pub kind: FailureKind,
    pub message: String,
}

impl FailureReason {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl From<ResolveError> for FailureReason {
    fn from(error: ResolveError) -> Self {
        match error {
            ResolveError::Invalid(msg) => FailureReason::new(FailureKind::Invalid, msg),
            ResolveError::NotFound(msg) => FailureReason::new(FailureKind::NotFound, msg),
            ResolveError::Transient(msg) => FailureReason::new(FailureKind::Transient, msg),
        }
    }
}
