//! URL resolution: exchanging a track identifier for a short-lived playable URL
//!
//! - `http`: `Resolver` backed by the music lookup service over HTTP
//! - `pipeline`: argument validation, bounded wait and retry jitter around a resolver

mod http;
mod pipeline;

use async_trait::async_trait;

use crate::error::ResolveError;
use crate::model::{Source, Track};

pub use http::HttpResolver;
pub use pipeline::{ResolutionPipeline, RetryPolicy, DEFAULT_RESOLVE_TIMEOUT};

/// Parameters of a single resolution call
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolveRequest {
    pub track_id: String,
    pub source: Source,
    pub bitrate: u32,
}

impl ResolveRequest {
    pub fn for_track(track: &Track) -> Self {
        Self {
            track_id: track.id.clone(),
            source: track.source,
            bitrate: track.default_bitrate,
        }
    }

    /// Caller errors are classified before anything goes on the wire
    pub fn validate(&self) -> Result<(), ResolveError> {
        if self.track_id.trim().is_empty() {
            return Err(ResolveError::Invalid("missing trackId".to_string()));
        }
        if self.bitrate == 0 {
            return Err(ResolveError::Invalid("bitrate must be positive".to_string()));
        }
        Ok(())
    }
}

/// External lookup service. One call, no retry at this layer.
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(&self, request: &ResolveRequest) -> Result<String, ResolveError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_takes_track_parameters() {
        let track = Track::new("77", "T", "A").with_source(Source::Kugou);
        let request = ResolveRequest::for_track(&track);
        assert_eq!(request.track_id, "77");
        assert_eq!(request.source, Source::Kugou);
        assert_eq!(request.bitrate, 320);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn missing_track_id_is_invalid() {
        let request = ResolveRequest {
            track_id: "  ".into(),
            source: Source::Netease,
            bitrate: 320,
        };
        assert!(matches!(request.validate(), Err(ResolveError::Invalid(_))));

        let request = ResolveRequest {
            track_id: "1".into(),
            source: Source::Netease,
            bitrate: 0,
        };
        assert!(matches!(request.validate(), Err(ResolveError::Invalid(_))));
    }
}
