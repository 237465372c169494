//! Bounded-wait wrapper and retry jitter around a `Resolver`

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use crate::error::ResolveError;
use super::{ResolveRequest, Resolver};

pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_secs(10);

/// Randomized delay before the single automatic retry
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(3000),
        }
    }
}

impl RetryPolicy {
    /// Uniform in `[min_delay, max_delay)`
    pub fn jitter(&self) -> Duration {
        let min = self.min_delay.as_millis() as u64;
        let max = self.max_delay.as_millis() as u64;
        if max <= min {
            return self.min_delay;
        }
        Duration::from_millis(rand::rng().random_range(min..max))
    }
}

pub struct ResolutionPipeline {
    resolver: Arc<dyn Resolver>,
    timeout: Duration,
    retry: RetryPolicy,
}

impl ResolutionPipeline {
    pub fn new(resolver: Arc<dyn Resolver>, timeout: Duration, retry: RetryPolicy) -> Self {
        Self {
            resolver,
            timeout,
            retry,
        }
    }

    /// One resolution attempt
    pub async fn resolve(&self, request: &ResolveRequest) -> Result<String, ResolveError> {
        request.validate()?;

        let url = match tokio::time::timeout(self.timeout, self.resolver.resolve(request)).await {
            Ok(result) => result?,
            Err(_) => {
                tracing::warn!(
                    track_id = %request.track_id,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Resolver did not answer in time"
                );
                return Err(ResolveError::Transient(format!(
                    "no answer within {}s",
                    self.timeout.as_secs_f32()
                )));
            }
        };

        let url = url.trim();
        if url.is_empty() {
            return Err(ResolveError::NotFound("empty url".to_string()));
        }
        Ok(url.to_string())
    }

    pub fn retry_delay(&self) -> Duration {
        self.retry.jitter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Source;
    use crate::testing::ScriptedResolver;

    fn request(id: &str) -> ResolveRequest {
        ResolveRequest {
            track_id: id.into(),
            source: Source::Netease,
            bitrate: 320,
        }
    }

    #[test]
    fn jitter_stays_in_half_open_range() {
        let policy = RetryPolicy::default();
        for _ in 0..500 {
            let delay = policy.jitter();
            assert!(delay >= Duration::from_millis(1000));
            assert!(delay < Duration::from_millis(3000));
        }

        let fixed = RetryPolicy {
            min_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(5),
        };
        assert_eq!(fixed.jitter(), Duration::from_millis(5));
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_requests_never_reach_the_resolver() {
        let resolver = Arc::new(ScriptedResolver::new());
        let pipeline =
            ResolutionPipeline::new(resolver.clone(), DEFAULT_RESOLVE_TIMEOUT, RetryPolicy::default());

        let result = pipeline.resolve(&request("")).await;
        assert!(matches!(result, Err(ResolveError::Invalid(_))));
        assert_eq!(resolver.calls_for(""), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_resolver_times_out_as_transient() {
        let resolver = Arc::new(ScriptedResolver::new());
        resolver.push_ok_after("1", "late.mp3", Duration::from_secs(30));
        let pipeline =
            ResolutionPipeline::new(resolver.clone(), DEFAULT_RESOLVE_TIMEOUT, RetryPolicy::default());

        let result = pipeline.resolve(&request("1")).await;
        assert!(matches!(result, Err(ResolveError::Transient(_))));
        assert_eq!(resolver.calls_for("1"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn blank_url_is_not_found() {
        let resolver = Arc::new(ScriptedResolver::new());
        resolver.push_ok("1", "   ");
        let pipeline =
            ResolutionPipeline::new(resolver, DEFAULT_RESOLVE_TIMEOUT, RetryPolicy::default());

        assert!(matches!(
            pipeline.resolve(&request("1")).await,
            Err(ResolveError::NotFound(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn passes_through_successful_urls() {
        let resolver = Arc::new(ScriptedResolver::new());
        resolver.push_ok_after("1", "https://cdn.example/a.mp3", Duration::from_millis(50));
        let pipeline =
            ResolutionPipeline::new(resolver, DEFAULT_RESOLVE_TIMEOUT, RetryPolicy::default());

        assert_eq!(
            pipeline.resolve(&request("1")).await.unwrap(),
            "https://cdn.example/a.mp3"
        );
    }
}
