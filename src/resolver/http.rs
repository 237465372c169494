//! HTTP client for the music lookup service

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::error::ResolveError;
use super::{ResolveRequest, Resolver};

const USER_AGENT: &str = concat!("jukebox-rs/", env!("CARGO_PKG_VERSION"));
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct UrlResponse {
    #[serde(default)]
    url: Option<String>,
}

/// Resolves URLs with `GET {endpoint}?trackId=..&source=..&br=..`
#[derive(Clone)]
pub struct HttpResolver {
    client: Client,
    endpoint: String,
}

impl HttpResolver {
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .context("Failed to build HTTP client for resolver")?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl Resolver for HttpResolver {
    async fn resolve(&self, request: &ResolveRequest) -> Result<String, ResolveError> {
        crate::log_resolve_request!(
            request.track_id,
            source = %request.source,
            bitrate = request.bitrate
        );

        let result = self.fetch(request).await;
        crate::log_resolve_result!(request.track_id, result);
        result
    }
}

impl HttpResolver {
    async fn fetch(&self, request: &ResolveRequest) -> Result<String, ResolveError> {
        let bitrate = request.bitrate.to_string();
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("trackId", request.track_id.as_str()),
                ("source", request.source.as_str()),
                ("br", bitrate.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ResolveError::Transient(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(status));
        }

        let body: UrlResponse = response.json().await.map_err(|e| {
            if e.is_decode() {
                ResolveError::NotFound(format!("unreadable response: {}", e))
            } else {
                ResolveError::Transient(format!("response interrupted: {}", e))
            }
        })?;

        match body.url {
            Some(url) if !url.trim().is_empty() => Ok(url),
            _ => Err(ResolveError::NotFound("response has no url".to_string())),
        }
    }
}

/// Map a non-success status onto the failure taxonomy
pub(crate) fn classify_status(status: StatusCode) -> ResolveError {
    let message = format!("HTTP {}", status);
    match status.as_u16() {
        400 | 422 => ResolveError::Invalid(message),
        404 | 410 => ResolveError::NotFound(message),
        408 | 425 | 429 => ResolveError::Transient(message),
        code if code >= 500 => ResolveError::Transient(message),
        _ => ResolveError::NotFound(message),
    }
}
