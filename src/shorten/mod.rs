//! Optional URL shortener
//!
//! When an endpoint is configured, download links are offered through it.
//! Shortening is strictly best-effort: connection failures, non-success
//! statuses, malformed bodies, and upstream refusals all collapse into a
//! warning log and the original URL. Nothing here can fail an upload.

use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

/// Default shortener request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Wire shape of the shortening endpoint's reply.
#[derive(Debug, Deserialize)]
struct ShortenResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<ShortenData>,
}

#[derive(Debug, Deserialize)]
struct ShortenData {
    #[serde(default)]
    url: Option<String>,
}

/// Client for the shortening endpoint.
pub struct Shortener {
    endpoint: Option<Url>,
    client: reqwest::Client,
}

impl Shortener {
    /// Create a shortener; a `None` endpoint disables shortening.
    pub fn new(endpoint: Option<Url>) -> Self {
        Self::with_timeout(endpoint, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a shortener with a custom request timeout.
    pub fn with_timeout(endpoint: Option<Url>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("failed to build shortener HTTP client");
        Self { endpoint, client }
    }

    /// Whether an endpoint is configured.
    pub fn is_enabled(&self) -> bool {
        self.endpoint.is_some()
    }

    /// Shorten `url`, falling back to it unchanged on any failure.
    pub async fn shorten(&self, url: &str) -> String {
        let Some(endpoint) = &self.endpoint else {
            return url.to_string();
        };

        match self.request_short_url(endpoint, url).await {
            Ok(short) => {
                debug!(original = %url, short = %short, "shortened link");
                short
            }
            Err(reason) => {
                warn!(
                    url = %url,
                    reason = %reason,
                    "link shortener unavailable, using original URL"
                );
                url.to_string()
            }
        }
    }

    /// One shortening attempt. Failures collapse into a reason string; the
    /// caller only ever logs it.
    async fn request_short_url(&self, endpoint: &Url, url: &str) -> Result<String, String> {
        let response = self
            .client
            .post(endpoint.clone())
            .json(&serde_json::json!({ "url": url }))
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("unexpected status {status}"));
        }

        let body: ShortenResponse = response
            .json()
            .await
            .map_err(|e| format!("invalid response body: {e}"))?;

        if !body.success {
            return Err("endpoint reported failure".to_string());
        }
        body.data
            .and_then(|d| d.url)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| "response missing data.url".to_string())
    }
}
