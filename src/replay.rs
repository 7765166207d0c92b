//! Replay of captured webhooks to arbitrary targets

use crate::{CaptureError, EventStore, Result};
use reqwest::Client;
use reqwest::header::{HeaderName, HeaderValue};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Default outbound round-trip timeout
pub const DEFAULT_REPLAY_TIMEOUT: Duration = Duration::from_secs(90);

/// Headers the client recomputes for the new target instead of copying
const RECOMPUTED_HEADERS: [&str; 2] = ["host", "content-length"];

/// Resends captured webhooks to a target URL.
///
/// Owns one pooled HTTP client reused across every replay, so a caller
/// issuing many replays never opens a fresh client (and its sockets) per
/// call. Clones share the client and the store.
#[derive(Debug, Clone)]
pub struct ReplayClient {
    store: EventStore,
    http_client: Client,
}

impl ReplayClient {
    /// Create a replay client over the given store
    pub fn new(store: EventStore) -> Self {
        Self::with_timeout(store, DEFAULT_REPLAY_TIMEOUT)
    }

    /// Create a replay client with a custom round-trip timeout
    pub fn with_timeout(store: EventStore, timeout: Duration) -> Self {
        let http_client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("hookline/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("Failed to create HTTP client");

        Self { store, http_client }
    }

    /// Resend a captured webhook's method, headers and body to `target_url`.
    ///
    /// The request is rebuilt verbatim from the captured event; no signature
    /// is recomputed (one already among the stored headers is forwarded
    /// as-is). A target response with status >= 400 is a [`CaptureError::ReplayFailed`];
    /// transport failures surface as [`CaptureError::Network`].
    pub async fn replay(&self, id: &str, target_url: &str) -> Result<()> {
        let event = self
            .store
            .find_by_id(id)
            .ok_or_else(|| CaptureError::EventNotFound(id.to_string()))?;

        let url = Url::parse(target_url)?;
        let method = reqwest::Method::from_bytes(event.method.as_bytes())
            .expect("captured method is a valid HTTP token");

        let mut request = self.http_client.request(method, url);
        for (name, value) in &event.headers {
            if RECOMPUTED_HEADERS
                .iter()
                .any(|h| name.eq_ignore_ascii_case(h))
            {
                continue;
            }
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(header_name), Ok(header_value)) => {
                    request = request.header(header_name, header_value);
                }
                _ => debug!(header = %name, "skipping header that cannot be replayed"),
            }
        }

        let response = request.body(event.body.clone()).send().await?;
        let status = response.status();

        if status.as_u16() >= 400 {
            return Err(CaptureError::ReplayFailed {
                status: status.as_u16(),
            });
        }

        info!(id, target = target_url, status = status.as_u16(), "webhook replayed");
        Ok(())
    }
}
