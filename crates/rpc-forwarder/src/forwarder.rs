use std::time::Duration;

use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use tracing::{debug, warn};
use url::Url;

use crate::envelope::{self, Envelope};
use crate::error::{ForwardError, Result};

/// Upstream RPC call timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Largest envelope forwarded upstream (1 MiB).
pub const DEFAULT_MAX_REQUEST_BYTES: usize = 1024 * 1024;

/// Where and how envelopes are forwarded.
#[derive(Debug, Clone)]
pub struct ForwarderConfig {
    /// Upstream JSON-RPC endpoint.
    pub endpoint: Url,
    /// Bound on the whole upstream exchange, response body included.
    pub timeout: Duration,
    /// Serialized envelopes larger than this are refused before sending.
    pub max_request_bytes: usize,
}

impl ForwarderConfig {
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            timeout: DEFAULT_TIMEOUT,
            max_request_bytes: DEFAULT_MAX_REQUEST_BYTES,
        }
    }
}

/// Forwards opaque JSON-RPC envelopes to the upstream, one attempt each.
///
/// Cloning is cheap; clones share the HTTP connection pool. Dropping the
/// future returned by [`forward`](Self::forward) aborts the upstream request.
#[derive(Debug, Clone)]
pub struct RpcForwarder {
    config: ForwarderConfig,
    http: Client,
}

impl RpcForwarder {
    pub fn new(config: ForwarderConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(ForwardError::Client)?;
        Ok(Self { config, http })
    }

    pub fn endpoint(&self) -> &Url {
        &self.config.endpoint
    }

    /// Send `envelope` upstream and return the upstream's decoded body.
    ///
    /// Any non-2xx status is a failure whatever the body says. A 2xx body is
    /// returned as-is, including JSON-RPC level `error` members.
    pub async fn forward(&self, envelope: &Envelope) -> Result<Envelope> {
        let body = serde_json::to_vec(envelope)?;
        if body.len() > self.config.max_request_bytes {
            return Err(ForwardError::PayloadTooLarge {
                size: body.len(),
                limit: self.config.max_request_bytes,
            });
        }

        let method = envelope.get("method").and_then(|m| m.as_str()).unwrap_or("");
        debug!(
            endpoint = %self.config.endpoint,
            method,
            bytes = body.len(),
            "forwarding rpc envelope"
        );

        let response = self
            .http
            .post(self.config.endpoint.clone())
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .body(body)
            .send()
            .await
            .map_err(ForwardError::from_reqwest)?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(ForwardError::from_reqwest)?;

        if !status.is_success() {
            let text = String::from_utf8_lossy(&bytes);
            warn!(method, status = status.as_u16(), "upstream rejected rpc call");
            return Err(ForwardError::status(status, &text));
        }

        serde_json::from_slice(&bytes).map_err(|err| ForwardError::InvalidResponse(err.to_string()))
    }

    /// Fetch the latest validated ledger.
    pub async fn latest_validated_ledger(&self) -> Result<Envelope> {
        self.forward(&envelope::ledger_envelope()).await
    }

    /// Fetch account info for `address` at the latest validated ledger.
    pub async fn account_info(&self, address: &str) -> Result<Envelope> {
        self.forward(&envelope::account_info_envelope(address)).await
    }
}
