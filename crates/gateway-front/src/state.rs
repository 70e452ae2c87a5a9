use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use audit_log::AuditSink;
use origin_guard::OriginAllowlist;
use rpc_forwarder::{ForwardError, ForwarderConfig, RpcForwarder};
use stream_bridge::{BridgeConfig, StreamBridge};
use url::Url;

/// Largest accepted request body (1 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Everything the front needs to serve requests. Built once at startup and
/// never mutated.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Upstream JSON-RPC endpoint.
    pub rpc_url: Url,
    /// Upstream streaming endpoint.
    pub ws_url: Url,
    pub allowlist: OriginAllowlist,
    pub rpc_timeout: Duration,
    pub upstream_connect_timeout: Duration,
    pub bridge_close_timeout: Duration,
    pub max_body_bytes: usize,
}

impl GatewayConfig {
    pub fn new(rpc_url: Url, ws_url: Url, allowlist: OriginAllowlist) -> Self {
        Self {
            rpc_url,
            ws_url,
            allowlist,
            rpc_timeout: rpc_forwarder::DEFAULT_TIMEOUT,
            upstream_connect_timeout: stream_bridge::DEFAULT_CONNECT_TIMEOUT,
            bridge_close_timeout: stream_bridge::DEFAULT_CLOSE_TIMEOUT,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

/// Shared state handed to every axum handler. Cloning is cheap.
#[derive(Clone)]
pub struct GatewayState {
    pub allowlist: Arc<OriginAllowlist>,
    pub forwarder: RpcForwarder,
    pub bridge: StreamBridge,
    pub audit: AuditSink,
    pub max_body_bytes: usize,
    health_clock: Arc<AtomicI64>,
}

impl GatewayState {
    pub fn new(config: GatewayConfig, audit: AuditSink) -> Result<Self, ForwardError> {
        let forwarder = RpcForwarder::new(ForwarderConfig {
            endpoint: config.rpc_url,
            timeout: config.rpc_timeout,
            max_request_bytes: config.max_body_bytes,
        })?;

        let bridge = StreamBridge::new(
            BridgeConfig {
                upstream_url: config.ws_url,
                connect_timeout: config.upstream_connect_timeout,
                close_timeout: config.bridge_close_timeout,
            },
            audit.clone(),
        );

        Ok(Self {
            allowlist: Arc::new(config.allowlist),
            forwarder,
            bridge,
            audit,
            max_body_bytes: config.max_body_bytes,
            health_clock: Arc::new(AtomicI64::new(0)),
        })
    }

    /// Wall-clock milliseconds for health responses, clamped so that the
    /// value never goes backwards across calls.
    pub fn health_timestamp(&self) -> i64 {
        let now = chrono::Utc::now().timestamp_millis();
        let previous = self.health_clock.fetch_max(now, Ordering::Relaxed);
        previous.max(now)
    }
}
