use std::sync::Arc;
use std::time::Duration;

use audit_log::{AuditEntry, AuditEventType, AuditSink, AuditSource};
use axum::extract::ws::WebSocket;
use tracing::{info, warn};
use url::Url;

use crate::error::BridgeError;
use crate::session::{BridgeSession, ConnectionContext, UpstreamSocket};

/// Upstream dial timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// How long teardown waits for each close handshake.
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for the stream bridge.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Upstream streaming endpoint (`ws://` or `wss://`).
    pub upstream_url: Url,
    pub connect_timeout: Duration,
    pub close_timeout: Duration,
}

impl BridgeConfig {
    pub fn new(upstream_url: Url) -> Self {
        Self {
            upstream_url,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
        }
    }
}

/// Accepts upgraded client sockets and runs one [`BridgeSession`] per
/// socket against the configured upstream.
#[derive(Clone)]
pub struct StreamBridge {
    config: Arc<BridgeConfig>,
    audit: AuditSink,
}

impl StreamBridge {
    pub fn new(config: BridgeConfig, audit: AuditSink) -> Self {
        Self {
            config: Arc::new(config),
            audit,
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Own `client` for its whole lifetime: dial the upstream, relay frames
    /// both ways, and tear both sockets down when either side ends.
    ///
    /// Returns once both sockets have been released.
    pub async fn serve(&self, client: WebSocket, ctx: ConnectionContext) {
        let mut session = BridgeSession::new(ctx, client, self.config.close_timeout);
        let ctx = session.context().clone();

        let upstream = match self.connect_upstream().await {
            Ok(upstream) => upstream,
            Err(err) => {
                warn!(
                    connection_id = %ctx.connection_id,
                    upstream = %self.config.upstream_url,
                    %err,
                    "upstream stream connect failed"
                );
                session.abort(err.to_string()).await;
                self.audit(
                    AuditEventType::BridgeFailed,
                    &ctx,
                    serde_json::json!({ "stage": "connect", "error": err.to_string() }),
                )
                .await;
                return;
            }
        };

        session.attach_upstream(upstream);
        info!(
            connection_id = %ctx.connection_id,
            remote_addr = ?ctx.remote_addr,
            origin = ctx.origin.as_deref().unwrap_or("<none>"),
            "bridge open"
        );
        self.audit(
            AuditEventType::BridgeOpened,
            &ctx,
            serde_json::json!({ "upstream": self.config.upstream_url.as_str() }),
        )
        .await;

        let end = session.run().await;
        let (frames_up, frames_down) = session.frames_relayed();

        info!(
            connection_id = %ctx.connection_id,
            initiator = ?end.initiator(),
            detail = %end.detail(),
            frames_up,
            frames_down,
            "bridge closed"
        );

        let event = if end.is_normal() {
            AuditEventType::BridgeClosed
        } else {
            AuditEventType::BridgeFailed
        };
        self.audit(
            event,
            &ctx,
            serde_json::json!({
                "initiator": format!("{:?}", end.initiator()),
                "detail": end.detail(),
                "frames_up": frames_up,
                "frames_down": frames_down,
            }),
        )
        .await;
    }

    async fn connect_upstream(&self) -> Result<UpstreamSocket, BridgeError> {
        let dial = tokio_tungstenite::connect_async(self.config.upstream_url.as_str());
        match tokio::time::timeout(self.config.connect_timeout, dial).await {
            Ok(Ok((socket, _response))) => Ok(socket),
            Ok(Err(err)) => Err(BridgeError::Connect(err)),
            Err(_) => Err(BridgeError::ConnectTimeout(self.config.connect_timeout)),
        }
    }

    async fn audit(
        &self,
        event: AuditEventType,
        ctx: &ConnectionContext,
        details: serde_json::Value,
    ) {
        let mut source = AuditSource::new("stream-bridge")
            .with_origin(ctx.origin.as_deref())
            .with_session_id(ctx.connection_id);
        if let Some(addr) = ctx.remote_addr {
            source = source.with_remote_addr(addr);
        }
        self.audit.log(AuditEntry::new(event, source, details)).await;
    }
}
