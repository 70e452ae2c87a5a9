use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use audit_log::{AuditEntry, AuditEventType, AuditSource};
use rpc_forwarder::Envelope;
use stream_bridge::ConnectionContext;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::routes::ClientInfo;
use crate::state::GatewayState;

/// `GET /healthz`: liveness only, never touches the upstream.
pub async fn health(State(state): State<GatewayState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "ok": true,
        "ts": state.health_timestamp(),
    }))
}

/// `POST /`: forward the body as an opaque JSON-RPC envelope.
pub async fn rpc_passthrough(
    State(state): State<GatewayState>,
    Extension(client): Extension<ClientInfo>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<Envelope>, ApiError> {
    let body = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge {
                limit: state.max_body_bytes,
            }
        } else {
            ApiError::InvalidJson(rejection.body_text())
        }
    })?;

    let envelope: Envelope =
        serde_json::from_slice(&body).map_err(|err| ApiError::InvalidJson(err.to_string()))?;

    let result = state.forwarder.forward(&envelope).await;
    finish_rpc(&state, &client, "passthrough", result).await
}

/// `GET /api/xrpl/ledger`
pub async fn ledger(
    State(state): State<GatewayState>,
    Extension(client): Extension<ClientInfo>,
) -> Result<Json<Envelope>, ApiError> {
    let result = state.forwarder.latest_validated_ledger().await;
    finish_rpc(&state, &client, "ledger", result).await
}

/// `GET /api/xrpl/account/{address}`
pub async fn account_info(
    State(state): State<GatewayState>,
    Extension(client): Extension<ClientInfo>,
    Path(address): Path<String>,
) -> Result<Json<Envelope>, ApiError> {
    let result = state.forwarder.account_info(&address).await;
    finish_rpc(&state, &client, "account_info", result).await
}

/// `GET /ws`: hand the upgraded socket to the stream bridge.
pub async fn stream_upgrade(
    State(state): State<GatewayState>,
    Extension(client): Extension<ClientInfo>,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let upgrade = match upgrade {
        Ok(upgrade) => upgrade,
        Err(rejection) => return ApiError::UpgradeRequired(rejection.body_text()).into_response(),
    };

    let ctx = ConnectionContext::new(client.remote_addr, client.origin);
    let connection_id = ctx.connection_id;
    let bridge = state.bridge.clone();

    upgrade
        .on_failed_upgrade(move |err| {
            warn!(%connection_id, %err, "websocket upgrade failed");
        })
        .on_upgrade(move |socket| async move { bridge.serve(socket, ctx).await })
}

/// Fallback for any unknown path or method.
///
/// An upgrade attempt on an unknown path gets the 404 with
/// `Connection: close`, so the socket is dropped instead of kept alive.
pub async fn not_found(method: Method, uri: Uri, headers: HeaderMap) -> Response {
    let upgrade = headers.contains_key(header::UPGRADE);
    debug!(%method, path = uri.path(), upgrade, "no route");

    let mut response = ApiError::NotFound {
        path: uri.path().to_string(),
        method: method.to_string(),
    }
    .into_response();
    if upgrade {
        response
            .headers_mut()
            .insert(header::CONNECTION, HeaderValue::from_static("close"));
    }
    response
}

async fn finish_rpc(
    state: &GatewayState,
    client: &ClientInfo,
    operation: &'static str,
    result: rpc_forwarder::Result<Envelope>,
) -> Result<Json<Envelope>, ApiError> {
    let mut source = AuditSource::new("rpc-forwarder").with_origin(client.origin.as_deref());
    if let Some(addr) = client.remote_addr {
        source = source.with_remote_addr(addr);
    }

    match result {
        Ok(envelope) => {
            debug!(operation, "rpc forwarded");
            state
                .audit
                .log(AuditEntry::new(
                    AuditEventType::RpcForwarded,
                    source,
                    serde_json::json!({ "operation": operation }),
                ))
                .await;
            Ok(Json(envelope))
        }
        Err(err) => {
            warn!(operation, %err, "rpc forwarding failed");
            state
                .audit
                .log(AuditEntry::new(
                    AuditEventType::RpcFailed,
                    source,
                    serde_json::json!({ "operation": operation, "error": err.to_string() }),
                ))
                .await;
            Err(err.into())
        }
    }
}
