use std::net::SocketAddr;

use audit_log::{AuditEntry, AuditEventType, AuditSource};
use axum::extract::{ConnectInfo, DefaultBodyLimit, Request, State};
use axum::http::{HeaderValue, Method};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use origin_guard::{AdmissionDecision, OriginAllowlist, OriginRejection};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::error::ApiError;
use crate::handlers;
use crate::state::GatewayState;

/// Who is calling, as seen by the origin gate. Attached to every admitted
/// request.
#[derive(Debug, Clone)]
pub struct ClientInfo {
    pub remote_addr: Option<SocketAddr>,
    pub origin: Option<String>,
}

/// Build the gateway router.
///
/// Every request, including WebSocket upgrades and unknown routes, passes
/// the origin gate first.
pub fn create_router(state: GatewayState) -> Router {
    let cors = cors_layer(&state.allowlist);
    let body_limit = DefaultBodyLimit::max(state.max_body_bytes);

    Router::new()
        .route("/healthz", get(handlers::health).fallback(handlers::not_found))
        .route("/", post(handlers::rpc_passthrough).fallback(handlers::not_found))
        .route(
            "/api/xrpl/ledger",
            get(handlers::ledger).fallback(handlers::not_found),
        )
        .route(
            "/api/xrpl/account/{address}",
            get(handlers::account_info).fallback(handlers::not_found),
        )
        .route("/ws", get(handlers::stream_upgrade).fallback(handlers::not_found))
        .fallback(handlers::not_found)
        .layer(body_limit)
        .layer(cors)
        .layer(middleware::from_fn_with_state(state.clone(), origin_gate))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn origin_gate(
    State(state): State<GatewayState>,
    mut request: Request,
    next: Next,
) -> Response {
    let remote_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let decision = AdmissionDecision::from_headers(request.headers(), &state.allowlist);

    match decision.into_result() {
        Ok(origin) => {
            request
                .extensions_mut()
                .insert(ClientInfo { remote_addr, origin });
            next.run(request).await
        }
        Err(rejection) => {
            let OriginRejection::NotAllowed { origin: rejected } = rejection;
            warn!(
                ?remote_addr,
                origin = %rejected,
                path = request.uri().path(),
                "origin rejected"
            );

            let mut source = AuditSource::new("gateway-front").with_origin(Some(rejected.as_str()));
            if let Some(addr) = remote_addr {
                source = source.with_remote_addr(addr);
            }
            state
                .audit
                .log(AuditEntry::new(
                    AuditEventType::OriginRejected,
                    source,
                    serde_json::json!({
                        "method": request.method().as_str(),
                        "path": request.uri().path(),
                    }),
                ))
                .await;

            ApiError::OriginNotAllowed(rejected).into_response()
        }
    }
}

/// CORS mirrors the allow-list. A literal `*` entry only ever matches an
/// `Origin: *` header and is left out, since tower-http refuses it in a list.
fn cors_layer(allowlist: &OriginAllowlist) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowlist
        .to_sorted_vec()
        .iter()
        .filter(|origin| origin.as_str() != "*")
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::GatewayConfig;
    use audit_log::AuditSink;
    use url::Url;

    fn state_with(allowlist: OriginAllowlist) -> GatewayState {
        let config = GatewayConfig::new(
            Url::parse("http://127.0.0.1:9/").unwrap(),
            Url::parse("ws://127.0.0.1:9/").unwrap(),
            allowlist,
        );
        GatewayState::new(config, AuditSink::disabled()).unwrap()
    }

    #[test]
    fn wildcard_entry_does_not_break_router_construction() {
        let _router = create_router(state_with(OriginAllowlist::from_csv(
            "*, http://localhost:3000",
        )));
        let _router = create_router(state_with(OriginAllowlist::from_csv("*")));
    }

    #[test]
    fn wildcard_entry_is_still_an_exact_allowlist_match() {
        let allowlist = OriginAllowlist::from_csv("*");
        assert!(AdmissionDecision::evaluate(Some("*"), &allowlist).allowed);
        assert!(!AdmissionDecision::evaluate(Some("https://evil.example"), &allowlist).allowed);
    }
}
