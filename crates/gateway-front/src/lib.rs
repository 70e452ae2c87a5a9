//! HTTP and WebSocket front for the ledger gateway.
//!
//! ```text
//!                     +--> /healthz             (local)
//! Client --> origin --+--> POST /, /api/xrpl/*  --> rpc-forwarder --> upstream JSON-RPC
//!            gate     +--> /ws                  --> stream-bridge --> upstream WebSocket
//!                     +--> anything else        (404)
//! ```
//!
//! Requests whose `Origin` is not on the allow-list are answered with 403
//! before reaching any handler, so they never cause upstream traffic.
//!
//! ```no_run
//! use audit_log::AuditSink;
//! use gateway_front::{create_router, GatewayConfig, GatewayState};
//! use origin_guard::OriginAllowlist;
//! use url::Url;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = GatewayConfig::new(
//!     Url::parse("https://s1.ripple.com:51234/")?,
//!     Url::parse("wss://s1.ripple.com/")?,
//!     OriginAllowlist::from_csv("http://localhost:3000"),
//! );
//! let state = GatewayState::new(config, AuditSink::disabled())?;
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, create_router(state)).await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, ClientInfo};
pub use state::{GatewayConfig, GatewayState, DEFAULT_MAX_BODY_BYTES};
