//! Bidirectional WebSocket tunnel between gateway clients and the upstream
//! ledger's streaming endpoint.
//!
//! ```text
//! Client  <--WS-->  stream-bridge  <--WS-->  upstream
//! ```
//!
//! Each upgraded client socket gets its own [`BridgeSession`], which dials
//! the upstream, relays every frame verbatim in both directions, and closes
//! both sockets together when either side closes or fails. A normal close is
//! mirrored as a normal close (1000); any error closes the survivor with
//! 1011. Sessions are never reconnected.

mod bridge;
mod error;
pub mod frame;
pub mod relay;
mod session;

pub use bridge::{BridgeConfig, StreamBridge, DEFAULT_CLOSE_TIMEOUT, DEFAULT_CONNECT_TIMEOUT};
pub use error::BridgeError;
pub use frame::{CloseInfo, ABNORMAL_CLOSURE, GOING_AWAY, NORMAL_CLOSURE};
pub use relay::{Direction, RelayEnd, SessionEnd, Side};
pub use session::{BridgeSession, ConnectionContext, SessionState, UpstreamSocket};
