//! Request/response passthrough to the upstream ledger's JSON-RPC endpoint.
//!
//! Each call is a single POST with a bounded timeout. Successful (2xx)
//! upstream bodies are returned untouched; everything else becomes a
//! [`ForwardError`] carrying a short diagnostic.

mod envelope;
mod error;
mod forwarder;

pub use envelope::{account_info_envelope, ledger_envelope, Envelope};
pub use error::{ForwardError, Result};
pub use forwarder::{ForwarderConfig, RpcForwarder, DEFAULT_MAX_REQUEST_BYTES, DEFAULT_TIMEOUT};
