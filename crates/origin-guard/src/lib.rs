//! # origin-guard
//!
//! Admission control for the ledger gateway. Every inbound HTTP request and
//! WebSocket upgrade is checked here before any upstream resource is
//! touched.
//!
//! ```rust
//! use origin_guard::{AdmissionDecision, OriginAllowlist};
//!
//! let allowlist = OriginAllowlist::from_csv("https://wallet.example,http://localhost:3000");
//! assert!(AdmissionDecision::evaluate(None, &allowlist).allowed);
//! assert!(AdmissionDecision::evaluate(Some("http://localhost:3000"), &allowlist).allowed);
//! assert!(!AdmissionDecision::evaluate(Some("https://evil.example"), &allowlist).allowed);
//! ```

mod allowlist;
mod decision;

pub use allowlist::OriginAllowlist;
pub use decision::AdmissionDecision;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OriginRejection {
    #[error("origin '{origin}' is not in the allowlist")]
    NotAllowed { origin: String },
}
