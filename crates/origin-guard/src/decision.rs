use crate::allowlist::OriginAllowlist;
use crate::OriginRejection;

/// The outcome of checking one inbound request's `Origin` against the
/// allow-list. Built per request and dropped as soon as the request has been
/// gated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmissionDecision {
    /// The declared origin, if the request carried one.
    pub origin: Option<String>,
    /// Whether the request may proceed.
    pub allowed: bool,
}

impl AdmissionDecision {
    /// Evaluate `origin` against `allowlist`.
    ///
    /// Requests without an origin (same-origin navigations, CLI and server
    /// clients) are admitted. A declared origin is admitted only when it is
    /// byte-for-byte equal to an allow-list entry.
    pub fn evaluate(origin: Option<&str>, allowlist: &OriginAllowlist) -> Self {
        let allowed = match origin {
            None => true,
            Some(origin) => allowlist.contains(origin),
        };
        Self {
            origin: origin.map(str::to_string),
            allowed,
        }
    }

    /// Evaluate the `Origin` header of an HTTP request or upgrade.
    ///
    /// A header whose value is not visible ASCII can never equal an
    /// allow-list entry and is denied.
    pub fn from_headers(headers: &http::HeaderMap, allowlist: &OriginAllowlist) -> Self {
        match headers.get(http::header::ORIGIN) {
            None => Self::evaluate(None, allowlist),
            Some(value) => match value.to_str() {
                Ok(origin) => Self::evaluate(Some(origin), allowlist),
                Err(_) => Self {
                    origin: Some(String::from_utf8_lossy(value.as_bytes()).into_owned()),
                    allowed: false,
                },
            },
        }
    }

    /// Convert into a `Result`, carrying the rejected origin on denial.
    pub fn into_result(self) -> Result<Option<String>, OriginRejection> {
        if self.allowed {
            Ok(self.origin)
        } else {
            Err(OriginRejection::NotAllowed {
                origin: self.origin.unwrap_or_default(),
            })
        }
    }
}
