use thiserror::Error;

/// Longest upstream error body kept for diagnostics.
const MAX_BODY_SNIPPET: usize = 512;

pub type Result<T, E = ForwardError> = std::result::Result<T, E>;

/// Why a forwarded call did not produce an upstream envelope.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("failed to build upstream HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("failed to encode RPC envelope: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("RPC envelope is {size} bytes, limit is {limit}")]
    PayloadTooLarge { size: usize, limit: usize },
    #[error("upstream request timed out: {0}")]
    Timeout(String),
    #[error("upstream connection failed: {0}")]
    Connect(String),
    #[error("upstream returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("upstream returned a malformed response: {0}")]
    InvalidResponse(String),
    #[error("upstream request error: {0}")]
    Transport(String),
}

impl ForwardError {
    /// Whether the failure happened talking to the upstream, as opposed to
    /// a problem with the caller's envelope or the local client.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::Timeout(_)
                | Self::Connect(_)
                | Self::Status { .. }
                | Self::InvalidResponse(_)
                | Self::Transport(_)
        )
    }

    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::Connect(err.to_string())
        } else if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }

    pub(crate) fn status(status: reqwest::StatusCode, body: &str) -> Self {
        Self::Status {
            status: status.as_u16(),
            body: snippet(body),
        }
    }
}

fn snippet(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.len() <= MAX_BODY_SNIPPET {
        return trimmed.to_string();
    }
    let mut end = MAX_BODY_SNIPPET;
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &trimmed[..end])
}
