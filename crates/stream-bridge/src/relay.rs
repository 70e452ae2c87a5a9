use std::fmt::Display;

use futures_util::{Sink, SinkExt, Stream, StreamExt};

use crate::frame::{CloseInfo, Inbound};

/// Direction of message flow through a bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Client -> upstream
    Upstream,
    /// Upstream -> client
    Downstream,
}

/// One side of a bridge session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Client,
    Upstream,
}

impl Side {
    pub fn counterpart(self) -> Self {
        match self {
            Side::Client => Side::Upstream,
            Side::Upstream => Side::Client,
        }
    }
}

/// Why one relay direction stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEnd {
    /// The reader sent a close frame.
    Closed(Option<CloseInfo>),
    /// The reader's stream ended without a close frame.
    Dropped,
    /// Reading from the source failed.
    ReadFailed(String),
    /// Writing to the destination failed.
    WriteFailed(String),
}

/// How a session ended: which direction stopped first and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEnd {
    pub direction: Direction,
    pub reason: RelayEnd,
}

impl SessionEnd {
    /// The side whose closure or failure ended the session.
    pub fn initiator(&self) -> Side {
        let reader = match self.direction {
            Direction::Upstream => Side::Client,
            Direction::Downstream => Side::Upstream,
        };
        match self.reason {
            RelayEnd::WriteFailed(_) => reader.counterpart(),
            _ => reader,
        }
    }

    /// A close frame with no code, 1000 or 1001. Any other code is the peer
    /// reporting an error.
    pub fn is_normal(&self) -> bool {
        match &self.reason {
            RelayEnd::Closed(None) => true,
            RelayEnd::Closed(Some(info)) => info.is_clean(),
            _ => false,
        }
    }

    /// Whether the initiator sent a close frame, so its handshake can be
    /// completed.
    pub fn handshake_started(&self) -> bool {
        matches!(self.reason, RelayEnd::Closed(_))
    }

    /// Close frame for the side that did not initiate the teardown.
    pub fn counterpart_close(&self) -> CloseInfo {
        match &self.reason {
            RelayEnd::Closed(_) if self.is_normal() => CloseInfo::normal(),
            RelayEnd::Closed(_) => CloseInfo::abnormal("peer closed with error"),
            RelayEnd::Dropped => CloseInfo::abnormal("peer disconnected"),
            RelayEnd::ReadFailed(_) | RelayEnd::WriteFailed(_) => CloseInfo::abnormal("peer error"),
        }
    }

    pub fn detail(&self) -> String {
        match &self.reason {
            RelayEnd::Closed(Some(info)) => format!("closed ({})", info.code),
            RelayEnd::Closed(None) => "closed".to_string(),
            RelayEnd::Dropped => "disconnected without close".to_string(),
            RelayEnd::ReadFailed(err) => format!("read failed: {err}"),
            RelayEnd::WriteFailed(err) => format!("write failed: {err}"),
        }
    }
}

/// Move messages from `reader` to `writer` until the reader closes or either
/// side fails.
///
/// Each message is written and flushed before the next one is read, so
/// nothing is buffered and arrival order is kept. `relayed` counts the
/// frames delivered.
pub async fn pump<R, W, I, O, E>(
    reader: &mut R,
    writer: &mut W,
    convert: fn(I) -> Inbound<O>,
    relayed: &mut u64,
) -> RelayEnd
where
    R: Stream<Item = Result<I, E>> + Unpin,
    E: Display,
    W: Sink<O> + Unpin,
    W::Error: Display,
{
    while let Some(item) = reader.next().await {
        let msg = match item {
            Ok(msg) => msg,
            Err(err) => return RelayEnd::ReadFailed(err.to_string()),
        };

        match convert(msg) {
            Inbound::Data(out) => {
                if let Err(err) = writer.send(out).await {
                    return RelayEnd::WriteFailed(err.to_string());
                }
                *relayed += 1;
            }
            Inbound::Close(frame) => return RelayEnd::Closed(frame),
            Inbound::Skip => {}
        }
    }
    RelayEnd::Dropped
}
