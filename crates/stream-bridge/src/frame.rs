//! Conversions between the client-side (axum) and upstream-side
//! (tungstenite) WebSocket message types.
//!
//! Payloads move across unchanged: binary, ping and pong frames share the
//! same `Bytes` buffer, text frames are re-wrapped without re-encoding.

use axum::extract::ws::{self, Message as ClientMessage};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame as UpstreamCloseFrame;
use tokio_tungstenite::tungstenite::Message as UpstreamMessage;

/// Close code sent to the surviving side after a normal close.
pub const NORMAL_CLOSURE: u16 = 1000;

/// Peer is going away (server shutdown, page navigation). Still a clean close.
pub const GOING_AWAY: u16 = 1001;

/// Close code sent to the surviving side after an error on the other one.
pub const ABNORMAL_CLOSURE: u16 = 1011;

/// Close code and reason, independent of either WebSocket library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseInfo {
    pub code: u16,
    pub reason: String,
}

impl CloseInfo {
    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    pub fn normal() -> Self {
        Self::new(NORMAL_CLOSURE, "")
    }

    pub fn abnormal(reason: impl Into<String>) -> Self {
        Self::new(ABNORMAL_CLOSURE, reason)
    }

    /// Whether the code reports a clean shutdown rather than an error.
    pub fn is_clean(&self) -> bool {
        matches!(self.code, NORMAL_CLOSURE | GOING_AWAY)
    }
}

/// What the relay should do with one inbound message.
#[derive(Debug, PartialEq)]
pub enum Inbound<T> {
    /// A data or control frame to pass to the other side.
    Data(T),
    /// The sender is closing the connection.
    Close(Option<CloseInfo>),
    /// Nothing to forward.
    Skip,
}

pub fn from_client(msg: ClientMessage) -> Inbound<UpstreamMessage> {
    match msg {
        ClientMessage::Text(text) => {
            Inbound::Data(UpstreamMessage::Text(text.as_str().to_owned().into()))
        }
        ClientMessage::Binary(data) => Inbound::Data(UpstreamMessage::Binary(data)),
        ClientMessage::Ping(data) => Inbound::Data(UpstreamMessage::Ping(data)),
        ClientMessage::Pong(data) => Inbound::Data(UpstreamMessage::Pong(data)),
        ClientMessage::Close(frame) => Inbound::Close(frame.map(|f| CloseInfo {
            code: f.code,
            reason: f.reason.as_str().to_owned(),
        })),
    }
}

pub fn from_upstream(msg: UpstreamMessage) -> Inbound<ClientMessage> {
    match msg {
        UpstreamMessage::Text(text) => {
            Inbound::Data(ClientMessage::Text(text.as_str().to_owned().into()))
        }
        UpstreamMessage::Binary(data) => Inbound::Data(ClientMessage::Binary(data)),
        UpstreamMessage::Ping(data) => Inbound::Data(ClientMessage::Ping(data)),
        UpstreamMessage::Pong(data) => Inbound::Data(ClientMessage::Pong(data)),
        UpstreamMessage::Close(frame) => Inbound::Close(frame.map(|f| CloseInfo {
            code: u16::from(f.code),
            reason: f.reason.as_str().to_owned(),
        })),
        // Raw frames only appear on the write path.
        UpstreamMessage::Frame(_) => Inbound::Skip,
    }
}

pub fn client_close(info: &CloseInfo) -> ClientMessage {
    ClientMessage::Close(Some(ws::CloseFrame {
        code: info.code,
        reason: info.reason.clone().into(),
    }))
}

pub fn upstream_close(info: &CloseInfo) -> UpstreamMessage {
    UpstreamMessage::Close(Some(UpstreamCloseFrame {
        code: CloseCode::from(info.code),
        reason: info.reason.clone().into(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn client_text_is_relayed_verbatim() {
        let msg = ClientMessage::Text(String::from(r#"{"command":"subscribe"}"#).into());
        match from_client(msg) {
            Inbound::Data(UpstreamMessage::Text(text)) => {
                assert_eq!(text.as_str(), r#"{"command":"subscribe"}"#);
            }
            other => panic!("expected text, got {other:?}"),
        }
    }

    #[test]
    fn binary_payload_is_shared_not_copied() {
        let payload = Bytes::from_static(&[0xde, 0xad, 0xbe, 0xef]);
        match from_upstream(UpstreamMessage::Binary(payload.clone())) {
            Inbound::Data(ClientMessage::Binary(data)) => {
                assert_eq!(data, payload);
                assert_eq!(data.as_ptr(), payload.as_ptr());
            }
            other => panic!("expected binary, got {other:?}"),
        }
    }

    #[test]
    fn control_frames_pass_through() {
        let ping = Bytes::from_static(b"hb");
        assert!(matches!(
            from_client(ClientMessage::Ping(ping.clone())),
            Inbound::Data(UpstreamMessage::Ping(ref d)) if *d == ping
        ));
        assert!(matches!(
            from_upstream(UpstreamMessage::Pong(ping.clone())),
            Inbound::Data(ClientMessage::Pong(ref d)) if *d == ping
        ));
    }

    #[test]
    fn close_frames_become_close_info() {
        let close = UpstreamMessage::Close(Some(UpstreamCloseFrame {
            code: CloseCode::Away,
            reason: String::from("restarting").into(),
        }));
        assert_eq!(
            from_upstream(close),
            Inbound::Close(Some(CloseInfo::new(1001, "restarting")))
        );
        assert_eq!(from_client(ClientMessage::Close(None)), Inbound::Close(None));
    }

    #[test]
    fn close_helpers_carry_code_and_reason() {
        let info = CloseInfo::abnormal("upstream error");
        match upstream_close(&info) {
            UpstreamMessage::Close(Some(frame)) => {
                assert_eq!(u16::from(frame.code), ABNORMAL_CLOSURE);
                assert_eq!(frame.reason.as_str(), "upstream error");
            }
            other => panic!("expected close, got {other:?}"),
        }
        match client_close(&CloseInfo::normal()) {
            ClientMessage::Close(Some(frame)) => assert_eq!(frame.code, NORMAL_CLOSURE),
            other => panic!("expected close, got {other:?}"),
        }
    }
}
