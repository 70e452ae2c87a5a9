use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::ws::{Message as ClientMessage, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{Sink, SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message as UpstreamMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

use crate::frame;
use crate::relay::{self, Direction, RelayEnd, SessionEnd, Side};

/// The upstream half of a bridge.
pub type UpstreamSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Lifecycle of a bridge session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Client upgraded, upstream not yet connected.
    Connecting,
    /// Frames are flowing both ways.
    Open,
    /// One side closed or failed; the other is being closed.
    Closing,
    /// Both handles released.
    Closed,
}

impl SessionState {
    /// Whether `next` is a legal successor. Sessions only move forward and
    /// may skip `Open` when the upstream dial fails.
    pub fn can_advance_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Connecting, Open) | (Connecting, Closing) | (Open, Closing) | (Closing, Closed)
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Connecting => "connecting",
            SessionState::Open => "open",
            SessionState::Closing => "closing",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Per-connection metadata, used for logging and auditing.
#[derive(Debug, Clone)]
pub struct ConnectionContext {
    pub connection_id: uuid::Uuid,
    pub remote_addr: Option<SocketAddr>,
    /// The `Origin` header of the upgrade request, if present.
    pub origin: Option<String>,
}

impl ConnectionContext {
    pub fn new(remote_addr: Option<SocketAddr>, origin: Option<String>) -> Self {
        Self {
            connection_id: uuid::Uuid::new_v4(),
            remote_addr,
            origin,
        }
    }
}

enum Handles {
    Connecting {
        client: WebSocket,
    },
    Open {
        client_tx: SplitSink<WebSocket, ClientMessage>,
        client_rx: SplitStream<WebSocket>,
        upstream_tx: SplitSink<UpstreamSocket, UpstreamMessage>,
        upstream_rx: SplitStream<UpstreamSocket>,
    },
    Released,
}

/// One tunnel between a client socket and an upstream socket.
///
/// The session is the only owner of both sockets. Whichever direction stops
/// first, [`teardown`](Self::teardown) closes both, so neither socket
/// outlives the session.
pub struct BridgeSession {
    ctx: ConnectionContext,
    state: SessionState,
    handles: Handles,
    close_timeout: Duration,
    frames_up: u64,
    frames_down: u64,
}

impl BridgeSession {
    /// Start a session for a freshly upgraded client socket.
    pub fn new(ctx: ConnectionContext, client: WebSocket, close_timeout: Duration) -> Self {
        Self {
            ctx,
            state: SessionState::Connecting,
            handles: Handles::Connecting { client },
            close_timeout,
            frames_up: 0,
            frames_down: 0,
        }
    }

    pub fn context(&self) -> &ConnectionContext {
        &self.ctx
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Frames relayed client -> upstream and upstream -> client.
    pub fn frames_relayed(&self) -> (u64, u64) {
        (self.frames_up, self.frames_down)
    }

    fn advance(&mut self, next: SessionState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal bridge transition {} -> {}",
            self.state,
            next
        );
        debug!(
            connection_id = %self.ctx.connection_id,
            from = %self.state,
            to = %next,
            "bridge state change"
        );
        self.state = next;
    }

    /// Attach the connected upstream socket and move to `Open`.
    pub fn attach_upstream(&mut self, upstream: UpstreamSocket) {
        let Handles::Connecting { client } = std::mem::replace(&mut self.handles, Handles::Released)
        else {
            warn!(
                connection_id = %self.ctx.connection_id,
                state = %self.state,
                "upstream attached to a session that is not connecting"
            );
            return;
        };

        let (client_tx, client_rx) = client.split();
        let (upstream_tx, upstream_rx) = upstream.split();
        self.handles = Handles::Open {
            client_tx,
            client_rx,
            upstream_tx,
            upstream_rx,
        };
        self.advance(SessionState::Open);
    }

    /// Relay frames both ways until either direction stops.
    ///
    /// Both directions are polled on the current task; when one finishes the
    /// other is dropped mid-read, which is safe because no frame is held
    /// between a read and its write.
    pub async fn relay(&mut self) -> SessionEnd {
        let Handles::Open {
            client_tx,
            client_rx,
            upstream_tx,
            upstream_rx,
        } = &mut self.handles
        else {
            return SessionEnd {
                direction: Direction::Upstream,
                reason: RelayEnd::Dropped,
            };
        };

        let frames_up = &mut self.frames_up;
        let frames_down = &mut self.frames_down;

        tokio::select! {
            reason = relay::pump(client_rx, upstream_tx, frame::from_client, frames_up) => {
                SessionEnd { direction: Direction::Upstream, reason }
            }
            reason = relay::pump(upstream_rx, client_tx, frame::from_upstream, frames_down) => {
                SessionEnd { direction: Direction::Downstream, reason }
            }
        }
    }

    /// Close both sides after `end`, then release them.
    ///
    /// The side that did not initiate gets a normal close after a normal
    /// close and an abnormal close (1011) after any failure. The initiating
    /// side gets its close handshake completed where possible.
    pub async fn teardown(&mut self, end: &SessionEnd) {
        if matches!(self.state, SessionState::Closing | SessionState::Closed) {
            return;
        }
        self.advance(SessionState::Closing);

        let counterpart = end.counterpart_close();
        let handles = std::mem::replace(&mut self.handles, Handles::Released);
        match handles {
            Handles::Connecting { mut client } => {
                close_with(&mut client, frame::client_close(&counterpart), self.close_timeout)
                    .await;
            }
            Handles::Open {
                mut client_tx,
                client_rx,
                mut upstream_tx,
                upstream_rx,
            } => {
                // Drop the read halves first so nothing else is pulled off
                // either socket.
                drop(client_rx);
                drop(upstream_rx);
                match end.initiator().counterpart() {
                    Side::Upstream => {
                        close_with(
                            &mut upstream_tx,
                            frame::upstream_close(&counterpart),
                            self.close_timeout,
                        )
                        .await;
                        finish::<_, ClientMessage>(&mut client_tx, end.handshake_started(), self.close_timeout).await;
                    }
                    Side::Client => {
                        close_with(
                            &mut client_tx,
                            frame::client_close(&counterpart),
                            self.close_timeout,
                        )
                        .await;
                        finish::<_, UpstreamMessage>(&mut upstream_tx, end.handshake_started(), self.close_timeout).await;
                    }
                }
            }
            Handles::Released => {}
        }

        self.advance(SessionState::Closed);
    }

    /// Run the open session to completion: relay, then tear down.
    pub async fn run(&mut self) -> SessionEnd {
        let end = self.relay().await;
        self.teardown(&end).await;
        end
    }

    /// Tear down a session whose upstream could not be reached.
    pub async fn abort(&mut self, reason: impl Into<String>) {
        let end = SessionEnd {
            direction: Direction::Upstream,
            reason: RelayEnd::WriteFailed(reason.into()),
        };
        self.teardown(&end).await;
    }
}

/// Send a close frame and shut the sink, bounded by `timeout`.
async fn close_with<S, M>(sink: &mut S, close: M, timeout: Duration)
where
    S: Sink<M> + Unpin,
{
    let _ = tokio::time::timeout(timeout, async {
        let _ = sink.send(close).await;
        let _ = sink.close().await;
    })
    .await;
}

/// Finish the initiating side. After a close frame this flushes the close
/// reply the WebSocket library queued; after a failure the socket is
/// already unusable and is simply dropped.
async fn finish<S, M>(sink: &mut S, handshake_started: bool, timeout: Duration)
where
    S: Sink<M> + Unpin,
{
    if handshake_started {
        let _ = tokio::time::timeout(timeout, sink.close()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legal_transitions() {
        use SessionState::*;
        assert!(Connecting.can_advance_to(Open));
        assert!(Connecting.can_advance_to(Closing));
        assert!(Open.can_advance_to(Closing));
        assert!(Closing.can_advance_to(Closed));
    }

    #[test]
    fn no_going_back() {
        use SessionState::*;
        assert!(!Open.can_advance_to(Connecting));
        assert!(!Closed.can_advance_to(Open));
        assert!(!Closing.can_advance_to(Open));
        assert!(!Open.can_advance_to(Closed));
        assert!(!Connecting.can_advance_to(Closed));
    }

    #[test]
    fn state_names() {
        assert_eq!(SessionState::Connecting.to_string(), "connecting");
        assert_eq!(SessionState::Closed.to_string(), "closed");
    }

    #[test]
    fn contexts_get_distinct_ids() {
        let a = ConnectionContext::new(None, None);
        let b = ConnectionContext::new(None, Some("https://app.example".into()));
        assert_ne!(a.connection_id, b.connection_id);
        assert_eq!(b.origin.as_deref(), Some("https://app.example"));
    }
}
