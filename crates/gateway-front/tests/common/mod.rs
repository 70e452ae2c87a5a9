#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use audit_log::AuditSink;
use futures_util::{SinkExt, StreamExt};
use gateway_front::{create_router, GatewayConfig, GatewayState};
use origin_guard::OriginAllowlist;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

pub const ALLOWED_ORIGIN: &str = "http://localhost:3000";
pub const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Start the gateway on an ephemeral port and return its address.
pub async fn spawn_gateway(rpc_url: &str, ws_url: &str) -> SocketAddr {
    spawn_gateway_with(rpc_url, ws_url, |_| {}).await
}

pub async fn spawn_gateway_with(
    rpc_url: &str,
    ws_url: &str,
    tweak: impl FnOnce(&mut GatewayConfig),
) -> SocketAddr {
    let mut config = GatewayConfig::new(
        Url::parse(rpc_url).unwrap(),
        Url::parse(ws_url).unwrap(),
        OriginAllowlist::new([ALLOWED_ORIGIN]),
    );
    config.rpc_timeout = Duration::from_secs(2);
    config.upstream_connect_timeout = Duration::from_secs(2);
    config.bridge_close_timeout = Duration::from_secs(1);
    tweak(&mut config);

    let state = GatewayState::new(config, AuditSink::disabled()).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            create_router(state).into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    addr
}

/// An address nothing is listening on.
pub fn unused_addr() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

#[derive(Debug, PartialEq)]
pub enum UpstreamEvent {
    Connected,
    Text(String),
    Closed(Option<u16>),
    Failed,
}

pub enum UpstreamCommand {
    Send(String),
    Close(u16),
    /// Drop the socket without a close handshake.
    Abort,
}

/// A WebSocket upstream that accepts a single connection, reports what it
/// sees and does what it is told.
pub struct StubUpstream {
    pub url: String,
    pub events: mpsc::UnboundedReceiver<UpstreamEvent>,
    pub commands: mpsc::UnboundedSender<UpstreamCommand>,
}

impl StubUpstream {
    pub async fn spawn() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}/", listener.local_addr().unwrap());
        let (event_tx, events) = mpsc::unbounded_channel();
        let (commands, mut command_rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                let _ = event_tx.send(UpstreamEvent::Failed);
                return;
            };
            let _ = event_tx.send(UpstreamEvent::Connected);

            loop {
                tokio::select! {
                    msg = ws.next() => match msg {
                        Some(Ok(Message::Text(text))) => {
                            let _ = event_tx.send(UpstreamEvent::Text(text.as_str().to_string()));
                        }
                        Some(Ok(Message::Close(frame))) => {
                            let _ = event_tx.send(UpstreamEvent::Closed(
                                frame.map(|f| u16::from(f.code)),
                            ));
                            // Let the close reply go out.
                            while let Some(Ok(_)) = ws.next().await {}
                            return;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(_)) | None => {
                            let _ = event_tx.send(UpstreamEvent::Failed);
                            return;
                        }
                    },
                    cmd = command_rx.recv() => match cmd {
                        Some(UpstreamCommand::Send(text)) => {
                            if ws.send(Message::text(text)).await.is_err() {
                                let _ = event_tx.send(UpstreamEvent::Failed);
                                return;
                            }
                        }
                        Some(UpstreamCommand::Close(code)) => {
                            let _ = ws
                                .close(Some(CloseFrame {
                                    code: CloseCode::from(code),
                                    reason: String::new().into(),
                                }))
                                .await;
                            while let Some(Ok(_)) = ws.next().await {}
                            return;
                        }
                        Some(UpstreamCommand::Abort) | None => return,
                    },
                }
            }
        });

        Self {
            url,
            events,
            commands,
        }
    }

    pub async fn next_event(&mut self) -> UpstreamEvent {
        tokio::time::timeout(EVENT_TIMEOUT, self.events.recv())
            .await
            .expect("timed out waiting for upstream event")
            .expect("upstream stub exited")
    }

    pub fn send(&self, command: UpstreamCommand) {
        let _ = self.commands.send(command);
    }
}
