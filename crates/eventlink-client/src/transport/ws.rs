//! WebSocket connector (tokio-tungstenite).
//!
//! Responsibilities:
//! - Attach the bearer token to the upgrade request
//! - Pump outbound text and inbound frames between the socket and the `Link`
//! - Lifecycle: periodic ping, close frames, read errors

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{
        client::IntoClientRequest,
        http::{header::AUTHORIZATION, HeaderValue},
        protocol::Message,
    },
    MaybeTlsStream, WebSocketStream,
};

use eventlink_core::error::{EventLinkError, Result};

use crate::transport::{ConnectRequest, Connector, Link, LinkEvent};

type Socket = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

#[derive(Debug, Clone, Default)]
pub struct WsConnector;

impl WsConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, req: &ConnectRequest) -> Result<Link> {
        let url = req.effective_url();
        let mut request = url.as_str().into_client_request().map_err(|e| {
            EventLinkError::Transport(format!("failed to build websocket request: {e}"))
        })?;

        let bearer = HeaderValue::from_str(&format!("Bearer {}", req.token)).map_err(|e| {
            EventLinkError::AuthUnavailable(format!("token is not a valid header value: {e}"))
        })?;
        request.headers_mut().insert(AUTHORIZATION, bearer);

        let (socket, _resp) = connect_async(request)
            .await
            .map_err(|e| EventLinkError::Transport(format!("connect {} failed: {e}", req.url)))?;

        let (out_tx, out_rx) = mpsc::unbounded_channel::<String>();
        let (in_tx, in_rx) = mpsc::unbounded_channel::<LinkEvent>();

        tokio::spawn(pump(socket, out_rx, in_tx, req.ping_interval));

        Ok(Link {
            outbound: out_tx,
            inbound: in_rx,
        })
    }
}

/// Why the pump stopped.
enum End {
    /// The client dropped its end of the link: close the socket politely.
    Released,
    /// The socket went away under us; report it to the driver.
    Lost(Option<String>),
}

async fn pump(
    socket: Socket,
    mut out_rx: mpsc::UnboundedReceiver<String>,
    in_tx: mpsc::UnboundedSender<LinkEvent>,
    ping_interval: Option<std::time::Duration>,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    // A disabled ping still needs a future for select!; park it for a day.
    let ping_every = ping_interval.unwrap_or(std::time::Duration::from_secs(86_400));
    let mut ping_tick = tokio::time::interval(ping_every);
    ping_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    ping_tick.tick().await;

    let end = loop {
        tokio::select! {
            // outbound writer
            maybe_out = out_rx.recv() => {
                match maybe_out {
                    Some(text) => {
                        if let Err(e) = ws_tx.send(Message::Text(text.into())).await {
                            break End::Lost(Some(format!("write failed: {e}")));
                        }
                    }
                    None => break End::Released,
                }
            }

            // inbound reader
            incoming = ws_rx.next() => {
                let ev = match incoming {
                    None => break End::Lost(None),
                    Some(Err(e)) => break End::Lost(Some(format!("read failed: {e}"))),
                    Some(Ok(Message::Text(t))) => LinkEvent::Text(t.to_string()),
                    Some(Ok(Message::Binary(b))) => LinkEvent::Binary(b),
                    Some(Ok(Message::Close(frame))) => {
                        break End::Lost(frame.map(|f| f.reason.to_string()).filter(|r| !r.is_empty()));
                    }
                    // Pongs for server pings are queued by tungstenite itself.
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) | Some(Ok(Message::Frame(_))) => continue,
                };
                if in_tx.send(ev).is_err() {
                    break End::Released;
                }
            }

            _ = ping_tick.tick(), if ping_interval.is_some() => {
                if let Err(e) = ws_tx.send(Message::Ping(Default::default())).await {
                    break End::Lost(Some(format!("ping failed: {e}")));
                }
            }
        }
    };

    match end {
        End::Released => {
            let _ = ws_tx.send(Message::Close(None)).await;
            let _ = ws_tx.close().await;
            tracing::debug!("websocket link released");
        }
        End::Lost(reason) => {
            tracing::debug!(reason = ?reason, "websocket link closed");
            let _ = in_tx.send(LinkEvent::Closed { reason });
        }
    }
}
