//! In-process connector.
//!
//! Every accepted attempt yields a `MemoryPeer`: the server end of the link.
//! Tests and demos use it to push frames to the client, observe writes, and
//! drop the connection at will. Attempts can be rejected to simulate an
//! unreachable backend.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;

use eventlink_core::error::{EventLinkError, Result};
use eventlink_core::protocol::{self, Envelope};

use crate::transport::{ConnectRequest, Connector, Link, LinkEvent};

pub struct MemoryConnector {
    accepting: AtomicBool,
    attempts: AtomicU32,
    tokens: Mutex<Vec<String>>,
    peers_tx: mpsc::UnboundedSender<MemoryPeer>,
    peers_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<MemoryPeer>>,
}

impl Default for MemoryConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryConnector {
    pub fn new() -> Self {
        let (peers_tx, peers_rx) = mpsc::unbounded_channel();
        Self {
            accepting: AtomicBool::new(true),
            attempts: AtomicU32::new(0),
            tokens: Mutex::new(Vec::new()),
            peers_tx,
            peers_rx: tokio::sync::Mutex::new(peers_rx),
        }
    }

    /// Accept (`true`) or reject (`false`) subsequent attempts.
    pub fn set_accepting(&self, accepting: bool) {
        self.accepting.store(accepting, Ordering::SeqCst);
    }

    /// Connect attempts seen so far, accepted or not.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Tokens presented by each attempt, in order.
    pub fn tokens(&self) -> Vec<String> {
        self.tokens
            .lock()
            .map(|t| t.clone())
            .unwrap_or_else(|e| e.into_inner().clone())
    }

    /// Wait for the next accepted connection.
    pub async fn next_peer(&self) -> Option<MemoryPeer> {
        self.peers_rx.lock().await.recv().await
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, req: &ConnectRequest) -> Result<Link> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        match self.tokens.lock() {
            Ok(mut t) => t.push(req.token.clone()),
            Err(e) => e.into_inner().push(req.token.clone()),
        }

        if !self.accepting.load(Ordering::SeqCst) {
            return Err(EventLinkError::Transport("connection refused".into()));
        }

        let (out_tx, out_rx) = mpsc::unbounded_channel::<String>();
        let (in_tx, in_rx) = mpsc::unbounded_channel::<LinkEvent>();

        let peer = MemoryPeer {
            request: req.clone(),
            written: out_rx,
            push: in_tx,
        };
        self.peers_tx
            .send(peer)
            .map_err(|_| EventLinkError::Transport("memory connector shut down".into()))?;

        Ok(Link {
            outbound: out_tx,
            inbound: in_rx,
        })
    }
}

/// Server end of an in-process link. Dropping it drops the connection.
pub struct MemoryPeer {
    pub request: ConnectRequest,
    written: mpsc::UnboundedReceiver<String>,
    push: mpsc::UnboundedSender<LinkEvent>,
}

impl MemoryPeer {
    /// Deliver a raw text frame to the client.
    pub fn push_text(&self, frame: impl Into<String>) -> bool {
        self.push.send(LinkEvent::Text(frame.into())).is_ok()
    }

    /// Deliver an envelope to the client.
    pub fn push(&self, env: &Envelope) -> bool {
        match protocol::encode(env) {
            Ok(s) => self.push_text(s),
            Err(_) => false,
        }
    }

    /// Close from the server side.
    pub fn close(&self, reason: Option<&str>) {
        let _ = self.push.send(LinkEvent::Closed {
            reason: reason.map(String::from),
        });
    }

    /// Next frame written by the client; `None` once the client dropped the link.
    pub async fn next_written(&mut self) -> Option<String> {
        self.written.recv().await
    }

    /// Frames written so far, without waiting.
    pub fn drain_written(&mut self) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(s) = self.written.try_recv() {
            out.push(s);
        }
        out
    }

    /// Next written frame, decoded.
    pub async fn next_envelope(&mut self) -> Option<Envelope> {
        let s = self.next_written().await?;
        protocol::decode(&s).ok()
    }
}
