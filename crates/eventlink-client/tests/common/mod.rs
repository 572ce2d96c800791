//! Shared helpers for client integration tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use eventlink_client::transport::{MemoryConnector, MemoryPeer};
use eventlink_client::{ClientConfig, ConnectionState, RealtimeClient, StaticToken};
use eventlink_core::Envelope;

/// Virtual time under `start_paused`; long enough for a full backoff schedule.
pub const WAIT: Duration = Duration::from_secs(600);

/// Defaults with deterministic (jitter-free) backoff and no pings.
pub fn test_config() -> ClientConfig {
    let mut cfg = ClientConfig::default();
    cfg.reconnect.jitter_ratio = 0.0;
    cfg.transport.ping_interval_ms = 0;
    cfg
}

pub fn client_with(cfg: ClientConfig) -> (RealtimeClient, Arc<MemoryConnector>) {
    let connector = Arc::new(MemoryConnector::new());
    let client = RealtimeClient::new(cfg, connector.clone(), Arc::new(StaticToken::new("tok")));
    (client, connector)
}

pub async fn wait_for_state(client: &RealtimeClient, want: ConnectionState) {
    let mut rx = client.watch_state();
    tokio::time::timeout(WAIT, async {
        loop {
            if *rx.borrow_and_update() == want {
                return;
            }
            rx.changed().await.unwrap();
        }
    })
    .await
    .unwrap_or_else(|_| panic!("state never became {want}; now {}", client.state()));
}

pub async fn next_peer(connector: &MemoryConnector) -> MemoryPeer {
    tokio::time::timeout(WAIT, connector.next_peer())
        .await
        .expect("no connection attempt accepted")
        .expect("connector closed")
}

/// Connect and return the accepted server end once `connected`.
pub async fn connected(client: &RealtimeClient, connector: &MemoryConnector) -> MemoryPeer {
    client.connect().unwrap();
    let peer = next_peer(connector).await;
    wait_for_state(client, ConnectionState::Connected).await;
    peer
}

/// Handler that forwards every delivered envelope to a channel.
pub fn recorder() -> (
    impl Fn(&Envelope) -> eventlink_core::Result<()> + Send + Sync + 'static,
    mpsc::UnboundedReceiver<Envelope>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    let handler = move |env: &Envelope| {
        let _ = tx.send(env.clone());
        Ok(())
    };
    (handler, rx)
}

pub async fn recv(rx: &mut mpsc::UnboundedReceiver<Envelope>) -> Envelope {
    tokio::time::timeout(WAIT, rx.recv())
        .await
        .expect("handler never invoked")
        .expect("recorder dropped")
}

/// Written frames decoded, without waiting.
pub fn written(peer: &mut MemoryPeer) -> Vec<Envelope> {
    peer.drain_written()
        .iter()
        .map(|s| eventlink_core::protocol::decode(s).unwrap())
        .collect()
}

/// Let spawned tasks run to their next await point.
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}
