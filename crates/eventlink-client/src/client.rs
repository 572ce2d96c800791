//! Consumer-facing client.
//!
//! One `RealtimeClient` is one logical session: a single physical connection
//! multiplexed across any number of subscribers and rooms. It is an explicit
//! value built from injected config, connector and token provider; clone it
//! to share it between components.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::watch;

use eventlink_core::error::Result;
use eventlink_core::protocol::Envelope;

use crate::auth::TokenProvider;
use crate::config::ClientConfig;
use crate::connection::{ConnectionManager, ConnectionState};
use crate::dispatch::Dispatcher;
use crate::obs::{Stats, StatsSnapshot};
use crate::realtime::{Handler, Presence, SubscriptionHandle, SubscriptionRegistry};
use crate::transport::{Connector, WsConnector};

#[derive(Clone)]
pub struct RealtimeClient {
    conn: ConnectionManager,
    dispatcher: Arc<Dispatcher>,
}

impl RealtimeClient {
    /// Build a client over an arbitrary connector.
    pub fn new(cfg: ClientConfig, connector: Arc<dyn Connector>, tokens: Arc<dyn TokenProvider>) -> Self {
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::new(SubscriptionRegistry::new()),
            Arc::new(Presence::new()),
            Arc::new(Stats::new()),
            cfg.presence.event_type.clone(),
        ));
        let conn = ConnectionManager::new(cfg, connector, tokens, Arc::clone(&dispatcher));
        Self { conn, dispatcher }
    }

    /// Build a client over WebSocket.
    pub fn websocket(cfg: ClientConfig, tokens: Arc<dyn TokenProvider>) -> Self {
        Self::new(cfg, Arc::new(WsConnector::new()), tokens)
    }

    // ---- connection

    pub fn connect(&self) -> Result<()> {
        self.conn.connect()
    }

    pub fn disconnect(&self) {
        self.conn.disconnect()
    }

    /// `true` iff handed to the transport while connected.
    pub fn send(&self, env: &Envelope) -> bool {
        self.conn.send(env)
    }

    /// Build and send an envelope (fresh id, current timestamp).
    pub fn emit(&self, event_type: &str, payload: Value, room: Option<&str>) -> bool {
        let mut env = Envelope::new(event_type, payload);
        env.room = room.map(String::from);
        self.conn.send(&env)
    }

    pub fn state(&self) -> ConnectionState {
        self.conn.state()
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.conn.watch_state()
    }

    /// Consecutive failed reconnect cycles since the last successful connect.
    pub fn reconnect_attempt(&self) -> u32 {
        self.conn.reconnect_attempt()
    }

    /// Envelopes held by the `queue` send policy.
    pub fn queued(&self) -> usize {
        self.conn.queued()
    }

    // ---- rooms

    pub fn join(&self, room: &str) {
        self.conn.join(room)
    }

    pub fn leave(&self, room: &str) {
        self.conn.leave(room)
    }

    pub fn rooms(&self) -> Vec<String> {
        self.conn.rooms()
    }

    // ---- subscriptions

    /// Register `handler` for `event_type`, optionally scoped to `room`.
    pub fn subscribe<F>(&self, event_type: &str, room: Option<&str>, handler: F) -> SubscriptionHandle
    where
        F: Fn(&Envelope) -> Result<()> + Send + Sync + 'static,
    {
        let handler: Handler = Arc::new(handler);
        self.dispatcher.registry().subscribe(event_type, room, handler)
    }

    /// Like `subscribe`, with the payload decoded into `T` before the handler runs.
    /// A payload that does not fit `T` counts as a handler error.
    pub fn subscribe_typed<T, F>(&self, event_type: &str, room: Option<&str>, handler: F) -> SubscriptionHandle
    where
        T: DeserializeOwned + 'static,
        F: Fn(&Envelope, T) -> Result<()> + Send + Sync + 'static,
    {
        self.subscribe(event_type, room, move |env: &Envelope| {
            let payload: T = env.payload_as()?;
            handler(env, payload)
        })
    }

    pub fn unsubscribe(&self, handle: SubscriptionHandle) {
        self.dispatcher.registry().unsubscribe(handle)
    }

    pub fn unsubscribe_all(&self, event_type: &str) -> usize {
        self.dispatcher.registry().unsubscribe_all(event_type)
    }

    /// True while connected. Informational only.
    pub fn is_live(&self) -> bool {
        self.dispatcher.registry().is_live()
    }

    // ---- diagnostics

    pub fn stats(&self) -> StatsSnapshot {
        self.dispatcher.stats().snapshot()
    }

    pub fn reset_stats(&self) {
        self.dispatcher.stats().reset()
    }

    /// Known peers in a room (`None` = no-room scope). Best effort.
    pub fn peers(&self, room: Option<&str>) -> Vec<String> {
        self.dispatcher.presence().peers(room)
    }

    /// Prometheus-style text for status panels.
    pub fn render_stats(&self) -> String {
        self.dispatcher
            .stats()
            .render(self.state(), self.dispatcher.presence().peer_count())
    }

    /// Direct access to the dispatcher, e.g. to inject frames from another source.
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }
}
