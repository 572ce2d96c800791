//! Connection manager: owns the link, the state machine, room membership and
//! the opt-in outbound queue.
//!
//! All mutable connection state sits behind one mutex (`LinkState`). The
//! driver task and the public API both go through it, which is what makes
//! "replay rooms on connect" and "join while connected" impossible to
//! interleave into duplicate or missing `join_room` frames.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use eventlink_core::error::{EventLinkError, Result};
use eventlink_core::protocol::{self, join_room, leave_room, Envelope};

use crate::auth::TokenProvider;
use crate::config::{ClientConfig, SendPolicy};
use crate::connection::backoff::Backoff;
use crate::connection::driver;
use crate::connection::ConnectionState;
use crate::dispatch::Dispatcher;
use crate::realtime::RoomSet;
use crate::transport::{ConnectRequest, Connector};

pub(crate) struct LinkState {
    state: ConnectionState,
    /// Bumped by `connect()` and `disconnect()`; a driver only acts while its
    /// epoch is current.
    epoch: u64,
    outbound: Option<mpsc::UnboundedSender<String>>,
    rooms: RoomSet,
    queue: VecDeque<Envelope>,
    /// Consecutive failed cycles since the last `connected`.
    attempt: u32,
}

pub(crate) struct Inner {
    pub(crate) cfg: ClientConfig,
    pub(crate) connector: Arc<dyn Connector>,
    pub(crate) tokens: Arc<dyn TokenProvider>,
    pub(crate) dispatcher: Arc<Dispatcher>,
    pub(crate) backoff: Backoff,
    link: Mutex<LinkState>,
    state_tx: watch::Sender<ConnectionState>,
    driver: Mutex<Option<JoinHandle<()>>>,
}

/// Cloneable handle to one logical connection.
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<Inner>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

impl ConnectionManager {
    pub fn new(
        cfg: ClientConfig,
        connector: Arc<dyn Connector>,
        tokens: Arc<dyn TokenProvider>,
        dispatcher: Arc<Dispatcher>,
    ) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        let backoff = Backoff::from_config(&cfg.reconnect);
        Self {
            inner: Arc::new(Inner {
                cfg,
                connector,
                tokens,
                dispatcher,
                backoff,
                link: Mutex::new(LinkState {
                    state: ConnectionState::Disconnected,
                    epoch: 0,
                    outbound: None,
                    rooms: RoomSet::new(),
                    queue: VecDeque::new(),
                    attempt: 0,
                }),
                state_tx,
                driver: Mutex::new(None),
            }),
        }
    }

    /// Start connecting. No-op while a driver is already running.
    ///
    /// Only a missing token or a missing tokio runtime are reported here;
    /// network and auth failures show up as state transitions.
    pub fn connect(&self) -> Result<()> {
        if self.state().is_active() {
            return Ok(());
        }

        // The provider is external code; never call it under the link lock.
        let token = self.inner.tokens.token()?;
        let rt = tokio::runtime::Handle::try_current().map_err(|_| EventLinkError::NoRuntime)?;

        let mut ls = lock(&self.inner.link);
        if ls.state.is_active() {
            return Ok(());
        }
        ls.epoch += 1;
        ls.attempt = 0;
        let epoch = ls.epoch;
        self.inner.set_state(&mut ls, ConnectionState::Connecting);
        drop(ls);

        tracing::info!(url = %self.inner.cfg.connection.url, "connecting");
        let task = rt.spawn(driver::run(Arc::clone(&self.inner), epoch, token));
        if let Some(old) = lock(&self.inner.driver).replace(task) {
            old.abort();
        }
        Ok(())
    }

    /// Close the link, forget rooms and queued envelopes, cancel any pending
    /// reconnect. Never auto-reconnects.
    pub fn disconnect(&self) {
        let mut ls = lock(&self.inner.link);
        ls.epoch += 1;
        ls.outbound = None;
        ls.rooms.clear();
        ls.queue.clear();
        ls.attempt = 0;
        self.inner.set_state(&mut ls, ConnectionState::Disconnected);
        drop(ls);

        if let Some(task) = lock(&self.inner.driver).take() {
            task.abort();
        }
        self.inner.dispatcher.registry().set_live(false);
        self.inner.dispatcher.presence().clear();
        tracing::info!("disconnected");
    }

    /// `true` iff the envelope was handed to the transport while connected.
    pub fn send(&self, env: &Envelope) -> bool {
        let mut ls = lock(&self.inner.link);
        if ls.state.is_connected() {
            if let Some(tx) = &ls.outbound {
                return self.inner.write(tx, env);
            }
        }

        if self.inner.cfg.send.policy == SendPolicy::Queue {
            if ls.queue.len() >= self.inner.cfg.send.max_queued {
                if let Some(evicted) = ls.queue.pop_front() {
                    tracing::warn!(event_type = %evicted.event_type, "send queue full; evicting oldest");
                }
            }
            ls.queue.push_back(env.clone());
        } else {
            tracing::debug!(event_type = %env.event_type, state = %ls.state, "send while not connected; dropped");
        }
        false
    }

    pub fn join(&self, room: &str) {
        let mut ls = lock(&self.inner.link);
        if !ls.rooms.insert(room) {
            return;
        }
        if ls.state.is_connected() {
            if let Some(tx) = &ls.outbound {
                self.inner.write(tx, &join_room(room));
            }
        }
        tracing::debug!(room, "joined");
    }

    pub fn leave(&self, room: &str) {
        let mut ls = lock(&self.inner.link);
        if !ls.rooms.remove(room) {
            return;
        }
        if ls.state.is_connected() {
            if let Some(tx) = &ls.outbound {
                self.inner.write(tx, &leave_room(room));
            }
        }
        tracing::debug!(room, "left");
    }

    pub fn rooms(&self) -> Vec<String> {
        lock(&self.inner.link).rooms.to_vec()
    }

    pub fn state(&self) -> ConnectionState {
        lock(&self.inner.link).state
    }

    /// Stream of state transitions.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state_tx.subscribe()
    }

    /// Consecutive failed cycles since the last successful connect.
    pub fn reconnect_attempt(&self) -> u32 {
        lock(&self.inner.link).attempt
    }

    pub fn queued(&self) -> usize {
        lock(&self.inner.link).queue.len()
    }
}

/// Outcome of a backoff decision.
pub(crate) enum Retry {
    After(std::time::Duration),
    GiveUp,
    Stale,
}

impl Inner {
    fn set_state(&self, ls: &mut LinkState, next: ConnectionState) {
        if ls.state != next {
            tracing::debug!(from = %ls.state, to = %next, "connection state");
        }
        ls.state = next;
        self.state_tx.send_replace(next);
    }

    /// Whether a driver started under `epoch` may still act.
    pub(crate) fn is_current(&self, epoch: u64) -> bool {
        lock(&self.link).epoch == epoch
    }

    fn write(&self, tx: &mpsc::UnboundedSender<String>, env: &Envelope) -> bool {
        let text = match protocol::encode(env) {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(event_type = %env.event_type, error = %e, "refusing to send envelope");
                return false;
            }
        };
        if tx.send(text).is_err() {
            return false;
        }
        self.dispatcher.stats().record_sent();
        true
    }

    pub(crate) fn connect_request(&self, token: String) -> ConnectRequest {
        let c = &self.cfg.connection;
        let ping = self.cfg.transport.ping_interval_ms;
        ConnectRequest {
            url: c.url.clone(),
            token,
            token_query_param: c.token_query_param.clone(),
            ping_interval: (ping > 0).then(|| std::time::Duration::from_millis(ping)),
        }
    }

    /// Transition into `connected`: install the link, replay rooms, mark the
    /// registry live, flush queued sends. `false` if the driver is stale.
    pub(crate) fn on_connected(
        &self,
        epoch: u64,
        outbound: mpsc::UnboundedSender<String>,
    ) -> bool {
        let mut ls = lock(&self.link);
        if ls.epoch != epoch {
            return false;
        }
        ls.attempt = 0;
        self.set_state(&mut ls, ConnectionState::Connected);

        for room in ls.rooms.iter() {
            self.write(&outbound, &join_room(room));
        }
        self.dispatcher.registry().set_live(true);

        let queued: Vec<Envelope> = ls.queue.drain(..).collect();
        for env in &queued {
            self.write(&outbound, env);
        }

        tracing::info!(rooms = ls.rooms.len(), flushed = queued.len(), "connected");
        ls.outbound = Some(outbound);
        true
    }

    /// The link went away without `disconnect()`. `false` if the driver is stale.
    pub(crate) fn on_link_lost(&self, epoch: u64, reason: Option<&str>) -> bool {
        let mut ls = lock(&self.link);
        if ls.epoch != epoch {
            return false;
        }
        ls.outbound = None;
        self.dispatcher.registry().set_live(false);
        self.dispatcher.presence().clear();
        self.set_state(&mut ls, ConnectionState::Reconnecting);
        tracing::warn!(reason = ?reason, "connection lost");
        true
    }

    /// Decide the next step after a failed or lost connection.
    pub(crate) fn next_retry(&self, epoch: u64) -> Retry {
        let mut ls = lock(&self.link);
        if ls.epoch != epoch {
            return Retry::Stale;
        }
        let max = self.cfg.reconnect.max_attempts;
        if max > 0 && ls.attempt >= max {
            ls.outbound = None;
            self.set_state(&mut ls, ConnectionState::Error);
            tracing::error!(max_attempts = max, "reconnect attempts exhausted");
            return Retry::GiveUp;
        }
        let delay = self.backoff.delay(ls.attempt);
        ls.attempt += 1;
        self.dispatcher.stats().record_reconnect_attempt();
        self.set_state(&mut ls, ConnectionState::Reconnecting);
        tracing::info!(attempt = ls.attempt, delay_ms = delay.as_millis() as u64, "reconnecting");
        Retry::After(delay)
    }

    /// Backoff elapsed: `reconnecting -> connecting`.
    pub(crate) fn begin_attempt(&self, epoch: u64) -> bool {
        let mut ls = lock(&self.link);
        if ls.epoch != epoch {
            return false;
        }
        self.set_state(&mut ls, ConnectionState::Connecting);
        true
    }
}
