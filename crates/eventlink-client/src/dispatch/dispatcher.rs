use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use eventlink_core::protocol::{self, Envelope};

use crate::obs::Stats;
use crate::realtime::{Presence, SubscriptionRegistry};

/// Fans decoded envelopes out to matching subscribers.
///
/// Handlers run synchronously in registration order. A failing or panicking
/// handler is logged and counted; the rest still run and nothing reaches the
/// receive loop.
pub struct Dispatcher {
    registry: Arc<SubscriptionRegistry>,
    presence: Arc<Presence>,
    stats: Arc<Stats>,
    presence_type: String,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<SubscriptionRegistry>,
        presence: Arc<Presence>,
        stats: Arc<Stats>,
        presence_type: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            presence,
            stats,
            presence_type: presence_type.into(),
        }
    }

    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.registry
    }

    pub fn presence(&self) -> &Arc<Presence> {
        &self.presence
    }

    pub fn stats(&self) -> &Arc<Stats> {
        &self.stats
    }

    /// Dispatch one envelope. Returns the number of handlers that completed OK.
    pub fn dispatch(&self, env: &Envelope) -> usize {
        self.stats.record_received();

        if env.event_type == self.presence_type {
            if let Err(e) = self.presence.apply(env) {
                tracing::debug!(event_type = %env.event_type, error = %e, "presence update ignored");
            }
        }

        let handlers = self.registry.matching(&env.event_type, env.room());
        if handlers.is_empty() {
            tracing::trace!(event_type = %env.event_type, room = ?env.room(), "no subscribers; dropped");
            return 0;
        }

        let mut delivered = 0;
        for handler in handlers {
            match panic::catch_unwind(AssertUnwindSafe(|| handler(env))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(e)) => {
                    self.stats.record_handler_error();
                    tracing::warn!(event_type = %env.event_type, room = ?env.room(), error = %e, "handler failed");
                }
                Err(_) => {
                    self.stats.record_handler_error();
                    tracing::error!(event_type = %env.event_type, room = ?env.room(), "handler panicked");
                }
            }
        }
        delivered
    }

    /// Decode a raw text frame and dispatch it. Malformed frames are dropped.
    pub fn dispatch_text(&self, frame: &str) -> usize {
        match protocol::decode(frame) {
            Ok(env) => self.dispatch(&env),
            Err(e) => {
                self.record_decode_error(&e);
                0
            }
        }
    }

    pub(crate) fn record_decode_error(&self, e: &eventlink_core::EventLinkError) {
        self.stats.record_decode_error();
        tracing::warn!(error = %e, "dropping malformed frame");
    }
}
