use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::connection::ConnectionState;

/// Monotonic client counters. Reset only by an explicit `reset`.
#[derive(Default)]
pub struct Stats {
    messages_sent: AtomicU64,
    messages_received: AtomicU64,
    reconnect_attempts: AtomicU64,
    decode_errors: AtomicU64,
    handler_errors: AtomicU64,
}

/// Point-in-time copy of `Stats`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub messages_sent: u64,
    pub messages_received: u64,
    pub reconnect_attempts: u64,
    pub decode_errors: u64,
    pub handler_errors: u64,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_sent(&self) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
    }
    pub fn record_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }
    pub fn record_reconnect_attempt(&self) {
        self.reconnect_attempts.fetch_add(1, Ordering::Relaxed);
    }
    pub fn record_decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }
    pub fn record_handler_error(&self) {
        self.handler_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            reconnect_attempts: self.reconnect_attempts.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            handler_errors: self.handler_errors.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        self.messages_sent.store(0, Ordering::Relaxed);
        self.messages_received.store(0, Ordering::Relaxed);
        self.reconnect_attempts.store(0, Ordering::Relaxed);
        self.decode_errors.store(0, Ordering::Relaxed);
        self.handler_errors.store(0, Ordering::Relaxed);
    }

    /// Render counters, current state and peer count in Prometheus text format.
    pub fn render(&self, state: ConnectionState, known_peers: usize) -> String {
        let s = self.snapshot();
        let mut out = String::new();
        for (name, v) in [
            ("eventlink_messages_sent_total", s.messages_sent),
            ("eventlink_messages_received_total", s.messages_received),
            ("eventlink_reconnect_attempts_total", s.reconnect_attempts),
            ("eventlink_decode_errors_total", s.decode_errors),
            ("eventlink_handler_errors_total", s.handler_errors),
        ] {
            let _ = writeln!(out, "# TYPE {name} counter\n{name} {v}");
        }
        let _ = writeln!(out, "# TYPE eventlink_known_peers gauge\neventlink_known_peers {known_peers}");
        let _ = writeln!(out, "# TYPE eventlink_connection_state gauge");
        for candidate in [
            ConnectionState::Disconnected,
            ConnectionState::Connecting,
            ConnectionState::Connected,
            ConnectionState::Reconnecting,
            ConnectionState::Error,
        ] {
            let on = if candidate == state { 1 } else { 0 };
            let _ = writeln!(out, "eventlink_connection_state{{state=\"{candidate}\"}} {on}");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_zeroes_every_counter() {
        let s = Stats::new();
        s.record_sent();
        s.record_received();
        s.record_received();
        s.record_reconnect_attempt();
        assert_eq!(s.snapshot().messages_received, 2);
        s.reset();
        assert_eq!(s.snapshot(), StatsSnapshot::default());
    }

    #[test]
    fn render_marks_current_state() {
        let s = Stats::new();
        s.record_sent();
        let text = s.render(ConnectionState::Reconnecting, 3);
        assert!(text.contains("eventlink_messages_sent_total 1"));
        assert!(text.contains("eventlink_known_peers 3"));
        assert!(text.contains("eventlink_connection_state{state=\"reconnecting\"} 1"));
        assert!(text.contains("eventlink_connection_state{state=\"connected\"} 0"));
    }
}
