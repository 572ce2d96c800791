//! Subscription registry: event type (+ optional room) -> ordered handlers.
//!
//! The registry is owned by the client, not the socket, so handlers survive
//! reconnects untouched.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use eventlink_core::error::Result;
use eventlink_core::protocol::Envelope;

/// Subscriber callback. Errors and panics are contained by the dispatcher.
pub type Handler = Arc<dyn Fn(&Envelope) -> Result<()> + Send + Sync>;

/// Opaque removal handle returned by `subscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(u64);

impl SubscriptionHandle {
    pub fn id(self) -> u64 {
        self.0
    }
}

#[derive(Clone)]
struct Entry {
    id: u64,
    room: Option<String>,
    handler: Handler,
}

pub struct SubscriptionRegistry {
    by_type: DashMap<String, Vec<Entry>>,
    /// handle id -> event type, for O(1) unsubscribe.
    index: DashMap<u64, String>,
    next_id: AtomicU64,
    live: AtomicBool,
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self {
            by_type: DashMap::new(),
            index: DashMap::new(),
            next_id: AtomicU64::new(1),
            live: AtomicBool::new(false),
        }
    }

    pub fn subscribe(&self, event_type: &str, room: Option<&str>, handler: Handler) -> SubscriptionHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.index.insert(id, event_type.to_string());
        self.by_type
            .entry(event_type.to_string())
            .or_default()
            .push(Entry {
                id,
                room: room.map(String::from),
                handler,
            });
        tracing::debug!(event_type, room = ?room, handle = id, "subscribed");
        SubscriptionHandle(id)
    }

    /// Remove exactly one registration. Unknown handles are ignored.
    pub fn unsubscribe(&self, handle: SubscriptionHandle) {
        let Some((_, event_type)) = self.index.remove(&handle.0) else {
            return;
        };
        if let Some(mut list) = self.by_type.get_mut(&event_type) {
            list.retain(|e| e.id != handle.0);
            if list.is_empty() {
                drop(list);
                self.by_type.remove_if(&event_type, |_, l| l.is_empty());
            }
        }
    }

    /// Remove every registration for a type. Returns how many were removed.
    pub fn unsubscribe_all(&self, event_type: &str) -> usize {
        let Some((_, list)) = self.by_type.remove(event_type) else {
            return 0;
        };
        for e in &list {
            self.index.remove(&e.id);
        }
        list.len()
    }

    /// Handlers matching `(event_type, room)`, in registration order.
    ///
    /// Room-agnostic registrations always match; scoped ones only match the
    /// same room. The returned snapshot is detached from the registry.
    pub fn matching(&self, event_type: &str, room: Option<&str>) -> Vec<Handler> {
        let Some(list) = self.by_type.get(event_type) else {
            return Vec::new();
        };
        list.iter()
            .filter(|e| match (&e.room, room) {
                (None, _) => true,
                (Some(want), Some(got)) => want == got,
                (Some(_), None) => false,
            })
            .map(|e| Arc::clone(&e.handler))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn set_live(&self, live: bool) {
        self.live.store(live, Ordering::SeqCst);
    }

    /// True while a connection is up. Informational only.
    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }
}
