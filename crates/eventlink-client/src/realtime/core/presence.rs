use dashmap::{DashMap, DashSet};

use eventlink_core::error::Result;
use eventlink_core::protocol::{Envelope, PresenceStatus, PresenceUpdate};

/// Scope key for presence events without a room.
const GLOBAL_SCOPE: &str = "";

/// Best-effort peer presence: scope -> peers, peer -> scopes.
///
/// Inferred from `presence` events only; never authoritative.
#[derive(Default)]
pub struct Presence {
    scope_to_peers: DashMap<String, DashSet<String>>,
    peer_to_scopes: DashMap<String, DashSet<String>>,
}

impl Presence {
    pub fn new() -> Self {
        Self {
            scope_to_peers: DashMap::new(),
            peer_to_scopes: DashMap::new(),
        }
    }

    /// Fold one presence envelope into the view.
    pub fn apply(&self, env: &Envelope) -> Result<()> {
        let update: PresenceUpdate = env.payload_as()?;
        let scope = env.room().unwrap_or(GLOBAL_SCOPE);
        match update.status {
            PresenceStatus::Online => self.join(scope, &update.peer),
            PresenceStatus::Offline => self.leave(scope, &update.peer),
        }
        Ok(())
    }

    pub fn join(&self, scope: &str, peer: &str) {
        self.scope_to_peers
            .entry(scope.to_string())
            .or_insert_with(DashSet::new)
            .insert(peer.to_string());

        self.peer_to_scopes
            .entry(peer.to_string())
            .or_insert_with(DashSet::new)
            .insert(scope.to_string());
    }

    pub fn leave(&self, scope: &str, peer: &str) {
        if let Some(set) = self.scope_to_peers.get(scope) {
            set.remove(peer);
            if set.is_empty() {
                drop(set);
                self.scope_to_peers.remove_if(scope, |_, s| s.is_empty());
            }
        }
        if let Some(set) = self.peer_to_scopes.get(peer) {
            set.remove(scope);
            if set.is_empty() {
                drop(set);
                self.peer_to_scopes.remove_if(peer, |_, s| s.is_empty());
            }
        }
    }

    /// Known peers in a room (`None` = no-room scope), sorted.
    pub fn peers(&self, room: Option<&str>) -> Vec<String> {
        let mut out: Vec<String> = self
            .scope_to_peers
            .get(room.unwrap_or(GLOBAL_SCOPE))
            .map(|set| set.iter().map(|p| p.key().to_string()).collect())
            .unwrap_or_default();
        out.sort();
        out
    }

    /// Distinct peers across all scopes.
    pub fn peer_count(&self) -> usize {
        self.peer_to_scopes.len()
    }

    pub fn clear(&self) {
        self.scope_to_peers.clear();
        self.peer_to_scopes.clear();
    }
}
