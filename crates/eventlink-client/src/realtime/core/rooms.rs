/// Rooms the client considers itself joined to, in join order.
///
/// Lives inside the connection's guarded state so that membership changes and
/// the `connected` transition (which replays it) never interleave.
#[derive(Debug, Default, Clone)]
pub struct RoomSet {
    rooms: Vec<String>,
}

impl RoomSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if already joined.
    pub fn insert(&mut self, room: &str) -> bool {
        if self.contains(room) {
            return false;
        }
        self.rooms.push(room.to_string());
        true
    }

    /// Returns `false` if not joined.
    pub fn remove(&mut self, room: &str) -> bool {
        let before = self.rooms.len();
        self.rooms.retain(|r| r != room);
        self.rooms.len() != before
    }

    pub fn contains(&self, room: &str) -> bool {
        self.rooms.iter().any(|r| r == room)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.rooms.iter().map(String::as_str)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.rooms.clone()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    pub fn clear(&mut self) {
        self.rooms.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_is_idempotent_and_ordered() {
        let mut r = RoomSet::new();
        assert!(r.insert("tbl_1"));
        assert!(r.insert("saga_7"));
        assert!(!r.insert("tbl_1"));
        assert_eq!(r.to_vec(), vec!["tbl_1", "saga_7"]);
        assert!(r.remove("tbl_1"));
        assert!(!r.remove("tbl_1"));
        assert_eq!(r.len(), 1);
    }
}
