//! Protocol modules.
//!
//! - `envelope`: the JSON wire unit and its encode/decode contract.
//! - `events`: the conventional event vocabulary as a closed tagged union.
//!
//! Decoding never panics: malformed input is reported as `EventLinkError`.

pub mod envelope;
pub mod events;

pub use envelope::{decode, decode_bytes, encode, Envelope};
pub use events::{join_room, leave_room, types, ChatMessage, ChatStream, DashboardEvent, PresenceStatus, PresenceUpdate, RecordChange, RoomRequest};
