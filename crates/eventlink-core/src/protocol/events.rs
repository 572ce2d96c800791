//! Conventional event vocabulary.
//!
//! The transport itself treats `type` as an open string namespace. Dashboard
//! frontends agree on a handful of names, modelled here as a closed union so
//! handlers can match on typed payloads instead of poking at raw JSON.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;
use crate::protocol::envelope::Envelope;

/// Well-known event type names.
pub mod types {
    pub const RECORD_CREATED: &str = "record:created";
    pub const RECORD_UPDATED: &str = "record:updated";
    pub const RECORD_DELETED: &str = "record:deleted";
    pub const CHAT_MESSAGE: &str = "chat.message";
    pub const CHAT_STREAM: &str = "chat.stream";
    pub const JOIN_ROOM: &str = "join_room";
    pub const LEAVE_ROOM: &str = "leave_room";
    pub const REALTIME_UPDATE: &str = "realtime_update";
    pub const PRESENCE: &str = "presence";
}

/// Payload of `record:*` events (Airtable gateway / event store).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordChange {
    pub id: String,
    #[serde(default, alias = "tableId", skip_serializing_if = "Option::is_none")]
    pub table_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Map<String, Value>>,
}

/// Payload of `chat.message`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default, alias = "sessionId", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    pub content: String,
}

/// Payload of `chat.stream` (one token chunk of an assistant reply).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatStream {
    #[serde(default, alias = "messageId", skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(alias = "token")]
    pub delta: String,
    #[serde(default)]
    pub done: bool,
}

/// Payload of `join_room` / `leave_room`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomRequest {
    pub room: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    #[serde(alias = "joined")]
    Online,
    #[serde(alias = "left")]
    Offline,
}

/// Payload of `presence`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceUpdate {
    #[serde(alias = "user_id", alias = "userId")]
    pub peer: String,
    pub status: PresenceStatus,
}

/// Closed union of the conventional dashboard events.
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardEvent {
    RecordCreated(RecordChange),
    RecordUpdated(RecordChange),
    RecordDeleted(RecordChange),
    ChatMessage(ChatMessage),
    ChatStream(ChatStream),
    JoinRoom(RoomRequest),
    LeaveRoom(RoomRequest),
    Presence(PresenceUpdate),
    /// Projection/SAGA updates are free-form.
    RealtimeUpdate(Value),
}

impl DashboardEvent {
    /// Map an envelope into the vocabulary.
    ///
    /// `Ok(None)` for types outside the vocabulary; `Err` when a known type
    /// carries a payload of the wrong shape.
    pub fn from_envelope(env: &Envelope) -> Result<Option<Self>> {
        let ev = match env.event_type.as_str() {
            types::RECORD_CREATED => DashboardEvent::RecordCreated(env.payload_as()?),
            types::RECORD_UPDATED => DashboardEvent::RecordUpdated(env.payload_as()?),
            types::RECORD_DELETED => DashboardEvent::RecordDeleted(env.payload_as()?),
            types::CHAT_MESSAGE => DashboardEvent::ChatMessage(env.payload_as()?),
            types::CHAT_STREAM => DashboardEvent::ChatStream(env.payload_as()?),
            types::JOIN_ROOM => DashboardEvent::JoinRoom(env.payload_as()?),
            types::LEAVE_ROOM => DashboardEvent::LeaveRoom(env.payload_as()?),
            types::PRESENCE => DashboardEvent::Presence(env.payload_as()?),
            types::REALTIME_UPDATE => DashboardEvent::RealtimeUpdate(env.payload.clone()),
            _ => return Ok(None),
        };
        Ok(Some(ev))
    }

    /// Wire name of this event.
    pub fn event_type(&self) -> &'static str {
        match self {
            DashboardEvent::RecordCreated(_) => types::RECORD_CREATED,
            DashboardEvent::RecordUpdated(_) => types::RECORD_UPDATED,
            DashboardEvent::RecordDeleted(_) => types::RECORD_DELETED,
            DashboardEvent::ChatMessage(_) => types::CHAT_MESSAGE,
            DashboardEvent::ChatStream(_) => types::CHAT_STREAM,
            DashboardEvent::JoinRoom(_) => types::JOIN_ROOM,
            DashboardEvent::LeaveRoom(_) => types::LEAVE_ROOM,
            DashboardEvent::Presence(_) => types::PRESENCE,
            DashboardEvent::RealtimeUpdate(_) => types::REALTIME_UPDATE,
        }
    }
}

/// Build the `join_room` envelope for a room.
pub fn join_room(room: &str) -> Envelope {
    room_envelope(types::JOIN_ROOM, room)
}

/// Build the `leave_room` envelope for a room.
pub fn leave_room(room: &str) -> Envelope {
    room_envelope(types::LEAVE_ROOM, room)
}

fn room_envelope(event_type: &str, room: &str) -> Envelope {
    Envelope::new(event_type, serde_json::json!({ "room": room })).with_room(room)
}
