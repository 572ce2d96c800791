//! Envelope (JSON text frame).
//!
//! `type` is the only mandatory field. Unknown top-level fields are ignored so
//! newer servers can add metadata without breaking older clients; anything
//! nested under `payload` is kept verbatim as a `serde_json::Value`.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{EventLinkError, Result};

/// The unit exchanged over the real-time connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Event discriminator (field name is `type` in JSON).
    #[serde(rename = "type")]
    pub event_type: String,
    /// Opaque payload; `null` when absent.
    #[serde(default)]
    pub payload: Value,
    /// Set by the sender. RFC 3339 or epoch millis on the wire.
    #[serde(default, skip_serializing_if = "Option::is_none", with = "wire_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Correlation id, unique per envelope from a given sender.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Logical scope; `None` means broadcast to all subscribers of the type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
}

impl Envelope {
    /// Build an outbound envelope stamped with a fresh id and the current time.
    pub fn new(event_type: impl Into<String>, payload: Value) -> Self {
        Self {
            event_type: event_type.into(),
            payload,
            timestamp: Some(Utc::now()),
            id: Some(Uuid::new_v4().to_string()),
            room: None,
        }
    }

    /// Scope the envelope to a room.
    pub fn with_room(mut self, room: impl Into<String>) -> Self {
        self.room = Some(room.into());
        self
    }

    pub fn room(&self) -> Option<&str> {
        self.room.as_deref()
    }

    /// Deserialize the payload into a concrete type.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T> {
        T::deserialize(&self.payload).map_err(|e| {
            EventLinkError::Decode(format!("payload of {} does not fit: {e}", self.event_type))
        })
    }
}

/// Serialize an envelope into a text frame.
pub fn encode(env: &Envelope) -> Result<String> {
    if env.event_type.trim().is_empty() {
        return Err(EventLinkError::Encode("envelope type must not be empty".into()));
    }
    serde_json::to_string(env).map_err(|e| EventLinkError::Encode(e.to_string()))
}

/// Decode a text frame.
pub fn decode(s: &str) -> Result<Envelope> {
    let env: Envelope = serde_json::from_str(s)
        .map_err(|e| EventLinkError::Decode(format!("invalid envelope json: {e}")))?;
    validate(env)
}

/// Decode a binary frame carrying UTF-8 JSON.
pub fn decode_bytes(b: &[u8]) -> Result<Envelope> {
    let env: Envelope = serde_json::from_slice(b)
        .map_err(|e| EventLinkError::Decode(format!("invalid envelope json: {e}")))?;
    validate(env)
}

fn validate(env: Envelope) -> Result<Envelope> {
    if env.event_type.trim().is_empty() {
        return Err(EventLinkError::Decode("envelope type must not be empty".into()));
    }
    Ok(env)
}

/// Wire timestamps come from several backends: RFC 3339, naive ISO 8601
/// (read as UTC), integer epoch millis or float epoch seconds. Anything else
/// is treated as absent rather than failing the envelope.
mod wire_timestamp {
    use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Wire {
        Millis(i64),
        Seconds(f64),
        Text(String),
        Other(Value),
    }

    pub fn serialize<S: Serializer>(ts: &Option<DateTime<Utc>>, s: S) -> Result<S::Ok, S::Error> {
        match ts {
            Some(t) => s.serialize_str(&t.to_rfc3339()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw: Option<Wire> = Option::deserialize(d)?;
        let parsed = match raw {
            None => return Ok(None),
            Some(Wire::Millis(ms)) => Utc.timestamp_millis_opt(ms).single(),
            Some(Wire::Seconds(secs)) => Utc.timestamp_millis_opt((secs * 1000.0).round() as i64).single(),
            Some(Wire::Text(s)) => parse_text(&s),
            Some(Wire::Other(v)) => {
                tracing::debug!(timestamp = %v, "unsupported timestamp shape; ignored");
                return Ok(None);
            }
        };
        if parsed.is_none() {
            tracing::debug!("unparseable timestamp; ignored");
        }
        Ok(parsed)
    }

    fn parse_text(s: &str) -> Option<DateTime<Utc>> {
        if let Ok(t) = DateTime::parse_from_rfc3339(s) {
            return Some(t.with_timezone(&Utc));
        }
        s.parse::<NaiveDateTime>().ok().map(|n| n.and_utc())
    }
}
