use std::time::Duration;

use serde::Deserialize;
use eventlink_core::error::{EventLinkError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    pub version: u32,

    #[serde(default)]
    pub connection: ConnectionSection,

    #[serde(default)]
    pub reconnect: ReconnectSection,

    #[serde(default)]
    pub send: SendSection,

    #[serde(default)]
    pub transport: TransportSection,

    #[serde(default)]
    pub presence: PresenceSection,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            version: 1,
            connection: ConnectionSection::default(),
            reconnect: ReconnectSection::default(),
            send: SendSection::default(),
            transport: TransportSection::default(),
            presence: PresenceSection::default(),
        }
    }
}

impl ClientConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(EventLinkError::UnsupportedVersion);
        }
        self.connection.validate()?;
        self.reconnect.validate()?;
        self.send.validate()?;
        self.transport.validate()?;
        self.presence.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionSection {
    #[serde(default = "default_url")]
    pub url: String,

    /// Also pass the token as this query parameter (for servers that cannot
    /// read upgrade headers).
    #[serde(default)]
    pub token_query_param: Option<String>,

    /// Envelope type the server sends once the token is accepted. When unset,
    /// an open socket counts as authenticated.
    #[serde(default)]
    pub auth_ack_type: Option<String>,

    #[serde(default = "default_handshake_timeout_ms")]
    pub handshake_timeout_ms: u64,
}

impl Default for ConnectionSection {
    fn default() -> Self {
        Self {
            url: default_url(),
            token_query_param: None,
            auth_ack_type: None,
            handshake_timeout_ms: default_handshake_timeout_ms(),
        }
    }
}

impl ConnectionSection {
    pub fn validate(&self) -> Result<()> {
        if !(self.url.starts_with("ws://") || self.url.starts_with("wss://")) {
            return Err(EventLinkError::Config(
                "connection.url must start with ws:// or wss://".into(),
            ));
        }
        if matches!(&self.token_query_param, Some(p) if p.trim().is_empty()) {
            return Err(EventLinkError::Config(
                "connection.token_query_param must not be empty".into(),
            ));
        }
        if matches!(&self.auth_ack_type, Some(t) if t.trim().is_empty()) {
            return Err(EventLinkError::Config(
                "connection.auth_ack_type must not be empty".into(),
            ));
        }
        if !(100..=60000).contains(&self.handshake_timeout_ms) {
            return Err(EventLinkError::Config(
                "connection.handshake_timeout_ms must be between 100 and 60000".into(),
            ));
        }
        Ok(())
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReconnectSection {
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Upper bound of the random extra delay, as a fraction of the nominal delay.
    #[serde(default = "default_jitter_ratio")]
    pub jitter_ratio: f64,

    /// 0 retries forever.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for ReconnectSection {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter_ratio: default_jitter_ratio(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl ReconnectSection {
    pub fn validate(&self) -> Result<()> {
        if self.base_delay_ms == 0 {
            return Err(EventLinkError::Config(
                "reconnect.base_delay_ms must be greater than 0".into(),
            ));
        }
        if self.max_delay_ms < self.base_delay_ms {
            return Err(EventLinkError::Config(
                "reconnect.max_delay_ms must be >= base_delay_ms".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.jitter_ratio) {
            return Err(EventLinkError::Config(
                "reconnect.jitter_ratio must be between 0.0 and 1.0".into(),
            ));
        }
        Ok(())
    }
}

/// What `send()` does with envelopes while not connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SendPolicy {
    /// Reject; the caller sees `false`.
    #[default]
    Drop,
    /// Hold in a bounded FIFO and flush on the next `connected` transition.
    Queue,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendSection {
    #[serde(default)]
    pub policy: SendPolicy,

    #[serde(default = "default_max_queued")]
    pub max_queued: usize,
}

impl Default for SendSection {
    fn default() -> Self {
        Self {
            policy: SendPolicy::default(),
            max_queued: default_max_queued(),
        }
    }
}

impl SendSection {
    pub fn validate(&self) -> Result<()> {
        if self.policy == SendPolicy::Queue && self.max_queued == 0 {
            return Err(EventLinkError::Config(
                "send.max_queued must be greater than 0 when policy is queue".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransportSection {
    /// WebSocket ping cadence; 0 disables pings.
    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,
}

impl Default for TransportSection {
    fn default() -> Self {
        Self {
            ping_interval_ms: default_ping_interval_ms(),
        }
    }
}

impl TransportSection {
    pub fn validate(&self) -> Result<()> {
        if self.ping_interval_ms != 0 && !(1000..=120000).contains(&self.ping_interval_ms) {
            return Err(EventLinkError::Config(
                "transport.ping_interval_ms must be 0 or between 1000 and 120000".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PresenceSection {
    #[serde(default = "default_presence_event_type")]
    pub event_type: String,
}

impl Default for PresenceSection {
    fn default() -> Self {
        Self {
            event_type: default_presence_event_type(),
        }
    }
}

impl PresenceSection {
    pub fn validate(&self) -> Result<()> {
        if self.event_type.trim().is_empty() {
            return Err(EventLinkError::Config(
                "presence.event_type must not be empty".into(),
            ));
        }
        Ok(())
    }
}

fn default_url() -> String {
    "ws://localhost:8000/ws".into()
}
fn default_handshake_timeout_ms() -> u64 {
    10000
}
fn default_base_delay_ms() -> u64 {
    1000
}
fn default_max_delay_ms() -> u64 {
    30000
}
fn default_jitter_ratio() -> f64 {
    0.25
}
fn default_max_attempts() -> u32 {
    10
}
fn default_max_queued() -> usize {
    256
}
fn default_ping_interval_ms() -> u64 {
    20000
}
fn default_presence_event_type() -> String {
    eventlink_core::protocol::types::PRESENCE.into()
}
