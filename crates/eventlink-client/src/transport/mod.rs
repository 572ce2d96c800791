//! Transport layer.
//!
//! A `Connector` turns a `ConnectRequest` into a `Link`: an outbound text
//! sink and an inbound event stream. The connection driver only ever talks to
//! a `Link`, so the WebSocket implementation and the in-process one used by
//! tests are interchangeable.

pub mod codec;
pub mod memory;
pub mod ws;

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use eventlink_core::error::Result;

pub use memory::{MemoryConnector, MemoryPeer};
pub use ws::WsConnector;

/// Everything a connector needs for one attempt.
#[derive(Debug, Clone)]
pub struct ConnectRequest {
    pub url: String,
    /// Bearer token read from the session collaborator for this attempt.
    pub token: String,
    pub token_query_param: Option<String>,
    /// `None` disables transport-level pings.
    pub ping_interval: Option<Duration>,
}

impl ConnectRequest {
    /// URL with the token appended as a query parameter, when configured.
    pub fn effective_url(&self) -> String {
        match &self.token_query_param {
            Some(param) => {
                let sep = if self.url.contains('?') { '&' } else { '?' };
                format!(
                    "{}{}{}={}",
                    self.url,
                    sep,
                    urlencoding::encode(param),
                    urlencoding::encode(&self.token)
                )
            }
            None => self.url.clone(),
        }
    }
}

/// Raw inbound event from a link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    Text(String),
    Binary(Bytes),
    Closed { reason: Option<String> },
}

/// One established connection.
///
/// Dropping `outbound` closes the socket.
#[derive(Debug)]
pub struct Link {
    pub outbound: mpsc::UnboundedSender<String>,
    pub inbound: mpsc::UnboundedReceiver<LinkEvent>,
}

#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, req: &ConnectRequest) -> Result<Link>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(url: &str, param: Option<&str>) -> ConnectRequest {
        ConnectRequest {
            url: url.into(),
            token: "a b+c".into(),
            token_query_param: param.map(String::from),
            ping_interval: None,
        }
    }

    #[test]
    fn token_is_not_in_url_by_default() {
        assert_eq!(req("ws://h/ws", None).effective_url(), "ws://h/ws");
    }

    #[test]
    fn token_query_param_is_encoded() {
        assert_eq!(req("ws://h/ws", Some("token")).effective_url(), "ws://h/ws?token=a%20b%2Bc");
        assert_eq!(
            req("ws://h/ws?board=b1", Some("token")).effective_url(),
            "ws://h/ws?board=b1&token=a%20b%2Bc"
        );
    }
}
