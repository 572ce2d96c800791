//! Connection driver task.
//!
//! Lifecycle:
//! 1. Read a token, open the link, wait for the auth ack (if configured)
//! 2. Enter `connected` (rooms replayed) and pump inbound frames to the dispatcher
//! 3. On loss or failure: back off, retry; give up into `error` at the cap
//!
//! Every state change goes through `Inner` with this driver's epoch, so a
//! driver cancelled by `disconnect()` or superseded by `connect()` exits at
//! its next checkpoint without touching anything.

use std::sync::Arc;

use tokio::sync::mpsc;

use eventlink_core::error::{EventLinkError, Result};

use crate::connection::manager::{Inner, Retry};
use crate::transport::codec::{decode, Inbound};
use crate::transport::{Link, LinkEvent};

pub(crate) async fn run(inner: Arc<Inner>, epoch: u64, first_token: String) {
    let mut token = Some(first_token);

    loop {
        // The first attempt reuses the token read synchronously by connect().
        let token_res = match token.take() {
            Some(t) => Ok(t),
            None => inner.tokens.token(),
        };

        let established = match token_res {
            Ok(t) => establish(&inner, t).await,
            Err(e) => Err(e),
        };

        match established {
            Ok(link) => {
                let Link { outbound, inbound } = link;
                if !inner.on_connected(epoch, outbound) {
                    return;
                }
                let reason = pump(&inner, epoch, inbound).await;
                if !inner.on_link_lost(epoch, reason.as_deref()) {
                    return;
                }
            }
            Err(e) => {
                tracing::warn!(url = %inner.cfg.connection.url, code = e.code().as_str(), error = %e, "connect attempt failed");
            }
        }

        match inner.next_retry(epoch) {
            Retry::After(delay) => tokio::time::sleep(delay).await,
            Retry::GiveUp | Retry::Stale => return,
        }

        if !inner.begin_attempt(epoch) {
            return;
        }
    }
}

/// Open a link and complete the auth handshake within the configured window.
async fn establish(inner: &Inner, token: String) -> Result<Link> {
    let req = inner.connect_request(token);
    let ack_type = inner.cfg.connection.auth_ack_type.clone();

    let attempt = async {
        let mut link = inner.connector.connect(&req).await?;
        if let Some(ack) = ack_type.as_deref() {
            wait_for_ack(&mut link.inbound, ack).await?;
        }
        Ok::<Link, EventLinkError>(link)
    };

    tokio::time::timeout(inner.cfg.connection.handshake_timeout(), attempt)
        .await
        .map_err(|_| EventLinkError::HandshakeTimeout)?
}

/// Frames that arrive before the ack belong to no subscription and are dropped.
async fn wait_for_ack(inbound: &mut mpsc::UnboundedReceiver<LinkEvent>, ack: &str) -> Result<()> {
    while let Some(ev) = inbound.recv().await {
        match decode(ev) {
            Ok(Inbound::Envelope { env, .. }) if env.event_type == ack => return Ok(()),
            Ok(Inbound::Envelope { env, .. }) => {
                tracing::debug!(event_type = %env.event_type, "frame before auth ack; dropped");
            }
            Ok(Inbound::Closed { reason }) => {
                return Err(EventLinkError::Transport(format!(
                    "closed during handshake: {}",
                    reason.unwrap_or_default()
                )));
            }
            Err(e) => tracing::debug!(error = %e, "malformed frame before auth ack; dropped"),
        }
    }
    Err(EventLinkError::Transport("link closed during handshake".into()))
}

/// Dispatch inbound frames in arrival order until the link closes or the
/// driver goes stale. Returns the close reason, if any.
///
/// Buffered frames make `recv()` ready without yielding, so an abort from
/// `disconnect()` alone would not stop delivery; the epoch is checked per frame.
async fn pump(inner: &Inner, epoch: u64, mut inbound: mpsc::UnboundedReceiver<LinkEvent>) -> Option<String> {
    let dispatcher = &inner.dispatcher;
    while let Some(ev) = inbound.recv().await {
        if !inner.is_current(epoch) {
            tracing::debug!("connection superseded; dropping buffered frames");
            return None;
        }
        match decode(ev) {
            Ok(Inbound::Envelope { env, bytes_len }) => {
                tracing::trace!(event_type = %env.event_type, bytes_len, "inbound");
                dispatcher.dispatch(&env);
            }
            Ok(Inbound::Closed { reason }) => return reason,
            Err(e) => dispatcher.record_decode_error(&e),
        }
    }
    None
}
