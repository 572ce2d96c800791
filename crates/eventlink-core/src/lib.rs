//! eventlink core: transport-agnostic wire contracts and the shared error type.
//!
//! This crate defines the envelope format, its codec, and the conventional
//! event vocabulary used by dashboard frontends. It carries no socket or
//! runtime dependencies so it can be shared by the client runtime, servers,
//! and test tooling alike.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Malformed frames surface as `EventLinkError::Decode` so a bad server
//! message can never take down the receive loop.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod protocol;

/// Shared result type.
pub use error::{ErrorCode, EventLinkError, Result};
pub use protocol::envelope::Envelope;
