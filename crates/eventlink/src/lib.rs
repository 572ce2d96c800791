//! Top-level facade crate for eventlink.
//!
//! Re-exports the wire contracts and the client runtime so dashboards can
//! depend on a single crate.

pub mod core {
    pub use eventlink_core::*;
}

pub mod client {
    pub use eventlink_client::*;
}

pub use eventlink_client::{ClientConfig, ConnectionState, RealtimeClient, SubscriptionHandle};
pub use eventlink_core::{Envelope, EventLinkError, Result};
