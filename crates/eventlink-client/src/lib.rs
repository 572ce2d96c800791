//! eventlink client library entry.
//!
//! This crate wires the transport, connection manager, dispatcher, and
//! realtime state into one `RealtimeClient`. It is consumed by UI layers, by
//! the diagnostic binary (`main.rs`), and by integration tests.

pub mod auth;
pub mod client;
pub mod config;
pub mod connection;
pub mod dispatch;
pub mod obs;
pub mod realtime;
pub mod transport;

pub use auth::{EnvToken, StaticToken, TokenProvider};
pub use client::RealtimeClient;
pub use config::ClientConfig;
pub use connection::ConnectionState;
pub use obs::StatsSnapshot;
pub use realtime::SubscriptionHandle;
