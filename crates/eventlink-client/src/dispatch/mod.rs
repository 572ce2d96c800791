//! Dispatcher module exports.
//!
//! Re-exports the dispatcher so the connection driver and tests can feed it
//! decoded envelopes directly.

pub mod dispatcher;

pub use dispatcher::Dispatcher;
