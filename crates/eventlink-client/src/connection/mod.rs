//! Connection manager: socket ownership, state machine, backoff, room replay.

pub mod backoff;
mod driver;
pub mod manager;
pub mod state;

pub use backoff::Backoff;
pub use manager::ConnectionManager;
pub use state::ConnectionState;
