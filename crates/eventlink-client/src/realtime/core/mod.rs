//! Client-side realtime state shared by the connection driver and callers.
//!
//! Subscription registry, room membership, and presence tracking.

mod presence;
mod rooms;
mod subscriptions;

pub use presence::Presence;
pub use rooms::RoomSet;
pub use subscriptions::{Handler, SubscriptionHandle, SubscriptionRegistry};
