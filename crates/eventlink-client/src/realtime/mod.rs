//! Realtime state for the eventlink client.

pub mod core;

pub use core::{Handler, Presence, RoomSet, SubscriptionHandle, SubscriptionRegistry};
