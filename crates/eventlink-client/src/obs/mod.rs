//! Lightweight in-process counters for diagnostic display.
//!
//! Counters are plain atomics; `render` emits Prometheus-style text so the
//! same numbers can back a status panel or a scrape endpoint.

pub mod stats;

pub use stats::{Stats, StatsSnapshot};
