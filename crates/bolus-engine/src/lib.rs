//! The IOB engine — history snapshots and the aggregation walk.
//!
//! A caller builds a [`HistorySnapshot`] for a `[from, to]` window, queries
//! it any number of times through the aggregator functions, and discards it
//! when moving to a new window. Snapshots are immutable after load;
//! [`SnapshotCell`] publishes a replacement atomically while readers finish
//! against the old one.

pub mod aggregate;
pub mod aggregator;
pub mod error;
pub mod snapshot;

pub use aggregate::{IobAggregate, IobOptions};
pub use error::{Error, Result};
pub use snapshot::{HistoryEntry, HistorySnapshot, SnapshotCell};

#[cfg(test)]
mod tests;
