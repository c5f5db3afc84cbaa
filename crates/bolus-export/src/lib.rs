//! Neutral exchange serialization for history snapshots.
//!
//! Converts a [`HistorySnapshot`] into the ordered record sequences the
//! external offline tuning procedure consumes: a treatment history (doses,
//! temp basals, extended boluses, newest first) and a glucose series. Pure
//! synchronous; no storage or runtime dependencies.
//!
//! A record that fails to serialize is dropped from the output with a
//! warning — a partial export is acceptable, a silently empty one is not.

pub mod error;
mod serialize;

pub use error::{Error, Result};
pub use serialize::{
  ExchangeRecord, GlucoseExchangeRecord, glucose_record,
  local_utc_offset_minutes,
};

use serde_json::Value;
use tracing::warn;

use bolus_engine::HistorySnapshot;

/// The merged treatment ledger as exchange records, newest first.
///
/// Soft-deleted events were part of the snapshot's merge but are excluded
/// here; order among equal dates follows the ledger's insertion order.
pub fn treatment_history(snapshot: &HistorySnapshot) -> Vec<Value> {
  snapshot
    .entries()
    .iter()
    .filter(|entry| entry.is_valid())
    .filter_map(|entry| {
      match ExchangeRecord::from_entry(entry).to_value() {
        Ok(value) => Some(value),
        Err(e) => {
          warn!(date = %entry.date(), error = %e, "record dropped from export");
          None
        }
      }
    })
    .collect()
}

/// The snapshot's glucose series as exchange records, one per reading, each
/// carrying the same UTC-offset-minutes value computed once per call.
pub fn glucose_series(snapshot: &HistorySnapshot, device: &str) -> Vec<Value> {
  let utc_offset = local_utc_offset_minutes();
  snapshot
    .glucose()
    .iter()
    .filter_map(|reading| {
      match serde_json::to_value(glucose_record(reading, device, utc_offset)) {
        Ok(value) => Some(value),
        Err(e) => {
          warn!(date = %reading.date, error = %e, "reading dropped from export");
          None
        }
      }
    })
    .collect()
}

// ─── Snapshot-level tests ────────────────────────────────────────────────────
