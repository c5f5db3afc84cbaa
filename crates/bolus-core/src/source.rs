//! Source and sink traits — the narrow seams to external collaborators.
//!
//! Persistence, profile resolution, pump capabilities, preferences, and
//! remote sync all live behind these traits. Higher layers (`bolus-engine`,
//! `bolus-export`) depend on the abstractions, never on a concrete backend.
//!
//! Read traits return `Send` futures so they can be backed by real stores in
//! multi-threaded async runtimes; the lookup traits are synchronous pure
//! functions over already-materialized state.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::{
  event::DoseEvent,
  glucose::GlucoseReading,
  profile::{Profile, ProfileSwitch},
  segment::{BasalSegment, ExtendedBolusSegment},
  target::TempTarget,
};

// ─── Read sources ────────────────────────────────────────────────────────────

/// Continuous-glucose readings from the sensor store.
pub trait GlucoseSource: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Readings with `from <= date <= to`, ascending by date.
  fn readings_in_range(
    &self,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<GlucoseReading>, Self::Error>> + Send + '_;
}

/// Treatment history from the event store.
///
/// All range queries are inclusive on both ends and return records ascending
/// by date. Soft-deleted dose events are included — validity filtering is
/// the engine's concern, since invalid records still participate in the
/// export merge.
pub trait HistorySource: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn doses_in_range(
    &self,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<DoseEvent>, Self::Error>> + Send + '_;

  fn basal_segments_in_range(
    &self,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<BasalSegment>, Self::Error>> + Send + '_;

  fn extended_bolus_segments_in_range(
    &self,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<ExtendedBolusSegment>, Self::Error>>
  + Send
  + '_;

  fn targets_in_range(
    &self,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<TempTarget>, Self::Error>> + Send + '_;

  /// Profile switches with effective time ≤ `to`. No lower bound: a switch
  /// applies until superseded, so an arbitrarily old one may still govern
  /// the window.
  fn profile_switches_before(
    &self,
    to: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<ProfileSwitch>, Self::Error>> + Send + '_;
}

// ─── Lookups ─────────────────────────────────────────────────────────────────

/// Maps a timestamp to the insulin profile active at that moment.
pub trait ProfileResolver: Send + Sync {
  /// `None` is an expected condition during initial setup, not an error.
  fn profile_at(&self, time: DateTime<Utc>) -> Option<Profile>;

  fn current_profile(&self) -> Option<Profile>;
}

/// The one pump property the engine cares about.
pub trait PumpCapabilities: Send + Sync {
  /// `true` when the pump cannot run native temp basals and encodes them as
  /// extended boluses instead. Evaluated once per aggregation call.
  fn fakes_temp_basals_via_extended_bolus(&self) -> bool;
}

/// User-settable tuning knobs.
pub trait Preferences: Send + Sync {
  /// Multiplier applied to a dose's age when computing its snooze decay.
  fn bolus_snooze_divisor(&self) -> f64 { 2.0 }
}

/// An autosensitivity adjustment produced by an external analysis; scales
/// dose-effect magnitude without altering timing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutosensResult {
  pub ratio: f64,
}

// ─── Write sinks ─────────────────────────────────────────────────────────────

/// Persists newly created profile-switch records to the backing store.
pub trait ProfileSwitchSink: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn persist_profile_switch(
    &self,
    record: ProfileSwitch,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

/// Forwards records to the remote synchronisation service.
pub trait RemoteSync: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn upload_profile_switch(
    &self,
    record: ProfileSwitch,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
