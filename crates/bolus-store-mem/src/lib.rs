//! In-memory backends for the `bolus-core` source traits.
//!
//! Real deployments put a database behind [`HistorySource`] and
//! [`GlucoseSource`]; this crate keeps every record family in a
//! `parking_lot`-guarded vector instead. That is all the engine's tests
//! need, and it doubles as a fixture-friendly backend for embedding.

use std::convert::Infallible;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::debug;

use bolus_core::{
  event::DoseEvent,
  glucose::GlucoseReading,
  profile::{Profile, ProfileSwitch},
  segment::{BasalSegment, ExtendedBolusSegment},
  source::{
    GlucoseSource, HistorySource, Preferences, ProfileResolver,
    ProfileSwitchSink, PumpCapabilities, RemoteSync,
  },
  target::TempTarget,
};

// ─── History store ───────────────────────────────────────────────────────────

/// An in-memory event history. Push records in, query them back through the
/// source traits.
#[derive(Debug, Default)]
pub struct MemoryHistory {
  doses:     RwLock<Vec<DoseEvent>>,
  basals:    RwLock<Vec<BasalSegment>>,
  extendeds: RwLock<Vec<ExtendedBolusSegment>>,
  targets:   RwLock<Vec<TempTarget>>,
  switches:  RwLock<Vec<ProfileSwitch>>,
  readings:  RwLock<Vec<GlucoseReading>>,
}

impl MemoryHistory {
  pub fn new() -> Self { Self::default() }

  pub fn push_dose(&self, dose: DoseEvent) {
    self.doses.write().push(dose);
  }

  pub fn push_basal(&self, segment: BasalSegment) {
    self.basals.write().push(segment);
  }

  pub fn push_extended_bolus(&self, segment: ExtendedBolusSegment) {
    self.extendeds.write().push(segment);
  }

  pub fn push_target(&self, target: TempTarget) {
    self.targets.write().push(target);
  }

  pub fn push_profile_switch(&self, record: ProfileSwitch) {
    self.switches.write().push(record);
  }

  pub fn push_reading(&self, reading: GlucoseReading) {
    self.readings.write().push(reading);
  }

  /// All persisted profile switches, oldest first — lets tests observe what
  /// [`ProfileSwitchSink`] wrote.
  pub fn profile_switches(&self) -> Vec<ProfileSwitch> {
    self.switches.read().clone()
  }
}

fn in_range<T>(
  records: &[T],
  from: DateTime<Utc>,
  to: DateTime<Utc>,
  date: impl Fn(&T) -> DateTime<Utc>,
) -> Vec<T>
where
  T: Clone,
{
  let mut out: Vec<T> = records
    .iter()
    .filter(|r| date(r) >= from && date(r) <= to)
    .cloned()
    .collect();
  out.sort_by_key(|r| date(r));
  out
}

impl GlucoseSource for MemoryHistory {
  type Error = Infallible;

  async fn readings_in_range(
    &self,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
  ) -> Result<Vec<GlucoseReading>, Infallible> {
    Ok(in_range(&self.readings.read(), from, to, |r| r.date))
  }
}

impl HistorySource for MemoryHistory {
  type Error = Infallible;

  async fn doses_in_range(
    &self,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
  ) -> Result<Vec<DoseEvent>, Infallible> {
    Ok(in_range(&self.doses.read(), from, to, |d| d.date))
  }

  async fn basal_segments_in_range(
    &self,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
  ) -> Result<Vec<BasalSegment>, Infallible> {
    Ok(in_range(&self.basals.read(), from, to, |s| s.start))
  }

  async fn extended_bolus_segments_in_range(
    &self,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
  ) -> Result<Vec<ExtendedBolusSegment>, Infallible> {
    Ok(in_range(&self.extendeds.read(), from, to, |s| s.start))
  }

  async fn targets_in_range(
    &self,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
  ) -> Result<Vec<TempTarget>, Infallible> {
    Ok(in_range(&self.targets.read(), from, to, |t| t.start))
  }

  async fn profile_switches_before(
    &self,
    to: DateTime<Utc>,
  ) -> Result<Vec<ProfileSwitch>, Infallible> {
    let mut out: Vec<ProfileSwitch> = self
      .switches
      .read()
      .iter()
      .filter(|s| s.date <= to)
      .cloned()
      .collect();
    out.sort_by_key(|s| s.date);
    Ok(out)
  }
}

impl ProfileSwitchSink for MemoryHistory {
  type Error = Infallible;

  async fn persist_profile_switch(
    &self,
    record: ProfileSwitch,
  ) -> Result<(), Infallible> {
    debug!(id = %record.id, "profile switch persisted");
    self.switches.write().push(record);
    Ok(())
  }
}

// ─── Lookup doubles ──────────────────────────────────────────────────────────

/// A resolver that hands out one fixed profile, optionally only from a
/// cutoff onward — the "partial profile coverage during setup" case.
#[derive(Debug, Clone)]
pub struct StaticProfiles {
  profile:        Option<Profile>,
  available_from: Option<DateTime<Utc>>,
}

impl StaticProfiles {
  /// Always resolves to `profile`.
  pub fn single(profile: Profile) -> Self {
    Self {
      profile:        Some(profile),
      available_from: None,
    }
  }

  /// Resolves to `profile` only at or after `from`; earlier lookups get
  /// `None`.
  pub fn available_from(profile: Profile, from: DateTime<Utc>) -> Self {
    Self {
      profile:        Some(profile),
      available_from: Some(from),
    }
  }

  /// Never resolves — the cold-start case.
  pub fn none() -> Self {
    Self {
      profile:        None,
      available_from: None,
    }
  }
}

impl ProfileResolver for StaticProfiles {
  fn profile_at(&self, time: DateTime<Utc>) -> Option<Profile> {
    match self.available_from {
      Some(from) if time < from => None,
      _ => self.profile.clone(),
    }
  }

  fn current_profile(&self) -> Option<Profile> { self.profile.clone() }
}

/// A pump with a fixed capability answer.
#[derive(Debug, Clone, Copy)]
pub struct FixedPump {
  pub fakes_temp_basals: bool,
}

impl PumpCapabilities for FixedPump {
  fn fakes_temp_basals_via_extended_bolus(&self) -> bool {
    self.fakes_temp_basals
  }
}

/// Preferences backed by plain fields.
#[derive(Debug, Clone, Copy)]
pub struct MemoryPreferences {
  pub snooze_divisor: f64,
}

impl Default for MemoryPreferences {
  fn default() -> Self {
    Self {
      snooze_divisor: 2.0,
    }
  }
}

impl Preferences for MemoryPreferences {
  fn bolus_snooze_divisor(&self) -> f64 { self.snooze_divisor }
}

// ─── Sync double ─────────────────────────────────────────────────────────────

/// A remote-sync sink that records every upload.
#[derive(Debug, Default)]
pub struct RecordingSync {
  uploads: RwLock<Vec<ProfileSwitch>>,
}

impl RecordingSync {
  pub fn new() -> Self { Self::default() }

  pub fn uploads(&self) -> Vec<ProfileSwitch> { self.uploads.read().clone() }
}

impl RemoteSync for RecordingSync {
  type Error = Infallible;

  async fn upload_profile_switch(
    &self,
    record: ProfileSwitch,
  ) -> Result<(), Infallible> {
    debug!(id = %record.id, "profile switch uploaded");
    self.uploads.write().push(record);
    Ok(())
  }
}
