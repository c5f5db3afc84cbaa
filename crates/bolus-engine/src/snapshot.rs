//! History snapshots — the immutable per-window bundle the aggregator walks.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use tracing::info;

use bolus_core::{
  event::DoseEvent,
  glucose::GlucoseReading,
  intervals::{
    Interval, NonOverlappingIntervals, OverlappingIntervals, ProfileIntervals,
  },
  profile::{DEFAULT_DIA_HOURS, ProfileSwitch},
  segment::{BasalRate, BasalSegment, ExtendedBolusSegment},
  source::{GlucoseSource, HistorySource, ProfileResolver, PumpCapabilities},
  target::TempTarget,
};

use crate::{Error, Result};

// ─── Export ledger ───────────────────────────────────────────────────────────

/// One entry of the merged treatment ledger handed to the export layer.
/// Soft-deleted dose events participate in the merge but are excluded from
/// the emitted exchange sequence.
#[derive(Debug, Clone)]
pub enum HistoryEntry {
  Dose(DoseEvent),
  TempBasal(BasalSegment),
  ExtendedBolus(ExtendedBolusSegment),
}

impl HistoryEntry {
  pub fn date(&self) -> DateTime<Utc> {
    match self {
      Self::Dose(d) => d.date,
      Self::TempBasal(s) => s.start,
      Self::ExtendedBolus(s) => s.start,
    }
  }

  pub fn is_valid(&self) -> bool {
    match self {
      Self::Dose(d) => d.valid,
      Self::TempBasal(_) | Self::ExtendedBolus(_) => true,
    }
  }
}

// ─── Snapshot ────────────────────────────────────────────────────────────────

/// Everything the aggregator needs for one `[from, to]` window, loaded once
/// and never mutated afterwards.
///
/// Doses, basal segments, extended boluses, and profile switches are loaded
/// with a one-DIA backward margin so that deliveries started before the
/// window still contribute their decaying tail at `from`.
#[derive(Debug, Clone)]
pub struct HistorySnapshot {
  from:             DateTime<Utc>,
  to:               DateTime<Utc>,
  doses:            Vec<DoseEvent>,
  meals:            Vec<DoseEvent>,
  glucose:          Vec<GlucoseReading>,
  temp_basals:      NonOverlappingIntervals<BasalSegment>,
  extended_boluses: NonOverlappingIntervals<ExtendedBolusSegment>,
  temp_targets:     OverlappingIntervals<TempTarget>,
  profile_switches: ProfileIntervals<ProfileSwitch>,
  entries:          Vec<HistoryEntry>,
}

impl HistorySnapshot {
  /// Load every record family for `[from, to]` and assemble the snapshot.
  pub async fn load<G, H, R>(
    glucose: &G,
    history: &H,
    resolver: &R,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
  ) -> Result<Self>
  where
    G: GlucoseSource,
    H: HistorySource,
    R: ProfileResolver,
  {
    let dia = resolver
      .current_profile()
      .map(|p| p.dia())
      .unwrap_or(DEFAULT_DIA_HOURS);
    let margin = Duration::milliseconds((dia * 3_600_000.0) as i64);
    let lookback = from - margin;

    let readings = glucose
      .readings_in_range(from, to)
      .await
      .map_err(|e| Error::Glucose(Box::new(e)))?;

    let mut doses = history
      .doses_in_range(lookback, to)
      .await
      .map_err(|e| Error::History(Box::new(e)))?;
    let basals = history
      .basal_segments_in_range(lookback, to)
      .await
      .map_err(|e| Error::History(Box::new(e)))?;
    let extendeds = history
      .extended_bolus_segments_in_range(lookback, to)
      .await
      .map_err(|e| Error::History(Box::new(e)))?;
    let targets = history
      .targets_in_range(from, to)
      .await
      .map_err(|e| Error::History(Box::new(e)))?;
    let mut switches = history
      .profile_switches_before(to)
      .await
      .map_err(|e| Error::History(Box::new(e)))?;
    switches.retain(|s| s.date >= lookback);

    // Carbs recorded before the window cannot pair with in-window glucose;
    // zero them here, exactly once. In-window carb events become meals.
    let mut meals = Vec::new();
    for dose in &mut doses {
      if dose.carbs > 0.0 {
        if dose.date >= from {
          if dose.valid {
            meals.push(dose.clone());
          }
        } else {
          dose.carbs = 0.0;
        }
      }
    }

    let mut entries: Vec<HistoryEntry> = Vec::with_capacity(
      doses.len() + basals.len() + extendeds.len(),
    );
    entries.extend(doses.iter().cloned().map(HistoryEntry::Dose));
    entries.extend(basals.iter().cloned().map(HistoryEntry::TempBasal));
    entries.extend(extendeds.iter().cloned().map(HistoryEntry::ExtendedBolus));
    // Newest first; the stable sort keeps insertion order on equal dates.
    entries.sort_by_key(|e| std::cmp::Reverse(e.date()));

    let mut temp_basals = NonOverlappingIntervals::new();
    temp_basals.reset().add(basals);
    let mut extended_boluses = NonOverlappingIntervals::new();
    extended_boluses.reset().add(extendeds);
    let mut temp_targets = OverlappingIntervals::new();
    temp_targets.reset().add(targets);
    let mut profile_switches = ProfileIntervals::new();
    profile_switches.reset().add(switches);

    info!(
      %from,
      %to,
      doses = doses.len(),
      meals = meals.len(),
      readings = readings.len(),
      temp_basals = temp_basals.len(),
      extended_boluses = extended_boluses.len(),
      "history snapshot loaded"
    );

    Ok(Self {
      from,
      to,
      doses,
      meals,
      glucose: readings,
      temp_basals,
      extended_boluses,
      temp_targets,
      profile_switches,
      entries,
    })
  }

  // ── Window & record access ────────────────────────────────────────────

  pub fn from(&self) -> DateTime<Utc> { self.from }

  pub fn to(&self) -> DateTime<Utc> { self.to }

  pub fn doses(&self) -> &[DoseEvent] { &self.doses }

  /// Valid in-window carb events.
  pub fn meals(&self) -> &[DoseEvent] { &self.meals }

  pub fn glucose(&self) -> &[GlucoseReading] { &self.glucose }

  pub fn temp_basals(&self) -> &NonOverlappingIntervals<BasalSegment> {
    &self.temp_basals
  }

  pub fn extended_boluses(
    &self,
  ) -> &NonOverlappingIntervals<ExtendedBolusSegment> {
    &self.extended_boluses
  }

  pub fn temp_targets(&self) -> &OverlappingIntervals<TempTarget> {
    &self.temp_targets
  }

  pub fn profile_switches(&self) -> &ProfileIntervals<ProfileSwitch> {
    &self.profile_switches
  }

  /// The merged treatment ledger, newest first.
  pub fn entries(&self) -> &[HistoryEntry] { &self.entries }

  // ── Point queries ─────────────────────────────────────────────────────

  /// The native temp-basal segment running at `time`, if any.
  pub fn real_temp_basal_at(&self, time: DateTime<Utc>) -> Option<&BasalSegment> {
    self.temp_basals.value_at(time)
  }

  pub fn extended_bolus_at(
    &self,
    time: DateTime<Utc>,
  ) -> Option<&ExtendedBolusSegment> {
    self.extended_boluses.value_at(time)
  }

  /// The temp basal effectively running at `time`: a native segment when one
  /// exists, otherwise — on pumps that fake temp basals — the running
  /// extended bolus expressed as an absolute basal segment (its rate rides
  /// on top of the scheduled basal at its start).
  pub fn temp_basal_at<R, P>(
    &self,
    time: DateTime<Utc>,
    resolver: &R,
    pump: &P,
  ) -> Option<BasalSegment>
  where
    R: ProfileResolver,
    P: PumpCapabilities,
  {
    if let Some(native) = self.real_temp_basal_at(time) {
      return Some(native.clone());
    }
    if !pump.fakes_temp_basals_via_extended_bolus() {
      return None;
    }
    let eb = self.extended_bolus_at(time)?;
    let profile = resolver.profile_at(eb.start)?;
    let scheduled = profile.basal_at(eb.start).ok()?;
    Some(BasalSegment {
      id:       eb.id,
      start:    eb.start,
      duration: eb.duration(),
      rate:     BasalRate::Absolute(scheduled + eb.rate()),
    })
  }

  pub fn temp_target_at(&self, time: DateTime<Utc>) -> Option<&TempTarget> {
    self.temp_targets.value_at(time)
  }

  pub fn profile_switch_at(
    &self,
    time: DateTime<Utc>,
  ) -> Option<&ProfileSwitch> {
    self.profile_switches.value_to(time)
  }

  // ── Dose queries ──────────────────────────────────────────────────────

  /// Doses with `from <= date <= to`, invalid entries included — callers
  /// mapping pump history need soft-deleted records to avoid double
  /// counting re-entered doses.
  pub fn doses_between(
    &self,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
  ) -> Vec<DoseEvent> {
    self
      .doses
      .iter()
      .filter(|d| d.date >= from && d.date <= to)
      .cloned()
      .collect()
  }

  /// Valid carb entries in the five minutes ending at `time`.
  pub fn carb_doses_in_5_min_before(
    &self,
    time: DateTime<Utc>,
  ) -> Vec<DoseEvent> {
    let floor = time - Duration::minutes(5);
    self
      .doses
      .iter()
      .filter(|d| d.valid && d.carbs > 0.0 && d.date <= time && d.date > floor)
      .cloned()
      .collect()
  }

  /// Timestamp of the most recent valid insulin dose at or before `at`.
  pub fn last_bolus_time(&self, at: DateTime<Utc>) -> Option<DateTime<Utc>> {
    self
      .doses
      .iter()
      .filter(|d| d.valid && d.insulin > 0.0 && d.date <= at)
      .map(|d| d.date)
      .max()
  }

  /// As [`last_bolus_time`](Self::last_bolus_time), restricted to doses
  /// whose SMB flag equals `smb`.
  pub fn last_bolus_time_filtered(
    &self,
    at: DateTime<Utc>,
    smb: bool,
  ) -> Option<DateTime<Utc>> {
    self
      .doses
      .iter()
      .filter(|d| d.valid && d.insulin > 0.0 && d.date <= at && d.smb == smb)
      .map(|d| d.date)
      .max()
  }

  /// The earliest record date across doses and segments, with a 15-minute
  /// allowance before it. Falls back to the window start when the snapshot
  /// is empty.
  pub fn oldest_data_available(&self) -> DateTime<Utc> {
    let mut oldest = self.from;
    if let Some(first) = self.temp_basals.first() {
      oldest = oldest.min(first.start);
    }
    if let Some(first) = self.extended_boluses.first() {
      oldest = oldest.min(first.start);
    }
    if let Some(first) = self.doses.iter().map(|d| d.date).min() {
      oldest = oldest.min(first);
    }
    oldest - Duration::minutes(15)
  }
}

// ─── Snapshot cell ───────────────────────────────────────────────────────────

/// Copy-on-refresh publication point for the current snapshot.
///
/// Readers clone the `Arc` and keep computing against the snapshot they
/// hold; a writer loads a replacement off to the side and swaps it in with
/// one short write-lock. No reader ever observes a half-refreshed window.
#[derive(Debug)]
pub struct SnapshotCell {
  current: RwLock<Arc<HistorySnapshot>>,
}

impl SnapshotCell {
  pub fn new(snapshot: HistorySnapshot) -> Self {
    Self {
      current: RwLock::new(Arc::new(snapshot)),
    }
  }

  /// The currently published snapshot.
  pub fn snapshot(&self) -> Arc<HistorySnapshot> {
    self.current.read().clone()
  }

  /// Atomically replace the published snapshot, returning the new handle.
  pub fn publish(&self, snapshot: HistorySnapshot) -> Arc<HistorySnapshot> {
    let snapshot = Arc::new(snapshot);
    *self.current.write() = snapshot.clone();
    snapshot
  }
}
