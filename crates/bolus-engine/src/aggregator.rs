//! The aggregation walk — total IOB, basal IOB, and the retrospective
//! absolute-basal estimate.
//!
//! Every function here is a pure fold over an immutable snapshot: the same
//! snapshot and query time always produce bit-identical results, which the
//! external tuning procedure depends on for reproducibility.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use bolus_core::{
  curve::InsulinCurve,
  intervals::{ClipTo, Interval},
  profile::ProfileSwitch,
  source::{
    Preferences, ProfileResolver, ProfileSwitchSink, PumpCapabilities,
    RemoteSync,
  },
};

use crate::{
  Error, Result,
  aggregate::{IobAggregate, IobOptions},
  snapshot::HistorySnapshot,
};

/// Normal glucose target (mg/dL) used by the exercise-mode rate scaling.
const NORMAL_TARGET_MGDL: f64 = 100.0;

// ─── Bolus side ──────────────────────────────────────────────────────────────

/// Sum bolus and meal contributions at `time`.
///
/// Dose events decay through the active profile's DIA; non-SMB doses
/// additionally accumulate a snooze value — the same curve evaluated with
/// the dose's age multiplied by the snooze divisor, so the snooze decays
/// faster than the real IOB. On pumps with native temp basals, extended
/// boluses are genuine boluses and their contribution lands here too.
///
/// Returns a zero aggregate when no profile is resolvable yet.
pub fn bolus_iob<R, P, F>(
  snapshot: &HistorySnapshot,
  resolver: &R,
  pump: &P,
  prefs: &F,
  curve: InsulinCurve,
  time: DateTime<Utc>,
) -> IobAggregate
where
  R: ProfileResolver,
  P: PumpCapabilities,
  F: Preferences,
{
  let mut total = IobAggregate::zero(time);
  let Some(profile) = resolver.current_profile() else {
    return total;
  };
  let dia = profile.dia();
  let divisor = prefs.bolus_snooze_divisor();

  for dose in snapshot.doses() {
    if !dose.valid || dose.date > time {
      continue;
    }
    let eff = dose.iob_calc(curve, time, dia);
    total.iob += eff.iob;
    total.activity += eff.activity;
    if dose.insulin > 0.0
      && total.last_bolus_time.is_none_or(|last| dose.date > last)
    {
      total.last_bolus_time = Some(dose.date);
    }
    if !dose.smb {
      let aged = scale_duration(time - dose.date, divisor);
      total.bolus_snooze += dose.iob_calc_elapsed(curve, aged, dia).iob;
    }
  }

  if !pump.fakes_temp_basals_via_extended_bolus() {
    for eb in snapshot.extended_boluses().iter() {
      if eb.start > time {
        continue;
      }
      let calc = eb.iob_calc(curve, time, dia, 1.0);
      total.iob += calc.iob;
      total.activity += calc.activity;
      total.extended_bolus_insulin += calc.extended_bolus_insulin;
    }
  }

  debug!(%time, iob = total.iob, snooze = total.bolus_snooze, "bolus iob");
  total
}

// ─── Basal side ──────────────────────────────────────────────────────────────

/// Sum basal-origin contributions at `time`.
///
/// Exactly one source feeds the basal fields, decided once per call: native
/// temp-basal segments, or — on pumps that fake temp basals — extended-bolus
/// segments whose bolus-shaped totals are remapped into basal shape.
/// Segments whose start has no resolvable profile are skipped; partial
/// profile coverage during setup is expected.
pub fn basal_iob<R, P>(
  snapshot: &HistorySnapshot,
  resolver: &R,
  pump: &P,
  curve: InsulinCurve,
  time: DateTime<Utc>,
  options: &IobOptions,
) -> IobAggregate
where
  R: ProfileResolver,
  P: PumpCapabilities,
{
  let mut total = IobAggregate::zero(time);
  let scale = sensitivity_scale(
    options,
    snapshot.temp_target_at(time).map(|t| t.target_mgdl()),
  );

  if !pump.fakes_temp_basals_via_extended_bolus() {
    for segment in snapshot.temp_basals().iter() {
      if segment.start > time {
        continue;
      }
      let Some(profile) = resolver.profile_at(segment.start) else {
        debug!(start = %segment.start, "no profile for segment, skipped");
        continue;
      };
      let evaluated = match options.truncate_at {
        Some(cut) if segment.end() > cut => segment.clipped_to(cut),
        _ => segment.clone(),
      };
      match evaluated.iob_calc(curve, time, &profile, scale) {
        Ok(calc) => {
          total.basal_iob += calc.basal_iob;
          total.activity += calc.activity;
          total.net_basal_insulin += calc.net_basal_insulin;
          total.high_temp_insulin += calc.high_temp_insulin;
        }
        Err(e) => warn!(start = %segment.start, error = %e, "segment skipped"),
      }
    }
    debug!(%time, basal_iob = total.basal_iob, "basal iob (native)");
    return total;
  }

  let mut ext = IobAggregate::zero(time);
  for eb in snapshot.extended_boluses().iter() {
    if eb.start > time {
      continue;
    }
    let Some(profile) = resolver.profile_at(eb.start) else {
      debug!(start = %eb.start, "no profile for extended bolus, skipped");
      continue;
    };
    let evaluated = match options.truncate_at {
      Some(cut) if eb.end() > cut => eb.clipped_to(cut),
      _ => eb.clone(),
    };
    let calc = evaluated.iob_calc(curve, time, profile.dia(), scale);
    ext.iob += calc.iob;
    ext.activity += calc.activity;
    ext.extended_bolus_insulin += calc.extended_bolus_insulin;
  }

  // Faked temp basals surface with basal semantics downstream. The
  // duplicated net/high-temp assignment is a fixed exchange contract.
  ext.basal_iob = ext.iob;
  ext.iob = 0.0;
  ext.net_basal_insulin = ext.extended_bolus_insulin;
  ext.high_temp_insulin = ext.extended_bolus_insulin;

  debug!(%time, basal_iob = ext.basal_iob, "basal iob (faked via extended)");
  total.combine(ext)
}

/// [`bolus_iob`] and [`basal_iob`] combined — the total insulin state at
/// `time`.
pub fn total_iob<R, P, F>(
  snapshot: &HistorySnapshot,
  resolver: &R,
  pump: &P,
  prefs: &F,
  curve: InsulinCurve,
  time: DateTime<Utc>,
  options: &IobOptions,
) -> IobAggregate
where
  R: ProfileResolver,
  P: PumpCapabilities,
  F: Preferences,
{
  bolus_iob(snapshot, resolver, pump, prefs, curve, time)
    .combine(basal_iob(snapshot, resolver, pump, curve, time, options))
}

// ─── Retrospective absolute-basal estimate ───────────────────────────────────

/// Damped absolute-basal IOB at `time`.
///
/// The baseline is the scheduled basal averaged over the preceding four
/// hourly samples (rounded to 0.001 U/h) — averaging helps the retuning
/// loop converge when this hour's schedule has drifted from its neighbours.
/// A forward 5-minute walk over one DIA then treats each step as a
/// synthetic micro-dose of the running rate; whenever a temp basal is
/// active at a step, its absolute rate replaces the running rate and sticks
/// for the rest of the walk.
pub fn absolute_basal_iob<R, P>(
  snapshot: &HistorySnapshot,
  resolver: &R,
  pump: &P,
  curve: InsulinCurve,
  time: DateTime<Utc>,
) -> IobAggregate
where
  R: ProfileResolver,
  P: PumpCapabilities,
{
  let mut total = IobAggregate::zero(time);
  let Some(profile) = resolver.profile_at(time) else {
    return total;
  };
  let dia = profile.dia();

  let mut running = 0.0;
  for hours_back in 0..4 {
    match profile.basal_at(time - Duration::hours(hours_back)) {
      Ok(rate) => running += rate,
      Err(e) => {
        warn!(error = %e, "basal schedule lookup failed");
        return total;
      }
    }
  }
  running = round_to(running / 4.0, 0.001);

  let range = Duration::milliseconds((dia * 3_600_000.0) as i64);
  let mut step = time - range;
  while step < time {
    if let Some(temp) = snapshot.temp_basal_at(step, resolver, pump) {
      if let Ok(rate) = temp.absolute_rate_at(&profile, step) {
        running = rate;
      }
    }
    let micro = running * 5.0 / 60.0;
    let eff = curve.dose_effect(micro, time - step, dia);
    total.iob += eff.iob;
    total.activity += eff.activity;
    step += Duration::minutes(5);
  }

  debug!(%time, iob = total.iob, "absolute basal iob");
  total
}

// ─── Profile-switch side effect ──────────────────────────────────────────────

/// Persist a newly created profile switch and forward it to the remote sync
/// service. One call each, no retry — delivery guarantees belong to the
/// collaborators.
pub async fn record_profile_switch<S, N>(
  sink: &S,
  sync: &N,
  record: ProfileSwitch,
) -> Result<()>
where
  S: ProfileSwitchSink,
  N: RemoteSync,
{
  info!(id = %record.id, name = %record.profile_name, "recording profile switch");
  sink
    .persist_profile_switch(record.clone())
    .await
    .map_err(|e| Error::Persist(Box::new(e)))?;
  sync
    .upload_profile_switch(record)
    .await
    .map_err(|e| Error::Upload(Box::new(e)))?;
  Ok(())
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// The per-call rate multiplier: the autosens ratio, overridden by the
/// exercise damping when exercise mode is on and a raised temp target is
/// active.
fn sensitivity_scale(options: &IobOptions, target_mgdl: Option<f64>) -> f64 {
  let mut ratio = options.autosens.map(|a| a.ratio).unwrap_or(1.0);
  if options.exercise_mode {
    if let (Some(half_basal), Some(target)) =
      (options.half_basal_exercise_target, target_mgdl)
    {
      if target >= NORMAL_TARGET_MGDL + 5.0 {
        let c = half_basal - NORMAL_TARGET_MGDL;
        ratio = c / (c + target - NORMAL_TARGET_MGDL);
      }
    }
  }
  ratio
}

fn round_to(value: f64, step: f64) -> f64 { (value / step).round() * step }

fn scale_duration(d: Duration, factor: f64) -> Duration {
  Duration::milliseconds((d.num_milliseconds() as f64 * factor) as i64)
}
