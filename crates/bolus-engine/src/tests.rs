//! Integration tests for the snapshot and aggregator against the in-memory
//! history backend.

use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

use bolus_core::{
  curve::InsulinCurve,
  event::DoseEvent,
  profile::{Profile, ProfileSwitch},
  segment::{BasalRate, BasalSegment, ExtendedBolusSegment},
  target::TempTarget,
};
use bolus_store_mem::{
  FixedPump, MemoryHistory, MemoryPreferences, RecordingSync, StaticProfiles,
};

use crate::{
  IobOptions, aggregator,
  snapshot::{HistorySnapshot, SnapshotCell},
};

const DIA: f64 = 4.0;
const CURVE: InsulinCurve = InsulinCurve::Bilinear;

fn logging() {
  let _ = tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .try_init();
}

fn base() -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2023, 4, 1, 0, 0, 0).unwrap()
}

fn hour(h: i64) -> DateTime<Utc> { base() + Duration::hours(h) }

fn profile() -> Profile { Profile::flat(DIA, 1.0) }

fn resolver() -> StaticProfiles { StaticProfiles::single(profile()) }

fn real_pump() -> FixedPump {
  FixedPump {
    fakes_temp_basals: false,
  }
}

fn faking_pump() -> FixedPump {
  FixedPump {
    fakes_temp_basals: true,
  }
}

async fn snapshot_of(
  history: &MemoryHistory,
  resolver: &StaticProfiles,
  from: DateTime<Utc>,
  to: DateTime<Utc>,
) -> HistorySnapshot {
  HistorySnapshot::load(history, history, resolver, from, to)
    .await
    .expect("snapshot load")
}

// ─── End-to-end scenario ─────────────────────────────────────────────────────

#[tokio::test]
async fn day_window_with_one_bolus() {
  logging();
  let history = MemoryHistory::new();
  history.push_dose(DoseEvent::new(hour(0), 6.0, 0.0));

  let resolver = resolver();
  let snapshot = snapshot_of(&history, &resolver, hour(0), hour(24)).await;

  let prefs = MemoryPreferences::default();
  let at_start = aggregator::bolus_iob(
    &snapshot, &resolver, &real_pump(), &prefs, CURVE, hour(0),
  );
  assert!((at_start.iob - 6.0).abs() < 1e-9);
  assert_eq!(at_start.last_bolus_time, Some(hour(0)));

  let after_dia = aggregator::bolus_iob(
    &snapshot, &resolver, &real_pump(), &prefs, CURVE, hour(4),
  );
  assert!(after_dia.iob.abs() < 1e-6);
  assert_eq!(after_dia.last_bolus_time, Some(hour(0)));
}

#[tokio::test]
async fn pre_window_bolus_still_decays_into_the_window() {
  let history = MemoryHistory::new();
  // Two hours before the window, well inside the DIA margin.
  history.push_dose(DoseEvent::new(hour(4), 4.0, 0.0));
  // Far outside the margin; must not be loaded at all.
  history.push_dose(DoseEvent::new(hour(-12), 9.0, 0.0));

  let resolver = resolver();
  let snapshot = snapshot_of(&history, &resolver, hour(6), hour(24)).await;
  assert_eq!(snapshot.doses().len(), 1);

  let prefs = MemoryPreferences::default();
  let at_from = aggregator::bolus_iob(
    &snapshot, &resolver, &real_pump(), &prefs, CURVE, hour(6),
  );
  assert!(at_from.iob > 0.0);
  assert!(at_from.iob < 4.0);
}

// ─── Snapshot construction ───────────────────────────────────────────────────

#[tokio::test]
async fn pre_window_carbs_are_zeroed_once_and_meals_collected() {
  let history = MemoryHistory::new();
  history.push_dose(DoseEvent::new(hour(4), 0.0, 45.0));
  history.push_dose(DoseEvent::new(hour(8), 1.5, 60.0));

  let resolver = resolver();
  let snapshot = snapshot_of(&history, &resolver, hour(6), hour(24)).await;

  let pre_window = snapshot
    .doses()
    .iter()
    .find(|d| d.date == hour(4))
    .expect("margin dose loaded");
  assert_eq!(pre_window.carbs, 0.0);

  assert_eq!(snapshot.meals().len(), 1);
  assert_eq!(snapshot.meals()[0].date, hour(8));
  assert_eq!(snapshot.meals()[0].carbs, 60.0);
}

#[tokio::test]
async fn invalid_doses_are_kept_but_never_counted() {
  let history = MemoryHistory::new();
  let mut deleted = DoseEvent::new(hour(1), 5.0, 0.0);
  deleted.valid = false;
  history.push_dose(deleted);
  history.push_dose(DoseEvent::new(hour(2), 1.0, 0.0));

  let resolver = resolver();
  let snapshot = snapshot_of(&history, &resolver, hour(0), hour(24)).await;

  // Both visible to history mapping…
  assert_eq!(snapshot.doses_between(hour(0), hour(3)).len(), 2);
  // …but only the valid one reaches the aggregate.
  let prefs = MemoryPreferences::default();
  let total = aggregator::bolus_iob(
    &snapshot, &resolver, &real_pump(), &prefs, CURVE, hour(2),
  );
  assert!((total.iob - 1.0).abs() < 1e-9);
  assert_eq!(total.last_bolus_time, Some(hour(2)));
}

#[tokio::test]
async fn ledger_is_ordered_newest_first() {
  let history = MemoryHistory::new();
  history.push_dose(DoseEvent::new(hour(2), 1.0, 0.0));
  history.push_basal(BasalSegment::new(
    hour(5),
    Some(Duration::minutes(30)),
    BasalRate::Absolute(2.0),
  ));
  history.push_extended_bolus(ExtendedBolusSegment::new(
    hour(3),
    Duration::minutes(60),
    1.0,
  ));

  let resolver = resolver();
  let snapshot = snapshot_of(&history, &resolver, hour(0), hour(24)).await;

  let dates: Vec<_> = snapshot.entries().iter().map(|e| e.date()).collect();
  assert_eq!(dates, vec![hour(5), hour(3), hour(2)]);
}

#[tokio::test]
async fn oldest_data_allows_fifteen_minutes_before() {
  let history = MemoryHistory::new();
  history.push_dose(DoseEvent::new(hour(3), 1.0, 0.0));
  history.push_basal(BasalSegment::new(
    hour(2),
    Some(Duration::minutes(30)),
    BasalRate::Absolute(2.0),
  ));

  let resolver = resolver();
  let snapshot = snapshot_of(&history, &resolver, hour(0), hour(24)).await;
  assert_eq!(
    snapshot.oldest_data_available(),
    hour(2) - Duration::minutes(15)
  );
}

// ─── Bolus snooze ────────────────────────────────────────────────────────────

#[tokio::test]
async fn snooze_decays_faster_than_real_iob() {
  let history = MemoryHistory::new();
  history.push_dose(DoseEvent::new(hour(0), 5.0, 0.0));

  let resolver = resolver();
  let snapshot = snapshot_of(&history, &resolver, hour(0), hour(24)).await;

  let prefs = MemoryPreferences::default();
  let total = aggregator::bolus_iob(
    &snapshot, &resolver, &real_pump(), &prefs, CURVE, hour(1),
  );
  assert!(total.bolus_snooze > 0.0);
  // Divisor 2.0 ages the dose twice as fast for snooze purposes.
  assert!(total.bolus_snooze < total.iob);
}

#[tokio::test]
async fn smb_doses_do_not_accumulate_snooze() {
  let history = MemoryHistory::new();
  let mut smb = DoseEvent::new(hour(0), 1.0, 0.0);
  smb.smb = true;
  history.push_dose(smb);

  let resolver = resolver();
  let snapshot = snapshot_of(&history, &resolver, hour(0), hour(24)).await;

  let prefs = MemoryPreferences::default();
  let total = aggregator::bolus_iob(
    &snapshot, &resolver, &real_pump(), &prefs, CURVE, hour(1),
  );
  assert!(total.iob > 0.0);
  assert_eq!(total.bolus_snooze, 0.0);
}

#[tokio::test]
async fn snooze_divisor_preference_is_honoured() {
  let history = MemoryHistory::new();
  history.push_dose(DoseEvent::new(hour(0), 5.0, 0.0));

  let resolver = resolver();
  let snapshot = snapshot_of(&history, &resolver, hour(0), hour(24)).await;

  let gentle = aggregator::bolus_iob(
    &snapshot,
    &resolver,
    &real_pump(),
    &MemoryPreferences {
      snooze_divisor: 1.0,
    },
    CURVE,
    hour(1),
  );
  let brisk = aggregator::bolus_iob(
    &snapshot,
    &resolver,
    &real_pump(),
    &MemoryPreferences {
      snooze_divisor: 3.0,
    },
    CURVE,
    hour(1),
  );
  // Divisor 1.0 makes snooze equal the real decay; larger divisors age it
  // further.
  assert!((gentle.bolus_snooze - gentle.iob).abs() < 1e-9);
  assert!(brisk.bolus_snooze < gentle.bolus_snooze);
}

// ─── Basal source selection ──────────────────────────────────────────────────

#[tokio::test]
async fn native_pump_counts_temp_basals_and_extended_boluses_separately() {
  let history = MemoryHistory::new();
  history.push_basal(BasalSegment::new(
    hour(1),
    Some(Duration::minutes(60)),
    BasalRate::Absolute(3.0),
  ));
  history.push_extended_bolus(ExtendedBolusSegment::new(
    hour(1),
    Duration::minutes(60),
    1.0,
  ));

  let resolver = resolver();
  let snapshot = snapshot_of(&history, &resolver, hour(0), hour(24)).await;

  let prefs = MemoryPreferences::default();
  let total = aggregator::total_iob(
    &snapshot,
    &resolver,
    &real_pump(),
    &prefs,
    CURVE,
    hour(2),
    &IobOptions::default(),
  );
  // The extended bolus is a genuine bolus here…
  assert!(total.iob > 0.0);
  assert!(total.extended_bolus_insulin > 0.0);
  // …and the native segment feeds the basal side.
  assert!(total.basal_iob > 0.0);
  assert!(total.net_basal_insulin > 0.0);
}

#[tokio::test]
async fn faking_pump_uses_only_the_extended_bolus_derivation() {
  let history = MemoryHistory::new();
  // A native segment that would dominate if it were (wrongly) counted.
  history.push_basal(BasalSegment::new(
    hour(1),
    Some(Duration::minutes(60)),
    BasalRate::Absolute(8.0),
  ));
  history.push_extended_bolus(ExtendedBolusSegment::new(
    hour(1),
    Duration::minutes(60),
    1.0,
  ));

  let eb_only = MemoryHistory::new();
  eb_only.push_extended_bolus(ExtendedBolusSegment::new(
    hour(1),
    Duration::minutes(60),
    1.0,
  ));

  let resolver = resolver();
  let both_snapshot = snapshot_of(&history, &resolver, hour(0), hour(24)).await;
  let eb_snapshot = snapshot_of(&eb_only, &resolver, hour(0), hour(24)).await;

  let options = IobOptions::default();
  let from_both = aggregator::basal_iob(
    &both_snapshot, &resolver, &faking_pump(), CURVE, hour(2), &options,
  );
  let from_eb = aggregator::basal_iob(
    &eb_snapshot, &resolver, &faking_pump(), CURVE, hour(2), &options,
  );
  // Identical in every field: the native segment contributed nothing.
  assert_eq!(from_both, from_eb);

  // Sanity: the native branch really would have produced a different total.
  let native = aggregator::basal_iob(
    &both_snapshot, &resolver, &real_pump(), CURVE, hour(2), &options,
  );
  assert_ne!(native.basal_iob, from_both.basal_iob);
}

#[tokio::test]
async fn faked_basal_remap_is_a_fixed_contract() {
  let history = MemoryHistory::new();
  history.push_extended_bolus(ExtendedBolusSegment::new(
    hour(1),
    Duration::minutes(60),
    2.0,
  ));

  let resolver = resolver();
  let snapshot = snapshot_of(&history, &resolver, hour(0), hour(24)).await;

  let total = aggregator::basal_iob(
    &snapshot,
    &resolver,
    &faking_pump(),
    CURVE,
    hour(2),
    &IobOptions::default(),
  );
  // Bolus-shaped totals arrive in basal shape: iob moves to basal_iob, and
  // the delivered extended insulin populates BOTH net-basal and high-temp.
  assert_eq!(total.iob, 0.0);
  assert!(total.basal_iob > 0.0);
  assert!((total.extended_bolus_insulin - 2.0).abs() < 1e-9);
  assert_eq!(total.net_basal_insulin, total.extended_bolus_insulin);
  assert_eq!(total.high_temp_insulin, total.extended_bolus_insulin);
}

// ─── Truncation ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn truncated_segment_equals_a_natively_shorter_one() {
  let long = MemoryHistory::new();
  long.push_basal(BasalSegment::new(
    hour(1),
    Some(Duration::minutes(60)),
    BasalRate::Absolute(3.0),
  ));
  let short = MemoryHistory::new();
  short.push_basal(BasalSegment::new(
    hour(1),
    Some(Duration::minutes(30)),
    BasalRate::Absolute(3.0),
  ));

  let resolver = resolver();
  let long_snapshot = snapshot_of(&long, &resolver, hour(0), hour(24)).await;
  let short_snapshot = snapshot_of(&short, &resolver, hour(0), hour(24)).await;

  let truncated = aggregator::basal_iob(
    &long_snapshot,
    &resolver,
    &real_pump(),
    CURVE,
    hour(3),
    &IobOptions::truncated_at(hour(1) + Duration::minutes(30)),
  );
  let native = aggregator::basal_iob(
    &short_snapshot,
    &resolver,
    &real_pump(),
    CURVE,
    hour(3),
    &IobOptions::default(),
  );
  assert_eq!(truncated.basal_iob, native.basal_iob);
  assert_eq!(truncated.net_basal_insulin, native.net_basal_insulin);

  // The stored segment is untouched by the what-if projection.
  let untouched = aggregator::basal_iob(
    &long_snapshot,
    &resolver,
    &real_pump(),
    CURVE,
    hour(3),
    &IobOptions::default(),
  );
  assert!(untouched.net_basal_insulin > truncated.net_basal_insulin);
}

// ─── Failure policy ──────────────────────────────────────────────────────────

#[tokio::test]
async fn unresolved_profile_yields_a_zero_aggregate() {
  let history = MemoryHistory::new();
  history.push_dose(DoseEvent::new(hour(1), 5.0, 0.0));

  let resolver = resolver();
  let snapshot = snapshot_of(&history, &resolver, hour(0), hour(24)).await;

  let cold = StaticProfiles::none();
  let prefs = MemoryPreferences::default();
  let total = aggregator::bolus_iob(
    &snapshot, &cold, &real_pump(), &prefs, CURVE, hour(2),
  );
  assert_eq!(total, crate::IobAggregate::zero(hour(2)));
}

#[tokio::test]
async fn segments_without_profile_coverage_are_skipped() {
  let history = MemoryHistory::new();
  history.push_basal(BasalSegment::new(
    hour(1),
    Some(Duration::minutes(30)),
    BasalRate::Absolute(4.0),
  ));
  history.push_basal(BasalSegment::new(
    hour(3),
    Some(Duration::minutes(30)),
    BasalRate::Absolute(4.0),
  ));

  let covered_only = MemoryHistory::new();
  covered_only.push_basal(BasalSegment::new(
    hour(3),
    Some(Duration::minutes(30)),
    BasalRate::Absolute(4.0),
  ));

  // Profiles exist only from hour 2 on; the hour-1 segment has no coverage.
  let partial = StaticProfiles::available_from(profile(), hour(2));
  let snapshot = snapshot_of(&history, &partial, hour(0), hour(24)).await;
  let reference =
    snapshot_of(&covered_only, &partial, hour(0), hour(24)).await;

  let options = IobOptions::default();
  let with_gap = aggregator::basal_iob(
    &snapshot, &partial, &real_pump(), CURVE, hour(4), &options,
  );
  let covered = aggregator::basal_iob(
    &reference, &partial, &real_pump(), CURVE, hour(4), &options,
  );
  assert_eq!(with_gap, covered);
}

// ─── Determinism ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn identical_snapshot_and_time_give_identical_results() {
  let history = MemoryHistory::new();
  history.push_dose(DoseEvent::new(hour(1), 3.2, 25.0));
  history.push_basal(BasalSegment::new(
    hour(2),
    Some(Duration::minutes(90)),
    BasalRate::Percent(140),
  ));
  history.push_extended_bolus(ExtendedBolusSegment::new(
    hour(4),
    Duration::minutes(120),
    1.6,
  ));
  history.push_target(TempTarget {
    id:        Uuid::new_v4(),
    start:     hour(3),
    duration:  Duration::minutes(120),
    low_mgdl:  140.0,
    high_mgdl: 160.0,
    reason:    None,
  });

  let resolver = resolver();
  let snapshot = snapshot_of(&history, &resolver, hour(0), hour(24)).await;

  let prefs = MemoryPreferences::default();
  let options = IobOptions {
    autosens: Some(bolus_core::source::AutosensResult { ratio: 0.9 }),
    exercise_mode: true,
    half_basal_exercise_target: Some(160.0),
    ..IobOptions::default()
  };
  let first = aggregator::total_iob(
    &snapshot, &resolver, &real_pump(), &prefs, CURVE, hour(5), &options,
  );
  let second = aggregator::total_iob(
    &snapshot, &resolver, &real_pump(), &prefs, CURVE, hour(5), &options,
  );
  assert_eq!(first, second);
}

// ─── Absolute-basal estimate ─────────────────────────────────────────────────

#[tokio::test]
async fn absolute_basal_walk_counts_scheduled_delivery() {
  let history = MemoryHistory::new();
  let resolver = resolver();
  let snapshot = snapshot_of(&history, &resolver, hour(0), hour(24)).await;

  let total = aggregator::absolute_basal_iob(
    &snapshot, &resolver, &real_pump(), CURVE, hour(12),
  );
  // One DIA of 1.0 U/h delivery, partially decayed: strictly between zero
  // and the 4 U delivered.
  assert!(total.iob > 0.0);
  assert!(total.iob < DIA * 1.0);
  assert!(total.activity > 0.0);
}

#[tokio::test]
async fn running_temp_override_sticks_for_the_rest_of_the_walk() {
  let history = MemoryHistory::new();
  history.push_basal(BasalSegment::new(
    hour(10),
    Some(Duration::minutes(30)),
    BasalRate::Absolute(5.0),
  ));

  let quiet = MemoryHistory::new();

  let resolver = resolver();
  let with_temp = snapshot_of(&history, &resolver, hour(0), hour(24)).await;
  let without = snapshot_of(&quiet, &resolver, hour(0), hour(24)).await;

  let boosted = aggregator::absolute_basal_iob(
    &with_temp, &resolver, &real_pump(), CURVE, hour(12),
  );
  let baseline = aggregator::absolute_basal_iob(
    &without, &resolver, &real_pump(), CURVE, hour(12),
  );
  // The 5 U/h override is picked up at hour 10 and held through hour 12.
  assert!(boosted.iob > baseline.iob);
}

// ─── Point queries ───────────────────────────────────────────────────────────

#[tokio::test]
async fn faked_temp_basal_rides_on_top_of_the_schedule() {
  let history = MemoryHistory::new();
  // 2 U over 60 min: 2 U/h on top of the 1 U/h schedule.
  history.push_extended_bolus(ExtendedBolusSegment::new(
    hour(1),
    Duration::minutes(60),
    2.0,
  ));

  let resolver = resolver();
  let snapshot = snapshot_of(&history, &resolver, hour(0), hour(24)).await;

  let mid = hour(1) + Duration::minutes(30);
  assert!(snapshot.real_temp_basal_at(mid).is_none());

  let faked = snapshot
    .temp_basal_at(mid, &resolver, &faking_pump())
    .expect("faked temp basal");
  assert_eq!(
    faked.absolute_rate_at(&profile(), mid).unwrap(),
    3.0
  );

  // A native-basal pump sees no temp basal here at all.
  assert!(snapshot.temp_basal_at(mid, &resolver, &real_pump()).is_none());
}

#[tokio::test]
async fn temp_target_and_profile_switch_point_queries() {
  let history = MemoryHistory::new();
  history.push_target(TempTarget {
    id:        Uuid::new_v4(),
    start:     hour(1),
    duration:  Duration::hours(4),
    low_mgdl:  90.0,
    high_mgdl: 110.0,
    reason:    Some("activity".into()),
  });
  history.push_target(TempTarget {
    id:        Uuid::new_v4(),
    start:     hour(2),
    duration:  Duration::hours(1),
    low_mgdl:  140.0,
    high_mgdl: 160.0,
    reason:    None,
  });
  history.push_profile_switch(ProfileSwitch {
    id:              Uuid::new_v4(),
    date:            hour(1),
    profile_name:    "weekday".into(),
    profile_json:    serde_json::to_string(&profile()).unwrap(),
    percentage:      100,
    timeshift_hours: 0,
    duration:        None,
  });

  let resolver = resolver();
  let snapshot = snapshot_of(&history, &resolver, hour(0), hour(24)).await;

  // Overlap resolves to the most recently started target…
  assert_eq!(
    snapshot.temp_target_at(hour(2)).unwrap().target_mgdl(),
    150.0
  );
  // …and back to the wider one once the narrow one expires.
  assert_eq!(
    snapshot.temp_target_at(hour(4)).unwrap().target_mgdl(),
    100.0
  );

  // A switch applies until superseded.
  assert_eq!(
    snapshot.profile_switch_at(hour(20)).unwrap().profile_name,
    "weekday"
  );
  assert!(snapshot.profile_switch_at(hour(0)).is_none());
}

#[tokio::test]
async fn carb_lookback_window_is_five_minutes() {
  let history = MemoryHistory::new();
  history.push_dose(DoseEvent::new(hour(1), 0.0, 20.0));
  history.push_dose(DoseEvent::new(
    hour(1) + Duration::minutes(10),
    0.0,
    15.0,
  ));

  let resolver = resolver();
  let snapshot = snapshot_of(&history, &resolver, hour(0), hour(24)).await;

  let at = hour(1) + Duration::minutes(12);
  let recent = snapshot.carb_doses_in_5_min_before(at);
  assert_eq!(recent.len(), 1);
  assert_eq!(recent[0].carbs, 15.0);
}

#[tokio::test]
async fn last_bolus_time_filters_on_the_smb_flag() {
  let history = MemoryHistory::new();
  history.push_dose(DoseEvent::new(hour(1), 2.0, 0.0));
  let mut smb = DoseEvent::new(hour(2), 0.3, 0.0);
  smb.smb = true;
  history.push_dose(smb);

  let resolver = resolver();
  let snapshot = snapshot_of(&history, &resolver, hour(0), hour(24)).await;

  assert_eq!(snapshot.last_bolus_time(hour(3)), Some(hour(2)));
  assert_eq!(
    snapshot.last_bolus_time_filtered(hour(3), false),
    Some(hour(1))
  );
  assert_eq!(
    snapshot.last_bolus_time_filtered(hour(3), true),
    Some(hour(2))
  );
}

// ─── Snapshot publication ────────────────────────────────────────────────────

#[tokio::test]
async fn snapshot_cell_swaps_atomically_while_readers_hold_the_old_one() {
  let history = MemoryHistory::new();
  history.push_dose(DoseEvent::new(hour(1), 2.0, 0.0));

  let resolver = resolver();
  let first = snapshot_of(&history, &resolver, hour(0), hour(12)).await;
  let cell = SnapshotCell::new(first);

  let reader = cell.snapshot();
  assert_eq!(reader.doses().len(), 1);

  history.push_dose(DoseEvent::new(hour(13), 1.0, 0.0));
  let refreshed = snapshot_of(&history, &resolver, hour(12), hour(24)).await;
  cell.publish(refreshed);

  // The old handle is unchanged; new readers see the new window.
  assert_eq!(reader.doses().len(), 1);
  assert_eq!(cell.snapshot().from(), hour(12));
  assert_eq!(cell.snapshot().doses().len(), 1);
  assert_eq!(cell.snapshot().doses()[0].date, hour(13));
}

// ─── Profile-switch side effect ──────────────────────────────────────────────

#[tokio::test]
async fn recording_a_profile_switch_persists_and_uploads_once() {
  let store = MemoryHistory::new();
  let sync = RecordingSync::new();

  let record = ProfileSwitch {
    id:              Uuid::new_v4(),
    date:            hour(6),
    profile_name:    "weekend".into(),
    profile_json:    serde_json::to_string(&profile()).unwrap(),
    percentage:      90,
    timeshift_hours: 1,
    duration:        Some(Duration::minutes(120)),
  };
  aggregator::record_profile_switch(&store, &sync, record.clone())
    .await
    .expect("switch recorded");

  let persisted = store.profile_switches();
  assert_eq!(persisted.len(), 1);
  assert_eq!(persisted[0].id, record.id);

  let uploads = sync.uploads();
  assert_eq!(uploads.len(), 1);
  assert_eq!(uploads[0].id, record.id);
}
