//! The aggregation result type and the options structure.

use chrono::{DateTime, Utc};
use serde::Serialize;

use bolus_core::source::AutosensResult;

// ─── Aggregate ───────────────────────────────────────────────────────────────

/// The summed insulin state at one query instant.
///
/// Every numeric field is an exact sum of per-event contributions. The
/// bolus-side fields are non-negative by construction; `basal_iob` and
/// `net_basal_insulin` are signed, since a temp basal below schedule
/// legitimately withdraws insulin relative to the plan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IobAggregate {
  pub time:                   DateTime<Utc>,
  /// Bolus-origin insulin on board.
  pub iob:                    f64,
  /// Units acting per minute, all origins combined.
  pub activity:               f64,
  /// Softened decay used to suppress duplicate-dose suggestions shortly
  /// after a bolus.
  pub bolus_snooze:           f64,
  /// Basal-origin insulin on board.
  pub basal_iob:              f64,
  pub net_basal_insulin:      f64,
  pub high_temp_insulin:      f64,
  pub extended_bolus_insulin: f64,
  pub last_bolus_time:        Option<DateTime<Utc>>,
}

impl IobAggregate {
  pub fn zero(time: DateTime<Utc>) -> Self {
    Self {
      time,
      iob: 0.0,
      activity: 0.0,
      bolus_snooze: 0.0,
      basal_iob: 0.0,
      net_basal_insulin: 0.0,
      high_temp_insulin: 0.0,
      extended_bolus_insulin: 0.0,
      last_bolus_time: None,
    }
  }

  /// Field-wise sum; `time` is kept from `self`, `last_bolus_time` is the
  /// later of the two.
  pub fn combine(self, other: Self) -> Self {
    Self {
      time:                   self.time,
      iob:                    self.iob + other.iob,
      activity:               self.activity + other.activity,
      bolus_snooze:           self.bolus_snooze + other.bolus_snooze,
      basal_iob:              self.basal_iob + other.basal_iob,
      net_basal_insulin:      self.net_basal_insulin
        + other.net_basal_insulin,
      high_temp_insulin:      self.high_temp_insulin
        + other.high_temp_insulin,
      extended_bolus_insulin: self.extended_bolus_insulin
        + other.extended_bolus_insulin,
      last_bolus_time:        match (self.last_bolus_time, other.last_bolus_time)
      {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
      },
    }
  }
}

// ─── Options ─────────────────────────────────────────────────────────────────

/// Recognized variations of the basal aggregation walk. `Default` is the
/// plain variant; absent fields cost nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IobOptions {
  /// Evaluate segments as if any that outlive this instant had been cut off
  /// at it — "what if the running segment ended now" projections. The
  /// stored segments are never mutated.
  pub truncate_at:                Option<DateTime<Utc>>,
  /// External sensitivity adjustment; scales each segment's effective rate.
  pub autosens:                   Option<AutosensResult>,
  pub exercise_mode:              bool,
  /// Target (mg/dL) at which basal is halved during exercise; only
  /// consulted when `exercise_mode` is set and a raised temp target is
  /// active.
  pub half_basal_exercise_target: Option<f64>,
}

impl IobOptions {
  pub fn truncated_at(time: DateTime<Utc>) -> Self {
    Self {
      truncate_at: Some(time),
      ..Self::default()
    }
  }
}
