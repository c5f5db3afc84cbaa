//! Dose events — boluses, meals, and automated micro-boluses.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::curve::{DoseEffect, InsulinCurve};

/// A single delivered dose and/or carbohydrate entry.
///
/// Immutable once loaded into a snapshot; the one sanctioned mutation
/// (zeroing carbs recorded before the analysis window) happens exactly once
/// while the snapshot is being built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoseEvent {
  pub id:      Uuid,
  pub date:    DateTime<Utc>,
  /// Units of insulin delivered. Zero for carb-only entries.
  pub insulin: f64,
  /// Grams of carbohydrate. Zero for insulin-only entries.
  pub carbs:   f64,
  /// `true` for automated super-micro-boluses; these are exempt from the
  /// bolus-snooze accumulation.
  pub smb:     bool,
  /// Soft-deleted events stay in storage and in the export merge but are
  /// excluded from every calculation.
  pub valid:   bool,
}

impl DoseEvent {
  pub fn new(date: DateTime<Utc>, insulin: f64, carbs: f64) -> Self {
    Self {
      id: Uuid::new_v4(),
      date,
      insulin,
      carbs,
      smb: false,
      valid: true,
    }
  }

  /// Decay-curve contribution of this dose at `time`.
  pub fn iob_calc(
    &self,
    curve: InsulinCurve,
    time: DateTime<Utc>,
    dia_hours: f64,
  ) -> DoseEffect {
    self.iob_calc_elapsed(curve, time - self.date, dia_hours)
  }

  /// Contribution at an explicit elapsed duration — used by the snooze
  /// accumulation, which evaluates the same curve at a pushed-forward time.
  pub fn iob_calc_elapsed(
    &self,
    curve: InsulinCurve,
    elapsed: Duration,
    dia_hours: f64,
  ) -> DoseEffect {
    curve.dose_effect(self.insulin, elapsed, dia_hours)
  }
}
