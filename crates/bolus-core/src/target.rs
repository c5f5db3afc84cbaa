//! Temporary glucose targets.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::intervals::Interval;

/// A temporary target range. Overlapping targets are permitted in storage;
/// point queries resolve to the most recently started covering interval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TempTarget {
  pub id:        Uuid,
  pub start:     DateTime<Utc>,
  #[serde(with = "crate::intervals::serde_duration_minutes")]
  pub duration:  Duration,
  pub low_mgdl:  f64,
  pub high_mgdl: f64,
  pub reason:    Option<String>,
}

impl TempTarget {
  /// Midpoint of the target range, the single value dose-scaling math uses.
  pub fn target_mgdl(&self) -> f64 { (self.low_mgdl + self.high_mgdl) / 2.0 }
}

impl Interval for TempTarget {
  fn start(&self) -> DateTime<Utc> { self.start }

  fn duration(&self) -> Option<Duration> { Some(self.duration) }
}
