//! Insulin profiles and profile-switch records.
//!
//! A profile is the scheduled state of therapy: duration of insulin action
//! plus the 24-hour basal-rate schedule. Profile *resolution* — deciding
//! which profile applies at a timestamp — is an external concern behind
//! [`crate::source::ProfileResolver`]; this module only defines the values
//! those lookups return.

use chrono::{DateTime, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, intervals::Interval};

/// Fallback DIA (hours) when no profile can be resolved yet.
pub const DEFAULT_DIA_HOURS: f64 = 5.0;

// ─── Profile ─────────────────────────────────────────────────────────────────

/// One block of the scheduled basal-rate table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BasalBlock {
  /// Minute of day (UTC) this block takes effect.
  pub start_minute: u32,
  /// Scheduled rate in U/h from `start_minute` until the next block.
  pub rate:         f64,
}

/// A resolved insulin profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
  pub dia_hours: f64,
  /// Basal schedule, ascending by `start_minute`, first block at minute 0.
  pub basal:     Vec<BasalBlock>,
}

impl Profile {
  /// A flat schedule — the common test and cold-start shape.
  pub fn flat(dia_hours: f64, rate: f64) -> Self {
    Self {
      dia_hours,
      basal: vec![BasalBlock {
        start_minute: 0,
        rate,
      }],
    }
  }

  pub fn dia(&self) -> f64 { self.dia_hours }

  /// Scheduled basal rate at `time`.
  pub fn basal_at(&self, time: DateTime<Utc>) -> Result<f64> {
    let minute = time.time().num_seconds_from_midnight() / 60;
    self
      .basal
      .iter()
      .rev()
      .find(|b| b.start_minute <= minute)
      .map(|b| b.rate)
      .ok_or(Error::EmptyBasalSchedule(minute))
  }
}

// ─── Profile switches ────────────────────────────────────────────────────────

/// A record that a different profile (or a scaled/shifted variant of the
/// current one) took effect at `date`. Applies until superseded by a later
/// switch — point queries use "latest with effective time ≤ t".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileSwitch {
  pub id:              Uuid,
  pub date:            DateTime<Utc>,
  pub profile_name:    String,
  /// The switched-to profile, serialized; parsed on demand.
  pub profile_json:    String,
  /// Percentage scaling applied to the named profile (100 = unscaled).
  pub percentage:      u32,
  pub timeshift_hours: i32,
  /// `None` means the switch is permanent.
  #[serde(with = "crate::intervals::serde_opt_duration_minutes")]
  pub duration:        Option<Duration>,
}

impl ProfileSwitch {
  /// Deserialize the embedded profile definition.
  pub fn parsed_profile(&self) -> Result<Profile> {
    serde_json::from_str(&self.profile_json).map_err(Error::MalformedProfile)
  }
}

impl Interval for ProfileSwitch {
  fn start(&self) -> DateTime<Utc> { self.date }

  fn duration(&self) -> Option<Duration> { self.duration }
}
