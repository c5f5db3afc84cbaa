//! Basal-rate and extended-bolus segments.
//!
//! Both segment kinds compute their IOB contribution the same way: the
//! delivery window is split into ~5-minute chunks, each chunk becomes a
//! synthetic micro-dose placed at the chunk start, and every micro-dose runs
//! through the same decay curve as a bolus.
//!
//! Basal segments are valued at their *net* rate — segment minus scheduled
//! basal — so a temp basal below schedule contributes negative insulin.
//! Extended boluses are valued at their full delivery rate.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Result,
  curve::InsulinCurve,
  intervals::{ClipTo, Interval},
  profile::Profile,
};

/// Chunk width used when a segment is decomposed into micro-doses.
const CHUNK_MINUTES: f64 = 5.0;

// ─── Basal segments ──────────────────────────────────────────────────────────

/// How a temp-basal rate was entered on the pump.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum BasalRate {
  /// U/h, independent of the profile schedule.
  Absolute(f64),
  /// Percentage of the scheduled basal (100 = unchanged).
  Percent(u32),
}

/// A temporary basal-rate change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasalSegment {
  pub id:       Uuid,
  pub start:    DateTime<Utc>,
  /// `None` means the segment is still running.
  #[serde(with = "crate::intervals::serde_opt_duration_minutes")]
  pub duration: Option<Duration>,
  pub rate:     BasalRate,
}

/// Basal-shaped per-segment contribution.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BasalIob {
  pub basal_iob:         f64,
  pub activity:          f64,
  /// Signed delivered-minus-scheduled insulin over the evaluated window.
  pub net_basal_insulin: f64,
  /// Above-schedule chunks only.
  pub high_temp_insulin: f64,
}

impl BasalSegment {
  pub fn new(
    start: DateTime<Utc>,
    duration: Option<Duration>,
    rate: BasalRate,
  ) -> Self {
    Self {
      id: Uuid::new_v4(),
      start,
      duration,
      rate,
    }
  }

  /// The segment's rate in U/h, resolving percentage entries against the
  /// profile's scheduled basal at `time`.
  pub fn absolute_rate_at(
    &self,
    profile: &Profile,
    time: DateTime<Utc>,
  ) -> Result<f64> {
    match self.rate {
      BasalRate::Absolute(rate) => Ok(rate),
      BasalRate::Percent(pct) => {
        Ok(profile.basal_at(time)? * pct as f64 / 100.0)
      }
    }
  }

  fn net_rate_at(
    &self,
    profile: &Profile,
    time: DateTime<Utc>,
  ) -> Result<f64> {
    let scheduled = profile.basal_at(time)?;
    Ok(match self.rate {
      BasalRate::Absolute(rate) => rate - scheduled,
      BasalRate::Percent(pct) => (pct as f64 - 100.0) / 100.0 * scheduled,
    })
  }

  /// Contribution at `time`, chunked into micro-doses of the net rate.
  ///
  /// `scale` multiplies each chunk's effective rate; it carries the
  /// autosens/exercise adjustment and is 1.0 otherwise.
  pub fn iob_calc(
    &self,
    curve: InsulinCurve,
    time: DateTime<Utc>,
    profile: &Profile,
    scale: f64,
  ) -> Result<BasalIob> {
    let mut result = BasalIob::default();
    let dia = profile.dia();
    let dia_ago = time - minutes_f64(dia * 60.0);

    for chunk in chunks(self, time) {
      let micro =
        self.net_rate_at(profile, chunk.date)? * scale * chunk.minutes / 60.0;
      if chunk.date > dia_ago && chunk.date <= time {
        result.net_basal_insulin += micro;
        if micro > 0.0 {
          result.high_temp_insulin += micro;
        }
        let eff = curve.dose_effect(micro, time - chunk.date, dia);
        result.basal_iob += eff.iob;
        result.activity += eff.activity;
      }
    }
    Ok(result)
  }
}

impl Interval for BasalSegment {
  fn start(&self) -> DateTime<Utc> { self.start }

  fn duration(&self) -> Option<Duration> { self.duration }
}

impl ClipTo for BasalSegment {
  fn clipped_to(&self, end: DateTime<Utc>) -> Self {
    Self {
      duration: Some((end - self.start).max(Duration::zero())),
      ..self.clone()
    }
  }
}

// ─── Extended boluses ────────────────────────────────────────────────────────

/// A square-wave bolus delivered evenly over `duration`. On pumps that
/// cannot run native temp basals these double as basal overrides; that
/// reinterpretation is a per-query decision made by the aggregator, never a
/// stored transformation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtendedBolusSegment {
  pub id:       Uuid,
  pub start:    DateTime<Utc>,
  #[serde(with = "crate::intervals::serde_duration_minutes")]
  pub duration: Duration,
  /// Total units across the full (unclipped) duration.
  pub insulin:  f64,
}

/// Bolus-shaped per-segment contribution.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ExtendedIob {
  pub iob:                    f64,
  pub activity:               f64,
  pub extended_bolus_insulin: f64,
}

impl ExtendedBolusSegment {
  pub fn new(start: DateTime<Utc>, duration: Duration, insulin: f64) -> Self {
    Self {
      id: Uuid::new_v4(),
      start,
      duration,
      insulin,
    }
  }

  /// Delivery rate in U/h.
  pub fn rate(&self) -> f64 {
    let hours = self.duration.num_milliseconds() as f64 / 3_600_000.0;
    if hours <= 0.0 { 0.0 } else { self.insulin / hours }
  }

  /// Contribution at `time`, chunked into micro-doses of the delivery rate.
  pub fn iob_calc(
    &self,
    curve: InsulinCurve,
    time: DateTime<Utc>,
    dia_hours: f64,
    scale: f64,
  ) -> ExtendedIob {
    let mut result = ExtendedIob::default();
    let rate = self.rate();
    let dia_ago = time - minutes_f64(dia_hours * 60.0);

    for chunk in chunks(self, time) {
      let micro = rate * scale * chunk.minutes / 60.0;
      if chunk.date > dia_ago && chunk.date <= time {
        result.extended_bolus_insulin += micro;
        let eff = curve.dose_effect(micro, time - chunk.date, dia_hours);
        result.iob += eff.iob;
        result.activity += eff.activity;
      }
    }
    result
  }
}

impl Interval for ExtendedBolusSegment {
  fn start(&self) -> DateTime<Utc> { self.start }

  fn duration(&self) -> Option<Duration> { Some(self.duration) }
}

impl ClipTo for ExtendedBolusSegment {
  /// Truncation stops delivery: the rate is preserved and the total insulin
  /// shrinks in proportion to the retained duration.
  fn clipped_to(&self, end: DateTime<Utc>) -> Self {
    let kept = (end - self.start).max(Duration::zero());
    let ratio = if self.duration > Duration::zero() {
      kept.num_milliseconds() as f64 / self.duration.num_milliseconds() as f64
    } else {
      0.0
    };
    Self {
      duration: kept,
      insulin: self.insulin * ratio.min(1.0),
      ..self.clone()
    }
  }
}

// ─── Chunking ────────────────────────────────────────────────────────────────

struct Chunk {
  date:    DateTime<Utc>,
  minutes: f64,
}

/// Split the delivered part of `segment` (up to `time`) into equal chunks of
/// at most [`CHUNK_MINUTES`], each dated at its own start.
fn chunks(segment: &impl Interval, time: DateTime<Utc>) -> Vec<Chunk> {
  let delivered_until = segment.end().min(time);
  let total_minutes =
    (delivered_until - segment.start()).num_milliseconds() as f64 / 60_000.0;
  if total_minutes <= 0.0 {
    return Vec::new();
  }
  let count = (total_minutes / CHUNK_MINUTES).ceil() as usize;
  let minutes = total_minutes / count as f64;
  (0..count)
    .map(|i| Chunk {
      date:    segment.start() + minutes_f64(i as f64 * minutes),
      minutes,
    })
    .collect()
}

fn minutes_f64(minutes: f64) -> Duration {
  Duration::milliseconds((minutes * 60_000.0) as i64)
}

// ─── Tests ───────────────────────────────────────────────────────────────────
