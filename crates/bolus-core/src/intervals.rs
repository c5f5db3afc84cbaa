//! Time-interval collections.
//!
//! Three container disciplines, one per record family:
//!
//! - [`NonOverlappingIntervals`] — basal and extended-bolus segments. A later
//!   segment whose start falls inside an earlier one clips the earlier
//!   segment's end; non-overlap is the invariant the insertion policy
//!   maintains, not an input guarantee.
//! - [`OverlappingIntervals`] — temporary targets. Storage keeps overlaps;
//!   point queries resolve to the most recently started covering interval.
//! - [`ProfileIntervals`] — profile switches. A switch applies until
//!   superseded, so point queries take the latest record at or before `t`
//!   with no upper range check.

use chrono::{DateTime, Duration, Utc};

// ─── Interval traits ─────────────────────────────────────────────────────────

/// A time-ranged record.
pub trait Interval {
  fn start(&self) -> DateTime<Utc>;

  /// `None` means open-ended — the record is still running.
  fn duration(&self) -> Option<Duration>;

  fn end(&self) -> DateTime<Utc> {
    match self.duration() {
      Some(d) => self.start() + d,
      None => DateTime::<Utc>::MAX_UTC,
    }
  }

  /// `[start, end)` containment.
  fn contains(&self, time: DateTime<Utc>) -> bool {
    self.start() <= time && time < self.end()
  }
}

/// A pure truncation transform: returns a copy ending at `end`, never
/// mutating the receiver.
pub trait ClipTo: Interval + Sized {
  fn clipped_to(&self, end: DateTime<Utc>) -> Self;
}

// ─── Non-overlapping set ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct NonOverlappingIntervals<T> {
  entries: Vec<T>,
}

impl<T: Interval + ClipTo> NonOverlappingIntervals<T> {
  pub fn new() -> Self {
    Self {
      entries: Vec::new(),
    }
  }

  pub fn reset(&mut self) -> &mut Self {
    self.entries.clear();
    self
  }

  /// Insert a batch, then re-establish non-overlap: wherever a segment's
  /// range runs into its successor's start, the segment is replaced by a
  /// clipped copy ending at that start (last write wins on overlap).
  pub fn add(&mut self, batch: impl IntoIterator<Item = T>) -> &mut Self {
    self.entries.extend(batch);
    self.entries.sort_by_key(Interval::start);
    for i in 0..self.entries.len().saturating_sub(1) {
      let next_start = self.entries[i + 1].start();
      if self.entries[i].end() > next_start {
        self.entries[i] = self.entries[i].clipped_to(next_start);
      }
    }
    debug_assert!(
      self.is_non_overlapping(),
      "overlap survived merge — caller inserted out-of-order duplicates"
    );
    self
  }

  /// The segment whose `[start, end)` range contains `time`. With adjacent
  /// segments the boundary belongs to the later one.
  pub fn value_at(&self, time: DateTime<Utc>) -> Option<&T> {
    self.entries.iter().find(|e| e.contains(time))
  }

  pub fn iter(&self) -> impl Iterator<Item = &T> { self.entries.iter() }

  pub fn len(&self) -> usize { self.entries.len() }

  pub fn is_empty(&self) -> bool { self.entries.is_empty() }

  pub fn first(&self) -> Option<&T> { self.entries.first() }

  fn is_non_overlapping(&self) -> bool {
    self
      .entries
      .windows(2)
      .all(|w| w[0].end() <= w[1].start())
  }
}

// ─── Overlapping set ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct OverlappingIntervals<T> {
  entries: Vec<T>,
}

impl<T: Interval> OverlappingIntervals<T> {
  pub fn new() -> Self {
    Self {
      entries: Vec::new(),
    }
  }

  pub fn reset(&mut self) -> &mut Self {
    self.entries.clear();
    self
  }

  pub fn add(&mut self, batch: impl IntoIterator<Item = T>) -> &mut Self {
    self.entries.extend(batch);
    // Stable: equal starts keep insertion order, so the rev() scan below
    // resolves ties to the most recently inserted.
    self.entries.sort_by_key(Interval::start);
    self
  }

  /// The most recently started interval covering `time`.
  pub fn value_at(&self, time: DateTime<Utc>) -> Option<&T> {
    self.entries.iter().rev().find(|e| e.contains(time))
  }

  pub fn iter(&self) -> impl Iterator<Item = &T> { self.entries.iter() }

  pub fn len(&self) -> usize { self.entries.len() }

  pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}

// ─── Profile set ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct ProfileIntervals<T> {
  entries: Vec<T>,
}

impl<T: Interval> ProfileIntervals<T> {
  pub fn new() -> Self {
    Self {
      entries: Vec::new(),
    }
  }

  pub fn reset(&mut self) -> &mut Self {
    self.entries.clear();
    self
  }

  pub fn add(&mut self, batch: impl IntoIterator<Item = T>) -> &mut Self {
    self.entries.extend(batch);
    self.entries.sort_by_key(Interval::start);
    self
  }

  /// The record with the greatest effective time ≤ `time`. Records apply
  /// until superseded, so there is no upper range check.
  pub fn value_to(&self, time: DateTime<Utc>) -> Option<&T> {
    self.entries.iter().rev().find(|e| e.start() <= time)
  }

  pub fn iter(&self) -> impl Iterator<Item = &T> { self.entries.iter() }

  pub fn len(&self) -> usize { self.entries.len() }

  pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}

// ─── Duration serde helpers ──────────────────────────────────────────────────

/// Serialize a `chrono::Duration` as whole minutes.
pub mod serde_duration_minutes {
  use chrono::Duration;
  use serde::{Deserialize, Deserializer, Serializer};

  pub fn serialize<S: Serializer>(
    d: &Duration,
    ser: S,
  ) -> Result<S::Ok, S::Error> {
    ser.serialize_i64(d.num_minutes())
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(
    de: D,
  ) -> Result<Duration, D::Error> {
    i64::deserialize(de).map(Duration::minutes)
  }
}

/// Serialize an `Option<chrono::Duration>` as whole minutes or null.
pub mod serde_opt_duration_minutes {
  use chrono::Duration;
  use serde::{Deserialize, Deserializer, Serializer};

  pub fn serialize<S: Serializer>(
    d: &Option<Duration>,
    ser: S,
  ) -> Result<S::Ok, S::Error> {
    match d {
      Some(d) => ser.serialize_some(&d.num_minutes()),
      None => ser.serialize_none(),
    }
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(
    de: D,
  ) -> Result<Option<Duration>, D::Error> {
    Ok(Option::<i64>::deserialize(de)?.map(Duration::minutes))
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
