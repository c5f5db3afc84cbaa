//! Pharmacokinetic decay curves.
//!
//! A curve answers one question: given a dose of `amount` units delivered
//! `elapsed` ago under a duration-of-insulin-action of `dia_hours`, how much
//! of the dose is still on board and how fast is it acting right now?
//!
//! Activity is a per-minute rate; its integral over `[0, cutoff]` equals the
//! dose, so the curves conserve insulin. No intermediate rounding happens
//! anywhere in here — presentation layers round, chained calculations never
//! do.

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Peak activity time of the default rapid-acting models, in minutes.
const DEFAULT_PEAK_MINUTES: f64 = 75.0;

/// Reference tail of the bilinear model, in minutes on a 3-hour DIA.
const BILINEAR_END_MINUTES: f64 = 180.0;

// ─── Per-dose contribution ───────────────────────────────────────────────────

/// The contribution of a single dose at one query instant.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DoseEffect {
  /// Units of insulin still on board.
  pub iob:      f64,
  /// Units of insulin acting per minute.
  pub activity: f64,
}

// ─── Curve shapes ────────────────────────────────────────────────────────────

/// The pluggable decay-curve shape. Which shape applies is configuration
/// carried by the caller; the engine only ever calls [`dose_effect`].
///
/// [`dose_effect`]: InsulinCurve::dose_effect
#[derive(
  Debug, Clone, Copy, PartialEq, Serialize, Deserialize,
)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum InsulinCurve {
  /// Piecewise-linear activity: ramp to a 75-minute peak, linear tail to
  /// 180 minutes, both on a 3-hour reference DIA and time-scaled by
  /// `3 / dia`.
  Bilinear,
  /// Exponential model with a configurable peak (tau/S parameterization).
  /// Requires `dia_hours * 60 > 2 * peak_minutes`.
  Exponential { peak_minutes: f64 },
}

impl Default for InsulinCurve {
  fn default() -> Self { Self::Bilinear }
}

impl InsulinCurve {
  /// The exponential shape at the standard rapid-acting peak.
  pub fn exponential() -> Self {
    Self::Exponential {
      peak_minutes: DEFAULT_PEAK_MINUTES,
    }
  }

  /// IOB and activity of `amount` units delivered `elapsed` ago.
  ///
  /// For `elapsed <= 0` the dose has not aged: the full `amount` is on
  /// board with zero activity. At or past the DIA-derived cutoff both
  /// contributions are zero.
  pub fn dose_effect(
    &self,
    amount: f64,
    elapsed: Duration,
    dia_hours: f64,
  ) -> DoseEffect {
    if amount == 0.0 {
      return DoseEffect::default();
    }
    let minutes = elapsed.num_milliseconds() as f64 / 60_000.0;
    if minutes <= 0.0 {
      return DoseEffect {
        iob:      amount,
        activity: 0.0,
      };
    }
    match *self {
      Self::Bilinear => bilinear(amount, minutes, dia_hours),
      Self::Exponential { peak_minutes } => {
        exponential(amount, minutes, dia_hours, peak_minutes)
      }
    }
  }
}

// ─── Bilinear ────────────────────────────────────────────────────────────────

fn bilinear(amount: f64, minutes: f64, dia_hours: f64) -> DoseEffect {
  let scale = 3.0 / dia_hours;
  let min_ago = scale * minutes;
  let peak = DEFAULT_PEAK_MINUTES;
  let end = BILINEAR_END_MINUTES;

  // Per-unit shapes, multiplied by the (possibly negative) amount last so
  // that net-basal micro-doses below schedule keep their sign.
  let (iob_shape, activity_shape) = if min_ago < peak {
    let x = min_ago / 5.0 + 1.0;
    (
      1.0 - 0.001_852 * x * x + 0.001_852 * x,
      (2.0 / (dia_hours * 60.0 * peak)) * min_ago,
    )
  } else if min_ago < end {
    let x = (min_ago - peak) / 5.0;
    (
      // The tail polynomial crosses zero a hair before `end`; clamp so a
      // nearly-expired dose never counts negative.
      (0.001_323 * x * x - 0.054_233 * x + 0.555_56).max(0.0),
      2.0 / (dia_hours * 60.0)
        - (min_ago - peak) * 2.0 / (dia_hours * 60.0 * (end - peak)),
    )
  } else {
    (0.0, 0.0)
  };

  DoseEffect {
    iob:      amount * iob_shape,
    activity: amount * activity_shape,
  }
}

// ─── Exponential ─────────────────────────────────────────────────────────────

fn exponential(
  amount: f64,
  minutes: f64,
  dia_hours: f64,
  peak_minutes: f64,
) -> DoseEffect {
  let td = dia_hours * 60.0;
  if minutes >= td {
    return DoseEffect::default();
  }
  let tp = peak_minutes;
  let t = minutes;

  // Time constant of the exponential; S normalizes the activity integral
  // over [0, td] to exactly one dose.
  let tau = tp * (1.0 - tp / td) / (1.0 - 2.0 * tp / td);
  let a = 2.0 * tau / td;
  let s = 1.0 / (1.0 - a + (1.0 + a) * (-td / tau).exp());

  let activity =
    amount * (s / (tau * tau)) * t * (1.0 - t / td) * (-t / tau).exp();
  let iob = amount
    * (1.0
      - s
        * (1.0 - a)
        * ((t * t / (tau * td * (1.0 - a)) - t / tau - 1.0) * (-t / tau).exp()
          + 1.0));

  DoseEffect { iob, activity }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
