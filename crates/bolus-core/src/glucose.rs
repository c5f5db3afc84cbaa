//! Glucose readings as delivered by the sensor source.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sensor trend arrow. Serialized forms match the exchange-format direction
/// strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
  DoubleUp,
  SingleUp,
  FortyFiveUp,
  Flat,
  FortyFiveDown,
  SingleDown,
  DoubleDown,
  #[serde(rename = "NONE")]
  Unknown,
}

impl Trend {
  /// The direction string used by the exchange format.
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::DoubleUp => "DoubleUp",
      Self::SingleUp => "SingleUp",
      Self::FortyFiveUp => "FortyFiveUp",
      Self::Flat => "Flat",
      Self::FortyFiveDown => "FortyFiveDown",
      Self::SingleDown => "SingleDown",
      Self::DoubleDown => "DoubleDown",
      Self::Unknown => "NONE",
    }
  }
}

/// One continuous-glucose-monitor reading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlucoseReading {
  pub id:         Uuid,
  pub date:       DateTime<Utc>,
  pub value_mgdl: f64,
  pub trend:      Trend,
}
