//! Exchange-record construction.

use chrono::{DateTime, Local, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use bolus_core::{
  glucose::GlucoseReading,
  segment::{BasalRate, BasalSegment, ExtendedBolusSegment},
};
use bolus_engine::HistoryEntry;

use crate::error::Result;

// ─── Treatment records ───────────────────────────────────────────────────────

/// One entry of the treatment exchange sequence. Field names are part of
/// the integration contract with the offline tuning procedure and must stay
/// stable once deployed.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExchangeRecord {
  Dose {
    id:          Uuid,
    /// Millisecond epoch timestamp.
    date:        i64,
    date_string: String,
    insulin:     f64,
    carbs:       f64,
    smb:         bool,
  },
  TempBasal {
    id:               Uuid,
    date:             i64,
    date_string:      String,
    /// `None` while the segment is still running.
    duration_minutes: Option<i64>,
    /// U/h for absolute entries.
    absolute:         Option<f64>,
    /// Percent-of-profile for percentage entries.
    percent:          Option<u32>,
  },
  ExtendedBolus {
    id:               Uuid,
    date:             i64,
    date_string:      String,
    duration_minutes: i64,
    insulin:          f64,
    /// Delivery rate in U/h.
    rate:             f64,
  },
}

impl ExchangeRecord {
  pub fn from_entry(entry: &HistoryEntry) -> Self {
    match entry {
      HistoryEntry::Dose(d) => Self::Dose {
        id:          d.id,
        date:        d.date.timestamp_millis(),
        date_string: iso(d.date),
        insulin:     d.insulin,
        carbs:       d.carbs,
        smb:         d.smb,
      },
      HistoryEntry::TempBasal(s) => {
        let (absolute, percent) = match s.rate {
          BasalRate::Absolute(rate) => (Some(rate), None),
          BasalRate::Percent(pct) => (None, Some(pct)),
        };
        Self::TempBasal {
          id: s.id,
          date: s.start.timestamp_millis(),
          date_string: iso(s.start),
          duration_minutes: s.duration.map(|d| d.num_minutes()),
          absolute,
          percent,
        }
      }
      HistoryEntry::ExtendedBolus(s) => Self::ExtendedBolus {
        id:               s.id,
        date:             s.start.timestamp_millis(),
        date_string:      iso(s.start),
        duration_minutes: s.duration.num_minutes(),
        insulin:          s.insulin,
        rate:             s.rate(),
      },
    }
  }

  pub fn to_value(&self) -> Result<Value> {
    Ok(serde_json::to_value(self)?)
  }
}

// ─── Glucose records ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct GlucoseExchangeRecord {
  pub id:          Uuid,
  pub device:      String,
  pub date:        i64,
  pub date_string: String,
  /// Sensor glucose value in mg/dL.
  pub sgv:         f64,
  pub direction:   &'static str,
  #[serde(rename = "type")]
  pub kind:        &'static str,
  pub systime:     String,
  /// Minutes between local and UTC renderings of "now"; identical on every
  /// record of one export run.
  pub utc_offset:  i32,
}

pub fn glucose_record(
  reading: &GlucoseReading,
  device: &str,
  utc_offset: i32,
) -> GlucoseExchangeRecord {
  GlucoseExchangeRecord {
    id: reading.id,
    device: device.to_owned(),
    date: reading.date.timestamp_millis(),
    date_string: iso(reading.date),
    sgv: reading.value_mgdl,
    direction: reading.trend.as_str(),
    kind: "sgv",
    systime: iso(reading.date),
    utc_offset,
  }
}

/// The exporter's UTC offset, in minutes, at the moment of the call.
pub fn local_utc_offset_minutes() -> i32 {
  Local::now().offset().local_minus_utc() / 60
}

fn iso(date: DateTime<Utc>) -> String {
  date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

// ─── Tests ───────────────────────────────────────────────────────────────────
