//! Error types for `bolus-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("profile definition is not valid JSON: {0}")]
  MalformedProfile(#[source] serde_json::Error),

  #[error("profile has no basal block covering minute {0} of day")]
  EmptyBasalSchedule(u32),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
