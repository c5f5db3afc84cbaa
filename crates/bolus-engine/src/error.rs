//! Error types for `bolus-engine`.

use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
  #[error("glucose source failed: {0}")]
  Glucose(#[source] BoxError),

  #[error("history source failed: {0}")]
  History(#[source] BoxError),

  #[error("persisting profile switch failed: {0}")]
  Persist(#[source] BoxError),

  #[error("uploading profile switch failed: {0}")]
  Upload(#[source] BoxError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
