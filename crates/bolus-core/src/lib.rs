//! Core types and trait definitions for the Bolus IOB engine.
//!
//! This crate is deliberately free of runtime and storage dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod curve;
pub mod error;
pub mod event;
pub mod glucose;
pub mod intervals;
pub mod profile;
pub mod segment;
pub mod source;
pub mod target;

pub use error::{Error, Result};
