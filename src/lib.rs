//! Aro - local-first workout log
//!
//! This crate provides the data layer behind the Aro client and the `aro`
//! CLI built on it.
//!
//! # Architecture
//!
//! - [`model`] - Data types (Workout, Exercise, Tag, TaggedDate, WeightEntry, PeriodDay, UserSettings)
//! - [`storage`] - Entity cache, dirty tracking, pagination cursors, SQLite persistence
//! - [`sync`] - Push (flush) and pull (pagination) against the Aro server
//! - [`plot`] - Chart series: month windows and curve simplification
//! - [`config`] - Configuration management
//! - [`cli`] - Command-line interface using clap
//! - [`error`] - Error types and handling

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod error;
pub mod model;
pub mod plot;
pub mod storage;
pub mod sync;
pub mod validate;

pub use error::{Error, Result};

/// Global silent mode flag for `--silent` output.
///
/// When set, create commands print only the new ID instead of full
/// output. Avoids threading a `silent` bool through every handler
/// signature.
pub static SILENT: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(false);

/// Check if silent mode is active.
#[inline]
pub fn is_silent() -> bool {
    SILENT.load(std::sync::atomic::Ordering::Relaxed)
}
