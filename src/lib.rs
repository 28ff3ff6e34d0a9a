//! # bead-sentry
//!
//! Bead segmentation and anomaly detection for laser-welding sensor
//! recordings.
//!
//! A batch of recordings goes through three stages:
//!
//! 1. [`data::aggregate`] — split each file's filter column into beads
//!    (runs above a threshold), numbered per file
//! 2. [`data::select`] + [`signal::extract_features`] — cut one bead position
//!    out of a target column in every file and summarise each waveform
//! 3. [`detect`] — isolation forest over those summaries, plus an optional
//!    principal component view
//!
//! [`state::Session`] holds the output of each stage for one batch.

pub mod config;
pub mod data;
pub mod detect;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod signal;
pub mod state;

pub use error::{PipelineError, Result};
