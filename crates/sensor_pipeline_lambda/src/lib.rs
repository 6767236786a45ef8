//! AWS-oriented adapters and handlers for the sensor pipeline.
//!
//! This crate owns runtime integration details (Lambda event envelopes,
//! service adapters, environment configuration, and the per-function
//! handlers). Domain decisions live in `sensor_pipeline_core`.

pub mod adapters;
pub mod archive;
pub mod config;
pub mod error;
pub mod events;
pub mod handlers;
pub mod logging;
