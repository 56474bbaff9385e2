//! Battery Recorder Core Library
//!
//! This library provides the moving parts of the recorder:
//! - Telemetry sources reading the platform's power-supply sensors
//! - Foreground tracking integration points
//! - The engine actor, its sampler thread, and the control handle
//! - Logging setup for the binary entry points
//!
//! The binary entry point is in `main.rs`.

pub mod engine;
pub mod foreground;
pub mod logging;
pub mod source;
