// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Run telemetry accumulation for fixwright.
//!
//! This crate provides a thread-safe accumulator for the telemetry payload
//! the agent reports back to the remediation backend after each run.

mod log;
mod report;

pub use log::{AgentEvent, TelemetryLog, TokenStats};
pub use report::summary_report;
