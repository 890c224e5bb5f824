// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! GitHub-Actions-flavored logging.
//!
//! Log lines go to stdout/stderr with Actions workflow command prefixes
//! (`::warning::`, `::error::`, `::group::`) and are mirrored into the run's
//! telemetry buffer. Debug output is gated by a process-wide flag set from
//! configuration.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

use crate::telemetry::TelemetryLog;

static DEBUG: AtomicBool = AtomicBool::new(false);
static SINK: RwLock<Option<TelemetryLog>> = RwLock::new(None);

/// Install the telemetry sink and debug gate for this process.
pub fn init(debug: bool, telemetry: TelemetryLog) {
    DEBUG.store(debug, Ordering::Relaxed);
    *SINK.write() = Some(telemetry);
}

/// Whether debug logging is enabled.
pub fn debug_enabled() -> bool {
    DEBUG.load(Ordering::Relaxed)
}

fn mirror(message: &str) {
    if let Some(ref telemetry) = *SINK.read() {
        telemetry.add_log_message(message);
    }
}

/// Log a line to stdout and the telemetry buffer.
pub fn log(message: impl AsRef<str>) {
    let message = message.as_ref();
    mirror(message);
    println!("{}", message);
}

/// Log a warning with the Actions `::warning::` command.
pub fn warn(message: impl AsRef<str>) {
    let message = message.as_ref();
    mirror(message);
    println!("::warning::{}", message);
}

/// Log an error to stderr with the Actions `::error::` command.
pub fn error(message: impl AsRef<str>) {
    let message = message.as_ref();
    mirror(message);
    eprintln!("::error::{}", message);
}

/// Log a line only when debug mode is on. Always mirrored into telemetry.
pub fn debug_log(message: impl AsRef<str>) {
    let message = message.as_ref();
    mirror(&format!("DEBUG: {}", message));
    if debug_enabled() {
        println!("{}", message);
    }
}

/// Collapsible log group. The group closes when the guard drops.
pub struct LogGroup {
    _private: (),
}

impl Drop for LogGroup {
    fn drop(&mut self) {
        log("::endgroup::");
    }
}

/// Open a collapsible Actions log group.
#[must_use = "the group closes when the guard is dropped"]
pub fn group(title: impl AsRef<str>) -> LogGroup {
    log(format!("::group::{}", title.as_ref()));
    LogGroup { _private: () }
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
