// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! CLI argument parsing for the agent binary.
//!
//! Flags mirror the Actions inputs, with environment fallbacks so the binary
//! runs unmodified inside the workflow.

use clap::Parser;

use crate::config::RunTask;

/// CI agent that turns scanner findings into reviewed pull requests
#[derive(Parser, Clone, Debug)]
#[command(name = "fixwright", version, about)]
pub struct Cli {
    /// Task to run
    #[arg(long, value_enum, env = "RUN_TASK")]
    pub task: Option<RunTask>,

    /// Enable debug logging (DEBUG_MODE also enables it via configuration)
    #[arg(long)]
    pub debug: bool,

    /// Resolve configuration and print the redacted settings without running
    #[arg(long)]
    pub dry_run: bool,
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
